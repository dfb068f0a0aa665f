//! Binary framing shared by the persisted tables.
//!
//! Format:
//! - Header (32 bytes):
//!   - Magic: 4 bytes, one per table kind
//!   - Version: u32 LE (4 bytes)
//!   - Record count: u64 LE (8 bytes)
//!   - Checksum: u64 LE xxhash of data section (8 bytes)
//!   - Reserved: 8 bytes (zeros)
//! - Data section (record count × record size bytes)
//!
//! Record layout is owned by the caller; this module only checks that the
//! data section matches the header.

use std::fs::File;
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::path::Path;

use xxhash_rust::xxh64::xxh64;

const HEADER_SIZE: usize = 32;

/// Header fields that identify one kind of table.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Format {
    pub magic: [u8; 4],
    pub version: u32,
    pub record_size: usize,
}

/// Validated data section of a loaded file.
#[derive(Debug)]
pub struct Checkpoint {
    record_size: usize,
    data: Vec<u8>,
}

fn invalid(msg: impl Into<String>) -> io::Error {
    io::Error::new(io::ErrorKind::InvalidData, msg.into())
}

impl Checkpoint {
    /// Write `data` as a sequence of fixed-size records. Returns the record count.
    pub fn save(path: &Path, format: &Format, data: &[u8]) -> io::Result<usize> {
        if data.len() % format.record_size != 0 {
            return Err(invalid(format!(
                "data section of {} bytes is not a multiple of the {}-byte record",
                data.len(),
                format.record_size
            )));
        }
        let count = data.len() / format.record_size;
        let checksum = xxh64(data, 0);

        let file = File::create(path)?;
        let mut writer = BufWriter::new(file);

        // Header
        writer.write_all(&format.magic)?;
        writer.write_all(&format.version.to_le_bytes())?;
        writer.write_all(&(count as u64).to_le_bytes())?;
        writer.write_all(&checksum.to_le_bytes())?;
        writer.write_all(&[0u8; 8])?; // Reserved

        writer.write_all(data)?;
        writer.flush()?;

        Ok(count)
    }

    /// Read a file written with the same `format`.
    pub fn load(path: &Path, format: &Format) -> io::Result<Checkpoint> {
        let file = File::open(path)?;
        let file_len = file.metadata()?.len();
        let mut reader = BufReader::new(file);

        let mut header = [0u8; HEADER_SIZE];
        reader.read_exact(&mut header)?;

        if header[0..4] != format.magic {
            return Err(invalid(format!(
                "bad magic {:?}, expected {:?}",
                String::from_utf8_lossy(&header[0..4]),
                String::from_utf8_lossy(&format.magic)
            )));
        }

        let version = u32::from_le_bytes([header[4], header[5], header[6], header[7]]);
        if version != format.version {
            return Err(invalid(format!("unsupported version {version}")));
        }

        let mut word = [0u8; 8];
        word.copy_from_slice(&header[8..16]);
        let count = u64::from_le_bytes(word) as usize;
        word.copy_from_slice(&header[16..24]);
        let stored_checksum = u64::from_le_bytes(word);

        let len = count
            .checked_mul(format.record_size)
            .ok_or_else(|| invalid(format!("record count {count} overflows")))?;
        let available = file_len.saturating_sub(HEADER_SIZE as u64);
        if len as u64 != available {
            return Err(invalid(format!(
                "expected {len} data bytes for {count} records, found {available}"
            )));
        }

        let mut data = Vec::with_capacity(len);
        reader.read_to_end(&mut data)?;
        if data.len() != len {
            return Err(invalid(format!(
                "expected {len} data bytes for {count} records, read {}",
                data.len()
            )));
        }

        if xxh64(&data, 0) != stored_checksum {
            return Err(invalid("checksum mismatch"));
        }

        Ok(Checkpoint {
            record_size: format.record_size,
            data,
        })
    }

    /// Number of records.
    pub fn len(&self) -> usize {
        self.data.len() / self.record_size
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Records in file order.
    pub fn records(&self) -> impl Iterator<Item = &[u8]> + '_ {
        self.data.chunks_exact(self.record_size)
    }

    /// File size for a given number of records.
    pub fn estimate_size(format: &Format, count: usize) -> usize {
        HEADER_SIZE + count * format.record_size
    }
}
