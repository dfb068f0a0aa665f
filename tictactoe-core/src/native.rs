//! Optional shared-library minimax routine.
//!
//! The library exports two C functions with the same shape:
//!
//! ```text
//! int run_Minimax(unsigned char *board, int next, int x_mark, int o_mark, unsigned char *count);
//! int run_Minimax_Pruning(unsigned char *board, int next, int x_mark, int o_mark, unsigned char *count);
//! ```
//!
//! `board` holds the 9 base-3 digits. The return value is absolute: 1 when X
//! wins, 0 for a draw, -1 when O wins. `count` receives the node count as
//! two bytes, high byte first, so counts wrap at 65536.
//!
//! The routine assumes the position is unfinished; finished positions are
//! answered here without calling it.

use std::fmt;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::search::{Algorithm, Evaluation, Outcome};
use crate::{Error, Player, Position, Result};

/// How the native routine is used.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub enum NativeMode {
    /// Always run the pure search.
    #[default]
    Disabled,
    /// Use the library when it loads, fall back to the pure search otherwise.
    Preferred,
    /// Fail when the library cannot be loaded or run.
    Required,
}

impl std::str::FromStr for NativeMode {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, String> {
        match s.to_ascii_lowercase().as_str() {
            "disabled" | "off" => Ok(NativeMode::Disabled),
            "preferred" | "auto" => Ok(NativeMode::Preferred),
            "required" => Ok(NativeMode::Required),
            other => Err(format!("unknown native mode '{other}'")),
        }
    }
}

type RunMinimax = unsafe extern "C" fn(*const u8, i32, i32, i32, *mut u8) -> i32;

const EXHAUSTIVE_SYMBOL: &[u8] = b"run_Minimax\0";
const PRUNED_SYMBOL: &[u8] = b"run_Minimax_Pruning\0";

/// File name of the library for this platform.
pub fn library_file_name() -> &'static str {
    if cfg!(target_os = "windows") {
        "minimax.dll"
    } else if cfg!(target_os = "macos") {
        "minimax.dylib"
    } else {
        "minimax.so"
    }
}

/// Default library location inside `dir`.
pub fn default_path(dir: &Path) -> PathBuf {
    dir.join(library_file_name())
}

/// A loaded native minimax library. Closed on drop.
pub struct NativeLibrary {
    path: PathBuf,
    handle: sys::Handle,
    exhaustive: RunMinimax,
    pruned: RunMinimax,
}

// The exported routines allocate per call and keep no shared state.
unsafe impl Send for NativeLibrary {}
unsafe impl Sync for NativeLibrary {}

impl fmt::Debug for NativeLibrary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NativeLibrary").field("path", &self.path).finish()
    }
}

impl NativeLibrary {
    /// Load the library and check it against a position with a known value.
    pub fn load(path: &Path) -> Result<NativeLibrary> {
        let handle = sys::open(path).map_err(Error::NativeUnavailable)?;
        let exhaustive = sys::symbol(&handle, EXHAUSTIVE_SYMBOL).map_err(Error::NativeUnavailable)?;
        let pruned = sys::symbol(&handle, PRUNED_SYMBOL).map_err(Error::NativeUnavailable)?;

        // SAFETY: both symbols are declared with the `RunMinimax` signature.
        let library = unsafe {
            NativeLibrary {
                path: path.to_path_buf(),
                handle,
                exhaustive: std::mem::transmute::<*mut libc::c_void, RunMinimax>(exhaustive),
                pruned: std::mem::transmute::<*mut libc::c_void, RunMinimax>(pruned),
            }
        };
        library.probe()?;
        debug!(path = %path.display(), "loaded native minimax");
        Ok(library)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// X holds 0 and 1 with 2 open and O holds 3 and 4: X to move wins.
    fn probe(&self) -> Result<()> {
        let position = Position::from_moves(&[0, 3, 1, 4])?;
        for algorithm in [Algorithm::Exhaustive, Algorithm::Pruned] {
            let evaluation = self.evaluate(&position, algorithm)?;
            if evaluation.outcome != Outcome::Win {
                return Err(Error::NativeUnavailable(format!(
                    "{} returned {} for a won position",
                    self.path.display(),
                    evaluation.outcome
                )));
            }
        }
        Ok(())
    }

    /// Evaluate `position` for the side to move.
    pub fn evaluate(&self, position: &Position, algorithm: Algorithm) -> Result<Evaluation> {
        if let Some(winner) = position.check_winner() {
            let outcome = if winner == position.next_player() {
                Outcome::Win
            } else {
                Outcome::Loss
            };
            return Ok(Evaluation { outcome, nodes: 1 });
        }
        if position.legal_moves().is_empty() {
            return Ok(Evaluation {
                outcome: Outcome::Draw,
                nodes: 1,
            });
        }

        let board = position.pattern().digits();
        let mut count = [0u8; 2];
        let run = match algorithm {
            Algorithm::Exhaustive => self.exhaustive,
            Algorithm::Pruned => self.pruned,
        };
        // SAFETY: `board` has 9 readable bytes and `count` 2 writable bytes,
        // which is all the routine touches.
        let raw = unsafe {
            run(
                board.as_ptr(),
                i32::from(position.next_player().digit()),
                i32::from(Player::X.digit()),
                i32::from(Player::O.digit()),
                count.as_mut_ptr(),
            )
        };

        let absolute = i8::try_from(raw)
            .ok()
            .and_then(Outcome::from_i8)
            .ok_or_else(|| {
                Error::NativeUnavailable(format!("{} returned {raw}", self.path.display()))
            })?;
        let outcome = match position.next_player() {
            Player::X => absolute,
            Player::O => absolute.flip(),
        };
        let nodes = u64::from(count[0]) * 256 + u64::from(count[1]);
        Ok(Evaluation { outcome, nodes })
    }
}

impl Drop for NativeLibrary {
    fn drop(&mut self) {
        sys::close(&self.handle);
    }
}

#[cfg(unix)]
mod sys {
    use std::ffi::{CStr, CString};
    use std::os::unix::ffi::OsStrExt;
    use std::path::Path;

    pub struct Handle(*mut libc::c_void);

    fn last_error() -> String {
        // SAFETY: dlerror returns null or a NUL-terminated string owned by libc.
        unsafe {
            let msg = libc::dlerror();
            if msg.is_null() {
                "unknown dynamic loader error".to_string()
            } else {
                CStr::from_ptr(msg).to_string_lossy().into_owned()
            }
        }
    }

    pub fn open(path: &Path) -> Result<Handle, String> {
        if !path.exists() {
            return Err(format!("{} not found", path.display()));
        }
        let c_path = CString::new(path.as_os_str().as_bytes())
            .map_err(|_| format!("{} contains a NUL byte", path.display()))?;
        // SAFETY: c_path is a valid NUL-terminated string.
        let handle = unsafe { libc::dlopen(c_path.as_ptr(), libc::RTLD_NOW | libc::RTLD_LOCAL) };
        if handle.is_null() {
            Err(format!("{} is not compatible: {}", path.display(), last_error()))
        } else {
            Ok(Handle(handle))
        }
    }

    pub fn symbol(handle: &Handle, name: &[u8]) -> Result<*mut libc::c_void, String> {
        let c_name = CStr::from_bytes_with_nul(name).map_err(|e| e.to_string())?;
        // SAFETY: handle came from dlopen and has not been closed.
        let sym = unsafe { libc::dlsym(handle.0, c_name.as_ptr()) };
        if sym.is_null() {
            Err(format!("missing symbol {}: {}", c_name.to_string_lossy(), last_error()))
        } else {
            Ok(sym)
        }
    }

    pub fn close(handle: &Handle) {
        // SAFETY: called once, from NativeLibrary::drop.
        unsafe {
            libc::dlclose(handle.0);
        }
    }
}

#[cfg(not(unix))]
mod sys {
    use std::path::Path;

    pub struct Handle;

    pub fn open(path: &Path) -> Result<Handle, String> {
        Err(format!(
            "{}: native loading is only supported on unix targets",
            path.display()
        ))
    }

    pub fn symbol(_: &Handle, _: &[u8]) -> Result<*mut libc::c_void, String> {
        Err("native loading is only supported on unix targets".to_string())
    }

    pub fn close(_: &Handle) {}
}
