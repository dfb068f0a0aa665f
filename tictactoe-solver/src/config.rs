use std::collections::BTreeMap;
use std::path::PathBuf;

use tictactoe_core::{native, Algorithm, NativeMode};

/// Name of the tablebase built by the `solver` binary.
pub const DEFAULT_TABLEBASE: &str = "minimax-1";

/// Where tables live and how searches run.
#[derive(Clone, Debug)]
pub struct Config {
    /// Directory holding every persisted table.
    pub data_dir: PathBuf,
    /// Symmetry table file name inside `data_dir`.
    pub symmetry_file: String,
    /// Tablebase name to file name inside `data_dir`.
    pub tablebases: BTreeMap<String, String>,
    /// Native minimax library. Defaults to the platform file name in `data_dir`.
    pub native_library: Option<PathBuf>,
    pub native_mode: NativeMode,
    pub algorithm: Algorithm,
}

impl Default for Config {
    fn default() -> Self {
        let mut tablebases = BTreeMap::new();
        tablebases.insert(DEFAULT_TABLEBASE.to_string(), "TableBase_MiniMax-1.json".to_string());
        Config {
            data_dir: PathBuf::from("data"),
            symmetry_file: "symmetry.bin".to_string(),
            tablebases,
            native_library: None,
            native_mode: NativeMode::Disabled,
            algorithm: Algorithm::Pruned,
        }
    }
}

impl Config {
    pub fn with_data_dir(data_dir: impl Into<PathBuf>) -> Self {
        Config {
            data_dir: data_dir.into(),
            ..Config::default()
        }
    }

    pub fn symmetry_path(&self) -> PathBuf {
        self.data_dir.join(&self.symmetry_file)
    }

    /// File for a registered tablebase.
    pub fn tablebase_path(&self, name: &str) -> Option<PathBuf> {
        self.tablebases.get(name).map(|file| self.data_dir.join(file))
    }

    pub fn native_path(&self) -> PathBuf {
        self.native_library
            .clone()
            .unwrap_or_else(|| native::default_path(&self.data_dir))
    }
}
