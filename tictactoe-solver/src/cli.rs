//! Flags shared by the command-line tools.

use std::path::PathBuf;

use clap::Args;
use tictactoe_core::{Algorithm, NativeMode};
use tracing_subscriber::EnvFilter;

use crate::config::Config;

/// Install the log subscriber. `RUST_LOG` overrides the `info` default.
pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .init();
}

/// Where tables live and how searches run.
#[derive(Args, Debug, Clone)]
pub struct CommonArgs {
    /// Directory holding the persisted tables
    #[arg(long, env = "TICTACTOE_DATA_DIR", default_value = "data")]
    pub data_dir: PathBuf,

    /// Native minimax library (defaults to the platform file name in the data directory)
    #[arg(long, env = "TICTACTOE_NATIVE_LIB")]
    pub native_lib: Option<PathBuf>,

    /// Native minimax library use: disabled, preferred or required
    #[arg(long, default_value = "disabled")]
    pub native: NativeMode,

    /// Search every continuation instead of cutting off decided branches
    #[arg(long)]
    pub no_prune: bool,
}

impl CommonArgs {
    pub fn config(&self) -> Config {
        Config {
            native_library: self.native_lib.clone(),
            native_mode: self.native,
            algorithm: if self.no_prune {
                Algorithm::Exhaustive
            } else {
                Algorithm::Pruned
            },
            ..Config::with_data_dir(&self.data_dir)
        }
    }
}
