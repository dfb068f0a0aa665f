//! Process-wide tables and search backend, loaded once at startup.

use std::collections::BTreeMap;
use std::fs;

use tictactoe_core::Evaluator;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::engine::{MinimaxEngine, TablebaseEngine};
use crate::error::{Result, SolverError};
use crate::symtable::SymmetryTable;
use crate::tablebase::Tablebase;

/// Everything the engines read, owned in one place.
///
/// Tables are read-only after [`initialize`](Context::initialize); share the
/// context by reference across threads.
#[derive(Debug)]
pub struct Context {
    config: Config,
    symmetry: SymmetryTable,
    tablebases: BTreeMap<String, Tablebase>,
    evaluator: Evaluator,
}

impl Context {
    /// Load the symmetry table (building and saving it when absent), every
    /// registered tablebase found on disk, and the search backend.
    pub fn initialize(config: Config) -> Result<Context> {
        let symmetry = load_or_build_symmetry(&config)?;
        let tablebases = load_tablebases(&config)?;
        let native_path = config.native_path();
        let evaluator = Evaluator::with_native(config.algorithm, Some(&native_path), config.native_mode)?;

        info!(
            data_dir = %config.data_dir.display(),
            tablebases = tablebases.len(),
            native = evaluator.is_native(),
            "context initialized"
        );
        Ok(Context {
            config,
            symmetry,
            tablebases,
            evaluator,
        })
    }

    /// Re-read every table and reload the backend from the same config.
    pub fn reload(&mut self) -> Result<()> {
        let fresh = Context::initialize(self.config.clone())?;
        *self = fresh;
        debug!("context reloaded");
        Ok(())
    }

    /// Release the tables and any native library handle.
    pub fn teardown(self) {
        let native = self.evaluator.is_native();
        drop(self);
        debug!(native, "context torn down");
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn symmetry_table(&self) -> &SymmetryTable {
        &self.symmetry
    }

    pub fn evaluator(&self) -> &Evaluator {
        &self.evaluator
    }

    /// Names of the loaded tablebases.
    pub fn tablebase_names(&self) -> impl Iterator<Item = &str> {
        self.tablebases.keys().map(String::as_str)
    }

    pub fn tablebase(&self, name: &str) -> Result<&Tablebase> {
        self.tablebases
            .get(name)
            .ok_or_else(|| SolverError::UnknownTablebase(name.to_string()))
    }

    /// Make a tablebase available under `name` without touching disk.
    pub fn insert_tablebase(&mut self, name: impl Into<String>, tablebase: Tablebase) {
        self.tablebases.insert(name.into(), tablebase);
    }

    pub fn minimax_engine(&self) -> MinimaxEngine<'_> {
        MinimaxEngine::new(&self.evaluator)
    }

    pub fn tablebase_engine(&self, name: &str) -> Result<TablebaseEngine<'_>> {
        Ok(TablebaseEngine::new(&self.symmetry, self.tablebase(name)?))
    }
}

fn load_or_build_symmetry(config: &Config) -> Result<SymmetryTable> {
    let path = config.symmetry_path();
    match SymmetryTable::load(&path) {
        Ok(table) => Ok(table),
        Err(err) if err.is_not_found() => {
            info!(path = %path.display(), "symmetry table missing, building");
            let table = SymmetryTable::build();
            fs::create_dir_all(&config.data_dir)?;
            table.save(&path)?;
            Ok(table)
        }
        Err(err) => Err(err),
    }
}

fn load_tablebases(config: &Config) -> Result<BTreeMap<String, Tablebase>> {
    let mut loaded = BTreeMap::new();
    for (name, file) in &config.tablebases {
        let path = config.data_dir.join(file);
        match Tablebase::load(&path) {
            Ok(table) => {
                debug!(name = %name, entries = table.len(), "tablebase available");
                loaded.insert(name.clone(), table);
            }
            Err(err) if err.is_not_found() => {
                warn!(name = %name, path = %path.display(), "tablebase file missing, skipping");
            }
            Err(err) => return Err(err),
        }
    }
    Ok(loaded)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DEFAULT_TABLEBASE;
    use crate::engine::Engine;
    use tictactoe_core::NativeMode;

    fn assert_send_sync<T: Send + Sync>() {}

    fn temp_dir(name: &str) -> std::path::PathBuf {
        let dir = std::env::temp_dir().join(format!("tictactoe-{}-{}", std::process::id(), name));
        fs::remove_dir_all(&dir).ok();
        dir
    }

    #[test]
    fn test_context_is_shareable() {
        assert_send_sync::<Context>();
    }

    #[test]
    fn test_initialize_builds_symmetry_and_skips_missing_tablebase() {
        let dir = temp_dir("context_init");
        let context = Context::initialize(Config::with_data_dir(&dir)).unwrap();

        assert!(dir.join("symmetry.bin").exists());
        assert_eq!(context.tablebase_names().count(), 0);
        assert!(matches!(
            context.tablebase(DEFAULT_TABLEBASE),
            Err(SolverError::UnknownTablebase(_))
        ));
        assert!(!context.evaluator().is_native());
        context.teardown();

        // Second start reads the saved table.
        let context = Context::initialize(Config::with_data_dir(&dir)).unwrap();
        assert_eq!(context.symmetry_table(), &SymmetryTable::build());
        fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_reload_picks_up_new_tablebase() {
        let dir = temp_dir("context_reload");
        let mut context = Context::initialize(Config::with_data_dir(&dir)).unwrap();

        let (table, _) = Tablebase::build(context.symmetry_table()).unwrap();
        let path = context.config().tablebase_path(DEFAULT_TABLEBASE).unwrap();
        table.save(&path).unwrap();

        context.reload().unwrap();
        assert_eq!(context.tablebase(DEFAULT_TABLEBASE).unwrap(), &table);
        assert!(context.tablebase_engine(DEFAULT_TABLEBASE).is_ok());
        fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_inserted_tablebase_serves_engine() {
        let dir = temp_dir("context_insert");
        let mut context = Context::initialize(Config::with_data_dir(&dir)).unwrap();
        let (table, _) = Tablebase::build(context.symmetry_table()).unwrap();
        context.insert_tablebase("scratch", table);

        let position = tictactoe_core::Position::from_moves(&[4]).unwrap();
        let lookup = context.tablebase_engine("scratch").unwrap();
        let search = context.minimax_engine();
        assert_eq!(
            lookup.best_moves(&position).unwrap(),
            search.best_moves(&position).unwrap()
        );
        assert_eq!(context.tablebase_names().collect::<Vec<_>>(), vec!["scratch"]);
        fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_required_native_fails_initialization() {
        let dir = temp_dir("context_native");
        let mut config = Config::with_data_dir(&dir);
        config.native_mode = NativeMode::Required;
        assert!(matches!(
            Context::initialize(config),
            Err(SolverError::Core(tictactoe_core::Error::NativeUnavailable(_)))
        ));
        fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_corrupt_tablebase_is_an_error() {
        let dir = temp_dir("context_corrupt");
        fs::create_dir_all(&dir).unwrap();
        let config = Config::with_data_dir(&dir);
        let path = config.tablebase_path(DEFAULT_TABLEBASE).unwrap();
        fs::write(&path, "{\"0\": [5]}").unwrap();
        assert!(matches!(Context::initialize(config), Err(SolverError::Corrupt { .. })));
        fs::remove_dir_all(&dir).ok();
    }
}
