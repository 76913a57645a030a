//! Service container for dependency injection
//!
//! Wires settings to a SQLite store and a manager on top of it.

use std::sync::Arc;

use tracing::debug;

use crate::application::NestedSetManager;
use crate::config::Settings;
use crate::domain::Category;
use crate::infrastructure::error::{StoreError, StoreResult};
use crate::infrastructure::sqlite::SqliteStore;

/// Manager over the bundled category table.
pub type CategoryManager = NestedSetManager<Category, SqliteStore<Category>>;

/// Container holding the application settings.
///
/// Every call to [`ServiceContainer::manager`] opens its own connection, so
/// each unit of work gets a fresh store handle and registry.
pub struct ServiceContainer {
    /// Application settings
    pub settings: Arc<Settings>,
}

impl ServiceContainer {
    pub fn new(settings: Settings) -> Self {
        Self {
            settings: Arc::new(settings),
        }
    }

    /// Open the configured database, creating its directory if needed.
    pub fn open_store(&self) -> StoreResult<SqliteStore<Category>> {
        let path = &self.settings.database;
        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            std::fs::create_dir_all(dir).map_err(|source| StoreError::Io {
                path: dir.to_path_buf(),
                source,
            })?;
        }
        debug!("open_store: {}", path.display());
        SqliteStore::open(path, &self.settings.table, self.settings.lock_timeout())
    }

    /// Create the node table if missing.
    pub fn init_schema(&self) -> StoreResult<()> {
        self.open_store()?.init_schema()
    }

    /// A manager for one unit of work.
    pub fn manager(&self) -> StoreResult<CategoryManager> {
        Ok(NestedSetManager::new(self.open_store()?))
    }
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;
    use crate::domain::NodeInfo;

    #[test]
    fn given_nested_database_path_when_opening_then_directory_created() {
        let dir = TempDir::new().unwrap();
        let settings = Settings {
            database: dir.path().join("sub").join("tree.db"),
            ..Settings::default()
        };
        let container = ServiceContainer::new(settings);

        container.init_schema().unwrap();
        let mut manager = container.manager().unwrap();
        let root = manager.create_root(Category::new("root")).unwrap();

        assert!(dir.path().join("sub").join("tree.db").exists());
        assert_eq!(manager.info(root).unwrap().left(), 1);
    }
}
