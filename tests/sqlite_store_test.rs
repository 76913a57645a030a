//! Integration tests for the SQLite store behind the manager.

use std::path::Path;
use std::time::Duration;

use rstest::{fixture, rstest};
use rusqlite::Connection;
use tempfile::TempDir;

use nestedset::domain::RangeFilter;
use nestedset::infrastructure::StoreError;
use nestedset::util::testing;
use nestedset::{Category, ErrorKind, InsertPosition, NestedSetManager, NodeInfo, SqliteStore, TreeStore};

type Manager = NestedSetManager<Category, SqliteStore<Category>>;

struct Db {
    _dir: TempDir,
    path: std::path::PathBuf,
}

impl Db {
    fn manager(&self) -> Manager {
        self.manager_with_timeout(Duration::from_secs(2))
    }

    fn manager_with_timeout(&self, timeout: Duration) -> Manager {
        NestedSetManager::new(open(&self.path, timeout))
    }
}

fn open(path: &Path, timeout: Duration) -> SqliteStore<Category> {
    let store = SqliteStore::open(path, "categories", timeout).unwrap();
    store.init_schema().unwrap();
    store
}

/// Empty database file in a temp dir.
#[fixture]
fn db() -> Db {
    testing::init_test_setup();
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("tree.db");
    Db { _dir: dir, path }
}

/// Builds root -> A, B(D), C through the manager.
fn build_sample(manager: &mut Manager) {
    let root = manager.create_root(Category::new("root")).unwrap();
    let a = manager.insert(Category::new("A"), root, InsertPosition::LastChild).unwrap();
    let b = manager.insert(Category::new("B"), a, InsertPosition::NextSibling).unwrap();
    manager.insert(Category::new("C"), root, InsertPosition::LastChild).unwrap();
    manager.insert(Category::new("D"), b, InsertPosition::FirstChild).unwrap();
}

fn ranges(store: &SqliteStore<Category>) -> Vec<(String, i64, i64, u32)> {
    store
        .query_ordered(&RangeFilter::all())
        .unwrap()
        .into_iter()
        .map(|c| (c.name, c.left, c.right, c.level))
        .collect()
}

#[rstest]
fn given_built_tree_when_reading_then_matches_expected_layout(db: Db) {
    let mut manager = db.manager();

    build_sample(&mut manager);

    assert_eq!(
        ranges(manager.store()),
        vec![
            ("root".to_string(), 1, 10, 0),
            ("A".to_string(), 2, 3, 1),
            ("B".to_string(), 4, 7, 1),
            ("D".to_string(), 5, 6, 2),
            ("C".to_string(), 8, 9, 1),
        ]
    );
    let stats = manager.verify(None).unwrap();
    assert_eq!((stats.trees, stats.nodes), (1, 5));
}

#[rstest]
fn given_persisted_tree_when_reopened_then_fetch_links_it(db: Db) {
    build_sample(&mut db.manager());

    let mut manager = db.manager();
    let root = manager.fetch_tree(None).unwrap();
    let descendants = manager.descendants(root, None).unwrap();

    let names: Vec<String> = descendants
        .iter()
        .map(|&id| manager.info(id).unwrap().name.clone())
        .collect();
    assert_eq!(names, vec!["A", "B", "D", "C"]);
}

#[rstest]
fn given_sqlite_tree_when_moving_and_deleting_then_invariants_hold(db: Db) {
    let mut manager = db.manager();
    build_sample(&mut manager);
    let b = manager.load(3).unwrap();
    let c = manager.load(4).unwrap();
    assert_eq!(manager.info(b).unwrap().name, "B");
    assert_eq!(manager.info(c).unwrap().name, "C");

    manager.move_node(b, c, InsertPosition::LastChild).unwrap();
    assert_eq!(manager.info(b).unwrap().level, 2);
    assert_eq!(manager.info(c).unwrap().width(), 6);
    manager.verify(None).unwrap();

    let deleted = manager.delete(c).unwrap();
    assert_eq!(deleted.rows, 3);
    assert_eq!(
        ranges(manager.store()),
        vec![("root".to_string(), 1, 4, 0), ("A".to_string(), 2, 3, 1)]
    );
}

#[rstest]
fn given_two_roots_when_created_then_distinct_trees(db: Db) {
    let mut manager = db.manager();

    let first = manager.create_root(Category::new("first")).unwrap();
    let second = manager.create_root(Category::new("second")).unwrap();

    let first = manager.info(first).unwrap().root_id();
    let second = manager.info(second).unwrap().root_id();
    assert_ne!(first, second);
    assert_eq!(manager.fetch_roots().unwrap().len(), 2);
}

#[rstest]
fn given_write_lock_held_when_mutating_then_contention(db: Db) {
    let mut manager = db.manager_with_timeout(Duration::from_millis(50));
    build_sample(&mut manager);
    let a = manager.load(2).unwrap();
    let before = ranges(manager.store());

    let holder = Connection::open(&db.path).unwrap();
    holder.execute_batch("BEGIN IMMEDIATE").unwrap();

    let err = manager
        .insert(Category::new("late"), a, InsertPosition::FirstChild)
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Contention);
    assert!(err.is_retryable());
    holder.execute_batch("ROLLBACK").unwrap();
    assert_eq!(ranges(manager.store()), before);

    // the same call goes through once the lock is released
    manager
        .insert(Category::new("late"), a, InsertPosition::FirstChild)
        .unwrap();
    manager.verify(None).unwrap();
}

#[rstest]
fn given_corrupt_rows_when_fetching_then_integrity_error(db: Db) {
    build_sample(&mut db.manager());
    let raw = Connection::open(&db.path).unwrap();
    raw.execute("UPDATE categories SET rgt = lft WHERE name = 'D'", [])
        .unwrap();

    let mut manager = db.manager();
    let err = manager.fetch_tree(None).unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Integrity);
}

#[rstest]
fn given_invalid_table_name_when_opening_then_rejected(db: Db) {
    let result = SqliteStore::<Category>::open(&db.path, "1nodes", Duration::from_secs(1));

    assert!(matches!(result, Err(StoreError::InvalidTable(_))));
}

#[rstest]
fn given_highest_tree_deleted_when_creating_root_then_ids_not_reused(db: Db) {
    let mut first = db.manager();
    first.create_root(Category::new("one")).unwrap();
    let two = first.create_root(Category::new("two")).unwrap();
    let two = first.info(two).unwrap().clone();

    let mut second = db.manager();
    let stale = second.load(two.id.unwrap()).unwrap();
    second.delete(stale).unwrap();
    let three = second.create_root(Category::new("three")).unwrap();
    let three = second.info(three).unwrap();

    assert!(three.root_id() > two.root_id(), "root id {} reused", three.root_id());
    assert!(three.id.unwrap() > two.id.unwrap(), "node id {:?} reused", three.id);
}

#[rstest]
fn given_reference_deleted_elsewhere_when_inserting_then_invalid_operation(db: Db) {
    let mut first = db.manager();
    first.create_root(Category::new("one")).unwrap();
    let two = first.create_root(Category::new("two")).unwrap();

    let mut second = db.manager();
    let deleted = second.load(first.info(two).unwrap().id.unwrap()).unwrap();
    second.delete(deleted).unwrap();
    second.create_root(Category::new("three")).unwrap();
    let before = ranges(second.store());

    let err = first
        .insert(Category::new("orphan"), two, InsertPosition::LastChild)
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::InvalidOperation, "{err}");
    assert_eq!(ranges(second.store()), before);
}
