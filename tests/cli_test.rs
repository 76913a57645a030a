//! Command dispatch against a temporary database.

use std::path::Path;

use clap::Parser;
use rstest::{fixture, rstest};
use tempfile::TempDir;

use nestedset::cli::{execute, Cli, CliError};
use nestedset::domain::RangeFilter;
use nestedset::{exitcode, Category, ErrorKind, SqliteStore, TreeStore};

#[fixture]
fn dir() -> TempDir {
    TempDir::new().unwrap()
}

fn run(db: &Path, args: &[&str]) -> Result<(), CliError> {
    let mut argv = vec!["nestedset", "--database", db.to_str().unwrap()];
    argv.extend_from_slice(args);
    let cli = Cli::try_parse_from(argv).unwrap();
    execute(&cli)
}

fn rows(db: &Path) -> Vec<(String, i64, i64)> {
    SqliteStore::<Category>::open(db, "categories", std::time::Duration::from_secs(1))
        .unwrap()
        .query_ordered(&RangeFilter::all())
        .unwrap()
        .into_iter()
        .map(|c| (c.name, c.left, c.right))
        .collect()
}

#[rstest]
fn given_fresh_database_when_building_tree_via_commands_then_rows_stored(dir: TempDir) {
    let db = dir.path().join("cli.db");

    run(&db, &["init"]).unwrap();
    run(&db, &["add-root", "root"]).unwrap();
    run(&db, &["add", "A", "--reference", "1"]).unwrap();
    run(&db, &["add", "B", "-r", "2", "-p", "next-sibling"]).unwrap();
    run(&db, &["add", "D", "-r", "3", "-p", "first-child"]).unwrap();
    run(&db, &["move", "4", "-r", "2", "-p", "last-child"]).unwrap();
    run(&db, &["show", "--max-level", "1"]).unwrap();
    run(&db, &["check"]).unwrap();

    assert_eq!(
        rows(&db),
        vec![
            ("root".to_string(), 1, 8),
            ("A".to_string(), 2, 5),
            ("D".to_string(), 3, 4),
            ("B".to_string(), 6, 7),
        ]
    );

    run(&db, &["delete", "2"]).unwrap();
    assert_eq!(rows(&db), vec![("root".to_string(), 1, 4), ("B".to_string(), 2, 3)]);
}

#[rstest]
#[case(&["delete", "42"], exitcode::NOINPUT)]
#[case(&["show", "--root", "42"], exitcode::NOINPUT)]
#[case(&["add", "x", "-r", "1", "-p", "next-sibling"], exitcode::USAGE)]
#[case(&["move", "1", "-r", "1"], exitcode::USAGE)]
fn given_bad_request_when_executing_then_matching_exit_code(
    dir: TempDir,
    #[case] args: &[&str],
    #[case] code: i32,
) {
    let db = dir.path().join("cli.db");
    run(&db, &["init"]).unwrap();
    run(&db, &["add-root", "root"]).unwrap();

    let err = run(&db, args).unwrap_err();

    assert_eq!(err.exit_code(), code, "{err}");
}

#[rstest]
fn given_node_moved_relative_to_itself_when_executing_then_invalid_operation(dir: TempDir) {
    let db = dir.path().join("cli.db");
    run(&db, &["init"]).unwrap();
    run(&db, &["add-root", "root"]).unwrap();
    run(&db, &["add", "A", "-r", "1"]).unwrap();

    let err = run(&db, &["move", "2", "-r", "2"]).unwrap_err();

    assert!(matches!(&err, CliError::NestedSet(e) if e.kind() == ErrorKind::InvalidOperation), "{err}");
    assert_eq!(err.exit_code(), exitcode::USAGE);
    assert_eq!(rows(&db), vec![("root".to_string(), 1, 4), ("A".to_string(), 2, 3)]);
}

#[rstest]
fn given_unknown_position_when_parsing_then_rejected() {
    let result = Cli::try_parse_from(["nestedset", "add", "x", "-r", "1", "-p", "sideways"]);

    assert!(result.is_err());
}
