//! Command dispatch

use tracing::{debug, instrument};

use crate::cli::args::{Cli, Commands};
use crate::cli::error::CliResult;
use crate::cli::output;
use crate::config::Settings;
use crate::domain::{Category, InsertPosition, NodeInfo};
use crate::infrastructure::di::{CategoryManager, ServiceContainer};

/// Effective settings: config layers plus command line overrides.
pub fn load_settings(cli: &Cli) -> CliResult<Settings> {
    let mut settings = Settings::load(cli.config.as_deref())?;
    if let Some(database) = &cli.database {
        settings.database = database.clone();
    }
    Ok(settings)
}

pub fn execute(cli: &Cli) -> CliResult<()> {
    let Some(command) = &cli.command else {
        return Ok(());
    };
    let container = ServiceContainer::new(load_settings(cli)?);
    debug!("database: {}", container.settings.database.display());

    match command {
        Commands::Init => cmd_init(&container),
        Commands::Roots => cmd_roots(&mut container.manager()?),
        Commands::Show { root, max_level } => {
            let max_level = max_level.or(container.settings.default_max_level);
            cmd_show(&mut container.manager()?, *root, max_level)
        }
        Commands::AddRoot { name } => cmd_add_root(&mut container.manager()?, name),
        Commands::Add {
            name,
            reference,
            position,
        } => cmd_add(&mut container.manager()?, name, *reference, *position),
        Commands::Move {
            id,
            reference,
            position,
        } => cmd_move(&mut container.manager()?, *id, *reference, *position),
        Commands::Delete { id } => cmd_delete(&mut container.manager()?, *id),
        Commands::Check { root } => cmd_check(&container.manager()?, *root),
    }
}

fn cmd_init(container: &ServiceContainer) -> CliResult<()> {
    container.init_schema()?;
    output::success(&format!(
        "table '{}' ready in {}",
        container.settings.table,
        container.settings.database.display()
    ));
    Ok(())
}

fn cmd_roots(manager: &mut CategoryManager) -> CliResult<()> {
    let roots = manager.fetch_roots()?;
    if roots.is_empty() {
        output::warning("no trees");
        return Ok(());
    }
    for root in roots {
        output::info(manager.info(root)?);
    }
    Ok(())
}

#[instrument(skip(manager))]
fn cmd_show(manager: &mut CategoryManager, root: Option<i64>, max_level: Option<u32>) -> CliResult<()> {
    let nodes = manager.fetch_tree_as_list(root, max_level)?;
    manager.build_tree(&nodes, max_level)?;
    for node in nodes {
        if manager.info(node)?.is_root() {
            output::info(&output::to_tree_string(manager.registry(), node));
        }
    }
    Ok(())
}

fn cmd_add_root(manager: &mut CategoryManager, name: &str) -> CliResult<()> {
    let root = manager.create_root(Category::new(name))?;
    output::action("Created", manager.info(root)?);
    Ok(())
}

#[instrument(skip(manager))]
fn cmd_add(
    manager: &mut CategoryManager,
    name: &str,
    reference: i64,
    position: InsertPosition,
) -> CliResult<()> {
    let reference = manager.load(reference)?;
    let node = manager.insert(Category::new(name), reference, position)?;
    output::action("Inserted", manager.info(node)?);
    Ok(())
}

#[instrument(skip(manager))]
fn cmd_move(manager: &mut CategoryManager, id: i64, reference: i64, position: InsertPosition) -> CliResult<()> {
    let node = manager.load(id)?;
    let reference = manager.load(reference)?;
    manager.move_node(node, reference, position)?;
    output::action("Moved", manager.info(node)?);
    Ok(())
}

fn cmd_delete(manager: &mut CategoryManager, id: i64) -> CliResult<()> {
    let node = manager.load(id)?;
    let name = manager.info(node)?.to_string();
    let deleted = manager.delete(node)?;
    output::action("Deleted", &name);
    output::detail(&format!(
        "{} node(s) removed from tree {}",
        deleted.rows, deleted.root_id
    ));
    Ok(())
}

fn cmd_check(manager: &CategoryManager, root: Option<i64>) -> CliResult<()> {
    let stats = manager.verify(root)?;
    output::success(&format!(
        "{} tree(s), {} node(s): nested-set invariants hold",
        stats.trees, stats.nodes
    ));
    Ok(())
}
