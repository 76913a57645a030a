//! Terminal output formatting with colors
//!
//! Respects NO_COLOR, CLICOLOR, CLICOLOR_FORCE automatically.

use std::fmt::Display;

use colored::Colorize;
use termtree::Tree;

use crate::domain::{NodeId, NodeInfo, Registry};

/// Print error (red bold "error:" prefix) to stderr
pub fn error(msg: &(impl Display + ?Sized)) {
    eprintln!("{}: {}", "error".red().bold(), msg);
}

/// Print warning (yellow "Warning:" prefix) to stderr
pub fn warning(msg: &(impl Display + ?Sized)) {
    eprintln!("{}: {}", "Warning".yellow(), msg);
}

/// Print success status (green checkmark)
pub fn success(msg: &(impl Display + ?Sized)) {
    println!("{} {}", "✓".green(), msg);
}

/// Print completed action (green label)
pub fn action(label: &str, msg: &(impl Display + ?Sized)) {
    println!("{}: {}", label.green(), msg);
}

/// Print section header (cyan bold)
pub fn header(msg: &(impl Display + ?Sized)) {
    println!("{}", msg.to_string().cyan().bold());
}

/// Print indented detail (no color)
pub fn detail(msg: &(impl Display + ?Sized)) {
    println!("  {}", msg);
}

/// Print plain output (no color, for data)
pub fn info(msg: &(impl Display + ?Sized)) {
    println!("{}", msg);
}

/// Marker shown below a node whose children were not loaded.
pub const ELLIPSIS: &str = "…";

/// Render the linked subtree below `node_id`.
///
/// A non-leaf node whose children are not linked gets a single
/// [`ELLIPSIS`] leaf.
pub fn to_tree_string<T: NodeInfo + Display>(registry: &Registry<T>, node_id: NodeId) -> Tree<String> {
    let Some(node) = registry.get(node_id) else {
        return Tree::new(ELLIPSIS.to_string());
    };
    let label = node.info().to_string();
    match node.children() {
        Some(children) => {
            let leaves: Vec<_> = children
                .iter()
                .map(|&c| to_tree_string(registry, c))
                .collect();
            Tree::new(label).with_leaves(leaves)
        }
        None if node.info().is_leaf() => Tree::new(label),
        None => Tree::new(label).with_leaves([Tree::new(ELLIPSIS.to_string())]),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Category, TreeBuilder};

    #[test]
    fn given_cut_off_tree_when_rendering_then_unloaded_children_marked() {
        let rows = [
            Category::at("root", 1, 1, 8, 0).with_id(1),
            Category::at("A", 1, 2, 5, 1).with_id(2),
            Category::at("A1", 1, 3, 4, 2).with_id(3),
            Category::at("B", 1, 6, 7, 1).with_id(4),
        ];
        let mut registry = Registry::new();
        // A1 is below the cut-off and never loaded
        let ids: Vec<NodeId> = [&rows[0], &rows[1], &rows[3]]
            .into_iter()
            .map(|r| registry.get_node(r.clone()).unwrap())
            .collect();
        let infos: Vec<&Category> = ids.iter().map(|&id| registry.info(id).unwrap()).collect();
        let links = TreeBuilder::with_max_level(Some(1)).link(&infos).unwrap();
        registry.apply_links(&ids, &links);

        let rendered = to_tree_string(&registry, ids[0]).to_string();

        assert!(rendered.starts_with("root #1 [1, 8]"));
        assert!(rendered.contains("A #2 [2, 5]"));
        assert!(rendered.contains(ELLIPSIS));
        assert!(!rendered.contains("A1"));
        assert!(rendered.contains("B #4 [6, 7]"));
    }
}
