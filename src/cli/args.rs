//! CLI argument definitions using clap

use std::path::PathBuf;

use clap::{ArgAction, Parser, Subcommand, ValueHint};

use crate::domain::InsertPosition;

/// Nested-set trees in a SQLite table: show, grow, reshape and check them
#[derive(Parser, Debug)]
#[command(name = "nestedset")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Debug output, repeat for more (-d info, -dd debug, -ddd trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub debug: u8,

    /// Config file layered over the global one
    #[arg(long, global = true, value_hint = ValueHint::FilePath)]
    pub config: Option<PathBuf>,

    /// SQLite database file (overrides config)
    #[arg(long, global = true, env = "NESTEDSET_DATABASE", value_hint = ValueHint::FilePath)]
    pub database: Option<PathBuf>,

    /// Generate shell completions
    #[arg(long = "generate", value_enum)]
    pub generator: Option<clap_complete::Shell>,

    /// Print author, version and effective settings
    #[arg(long)]
    pub info: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Create the node table if missing
    Init,

    /// List the root of every tree
    Roots,

    /// Show a tree (or the whole forest)
    Show {
        /// Root id of the tree
        #[arg(short, long)]
        root: Option<i64>,
        /// Deepest level to show (absolute, root is 0)
        #[arg(short, long)]
        max_level: Option<u32>,
    },

    /// Create a new tree
    AddRoot {
        /// Name of the root node
        name: String,
    },

    /// Insert a node relative to another
    Add {
        /// Name of the new node
        name: String,
        /// Id of the reference node
        #[arg(short, long)]
        reference: i64,
        /// Where the node goes relative to the reference
        #[arg(short, long, default_value_t = InsertPosition::LastChild)]
        position: InsertPosition,
    },

    /// Move a subtree relative to another node of the same tree
    Move {
        /// Id of the subtree root to move
        id: i64,
        /// Id of the reference node
        #[arg(short, long)]
        reference: i64,
        /// Where the subtree goes relative to the reference
        #[arg(short, long, default_value_t = InsertPosition::LastChild)]
        position: InsertPosition,
    },

    /// Delete a subtree
    Delete {
        /// Id of the subtree root
        id: i64,
    },

    /// Verify nested-set invariants
    Check {
        /// Root id of the tree (default: whole forest)
        #[arg(short, long)]
        root: Option<i64>,
    },
}
