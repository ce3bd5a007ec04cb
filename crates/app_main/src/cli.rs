//! Command-line interface definitions
//!
//! # Commands
//!
//! - **tags**: scan a library root and print its folder-name tags
//! - **browse**: page through one leaf directory, optionally viewing an item
//! - **exclude**: manage keywords hidden from tags
//! - **roots**: manage bookmarked library roots
//! - **index**: build the persistent directory index
//! - **open**: open a file or folder with the system shell

use app_core::TagSortMode;
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "media_shelf", version, about = "Browse media folders by the tags in their names")]
pub struct Cli {
    /// Print machine-readable JSON instead of text
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortArg {
    Alpha,
    Frequency,
}

impl From<SortArg> for TagSortMode {
    fn from(sort: SortArg) -> Self {
        match sort {
            SortArg::Alpha => TagSortMode::Alphabetical,
            SortArg::Frequency => TagSortMode::Frequency,
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List the tags of a library root
    #[command(visible_alias = "t")]
    Tags {
        /// Library root; defaults to the most recently bookmarked root
        root: Option<PathBuf>,

        /// Only tags whose label or keyword contains this text
        #[arg(short, long, default_value = "")]
        query: String,

        /// Tag order; defaults to the configured one
        #[arg(short, long, value_enum)]
        sort: Option<SortArg>,

        /// Also list the directories behind each tag
        #[arg(long)]
        with_dirs: bool,
    },

    /// Load a leaf directory page by page and list its media
    #[command(visible_alias = "b")]
    Browse {
        root: PathBuf,

        /// Leaf directory, absolute or relative to the root
        dir: PathBuf,

        /// Open the viewer on this item and decode it
        #[arg(long)]
        view: Option<usize>,
    },

    /// Keywords hidden from tag derivation
    Exclude {
        #[command(subcommand)]
        action: ExcludeAction,
    },

    /// Bookmarked library roots
    Roots {
        #[command(subcommand)]
        action: RootAction,
    },

    /// Build or refresh the persistent index of every file under a root
    Index {
        root: PathBuf,

        /// Index database location
        #[arg(long, default_value = app_core::indexer::DEFAULT_INDEX_FILE)]
        database: PathBuf,

        /// Crawl threads
        #[arg(long)]
        workers: Option<usize>,

        /// Entries per database commit
        #[arg(long)]
        batch_size: Option<usize>,

        #[arg(long)]
        follow_symlinks: bool,
    },

    /// Open a file with its default application
    Open {
        path: PathBuf,

        /// Show the containing folder instead
        #[arg(long)]
        folder: bool,
    },
}

#[derive(Subcommand, Debug)]
pub enum ExcludeAction {
    List,
    Add { keyword: String },
    Remove { keyword: String },
}

#[derive(Subcommand, Debug)]
pub enum RootAction {
    List,
    Add { path: PathBuf },
    Remove { path: PathBuf },
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_tags() {
        let cli = Cli::parse_from(["media_shelf", "tags", "/lib", "--sort", "frequency", "-q", "trip"]);
        match cli.command {
            Commands::Tags { root, query, sort, with_dirs } => {
                assert_eq!(root, Some(PathBuf::from("/lib")));
                assert_eq!(query, "trip");
                assert_eq!(sort.map(TagSortMode::from), Some(TagSortMode::Frequency));
                assert!(!with_dirs);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_parse_exclude_add() {
        let cli = Cli::parse_from(["media_shelf", "--json", "exclude", "add", "Beach"]);
        assert!(cli.json);
        assert!(matches!(
            cli.command,
            Commands::Exclude { action: ExcludeAction::Add { keyword } } if keyword == "Beach"
        ));
    }

    #[test]
    fn test_index_defaults() {
        let cli = Cli::parse_from(["media_shelf", "index", "/lib"]);
        match cli.command {
            Commands::Index { database, workers, batch_size, .. } => {
                assert_eq!(database, PathBuf::from("media_index.db"));
                assert_eq!(workers, None);
                assert_eq!(batch_size, None);
            }
            other => panic!("unexpected {:?}", other),
        }
    }
}
