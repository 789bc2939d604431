use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Manage watch/read-later lists
#[derive(Parser)]
#[command(name = "laterlist", version)]
#[command(about = "Collects URLs into ranked watch/read-later lists", long_about = None)]
pub struct Cli {
    /// Path to a config.toml (overrides LATERLIST_CONFIG)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Answer yes to every confirmation
    #[arg(short, long, global = true)]
    pub yes: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Resolve pending URLs of one list, or of every list
    #[command(alias = "load")]
    Scan {
        list: Option<String>,
    },
    /// Add a single URL to a list
    #[command(alias = "add")]
    Push {
        list: String,
        url: String,
    },
    /// Show the highest-rated active item
    Next {
        list: String,
    },
    /// Take the highest-rated active item and mark it finished
    Pop {
        list: String,
    },
    /// Active items by rating
    List {
        list: String,
        limit: Option<usize>,
    },
    /// Show every field of one item
    #[command(visible_aliases = ["view", "info"])]
    Detail {
        list: String,
        id: i64,
    },
    /// Mark an item as finished
    #[command(alias = "finished")]
    Finish {
        list: String,
        id: i64,
    },
    /// Mark an item as removed
    #[command(alias = "delete")]
    Remove {
        list: String,
        id: i64,
    },
    /// Clear the finished and removed flags of an item
    Reactivate {
        list: String,
        id: i64,
    },
    /// Finished and/or removed items
    #[command(alias = "check")]
    Review {
        list: String,
        /// viewed, finished and/or removed
        filters: Vec<String>,
    },
    /// Case-insensitive name search over every item
    #[command(alias = "find")]
    Search {
        list: String,
        keyword: String,
    },
    /// Fetch fresh ratings for the given ids, or for every active item
    #[command(visible_aliases = ["sort", "rate", "reorganize"])]
    Reconsider {
        list: String,
        ids: Vec<i64>,
    },
    /// Registered list names
    Lists,
    /// Registered sources and the domains they handle
    Sources,
}
