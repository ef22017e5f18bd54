//! Command-line interface definitions.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Track blog articles and detect new posts.
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    /// Database file to use instead of the configured one
    #[arg(long, global = true, env = "BLOGWATCHER_DB")]
    pub db: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, PartialEq)]
pub enum Command {
    /// Add a new blog to track
    Add {
        name: String,
        url: String,

        /// RSS/Atom feed URL (auto-discovered if not provided)
        #[arg(long)]
        feed_url: Option<String>,

        /// CSS selector for HTML scraping fallback
        #[arg(long)]
        scrape_selector: Option<String>,
    },

    /// Remove a blog and all its articles
    Remove {
        name: String,

        /// Skip confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },

    /// List all tracked blogs
    #[command(name = "blogs", alias = "list-blogs")]
    Blogs,

    /// Scan blogs for new articles (all blogs unless NAME is given)
    Scan {
        name: Option<String>,

        /// Print one JSON object per scanned blog
        #[arg(long)]
        json: bool,
    },

    /// List articles (unread only by default)
    Articles {
        /// Show all articles, including read ones
        #[arg(short, long)]
        all: bool,

        /// Filter by blog name
        #[arg(short, long)]
        blog: Option<String>,
    },

    /// Mark an article as read
    Read { id: i64 },

    /// Mark all unread articles as read
    ReadAll {
        /// Only mark articles from this blog
        #[arg(short, long)]
        blog: Option<String>,

        /// Skip confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },

    /// Mark an article as unread
    Unread { id: i64 },
}
