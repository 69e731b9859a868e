use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "fileserve")]
#[command(author, version, about = "Password-gated file shares with in-browser video")]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Selects a share by public reference or numeric id.
#[derive(Args, Debug, Clone)]
#[group(required = true, multiple = false)]
pub struct ShareSelector {
    /// Public share reference
    #[arg(long)]
    pub share_reference: Option<String>,

    /// Numeric share id
    #[arg(long)]
    pub share_id: Option<i64>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the share server
    Start {
        /// Host to bind to (overrides config)
        #[arg(long)]
        host: Option<String>,

        /// Port to listen on (overrides config)
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Create a new share
    CreateShare {
        /// Share display name
        #[arg(long)]
        name: String,

        /// Password protecting the share
        #[arg(long)]
        password: Option<String>,
    },

    /// Delete a share and its file entries
    DeleteShare {
        #[command(flatten)]
        share: ShareSelector,
    },

    /// Add a file to a share
    AddFile {
        #[command(flatten)]
        share: ShareSelector,

        /// File to share
        #[arg(long)]
        file_path: PathBuf,

        /// Display name (defaults to the file's basename)
        #[arg(long)]
        name: Option<String>,
    },

    /// Remove a file from its share
    RemoveFile {
        /// File reference
        #[arg(long)]
        reference: String,
    },

    /// Set or clear a share's password
    SetPassword {
        #[command(flatten)]
        share: ShareSelector,

        /// New password
        #[arg(long, conflicts_with = "clear", required_unless_present = "clear")]
        password: Option<String>,

        /// Remove the password, making the share open
        #[arg(long)]
        clear: bool,
    },

    /// List shares and their files
    ListShares,

    /// Generate web-friendly versions of a share's videos
    Webify {
        #[command(flatten)]
        share: ShareSelector,

        /// Stop at the first failed conversion
        #[arg(long)]
        fail_fast: bool,
    },

    /// Generate previews for a share's large videos
    Previews {
        #[command(flatten)]
        share: ShareSelector,
    },

    /// Probe a media file and display information
    Probe {
        /// File to probe
        #[arg(required = true)]
        file: PathBuf,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Check that required external tools are available
    CheckTools,

    /// Display version information
    Version,
}
