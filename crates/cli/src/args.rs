//! CLI argument definitions

use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// blog-bridge: publish markdown documents to multiple blogging platforms
#[derive(Parser, Debug)]
#[command(name = "blog-bridge")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Publish or update a document on one or more platforms
    Publish(PublishArgs),

    /// Delete a published post and forget its mapping
    Delete(DeleteArgs),

    /// Prepare the editable document for a platform
    Page(PageArgs),

    /// List categories or knowledge spaces of a platform
    Categories(CategoriesArgs),

    /// Show where a document has been published
    Status(StatusArgs),

    /// Configuration management
    Config(ConfigArgs),

    /// Validate configuration and show status
    Doctor(DoctorArgs),
}

/// Selects a document by file or by id
#[derive(Args, Debug)]
#[group(required = true, multiple = false)]
pub struct DocumentSelector {
    /// Markdown file with optional front matter
    #[arg(long)]
    pub file: Option<PathBuf>,

    /// Document id (as used in the mapping store)
    #[arg(long)]
    pub id: Option<String>,
}

#[derive(Args, Debug)]
pub struct PublishArgs {
    /// Markdown file to publish
    #[arg(long)]
    pub file: PathBuf,

    /// Platform keys to publish to
    #[arg(long = "platform", required_unless_present = "all")]
    pub platforms: Vec<String>,

    /// Publish to every enabled platform
    #[arg(long, conflicts_with = "platforms")]
    pub all: bool,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Args, Debug)]
pub struct DeleteArgs {
    #[command(flatten)]
    pub document: DocumentSelector,

    /// Platform key
    #[arg(long)]
    pub platform: String,

    /// Only forget the local mapping, do not call the platform
    #[arg(long)]
    pub force: bool,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum PageModeArg {
    Add,
    Update,
}

#[derive(Args, Debug)]
pub struct PageArgs {
    /// Markdown file
    #[arg(long)]
    pub file: PathBuf,

    /// Platform key
    #[arg(long)]
    pub platform: String,

    /// Add a new post or update the published one
    #[arg(long, value_enum, default_value = "add")]
    pub mode: PageModeArg,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Args, Debug)]
pub struct CategoriesArgs {
    /// Platform key
    #[arg(long)]
    pub platform: String,

    /// Only show categories containing this keyword
    #[arg(long)]
    pub keyword: Option<String>,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Args, Debug)]
pub struct StatusArgs {
    #[command(flatten)]
    pub document: DocumentSelector,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Args, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommands,
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Generate example configuration file
    Init {
        /// Path to write config file
        #[arg(long, default_value = "./config.toml")]
        path: PathBuf,

        /// Overwrite existing file
        #[arg(long)]
        force: bool,
    },
}

#[derive(Args, Debug)]
pub struct DoctorArgs {
    /// Also verify credentials against each platform
    #[arg(long)]
    pub online: bool,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}
