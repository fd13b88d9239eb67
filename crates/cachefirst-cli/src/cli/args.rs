use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "cachefirst",
    version,
    about = "Cache-first request resolution with offline fallback"
)]
pub struct Cli {
    #[command(flatten)]
    pub common: CommonArgs,

    #[command(subcommand)]
    pub cmd: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Seed the cache with the configured precache list
    Install,
    /// Resolve one request through cache, preload, network and fallback
    Fetch(FetchArgs),
    /// List entries in the configured store
    List,
}

#[derive(Args, Debug, Clone, Default)]
pub struct CommonArgs {
    /// YAML config file
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Origin that relative URLs resolve against
    #[arg(long, global = true)]
    pub origin: Option<String>,

    /// Root directory of the disk store
    #[arg(long, global = true)]
    pub cache_dir: Option<PathBuf>,

    /// Store name
    #[arg(long, global = true)]
    pub cache_name: Option<String>,
}

#[derive(Args, Debug, Clone)]
pub struct FetchArgs {
    /// Path or absolute URL to resolve
    pub url: String,

    /// Issue the request as a navigation (eligible for preload)
    #[arg(long)]
    pub navigate: bool,

    /// Skip the activate step (navigation preload stays off)
    #[arg(long)]
    pub no_activate: bool,

    /// Print the response body after the status line
    #[arg(long)]
    pub include_body: bool,

    /// How long to wait for the cache write before exiting, in milliseconds
    #[arg(long, default_value_t = 2000)]
    pub settle_ms: u64,
}
