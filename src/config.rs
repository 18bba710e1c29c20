use std::path::PathBuf;

use clap::Parser;

/// Storage key of the schema registry.
pub const META_KEY: &str = "db_meta";

pub const DEFAULT_DATA_DIR: &str = "data";

pub const PROMPT: &str = ">>> ";

/// File-backed table store with an interactive command shell.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
pub struct Args {
    /// Directory holding the schema file and one JSON file per table.
    #[arg(long, env = "PRIMITIVE_DB_DATA_DIR", default_value = DEFAULT_DATA_DIR)]
    pub data_dir: PathBuf,

    /// Answer yes to every confirmation prompt.
    #[arg(short, long)]
    pub yes: bool,

    /// Enable debug logging (overridden by RUST_LOG).
    #[arg(short, long)]
    pub verbose: bool,

    /// Run a single command and exit instead of starting the shell.
    #[arg(short, long, value_name = "LINE")]
    pub command: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub data_dir: PathBuf,
    pub assume_yes: bool,
    pub log_level: &'static str,
}

impl From<&Args> for Config {
    fn from(args: &Args) -> Self {
        Self {
            data_dir: args.data_dir.clone(),
            assume_yes: args.yes,
            log_level: if args.verbose { "debug" } else { "warn" },
        }
    }
}
