use anyhow::Result;
use clap::Parser;
use log::info;

mod commands;
mod config;
mod db;
mod db_types;
mod engine;
mod error;
mod guard;
mod parser;
mod registry;
mod render;
mod shell;
mod storage;

use crate::config::{Args, Config};
use crate::db::Database;
use crate::shell::Terminal;
use crate::storage::JsonFileStore;

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let config = Config::from(&args);

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(config.log_level)).init();

    let store = JsonFileStore::new(&config.data_dir);
    info!("data directory: {}", store.dir().display());

    let mut db = Database::new(store);
    let mut terminal = Terminal::stdin();

    match args.command {
        Some(line) => shell::run_once(&mut db, &mut terminal, &line, config.assume_yes).await,
        None => shell::run(&mut db, &mut terminal, config.assume_yes).await?,
    }

    Ok(())
}
