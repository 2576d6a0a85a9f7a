mod app;
mod cli;
mod config;
mod db;
mod http;
mod logging;
mod paths;
mod store;

use anyhow::Result;
use clap::Parser;

fn main() -> Result<()> {
    let cli = cli::Cli::parse();
    logging::init();
    app::run(cli)
}
