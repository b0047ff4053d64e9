mod app;
mod cli;
mod config;
mod core;
mod engines;
mod executors;
mod ingest;
mod organizers;
mod remote;
mod sink;
mod ui;
mod utils;

use clap::Parser;

#[tokio::main]
async fn main() {
    let cli = cli::args::Cli::parse();
    if let Err(err) = app::run(cli).await {
        eprintln!("fatal: {:#}", err);
        std::process::exit(1);
    }
}
