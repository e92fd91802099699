// src/main.rs

use clap::Parser;

use dagrelay::cli::CliArgs;
use dagrelay::logging::init_logging;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = CliArgs::parse();
    init_logging(args.log_level)?;
    dagrelay::run(args).await
}
