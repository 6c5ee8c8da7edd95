use anyhow::Result;
use clap::Parser;

use muchat::{cli::Cli, runtime::Orchestrator, utils::init_logger};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logger(cli.verbose);

    Orchestrator::new(cli).run().await
}
