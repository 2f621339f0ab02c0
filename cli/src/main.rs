use clap::Parser;
use quotebook_cli::Cli;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    quotebook_cli::run(Cli::parse()).await
}
