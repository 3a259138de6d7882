use anyhow::Result;
use dbforge::cli;

#[tokio::main]
async fn main() -> Result<()> {
    cli::start().await
}
