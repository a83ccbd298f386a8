use anyhow::Result;
use folio::cli;

#[tokio::main]
async fn main() -> Result<()> {
    cli::start()?.execute().await
}
