use anyhow::Result;

#[tokio::main]
async fn main() -> Result<()> {
    sigscout::cli::run().await
}
