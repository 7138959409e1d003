use anyhow::Result;

#[tokio::main]
async fn main() -> Result<()> {
    thinkchat::run().await
}
