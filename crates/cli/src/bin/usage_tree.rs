use anyhow::Result;

#[tokio::main]
async fn main() -> Result<()> {
    usage_cli::main_entry().await
}
