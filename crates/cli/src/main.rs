use anyhow::Result;

#[tokio::main]
async fn main() -> Result<()> {
    fvi_cli::main_entry().await
}
