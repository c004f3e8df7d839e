use anyhow::Result;

#[tokio::main]
async fn main() -> Result<()> {
    typeahead_cli::main_entry().await
}
