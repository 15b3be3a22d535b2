//! docpdf server binary.

use docpdf::ServerConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let config = ServerConfig::load()?;
    docpdf::start_server(config).await?;

    Ok(())
}
