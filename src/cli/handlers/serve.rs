//! API server handlers

use crate::AppConfig;
use crate::Result;

pub async fn handle_serve_api(
    config: &AppConfig,
    host: Option<String>,
    port: Option<u16>,
    cors: bool,
) -> Result<()> {
    use crate::api::serve_api;

    let host = host.unwrap_or_else(|| config.api.host.clone());
    let port = port.unwrap_or(config.api.port);
    let cors = cors || config.api.enable_cors;

    println!("🚀 Starting Content Research API Server");
    println!("=======================================\n");
    println!("📍 Host: {host}");
    println!("🔌 Port: {port}");
    println!("🌐 CORS: {}", if cors { "Enabled" } else { "Disabled" });
    println!(
        "🔒 API key: {}",
        if config.api_key_required() { "Required" } else { "Not required" }
    );
    for name in config.credentials.missing() {
        println!("⚠️  {name} is not set; clients must supply it with each request");
    }
    println!();

    serve_api(config.clone(), host, port, cors).await?;

    Ok(())
}
