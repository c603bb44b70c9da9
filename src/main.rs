use tracing_subscriber::{EnvFilter, fmt};
use tracing::info;

use global_plate::config::AppConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Init logging
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("info"))?;
    fmt().with_env_filter(filter).init();

    let mut cfg = AppConfig::from_env()?;
    if std::env::args().skip(1).any(|a| a == "--seed") {
        cfg.seed_on_start = true;
    }

    // Startup banner at info level so something always prints at default verbosity
    let rust_log = std::env::var("RUST_LOG").unwrap_or_else(|_| "<unset>".to_string());
    info!(
        target: "global_plate",
        "Global Plate functions starting: RUST_LOG='{}', http_port={}, mail_from='{}', sendgrid_key_set={}, sendgrid_api='{}', seed={}",
        rust_log, cfg.http_port, cfg.mail_from, cfg.sendgrid_api_key.is_some(), cfg.sendgrid_api_base, cfg.seed_on_start
    );

    global_plate::server::run(cfg).await
}
