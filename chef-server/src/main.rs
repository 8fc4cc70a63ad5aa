use std::sync::Arc;

use anyhow::{Context, Result};
use chef_client::kitchen::{OpenAiGateway, RecipeOrchestrator};
use chef_server::{
    config::Config,
    routes::{router, AppState},
};
use clap::Parser;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
struct Args {
    /// YAML configuration file; every setting has a default
    #[clap(long)]
    config: Option<String>,

    /// The address and optionally port to bind to, overriding the config file
    #[clap(long)]
    address: Option<String>,

    /// Whether to use HTTPS / TLS (needs `server.tls` in the config file)
    #[clap(long)]
    tls: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    // Parse command line arguments
    let args = Args::parse();
    let mut config = match &args.config {
        Some(path) => Config::load(path).with_context(|| format!("Loading config from {}", path))?,
        None => Config::default(),
    };
    if let Some(address) = args.address {
        config.server.address = address;
    }

    // initialize tracing
    let file_appender = tracing_appender::rolling::daily(&config.server.log_dir, "access.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);
    tracing_subscriber::fmt()
        .json()
        .with_writer(non_blocking)
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    // one gateway client for the life of the process, shared by every request
    let gateway = OpenAiGateway::from_env(config.gateway.clone()).context("Configuring model gateway")?;
    tracing::info!(gateway = ?gateway, "Model gateway ready");
    let chef = RecipeOrchestrator::new(Arc::new(gateway)).with_options(config.pipeline.options());

    let app = router(
        AppState {
            chef: Arc::new(chef),
        },
        config.server.max_upload_bytes,
    );

    // In development, use HTTP. In production, use HTTPS.
    if args.tls {
        let tls = config
            .server
            .tls
            .as_ref()
            .context("--tls needs server.tls.cert_path and server.tls.key_path in the config")?;
        rustls::crypto::ring::default_provider()
            .install_default()
            .map_err(|_| anyhow::anyhow!("Failed to install rustls crypto provider"))?;
        let tls_config =
            axum_server::tls_rustls::RustlsConfig::from_pem_file(&tls.cert_path, &tls.key_path)
                .await
                .context("Loading TLS certificate")?;

        let addr = config.server.address.parse()?;
        tracing::info!("Listening on {}", addr);
        axum_server::bind_rustls(addr, tls_config)
            .serve(app.into_make_service())
            .await
            .context("Starting TLS server")?;
    } else {
        let listener = tokio::net::TcpListener::bind(&config.server.address).await?;
        tracing::info!("Listening on {}", config.server.address);
        axum::serve(listener, app).await?;
    }
    Ok(())
}
