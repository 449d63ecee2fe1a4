use anyhow::Context;

use inquiry_intake::app;
use inquiry_intake::config::{IntakeConfig, ServerConfig, SmtpConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Install rustls crypto provider before any TLS usage
    rustls::crypto::ring::default_provider()
        .install_default()
        .map_err(|_| anyhow::anyhow!("Failed to install rustls crypto provider"))?;

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let server = ServerConfig::from_env().context("Invalid server configuration")?;
    let smtp = SmtpConfig::from_env().context("Invalid SMTP configuration")?;

    let app = app::build(&server, smtp.as_ref(), IntakeConfig::default())
        .await
        .with_context(|| format!("Failed to start with database {}", server.db_path.display()))?;

    let listener = tokio::net::TcpListener::bind(server.bind_addr)
        .await
        .with_context(|| format!("Failed to bind {}", server.bind_addr))?;
    tracing::info!(
        addr = %server.bind_addr,
        db = %server.db_path.display(),
        version = env!("CARGO_PKG_VERSION"),
        "Inquiry intake server started"
    );

    axum::serve(listener, app).await?;
    Ok(())
}
