mod admin_service;
mod config;

use crate::admin_service::AdminService;
use crate::config::{Config, MetricsConfig};
use clap::Parser;
use gdns::access::MemberAccess;
use gdns::actions::ActionHandler;
use gdns::client::ManagementClient;
use gdns::GlobalDnsService;
use metrics_exporter_statsd::StatsdBuilder;
use shared::http::run_http_service;
use std::path::{Path, PathBuf};
use std::process;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[derive(thiserror::Error, Debug)]
pub enum ServerError {
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
    #[error("config error: {0}")]
    Config(#[from] config::ConfigError),
    #[error("metrics exporter error: {0}")]
    Metrics(String),
    #[error("service error: {0}")]
    Service(#[from] gdns::errors::GlobalDnsError),
}

#[derive(Parser)]
#[command(name = "gdnsd", about = "GlobalDNS target-project action service")]
struct Cli {
    /// Path to the YAML configuration file
    #[arg(long, short)]
    config: PathBuf,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    if let Err(e) = run(&cli.config).await {
        eprintln!("gdnsd failed: {e}");
        process::exit(1);
    }
}

async fn run(config_path: &Path) -> Result<(), ServerError> {
    let config = Config::from_file(config_path)?;
    if let Some(metrics_config) = &config.metrics {
        install_statsd(metrics_config)?;
    }

    let mut client = ManagementClient::new(&config.management_api.url);
    if let Some(header) = &config.management_api.impersonation_header {
        client = client.with_impersonation_header(header.clone());
    }
    let client = Arc::new(client);
    let oracle = MemberAccess {
        users: client.clone(),
        grb_lister: client.clone(),
        gr_lister: client.clone(),
        projects: client.clone(),
    };
    let handler = ActionHandler::new(client, Arc::new(oracle));
    let mut service = GlobalDnsService::new(handler);
    if let Some(header) = &config.management_api.impersonation_header {
        service = service.with_impersonation_header(header);
    }

    let action_task = async {
        run_http_service(&config.listener.host, config.listener.port, service)
            .await
            .map_err(ServerError::Service)
    };
    // The handler has no warm-up phase; ready as soon as it is listening.
    let admin_task = run_http_service(
        &config.admin_listener.host,
        config.admin_listener.port,
        AdminService::new(|| true),
    );

    tokio::try_join!(action_task, admin_task)?;
    Ok(())
}

fn install_statsd(config: &MetricsConfig) -> Result<(), ServerError> {
    let recorder = StatsdBuilder::from(config.statsd_host.clone(), config.statsd_port)
        .build(Some("gdns"))
        .map_err(|e| ServerError::Metrics(e.to_string()))?;
    metrics::set_global_recorder(recorder).map_err(|e| ServerError::Metrics(e.to_string()))?;
    tracing::info!(
        host = %config.statsd_host,
        port = config.statsd_port,
        "statsd metrics exporter installed"
    );
    Ok(())
}
