//! CARLA Control CLI 入口点。

use std::sync::Arc;
use std::time::Duration;

use actor_factory::{CarlaClient, MockCarlaClient};
use anyhow::{Context, Result};
use clap::Parser;
use config_loader::CatalogLoader;
use contracts::Catalog;
use observability::ObservabilityConfig;
use tracing::info;

use carla_control::cli::{Backend, Cli, Commands};
use carla_control::commands::{
    run_catalog, run_interactive, run_list_blueprints, run_load_xodr, surface_launcher,
};
use carla_control::session::SessionOptions;

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    observability::init_with_config(ObservabilityConfig {
        log_format: cli.log_format.into(),
        metrics_port: (cli.metrics_port != 0).then_some(cli.metrics_port),
        default_log_level: observability::level_for_verbosity(cli.verbose, cli.quiet).to_string(),
    })?;

    info!(
        version = env!("CARGO_PKG_VERSION"),
        "CARLA Control starting"
    );

    let catalog = CatalogLoader::load(cli.catalog.as_deref()).context("Failed to load catalog")?;

    let result = match &cli.command {
        Some(Commands::Catalog(args)) => run_catalog(&catalog, args, &mut std::io::stdout()),
        _ => match cli.connection.backend {
            Backend::Mock => run_with(MockCarlaClient::new(), &cli, catalog).await,
            #[cfg(feature = "real-carla")]
            Backend::Carla => run_with(actor_factory::RealCarlaClient::new(), &cli, catalog).await,
            #[cfg(not(feature = "real-carla"))]
            Backend::Carla => Err(anyhow::anyhow!(
                "built without the real-carla feature, use --backend mock"
            )),
        },
    };

    if let Err(ref e) = result {
        tracing::error!(error = %e, "Command failed");
    }

    result
}

/// Connect and run a server-side command
async fn run_with<C: CarlaClient + 'static>(
    mut client: C,
    cli: &Cli,
    catalog: Catalog,
) -> Result<()> {
    let endpoint = cli.connection.endpoint();
    client
        .connect(&endpoint)
        .await
        .with_context(|| format!("Failed to connect to {}:{}", endpoint.host, endpoint.port))?;

    let client = Arc::new(client);
    let catalog = Arc::new(catalog);

    match &cli.command {
        None | Some(Commands::Interactive) => {
            let options = SessionOptions {
                frame_timeout: Duration::from_millis(cli.frame_timeout_ms),
                seed: cli.seed,
                ..Default::default()
            };
            run_interactive(client, catalog, surface_launcher(cli.headless), options).await?;
        }
        Some(Commands::LoadXodr(args)) => {
            run_load_xodr(client, catalog, args, &mut std::io::stdout()).await?;
        }
        Some(Commands::ListBlueprints(args)) => {
            run_list_blueprints(client.as_ref(), args, &mut std::io::stdout()).await?;
        }
        Some(Commands::Catalog(args)) => run_catalog(&catalog, args, &mut std::io::stdout())?,
    }
    Ok(())
}
