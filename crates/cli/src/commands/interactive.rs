//! Interactive menu command.

use std::sync::Arc;

use actor_factory::CarlaClient;
use anyhow::{Context, Result};
use contracts::Catalog;
use display::{HeadlessLauncher, SurfaceLauncher};
use tokio::io::BufReader;
use tracing::{info, warn};

use crate::session::{Session, SessionOptions, SessionReport};

/// Pick the surface the display worker will open
pub fn surface_launcher(headless: bool) -> Arc<dyn SurfaceLauncher> {
    #[cfg(feature = "window")]
    if !headless {
        return Arc::new(display::WindowLauncher);
    }

    if !headless {
        warn!("built without window support, POV frames will not be shown");
    }
    Arc::new(HeadlessLauncher::new())
}

/// Run the menu on stdin / stdout
pub async fn run_interactive<C: CarlaClient + 'static>(
    client: Arc<C>,
    catalog: Arc<Catalog>,
    launcher: Arc<dyn SurfaceLauncher>,
    options: SessionOptions,
) -> Result<SessionReport> {
    let input = BufReader::new(tokio::io::stdin());
    let output = std::io::stdout();

    let mut session = Session::new(client, catalog, launcher, input, output, options);
    let report = session.run().await.context("Session aborted")?;

    if !report.failed.is_empty() {
        warn!(failed = ?report.failed, "some actors could not be destroyed");
    }
    info!(destroyed = report.destroyed, "session finished");
    eprintln!("{}", report.summary);
    Ok(report)
}
