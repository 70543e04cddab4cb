//! Interactive session loop.
//!
//! Owns the registry of spawned actors, the lazily opened display and the
//! control pump. Cleanup runs on every exit path.

use std::io::Write;
use std::sync::Arc;
use std::time::Duration;

use actor_factory::{
    capture_frame, ActorFactory, CarlaClient, SensorSource, WorldMutator, PEDESTRIAN_MAX_ATTEMPTS,
};
use async_channel::{Receiver, Sender};
use contracts::{ActorId, Catalog, SessionRegistry};
use display::{ControlCommand, DisplayConfig, DisplayHandle, SurfaceLauncher};
use observability::SessionMetricsAggregator;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, instrument, warn};

use crate::error::{Result, SessionError};
use crate::menu::{self, MenuCommand, VehicleChoice};

/// Session tuning
#[derive(Debug, Clone)]
pub struct SessionOptions {
    pub display: DisplayConfig,
    /// Bounded wait for a single POV frame
    pub frame_timeout: Duration,
    /// Seed for random picks (`None` = OS entropy)
    pub seed: Option<u64>,
    /// Pending controls before the display worker skips one
    pub control_queue: usize,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            display: DisplayConfig::default(),
            frame_timeout: Duration::from_secs(5),
            seed: None,
            control_queue: 8,
        }
    }
}

/// What happened during the session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionReport {
    pub destroyed: usize,
    pub failed: Vec<ActorId>,
    pub summary: SessionMetricsAggregator,
}

enum Flow {
    Continue,
    Exit,
}

/// Camera currently streaming into the display
struct LiveStream {
    index: usize,
    vehicle_id: ActorId,
    source: Box<dyn SensorSource>,
}

pub struct Session<C, R, W>
where
    C: CarlaClient + 'static,
{
    client: Arc<C>,
    catalog: Arc<Catalog>,
    factory: ActorFactory<C>,
    world: WorldMutator<C>,
    registry: SessionRegistry,
    input: R,
    output: W,
    options: SessionOptions,
    launcher: Arc<dyn SurfaceLauncher>,
    display: Option<DisplayHandle>,
    stream: Option<LiveStream>,
    controls_tx: Sender<ControlCommand>,
    controls_rx: Option<Receiver<ControlCommand>>,
    pump: Option<JoinHandle<()>>,
    metrics: SessionMetricsAggregator,
}

impl<C, R, W> Session<C, R, W>
where
    C: CarlaClient + 'static,
    R: AsyncBufRead + Unpin,
    W: Write,
{
    /// `client` must already be connected
    pub fn new(
        client: Arc<C>,
        catalog: Arc<Catalog>,
        launcher: Arc<dyn SurfaceLauncher>,
        input: R,
        output: W,
        options: SessionOptions,
    ) -> Self {
        let factory = match options.seed {
            Some(seed) => ActorFactory::with_seed(client.clone(), catalog.clone(), seed),
            None => ActorFactory::new(client.clone(), catalog.clone()),
        };
        let world = WorldMutator::new(client.clone(), catalog.clone());
        let (controls_tx, controls_rx) = async_channel::bounded(options.control_queue.max(1));

        Self {
            client,
            catalog,
            factory,
            world,
            registry: SessionRegistry::new(),
            input,
            output,
            options,
            launcher,
            display: None,
            stream: None,
            controls_tx,
            controls_rx: Some(controls_rx),
            pump: None,
            metrics: SessionMetricsAggregator::new(),
        }
    }

    pub fn registry(&self) -> &SessionRegistry {
        &self.registry
    }

    pub fn output(&self) -> &W {
        &self.output
    }

    /// Run the menu until exit, end of input or a fatal error, then clean up
    #[instrument(name = "session_run", skip(self))]
    pub async fn run(&mut self) -> Result<SessionReport> {
        self.start_control_pump();

        let result = self.menu_loop().await;
        if let Err(ref e) = result {
            error!(error = %e, "session aborted");
        }

        let report = self.cleanup().await;
        result.map(|()| report)
    }

    async fn menu_loop(&mut self) -> Result<()> {
        loop {
            menu::print_main_menu(&mut self.output)?;
            let Some(line) = self.read_line().await? else {
                debug!("end of input");
                return Ok(());
            };

            let command = MenuCommand::parse(&line);
            let label = command.as_str();
            let outcome = self.dispatch(command).await;
            self.metrics.command(label, outcome.is_ok());

            match outcome {
                Ok(Flow::Continue) => {}
                Ok(Flow::Exit) => return Ok(()),
                Err(e) if e.is_fatal() => return Err(e),
                Err(e) => {
                    warn!(command = label, error = %e, "command failed");
                    writeln!(self.output, "Error: {e}")?;
                }
            }
        }
    }

    async fn dispatch(&mut self, command: MenuCommand) -> Result<Flow> {
        match command {
            MenuCommand::AddVehicle => self.add_vehicle().await,
            MenuCommand::AddPedestrian => self.add_pedestrian().await,
            MenuCommand::ChangeWeather => self.change_weather().await,
            MenuCommand::ChangeMap => self.change_map().await,
            MenuCommand::ViewPov => self.view_pov().await,
            MenuCommand::ToggleManualDriving => self.toggle_manual_driving().await,
            MenuCommand::Exit => Ok(Flow::Exit),
            MenuCommand::Invalid(input) => {
                debug!(input = %input, "invalid menu choice");
                writeln!(self.output, "Invalid choice. Please try again.")?;
                Ok(Flow::Continue)
            }
        }
    }

    async fn read_line(&mut self) -> Result<Option<String>> {
        let mut line = String::new();
        if self.input.read_line(&mut line).await? == 0 {
            return Ok(None);
        }
        Ok(Some(line.trim().to_string()))
    }

    async fn prompt(&mut self, text: &str) -> Result<Option<String>> {
        write!(self.output, "{text}")?;
        self.output.flush()?;
        self.read_line().await
    }

    async fn add_vehicle(&mut self) -> Result<Flow> {
        menu::print_vehicle_menu(&mut self.output, &self.catalog)?;
        let Some(answer) = self.read_line().await? else {
            return Ok(Flow::Exit);
        };

        let name = match VehicleChoice::parse(&answer, self.catalog.vehicles.len())? {
            VehicleChoice::Random => None,
            VehicleChoice::Catalog(index) => self
                .catalog
                .vehicle_at(index)
                .map(|entry| entry.display_name.clone()),
            VehicleChoice::Name(name) => Some(name),
        };

        let blueprint = self.factory.resolve_blueprint(name.as_deref()).await?;
        let spawned = self.factory.spawn_vehicle_with_camera(&blueprint, None).await?;

        self.registry.register_vehicle(
            spawned.vehicle.actor_id,
            spawned.vehicle.blueprint.clone(),
            spawned.camera_id,
        );
        self.metrics.vehicle_spawned();

        writeln!(
            self.output,
            "Spawned vehicle: {} at {}",
            spawned.vehicle.blueprint, spawned.vehicle.transform.location
        )?;
        Ok(Flow::Continue)
    }

    async fn add_pedestrian(&mut self) -> Result<Flow> {
        match self.factory.spawn_pedestrian(PEDESTRIAN_MAX_ATTEMPTS).await? {
            Some(actor_id) => {
                self.registry.register_pedestrian(actor_id);
                self.metrics.pedestrian_spawned();
                writeln!(self.output, "Spawned pedestrian (id {actor_id})")?;
            }
            None => {
                writeln!(
                    self.output,
                    "Failed to spawn pedestrian after multiple attempts."
                )?;
            }
        }
        Ok(Flow::Continue)
    }

    async fn change_weather(&mut self) -> Result<Flow> {
        let names = self.catalog.weather_names().collect::<Vec<_>>().join(", ");
        writeln!(self.output, "Available weather types: {names}")?;
        let Some(name) = self.prompt("Enter weather type: ").await? else {
            return Ok(Flow::Exit);
        };

        self.world.change_weather(&name).await?;
        writeln!(self.output, "Weather changed to {name}")?;
        Ok(Flow::Continue)
    }

    async fn change_map(&mut self) -> Result<Flow> {
        writeln!(
            self.output,
            "Available maps: {}",
            self.catalog.maps.join(", ")
        )?;
        let Some(name) = self.prompt("Enter map name: ").await? else {
            return Ok(Flow::Exit);
        };

        let change = self.world.change_map(&name).await?;
        if change.invalidated_actors {
            self.invalidate_actors().await;
        }

        writeln!(self.output, "Map changed to {}", change.map)?;
        Ok(Flow::Continue)
    }

    /// Forget every handle that belonged to the previous world
    async fn invalidate_actors(&mut self) {
        self.stop_stream().await;
        let discarded = self.registry.drain().len();
        if discarded > 0 {
            warn!(discarded, "map reload invalidated tracked actors");
        }
    }

    /// Print the vehicle list and read a selection
    async fn select_vehicle(&mut self, title: &str) -> Result<Option<usize>> {
        if self.registry.vehicle_count() == 0 {
            return Err(SessionError::NoVehicles);
        }

        writeln!(self.output, "{title}")?;
        for (index, vehicle) in self.registry.vehicles().iter().enumerate() {
            let marker = if vehicle.manual_driving { " [manual]" } else { "" };
            writeln!(self.output, "{index}. {}{marker}", vehicle.type_id)?;
        }

        let Some(answer) = self.prompt("Enter the index of the vehicle: ").await? else {
            return Ok(None);
        };
        menu::parse_index(&answer, self.registry.vehicle_count()).map(Some)
    }

    async fn view_pov(&mut self) -> Result<Flow> {
        let Some(index) = self.select_vehicle("Select a vehicle to view POV:").await? else {
            return Ok(Flow::Exit);
        };

        if self.stream.as_ref().is_some_and(|stream| stream.index == index) {
            writeln!(self.output, "Vehicle {index} is already streaming.")?;
            return Ok(Flow::Continue);
        }

        let Some(vehicle) = self.registry.vehicle(index).cloned() else {
            return Err(SessionError::invalid_index(index.to_string(), self.registry.vehicle_count()));
        };
        let source = self.camera_source(vehicle.camera_id)?;
        let packet =
            capture_frame(&*source, vehicle.camera_id, self.options.frame_timeout).await?;

        self.ensure_display().await?;
        if let Some(display) = &self.display {
            display.present(packet).await?;
        }

        writeln!(self.output, "Showing POV of {}", vehicle.type_id)?;
        Ok(Flow::Continue)
    }

    async fn toggle_manual_driving(&mut self) -> Result<Flow> {
        let Some(index) = self.select_vehicle("Select a vehicle to drive:").await? else {
            return Ok(Flow::Exit);
        };

        let Some(vehicle) = self.registry.vehicle(index).cloned() else {
            return Err(SessionError::invalid_index(index.to_string(), self.registry.vehicle_count()));
        };

        if vehicle.manual_driving {
            self.stop_stream().await;
            writeln!(self.output, "Manual driving disabled for {}", vehicle.type_id)?;
            return Ok(Flow::Continue);
        }

        // Only one vehicle streams at a time
        self.stop_stream().await;
        self.ensure_display().await?;

        let source = self.camera_source(vehicle.camera_id)?;
        self.client.set_autopilot(vehicle.actor_id, false).await?;

        if let Some(display) = &self.display {
            source.listen(display.frame_callback());
            display.drive(Some(vehicle.actor_id)).await?;
        }

        self.registry.set_manual_driving(index, true);
        self.stream = Some(LiveStream {
            index,
            vehicle_id: vehicle.actor_id,
            source,
        });

        info!(vehicle_id = vehicle.actor_id, "manual driving enabled");
        writeln!(
            self.output,
            "Manual driving enabled for {}. Drive with arrow keys or WASD in the window.",
            vehicle.type_id
        )?;
        Ok(Flow::Continue)
    }

    fn camera_source(&self, camera_id: ActorId) -> Result<Box<dyn SensorSource>> {
        self.client
            .sensor_source(camera_id, format!("camera-{camera_id}"))
            .ok_or_else(|| {
                SessionError::Actor(actor_factory::ActorFactoryError::ActorNotFound {
                    actor_id: camera_id,
                })
            })
    }

    /// Stop the live camera and hand the vehicle back to autopilot
    ///
    /// Failures are logged; the stream is considered stopped either way.
    async fn stop_stream(&mut self) {
        let Some(stream) = self.stream.take() else {
            return;
        };

        stream.source.stop();
        if let Some(display) = &self.display {
            if let Err(e) = display.drive(None).await {
                debug!(error = %e, "display already closed");
            }
        }
        self.registry.set_manual_driving(stream.index, false);

        if let Err(e) = self.client.set_autopilot(stream.vehicle_id, true).await {
            warn!(vehicle_id = stream.vehicle_id, error = %e, "failed to re-enable autopilot");
        }
        info!(vehicle_id = stream.vehicle_id, "manual driving disabled");
    }

    /// Open the display on first use, or again after the user closed it
    async fn ensure_display(&mut self) -> Result<()> {
        if self.display.as_ref().is_some_and(|display| display.is_closed()) {
            self.stop_stream().await;
            if let Some(display) = self.display.take() {
                self.absorb_display_stats(display.close().await);
            }
        }

        if self.display.is_none() {
            let handle = DisplayHandle::open(
                self.options.display.clone(),
                self.launcher.clone(),
                self.controls_tx.clone(),
            )
            .await?;
            self.display = Some(handle);
        }
        Ok(())
    }

    fn absorb_display_stats(&mut self, stats: display::DisplayStatsSnapshot) {
        self.metrics.set_frames(
            self.metrics.frames_rendered + stats.rendered,
            self.metrics.frames_dropped + stats.dropped,
        );
        self.metrics.controls_skipped(stats.skipped_controls);
    }

    /// Apply keyboard controls produced by the display worker
    fn start_control_pump(&mut self) {
        let Some(rx) = self.controls_rx.take() else {
            return;
        };
        let client = self.client.clone();

        self.pump = Some(tokio::spawn(async move {
            while let Ok((actor_id, control)) = rx.recv().await {
                if let Err(e) = client.apply_vehicle_control(actor_id, control).await {
                    warn!(actor_id, error = %e, "failed to apply vehicle control");
                }
            }
            debug!("control pump stopped");
        }));
    }

    /// Stop streams, destroy every tracked actor, close the display
    #[instrument(name = "session_cleanup", skip(self))]
    async fn cleanup(&mut self) -> SessionReport {
        let _ = writeln!(self.output, "Cleaning up spawned actors...");

        if let Some(stream) = self.stream.take() {
            stream.source.stop();
        }

        let teardown = self.factory.teardown(&mut self.registry).await;
        self.metrics.teardown(teardown.destroyed, teardown.failed.len());

        if let Some(display) = self.display.take() {
            self.absorb_display_stats(display.close().await);
        }

        self.controls_tx.close();
        if let Some(pump) = self.pump.take() {
            let _ = pump.await;
        }

        if teardown.failed.is_empty() {
            let _ = writeln!(self.output, "All actors destroyed. Exiting...");
        } else {
            let _ = writeln!(
                self.output,
                "{} actors could not be destroyed. Exiting...",
                teardown.failed.len()
            );
        }
        info!(summary = %self.metrics, "session finished");

        SessionReport {
            destroyed: teardown.destroyed,
            failed: teardown.failed,
            summary: self.metrics.clone(),
        }
    }
}
