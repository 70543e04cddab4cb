//! Display worker
//!
//! A dedicated thread owns the surface. Every frame reaches it through one
//! bounded queue: live camera frames are pushed with `try_send` and dropped
//! when the queue is full; synchronous presents wait for room and for the
//! result.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use async_channel::{Receiver, Sender, TryRecvError, TrySendError};
use contracts::{ActorId, SensorDataCallback, SensorPacket, VehicleControl};
use tokio::sync::oneshot;
use tracing::{debug, info, instrument, trace, warn};

use crate::error::{DisplayError, Result};
use crate::frame::FrameBuffer;
use crate::input::map_keys;
use crate::surface::{DisplayConfig, DisplaySurface, SurfaceLauncher};

/// Sleep between event polls when the queue is empty
const IDLE_TICK: Duration = Duration::from_millis(10);

/// Control command produced by the worker for the driven vehicle
pub type ControlCommand = (ActorId, VehicleControl);

enum DisplayEvent {
    /// Live feed frame, best effort
    Frame(SensorPacket),
    /// Frame whose outcome the sender waits for
    Present {
        packet: SensorPacket,
        done: oneshot::Sender<Result<()>>,
    },
    /// Vehicle driven from the keyboard, `None` to stop
    Drive(Option<ActorId>),
    Close,
}

/// Counters shared between the worker and its handle
#[derive(Debug, Default)]
struct DisplayStats {
    rendered: AtomicU64,
    dropped: AtomicU64,
    rejected: AtomicU64,
    skipped_controls: AtomicU64,
    closed: AtomicBool,
}

/// Snapshot of the worker counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DisplayStatsSnapshot {
    /// Frames presented
    pub rendered: u64,
    /// Live frames dropped because the queue was full
    pub dropped: u64,
    /// Frames that could not be rendered
    pub rejected: u64,
    /// Per-frame controls not handed to the pump because its queue was full
    pub skipped_controls: u64,
}

/// Handle to a running display worker
pub struct DisplayHandle {
    tx: Sender<DisplayEvent>,
    stats: Arc<DisplayStats>,
    thread: Option<JoinHandle<()>>,
}

impl DisplayHandle {
    /// Start the worker and create the surface on it
    ///
    /// Returns once the surface exists, or with the launcher's error.
    #[instrument(name = "display_open", skip_all, fields(width = config.width, height = config.height))]
    pub async fn open(
        config: DisplayConfig,
        launcher: Arc<dyn SurfaceLauncher>,
        controls: Sender<ControlCommand>,
    ) -> Result<Self> {
        let (tx, rx) = async_channel::bounded(config.queue_capacity.max(1));
        let (ready_tx, ready_rx) = oneshot::channel();
        let stats = Arc::new(DisplayStats::default());
        let worker_stats = stats.clone();

        let thread = thread::Builder::new()
            .name("display".to_string())
            .spawn(move || match launcher.launch(&config) {
                Ok(surface) => {
                    let _ = ready_tx.send(Ok(()));
                    Worker {
                        surface,
                        buffer: FrameBuffer::new(config.width, config.height),
                        rx,
                        controls,
                        stats: worker_stats.clone(),
                        driving: None,
                    }
                    .run();
                    worker_stats.closed.store(true, Ordering::SeqCst);
                }
                Err(e) => {
                    worker_stats.closed.store(true, Ordering::SeqCst);
                    let _ = ready_tx.send(Err(e));
                }
            })
            .map_err(|e| DisplayError::window(e.to_string()))?;

        ready_rx.await.map_err(|_| DisplayError::Closed)??;
        info!("display opened");

        Ok(Self {
            tx,
            stats,
            thread: Some(thread),
        })
    }

    /// Whether the worker has stopped (window closed or handle closed)
    pub fn is_closed(&self) -> bool {
        self.stats.closed.load(Ordering::SeqCst) || self.tx.is_closed()
    }

    /// Callback for a streaming camera
    ///
    /// Never blocks the sensor thread: a full queue drops the frame.
    pub fn frame_callback(&self) -> SensorDataCallback {
        let tx = self.tx.clone();
        let stats = self.stats.clone();
        Arc::new(move |packet| match tx.try_send(DisplayEvent::Frame(packet)) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) => {
                stats.dropped.fetch_add(1, Ordering::Relaxed);
                observability::record_frame_dropped();
                trace!("display queue full, frame dropped");
            }
            Err(TrySendError::Closed(_)) => {}
        })
    }

    /// Render one frame and wait until it is on screen
    pub async fn present(&self, packet: SensorPacket) -> Result<()> {
        let (done, result) = oneshot::channel();
        self.tx
            .send(DisplayEvent::Present { packet, done })
            .await
            .map_err(|_| DisplayError::Closed)?;
        result.await.map_err(|_| DisplayError::Closed)?
    }

    /// Start or stop keyboard driving of a vehicle
    pub async fn drive(&self, actor_id: Option<ActorId>) -> Result<()> {
        self.tx
            .send(DisplayEvent::Drive(actor_id))
            .await
            .map_err(|_| DisplayError::Closed)
    }

    pub fn stats(&self) -> DisplayStatsSnapshot {
        DisplayStatsSnapshot {
            rendered: self.stats.rendered.load(Ordering::Relaxed),
            dropped: self.stats.dropped.load(Ordering::Relaxed),
            rejected: self.stats.rejected.load(Ordering::Relaxed),
            skipped_controls: self.stats.skipped_controls.load(Ordering::Relaxed),
        }
    }

    /// Stop the worker and release the surface
    #[instrument(name = "display_close", skip(self))]
    pub async fn close(mut self) -> DisplayStatsSnapshot {
        // Worker may already be gone
        let _ = self.tx.send(DisplayEvent::Close).await;
        self.tx.close();

        if let Some(thread) = self.thread.take() {
            let joined = tokio::task::spawn_blocking(move || thread.join()).await;
            if !matches!(joined, Ok(Ok(()))) {
                warn!("display worker panicked");
            }
        }

        let stats = self.stats();
        info!(
            rendered = stats.rendered,
            dropped = stats.dropped,
            skipped_controls = stats.skipped_controls,
            "display closed"
        );
        stats
    }
}

struct Worker {
    surface: Box<dyn DisplaySurface>,
    buffer: FrameBuffer,
    rx: Receiver<DisplayEvent>,
    controls: Sender<ControlCommand>,
    stats: Arc<DisplayStats>,
    driving: Option<ActorId>,
}

impl Worker {
    fn run(mut self) {
        debug!("display worker started");

        loop {
            match self.rx.try_recv() {
                Ok(DisplayEvent::Close) | Err(TryRecvError::Closed) => break,
                Ok(DisplayEvent::Frame(packet)) => {
                    if let Err(e) = self.show(&packet) {
                        warn!(error = %e, sensor_id = %packet.sensor_id, "frame not rendered");
                    }
                }
                Ok(DisplayEvent::Present { packet, done }) => {
                    let _ = done.send(self.show(&packet));
                }
                Ok(DisplayEvent::Drive(actor_id)) => {
                    debug!(?actor_id, "driving target changed");
                    self.driving = actor_id;
                }
                Err(TryRecvError::Empty) => {
                    if self.surface.is_open() {
                        self.surface.pump();
                    }
                    thread::sleep(IDLE_TICK);
                }
            }

            if !self.surface.is_open() && !self.stats.closed.swap(true, Ordering::SeqCst) {
                info!("display window closed by user");
            }
        }

        debug!("display worker stopped");
    }

    fn show(&mut self, packet: &SensorPacket) -> Result<()> {
        if !self.surface.is_open() {
            self.stats.closed.store(true, Ordering::SeqCst);
            return Err(DisplayError::Closed);
        }

        if let Err(e) = self.buffer.blit(packet) {
            self.stats.rejected.fetch_add(1, Ordering::Relaxed);
            return Err(e);
        }
        self.surface.present(&self.buffer)?;
        self.stats.rendered.fetch_add(1, Ordering::Relaxed);
        observability::record_frame_rendered();

        if let Some(actor_id) = self.driving {
            let control = map_keys(&self.surface.key_state());
            match self.controls.try_send((actor_id, control)) {
                Ok(()) => {}
                // Pump busy: this frame's control is skipped, the next one wins
                Err(TrySendError::Full(_)) => {
                    self.stats.skipped_controls.fetch_add(1, Ordering::Relaxed);
                    observability::record_control_skipped();
                    debug!(actor_id, "control queue full, control skipped");
                }
                Err(TrySendError::Closed(_)) => {
                    trace!(actor_id, "control pump gone");
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::KeyState;
    use crate::surface::HeadlessLauncher;
    use bytes::Bytes;
    use contracts::{ImageData, ImageFormat, SensorPayload};

    fn frame(frame_id: u64) -> SensorPacket {
        SensorPacket {
            sensor_id: "camera".to_string(),
            timestamp: frame_id as f64 * 0.05,
            frame_id: Some(frame_id),
            payload: SensorPayload::Image(ImageData {
                width: 2,
                height: 2,
                format: ImageFormat::Bgra8,
                data: Bytes::from(vec![10, 20, 30, 255].repeat(4)),
            }),
        }
    }

    fn small_config() -> DisplayConfig {
        DisplayConfig {
            width: 2,
            height: 2,
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_present_renders_synchronously() {
        let launcher = HeadlessLauncher::new();
        let probe = launcher.probe();
        let (controls_tx, _controls_rx) = async_channel::bounded(4);

        let display = DisplayHandle::open(small_config(), Arc::new(launcher), controls_tx)
            .await
            .unwrap();
        display.present(frame(1)).await.unwrap();

        assert_eq!(probe.presented(), 1);
        assert_eq!(probe.last_frame().unwrap().pixel(1, 1), Some(0x1E_140A));

        let stats = display.close().await;
        assert_eq!(stats.rendered, 1);
    }

    #[tokio::test]
    async fn test_present_rejects_raw_payload() {
        let (controls_tx, _controls_rx) = async_channel::bounded(4);
        let display = DisplayHandle::open(
            small_config(),
            Arc::new(HeadlessLauncher::new()),
            controls_tx,
        )
        .await
        .unwrap();

        let raw = SensorPacket {
            payload: SensorPayload::Raw(Bytes::from_static(b"xyz")),
            ..frame(1)
        };
        let err = display.present(raw).await.unwrap_err();
        assert!(matches!(err, DisplayError::UnsupportedFrameType { .. }));
        // 非致命：之后的帧照常显示
        display.present(frame(2)).await.unwrap();

        let stats = display.close().await;
        assert_eq!(stats.rejected, 1);
        assert_eq!(stats.rendered, 1);
    }

    #[tokio::test]
    async fn test_driving_emits_controls() {
        let launcher = HeadlessLauncher::new();
        let probe = launcher.probe();
        probe.set_keys(KeyState {
            backward: true,
            right: true,
            ..Default::default()
        });
        let (controls_tx, controls_rx) = async_channel::bounded(4);

        let display = DisplayHandle::open(small_config(), Arc::new(launcher), controls_tx)
            .await
            .unwrap();
        display.drive(Some(1000)).await.unwrap();
        display.present(frame(1)).await.unwrap();

        let (actor_id, control) = controls_rx.recv().await.unwrap();
        assert_eq!(actor_id, 1000);
        assert!(control.reverse);
        assert_eq!(control.steer, 1.0);

        display.drive(None).await.unwrap();
        display.present(frame(2)).await.unwrap();
        assert!(controls_rx.try_recv().is_err());

        display.close().await;
    }

    #[tokio::test]
    async fn test_busy_pump_counts_skipped_controls() {
        let launcher = HeadlessLauncher::new();
        launcher.probe().set_keys(KeyState {
            forward: true,
            ..Default::default()
        });
        // Nobody drains the pump queue
        let (controls_tx, controls_rx) = async_channel::bounded(1);

        let display = DisplayHandle::open(small_config(), Arc::new(launcher), controls_tx)
            .await
            .unwrap();
        display.drive(Some(7)).await.unwrap();
        for frame_id in 1..=3 {
            display.present(frame(frame_id)).await.unwrap();
        }

        let stats = display.close().await;
        assert_eq!(stats.rendered, 3);
        assert_eq!(stats.skipped_controls, 2);
        assert_eq!(controls_rx.len(), 1);
    }

    #[tokio::test]
    async fn test_live_feed_drops_when_full() {
        let (controls_tx, _controls_rx) = async_channel::bounded(4);
        let config = DisplayConfig {
            queue_capacity: 1,
            ..small_config()
        };
        let display = DisplayHandle::open(config, Arc::new(HeadlessLauncher::new()), controls_tx)
            .await
            .unwrap();

        let callback = display.frame_callback();
        for frame_id in 0..200 {
            callback(frame(frame_id));
        }

        let stats = display.close().await;
        assert!(stats.dropped > 0);
        assert!(stats.rendered + stats.dropped <= 200);
    }

    #[tokio::test]
    async fn test_present_after_window_closed() {
        let launcher = HeadlessLauncher::new();
        let probe = launcher.probe();
        let (controls_tx, _controls_rx) = async_channel::bounded(4);
        let display = DisplayHandle::open(small_config(), Arc::new(launcher), controls_tx)
            .await
            .unwrap();

        probe.close();
        let err = display.present(frame(1)).await.unwrap_err();
        assert!(matches!(err, DisplayError::Closed));
        assert!(display.is_closed());

        display.close().await;
    }
}
