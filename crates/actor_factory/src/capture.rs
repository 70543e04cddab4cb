//! Single-frame capture from a camera

use std::sync::{Arc, Mutex};
use std::time::Duration;

use contracts::{ActorId, SensorPacket, SensorSource};
use tokio::sync::oneshot;
use tracing::{debug, instrument};

use crate::error::{ActorFactoryError, Result};

/// Wait for the next frame of `source`, then stop listening
///
/// The source must not be streaming elsewhere; its listener is replaced for
/// the duration of the capture.
#[instrument(name = "capture_frame", skip(source), fields(sensor_id = source.sensor_id()))]
pub async fn capture_frame(
    source: &dyn SensorSource,
    actor_id: ActorId,
    timeout: Duration,
) -> Result<SensorPacket> {
    let (tx, rx) = oneshot::channel();
    let slot = Arc::new(Mutex::new(Some(tx)));

    source.listen(Arc::new(move |packet| {
        if let Some(tx) = slot.lock().ok().and_then(|mut slot| slot.take()) {
            let _ = tx.send(packet);
        }
    }));

    let result = tokio::time::timeout(timeout, rx).await;
    source.stop();

    match result {
        Ok(Ok(packet)) => {
            debug!(frame_id = packet.frame_id, "frame captured");
            Ok(packet)
        }
        _ => Err(ActorFactoryError::FrameTimeout {
            actor_id,
            timeout_ms: timeout.as_millis() as u64,
        }),
    }
}
