use anyhow::Result;
use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::message::{ComponentEvent, MsgFromSensor, MsgToSensor};

/// Lifecycle contract between the delivery core's components and the
/// surrounding framework.
///
/// Components are constructed explicitly and wired through
/// [`SensorCore`](crate::pipeline::SensorCore); the framework starts them,
/// fans inbound Central messages and connection events out to them, and
/// drains whichever response channels they expose.
#[async_trait]
pub trait SensorComponent: Send + Sync {
	fn start(&self) -> Result<()> {
		Ok(())
	}

	fn stop(&self) {}

	/// Connection lifecycle notification (sync finished, offline, online).
	async fn notify(&self, _event: ComponentEvent) {}

	/// Handle one inbound message from Central. Components ignore messages
	/// that are not addressed to them by returning `Ok(())`.
	async fn process_message(&self, _msg: &MsgToSensor) -> Result<()> {
		Ok(())
	}

	/// The component's outgoing message channel, if it produces messages of
	/// its own. The receiver can be taken exactly once, at wiring time.
	fn responses(&self) -> Option<mpsc::Receiver<MsgFromSensor>> {
		None
	}
}
