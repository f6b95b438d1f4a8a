use anyhow::Result;
use async_trait::async_trait;

use crate::message::MsgFromSensor;

/// Write side of the Sensor → Central message stream.
///
/// The concrete transport (gRPC stream, test double, ...) lives outside this
/// crate; decorators such as the [`Deduper`](crate::dedup::Deduper) wrap a
/// stream and delegate to it. A `send` error means the current connection is
/// done for: callers terminate their message loop and the surrounding
/// framework reconnects and re-seeds.
#[async_trait]
pub trait SensorMessageStream: Send + Sync {
	async fn send(&self, msg: MsgFromSensor) -> Result<()>;
}
