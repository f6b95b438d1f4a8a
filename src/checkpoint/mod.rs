use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use log::debug;

use crate::acker::MessageAcker;
use crate::component::SensorComponent;
use crate::message::MsgToSensor;
use crate::observability::metrics;

/// Turns inbound checkpoint acknowledgements from Central into acker flush
/// calls. Messages without a checkpoint are not ours to handle.
pub struct CheckpointHandler {
	acker: Arc<MessageAcker>,
}

impl CheckpointHandler {
	pub fn new(acker: Arc<MessageAcker>) -> Self {
		Self { acker }
	}
}

#[async_trait]
impl SensorComponent for CheckpointHandler {
	async fn process_message(&self, msg: &MsgToSensor) -> Result<()> {
		match msg {
			MsgToSensor::Checkpoint(ack) => {
				debug!("central checkpointed seq {}", ack.seq);
				metrics().checkpoints_processed_total.inc();
				self.acker.ack(ack.seq)?;
				Ok(())
			}
			_ => Ok(()),
		}
	}
}
