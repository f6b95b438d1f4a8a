pub mod event;

pub use event::{
	AlertResults, CheckpointAck, ComponentEvent, DeduperState, DetectionStage, EventAction,
	MsgFromSensor, MsgToSensor, Resource, ResourcesSynced, SensorEvent,
};
