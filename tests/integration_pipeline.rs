mod common;

use std::collections::HashMap;

use common::{RecordingStream, StaticClusterView, deployment_event};
use outpost::config::Settings;
use outpost::dedup::key::{ResourceKey, ResourceKind};
use outpost::message::{
	CheckpointAck, ComponentEvent, DeduperState, EventAction, MsgFromSensor, MsgToSensor,
};
use outpost::pipeline::SensorCore;
use outpost::stream::SensorMessageStream;

fn settings_with_wal(dir: &tempfile::TempDir) -> Settings {
	Settings {
		wal_path: dir
			.path()
			.join("dedupe.redb")
			.to_string_lossy()
			.into_owned(),
		..Settings::default()
	}
}

/// The full loop across a simulated restart: an event is sent and
/// checkpointed, the process "restarts", and the reseeded deduper
/// suppresses the unchanged resend while still forwarding a real change.
#[tokio::test]
async fn test_checkpointed_state_survives_restart() {
	let dir = tempfile::tempdir().unwrap();
	let settings = settings_with_wal(&dir);
	let live = StaticClusterView::new([ResourceKey::new(ResourceKind::Deployment, "1234")]);

	{
		let core = SensorCore::new(&settings, live.clone()).unwrap();
		core.start().unwrap();
		let stream = RecordingStream::new();
		let deduper = core.wrap_stream(stream.clone()).unwrap();

		deduper
			.send(deployment_event("1234", EventAction::Create, "api"))
			.await
			.unwrap();
		assert_eq!(core.acker().pending(), 1);

		// Central confirms everything sent so far; the WAL picks it up.
		core.process_message(&MsgToSensor::Checkpoint(CheckpointAck { seq: 1 }))
			.await
			.unwrap();
		assert_eq!(core.acker().pending(), 0);
		assert_eq!(core.wal().get_map().unwrap().len(), 1);
		core.stop();
	}

	// Restart: a new core over the same WAL seeds the next connection.
	let core = SensorCore::new(&settings, live).unwrap();
	core.start().unwrap();
	let stream = RecordingStream::new();
	let deduper = core.wrap_stream(stream.clone()).unwrap();

	deduper
		.send(deployment_event("1234", EventAction::Sync, "api"))
		.await
		.unwrap();
	assert_eq!(stream.sent_count(), 0);

	deduper
		.send(deployment_event("1234", EventAction::Sync, "api-v2"))
		.await
		.unwrap();
	assert_eq!(stream.sent_count(), 1);
}

/// An unacknowledged send is not in the WAL after a restart, so the same
/// event forwards again: at-least-once, never silently dropped.
#[tokio::test]
async fn test_unacked_send_repeats_after_restart() {
	let dir = tempfile::tempdir().unwrap();
	let settings = settings_with_wal(&dir);
	let live = StaticClusterView::new([]);

	{
		let core = SensorCore::new(&settings, live.clone()).unwrap();
		let deduper = core.wrap_stream(RecordingStream::new()).unwrap();
		deduper
			.send(deployment_event("1234", EventAction::Create, "api"))
			.await
			.unwrap();
		// No checkpoint before the "crash".
	}

	let core = SensorCore::new(&settings, live).unwrap();
	let stream = RecordingStream::new();
	let deduper = core.wrap_stream(stream.clone()).unwrap();
	deduper
		.send(deployment_event("1234", EventAction::Sync, "api"))
		.await
		.unwrap();
	assert_eq!(stream.sent_count(), 1);
}

/// Central's reported state drives reconciliation through the core's
/// message/notify fan-out, and the delete surfaces on the response channel.
#[tokio::test]
async fn test_core_reconciles_central_state() {
	let dir = tempfile::tempdir().unwrap();
	let settings = settings_with_wal(&dir);
	let live = StaticClusterView::new([ResourceKey::new(ResourceKind::Pod, "alive")]);

	let core = SensorCore::new(&settings, live).unwrap();
	core.start().unwrap();
	let mut responses = core.responses().expect("responses channel");

	let mut resource_hashes = HashMap::new();
	resource_hashes.insert("Pod:alive".to_string(), 1u64);
	resource_hashes.insert("Pod:gone".to_string(), 2u64);
	core.process_message(&MsgToSensor::DeduperState(DeduperState { resource_hashes }))
		.await
		.unwrap();
	core.notify(ComponentEvent::SyncFinished).await;

	match responses.try_recv() {
		Ok(MsgFromSensor::Event(event)) => {
			assert_eq!(event.action, EventAction::Remove);
			assert_eq!(event.key().to_string(), "Pod:gone");
		}
		other => panic!("expected one delete, got {:?}", other),
	}
	assert!(responses.try_recv().is_err());
}

/// Offline then reconnect: the notification ordering every reconnect goes
/// through must leave the reconciler quiet until fresh state arrives.
#[tokio::test]
async fn test_core_offline_then_reconnect_cycle() {
	let dir = tempfile::tempdir().unwrap();
	let settings = settings_with_wal(&dir);
	let live = StaticClusterView::new([]);

	let core = SensorCore::new(&settings, live).unwrap();
	core.start().unwrap();
	let mut responses = core.responses().expect("responses channel");

	let mut resource_hashes = HashMap::new();
	resource_hashes.insert("Deployment:stale".to_string(), 3u64);
	core.process_message(&MsgToSensor::DeduperState(DeduperState { resource_hashes }))
		.await
		.unwrap();

	core.notify(ComponentEvent::OfflineMode).await;
	core.notify(ComponentEvent::CentralReachable).await;
	core.notify(ComponentEvent::SyncFinished).await;

	assert!(responses.try_recv().is_err());
}
