//! End-to-end tests of participants talking through a hub.
//!
//! Each participant is driven over an in-memory transport: the test
//! pushes [`Frame`]s into the read half and inspects everything the
//! write half emitted.

#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::unreachable,
    clippy::indexing_slicing
)]

use std::time::Duration;

use keyroom_core::{
    Frame, FrameReader, FrameWriter, Hub, HubConfig, Participant, SessionError,
    create_participant,
};
use keyroom_types::{EventEnvelope, EventKind, EventPayload};
use tokio::sync::mpsc;

// =========================================================================
// In-memory transport
// =========================================================================

/// What the write half of a connection emitted.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Sent {
    Envelope(EventEnvelope),
    Ping,
    Close,
}

struct MemoryReader {
    frames: mpsc::Receiver<Frame>,
}

impl FrameReader for MemoryReader {
    async fn next_frame(&mut self) -> Result<Option<Frame>, SessionError> {
        Ok(self.frames.recv().await)
    }
}

struct MemoryWriter {
    sent: mpsc::UnboundedSender<Sent>,
    stalled: bool,
}

impl MemoryWriter {
    fn push(&self, item: Sent) -> Result<(), SessionError> {
        self.sent
            .send(item)
            .map_err(|e| SessionError::Transport(e.to_string()))
    }
}

impl FrameWriter for MemoryWriter {
    async fn send_text(&mut self, text: String) -> Result<(), SessionError> {
        if self.stalled {
            std::future::pending::<()>().await;
        }
        let envelope = serde_json::from_str(&text).map_err(SessionError::Decode)?;
        self.push(Sent::Envelope(envelope))
    }

    async fn send_ping(&mut self) -> Result<(), SessionError> {
        self.push(Sent::Ping)
    }

    async fn close(&mut self) -> Result<(), SessionError> {
        self.push(Sent::Close)
    }
}

/// A writer with a bug: it panics on the first envelope.
struct PanickingWriter;

impl FrameWriter for PanickingWriter {
    async fn send_text(&mut self, _text: String) -> Result<(), SessionError> {
        panic!("writer bug");
    }

    async fn send_ping(&mut self) -> Result<(), SessionError> {
        Ok(())
    }

    async fn close(&mut self) -> Result<(), SessionError> {
        Ok(())
    }
}

/// The far end of one participant's connection.
struct Client {
    frames: Option<mpsc::Sender<Frame>>,
    sent: mpsc::UnboundedReceiver<Sent>,
    participant: Option<Participant>,
    name: String,
}

impl Client {
    async fn connect(hub: &Hub, name: &str, config: &HubConfig) -> Self {
        Self::connect_with(hub, name, config, false).await
    }

    async fn connect_with(hub: &Hub, name: &str, config: &HubConfig, stalled: bool) -> Self {
        let (frames_tx, frames_rx) = mpsc::channel(64);
        let (sent_tx, sent_rx) = mpsc::unbounded_channel();
        let participant = create_participant(
            hub,
            MemoryReader { frames: frames_rx },
            MemoryWriter {
                sent: sent_tx,
                stalled,
            },
            name,
            config,
        )
        .await
        .unwrap();
        Self {
            frames: Some(frames_tx),
            sent: sent_rx,
            name: participant.username.clone(),
            participant: Some(participant),
        }
    }

    async fn send_text(&self, text: String) {
        self.frames
            .as_ref()
            .expect("connection already closed")
            .send(Frame::Text(text))
            .await
            .unwrap();
    }

    async fn send(&self, envelope: &EventEnvelope) {
        self.send_text(serde_json::to_string(envelope).unwrap()).await;
    }

    async fn control(&self, kind: EventKind) {
        self.send(&EventEnvelope::new(kind, EventPayload::default()))
            .await;
    }

    /// Next thing the write half emitted, skipping heartbeats.
    async fn next(&mut self) -> Option<Sent> {
        loop {
            let item = tokio::time::timeout(Duration::from_secs(2), self.sent.recv())
                .await
                .ok()??;
            if item != Sent::Ping {
                return Some(item);
            }
        }
    }

    async fn next_envelope(&mut self) -> EventEnvelope {
        match self.next().await {
            Some(Sent::Envelope(envelope)) => envelope,
            other => unreachable!("expected an envelope, got {other:?}"),
        }
    }

    /// Assert nothing but heartbeats arrives for a short while.
    async fn assert_quiet(&mut self) {
        let waited = tokio::time::timeout(Duration::from_millis(100), async {
            loop {
                match self.sent.recv().await {
                    Some(Sent::Ping) => {}
                    other => return other,
                }
            }
        })
        .await;
        assert!(waited.is_err(), "unexpected output: {waited:?}");
    }

    /// Close the connection from the peer side and wait for teardown.
    async fn hang_up(&mut self) {
        self.frames = None;
        if let Some(participant) = self.participant.take() {
            assert!(participant.closed().await);
        }
    }
}

fn assert_join(envelope: &EventEnvelope, name: &str) {
    assert_eq!(envelope.name, EventKind::Join);
    assert_eq!(envelope.user(), name);
}

fn assert_disconnect(envelope: &EventEnvelope, name: &str) {
    assert_eq!(envelope.name, EventKind::Disconnect);
    assert_eq!(envelope.user(), name);
}

// =========================================================================
// Tests
// =========================================================================

#[tokio::test]
async fn three_participants_join_press_and_leave() {
    let config = HubConfig::default();
    let (hub, _) = Hub::spawn(&config);

    let mut a = Client::connect(&hub, "ada", &config).await;
    let mut b = Client::connect(&hub, "bo", &config).await;
    let mut c = Client::connect(&hub, "cy", &config).await;

    assert_join(&a.next_envelope().await, "bo");
    assert_join(&a.next_envelope().await, "cy");
    assert_join(&b.next_envelope().await, "cy");

    a.send(&EventEnvelope::key_press("ada", "x", 1000)).await;
    for peer in [&mut b, &mut c] {
        let press = peer.next_envelope().await;
        assert_eq!(press.name, EventKind::KeyPress);
        assert_eq!(press.payload.message, "x");
        assert_eq!(press.payload.timestamp_millis, 1000);
    }

    a.hang_up().await;
    assert_disconnect(&b.next_envelope().await, "ada");
    assert_disconnect(&c.next_envelope().await, "ada");

    b.send(&EventEnvelope::key_press("bo", "y", 1001)).await;
    assert_eq!(c.next_envelope().await.payload.message, "y");
    b.assert_quiet().await;

    // ada heard nothing of its own press and got a close frame.
    assert_eq!(a.next().await, Some(Sent::Close));
    assert_eq!(hub.members().await.unwrap(), vec!["bo", "cy"]);
}

#[tokio::test]
async fn each_peer_receives_a_press_exactly_once() {
    let config = HubConfig::default();
    let (hub, _) = Hub::spawn(&config);

    let mut a = Client::connect(&hub, "ada", &config).await;
    let mut b = Client::connect(&hub, "bo", &config).await;
    assert_join(&a.next_envelope().await, "bo");

    a.send(&EventEnvelope::key_press("ada", "C4", 5)).await;
    assert_eq!(b.next_envelope().await.payload.message, "C4");
    b.assert_quiet().await;
    a.assert_quiet().await;
}

#[tokio::test]
async fn malformed_frame_disconnects_only_the_sender() {
    let config = HubConfig::default();
    let (hub, _) = Hub::spawn(&config);

    let mut a = Client::connect(&hub, "ada", &config).await;
    let mut b = Client::connect(&hub, "bo", &config).await;
    assert_join(&a.next_envelope().await, "bo");

    b.send_text(String::from("{ this is not json")).await;

    assert_disconnect(&a.next_envelope().await, "bo");
    assert_eq!(b.next().await, Some(Sent::Close));
    assert_eq!(hub.members().await.unwrap(), vec!["ada"]);
}

#[tokio::test]
async fn unknown_events_are_ignored() {
    let config = HubConfig::default();
    let (hub, _) = Hub::spawn(&config);

    let mut a = Client::connect(&hub, "ada", &config).await;
    let mut b = Client::connect(&hub, "bo", &config).await;
    assert_join(&a.next_envelope().await, "bo");

    b.send_text(String::from(
        r#"{"eventName":"sustainPedal","eventPayload":{"username":"bo"}}"#,
    ))
    .await;
    b.send(&EventEnvelope::key_press("bo", "after", 1)).await;

    assert_eq!(a.next_envelope().await.payload.message, "after");
    assert_eq!(hub.members().await.unwrap(), vec!["ada", "bo"]);
}

#[tokio::test]
async fn oversized_frame_disconnects() {
    let config = HubConfig {
        max_frame_bytes: 64,
        ..HubConfig::default()
    };
    let (hub, _) = Hub::spawn(&config);

    let mut a = Client::connect(&hub, "ada", &config).await;
    let mut b = Client::connect(&hub, "bo", &config).await;
    assert_join(&a.next_envelope().await, "bo");

    b.send(&EventEnvelope::key_press("bo", "x".repeat(100), 1)).await;
    assert_disconnect(&a.next_envelope().await, "bo");
    assert_eq!(b.next().await, Some(Sent::Close));
}

#[tokio::test]
async fn stalled_consumer_is_evicted_and_others_keep_receiving() {
    let config = HubConfig {
        outbound_queue_capacity: 2,
        ..HubConfig::default()
    };
    let (hub, _) = Hub::spawn(&config);

    let mut sender = Client::connect(&hub, "ada", &config).await;
    let stalled = Client::connect_with(&hub, "slow", &config, true).await;
    let mut fast = Client::connect(&hub, "fast", &config).await;
    assert_join(&sender.next_envelope().await, "slow");
    assert_join(&sender.next_envelope().await, "fast");

    for i in 0..4 {
        sender
            .send(&EventEnvelope::key_press("ada", format!("n{i}"), i))
            .await;
    }

    // The stalled writer may or may not have drained its first envelope,
    // so the eviction lands somewhere among the presses.
    let mut presses = Vec::new();
    let mut departures = Vec::new();
    for _ in 0..5 {
        let envelope = fast.next_envelope().await;
        match envelope.name {
            EventKind::KeyPress => presses.push(envelope.payload.message),
            _ => departures.push(envelope),
        }
    }
    assert_eq!(presses, vec!["n0", "n1", "n2", "n3"]);
    assert_eq!(departures.len(), 1);
    assert_disconnect(&departures[0], "slow");
    assert_disconnect(&sender.next_envelope().await, "slow");
    assert_eq!(hub.members().await.unwrap(), vec!["ada", "fast"]);
    drop(stalled);
}

#[tokio::test(start_paused = true)]
async fn recording_replays_with_original_timing() {
    let config = HubConfig::default();
    let (hub, _) = Hub::spawn(&config);

    let mut player = Client::connect(&hub, "ada", &config).await;
    let mut listener = Client::connect(&hub, "bo", &config).await;
    assert_join(&player.next_envelope().await, "bo");

    player.control(EventKind::RecordStart).await;
    for (key, time) in [("k1", 0), ("k2", 100), ("k3", 250)] {
        player.send(&EventEnvelope::key_press("ada", key, time)).await;
        assert_eq!(listener.next_envelope().await.payload.message, key);
    }
    player.control(EventKind::RecordStop).await;

    let start = tokio::time::Instant::now();
    player.control(EventKind::RecordPlay).await;

    let mut elapsed = Vec::new();
    for key in ["k1", "k2", "k3"] {
        let replayed = listener.next_envelope().await;
        assert_eq!(replayed.payload.message, key);
        assert_eq!(replayed.user(), "ada");
        elapsed.push(start.elapsed().as_millis());
    }
    assert!(elapsed[0] <= 5, "k1 at {}ms", elapsed[0]);
    assert!((100..=105).contains(&elapsed[1]), "k2 at {}ms", elapsed[1]);
    assert!((250..=255).contains(&elapsed[2]), "k3 at {}ms", elapsed[2]);

    // The recording participant does not hear its own replay by default.
    player.assert_quiet().await;
}

#[tokio::test]
async fn play_with_nothing_recorded_is_silent() {
    let config = HubConfig::default();
    let (hub, _) = Hub::spawn(&config);

    let mut player = Client::connect(&hub, "ada", &config).await;
    let mut listener = Client::connect(&hub, "bo", &config).await;
    assert_join(&player.next_envelope().await, "bo");

    player.control(EventKind::RecordPlay).await;
    listener.assert_quiet().await;
    assert_eq!(hub.members().await.unwrap(), vec!["ada", "bo"]);
}

#[tokio::test(start_paused = true)]
async fn replay_survives_a_new_recording() {
    let config = HubConfig::default();
    let (hub, _) = Hub::spawn(&config);

    let mut player = Client::connect(&hub, "ada", &config).await;
    let mut listener = Client::connect(&hub, "bo", &config).await;
    assert_join(&player.next_envelope().await, "bo");

    player.control(EventKind::RecordStart).await;
    player.send(&EventEnvelope::key_press("ada", "old1", 0)).await;
    player.send(&EventEnvelope::key_press("ada", "old2", 500)).await;
    player.control(EventKind::RecordStop).await;
    assert_eq!(listener.next_envelope().await.payload.message, "old1");
    assert_eq!(listener.next_envelope().await.payload.message, "old2");

    player.control(EventKind::RecordPlay).await;
    assert_eq!(listener.next_envelope().await.payload.message, "old1");

    // A fresh recording while the replay waits must not change it.
    player.control(EventKind::RecordStart).await;
    player.send(&EventEnvelope::key_press("ada", "new", 10)).await;
    assert_eq!(listener.next_envelope().await.payload.message, "new");
    assert_eq!(listener.next_envelope().await.payload.message, "old2");
}

#[tokio::test(start_paused = true)]
async fn silent_peer_gets_heartbeats_then_times_out() {
    let config = HubConfig::default();
    let (hub, _) = Hub::spawn(&config);

    let mut silent = Client::connect(&hub, "bo", &config).await;

    let start = tokio::time::Instant::now();
    assert_eq!(silent.sent.recv().await, Some(Sent::Ping));
    assert!(start.elapsed() >= config.heartbeat_interval());

    // The peer never sends a frame, so the read deadline expires.
    let closing = loop {
        match silent.sent.recv().await {
            Some(Sent::Ping) => {}
            other => break other,
        }
    };
    assert_eq!(closing, Some(Sent::Close));
    assert!(start.elapsed() >= config.read_timeout());
    assert!(hub.members().await.unwrap().is_empty());
}

#[tokio::test]
async fn liveness_frames_are_not_envelopes() {
    let config = HubConfig::default();
    let (hub, _) = Hub::spawn(&config);

    let mut a = Client::connect(&hub, "ada", &config).await;
    let b = Client::connect(&hub, "bo", &config).await;
    assert_join(&a.next_envelope().await, "bo");

    b.frames.as_ref().unwrap().send(Frame::Liveness).await.unwrap();
    a.assert_quiet().await;
    assert_eq!(hub.members().await.unwrap(), vec!["ada", "bo"]);
}

#[tokio::test]
async fn duplicate_identity_gets_suffix() {
    let config = HubConfig::default();
    let (hub, _) = Hub::spawn(&config);

    let mut first = Client::connect(&hub, "ada", &config).await;
    let second = Client::connect(&hub, "ada", &config).await;
    assert_eq!(second.name, "ada-2");
    assert_join(&first.next_envelope().await, "ada-2");
}

#[tokio::test]
async fn panicking_writer_is_reported_and_torn_down() {
    let config = HubConfig::default();
    let (hub, _) = Hub::spawn(&config);

    let mut watcher = Client::connect(&hub, "obs", &config).await;
    let (frames_tx, frames_rx) = mpsc::channel(4);
    let broken = create_participant(
        &hub,
        MemoryReader { frames: frames_rx },
        PanickingWriter,
        "bad",
        &config,
    )
    .await
    .unwrap();
    assert_join(&watcher.next_envelope().await, "bad");

    watcher.send(&EventEnvelope::key_press("obs", "x", 1)).await;

    let clean = tokio::time::timeout(Duration::from_secs(2), broken.closed())
        .await
        .expect("participant never finished");
    assert!(!clean);
    assert_disconnect(&watcher.next_envelope().await, "bad");
    assert_eq!(hub.members().await.unwrap(), vec!["obs"]);
    drop(frames_tx);
}
