//! The connection actor: one per participant.
//!
//! [`create_participant`] registers a new connection with the hub and
//! starts two tasks over it:
//!
//! - the **read loop** decodes one envelope per inbound frame and routes
//!   it. A decode error, transport error, read timeout or clean close
//!   ends the loop, which then unregisters the participant exactly once.
//! - the **write loop** drains the participant's outbound queue onto the
//!   connection and pings the peer on a fixed heartbeat. The hub closing
//!   the queue makes it send a close frame and stop; a failed write stops
//!   it immediately.
//!
//! When the write loop stops for any reason the read loop stops with it,
//! so an evicted participant releases its connection even if the peer
//! never answers the close frame.

use std::time::Duration;

use keyroom_types::{EventEnvelope, ParticipantId};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::capture::Recorder;
use crate::codec;
use crate::config::HubConfig;
use crate::error::SessionError;
use crate::hub::{Hub, OutboundReceiver};
use crate::player::{self, ReplayOrigin};
use crate::routing::{self, Route};
use crate::transport::{Frame, FrameReader, FrameWriter};

/// A running participant.
///
/// Dropping this value does not stop the participant; its loops run
/// until the connection ends.
#[derive(Debug)]
pub struct Participant {
    /// Identity of this connection in the hub.
    pub id: ParticipantId,
    /// Display name assigned by the hub.
    pub username: String,
    read_task: JoinHandle<()>,
    write_task: JoinHandle<()>,
}

impl Participant {
    /// Wait until both loops have finished.
    ///
    /// Returns `false` if either loop panicked.
    pub async fn closed(self) -> bool {
        let mut clean = true;
        for (task, handle) in [("read", self.read_task), ("write", self.write_task)] {
            if let Err(e) = handle.await {
                warn!(participant = %self.id, task, error = %e, "Participant loop ended abnormally");
                clean = false;
            }
        }
        clean
    }
}

/// Register a newly accepted connection and start its loops.
///
/// `identity` is the display name proposed by the routing layer; the hub
/// may add a suffix to keep it unique.
///
/// # Errors
///
/// Returns [`SessionError::HubClosed`] if the hub has stopped. Nothing is
/// spawned in that case and both connection halves are dropped.
pub async fn create_participant<R, W>(
    hub: &Hub,
    reader: R,
    writer: W,
    identity: &str,
    config: &HubConfig,
) -> Result<Participant, SessionError>
where
    R: FrameReader,
    W: FrameWriter,
{
    let id = ParticipantId::new();
    let (outbound_tx, outbound_rx) = mpsc::channel(config.outbound_queue_capacity.max(1));
    let username = hub.register(id, identity, outbound_tx).await?;
    info!(participant = %id, username, "Participant connected");

    let (writer_done, writer_gone) = oneshot::channel();

    let write_task = tokio::spawn(
        WriteLoop {
            id,
            writer,
            outbound: outbound_rx,
            heartbeat: config.heartbeat_interval(),
            write_timeout: config.write_timeout(),
            _done: writer_done,
        }
        .run(),
    );

    let read_task = tokio::spawn(
        ReadLoop {
            id,
            username: username.clone(),
            reader,
            hub: hub.clone(),
            recorder: Recorder::new(),
            read_timeout: config.read_timeout(),
            max_frame_bytes: config.max_frame_bytes,
            replay_includes_sender: config.replay_includes_sender,
        }
        .run(writer_gone),
    );

    Ok(Participant {
        id,
        username,
        read_task,
        write_task,
    })
}

/// Why a read loop ended.
enum ReadExit {
    PeerClosed,
    WriterStopped,
    Failed(SessionError),
}

struct ReadLoop<R> {
    id: ParticipantId,
    username: String,
    reader: R,
    hub: Hub,
    recorder: Recorder,
    read_timeout: Duration,
    max_frame_bytes: usize,
    replay_includes_sender: bool,
}

impl<R: FrameReader> ReadLoop<R> {
    async fn run(mut self, mut writer_gone: oneshot::Receiver<()>) {
        let exit = loop {
            let next = tokio::select! {
                _ = &mut writer_gone => break ReadExit::WriterStopped,
                next = tokio::time::timeout(self.read_timeout, self.reader.next_frame()) => next,
            };
            let frame = match next {
                Err(_elapsed) => break ReadExit::Failed(SessionError::Timeout("inbound frame")),
                Ok(Err(e)) => break ReadExit::Failed(e),
                Ok(Ok(None)) => break ReadExit::PeerClosed,
                Ok(Ok(Some(frame))) => frame,
            };
            if let Err(e) = self.handle_frame(&frame).await {
                break ReadExit::Failed(e);
            }
        };

        match &exit {
            ReadExit::PeerClosed => debug!(participant = %self.id, "Peer closed connection"),
            ReadExit::WriterStopped => debug!(participant = %self.id, "Write loop stopped"),
            ReadExit::Failed(e) if e.is_decode() => {
                warn!(participant = %self.id, username = self.username, error = %e, "Malformed envelope, disconnecting");
            }
            ReadExit::Failed(e) => {
                debug!(participant = %self.id, username = self.username, error = %e, "Read failed, disconnecting");
            }
        }

        if self.hub.unregister(self.id).await.is_err() {
            debug!(participant = %self.id, "Hub already closed");
        }
        info!(participant = %self.id, username = self.username, "Participant disconnected");
        // Dropping the reader here releases this half of the transport.
    }

    async fn handle_frame(&mut self, frame: &Frame) -> Result<(), SessionError> {
        let Some(payload) = frame.payload() else {
            return Ok(());
        };
        if payload.len() > self.max_frame_bytes {
            return Err(SessionError::Transport(format!(
                "frame of {} bytes exceeds limit of {}",
                payload.len(),
                self.max_frame_bytes
            )));
        }
        let envelope = codec::decode(payload)?;
        debug!(participant = %self.id, event = %envelope.name, "Inbound envelope");
        self.dispatch(envelope).await
    }

    async fn dispatch(&mut self, envelope: EventEnvelope) -> Result<(), SessionError> {
        match routing::route(&mut self.recorder, envelope) {
            Route::Broadcast(envelope) => self.hub.broadcast(envelope, self.id, false).await,
            Route::Replay(recording) => {
                let origin = ReplayOrigin {
                    sender: self.id,
                    username: self.username.clone(),
                    include_sender: self.replay_includes_sender,
                };
                // Run to completion; the handle is not needed.
                let _ = player::spawn_replay(self.hub.clone(), origin, recording);
                Ok(())
            }
            Route::Nothing => Ok(()),
        }
    }
}

struct WriteLoop<W> {
    id: ParticipantId,
    writer: W,
    outbound: OutboundReceiver,
    heartbeat: Duration,
    write_timeout: Duration,
    /// Dropped when the loop ends, which wakes the read loop.
    _done: oneshot::Sender<()>,
}

impl<W: FrameWriter> WriteLoop<W> {
    async fn run(mut self) {
        let mut ticker = tokio::time::interval_at(Instant::now() + self.heartbeat, self.heartbeat);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let result = loop {
            tokio::select! {
                next = self.outbound.recv() => {
                    let Some(envelope) = next else {
                        debug!(participant = %self.id, "Outbound queue closed, sending close frame");
                        let timeout = self.write_timeout;
                        break with_deadline(timeout, "close frame", self.writer.close()).await;
                    };
                    let text = match codec::encode(&envelope) {
                        Ok(text) => text,
                        Err(e) => {
                            warn!(participant = %self.id, error = %e, "Failed to encode envelope, skipping");
                            continue;
                        }
                    };
                    let timeout = self.write_timeout;
                    if let Err(e) = with_deadline(timeout, "envelope write", self.writer.send_text(text)).await {
                        break Err(e);
                    }
                }
                _ = ticker.tick() => {
                    let timeout = self.write_timeout;
                    if let Err(e) = with_deadline(timeout, "heartbeat", self.writer.send_ping()).await {
                        break Err(e);
                    }
                }
            }
        };

        if let Err(e) = result {
            debug!(participant = %self.id, error = %e, "Write loop stopped");
        }
    }
}

async fn with_deadline<F>(
    deadline: Duration,
    what: &'static str,
    write: F,
) -> Result<(), SessionError>
where
    F: Future<Output = Result<(), SessionError>>,
{
    tokio::time::timeout(deadline, write)
        .await
        .map_err(|_elapsed| SessionError::Timeout(what))?
}
