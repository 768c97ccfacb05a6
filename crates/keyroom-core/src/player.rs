//! Timed replay of a [`Recording`] to the group.
//!
//! The first note goes out immediately. Every later note waits for the
//! gap between its timestamp and its predecessor's, clamped at zero, so
//! the group hears the original typing cadence. Offsets are accumulated
//! from one start instant so scheduler jitter does not build up over a
//! long recording.
//!
//! A replay runs on its own task and always runs to completion. Several
//! replays may overlap; their notes interleave in whatever order the hub
//! admits them.

use std::time::Duration;

use keyroom_types::{EventEnvelope, ParticipantId};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, info};

use crate::capture::{CapturedNote, Recording};
use crate::hub::Hub;

/// Who a replay is sent on behalf of.
#[derive(Debug, Clone)]
pub struct ReplayOrigin {
    /// The participant that recorded the notes.
    pub sender: ParticipantId,
    /// Display name stamped on every replayed note.
    pub username: String,
    /// Whether the recording participant also hears the replay.
    pub include_sender: bool,
}

/// Offset from replay start at which each note is due.
///
/// The first note is due at zero. Out-of-order timestamps contribute no
/// delay rather than a negative one.
pub fn schedule(recording: &Recording) -> Vec<(Duration, &CapturedNote)> {
    let mut offset_ms: u64 = 0;
    let mut previous: Option<i64> = None;
    recording
        .notes()
        .iter()
        .map(|note| {
            let time = note.timestamp_millis();
            if let Some(prev) = previous {
                let gap = u64::try_from(time.saturating_sub(prev)).unwrap_or(0);
                offset_ms = offset_ms.saturating_add(gap);
            }
            previous = Some(time);
            (Duration::from_millis(offset_ms), note)
        })
        .collect()
}

/// Start replaying `recording` on a background task.
///
/// Returns `None` without spawning anything when the recording is empty.
pub fn spawn_replay(hub: Hub, origin: ReplayOrigin, recording: Recording) -> Option<JoinHandle<()>> {
    if recording.is_empty() {
        debug!(participant = %origin.sender, "Nothing recorded, replay skipped");
        return None;
    }
    Some(tokio::spawn(replay(hub, origin, recording)))
}

async fn replay(hub: Hub, origin: ReplayOrigin, recording: Recording) {
    info!(participant = %origin.sender, username = origin.username, notes = recording.len(), "Replay started");
    let start = Instant::now();

    for (offset, note) in schedule(&recording) {
        if !offset.is_zero() {
            tokio::time::sleep_until(start + offset).await;
        }
        let envelope = EventEnvelope::key_press(
            origin.username.clone(),
            note.payload.message.clone(),
            note.timestamp_millis(),
        );
        if hub
            .broadcast(envelope, origin.sender, origin.include_sender)
            .await
            .is_err()
        {
            debug!(participant = %origin.sender, "Hub closed, replay abandoned");
            return;
        }
    }

    info!(participant = %origin.sender, username = origin.username, "Replay finished");
}
