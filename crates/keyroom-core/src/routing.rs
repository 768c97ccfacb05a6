//! Inbound event routing.
//!
//! [`route`] decides what an inbound envelope means for the participant
//! that sent it. It updates that participant's [`Recorder`] in place and
//! returns the one side effect the caller must perform, which keeps the
//! table below testable without a hub or a connection.
//!
//! | Event | Effect |
//! |-------|--------|
//! | `join`, `disconnect` | broadcast unchanged to everyone else |
//! | `keyboardPress` | capture if recording, then broadcast unchanged |
//! | `recordStart` | start a fresh capture unless one is running |
//! | `recordStop` | stop capturing, keep the buffer |
//! | `recordPlay` | replay a snapshot of the buffer |
//! | anything else | nothing |

use keyroom_types::{EventEnvelope, EventKind};

use crate::capture::{Recorder, Recording};

/// The side effect an inbound envelope calls for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    /// Broadcast this envelope to every other participant.
    Broadcast(EventEnvelope),
    /// Replay this snapshot to the group on a background task.
    Replay(Recording),
    /// Nothing leaves the participant.
    Nothing,
}

/// Route one inbound envelope from the participant owning `recorder`.
pub fn route(recorder: &mut Recorder, envelope: EventEnvelope) -> Route {
    match envelope.name {
        EventKind::Join | EventKind::Disconnect => Route::Broadcast(envelope),
        EventKind::KeyPress => {
            recorder.capture(&envelope);
            Route::Broadcast(envelope)
        }
        EventKind::RecordStart => {
            recorder.start();
            Route::Nothing
        }
        EventKind::RecordStop => {
            recorder.stop();
            Route::Nothing
        }
        EventKind::RecordPlay => {
            let recording = recorder.snapshot();
            if recording.is_empty() {
                Route::Nothing
            } else {
                Route::Replay(recording)
            }
        }
        EventKind::KeyPressResponse | EventKind::Unrecognized => Route::Nothing,
    }
}
