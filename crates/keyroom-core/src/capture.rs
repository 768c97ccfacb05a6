//! Per-participant capture of the participant's own key presses.
//!
//! A [`Recorder`] lives inside the participant's read loop, so it is only
//! ever touched by one task. Replay works on a [`Recording`], a frozen
//! snapshot that shares its notes without copying and is unaffected by
//! later captures.

use std::sync::Arc;

use keyroom_types::{EventEnvelope, EventKind, EventPayload};

/// One captured event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapturedNote {
    /// Kind of the captured event.
    pub kind: EventKind,
    /// Payload as it arrived; its `timestamp_millis` drives replay pacing.
    pub payload: EventPayload,
}

impl CapturedNote {
    /// Client timestamp of the note in milliseconds.
    pub const fn timestamp_millis(&self) -> i64 {
        self.payload.timestamp_millis
    }
}

/// An immutable, cheaply cloneable sequence of captured notes.
///
/// The first note anchors replay time.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Recording {
    notes: Arc<[CapturedNote]>,
}

impl Recording {
    /// The captured notes in capture order.
    pub fn notes(&self) -> &[CapturedNote] {
        &self.notes
    }

    /// Number of captured notes.
    pub fn len(&self) -> usize {
        self.notes.len()
    }

    /// Whether nothing was captured.
    pub fn is_empty(&self) -> bool {
        self.notes.is_empty()
    }
}

impl From<Vec<CapturedNote>> for Recording {
    fn from(notes: Vec<CapturedNote>) -> Self {
        Self {
            notes: notes.into(),
        }
    }
}

/// Capture state of one participant.
#[derive(Debug, Default)]
pub struct Recorder {
    recording: bool,
    notes: Vec<CapturedNote>,
}

impl Recorder {
    /// A recorder that is not recording and holds nothing.
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether key presses are currently being captured.
    pub const fn is_recording(&self) -> bool {
        self.recording
    }

    /// Number of notes in the current buffer.
    pub fn len(&self) -> usize {
        self.notes.len()
    }

    /// Whether the current buffer is empty.
    pub fn is_empty(&self) -> bool {
        self.notes.is_empty()
    }

    /// Begin a new capture, discarding the previous buffer.
    ///
    /// Returns `false` and leaves the buffer alone if a capture is
    /// already running.
    pub fn start(&mut self) -> bool {
        if self.recording {
            return false;
        }
        self.recording = true;
        self.notes.clear();
        true
    }

    /// Stop capturing. The buffer is kept for replay.
    ///
    /// Returns whether a capture was running.
    pub fn stop(&mut self) -> bool {
        std::mem::replace(&mut self.recording, false)
    }

    /// Append `envelope` if a capture is running. Returns whether it was
    /// captured.
    pub fn capture(&mut self, envelope: &EventEnvelope) -> bool {
        if !self.recording {
            return false;
        }
        self.notes.push(CapturedNote {
            kind: envelope.name,
            payload: envelope.payload.clone(),
        });
        true
    }

    /// Freeze the current buffer into a [`Recording`].
    pub fn snapshot(&self) -> Recording {
        Recording::from(self.notes.clone())
    }
}
