//! The hub: single owner of session membership and broadcast fan-out.
//!
//! All membership state lives inside one Tokio task. Everything else
//! holds a cloneable [`Hub`] handle and talks to that task over a
//! bounded request channel, so the membership map is never touched from
//! two places at once and no lock is needed.
//!
//! # Delivery policy
//!
//! Each participant has a bounded outbound queue. The hub fills it with
//! `try_send` and never waits: if a recipient's queue is full (or its
//! writer is gone) the delivery is dropped and that recipient is evicted
//! exactly as if it had unregistered. One slow consumer therefore never
//! stalls the broadcaster or anyone else.
//!
//! # Per-participant lifecycle
//!
//! `Unregistered -> Registered -> (Evicted | Unregistered)`. Removing a
//! member drops the hub's end of its outbound queue, which the
//! participant's write loop reads as a clean shutdown.

use std::collections::{BTreeMap, VecDeque};
use std::sync::Arc;

use chrono::Utc;
use keyroom_types::{EventEnvelope, ParticipantId};
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::config::HubConfig;
use crate::error::SessionError;

/// Sending end of a participant's outbound queue. Owned by the hub.
pub type OutboundSender = mpsc::Sender<Arc<EventEnvelope>>;

/// Receiving end of a participant's outbound queue. Owned by the
/// participant's write loop.
pub type OutboundReceiver = mpsc::Receiver<Arc<EventEnvelope>>;

/// Requests accepted by the hub task.
#[derive(Debug)]
enum HubCommand {
    Register {
        id: ParticipantId,
        name: String,
        outbound: OutboundSender,
        reply: oneshot::Sender<String>,
    },
    Unregister {
        id: ParticipantId,
    },
    Broadcast {
        envelope: Arc<EventEnvelope>,
        sender: ParticipantId,
        include_sender: bool,
    },
    Members {
        reply: oneshot::Sender<Vec<String>>,
    },
}

/// Cloneable handle to the hub task.
///
/// The hub task runs until every handle has been dropped.
#[derive(Debug, Clone)]
pub struct Hub {
    tx: mpsc::Sender<HubCommand>,
}

impl Hub {
    /// Spawn the hub task and return a handle to it.
    pub fn spawn(config: &HubConfig) -> (Self, JoinHandle<()>) {
        let (tx, rx) = mpsc::channel(config.request_queue_capacity.max(1));
        let handle = tokio::spawn(HubTask::default().run(rx));
        (Self { tx }, handle)
    }

    /// Add a participant and announce it to everyone else.
    ///
    /// `name` is the identity proposed by the routing layer. If another
    /// member already uses it, the hub appends `-2`, `-3`, ... and
    /// returns the name actually assigned.
    ///
    /// Registering an id that is already a member changes nothing; the
    /// existing name is returned and `outbound` is dropped.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::HubClosed`] if the hub task has stopped.
    pub async fn register(
        &self,
        id: ParticipantId,
        name: impl Into<String>,
        outbound: OutboundSender,
    ) -> Result<String, SessionError> {
        let (reply, assigned) = oneshot::channel();
        self.send(HubCommand::Register {
            id,
            name: name.into(),
            outbound,
            reply,
        })
        .await?;
        assigned.await.map_err(|_dropped| SessionError::HubClosed)
    }

    /// Remove a participant, close its queue and announce the departure.
    ///
    /// Unknown or already removed ids are ignored.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::HubClosed`] if the hub task has stopped.
    pub async fn unregister(&self, id: ParticipantId) -> Result<(), SessionError> {
        self.send(HubCommand::Unregister { id }).await
    }

    /// Queue `envelope` for every member except `sender`, or for every
    /// member including `sender` when `include_sender` is set.
    ///
    /// `sender` does not have to be a member; a replay keeps broadcasting
    /// after its participant has left.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::HubClosed`] if the hub task has stopped.
    pub async fn broadcast(
        &self,
        envelope: EventEnvelope,
        sender: ParticipantId,
        include_sender: bool,
    ) -> Result<(), SessionError> {
        self.send(HubCommand::Broadcast {
            envelope: Arc::new(envelope),
            sender,
            include_sender,
        })
        .await
    }

    /// Display names of the current members, sorted.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::HubClosed`] if the hub task has stopped.
    pub async fn members(&self) -> Result<Vec<String>, SessionError> {
        let (reply, names) = oneshot::channel();
        self.send(HubCommand::Members { reply }).await?;
        names.await.map_err(|_dropped| SessionError::HubClosed)
    }

    async fn send(&self, command: HubCommand) -> Result<(), SessionError> {
        self.tx
            .send(command)
            .await
            .map_err(|_rejected| SessionError::HubClosed)
    }
}

/// A registered participant as the hub sees it.
#[derive(Debug)]
struct Member {
    name: String,
    outbound: OutboundSender,
}

/// A broadcast waiting to be fanned out.
struct Delivery {
    envelope: Arc<EventEnvelope>,
    sender: ParticipantId,
    include_sender: bool,
}

/// State owned by the hub task.
#[derive(Debug, Default)]
struct HubTask {
    members: BTreeMap<ParticipantId, Member>,
}

impl HubTask {
    async fn run(mut self, mut rx: mpsc::Receiver<HubCommand>) {
        info!("Hub started");
        while let Some(command) = rx.recv().await {
            self.handle(command);
        }
        info!(members = self.members.len(), "Hub stopped, all handles dropped");
    }

    fn handle(&mut self, command: HubCommand) {
        match command {
            HubCommand::Register {
                id,
                name,
                outbound,
                reply,
            } => {
                let assigned = self.register(id, &name, outbound);
                // The caller may have given up waiting; its queue receiver
                // is gone too, so the next broadcast evicts it.
                let _ = reply.send(assigned);
            }
            HubCommand::Unregister { id } => self.unregister(id),
            HubCommand::Broadcast {
                envelope,
                sender,
                include_sender,
            } => self.broadcast(Delivery {
                envelope,
                sender,
                include_sender,
            }),
            HubCommand::Members { reply } => {
                let mut names: Vec<String> =
                    self.members.values().map(|m| m.name.clone()).collect();
                names.sort_unstable();
                let _ = reply.send(names);
            }
        }
    }

    fn register(&mut self, id: ParticipantId, requested: &str, outbound: OutboundSender) -> String {
        if let Some(existing) = self.members.get(&id) {
            debug!(participant = %id, username = existing.name, "Ignoring duplicate registration");
            return existing.name.clone();
        }

        let name = self.unique_name(requested);
        self.members.insert(
            id,
            Member {
                name: name.clone(),
                outbound,
            },
        );
        info!(participant = %id, username = name, members = self.members.len(), "Participant registered");

        self.broadcast(Delivery {
            envelope: Arc::new(EventEnvelope::join(name.clone(), now_millis())),
            sender: id,
            include_sender: false,
        });
        name
    }

    fn unregister(&mut self, id: ParticipantId) {
        let Some(member) = self.members.remove(&id) else {
            debug!(participant = %id, "Ignoring unregister for non-member");
            return;
        };
        info!(participant = %id, username = member.name, members = self.members.len(), "Participant unregistered");
        self.broadcast(departure(id, member));
    }

    /// Fan out a delivery, then fan out a disconnect for every member the
    /// delivery evicted, and so on until nothing more is evicted.
    fn broadcast(&mut self, first: Delivery) {
        let mut pending = VecDeque::from([first]);
        while let Some(delivery) = pending.pop_front() {
            for id in self.deliver(&delivery) {
                if let Some(member) = self.members.remove(&id) {
                    warn!(participant = %id, username = member.name, members = self.members.len(), "Evicted unresponsive participant");
                    pending.push_back(departure(id, member));
                }
            }
        }
    }

    /// Try to queue one envelope for every recipient. Returns the members
    /// whose queue could not take it.
    fn deliver(&self, delivery: &Delivery) -> Vec<ParticipantId> {
        let mut evicted = Vec::new();
        for (id, member) in &self.members {
            if *id == delivery.sender && !delivery.include_sender {
                continue;
            }
            match member.outbound.try_send(Arc::clone(&delivery.envelope)) {
                Ok(()) => {}
                Err(TrySendError::Full(_)) => {
                    debug!(participant = %id, event = %delivery.envelope.name, "Outbound queue full");
                    evicted.push(*id);
                }
                Err(TrySendError::Closed(_)) => {
                    debug!(participant = %id, event = %delivery.envelope.name, "Outbound queue closed");
                    evicted.push(*id);
                }
            }
        }
        evicted
    }

    fn unique_name(&self, requested: &str) -> String {
        let taken = |candidate: &str| self.members.values().any(|m| m.name == candidate);
        if !taken(requested) {
            return requested.to_owned();
        }
        let mut suffix: u32 = 2;
        loop {
            let candidate = format!("{requested}-{suffix}");
            if !taken(&candidate) {
                return candidate;
            }
            suffix = suffix.saturating_add(1);
        }
    }
}

/// Build the disconnect announcement for a removed member. Dropping the
/// member here closes its outbound queue.
fn departure(id: ParticipantId, member: Member) -> Delivery {
    let Member { name, outbound } = member;
    drop(outbound);
    Delivery {
        envelope: Arc::new(EventEnvelope::disconnect(name, now_millis())),
        sender: id,
        include_sender: false,
    }
}

fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}
