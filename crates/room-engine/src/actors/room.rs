//! `RoomActor` - per-room actor that serializes all mutations for one room.
//!
//! Each `RoomActor`:
//! - Is the single writer for its room's membership set and vote ledger
//! - Runs the consensus check after every successful vote
//! - Publishes deltas in mutation order (it is the only publisher for the
//!   room and publishes before replying to the caller)
//! - Sweeps expired presence leases when a TTL is configured
//!
//! Rooms never share an actor, so operations on different rooms proceed in
//! parallel while operations on one room are strictly serialized. State is
//! persisted through the storage collaborator; the actor keeps no
//! authoritative state of its own apart from presence leases.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use crate::config::EngineConfig;
use crate::errors::EngineError;
use crate::model::{MatchRecord, RoomRecord, RoomState};
use crate::notify::{Notifier, RoomDelta};
use crate::store::{keys, Store, WriteOp};
use crate::types::{ItemId, RoomId, UserId};

use super::messages::{RoomMessage, RoomStatus, VoteOutcome};

/// Handle to a `RoomActor`.
#[derive(Clone)]
pub struct RoomActorHandle {
    sender: mpsc::Sender<RoomMessage>,
    cancel_token: CancellationToken,
    room_id: RoomId,
}

impl std::fmt::Debug for RoomActorHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RoomActorHandle")
            .field("room_id", &self.room_id)
            .finish_non_exhaustive()
    }
}

impl RoomActorHandle {
    /// Get the room ID.
    #[must_use]
    pub fn room_id(&self) -> &RoomId {
        &self.room_id
    }

    /// Join the room. Idempotent; returns the post-join membership snapshot.
    pub async fn join(&self, user: UserId) -> Result<Vec<UserId>, EngineError> {
        let (tx, rx) = oneshot::channel();
        self.sender
            .send(RoomMessage::Join {
                user,
                respond_to: tx,
            })
            .await
            .map_err(|e| EngineError::Internal(format!("channel send failed: {e}")))?;

        rx.await
            .map_err(|e| EngineError::Internal(format!("response receive failed: {e}")))?
    }

    /// Leave the room. Removing an absent participant is a no-op.
    pub async fn leave(&self, user: UserId) -> Result<(), EngineError> {
        let (tx, rx) = oneshot::channel();
        self.sender
            .send(RoomMessage::Leave {
                user,
                respond_to: tx,
            })
            .await
            .map_err(|e| EngineError::Internal(format!("channel send failed: {e}")))?;

        rx.await
            .map_err(|e| EngineError::Internal(format!("response receive failed: {e}")))?
    }

    /// Record an approval vote and run the consensus check.
    pub async fn vote(&self, user: UserId, item: ItemId) -> Result<VoteOutcome, EngineError> {
        let (tx, rx) = oneshot::channel();
        self.sender
            .send(RoomMessage::Vote {
                user,
                item,
                respond_to: tx,
            })
            .await
            .map_err(|e| EngineError::Internal(format!("channel send failed: {e}")))?;

        rx.await
            .map_err(|e| EngineError::Internal(format!("response receive failed: {e}")))?
    }

    /// Current membership snapshot. No ordering guarantee.
    pub async fn members(&self) -> Result<Vec<UserId>, EngineError> {
        let (tx, rx) = oneshot::channel();
        self.sender
            .send(RoomMessage::Members { respond_to: tx })
            .await
            .map_err(|e| EngineError::Internal(format!("channel send failed: {e}")))?;

        rx.await
            .map_err(|e| EngineError::Internal(format!("response receive failed: {e}")))?
    }

    /// Current lifecycle state and last declared match.
    pub async fn match_status(&self) -> Result<RoomStatus, EngineError> {
        let (tx, rx) = oneshot::channel();
        self.sender
            .send(RoomMessage::MatchStatus { respond_to: tx })
            .await
            .map_err(|e| EngineError::Internal(format!("channel send failed: {e}")))?;

        rx.await
            .map_err(|e| EngineError::Internal(format!("response receive failed: {e}")))?
    }

    /// Refresh a member's presence lease.
    pub async fn renew_presence(&self, user: UserId) -> Result<(), EngineError> {
        let (tx, rx) = oneshot::channel();
        self.sender
            .send(RoomMessage::RenewPresence {
                user,
                respond_to: tx,
            })
            .await
            .map_err(|e| EngineError::Internal(format!("channel send failed: {e}")))?;

        rx.await
            .map_err(|e| EngineError::Internal(format!("response receive failed: {e}")))?
    }

    /// Delete the room. Owner only; runs the full cleanup cascade.
    pub async fn delete(&self, requester: UserId) -> Result<(), EngineError> {
        let (tx, rx) = oneshot::channel();
        self.sender
            .send(RoomMessage::Delete {
                requester,
                respond_to: tx,
            })
            .await
            .map_err(|e| EngineError::Internal(format!("channel send failed: {e}")))?;

        rx.await
            .map_err(|e| EngineError::Internal(format!("response receive failed: {e}")))?
    }

    /// Cancel the room actor.
    pub fn cancel(&self) {
        self.cancel_token.cancel();
    }

    /// Check if the actor is cancelled.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancel_token.is_cancelled()
    }
}

/// The `RoomActor` implementation.
pub struct RoomActor {
    /// Room ID.
    room_id: RoomId,
    /// Message receiver.
    receiver: mpsc::Receiver<RoomMessage>,
    /// Cancellation token (child of the directory's token).
    cancel_token: CancellationToken,
    /// Storage collaborator.
    store: Arc<dyn Store>,
    /// Notification collaborator.
    notifier: Arc<dyn Notifier>,
    /// Presence lease duration; `None` disables expiry.
    presence_ttl: Option<Duration>,
    /// How often expired leases are swept.
    sweep_interval: Duration,
    /// Presence leases observed by this actor instance, refreshed on join,
    /// vote, and explicit renewal.
    leases: HashMap<UserId, Instant>,
    /// Set after the room record was deleted; all further operations answer
    /// `RoomNotFound`.
    closed: bool,
}

impl RoomActor {
    /// Spawn a new room actor.
    ///
    /// Returns a handle and the task join handle.
    pub fn spawn(
        room_id: RoomId,
        store: Arc<dyn Store>,
        notifier: Arc<dyn Notifier>,
        config: &EngineConfig,
        cancel_token: CancellationToken,
    ) -> (RoomActorHandle, JoinHandle<()>) {
        let (sender, receiver) = mpsc::channel(config.room_mailbox_buffer);

        let actor = Self {
            room_id: room_id.clone(),
            receiver,
            cancel_token: cancel_token.clone(),
            store,
            notifier,
            presence_ttl: config.presence_ttl,
            sweep_interval: config.presence_sweep_interval,
            leases: HashMap::new(),
            closed: false,
        };

        let task_handle = tokio::spawn(actor.run());

        let handle = RoomActorHandle {
            sender,
            cancel_token,
            room_id,
        };

        (handle, task_handle)
    }

    /// Run the actor message loop.
    #[instrument(skip_all, name = "engine.actor.room", fields(room_id = %self.room_id))]
    async fn run(mut self) {
        debug!(
            target: "engine.actor.room",
            room_id = %self.room_id,
            "RoomActor started"
        );

        let mut sweep = tokio::time::interval(self.sweep_interval);

        loop {
            tokio::select! {
                () = self.cancel_token.cancelled() => {
                    debug!(
                        target: "engine.actor.room",
                        room_id = %self.room_id,
                        "RoomActor received cancellation signal"
                    );
                    break;
                }

                _ = sweep.tick() => {
                    self.sweep_expired_leases().await;
                }

                msg = self.receiver.recv() => {
                    match msg {
                        Some(message) => self.handle_message(message).await,
                        None => {
                            debug!(
                                target: "engine.actor.room",
                                room_id = %self.room_id,
                                "RoomActor channel closed, exiting"
                            );
                            break;
                        }
                    }
                }
            }
        }

        debug!(
            target: "engine.actor.room",
            room_id = %self.room_id,
            "RoomActor stopped"
        );
    }

    /// Handle a single message.
    async fn handle_message(&mut self, message: RoomMessage) {
        match message {
            RoomMessage::Join { user, respond_to } => {
                let result = self.handle_join(user).await;
                let _ = respond_to.send(result);
            }

            RoomMessage::Leave { user, respond_to } => {
                let result = self.handle_leave(&user).await;
                let _ = respond_to.send(result);
            }

            RoomMessage::Vote {
                user,
                item,
                respond_to,
            } => {
                let result = self.handle_vote(user, item).await;
                let _ = respond_to.send(result);
            }

            RoomMessage::Members { respond_to } => {
                let result = self.handle_members().await;
                let _ = respond_to.send(result);
            }

            RoomMessage::MatchStatus { respond_to } => {
                let result = self.handle_match_status().await;
                let _ = respond_to.send(result);
            }

            RoomMessage::RenewPresence { user, respond_to } => {
                let result = self.handle_renew_presence(&user).await;
                let _ = respond_to.send(result);
            }

            RoomMessage::Delete {
                requester,
                respond_to,
            } => {
                let result = self.handle_delete(&requester).await;
                let deleted = result.is_ok();
                let _ = respond_to.send(result);
                if deleted {
                    // The record is gone; stop processing for this room.
                    self.cancel_token.cancel();
                }
            }
        }
    }

    /// Load the room record, failing with `RoomNotFound` if absent.
    async fn load_record(&self) -> Result<RoomRecord, EngineError> {
        if self.closed {
            return Err(EngineError::RoomNotFound);
        }

        match self.store.get(&keys::room(&self.room_id)).await? {
            Some(json) => RoomRecord::from_json(&json),
            None => Err(EngineError::RoomNotFound),
        }
    }

    /// Sorted membership snapshot from storage.
    async fn members_snapshot(&self) -> Result<Vec<UserId>, EngineError> {
        let raw = self.store.set_members(&keys::members(&self.room_id)).await?;
        let mut members: Vec<UserId> = raw.into_iter().map(UserId::from).collect();
        members.sort();
        Ok(members)
    }

    /// Writes that clear every vote entry for the room.
    fn vote_purge_ops(&self, record: &RoomRecord) -> Vec<WriteOp> {
        record
            .candidate_items
            .iter()
            .map(|item| WriteOp::Delete {
                key: keys::votes(&self.room_id, item),
            })
            .collect()
    }

    /// Handle a participant joining.
    ///
    /// The membership set, roster, and user-room index are updated in one
    /// batch so a failed join leaves no partial state behind. A join into a
    /// `Draining` room re-enters `Active` in the same batch.
    #[instrument(skip_all, fields(room_id = %self.room_id, user = %user))]
    async fn handle_join(&mut self, user: UserId) -> Result<Vec<UserId>, EngineError> {
        let mut record = self.load_record().await?;

        let before = self.store.set_members(&keys::members(&self.room_id)).await?;
        let newly_joined = !before.contains(user.as_str());

        let mut ops = vec![
            WriteOp::SetAdd {
                key: keys::members(&self.room_id),
                member: user.as_str().to_string(),
            },
            WriteOp::SetAdd {
                key: keys::roster(&self.room_id),
                member: user.as_str().to_string(),
            },
            WriteOp::SetAdd {
                key: keys::user_rooms(&user),
                member: self.room_id.as_str().to_string(),
            },
        ];

        if record.state == RoomState::Draining {
            record.state = RoomState::Active;
            ops.push(WriteOp::Put {
                key: keys::room(&self.room_id),
                value: record.to_json()?,
            });
        }

        self.store.batch(ops).await?;
        self.leases.insert(user.clone(), Instant::now());

        let mut members: Vec<UserId> = before.into_iter().map(UserId::from).collect();
        if newly_joined {
            members.push(user);
        }
        members.sort();

        // A re-entry by an existing member changes nothing, so nothing is
        // published for it.
        if newly_joined {
            self.notifier
                .publish(
                    &self.room_id,
                    RoomDelta::MembershipChanged {
                        members: members.clone(),
                    },
                )
                .await;

            info!(
                target: "engine.actor.room",
                room_id = %self.room_id,
                members = members.len(),
                "Participant joined"
            );
        }

        Ok(members)
    }

    /// Handle a participant leaving.
    ///
    /// Idempotent; leaving a room one is not in changes nothing and
    /// publishes nothing. When the last member leaves, the membership
    /// removal, the vote-ledger purge, and the `Draining` record write
    /// commit as one batch: a failed drain leaves the member in place, never
    /// an empty `Active` room with a stale ledger.
    #[instrument(skip_all, fields(room_id = %self.room_id, user = %user))]
    async fn handle_leave(&mut self, user: &UserId) -> Result<(), EngineError> {
        let mut record = self.load_record().await?;

        let before = self.store.set_members(&keys::members(&self.room_id)).await?;
        if !before.contains(user.as_str()) {
            self.leases.remove(user);
            return Ok(());
        }

        let mut members: Vec<UserId> = before
            .into_iter()
            .filter(|m| m.as_str() != user.as_str())
            .map(UserId::from)
            .collect();
        members.sort();

        let mut ops = vec![WriteOp::SetRemove {
            key: keys::members(&self.room_id),
            member: user.as_str().to_string(),
        }];

        let draining = members.is_empty() && record.state == RoomState::Active;
        if draining {
            record.state = RoomState::Draining;
            ops.extend(self.vote_purge_ops(&record));
            ops.push(WriteOp::Put {
                key: keys::room(&self.room_id),
                value: record.to_json()?,
            });
        }

        self.store.batch(ops).await?;
        self.leases.remove(user);

        self.notifier
            .publish(
                &self.room_id,
                RoomDelta::MembershipChanged {
                    members: members.clone(),
                },
            )
            .await;

        if draining {
            info!(
                target: "engine.actor.room",
                room_id = %self.room_id,
                "Last participant left, room draining, vote ledger purged"
            );
        } else {
            info!(
                target: "engine.actor.room",
                room_id = %self.room_id,
                members = members.len(),
                "Participant left"
            );
        }

        Ok(())
    }

    /// Handle an approval vote and run the consensus check.
    ///
    /// Approvals and membership are compared as sets, never by count: a
    /// departed member's stale vote must not combine with a coincidentally
    /// equal member count into a false match.
    #[instrument(skip_all, fields(room_id = %self.room_id, user = %user, item = %item))]
    async fn handle_vote(
        &mut self,
        user: UserId,
        item: ItemId,
    ) -> Result<VoteOutcome, EngineError> {
        let mut record = self.load_record().await?;

        if !record.candidate_items.contains(&item) {
            return Err(EngineError::InvalidRoom(
                "item is not on this room's ballot".to_string(),
            ));
        }

        let members_raw = self.store.set_members(&keys::members(&self.room_id)).await?;
        if !members_raw.contains(user.as_str()) {
            return Err(EngineError::NotAMember);
        }

        // The actor is the only writer, so the post-vote approval set is
        // known before anything is persisted and the consensus decision can
        // pick which write to commit.
        let votes_key = keys::votes(&self.room_id, &item);
        let mut liked_by = self.store.set_members(&votes_key).await?;
        liked_by.insert(user.as_str().to_string());

        // Exact set equality, both directions. Counts alone would let a
        // departed member's stale approval masquerade as consensus.
        if liked_by != members_raw {
            self.store.set_add(&votes_key, user.as_str()).await?;
            self.leases.insert(user.clone(), Instant::now());

            self.notifier
                .publish(
                    &self.room_id,
                    RoomDelta::VoteRecorded {
                        item: item.clone(),
                        voter: user.clone(),
                    },
                )
                .await;

            debug!(
                target: "engine.actor.room",
                room_id = %self.room_id,
                approvals = liked_by.len(),
                members = members_raw.len(),
                "Vote recorded, no consensus"
            );
            return Ok(VoteOutcome::Recorded);
        }

        let mut members: Vec<UserId> = members_raw.into_iter().map(UserId::from).collect();
        members.sort();

        record.last_match = Some(MatchRecord {
            item: item.clone(),
            members: members.clone(),
            matched_at: Utc::now().timestamp(),
        });

        // This approval completes consensus: record the match and clear
        // every vote entry in one unit. The completing vote itself is never
        // persisted only to be purged again.
        let mut ops = self.vote_purge_ops(&record);
        ops.push(WriteOp::Put {
            key: keys::room(&self.room_id),
            value: record.to_json()?,
        });
        self.store.batch(ops).await?;
        self.leases.insert(user.clone(), Instant::now());

        self.notifier
            .publish(
                &self.room_id,
                RoomDelta::VoteRecorded {
                    item: item.clone(),
                    voter: user.clone(),
                },
            )
            .await;

        self.notifier
            .publish(
                &self.room_id,
                RoomDelta::MatchDeclared {
                    item: item.clone(),
                    members: members.clone(),
                },
            )
            .await;

        info!(
            target: "engine.actor.room",
            room_id = %self.room_id,
            item = %item,
            members = members.len(),
            "Consensus match declared"
        );

        Ok(VoteOutcome::Matched { item, members })
    }

    /// Handle a membership snapshot request.
    async fn handle_members(&self) -> Result<Vec<UserId>, EngineError> {
        self.load_record().await?;
        self.members_snapshot().await
    }

    /// Handle a lifecycle status request.
    async fn handle_match_status(&self) -> Result<RoomStatus, EngineError> {
        let record = self.load_record().await?;
        Ok(RoomStatus {
            state: record.state,
            last_match: record.last_match,
        })
    }

    /// Handle a presence lease renewal.
    async fn handle_renew_presence(&mut self, user: &UserId) -> Result<(), EngineError> {
        self.load_record().await?;

        let members = self.store.set_members(&keys::members(&self.room_id)).await?;
        if !members.contains(user.as_str()) {
            return Err(EngineError::NotAMember);
        }

        self.leases.insert(user.clone(), Instant::now());
        Ok(())
    }

    /// Handle room deletion.
    ///
    /// Owner only. The record, membership set, roster, every vote entry, and
    /// every roster member's user-room index entry are removed in a single
    /// all-or-nothing batch; the roster exists precisely so this cascade
    /// never needs a full scan of all users.
    #[instrument(skip_all, fields(room_id = %self.room_id))]
    async fn handle_delete(&mut self, requester: &UserId) -> Result<(), EngineError> {
        let record = self.load_record().await?;

        if record.owner != *requester {
            warn!(
                target: "engine.actor.room",
                room_id = %self.room_id,
                "Non-owner attempted room deletion"
            );
            return Err(EngineError::NotAuthorized);
        }

        let roster = self.store.set_members(&keys::roster(&self.room_id)).await?;

        let mut ops = vec![
            WriteOp::Delete {
                key: keys::room(&self.room_id),
            },
            WriteOp::Delete {
                key: keys::members(&self.room_id),
            },
            WriteOp::Delete {
                key: keys::roster(&self.room_id),
            },
        ];
        ops.extend(self.vote_purge_ops(&record));
        for user in &roster {
            ops.push(WriteOp::SetRemove {
                key: keys::user_rooms(&UserId::from(user.as_str())),
                member: self.room_id.as_str().to_string(),
            });
        }

        self.store.batch(ops).await?;
        self.closed = true;
        self.leases.clear();

        self.notifier
            .publish(&self.room_id, RoomDelta::MembershipChanged { members: vec![] })
            .await;

        info!(
            target: "engine.actor.room",
            room_id = %self.room_id,
            index_entries = roster.len(),
            "Room deleted, cascade applied"
        );

        Ok(())
    }

    /// Remove members whose presence lease has expired.
    ///
    /// Runs the normal leave path so draining and delta publication behave
    /// exactly as an explicit leave.
    async fn sweep_expired_leases(&mut self) {
        let Some(ttl) = self.presence_ttl else {
            return;
        };
        if self.closed {
            return;
        }

        let now = Instant::now();
        let expired: Vec<UserId> = self
            .leases
            .iter()
            .filter(|(_, renewed_at)| now.duration_since(**renewed_at) >= ttl)
            .map(|(user, _)| user.clone())
            .collect();

        for user in expired {
            info!(
                target: "engine.actor.room",
                room_id = %self.room_id,
                user = %user,
                "Presence lease expired, removing participant"
            );

            if let Err(e) = self.handle_leave(&user).await {
                warn!(
                    target: "engine.actor.room",
                    room_id = %self.room_id,
                    user = %user,
                    error = %e,
                    "Lease sweep failed to remove participant"
                );
            }
        }
    }
}
