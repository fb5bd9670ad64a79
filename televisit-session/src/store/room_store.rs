use async_trait::async_trait;
use chrono::{DateTime, Utc};
use televisit_core::{AppointmentId, CandidateDoc, RoomDoc, RoomId, RoomStatus, SessionBlob, UserId};
use thiserror::Error;
use tokio::sync::mpsc;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error(transparent)]
    Backend(#[from] anyhow::Error),
}

/// One change notification from a room-document subscription.
#[derive(Debug, Clone)]
pub enum RoomEvent {
    /// The document changed; this is the full post-change state.
    Snapshot(RoomDoc),
    /// The document was deleted.
    Removed,
}

/// A partial update of the room document. Unset fields are left alone;
/// the `clear_*` flags delete their field outright (the store has no
/// notion of null), and `stamp_ended_at` asks for a server-assigned
/// timestamp. Participant changes are set-ops so concurrent joins from
/// two clients cannot duplicate or clobber each other.
#[derive(Debug, Default, Clone)]
pub struct RoomPatch {
    pub status: Option<RoomStatus>,
    pub receiver_id: Option<UserId>,
    pub appointment_id: Option<AppointmentId>,
    pub participants: Option<Vec<UserId>>,
    pub add_participant: Option<UserId>,
    pub remove_participant: Option<UserId>,
    pub offer: Option<SessionBlob>,
    pub answer: Option<SessionBlob>,
    pub clear_offer: bool,
    pub clear_answer: bool,
    pub revoked_by: Option<UserId>,
    pub stamp_ended_at: bool,
}

impl RoomPatch {
    /// Merge semantics shared by every backend, so the in-memory store
    /// used in tests agrees with what a production adapter would do.
    pub fn apply_to(&self, doc: &mut RoomDoc, server_time: DateTime<Utc>) {
        if let Some(status) = self.status {
            doc.status = status;
        }
        if let Some(receiver) = &self.receiver_id {
            doc.receiver_id = Some(receiver.clone());
        }
        if let Some(appointment) = &self.appointment_id {
            doc.appointment_id = Some(appointment.clone());
        }
        if let Some(participants) = &self.participants {
            doc.participants.clear();
            for p in participants {
                if !doc.participants.contains(p) {
                    doc.participants.push(p.clone());
                }
            }
        }
        if let Some(user) = &self.add_participant {
            if !doc.participants.contains(user) {
                doc.participants.push(user.clone());
            }
        }
        if let Some(user) = &self.remove_participant {
            doc.participants.retain(|p| p != user);
        }
        if let Some(offer) = &self.offer {
            doc.offer = Some(offer.clone());
        }
        if let Some(answer) = &self.answer {
            doc.answer = Some(answer.clone());
        }
        if self.clear_offer {
            doc.offer = None;
        }
        if self.clear_answer {
            doc.answer = None;
        }
        if let Some(user) = &self.revoked_by {
            doc.revoked_by = Some(user.clone());
        }
        if self.stamp_ended_at {
            doc.ended_at = Some(server_time);
        }
    }
}

/// The document store the call subsystem is built on: point reads and
/// patch writes of the room document, whole-document delete, an
/// append-only candidate sub-collection, and change subscriptions
/// delivered over mpsc channels. Dropping a receiver unsubscribes.
///
/// Applying a patch to a missing document is a no-op: the document may
/// legitimately disappear (revoke) between a read and the write that
/// followed it.
#[async_trait]
pub trait RoomStore: Send + Sync {
    async fn get(&self, room: &RoomId) -> Result<Option<RoomDoc>, StoreError>;

    async fn apply(&self, room: &RoomId, patch: RoomPatch) -> Result<(), StoreError>;

    async fn delete(&self, room: &RoomId) -> Result<(), StoreError>;

    async fn add_candidate(&self, room: &RoomId, candidate: CandidateDoc)
    -> Result<(), StoreError>;

    async fn watch_room(&self, room: &RoomId) -> Result<mpsc::Receiver<RoomEvent>, StoreError>;

    async fn watch_candidates(
        &self,
        room: &RoomId,
    ) -> Result<mpsc::Receiver<CandidateDoc>, StoreError>;
}
