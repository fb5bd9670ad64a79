use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;
use std::sync::Arc;
use televisit_core::{CandidateDoc, RoomDoc, RoomId};
use televisit_session::{RoomEvent, RoomPatch, RoomStore, StoreError};
use tokio::sync::mpsc;

/// In-memory document store with change notification, standing in for
/// the hosted backend. Subscribers get the current state first (the
/// room snapshot, or the candidate backlog), then every later change —
/// the same contract a real-time store gives a fresh listener.
#[derive(Default)]
pub struct MemoryStore {
    rooms: DashMap<RoomId, RoomDoc>,
    candidates: DashMap<RoomId, Vec<CandidateDoc>>,
    room_watchers: DashMap<RoomId, Vec<mpsc::Sender<RoomEvent>>>,
    candidate_watchers: DashMap<RoomId, Vec<mpsc::Sender<CandidateDoc>>>,
}

impl MemoryStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Seed a room the way the external appointment flow would.
    pub async fn put(&self, doc: RoomDoc) {
        let id = doc.id.clone();
        self.rooms.insert(id.clone(), doc.clone());
        self.notify_room(&id, RoomEvent::Snapshot(doc));
    }

    pub fn candidate_count(&self, room: &RoomId) -> usize {
        self.candidates.get(room).map_or(0, |c| c.len())
    }

    fn notify_room(&self, room: &RoomId, event: RoomEvent) {
        if let Some(mut watchers) = self.room_watchers.get_mut(room) {
            watchers.retain(|tx| tx.try_send(event.clone()).is_ok() || !tx.is_closed());
        }
    }

    fn notify_candidate(&self, room: &RoomId, doc: &CandidateDoc) {
        if let Some(mut watchers) = self.candidate_watchers.get_mut(room) {
            watchers.retain(|tx| tx.try_send(doc.clone()).is_ok() || !tx.is_closed());
        }
    }
}

#[async_trait]
impl RoomStore for MemoryStore {
    async fn get(&self, room: &RoomId) -> Result<Option<RoomDoc>, StoreError> {
        Ok(self.rooms.get(room).map(|d| d.clone()))
    }

    async fn apply(&self, room: &RoomId, patch: RoomPatch) -> Result<(), StoreError> {
        let snapshot = match self.rooms.get_mut(room) {
            Some(mut doc) => {
                patch.apply_to(&mut doc, Utc::now());
                Some(doc.clone())
            }
            // Patching a missing document is a no-op by contract.
            None => None,
        };
        if let Some(doc) = snapshot {
            self.notify_room(room, RoomEvent::Snapshot(doc));
        }
        Ok(())
    }

    async fn delete(&self, room: &RoomId) -> Result<(), StoreError> {
        if self.rooms.remove(room).is_some() {
            self.notify_room(room, RoomEvent::Removed);
        }
        self.candidates.remove(room);
        Ok(())
    }

    async fn add_candidate(
        &self,
        room: &RoomId,
        candidate: CandidateDoc,
    ) -> Result<(), StoreError> {
        self.candidates
            .entry(room.clone())
            .or_default()
            .push(candidate.clone());
        self.notify_candidate(room, &candidate);
        Ok(())
    }

    async fn watch_room(&self, room: &RoomId) -> Result<mpsc::Receiver<RoomEvent>, StoreError> {
        let (tx, rx) = mpsc::channel(256);
        if let Some(doc) = self.rooms.get(room) {
            let _ = tx.try_send(RoomEvent::Snapshot(doc.clone()));
        }
        self.room_watchers.entry(room.clone()).or_default().push(tx);
        Ok(rx)
    }

    async fn watch_candidates(
        &self,
        room: &RoomId,
    ) -> Result<mpsc::Receiver<CandidateDoc>, StoreError> {
        let (tx, rx) = mpsc::channel(256);
        if let Some(backlog) = self.candidates.get(room) {
            for doc in backlog.iter() {
                let _ = tx.try_send(doc.clone());
            }
        }
        self.candidate_watchers
            .entry(room.clone())
            .or_default()
            .push(tx);
        Ok(rx)
    }
}
