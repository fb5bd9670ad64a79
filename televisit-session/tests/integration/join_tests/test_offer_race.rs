use async_trait::async_trait;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use televisit_core::{CandidateDoc, Role, RoomDoc, RoomId, SdpKind, SessionBlob, UserId};
use televisit_session::{
    RoomEvent, RoomPatch, RoomSession, RoomStore, SessionConfig, StoreError,
};
use tokio::sync::mpsc;

use crate::utils::{FakeDevices, MemoryStore, RecordingNavigator, sample_offer};
use crate::{init_tracing, pending_room, wait_until};

/// Delegates to the in-memory store, injecting a rival offer right
/// before one specific read. Aimed at the re-read a session performs
/// between preparing its own offer and writing it.
struct RaceStore {
    inner: Arc<MemoryStore>,
    gets: AtomicUsize,
    inject_at: usize,
    rival_offer: SessionBlob,
}

#[async_trait]
impl RoomStore for RaceStore {
    async fn get(&self, room: &RoomId) -> Result<Option<RoomDoc>, StoreError> {
        if self.gets.fetch_add(1, Ordering::SeqCst) + 1 == self.inject_at {
            let patch = RoomPatch {
                offer: Some(self.rival_offer.clone()),
                ..Default::default()
            };
            self.inner.apply(room, patch).await?;
        }
        self.inner.get(room).await
    }

    async fn apply(&self, room: &RoomId, patch: RoomPatch) -> Result<(), StoreError> {
        self.inner.apply(room, patch).await
    }

    async fn delete(&self, room: &RoomId) -> Result<(), StoreError> {
        self.inner.delete(room).await
    }

    async fn add_candidate(
        &self,
        room: &RoomId,
        candidate: CandidateDoc,
    ) -> Result<(), StoreError> {
        self.inner.add_candidate(room, candidate).await
    }

    async fn watch_room(&self, room: &RoomId) -> Result<mpsc::Receiver<RoomEvent>, StoreError> {
        self.inner.watch_room(room).await
    }

    async fn watch_candidates(
        &self,
        room: &RoomId,
    ) -> Result<mpsc::Receiver<CandidateDoc>, StoreError> {
        self.inner.watch_candidates(room).await
    }
}

/// A session that prepared an offer, only to find a rival's offer
/// already written, must yield the initiator role: leave the rival's
/// offer untouched, start over on a fresh connection, and answer it.
#[tokio::test]
async fn losing_the_offer_election_turns_the_session_into_the_responder() {
    init_tracing();

    let inner = MemoryStore::new();
    let room = RoomId::from("r1");
    let doctor = UserId::from("doctor-1");
    inner.put(pending_room(&room, &doctor)).await;

    let rival_offer = sample_offer().await;
    let store = Arc::new(RaceStore {
        inner: inner.clone(),
        gets: AtomicUsize::new(0),
        // Reads during a join: terminal gate, pre-write re-check,
        // election, then the re-validation right before the offer
        // write. The rival lands just before the fourth.
        inject_at: 4,
        rival_offer: rival_offer.clone(),
    });

    let navigator = Arc::new(RecordingNavigator::default());
    let _handle = RoomSession::start(
        SessionConfig::new(room.clone(), doctor.clone(), Role::Doctor),
        store.clone() as Arc<dyn RoomStore>,
        Arc::new(FakeDevices::working()),
        navigator.clone(),
    );

    assert!(
        wait_until(Duration::from_secs(10), || async {
            inner
                .get(&room)
                .await
                .unwrap()
                .is_some_and(|d| d.answer.is_some())
        })
        .await,
        "race loser never answered the rival offer"
    );

    let doc = inner.get(&room).await.unwrap().unwrap();
    // The rival's offer stands; this session answered instead of
    // overwriting it.
    assert_eq!(doc.offer.as_ref().unwrap().sdp, rival_offer.sdp);
    assert_eq!(doc.answer.as_ref().unwrap().kind, SdpKind::Answer);
    assert_eq!(navigator.redirect_count(), 0);
}
