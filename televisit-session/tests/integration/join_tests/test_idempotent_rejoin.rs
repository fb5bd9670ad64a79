use std::time::Duration;
use televisit_core::{Role, RoomId, RoomStatus, UserId};
use televisit_session::{RoomStore, SessionPhase};

use crate::utils::{MemoryStore, sample_offer_answer};
use crate::{init_tracing, pending_room, start_session, wait_until};

/// Joining a room the caller is already in must not duplicate the id
/// in `participants` or re-trigger negotiation.
#[tokio::test]
async fn rejoin_does_not_duplicate_or_renegotiate() {
    init_tracing();

    let store = MemoryStore::new();
    let room = RoomId::from("r1");
    let doctor = UserId::from("doctor-1");

    let (offer, answer) = sample_offer_answer().await;
    let mut doc = pending_room(&room, &doctor);
    doc.status = RoomStatus::Active;
    doc.participants = vec![doctor.clone()];
    doc.offer = Some(offer.clone());
    doc.answer = Some(answer.clone());
    store.put(doc).await;

    let session = start_session(&store, &room, &doctor, Role::Doctor);

    let view = session.handle.view();
    assert!(
        wait_until(Duration::from_secs(10), || {
            let view = view.clone();
            async move { view.borrow().phase == SessionPhase::Active }
        })
        .await,
        "session never became active"
    );

    let doc = store.get(&room).await.unwrap().unwrap();
    assert_eq!(doc.participants, vec![doctor.clone()]);
    // Negotiation was not re-run: both halves are untouched.
    assert_eq!(doc.offer.as_ref().unwrap().sdp, offer.sdp);
    assert_eq!(doc.answer.as_ref().unwrap().sdp, answer.sdp);
    assert_eq!(session.navigator.redirect_count(), 0);
}
