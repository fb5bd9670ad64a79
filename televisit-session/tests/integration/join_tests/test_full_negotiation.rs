use std::time::Duration;
use televisit_core::{Role, RoomId, RoomStatus, SdpKind, UserId};
use televisit_session::RoomStore;

use crate::utils::MemoryStore;
use crate::{init_tracing, pending_room, start_session, wait_until};

/// Doctor joins an open pending room and becomes the initiator; the
/// patient joins afterwards and answers. The room ends up active with
/// both participants and both halves of the negotiation in place.
#[tokio::test]
async fn doctor_offers_patient_answers() {
    init_tracing();

    let store = MemoryStore::new();
    let room = RoomId::from("r1");
    let doctor = UserId::from("doctor-1");
    let patient = UserId::from("patient-1");
    store.put(pending_room(&room, &doctor)).await;

    let doctor_session = start_session(&store, &room, &doctor, Role::Doctor);

    assert!(
        wait_until(Duration::from_secs(10), || async {
            store
                .get(&room)
                .await
                .unwrap()
                .is_some_and(|d| d.offer.is_some())
        })
        .await,
        "doctor never wrote an offer"
    );

    let patient_session = start_session(&store, &room, &patient, Role::Patient);

    assert!(
        wait_until(Duration::from_secs(10), || async {
            store
                .get(&room)
                .await
                .unwrap()
                .is_some_and(|d| d.answer.is_some())
        })
        .await,
        "patient never wrote an answer"
    );

    // ICE runs over the same store: both sides publish their local
    // candidates into the sub-collection as they are gathered.
    assert!(
        wait_until(Duration::from_secs(10), || async {
            store.candidate_count(&room) > 0
        })
        .await,
        "no ICE candidate ever reached the store"
    );

    let doc = store.get(&room).await.unwrap().unwrap();
    assert_eq!(doc.status, RoomStatus::Active);
    assert_eq!(doc.participants, vec![doctor.clone(), patient.clone()]);
    assert_eq!(doc.offer.as_ref().unwrap().kind, SdpKind::Offer);
    assert_eq!(doc.answer.as_ref().unwrap().kind, SdpKind::Answer);
    assert_eq!(doc.receiver_id, Some(patient.clone()));

    // Nobody got shepherded out.
    assert_eq!(doctor_session.navigator.redirect_count(), 0);
    assert_eq!(patient_session.navigator.redirect_count(), 0);
}
