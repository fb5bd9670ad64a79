use std::time::Duration;
use televisit_core::{Role, RoomId, RoomStatus, UserId};
use televisit_session::{Destination, RoomStore, SessionCommand};

use crate::utils::MemoryStore;
use crate::{init_tracing, pending_room, start_session, wait_until};

/// A patient leaving an invited room hands it back: they drop out of
/// `participants`, the status reverts to pending, and with only the
/// doctor left the stale offer/answer pair is deleted so the next join
/// negotiates from scratch.
#[tokio::test]
async fn patient_leave_reverts_the_room_to_pending() {
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

    patient_session.handle.send(SessionCommand::Leave).await;
    patient_session.handle.finished().await;

    let doc = store.get(&room).await.unwrap().unwrap();
    assert_eq!(doc.participants, vec![doctor.clone()]);
    assert_eq!(doc.status, RoomStatus::Pending);
    assert!(doc.offer.is_none(), "stale offer survived the leave");
    assert!(doc.answer.is_none(), "stale answer survived the leave");

    assert_eq!(
        patient_session.navigator.last(),
        Some(Destination::PatientAppointments)
    );
    assert!(patient_session.devices.all_tracks_stopped());
    // The doctor is still in the call, just waiting again.
    assert_eq!(doctor_session.navigator.redirect_count(), 0);
}
