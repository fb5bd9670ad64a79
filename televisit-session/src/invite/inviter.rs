use crate::notify::{NotificationDispatcher, NotifyError};
use crate::store::{RoomPatch, RoomStore, StoreError};
use chrono::{DateTime, Duration, Utc};
use dashmap::DashSet;
use futures::join;
use serde_json::json;
use std::sync::Arc;
use televisit_core::{Appointment, AppointmentMode, InAppNotification, PushNotification, RoomId, UserId};
use thiserror::Error;
use tracing::{error, info, warn};

/// An appointment is "starting soon" within this window of now.
const STARTING_SOON_WINDOW_MIN: i64 = 20;

#[derive(Debug, Error)]
pub enum InviteError {
    #[error("appointment is not an online consultation")]
    NotOnline,
    #[error("appointment belongs to another doctor")]
    NotOwner,
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Whether the invite UI should show the "starting soon" indicator.
/// Eligibility itself (same-day, online) is enforced elsewhere.
pub fn starting_soon(appointment: &Appointment, now: DateTime<Utc>) -> bool {
    appointment.scheduled_at - now <= Duration::minutes(STARTING_SOON_WINDOW_MIN)
}

/// Doctor-side invitation: seeds the room with the patient and fires
/// the three notification channels. Notifications are best-effort and
/// independent; none of them can fail the invitation.
pub struct Inviter {
    store: Arc<dyn RoomStore>,
    dispatcher: Arc<dyn NotificationDispatcher>,
    sent: DashSet<(RoomId, UserId)>,
}

impl Inviter {
    pub fn new(store: Arc<dyn RoomStore>, dispatcher: Arc<dyn NotificationDispatcher>) -> Self {
        Self {
            store,
            dispatcher,
            sent: DashSet::new(),
        }
    }

    pub async fn invite(
        &self,
        room_id: &RoomId,
        appointment: &Appointment,
        doctor_id: &UserId,
        patient_email: &str,
    ) -> Result<(), InviteError> {
        if appointment.mode != AppointmentMode::Online {
            return Err(InviteError::NotOnline);
        }
        if &appointment.doctor_id != doctor_id {
            return Err(InviteError::NotOwner);
        }

        // Re-inviting an already-invited patient is a no-op.
        let key = (room_id.clone(), appointment.patient_id.clone());
        if !self.sent.insert(key.clone()) {
            info!(room = %room_id, patient = %appointment.patient_id, "already invited");
            return Ok(());
        }

        let patch = RoomPatch {
            receiver_id: Some(appointment.patient_id.clone()),
            participants: Some(vec![doctor_id.clone(), appointment.patient_id.clone()]),
            appointment_id: Some(appointment.id.clone()),
            ..Default::default()
        };
        if let Err(e) = self.store.apply(room_id, patch).await {
            // The room was never seeded; forget the marker so a retry
            // runs the whole flow again.
            self.sent.remove(&key);
            warn!(room = %room_id, "invite write failed: {e}");
            return Err(e.into());
        }
        info!(room = %room_id, patient = %appointment.patient_id, "patient invited");

        self.send_notifications(room_id, appointment, patient_email)
            .await;
        Ok(())
    }

    /// Three channels, concurrent, each with its own error boundary.
    /// Failures are aggregated for logging only; an email timeout is
    /// expected and not even worth a warning.
    async fn send_notifications(
        &self,
        room_id: &RoomId,
        appointment: &Appointment,
        patient_email: &str,
    ) {
        let patient = &appointment.patient_id;
        let link = format!("/call/{room_id}");

        let in_app = InAppNotification {
            title: "Video consultation".to_owned(),
            message: "Your doctor is inviting you to a video call.".to_owned(),
            kind: "video_call".to_owned(),
            action_link: Some(link.clone()),
            action_text: Some("Join call".to_owned()),
            image_url: None,
            metadata: Some(json!({
                "roomId": room_id,
                "appointmentId": appointment.id,
            })),
        };
        let push = PushNotification {
            title: "Video consultation".to_owned(),
            body: "Your doctor is inviting you to a video call.".to_owned(),
            tag: Some(format!("call-{room_id}")),
            icon: None,
            badge: None,
            data: Some(json!({ "url": link })),
        };
        let email_body = format!(
            "Your doctor has started your video consultation. Join at {link} when you are ready."
        );

        let (in_app_res, push_res, email_res) = join!(
            self.dispatcher.notify(patient, in_app),
            self.dispatcher.push_notify(patient, push),
            self.dispatcher.email_notify(
                patient_email,
                "Your video consultation is starting",
                &email_body,
                patient,
            ),
        );

        for (channel, result) in [
            ("in-app", in_app_res),
            ("push", push_res),
            ("email", email_res),
        ] {
            match result {
                Ok(()) => {}
                Err(NotifyError::Timeout) => {}
                Err(e) => error!(room = %room_id, channel, "notification failed: {e}"),
            }
        }
    }
}
