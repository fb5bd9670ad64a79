use crate::model::ids::{AppointmentId, UserId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize, Clone, Copy, Eq, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum AppointmentMode {
    Online,
    InPerson,
}

/// The slice of an appointment the call subsystem needs: enough to
/// validate an invite and to render the "starting soon" indicator.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Appointment {
    pub id: AppointmentId,
    pub doctor_id: UserId,
    pub patient_id: UserId,
    pub mode: AppointmentMode,
    pub scheduled_at: DateTime<Utc>,
}
