use crate::model::ids::{AppointmentId, RoomId, UserId};
use crate::model::role::Role;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize, Clone, Copy, Eq, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum RoomStatus {
    Pending,
    Active,
    Ended,
    Cancelled,
    Closed,
}

impl RoomStatus {
    /// A terminal status means the call is over and nobody may join.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Ended | Self::Cancelled | Self::Closed)
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, Eq, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum SdpKind {
    Offer,
    Answer,
}

/// One half of the session-description exchange. Opaque to everything
/// except the peer connection layer that produced or consumes it.
#[derive(Debug, Serialize, Deserialize, Clone, Eq, PartialEq)]
pub struct SessionBlob {
    pub kind: SdpKind,
    pub sdp: String,
}

/// The shared room document: the wire contract between the two peers,
/// relayed through the document store.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct RoomDoc {
    pub id: RoomId,
    pub status: RoomStatus,
    #[serde(default)]
    pub participants: Vec<UserId>,
    pub caller_id: UserId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub receiver_id: Option<UserId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub appointment_id: Option<AppointmentId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub offer: Option<SessionBlob>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub answer: Option<SessionBlob>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub revoked_by: Option<UserId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ended_at: Option<DateTime<Utc>>,
}

impl RoomDoc {
    /// A fresh room as the external invite flow creates it.
    pub fn new(id: RoomId, caller_id: UserId) -> Self {
        Self {
            id,
            status: RoomStatus::Pending,
            participants: Vec::new(),
            caller_id,
            receiver_id: None,
            appointment_id: None,
            offer: None,
            answer: None,
            revoked_by: None,
            ended_at: None,
        }
    }

    /// Revocation counts as termination even before `status` catches up.
    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal() || self.revoked_by.is_some()
    }

    pub fn has_participant(&self, user: &UserId) -> bool {
        self.participants.contains(user)
    }

    /// Whether the counterpart the given role waits for is present:
    /// the doctor waits on the invited patient, the patient on the caller.
    pub fn counterpart_present(&self, role: Role) -> bool {
        match role {
            Role::Doctor => self
                .receiver_id
                .as_ref()
                .is_some_and(|r| self.participants.contains(r)),
            Role::Patient => self.participants.contains(&self.caller_id),
        }
    }

    /// Whether `user`, joining as `role`, is allowed into this room.
    /// Patients may only enter an open room or one they were invited to.
    pub fn admits(&self, user: &UserId, role: Role) -> bool {
        match role {
            Role::Doctor => true,
            Role::Patient => self.receiver_id.as_ref().is_none_or(|r| r == user),
        }
    }
}
