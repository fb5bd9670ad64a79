mod appointment;
mod candidate;
mod ids;
mod notification;
mod role;
mod room;

pub use appointment::{Appointment, AppointmentMode};
pub use candidate::CandidateDoc;
pub use ids::{AppointmentId, RoomId, UserId};
pub use notification::{InAppNotification, PushNotification};
pub use role::Role;
pub use room::{RoomDoc, RoomStatus, SdpKind, SessionBlob};
