mod negotiation;
mod peer_event;
mod peer_link;

pub use negotiation::*;
pub use peer_event::*;
pub use peer_link::*;
