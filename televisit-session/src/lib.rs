pub mod controls;
pub mod invite;
pub mod media;
pub mod notify;
pub mod peer;
pub mod session;
pub mod store;

pub use controls::*;
pub use invite::*;
pub use media::*;
pub use notify::*;
pub use peer::*;
pub use session::*;
pub use store::*;
