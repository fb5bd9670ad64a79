mod inviter;

pub use inviter::*;
