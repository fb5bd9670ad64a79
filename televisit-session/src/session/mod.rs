mod command;
mod coordinator;
mod navigator;
mod state;

pub use command::*;
pub use coordinator::*;
pub use navigator::*;
pub use state::*;
