mod call_controls;

pub use call_controls::*;
