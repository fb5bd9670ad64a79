mod capture;
mod constraints;
mod track;

pub use capture::*;
pub use constraints::*;
pub use track::*;
