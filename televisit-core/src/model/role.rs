use serde::{Deserialize, Serialize};

/// Which side of the consultation the local participant is on.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, Eq, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Doctor,
    Patient,
}
