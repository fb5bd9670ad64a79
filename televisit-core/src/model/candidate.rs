use crate::model::ids::UserId;
use serde::{Deserialize, Serialize};

/// One document in the room's append-only candidate sub-collection.
/// `from` lets subscribers drop their own echoed candidates.
#[derive(Debug, Serialize, Deserialize, Clone, Eq, PartialEq)]
pub struct CandidateDoc {
    pub candidate: String,
    pub sdp_mid: Option<String>,
    pub sdp_mline_index: Option<u16>,
    pub from: UserId,
}
