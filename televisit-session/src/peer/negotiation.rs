use thiserror::Error;
use webrtc::peer_connection::signaling_state::RTCSignalingState;

#[derive(Debug, Error)]
pub enum NegotiationError {
    /// A description was about to be set outside the expected signaling
    /// state. The session recovers from this exactly once, by
    /// recreating the peer connection.
    #[error("signaling state mismatch: expected {expected:?}, found {found:?}")]
    StateMismatch {
        expected: RTCSignalingState,
        found: RTCSignalingState,
    },
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl NegotiationError {
    pub fn is_state_mismatch(&self) -> bool {
        matches!(self, Self::StateMismatch { .. })
    }
}
