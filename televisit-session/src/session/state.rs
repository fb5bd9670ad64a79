use televisit_core::UserId;

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum SessionPhase {
    /// Join sequence still running, or stuck after a join failure.
    Connecting,
    /// Joined; media may or may not be flowing yet.
    Active,
    /// Torn down: left, revoked, or terminated by the peer.
    Ended,
}

/// What the hosting page renders, published on a watch channel after
/// every change.
#[derive(Debug, Clone)]
pub struct SessionView {
    pub phase: SessionPhase,
    pub waiting_for_peer: bool,
    pub remote_active: bool,
    pub mic_on: bool,
    pub camera_on: bool,
    pub sharing_screen: bool,
    pub pinned: Option<UserId>,
    pub fullscreen: bool,
}

impl Default for SessionView {
    fn default() -> Self {
        Self {
            phase: SessionPhase::Connecting,
            waiting_for_peer: true,
            remote_active: false,
            mic_on: false,
            camera_on: false,
            sharing_screen: false,
            pinned: None,
            fullscreen: false,
        }
    }
}

/// Per-session coordination flags. These are fields on the session, not
/// module state, so two rooms in one process can never contaminate each
/// other.
#[derive(Debug, Default)]
pub(crate) struct SessionState {
    /// Set first on every exit path; every async continuation checks it
    /// before acting on the connection.
    pub leaving: bool,
    /// This session wrote the offer.
    pub initiator: bool,
    /// The one-shot peer-connection reset was already spent.
    pub reset_done: bool,
}
