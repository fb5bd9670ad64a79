use crate::media::TrackKind;
use televisit_core::CandidateDoc;
use webrtc::peer_connection::peer_connection_state::RTCPeerConnectionState;

/// Events the peer connection pushes into the session loop.
#[derive(Debug)]
pub enum PeerEvent {
    /// First media of this kind arrived from the remote party.
    RemoteTrack { kind: TrackKind },

    /// A local ICE candidate was generated; the session appends it to
    /// the room's candidate sub-collection.
    LocalCandidate(CandidateDoc),

    /// Transport-level connection state changed.
    ConnectionState(RTCPeerConnectionState),
}
