use crate::media::{LocalMedia, LocalTrack, TrackKind};
use crate::peer::negotiation::NegotiationError;
use crate::peer::peer_event::PeerEvent;
use anyhow::{Context, Result};
use std::sync::Arc;
use std::time::Duration;
use televisit_core::{CandidateDoc, RoomId, SdpKind, SessionBlob, UserId};
use tokio::sync::{mpsc, watch};
use tracing::{debug, info};
use webrtc::api::APIBuilder;
use webrtc::api::interceptor_registry::register_default_interceptors;
use webrtc::api::media_engine::MediaEngine;
use webrtc::ice_transport::ice_candidate::RTCIceCandidate;
use webrtc::ice_transport::ice_candidate::RTCIceCandidateInit;
use webrtc::ice_transport::ice_server::RTCIceServer;
use webrtc::interceptor::registry::Registry;
use webrtc::peer_connection::RTCPeerConnection;
use webrtc::peer_connection::configuration::RTCConfiguration;
use webrtc::peer_connection::peer_connection_state::RTCPeerConnectionState;
use webrtc::peer_connection::sdp::session_description::RTCSessionDescription;
use webrtc::peer_connection::signaling_state::RTCSignalingState;
use webrtc::rtp_transceiver::RTCRtpTransceiverInit;
use webrtc::rtp_transceiver::rtp_codec::RTPCodecType;
use webrtc::rtp_transceiver::rtp_sender::RTCRtpSender;
use webrtc::rtp_transceiver::rtp_transceiver_direction::RTCRtpTransceiverDirection;
use webrtc::track::track_local::TrackLocal;

/// ICE server set the connection is bound to at construction.
#[derive(Debug, Clone)]
pub struct IceConfig {
    pub urls: Vec<String>,
}

impl Default for IceConfig {
    fn default() -> Self {
        Self {
            urls: vec!["stun:stun.l.google.com:19302".to_owned()],
        }
    }
}

/// One peer-to-peer media connection for one room. Wraps the
/// RTCPeerConnection, keeps a watch on its signaling state so callers
/// can await exact transitions instead of sleeping, and forwards remote
/// tracks / local candidates / connection state into the session's
/// event channel.
pub struct PeerLink {
    room_id: RoomId,
    self_id: UserId,
    pc: Arc<RTCPeerConnection>,
    signaling_rx: watch::Receiver<RTCSignalingState>,
    video_sender: Option<Arc<RTCRtpSender>>,
}

impl PeerLink {
    pub async fn connect(
        room_id: RoomId,
        self_id: UserId,
        config: IceConfig,
        media: &LocalMedia,
        event_tx: mpsc::Sender<PeerEvent>,
    ) -> Result<Self> {
        let mut m = MediaEngine::default();
        m.register_default_codecs()?;
        let registry = register_default_interceptors(Registry::new(), &mut m)?;

        let api = APIBuilder::new()
            .with_media_engine(m)
            .with_interceptor_registry(registry)
            .build();

        let rtc_config = RTCConfiguration {
            ice_servers: vec![RTCIceServer {
                urls: config.urls,
                credential: String::new(),
                username: String::new(),
            }],
            ..Default::default()
        };

        let pc = Arc::new(api.new_peer_connection(rtc_config).await?);

        let (signaling_tx, signaling_rx) = watch::channel(pc.signaling_state());
        pc.on_signaling_state_change(Box::new(move |state: RTCSignalingState| {
            let _ = signaling_tx.send(state);
            Box::pin(async {})
        }));

        let state_tx = event_tx.clone();
        pc.on_peer_connection_state_change(Box::new(move |state: RTCPeerConnectionState| {
            let tx = state_tx.clone();
            Box::pin(async move {
                let _ = tx.send(PeerEvent::ConnectionState(state)).await;
            })
        }));

        let ice_tx = event_tx.clone();
        let ice_from = self_id.clone();
        pc.on_ice_candidate(Box::new(move |candidate: Option<RTCIceCandidate>| {
            let tx = ice_tx.clone();
            let from = ice_from.clone();
            Box::pin(async move {
                let Some(candidate) = candidate else { return };
                let Ok(init) = candidate.to_json() else {
                    return;
                };
                let doc = CandidateDoc {
                    candidate: init.candidate,
                    sdp_mid: init.sdp_mid,
                    sdp_mline_index: init.sdp_mline_index,
                    from,
                };
                let _ = tx.send(PeerEvent::LocalCandidate(doc)).await;
            })
        }));

        let track_tx = event_tx.clone();
        pc.on_track(Box::new(move |track, _receiver, _transceiver| {
            let tx = track_tx.clone();
            let kind = match track.kind() {
                RTPCodecType::Audio => Some(TrackKind::Audio),
                RTPCodecType::Video => Some(TrackKind::Video),
                _ => None,
            };
            Box::pin(async move {
                let Some(kind) = kind else { return };
                let _ = tx.send(PeerEvent::RemoteTrack { kind }).await;
            })
        }));

        // Send transceivers for whatever local media we have, and
        // receive-only transceivers for the kinds we lack so remote
        // media can still flow in the empty-stream fallback case.
        // Only the video sender is kept: screen share swaps its track.
        let mut video_sender = None;
        for track in media.tracks() {
            let local: Arc<dyn TrackLocal + Send + Sync> = track.rtp_track();
            let sender = pc.add_track(local).await?;
            if track.kind() == TrackKind::Video {
                video_sender = Some(sender);
            }
        }
        if !media.has_kind(TrackKind::Audio) {
            pc.add_transceiver_from_kind(
                RTPCodecType::Audio,
                Some(RTCRtpTransceiverInit {
                    direction: RTCRtpTransceiverDirection::Recvonly,
                    send_encodings: vec![],
                }),
            )
            .await?;
        }
        if !media.has_kind(TrackKind::Video) {
            pc.add_transceiver_from_kind(
                RTPCodecType::Video,
                Some(RTCRtpTransceiverInit {
                    direction: RTCRtpTransceiverDirection::Recvonly,
                    send_encodings: vec![],
                }),
            )
            .await?;
        }

        info!(room = %room_id, user = %self_id, "peer connection created");

        Ok(Self {
            room_id,
            self_id,
            pc,
            signaling_rx,
            video_sender,
        })
    }

    pub fn signaling_state(&self) -> RTCSignalingState {
        self.pc.signaling_state()
    }

    pub async fn has_local_description(&self) -> bool {
        self.pc.local_description().await.is_some()
    }

    pub async fn has_remote_description(&self) -> bool {
        self.pc.remote_description().await.is_some()
    }

    fn expect_state(&self, expected: RTCSignalingState) -> Result<(), NegotiationError> {
        let found = self.pc.signaling_state();
        if found == expected {
            Ok(())
        } else {
            Err(NegotiationError::StateMismatch { expected, found })
        }
    }

    /// Await an exact signaling state on the watch channel. A timeout
    /// is reported as a state mismatch so callers share one recovery
    /// path.
    pub async fn wait_signaling(
        &self,
        target: RTCSignalingState,
        timeout: Duration,
    ) -> Result<(), NegotiationError> {
        let mut rx = self.signaling_rx.clone();
        match tokio::time::timeout(timeout, rx.wait_for(|s| *s == target)).await {
            Ok(Ok(_)) => Ok(()),
            _ => Err(NegotiationError::StateMismatch {
                expected: target,
                found: self.pc.signaling_state(),
            }),
        }
    }

    /// Initiator half: create the offer and install it locally.
    pub async fn create_offer(&self) -> Result<SessionBlob, NegotiationError> {
        self.expect_state(RTCSignalingState::Stable)?;
        let offer = self
            .pc
            .create_offer(None)
            .await
            .context("create_offer")
            .map_err(NegotiationError::Other)?;
        let sdp = offer.sdp.clone();
        self.pc
            .set_local_description(offer)
            .await
            .context("set_local_description(offer)")
            .map_err(NegotiationError::Other)?;
        Ok(SessionBlob {
            kind: SdpKind::Offer,
            sdp,
        })
    }

    /// Responder half, step one: install the remote offer.
    pub async fn apply_remote_offer(&self, offer: &SessionBlob) -> Result<(), NegotiationError> {
        self.expect_state(RTCSignalingState::Stable)?;
        let desc = RTCSessionDescription::offer(offer.sdp.clone())
            .context("parse remote offer")
            .map_err(NegotiationError::Other)?;
        self.pc
            .set_remote_description(desc)
            .await
            .context("set_remote_description(offer)")
            .map_err(NegotiationError::Other)?;
        Ok(())
    }

    /// Responder half, step two: create the answer and install it locally.
    pub async fn create_answer(&self) -> Result<SessionBlob, NegotiationError> {
        self.expect_state(RTCSignalingState::HaveRemoteOffer)?;
        let answer = self
            .pc
            .create_answer(None)
            .await
            .context("create_answer")
            .map_err(NegotiationError::Other)?;
        let sdp = answer.sdp.clone();
        self.pc
            .set_local_description(answer)
            .await
            .context("set_local_description(answer)")
            .map_err(NegotiationError::Other)?;
        Ok(SessionBlob {
            kind: SdpKind::Answer,
            sdp,
        })
    }

    /// Initiator's completion: install the remote answer.
    pub async fn apply_remote_answer(&self, answer: &SessionBlob) -> Result<(), NegotiationError> {
        self.expect_state(RTCSignalingState::HaveLocalOffer)?;
        let desc = RTCSessionDescription::answer(answer.sdp.clone())
            .context("parse remote answer")
            .map_err(NegotiationError::Other)?;
        self.pc
            .set_remote_description(desc)
            .await
            .context("set_remote_description(answer)")
            .map_err(NegotiationError::Other)?;
        Ok(())
    }

    /// Apply a candidate from the sub-collection. Failures here are the
    /// caller's to swallow; a candidate arriving after teardown is
    /// expected and harmless.
    pub async fn add_remote_candidate(&self, doc: &CandidateDoc) -> Result<()> {
        let init = RTCIceCandidateInit {
            candidate: doc.candidate.clone(),
            sdp_mid: doc.sdp_mid.clone(),
            sdp_mline_index: doc.sdp_mline_index,
            username_fragment: None,
        };
        self.pc
            .add_ice_candidate(init)
            .await
            .context("add_ice_candidate")?;
        Ok(())
    }

    /// Hot-swap the outgoing video track (camera ↔ screen) without
    /// renegotiation.
    pub async fn swap_video_track(&self, track: Option<&Arc<LocalTrack>>) -> Result<()> {
        let sender = self
            .video_sender
            .as_ref()
            .context("no video sender on this connection")?;
        let local = track.map(|t| t.rtp_track() as Arc<dyn TrackLocal + Send + Sync>);
        sender.replace_track(local).await?;
        Ok(())
    }

    pub async fn close(&self) -> Result<()> {
        debug!(room = %self.room_id, user = %self.self_id, "closing peer connection");
        self.pc.close().await?;
        Ok(())
    }
}
