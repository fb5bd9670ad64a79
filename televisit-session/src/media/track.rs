use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use webrtc::api::media_engine::{MIME_TYPE_OPUS, MIME_TYPE_VP8};
use webrtc::rtp_transceiver::rtp_codec::RTCRtpCodecCapability;
use webrtc::track::track_local::track_local_static_sample::TrackLocalStaticSample;

#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash)]
pub enum TrackKind {
    Audio,
    Video,
}

/// A local device track: the webrtc-level track plus the two flags the
/// rest of the session cares about. `enabled` is the mute switch the
/// controls flip; `live` goes false once the session stops the track
/// and releases the device, after which the capture pump must quit.
pub struct LocalTrack {
    kind: TrackKind,
    inner: Arc<TrackLocalStaticSample>,
    enabled: AtomicBool,
    live: AtomicBool,
}

impl LocalTrack {
    pub fn new(kind: TrackKind, inner: Arc<TrackLocalStaticSample>) -> Arc<Self> {
        Arc::new(Self {
            kind,
            inner,
            enabled: AtomicBool::new(true),
            live: AtomicBool::new(true),
        })
    }

    /// Convenience constructor used by device providers: an Opus audio
    /// track or a VP8 video track with the given identifiers.
    pub fn from_device(kind: TrackKind, track_id: &str, stream_id: &str) -> Arc<Self> {
        let mime_type = match kind {
            TrackKind::Audio => MIME_TYPE_OPUS,
            TrackKind::Video => MIME_TYPE_VP8,
        };
        let inner = Arc::new(TrackLocalStaticSample::new(
            RTCRtpCodecCapability {
                mime_type: mime_type.to_owned(),
                ..Default::default()
            },
            track_id.to_owned(),
            stream_id.to_owned(),
        ));
        Self::new(kind, inner)
    }

    pub fn kind(&self) -> TrackKind {
        self.kind
    }

    pub fn rtp_track(&self) -> Arc<TrackLocalStaticSample> {
        self.inner.clone()
    }

    pub fn set_enabled(&self, enabled: bool) {
        self.enabled.store(enabled, Ordering::SeqCst);
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::SeqCst)
    }

    pub fn stop(&self) {
        self.live.store(false, Ordering::SeqCst);
    }

    pub fn is_live(&self) -> bool {
        self.live.load(Ordering::SeqCst)
    }
}

/// The acquired local stream. May hold zero tracks: a call must still
/// proceed in receive-only mode when every device is unavailable.
#[derive(Clone, Default)]
pub struct LocalMedia {
    tracks: Vec<Arc<LocalTrack>>,
}

impl LocalMedia {
    pub fn new(tracks: Vec<Arc<LocalTrack>>) -> Self {
        Self { tracks }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }

    pub fn tracks(&self) -> &[Arc<LocalTrack>] {
        &self.tracks
    }

    pub fn track_of_kind(&self, kind: TrackKind) -> Option<&Arc<LocalTrack>> {
        self.tracks.iter().find(|t| t.kind() == kind)
    }

    pub fn has_kind(&self, kind: TrackKind) -> bool {
        self.track_of_kind(kind).is_some()
    }

    /// Release every device. Idempotent; part of every session exit path.
    pub fn stop_all(&self) {
        for track in &self.tracks {
            track.stop();
        }
    }
}
