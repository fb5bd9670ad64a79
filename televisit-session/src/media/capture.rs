use crate::media::constraints::CaptureConstraints;
use crate::media::track::{LocalMedia, LocalTrack};
use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;
use tracing::warn;

#[derive(Debug, Error)]
pub enum CaptureError {
    /// The device exists but another application holds it.
    #[error("capture device busy")]
    Busy,
    /// No device satisfies the requested constraints.
    #[error("capture constraints cannot be satisfied")]
    OverConstrained,
    #[error("capture permission denied")]
    PermissionDenied,
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl CaptureError {
    /// The classes the staged fallback may absorb. Anything else
    /// propagates to the caller and aborts the join.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::Busy | Self::OverConstrained | Self::PermissionDenied
        )
    }
}

/// The platform device layer: opens camera/microphone tracks for a set
/// of constraints, and the display track used by screen share.
#[async_trait]
pub trait DeviceProvider: Send + Sync {
    async fn open_capture(
        &self,
        constraints: &CaptureConstraints,
    ) -> Result<Vec<Arc<LocalTrack>>, CaptureError>;

    async fn open_display(&self) -> Result<Arc<LocalTrack>, CaptureError>;
}

/// Staged acquisition of the local stream: camera+microphone first,
/// audio-only when the camera is unavailable, and an empty stream as
/// the last resort so the call can still run receive-only.
pub struct MediaCapture {
    devices: Arc<dyn DeviceProvider>,
}

impl MediaCapture {
    pub fn new(devices: Arc<dyn DeviceProvider>) -> Self {
        Self { devices }
    }

    pub async fn acquire(&self) -> Result<LocalMedia, CaptureError> {
        let full = CaptureConstraints::video_and_audio();
        let first_failure = match self.devices.open_capture(&full).await {
            Ok(tracks) => return Ok(LocalMedia::new(tracks)),
            Err(e) if e.is_recoverable() => e,
            Err(e) => return Err(e),
        };

        warn!("video+audio capture failed ({first_failure}), retrying audio-only");

        match self.devices.open_capture(&CaptureConstraints::audio_only()).await {
            Ok(tracks) => Ok(LocalMedia::new(tracks)),
            Err(e) if e.is_recoverable() => {
                warn!("audio-only capture failed ({e}), continuing with no local media");
                Ok(LocalMedia::empty())
            }
            Err(e) => Err(e),
        }
    }
}
