use crate::media::{DeviceProvider, LocalMedia, TrackKind};
use crate::media::LocalTrack;
use crate::peer::PeerLink;
use anyhow::Result;
use std::sync::Arc;
use televisit_core::UserId;
use tracing::info;

/// One user-facing control operation.
#[derive(Debug)]
pub enum ControlOp {
    ToggleMic,
    ToggleCamera,
    StartScreenShare,
    StopScreenShare,
    Pin(Option<UserId>),
    ToggleFullscreen,
}

/// In-call controls over the live local tracks. Screen share swaps the
/// video sender's track for a display track without renegotiation; the
/// camera track is kept aside and restored when sharing stops.
pub struct CallControls {
    devices: Arc<dyn DeviceProvider>,
    media: LocalMedia,
    screen_track: Option<Arc<LocalTrack>>,
    pinned: Option<UserId>,
    fullscreen: bool,
}

impl CallControls {
    pub fn new(devices: Arc<dyn DeviceProvider>, media: LocalMedia) -> Self {
        Self {
            devices,
            media,
            screen_track: None,
            pinned: None,
            fullscreen: false,
        }
    }

    pub fn mic_on(&self) -> bool {
        self.media
            .track_of_kind(TrackKind::Audio)
            .is_some_and(|t| t.is_enabled())
    }

    pub fn camera_on(&self) -> bool {
        self.screen_track.is_none()
            && self
                .media
                .track_of_kind(TrackKind::Video)
                .is_some_and(|t| t.is_enabled())
    }

    pub fn sharing_screen(&self) -> bool {
        self.screen_track.is_some()
    }

    pub fn pinned(&self) -> Option<&UserId> {
        self.pinned.as_ref()
    }

    pub fn fullscreen(&self) -> bool {
        self.fullscreen
    }

    pub async fn apply(&mut self, op: ControlOp, peer: &PeerLink) -> Result<()> {
        match op {
            ControlOp::ToggleMic => {
                if let Some(track) = self.media.track_of_kind(TrackKind::Audio) {
                    track.set_enabled(!track.is_enabled());
                }
            }
            ControlOp::ToggleCamera => {
                if let Some(track) = self.media.track_of_kind(TrackKind::Video) {
                    track.set_enabled(!track.is_enabled());
                }
            }
            ControlOp::StartScreenShare => {
                if self.screen_track.is_some() {
                    return Ok(());
                }
                let screen = self.devices.open_display().await?;
                peer.swap_video_track(Some(&screen)).await?;
                self.screen_track = Some(screen);
                info!("screen share started");
            }
            ControlOp::StopScreenShare => {
                let Some(screen) = self.screen_track.take() else {
                    return Ok(());
                };
                screen.stop();
                peer.swap_video_track(self.media.track_of_kind(TrackKind::Video))
                    .await?;
                info!("screen share stopped");
            }
            ControlOp::Pin(user) => {
                self.pinned = user;
            }
            ControlOp::ToggleFullscreen => {
                self.fullscreen = !self.fullscreen;
            }
        }
        Ok(())
    }

    /// Stop the display track too when the session tears down.
    pub fn release(&mut self) {
        if let Some(screen) = self.screen_track.take() {
            screen.stop();
        }
    }
}
