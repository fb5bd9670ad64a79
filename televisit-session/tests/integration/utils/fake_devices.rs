use async_trait::async_trait;
use std::sync::{Arc, Mutex};
use televisit_session::{CaptureConstraints, CaptureError, DeviceProvider, LocalTrack, TrackKind};

/// Scripted device layer. Remembers every track it handed out so tests
/// can assert that teardown stopped them all.
pub struct FakeDevices {
    capture_error: Option<fn() -> CaptureError>,
    created: Mutex<Vec<Arc<LocalTrack>>>,
}

impl FakeDevices {
    /// Camera and microphone both available.
    pub fn working() -> Self {
        Self {
            capture_error: None,
            created: Mutex::new(Vec::new()),
        }
    }

    /// Every capture attempt fails as device-busy, so acquisition falls
    /// through to the empty stream.
    pub fn unavailable() -> Self {
        Self {
            capture_error: Some(|| CaptureError::Busy),
            created: Mutex::new(Vec::new()),
        }
    }

    pub fn created_tracks(&self) -> Vec<Arc<LocalTrack>> {
        self.created.lock().unwrap().clone()
    }

    pub fn all_tracks_stopped(&self) -> bool {
        self.created.lock().unwrap().iter().all(|t| !t.is_live())
    }

    fn remember(&self, track: Arc<LocalTrack>) -> Arc<LocalTrack> {
        self.created.lock().unwrap().push(track.clone());
        track
    }
}

#[async_trait]
impl DeviceProvider for FakeDevices {
    async fn open_capture(
        &self,
        constraints: &CaptureConstraints,
    ) -> Result<Vec<Arc<LocalTrack>>, CaptureError> {
        if let Some(make_error) = self.capture_error {
            return Err(make_error());
        }
        let mut tracks = Vec::new();
        if constraints.audio.is_some() {
            tracks.push(self.remember(LocalTrack::from_device(TrackKind::Audio, "mic", "local")));
        }
        if constraints.video.is_some() {
            tracks.push(self.remember(LocalTrack::from_device(
                TrackKind::Video,
                "camera",
                "local",
            )));
        }
        Ok(tracks)
    }

    async fn open_display(&self) -> Result<Arc<LocalTrack>, CaptureError> {
        Ok(self.remember(LocalTrack::from_device(
            TrackKind::Video,
            "display",
            "screen",
        )))
    }
}
