#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum Facing {
    User,
    Environment,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VideoConstraints {
    pub ideal_width: u32,
    pub ideal_height: u32,
    pub aspect_ratio: f64,
    pub facing: Facing,
    pub min_frame_rate: u32,
    pub max_frame_rate: u32,
}

impl Default for VideoConstraints {
    fn default() -> Self {
        Self {
            ideal_width: 1280,
            ideal_height: 720,
            aspect_ratio: 16.0 / 9.0,
            facing: Facing::User,
            min_frame_rate: 30,
            max_frame_rate: 60,
        }
    }
}

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub struct AudioConstraints {
    pub echo_cancellation: bool,
    pub noise_suppression: bool,
    pub auto_gain_control: bool,
}

impl Default for AudioConstraints {
    fn default() -> Self {
        Self {
            echo_cancellation: true,
            noise_suppression: true,
            auto_gain_control: true,
        }
    }
}

/// What to ask the device layer for. `None` for a kind means the kind
/// is not requested at all.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct CaptureConstraints {
    pub video: Option<VideoConstraints>,
    pub audio: Option<AudioConstraints>,
}

impl CaptureConstraints {
    pub fn video_and_audio() -> Self {
        Self {
            video: Some(VideoConstraints::default()),
            audio: Some(AudioConstraints::default()),
        }
    }

    pub fn audio_only() -> Self {
        Self {
            video: None,
            audio: Some(AudioConstraints::default()),
        }
    }
}
