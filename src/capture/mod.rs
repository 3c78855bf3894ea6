mod controller;
mod types;
mod v4l_capture;

pub use controller::MediaController;
pub use types::{CaptureSource, CapturedFrame, ConstraintProfile, EncodedImage, SurfaceMount};
pub use v4l_capture::NokhwaBackend;

use anyhow::Result;
use async_trait::async_trait;
use image::RgbImage;
use thiserror::Error;

/// Why a stream could not be opened for a given profile
#[derive(Debug, Error)]
pub enum OpenError {
    #[error("camera permission denied: {0}")]
    PermissionDenied(String),

    #[error("camera unavailable: {0}")]
    Unavailable(String),
}

/// Trait for camera backends
#[async_trait(?Send)]
pub trait CameraBackend {
    /// Whether the runtime offers any media capture capability
    fn is_supported(&self) -> bool;

    /// Open a stream satisfying the given profile
    async fn open(&self, profile: &ConstraintProfile) -> Result<Box<dyn VideoStream>, OpenError>;
}

/// Trait for an opened camera stream
#[async_trait(?Send)]
pub trait VideoStream {
    /// Start playback on the bound surface
    async fn play(&mut self) -> Result<()>;

    /// Resolution the stream is delivering, if known
    fn native_resolution(&self) -> Option<(u32, u32)>;

    /// Grab the current frame
    fn read_frame(&mut self) -> Result<RgbImage>;

    /// Stop every track of the stream
    fn stop(&mut self);
}
