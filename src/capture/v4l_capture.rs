use super::types::{ConstraintProfile, Facing};
use super::{CameraBackend, OpenError, VideoStream};
use anyhow::{Context, Result};
use async_trait::async_trait;
use image::RgbImage;
use nokhwa::pixel_format::RgbFormat;
use nokhwa::utils::{
    ApiBackend, CameraFormat, CameraIndex, CameraInfo, FrameFormat, RequestedFormat, RequestedFormatType, Resolution,
};
use nokhwa::{Camera, NokhwaError};

const IDEAL_FRAME_RATE: u32 = 30;

/// Camera backend over nokhwa's native capture API
pub struct NokhwaBackend {
    api: ApiBackend,
}

impl NokhwaBackend {
    pub fn new() -> Self {
        Self { api: ApiBackend::Auto }
    }

    fn select_device(&self, facing: Option<Facing>) -> Result<CameraIndex, OpenError> {
        let devices = nokhwa::query(self.api).map_err(classify_open_error)?;
        if devices.is_empty() {
            return Err(OpenError::Unavailable("no cameras detected".to_string()));
        }

        let Some(facing) = facing else {
            return Ok(devices[0].index().clone());
        };

        devices
            .iter()
            .find(|info| device_facing(info) == Some(facing))
            .map(|info| info.index().clone())
            .ok_or_else(|| OpenError::Unavailable(format!("no {} camera", facing)))
    }
}

impl Default for NokhwaBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait(?Send)]
impl CameraBackend for NokhwaBackend {
    /// Only reports whether a capture backend is compiled in. Device and
    /// permission failures surface from `open` instead.
    fn is_supported(&self) -> bool {
        nokhwa::native_api_backend().is_some()
    }

    async fn open(&self, profile: &ConstraintProfile) -> Result<Box<dyn VideoStream>, OpenError> {
        let index = self.select_device(profile.facing)?;

        let format = match profile.ideal_resolution {
            Some((width, height)) => RequestedFormatType::Closest(CameraFormat::new(
                Resolution::new(width, height),
                FrameFormat::MJPEG,
                IDEAL_FRAME_RATE,
            )),
            None => RequestedFormatType::AbsoluteHighestResolution,
        };
        let requested = RequestedFormat::new::<RgbFormat>(format);

        tracing::info!("Opening camera {} with profile {}", index, profile.name);

        let camera = Camera::new(index, requested).map_err(classify_open_error)?;

        Ok(Box::new(NokhwaStream {
            camera,
            streaming: false,
        }))
    }
}

struct NokhwaStream {
    camera: Camera,
    streaming: bool,
}

#[async_trait(?Send)]
impl VideoStream for NokhwaStream {
    async fn play(&mut self) -> Result<()> {
        self.camera
            .open_stream()
            .context("Failed to open camera stream")?;
        self.streaming = true;

        let resolution = self.camera.resolution();
        tracing::info!(
            "Streaming from {} at {}x{}",
            self.camera.info().human_name(),
            resolution.width(),
            resolution.height()
        );
        Ok(())
    }

    fn native_resolution(&self) -> Option<(u32, u32)> {
        let resolution = self.camera.resolution();
        Some((resolution.width(), resolution.height()))
    }

    fn read_frame(&mut self) -> Result<RgbImage> {
        let frame = self
            .camera
            .frame()
            .context("Failed to capture frame")?;

        let decoded = frame.decode_image::<RgbFormat>()
            .context("Failed to decode frame")?;

        Ok(decoded)
    }

    fn stop(&mut self) {
        if !self.streaming {
            return;
        }
        if let Err(err) = self.camera.stop_stream() {
            tracing::warn!("Failed to stop camera stream: {}", err);
        }
        self.streaming = false;
    }
}

/// Guess which way a device faces from its advertised name
fn device_facing(info: &CameraInfo) -> Option<Facing> {
    facing_from_name(&info.human_name())
}

fn facing_from_name(name: &str) -> Option<Facing> {
    let name = name.to_ascii_lowercase();
    if ["rear", "back", "environment", "world"].iter().any(|hint| name.contains(hint)) {
        Some(Facing::Rear)
    } else if ["front", "user", "facetime", "integrated", "selfie"].iter().any(|hint| name.contains(hint)) {
        Some(Facing::Front)
    } else {
        None
    }
}

fn classify_open_error(err: NokhwaError) -> OpenError {
    let message = err.to_string();
    if is_permission_denial(&message) {
        OpenError::PermissionDenied(message)
    } else {
        OpenError::Unavailable(message)
    }
}

fn is_permission_denial(message: &str) -> bool {
    let message = message.to_ascii_lowercase();
    [
        "permission denied",
        "not authorized",
        "not authorised",
        "access denied",
        "not permitted",
        "os error 13",
    ]
    .iter()
    .any(|needle| message.contains(needle))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn permission_errors_are_recognised() {
        assert!(is_permission_denial("Could not open device /dev/video0: Permission denied (os error 13)"));
        assert!(is_permission_denial("AVFoundation: camera access Not Authorized"));
        assert!(!is_permission_denial("Device or resource busy (os error 16)"));
        assert!(!is_permission_denial("no cameras detected"));
    }

    #[test]
    fn device_errors_are_classified_by_cause() {
        let denied = classify_open_error(NokhwaError::OpenDeviceError(
            "/dev/video0".to_string(),
            "Permission denied (os error 13)".to_string(),
        ));
        assert!(matches!(denied, OpenError::PermissionDenied(_)));

        let query_failed = classify_open_error(NokhwaError::GeneralError("Permission denied".to_string()));
        assert!(matches!(query_failed, OpenError::PermissionDenied(_)));

        let busy = classify_open_error(NokhwaError::OpenDeviceError(
            "/dev/video0".to_string(),
            "Device or resource busy (os error 16)".to_string(),
        ));
        assert!(matches!(busy, OpenError::Unavailable(_)));
    }

    #[test]
    fn facing_is_inferred_from_device_name() {
        assert_eq!(facing_from_name("Back Camera"), Some(Facing::Rear));
        assert_eq!(facing_from_name("FaceTime HD Camera"), Some(Facing::Front));
        assert_eq!(facing_from_name("Integrated Webcam"), Some(Facing::Front));
        assert_eq!(facing_from_name("USB 2.0 Camera"), None);
    }
}
