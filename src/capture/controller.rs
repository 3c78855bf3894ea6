use super::types::{CaptureSource, CapturedFrame, EncodedImage, SurfaceMount, PROFILES};
use super::{CameraBackend, OpenError, VideoStream};
use crate::error::SessionError;
use anyhow::{Context, Result};
use image::codecs::jpeg::JpegEncoder;
use image::imageops::{self, FilterType};
use std::path::Path;
use std::time::Duration;

/// Delay before retrying a profile whose stream had no surface to bind to
pub const SURFACE_RETRY_DELAY: Duration = Duration::from_millis(100);

/// Raster size used when the stream reports no resolution
pub const DEFAULT_FRAME_SIZE: (u32, u32) = (1280, 720);

pub const JPEG_QUALITY: u8 = 80;

/// Owns the single camera stream and the held upload preview.
///
/// At most one stream is bound at a time. Every path that binds a new stream
/// or accepts an upload releases the previous stream first.
pub struct MediaController {
    backend: Box<dyn CameraBackend>,
    surface: SurfaceMount,
    stream: Option<Box<dyn VideoStream>>,
    preview: Option<EncodedImage>,
    active: bool,
}

impl MediaController {
    pub fn new(backend: Box<dyn CameraBackend>, surface: SurfaceMount) -> Self {
        Self {
            backend,
            surface,
            stream: None,
            preview: None,
            active: false,
        }
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn preview(&self) -> Option<&EncodedImage> {
        self.preview.as_ref()
    }

    /// Acquire a live stream, starting at `attempt_level` and relaxing the
    /// constraint profile after each non-permission failure.
    pub async fn acquire_camera(&mut self, attempt_level: usize) -> Result<(), SessionError> {
        if !self.backend.is_supported() {
            tracing::warn!("No media capture capability available");
            return Err(SessionError::Unsupported);
        }

        self.release_camera();

        let mut level = attempt_level;
        loop {
            let Some(profile) = PROFILES.get(level) else {
                tracing::warn!("All {} constraint profiles failed", PROFILES.len());
                return Err(SessionError::Exhausted);
            };

            tracing::debug!("Requesting camera stream with profile {} ({})", level, profile.name);

            let mut stream = match self.backend.open(profile).await {
                Ok(stream) => stream,
                Err(OpenError::PermissionDenied(reason)) => {
                    tracing::warn!("Camera access denied: {}", reason);
                    return Err(SessionError::PermissionDenied);
                }
                Err(OpenError::Unavailable(reason)) => {
                    tracing::debug!("Profile {} failed: {}", profile.name, reason);
                    level += 1;
                    continue;
                }
            };

            if !self.surface.is_mounted() {
                tracing::debug!(
                    "Preview surface not mounted, retrying profile {} in {:?}",
                    profile.name,
                    SURFACE_RETRY_DELAY
                );
                stream.stop();
                tokio::time::sleep(SURFACE_RETRY_DELAY).await;
                continue;
            }

            if let Err(err) = stream.play().await {
                tracing::warn!("Stream playback rejected: {:#}", err);
                stream.stop();
                return Err(SessionError::PlaybackRejected);
            }

            self.stream = Some(stream);
            self.active = true;
            self.preview = None;
            tracing::info!("Camera active with profile {}", profile.name);
            return Ok(());
        }
    }

    /// Stop and detach the bound stream. No-op when nothing is bound.
    pub fn release_camera(&mut self) {
        if let Some(mut stream) = self.stream.take() {
            stream.stop();
            tracing::debug!("Camera stream released");
        }
        self.active = false;
    }

    /// Produce one still frame.
    ///
    /// Returns `Ok(None)` when there was nothing to capture from; in that case
    /// camera acquisition has been started instead.
    pub async fn capture_frame(&mut self) -> Result<Option<CapturedFrame>, SessionError> {
        if let Some(preview) = &self.preview {
            return Ok(Some(CapturedFrame {
                image: preview.clone(),
                source: CaptureSource::Upload,
            }));
        }

        if !self.active || self.stream.is_none() {
            tracing::info!("Camera not active, starting acquisition instead of capturing");
            self.acquire_camera(0).await?;
            return Ok(None);
        }
        let Some(stream) = self.stream.as_mut() else {
            return Ok(None);
        };

        let size = stream
            .native_resolution()
            .filter(|&(width, height)| width > 0 && height > 0)
            .unwrap_or(DEFAULT_FRAME_SIZE);

        let image = draw_and_encode(&mut **stream, size).map_err(|err| {
            tracing::warn!("Frame capture failed: {:#}", err);
            SessionError::CaptureFailed
        })?;

        Ok(Some(CapturedFrame {
            image,
            source: CaptureSource::Live,
        }))
    }

    /// Read an image file into the held preview, releasing the camera.
    pub async fn accept_uploaded_file(&mut self, path: &Path) -> Result<EncodedImage, SessionError> {
        let bytes = tokio::fs::read(path)
            .await
            .map_err(|err| SessionError::UploadRejected(format!("{}: {}", path.display(), err)))?;

        let format = image::guess_format(&bytes).map_err(|_| {
            SessionError::UploadRejected(format!("{} is not a recognised image", path.display()))
        })?;

        let upload = EncodedImage::new(format.to_mime_type(), bytes);

        self.release_camera();
        self.preview = Some(upload.clone());

        tracing::info!(
            "Accepted upload {} ({}, {} bytes)",
            path.display(),
            upload.mime_type(),
            upload.bytes().len()
        );

        Ok(upload)
    }

    /// Drop the held upload so the next capture goes back to the camera
    pub fn clear_preview(&mut self) {
        if self.preview.take().is_some() {
            tracing::debug!("Upload preview cleared");
        }
    }
}

impl Drop for MediaController {
    fn drop(&mut self) {
        self.release_camera();
    }
}

/// Draw the current frame into a raster of `size` and JPEG-encode it
fn draw_and_encode(stream: &mut dyn VideoStream, (width, height): (u32, u32)) -> Result<EncodedImage> {
    let _span = tracing::debug_span!("draw_and_encode").entered();

    let frame = stream.read_frame().context("Failed to read frame")?;

    let raster = if frame.dimensions() != (width, height) {
        imageops::resize(&frame, width, height, FilterType::Triangle)
    } else {
        frame
    };

    let mut bytes = Vec::new();
    JpegEncoder::new_with_quality(&mut bytes, JPEG_QUALITY)
        .encode_image(&raster)
        .context("Failed to encode frame")?;

    Ok(EncodedImage::jpeg(bytes))
}
