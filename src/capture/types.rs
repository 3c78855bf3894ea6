use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::Serialize;
use std::cell::Cell;
use std::fmt;
use std::rc::Rc;

/// Origin of an analyzed frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CaptureSource {
    Live,
    Upload,
}

impl CaptureSource {
    pub fn is_live(self) -> bool {
        matches!(self, CaptureSource::Live)
    }
}

impl fmt::Display for CaptureSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CaptureSource::Live => f.pad("live"),
            CaptureSource::Upload => f.pad("upload"),
        }
    }
}

/// Compressed image bytes tagged with their MIME type
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedImage {
    mime_type: String,
    bytes: Vec<u8>,
}

impl EncodedImage {
    pub fn new(mime_type: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            mime_type: mime_type.into(),
            bytes,
        }
    }

    pub fn jpeg(bytes: Vec<u8>) -> Self {
        Self::new("image/jpeg", bytes)
    }

    pub fn mime_type(&self) -> &str {
        &self.mime_type
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn to_base64(&self) -> String {
        STANDARD.encode(&self.bytes)
    }

    /// Render as a `data:` URL suitable for an image preview
    pub fn to_data_url(&self) -> String {
        format!("data:{};base64,{}", self.mime_type, self.to_base64())
    }
}

/// A still frame ready for analysis
#[derive(Debug, Clone)]
pub struct CapturedFrame {
    pub image: EncodedImage,
    pub source: CaptureSource,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Facing {
    Rear,
    Front,
}

impl fmt::Display for Facing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Facing::Rear => f.write_str("rear"),
            Facing::Front => f.write_str("front"),
        }
    }
}

/// Requested camera capabilities for one acquisition attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConstraintProfile {
    pub name: &'static str,
    pub facing: Option<Facing>,
    pub ideal_resolution: Option<(u32, u32)>,
}

/// Acquisition profiles, most specific first
pub const PROFILES: [ConstraintProfile; 4] = [
    ConstraintProfile {
        name: "rear-1080p",
        facing: Some(Facing::Rear),
        ideal_resolution: Some((1920, 1080)),
    },
    ConstraintProfile {
        name: "rear",
        facing: Some(Facing::Rear),
        ideal_resolution: None,
    },
    ConstraintProfile {
        name: "front",
        facing: Some(Facing::Front),
        ideal_resolution: None,
    },
    ConstraintProfile {
        name: "any",
        facing: None,
        ideal_resolution: None,
    },
];

/// Readiness flag for the preview surface a stream gets bound to.
///
/// Clones share the same flag, so the presentation layer can hold one end
/// and the controller the other.
#[derive(Debug, Clone, Default)]
pub struct SurfaceMount(Rc<Cell<bool>>);

impl SurfaceMount {
    pub fn mount(&self) {
        self.0.set(true);
    }

    pub fn unmount(&self) {
        self.0.set(false);
    }

    pub fn is_mounted(&self) -> bool {
        self.0.get()
    }
}
