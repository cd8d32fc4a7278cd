use std::fmt;
use std::fs::File;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::codec::Codec;
use crate::error::{ConfigError, SourceError};

pub const CAMERA_DEVICE_PREFIX: &str = "/dev/video";
pub const CAMERA_AUTO: &str = "auto";
pub const RTSP_SCHEME: &str = "rtsp://";
pub const CAMERA_DEFAULT_DIMS: Dimensions = Dimensions {
    width: 640,
    height: 480,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    Camera,
    File,
    Rtsp,
}

impl SourceKind {
    pub fn as_str(self) -> &'static str {
        match self {
            SourceKind::Camera => "camera",
            SourceKind::File => "file",
            SourceKind::Rtsp => "rtsp",
        }
    }

    /// Lexical classification: device paths and `auto` are cameras, `rtsp://`
    /// URLs are streams, and anything else must open as a local file.
    pub fn classify(source: &str) -> Result<Self, SourceError> {
        if source.starts_with(CAMERA_DEVICE_PREFIX) || is_auto_camera(source) {
            return Ok(SourceKind::Camera);
        }
        if source.starts_with(RTSP_SCHEME) {
            return Ok(SourceKind::Rtsp);
        }
        ensure_readable(source)?;
        Ok(SourceKind::File)
    }
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SourceKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "camera" => Ok(SourceKind::Camera),
            "file" | "video" => Ok(SourceKind::File),
            "rtsp" => Ok(SourceKind::Rtsp),
            _ => Err(ConfigError::UnknownSourceType(s.to_string())),
        }
    }
}

pub fn is_auto_camera(source: &str) -> bool {
    source.eq_ignore_ascii_case(CAMERA_AUTO)
}

pub fn ensure_readable(path: &str) -> Result<(), SourceError> {
    File::open(path)
        .map(|_| ())
        .map_err(|cause| SourceError::NotFound {
            source_str: path.to_string(),
            cause,
        })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DimensionsError {
    #[error("Invalid dimensions \"{0}\", expected WIDTHxHEIGHT")]
    Malformed(String),
    #[error("Dimensions must be positive integers")]
    NonPositive,
}

impl Dimensions {
    pub fn new(width: u32, height: u32) -> Result<Self, DimensionsError> {
        if width == 0 || height == 0 {
            return Err(DimensionsError::NonPositive);
        }
        Ok(Self { width, height })
    }
}

impl fmt::Display for Dimensions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

impl FromStr for Dimensions {
    type Err = DimensionsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let malformed = || DimensionsError::Malformed(s.to_string());
        let (width, height) = s.trim().split_once('x').ok_or_else(malformed)?;
        // Signed parse so "-640x480" reports as non-positive rather than malformed.
        let width: i64 = width.trim().parse().map_err(|_| malformed())?;
        let height: i64 = height.trim().parse().map_err(|_| malformed())?;
        if width <= 0 || height <= 0 {
            return Err(DimensionsError::NonPositive);
        }
        let width = u32::try_from(width).map_err(|_| malformed())?;
        let height = u32::try_from(height).map_err(|_| malformed())?;
        Dimensions::new(width, height)
    }
}

impl Serialize for Dimensions {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Dimensions {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// A fully resolved input: what kind it is, where it lives and how to decode it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputSource {
    pub kind: SourceKind,
    pub location: String,
    pub dims: Option<Dimensions>,
    pub codec: Option<Codec>,
}

impl InputSource {
    pub fn camera(device: impl Into<String>, dims: Option<Dimensions>) -> Self {
        Self {
            kind: SourceKind::Camera,
            location: device.into(),
            dims,
            codec: None,
        }
    }

    pub fn file(path: impl Into<String>, codec: Codec) -> Self {
        Self {
            kind: SourceKind::File,
            location: path.into(),
            dims: None,
            codec: Some(codec),
        }
    }

    pub fn rtsp(url: impl Into<String>, codec: Codec, dims: Option<Dimensions>) -> Self {
        Self {
            kind: SourceKind::Rtsp,
            location: url.into(),
            dims,
            codec: Some(codec),
        }
    }

    pub fn camera_dims(&self) -> Dimensions {
        self.dims.unwrap_or(CAMERA_DEFAULT_DIMS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_well_formed_dimensions() {
        let dims: Dimensions = "1920x1080".parse().unwrap();
        assert_eq!(dims, Dimensions::new(1920, 1080).unwrap());
        assert_eq!(dims.to_string(), "1920x1080");
    }

    #[test]
    fn rejects_anything_but_two_positive_integers() {
        for raw in ["", "640", "640x", "x480", "640x480x3", "axb", "6.4x4.8", "640*480"] {
            assert!(
                matches!(raw.parse::<Dimensions>(), Err(DimensionsError::Malformed(_))),
                "{raw:?} should be malformed"
            );
        }
        for raw in ["0x480", "640x0", "-640x480", "640x-1"] {
            assert_eq!(
                raw.parse::<Dimensions>(),
                Err(DimensionsError::NonPositive),
                "{raw:?} should be non-positive"
            );
        }
    }

    #[test]
    fn unknown_kind_is_a_config_error() {
        assert!(matches!(
            "usb".parse::<SourceKind>(),
            Err(ConfigError::UnknownSourceType(ref name)) if name == "usb"
        ));
        assert_eq!("Video".parse::<SourceKind>().unwrap(), SourceKind::File);
    }
}
