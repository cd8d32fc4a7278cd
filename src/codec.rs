use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::SourceError;

/// Compressed video formats the demo pipelines know how to parse and decode.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Codec {
    Av1,
    #[default]
    H264,
    H265,
}

impl Codec {
    pub const ALL: [Codec; 3] = [Codec::Av1, Codec::H264, Codec::H265];

    pub fn name(self) -> &'static str {
        match self {
            Codec::Av1 => "av1",
            Codec::H264 => "h264",
            Codec::H265 => "h265",
        }
    }

    /// Parser and decoder element names, in link order.
    pub fn elements(self) -> (&'static str, &'static str) {
        match self {
            Codec::Av1 => ("av1parse", "v4l2av1dec"),
            Codec::H264 => ("h264parse", "avdec_h264"),
            Codec::H265 => ("h265parse", "avdec_h265"),
        }
    }

    pub fn depayloader(self) -> &'static str {
        match self {
            Codec::Av1 => "rtpav1depay",
            Codec::H264 => "rtph264depay",
            Codec::H265 => "rtph265depay",
        }
    }

    pub fn caps(self) -> String {
        format!("video/x-{}", self.name())
    }
}

impl fmt::Display for Codec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Codec {
    type Err = SourceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_lowercase();
        Codec::ALL
            .into_iter()
            .find(|codec| codec.name() == normalized)
            .ok_or_else(|| SourceError::UnsupportedCodec(s.trim().to_string()))
    }
}
