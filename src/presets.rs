use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

use crate::config::{DemoConfig, DisplaySection, InferenceSection, ModelSection, SourceSection};
use crate::params::{
    DEFAULT_INFERENCE_SKIP, DEFAULT_MAX_RESULTS, DEFAULT_OVERLAY_LABELS, DEFAULT_THRESHOLD,
};
use crate::source::{CAMERA_DEFAULT_DIMS, SourceKind};

pub const PRESET_NAMES: [&str; 4] = ["demo", "camera", "video", "rtsp"];
pub const DEFAULT_MODEL: &str =
    "/usr/share/synap/models/object_detection/coco/model/yolov8s-640x384/model.synap";

pub fn preset_config(name: &str) -> Result<DemoConfig> {
    let config = match name {
        "demo" => DemoConfig::default(),
        "camera" => camera_preset(),
        "video" => video_preset(),
        "rtsp" => rtsp_preset(),
        other => anyhow::bail!(
            "Unknown preset '{other}'. Available presets: {}",
            PRESET_NAMES.join(", ")
        ),
    };
    Ok(config)
}

pub fn generate_preset(name: &str, destination: &Path) -> Result<PathBuf> {
    let preset = preset_config(name)?;
    let rendered = serde_yaml::to_string(&preset)?;
    if let Some(parent) = destination.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
    }
    fs::write(destination, rendered)
        .with_context(|| format!("Failed to write preset config: {}", destination.display()))?;

    Ok(destination.to_path_buf())
}

fn camera_preset() -> DemoConfig {
    DemoConfig {
        source: SourceSection {
            input: Some("AUTO".into()),
            kind: Some(SourceKind::Camera.to_string()),
            dims: Some(CAMERA_DEFAULT_DIMS.to_string()),
            codec: None,
        },
        ..canned_inference()
    }
}

fn video_preset() -> DemoConfig {
    DemoConfig {
        source: SourceSection {
            input: None,
            kind: Some(SourceKind::File.to_string()),
            dims: None,
            codec: Some("h264".into()),
        },
        ..canned_inference()
    }
}

fn rtsp_preset() -> DemoConfig {
    DemoConfig {
        source: SourceSection {
            input: None,
            kind: Some(SourceKind::Rtsp.to_string()),
            dims: None,
            codec: Some("h264".into()),
        },
        ..canned_inference()
    }
}

/// Model and inference settings shared by the camera/video/RTSP presets.
fn canned_inference() -> DemoConfig {
    DemoConfig {
        model: ModelSection {
            path: Some(PathBuf::from(DEFAULT_MODEL)),
            labels: Some(DEFAULT_OVERLAY_LABELS.into()),
        },
        inference: InferenceSection {
            skip: Some(i64::from(DEFAULT_INFERENCE_SKIP)),
            max_results: Some(i64::from(DEFAULT_MAX_RESULTS)),
            threshold: Some(DEFAULT_THRESHOLD),
        },
        display: DisplaySection {
            fullscreen: Some(false),
        },
        ..DemoConfig::default()
    }
}
