use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::params::ParamRequest;
use crate::runner::{DEFAULT_SHUTDOWN_TIMEOUT, GST_LAUNCH, LaunchEnv};
use crate::source::{Dimensions, SourceKind};

pub const CONFIG_VERSION: u32 = 1;

/// Demo defaults stored as YAML. Every field is optional; anything left
/// unset is asked for interactively.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DemoConfig {
    #[serde(default = "default_version")]
    pub version: u32,
    #[serde(default)]
    pub source: SourceSection,
    #[serde(default)]
    pub model: ModelSection,
    #[serde(default)]
    pub inference: InferenceSection,
    #[serde(default)]
    pub display: DisplaySection,
    #[serde(default)]
    pub runner: RunnerSection,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub environment: BTreeMap<String, String>,
}

impl Default for DemoConfig {
    fn default() -> Self {
        Self {
            version: CONFIG_VERSION,
            source: SourceSection::default(),
            model: ModelSection::default(),
            inference: InferenceSection::default(),
            display: DisplaySection::default(),
            runner: RunnerSection::default(),
            environment: BTreeMap::new(),
        }
    }
}

fn default_version() -> u32 {
    CONFIG_VERSION
}

// Kind, dims and codec stay strings here so `config validate` can report
// every bad value instead of failing on the first one during parsing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SourceSection {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dims: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub codec: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ModelSection {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub labels: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InferenceSection {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub skip: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_results: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub threshold: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DisplaySection {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fullscreen: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunnerSection {
    #[serde(default = "default_gst_launch")]
    pub gst_launch: String,
    #[serde(default = "default_model_check")]
    pub model_check: String,
    #[serde(default = "default_shutdown_timeout_secs")]
    pub shutdown_timeout_secs: u64,
    #[serde(default = "default_probe_buffers")]
    pub probe_buffers: u32,
}

impl Default for RunnerSection {
    fn default() -> Self {
        Self {
            gst_launch: default_gst_launch(),
            model_check: default_model_check(),
            shutdown_timeout_secs: default_shutdown_timeout_secs(),
            probe_buffers: default_probe_buffers(),
        }
    }
}

fn default_gst_launch() -> String {
    GST_LAUNCH.to_string()
}

fn default_model_check() -> String {
    crate::model::MODEL_CHECK.to_string()
}

fn default_shutdown_timeout_secs() -> u64 {
    DEFAULT_SHUTDOWN_TIMEOUT.as_secs()
}

fn default_probe_buffers() -> u32 {
    crate::validator::DEFAULT_PROBE_BUFFERS
}

impl RunnerSection {
    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_secs(self.shutdown_timeout_secs)
    }
}

impl DemoConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let config: DemoConfig = serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse config YAML: {}", path.display()))?;
        Ok(config)
    }

    /// Layers `other` on top of `self`: values set in `other` win.
    pub fn overlay(mut self, other: DemoConfig) -> Self {
        fn pick<T>(base: &mut Option<T>, top: Option<T>) {
            if top.is_some() {
                *base = top;
            }
        }
        self.version = other.version;
        pick(&mut self.source.input, other.source.input);
        pick(&mut self.source.kind, other.source.kind);
        pick(&mut self.source.dims, other.source.dims);
        pick(&mut self.source.codec, other.source.codec);
        pick(&mut self.model.path, other.model.path);
        pick(&mut self.model.labels, other.model.labels);
        pick(&mut self.inference.skip, other.inference.skip);
        pick(&mut self.inference.max_results, other.inference.max_results);
        pick(&mut self.inference.threshold, other.inference.threshold);
        pick(&mut self.display.fullscreen, other.display.fullscreen);
        if other.runner != RunnerSection::default() {
            self.runner = other.runner;
        }
        self.environment.extend(other.environment);
        self
    }

    /// Converts into collector presets. Malformed values are an error here;
    /// out-of-range numbers pass through and are re-asked by the prompter.
    pub fn to_request(&self) -> Result<ParamRequest> {
        let kind = self
            .source
            .kind
            .as_deref()
            .map(str::parse::<SourceKind>)
            .transpose()?;
        let dims = self
            .source
            .dims
            .as_deref()
            .map(str::parse::<Dimensions>)
            .transpose()
            .context("Invalid source.dims")?;
        Ok(ParamRequest {
            input: self.source.input.clone().filter(|s| !s.trim().is_empty()),
            kind,
            dims,
            codec: self.source.codec.clone(),
            model: self.model.path.clone(),
            inference_skip: self.inference.skip.and_then(|v| u32::try_from(v).ok()),
            max_results: self
                .inference
                .max_results
                .and_then(|v| u32::try_from(v).ok()),
            threshold: self.inference.threshold,
            fullscreen: self.display.fullscreen,
            overlay_labels: self.model.labels.clone(),
        })
    }

    pub fn launch_env(&self) -> LaunchEnv {
        self.environment
            .iter()
            .fold(LaunchEnv::wayland(), |env, (key, value)| {
                env.with(key.clone(), value.clone())
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_uses_defaults() {
        let config: DemoConfig = serde_yaml::from_str("{}").unwrap();
        assert_eq!(config.version, CONFIG_VERSION);
        assert_eq!(config.runner, RunnerSection::default());
        assert_eq!(config.to_request().unwrap(), ParamRequest::default());
    }

    #[test]
    fn overlay_prefers_the_upper_layer() {
        let base: DemoConfig = serde_yaml::from_str(
            "source: { input: AUTO, dims: 640x480 }\ninference: { skip: 1, threshold: 0.5 }",
        )
        .unwrap();
        let top: DemoConfig =
            serde_yaml::from_str("source: { input: /dev/video2 }\ninference: { threshold: 0.7 }")
                .unwrap();
        let merged = base.overlay(top);
        assert_eq!(merged.source.input.as_deref(), Some("/dev/video2"));
        assert_eq!(merged.source.dims.as_deref(), Some("640x480"));
        assert_eq!(merged.inference.skip, Some(1));
        assert_eq!(merged.inference.threshold, Some(0.7));
    }

    #[test]
    fn environment_extends_wayland_defaults() {
        let config: DemoConfig =
            serde_yaml::from_str("environment: { WAYLAND_DISPLAY: wayland-0, GST_DEBUG: '2' }")
                .unwrap();
        let env = config.launch_env();
        assert_eq!(env.get("WAYLAND_DISPLAY"), Some("wayland-0"));
        assert_eq!(env.get("GST_DEBUG"), Some("2"));
        assert_eq!(env.get("QT_QPA_PLATFORM"), Some("wayland"));
    }

    #[test]
    fn unknown_kind_fails_request_conversion() {
        let config: DemoConfig = serde_yaml::from_str("source: { kind: usb }").unwrap();
        let err = config.to_request().unwrap_err();
        assert!(err.to_string().contains("invalid input type \"usb\""));
    }
}
