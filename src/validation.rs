use serde::Serialize;

use crate::codec::Codec;
use crate::config::{CONFIG_VERSION, DemoConfig, InferenceSection};
use crate::source::{Dimensions, SourceKind};

#[derive(Debug, Default, Serialize)]
pub struct ValidationReport {
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

impl ValidationReport {
    pub fn is_ok(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn merge(&mut self, other: ValidationReport) {
        self.errors.extend(other.errors);
        self.warnings.extend(other.warnings);
    }
}

/// Checks a config without touching the hardware: no probes and no model
/// checker. A missing model file is only a warning because configs are often
/// written on a host and used on the board.
pub fn validate_config(config: &DemoConfig) -> ValidationReport {
    let mut report = ValidationReport::default();

    if config.version != CONFIG_VERSION {
        report
            .errors
            .push(format!("Unsupported config version: {}", config.version));
    }

    report.merge(validate_source(config));
    report.merge(validate_inference(&config.inference));

    if let Some(path) = &config.model.path {
        if path.as_os_str().is_empty() {
            report.errors.push("model.path cannot be empty".into());
        } else if !path.exists() {
            report
                .warnings
                .push(format!("Model file not found: {}", path.display()));
        }
    }

    if config.runner.gst_launch.trim().is_empty() {
        report.errors.push("runner.gst_launch cannot be empty".into());
    }
    if config.runner.model_check.trim().is_empty() {
        report.errors.push("runner.model_check cannot be empty".into());
    }
    if config.runner.shutdown_timeout_secs == 0 {
        report
            .errors
            .push("runner.shutdown_timeout_secs must be at least 1".into());
    }
    if config.runner.probe_buffers == 0 {
        report
            .errors
            .push("runner.probe_buffers must be at least 1".into());
    }

    for key in config.environment.keys() {
        if key.trim().is_empty() || key.contains('=') {
            report
                .errors
                .push(format!("Invalid environment variable name '{key}'"));
        }
    }

    report
}

fn validate_source(config: &DemoConfig) -> ValidationReport {
    let mut report = ValidationReport::default();
    let source = &config.source;

    let kind = match source.kind.as_deref().map(str::parse::<SourceKind>) {
        Some(Ok(kind)) => Some(kind),
        Some(Err(err)) => {
            report.errors.push(format!("source.kind: {err}"));
            None
        }
        None => None,
    };

    if let Some(codec) = &source.codec
        && let Err(err) = codec.parse::<Codec>()
    {
        report.errors.push(format!("source.codec: {err}"));
    }
    if let Some(dims) = &source.dims
        && let Err(err) = dims.parse::<Dimensions>()
    {
        report.errors.push(format!("source.dims: {err}"));
    }

    match kind {
        Some(SourceKind::Camera) if source.codec.is_some() => report
            .warnings
            .push("source.codec is ignored for camera sources".into()),
        Some(SourceKind::File) if source.dims.is_some() => report
            .warnings
            .push("source.dims is ignored for video files".into()),
        _ => {}
    }

    if let Some(input) = &source.input
        && input.trim().is_empty()
    {
        report
            .warnings
            .push("source.input is blank and will be asked for".into());
    }

    report
}

fn validate_inference(inference: &InferenceSection) -> ValidationReport {
    let mut report = ValidationReport::default();
    let counters = [
        ("inference.skip", inference.skip),
        ("inference.max_results", inference.max_results),
    ];
    for (name, value) in counters {
        if let Some(value) = value
            && !(0..=i64::from(u32::MAX)).contains(&value)
        {
            report.errors.push(format!(
                "{name} must be >= 0 and <= {}, got {value}",
                u32::MAX
            ));
        }
    }
    if let Some(threshold) = inference.threshold
        && !(0.0..=1.0).contains(&threshold)
    {
        report.errors.push(format!(
            "inference.threshold must be >= 0 and <= 1, got {threshold}"
        ));
    }
    report
}
