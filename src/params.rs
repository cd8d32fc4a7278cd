use std::io::{BufRead, Write};
use std::path::PathBuf;

use tracing::{info, warn};

use crate::camera::auto_select_camera;
use crate::codec::Codec;
use crate::error::{DemoError, SourceError};
use crate::model::{self, ModelCheck};
use crate::prompt::Prompter;
use crate::source::{self, CAMERA_DEFAULT_DIMS, Dimensions, InputSource, SourceKind};
use crate::validator::SourceProbe;

pub const DEFAULT_INFERENCE_SKIP: u32 = 1;
pub const DEFAULT_MAX_RESULTS: u32 = 5;
pub const DEFAULT_THRESHOLD: f64 = 0.5;
pub const DEFAULT_OVERLAY_LABELS: &str = "/usr/share/synap/models/object_detection/coco/info.json";

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InferenceSettings {
    /// Frames skipped between successive inferences.
    pub skip: u32,
    pub max_results: u32,
    pub threshold: f64,
}

impl Default for InferenceSettings {
    fn default() -> Self {
        Self {
            skip: DEFAULT_INFERENCE_SKIP,
            max_results: DEFAULT_MAX_RESULTS,
            threshold: DEFAULT_THRESHOLD,
        }
    }
}

/// Everything the pipeline generator needs, fully validated.
#[derive(Debug, Clone, PartialEq)]
pub struct DemoParams {
    pub source: InputSource,
    pub model: PathBuf,
    pub model_input: Dimensions,
    pub inference: InferenceSettings,
    pub fullscreen: bool,
    pub overlay_labels: String,
}

/// Values already known before any question is asked. `None` means "ask".
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParamRequest {
    pub input: Option<String>,
    pub kind: Option<SourceKind>,
    pub dims: Option<Dimensions>,
    pub codec: Option<String>,
    pub model: Option<PathBuf>,
    pub inference_skip: Option<u32>,
    pub max_results: Option<u32>,
    pub threshold: Option<f64>,
    pub fullscreen: Option<bool>,
    pub overlay_labels: Option<String>,
}

pub struct ParamCollector<'a, R, W> {
    prompter: &'a mut Prompter<R, W>,
    probe: &'a SourceProbe<'a>,
    model_check: &'a ModelCheck<'a>,
    skip_validation: bool,
}

impl<'a, R: BufRead, W: Write> ParamCollector<'a, R, W> {
    pub fn new(
        prompter: &'a mut Prompter<R, W>,
        probe: &'a SourceProbe<'a>,
        model_check: &'a ModelCheck<'a>,
    ) -> Self {
        Self {
            prompter,
            probe,
            model_check,
            skip_validation: false,
        }
    }

    /// Skips source probes and the model checker. Camera discovery still probes.
    pub fn skip_validation(mut self, skip: bool) -> Self {
        self.skip_validation = skip;
        self
    }

    pub fn collect(&mut self, request: ParamRequest) -> Result<DemoParams, DemoError> {
        let source = self.resolve_source(&request)?;
        let model = self.model_path(request.model)?;
        let model_input = model::input_dimensions(&model)?;
        info!(model = %model.display(), input = %model_input, "Model input size");

        let skip = self.prompter.bounded(
            "How many frames to skip between each inference",
            request.inference_skip,
            DEFAULT_INFERENCE_SKIP,
            0..=u32::MAX,
        )?;
        let max_results = self.prompter.bounded(
            "Maximum number of detections returned per frame",
            request.max_results,
            DEFAULT_MAX_RESULTS,
            0..=u32::MAX,
        )?;
        let threshold = self.prompter.bounded(
            "Confidence threshold for inferences",
            request.threshold,
            DEFAULT_THRESHOLD,
            0.0..=1.0,
        )?;
        let fullscreen = match request.fullscreen {
            Some(fullscreen) => fullscreen,
            None => self.prompter.confirm("Launch demo in fullscreen?")?,
        };

        Ok(DemoParams {
            source,
            model,
            model_input,
            inference: InferenceSettings {
                skip,
                max_results,
                threshold,
            },
            fullscreen,
            overlay_labels: request
                .overlay_labels
                .unwrap_or_else(|| DEFAULT_OVERLAY_LABELS.to_string()),
        })
    }

    pub fn resolve_source(&mut self, request: &ParamRequest) -> Result<InputSource, DemoError> {
        let location = self.prompter.text("Input source", request.input.clone())?;
        let kind = match request.kind {
            Some(kind) => {
                if kind == SourceKind::File {
                    source::ensure_readable(&location)?;
                }
                kind
            }
            None => SourceKind::classify(&location)?,
        };

        let resolved = match kind {
            SourceKind::Camera => {
                let dims = self.prompter.dimensions(
                    "Camera input size",
                    request.dims,
                    Some(CAMERA_DEFAULT_DIMS),
                )?;
                if source::is_auto_camera(&location) {
                    let device = auto_select_camera(self.probe, dims)?;
                    // Discovery already ran the probe on this device.
                    return Ok(InputSource::camera(device, Some(dims)));
                }
                InputSource::camera(location, Some(dims))
            }
            SourceKind::File | SourceKind::Rtsp => {
                let codec = self.codec(request.codec.clone(), request.input.is_some())?;
                if kind == SourceKind::File {
                    if request.dims.is_some() {
                        warn!("Input dimensions are ignored for video files");
                    }
                    InputSource::file(location, codec)
                } else {
                    InputSource::rtsp(location, codec, request.dims)
                }
            }
        };

        if !self.skip_validation && !self.probe.probe(&resolved, false)? {
            return Err(SourceError::Rejected {
                kind: resolved.kind,
                location: resolved.location,
            }
            .into());
        }
        Ok(resolved)
    }

    /// A source given up front without a codec is assumed to be h264.
    fn codec(&mut self, preset: Option<String>, source_preset: bool) -> Result<Codec, DemoError> {
        let name = match preset {
            Some(name) => name,
            None if source_preset => Codec::default().name().to_string(),
            None => self.prompter.text_or_default(
                "[Optional] Codec [av1 / h264 (default) / h265]",
                Codec::default().name(),
            )?,
        };
        Ok(name.parse::<Codec>()?)
    }

    fn model_path(&mut self, preset: Option<PathBuf>) -> Result<PathBuf, DemoError> {
        let mut pending = preset;
        loop {
            let path = match pending.take() {
                Some(path) => path,
                None => PathBuf::from(self.prompter.text("Model file path", None)?),
            };
            if self.skip_validation || self.model_check.check(&path)? {
                return Ok(path);
            }
        }
    }
}
