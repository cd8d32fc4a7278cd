use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::{debug, error, info};
use zip::ZipArchive;
use zip::result::ZipError;

use crate::error::{DemoError, ModelError};
use crate::observability::MetricsCollector;
use crate::runner::{Invocation, LaunchEnv, ProcessRunner, RunOutcome};
use crate::source::Dimensions;

/// Location of the metadata document inside a `.synap` archive.
pub const METADATA_ENTRY: &str = "0/model.json";
pub const MODEL_CHECK: &str = "synap_cli";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TensorLayout {
    Nhwc,
    Nchw,
}

impl TensorLayout {
    fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "nhwc" => Some(TensorLayout::Nhwc),
            "nchw" => Some(TensorLayout::Nchw),
            _ => None,
        }
    }

    /// Shape indices holding (width, height).
    fn spatial_axes(self) -> (usize, usize) {
        match self {
            TensorLayout::Nhwc => (2, 1),
            TensorLayout::Nchw => (3, 2),
        }
    }
}

/// The part of `0/model.json` this crate reads. Unknown keys are ignored.
#[derive(Debug, Deserialize)]
struct ModelMetadata {
    #[serde(rename = "Inputs")]
    inputs: Option<BTreeMap<String, InputTensor>>,
}

#[derive(Debug, Deserialize)]
struct InputTensor {
    format: Option<String>,
    shape: Option<Vec<i64>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ModelInfo {
    pub path: PathBuf,
    pub input_name: String,
    pub layout: TensorLayout,
    pub width: u32,
    pub height: u32,
    pub sha256: String,
}

impl ModelInfo {
    pub fn dims(&self) -> Dimensions {
        Dimensions {
            width: self.width,
            height: self.height,
        }
    }
}

/// Reads the single declared input tensor of the model at `path`.
pub fn inspect(path: &Path) -> Result<ModelInfo, ModelError> {
    let file = File::open(path).map_err(|source| ModelError::Open {
        path: path.to_path_buf(),
        source,
    })?;
    let mut archive = ZipArchive::new(BufReader::new(file)).map_err(|source| {
        ModelError::Archive {
            path: path.to_path_buf(),
            source,
        }
    })?;

    let metadata: ModelMetadata = {
        let entry = archive.by_name(METADATA_ENTRY).map_err(|err| match err {
            ZipError::FileNotFound => ModelError::MissingMetadata {
                path: path.to_path_buf(),
                entry: METADATA_ENTRY,
            },
            source => ModelError::Archive {
                path: path.to_path_buf(),
                source,
            },
        })?;
        serde_json::from_reader(entry).map_err(|source| ModelError::Metadata {
            path: path.to_path_buf(),
            source,
        })?
    };

    let (input_name, layout, dims) = parse_input(path, metadata)?;
    let sha256 = digest(path).map_err(|source| ModelError::Open {
        path: path.to_path_buf(),
        source,
    })?;
    debug!(model = %path.display(), input = %input_name, ?layout, %dims, "Model metadata parsed");

    Ok(ModelInfo {
        path: path.to_path_buf(),
        input_name,
        layout,
        width: dims.width,
        height: dims.height,
        sha256,
    })
}

/// Convenience wrapper returning only the input size.
pub fn input_dimensions(path: &Path) -> Result<Dimensions, ModelError> {
    inspect(path).map(|info| info.dims())
}

fn parse_input(
    path: &Path,
    metadata: ModelMetadata,
) -> Result<(String, TensorLayout, Dimensions), ModelError> {
    let missing = |key: &str| ModelError::MissingKey {
        path: path.to_path_buf(),
        key: key.to_string(),
    };
    let invalid = |reason: String| ModelError::InvalidShape {
        path: path.to_path_buf(),
        reason,
    };

    let inputs = metadata.inputs.ok_or_else(|| missing("Inputs"))?;
    if inputs.len() > 1 {
        return Err(ModelError::MultipleInputs {
            path: path.to_path_buf(),
            count: inputs.len(),
        });
    }
    let (name, input) = inputs.into_iter().next().ok_or_else(|| ModelError::NoInputs {
        path: path.to_path_buf(),
    })?;

    let format = input.format.ok_or_else(|| missing("format"))?;
    let layout = TensorLayout::from_tag(&format).ok_or_else(|| ModelError::UnknownLayout {
        path: path.to_path_buf(),
        format: format.clone(),
    })?;
    let shape = input.shape.ok_or_else(|| missing("shape"))?;

    let (w_axis, h_axis) = layout.spatial_axes();
    let axis = |idx: usize| -> Result<u32, ModelError> {
        let raw = *shape
            .get(idx)
            .ok_or_else(|| invalid(format!("shape {shape:?} has no axis {idx}")))?;
        u32::try_from(raw)
            .ok()
            .filter(|v| *v > 0)
            .ok_or_else(|| invalid(format!("axis {idx} is not a positive integer ({raw})")))
    };
    let dims = Dimensions {
        width: axis(w_axis)?,
        height: axis(h_axis)?,
    };

    Ok((name, layout, dims))
}

fn digest(path: &Path) -> std::io::Result<String> {
    let mut reader = BufReader::new(File::open(path)?);
    let mut hasher = Sha256::new();
    let mut buf = [0u8; 8192];
    loop {
        let read = reader.read(&mut buf)?;
        if read == 0 {
            break;
        }
        hasher.update(&buf[..read]);
    }
    Ok(format!("{:x}", hasher.finalize()))
}

/// Sanity-checks models with `synap_cli -m <model> random` before use.
pub struct ModelCheck<'a> {
    runner: &'a dyn ProcessRunner,
    program: String,
    env: LaunchEnv,
}

impl<'a> ModelCheck<'a> {
    pub fn new(runner: &'a dyn ProcessRunner, env: LaunchEnv) -> Self {
        Self {
            runner,
            program: MODEL_CHECK.to_string(),
            env,
        }
    }

    pub fn with_program(mut self, program: impl Into<String>) -> Self {
        self.program = program.into();
        self
    }

    /// True when the checker accepts the model. A rejection is reported here.
    pub fn check(&self, model: &Path) -> Result<bool, DemoError> {
        info!("Validating model...");
        let _timer = MetricsCollector::global().start_step("model_check");
        let invocation = Invocation {
            program: self.program.clone(),
            args: vec![
                "-m".to_string(),
                model.display().to_string(),
                "random".to_string(),
            ],
            env: self.env.clone(),
        };
        match self.runner.run(&invocation)? {
            RunOutcome::Success => {
                info!("Model OK");
                Ok(true)
            }
            outcome @ RunOutcome::Failed { .. } => {
                if let Some(diagnostic) = outcome.diagnostic()
                    && !diagnostic.is_empty()
                {
                    error!("{diagnostic}");
                }
                error!("Invalid SyNAP model \"{}\"", model.display());
                Ok(false)
            }
            RunOutcome::Interrupted { .. } => Err(DemoError::Interrupted),
        }
    }
}
