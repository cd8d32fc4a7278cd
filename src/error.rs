use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::source::SourceKind;

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("Invalid input source \"{source_str}\"")]
    NotFound {
        source_str: String,
        #[source]
        cause: io::Error,
    },
    #[error("No camera connected to board")]
    NoCamera,
    #[error("Invalid codec \"{0}\", choose from [av1 / h264 / h265]")]
    UnsupportedCodec(String),
    #[error("{}", rejection_message(.kind, .location))]
    Rejected { kind: SourceKind, location: String },
}

fn rejection_message(kind: &SourceKind, location: &str) -> String {
    match kind {
        SourceKind::Camera => format!(
            "Invalid camera \"{location}\", use `v4l2-ctl --list-devices` to verify device"
        ),
        SourceKind::File => {
            format!("Invalid input video file \"{location}\", check source and codec")
        }
        SourceKind::Rtsp => format!("Invalid RTSP stream \"{location}\", check URL and codec"),
    }
}

#[derive(Debug, Error)]
pub enum ModelError {
    #[error("Cannot open model file: {source}\nInvalid SyNAP model: {}", .path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("Not a model archive ({source})\nInvalid SyNAP model: {}", .path.display())]
    Archive {
        path: PathBuf,
        #[source]
        source: zip::result::ZipError,
    },
    #[error("Missing model metadata \"{entry}\"\nInvalid SyNAP model: {}", .path.display())]
    MissingMetadata { path: PathBuf, entry: &'static str },
    #[error("Unreadable model metadata ({source})\nInvalid SyNAP model: {}", .path.display())]
    Metadata {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("Missing model metadata \"{key}\"\nInvalid SyNAP model: {}", .path.display())]
    MissingKey { path: PathBuf, key: String },
    #[error("Model declares no inputs\nInvalid SyNAP model: {}", .path.display())]
    NoInputs { path: PathBuf },
    #[error(
        "Multiple input models not supported ({count} inputs declared)\nInvalid SyNAP model: {}",
        .path.display()
    )]
    MultipleInputs { path: PathBuf, count: usize },
    #[error("Invalid metadata: unknown format \"{format}\"\nInvalid SyNAP model: {}", .path.display())]
    UnknownLayout { path: PathBuf, format: String },
    #[error("Invalid metadata: {reason}\nInvalid SyNAP model: {}", .path.display())]
    InvalidShape { path: PathBuf, reason: String },
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Fatal: codec information not provided for {kind} pipeline")]
    MissingCodec { kind: SourceKind },
    #[error("Fatal: invalid input type \"{0}\"")]
    UnknownSourceType(String),
}

#[derive(Debug, Error)]
pub enum ProcessError {
    #[error("Failed to launch `{program}`: {source}")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },
    #[error("Lost track of `{program}`: {source}")]
    Wait {
        program: String,
        #[source]
        source: io::Error,
    },
}

#[derive(Debug, Error)]
pub enum PromptError {
    #[error("input closed")]
    Interrupted,
    #[error(transparent)]
    Io(#[from] io::Error),
}

#[derive(Debug, Error)]
pub enum DemoError {
    #[error("interrupted")]
    Interrupted,
    #[error("terminal I/O failed: {0}")]
    Terminal(#[source] io::Error),
    #[error(transparent)]
    Source(#[from] SourceError),
    #[error(transparent)]
    Model(#[from] ModelError),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Process(#[from] ProcessError),
}

impl From<PromptError> for DemoError {
    fn from(err: PromptError) -> Self {
        match err {
            PromptError::Interrupted => DemoError::Interrupted,
            PromptError::Io(source) => DemoError::Terminal(source),
        }
    }
}
