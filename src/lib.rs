pub mod camera;
pub mod codec;
pub mod config;
pub mod error;
pub mod generator;
pub mod model;
pub mod observability;
pub mod params;
pub mod pipeline;
pub mod presets;
pub mod prompt;
pub mod runner;
pub mod source;
pub mod validation;
pub mod validator;

pub use codec::Codec;
pub use config::DemoConfig;
pub use error::{DemoError, ModelError, SourceError};
pub use params::{DemoParams, ParamCollector, ParamRequest};
pub use pipeline::{Pipeline, Stage};
pub use runner::{GstLauncher, Interrupt, ProcessRunner, RunOutcome, SystemRunner};
pub use source::{Dimensions, InputSource, SourceKind};
