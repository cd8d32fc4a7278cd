use tracing::{debug, info};

use crate::error::DemoError;
use crate::generator::probe_pipeline;
use crate::observability::MetricsCollector;
use crate::runner::{GstLauncher, RunOutcome};
use crate::source::InputSource;

pub const DEFAULT_PROBE_BUFFERS: u32 = 10;

/// Confirms a source/codec combination by pulling a few buffers into a
/// fakesink. Only a zero exit from the engine counts as usable.
pub struct SourceProbe<'a> {
    launcher: &'a GstLauncher<'a>,
    num_buffers: u32,
}

impl<'a> SourceProbe<'a> {
    pub fn new(launcher: &'a GstLauncher<'a>) -> Self {
        Self {
            launcher,
            num_buffers: DEFAULT_PROBE_BUFFERS,
        }
    }

    pub fn with_buffers(mut self, num_buffers: u32) -> Self {
        self.num_buffers = num_buffers;
        self
    }

    /// `quiet` suppresses progress output, as used by the camera scan.
    pub fn probe(&self, source: &InputSource, quiet: bool) -> Result<bool, DemoError> {
        let pipeline = probe_pipeline(source, self.num_buffers)?;
        if !quiet {
            info!("Validating input...");
        }
        let _timer = MetricsCollector::global().start_step("source_probe");
        let outcome = self.launcher.launch(&pipeline)?;
        let passed = match &outcome {
            RunOutcome::Success => true,
            RunOutcome::Failed { code, .. } => {
                debug!(
                    source = %source.location,
                    code = ?code,
                    "Probe rejected source: {}",
                    outcome.diagnostic().unwrap_or_default()
                );
                false
            }
            RunOutcome::Interrupted { .. } => return Err(DemoError::Interrupted),
        };
        MetricsCollector::global().record_probe(passed);
        if passed && !quiet {
            info!("Input OK");
        }
        Ok(passed)
    }
}
