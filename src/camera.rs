use tracing::{info, warn};

use crate::error::{DemoError, SourceError};
use crate::observability::MetricsCollector;
use crate::source::{CAMERA_DEVICE_PREFIX, Dimensions, InputSource};
use crate::validator::SourceProbe;

/// `/dev/video0` through `/dev/video9` are scanned.
pub const CAMERA_SCAN_LIMIT: u32 = 10;

pub fn device_path(index: u32) -> String {
    format!("{CAMERA_DEVICE_PREFIX}{index}")
}

/// Every device in the scan range that passes a silent probe, in index order.
pub fn find_valid_camera_devices(
    probe: &SourceProbe<'_>,
    dims: Dimensions,
) -> Result<Vec<String>, DemoError> {
    let _timer = MetricsCollector::global().start_step("camera_scan");
    let mut found = Vec::new();
    for index in 0..CAMERA_SCAN_LIMIT {
        let candidate = InputSource::camera(device_path(index), Some(dims));
        if probe.probe(&candidate, true)? {
            found.push(candidate.location);
        }
    }
    Ok(found)
}

/// Picks the lowest-numbered working camera.
pub fn auto_select_camera(probe: &SourceProbe<'_>, dims: Dimensions) -> Result<String, DemoError> {
    info!("Finding valid camera device...");
    let devices = find_valid_camera_devices(probe, dims)?;
    let Some(first) = devices.first().cloned() else {
        return Err(SourceError::NoCamera.into());
    };
    if devices.len() > 1 {
        warn!(
            candidates = ?devices,
            "Several cameras respond; using {first}. Pass --input to choose another"
        );
    }
    info!("Found {first}");
    Ok(first)
}
