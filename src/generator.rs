use tracing::debug;

use crate::codec::Codec;
use crate::error::ConfigError;
use crate::params::DemoParams;
use crate::pipeline::{Pipeline, Stage};
use crate::source::{InputSource, SourceKind};

pub const TEE_NAME: &str = "t_data";
pub const RTSP_LATENCY_MS: u32 = 2000;
pub const CAMERA_CAPS_PREFIX: &str = "video/x-raw,framerate=30/1,format=YUY2";

/// Source stages for `source`, up to and including the decoder.
pub fn source_stages(source: &InputSource) -> Result<Vec<Stage>, ConfigError> {
    match source.kind {
        SourceKind::File => {
            let codec = require_codec(source)?;
            let mut stages = vec![
                Stage::new("filesrc").property("location", quoted(&source.location)),
                Stage::new("qtdemux")
                    .property("name", "demux")
                    .token("demux.video_0"),
                Stage::new("queue"),
            ];
            stages.extend(decoder_stages(codec));
            Ok(stages)
        }
        SourceKind::Camera => {
            let dims = source.camera_dims();
            Ok(vec![
                Stage::new("v4l2src").property("device", &source.location),
                Stage::new(format!(
                    "{CAMERA_CAPS_PREFIX},width={},height={}",
                    dims.width, dims.height
                )),
            ])
        }
        SourceKind::Rtsp => {
            let codec = require_codec(source)?;
            let caps = match source.dims {
                Some(dims) => format!("{},width={},height={}", codec.caps(), dims.width, dims.height),
                None => codec.caps(),
            };
            let mut stages = vec![
                Stage::new("rtspsrc")
                    .property("location", quoted(&source.location))
                    .property("latency", RTSP_LATENCY_MS),
                Stage::new("rtpjitterbuffer"),
                Stage::new(codec.depayloader()).property("wait-for-keyframe", true),
                Stage::new(caps),
            ];
            stages.extend(decoder_stages(codec));
            Ok(stages)
        }
    }
}

/// Full demo: source, then a tee feeding both the inference branch and the
/// overlay branch, then the display sink.
pub fn demo_pipeline(params: &DemoParams) -> Result<Pipeline, ConfigError> {
    let mut pipeline = Pipeline::new();
    pipeline.extend(source_stages(&params.source)?);
    pipeline.extend(splitter_stages());
    pipeline.extend(inference_stages(params));
    pipeline.extend(overlay_stages(&params.overlay_labels));
    pipeline.extend(display_stages(params.fullscreen));
    debug!(
        kind = %params.source.kind,
        stages = pipeline.stages().len(),
        "Demo pipeline assembled"
    );
    Ok(pipeline)
}

/// Short-lived pipeline that pulls `num_buffers` frames into a fakesink.
pub fn probe_pipeline(source: &InputSource, num_buffers: u32) -> Result<Pipeline, ConfigError> {
    let mut pipeline = Pipeline::new();
    pipeline.extend(source_stages(source)?);
    pipeline.push(Stage::new("fakesink").property("num-buffers", num_buffers));
    Ok(pipeline)
}

fn require_codec(source: &InputSource) -> Result<Codec, ConfigError> {
    source
        .codec
        .ok_or(ConfigError::MissingCodec { kind: source.kind })
}

fn decoder_stages(codec: Codec) -> [Stage; 2] {
    let (parser, decoder) = codec.elements();
    [Stage::new(parser), Stage::new(decoder)]
}

fn splitter_stages() -> [Stage; 2] {
    [
        Stage::new("videoconvert"),
        Stage::new("tee").property("name", TEE_NAME),
    ]
}

fn inference_stages(params: &DemoParams) -> Vec<Stage> {
    let settings = &params.inference;
    vec![
        Stage::branch(TEE_NAME),
        Stage::new("queue"),
        Stage::new("videoconvert"),
        Stage::new("videoscale"),
        Stage::new(format!(
            "video/x-raw,width={},height={},format=RGB",
            params.model_input.width, params.model_input.height
        )),
        Stage::new("synapinfer")
            .property("mode", "detector")
            .property("model", params.model.display())
            .property("threshold", settings.threshold)
            .property("numinference", settings.max_results)
            .property("frameinterval", settings.skip)
            .property("name", "infer"),
        Stage::new("overlay.inference_sink"),
    ]
}

fn overlay_stages(labels: &str) -> [Stage; 3] {
    [
        Stage::branch(TEE_NAME),
        Stage::new("queue"),
        Stage::new("synapoverlay")
            .property("name", "overlay")
            .property("label", labels),
    ]
}

fn display_stages(fullscreen: bool) -> [Stage; 2] {
    [
        Stage::new("videoconvert"),
        Stage::new("waylandsink").property("fullscreen", fullscreen),
    ]
}

fn quoted(value: &str) -> String {
    format!("\"{value}\"")
}
