use std::path::PathBuf;

use synap_demo::codec::Codec;
use synap_demo::error::ConfigError;
use synap_demo::generator::{demo_pipeline, probe_pipeline, source_stages};
use synap_demo::params::{DEFAULT_OVERLAY_LABELS, DemoParams, InferenceSettings};
use synap_demo::pipeline::{Pipeline, Stage};
use synap_demo::source::{Dimensions, InputSource, SourceKind};

fn params(source: InputSource, fullscreen: bool) -> DemoParams {
    DemoParams {
        source,
        model: PathBuf::from("/models/yolov8s.synap"),
        model_input: Dimensions::new(640, 384).unwrap(),
        inference: InferenceSettings::default(),
        fullscreen,
        overlay_labels: DEFAULT_OVERLAY_LABELS.to_string(),
    }
}

const INFERENCE_TAIL: &str = "videoconvert ! tee name=t_data \
t_data. ! queue ! videoconvert ! videoscale ! video/x-raw,width=640,height=384,format=RGB ! \
synapinfer mode=detector model=/models/yolov8s.synap threshold=0.5 numinference=5 frameinterval=1 name=infer ! \
overlay.inference_sink \
t_data. ! queue ! synapoverlay name=overlay label=/usr/share/synap/models/object_detection/coco/info.json ! \
videoconvert ! waylandsink";

#[test]
fn renders_links_between_stages() {
    let mut pipeline = Pipeline::new();
    pipeline
        .push(Stage::new("filesrc").property("location", "x"))
        .push("queue")
        .push(Stage::new("qtdemux").property("name", "demux"));
    assert_eq!(
        pipeline.tokens(),
        ["filesrc", "location=x", "!", "queue", "!", "qtdemux", "name=demux"]
    );
    assert_eq!(
        pipeline.to_string(),
        "filesrc location=x ! queue ! qtdemux name=demux"
    );
}

#[test]
fn reset_empties_the_pipeline() {
    let mut pipeline = Pipeline::new();
    pipeline.extend(["videotestsrc", "fakesink"]);
    assert!(!pipeline.is_empty());
    pipeline.reset();
    assert!(pipeline.is_empty());
    assert_eq!(pipeline.to_string(), "");
}

#[test]
fn file_demo_pipeline_matches_template() {
    let source = InputSource::file("/videos/street.mp4", Codec::H264);
    let pipeline = demo_pipeline(&params(source, true)).unwrap();
    let expected = format!(
        "filesrc location=\"/videos/street.mp4\" ! qtdemux name=demux demux.video_0 ! queue ! \
h264parse ! avdec_h264 ! {INFERENCE_TAIL} fullscreen=true"
    );
    assert_eq!(pipeline.to_string(), expected);
}

#[test]
fn camera_demo_pipeline_uses_requested_size() {
    let source = InputSource::camera("/dev/video2", Some(Dimensions::new(1280, 720).unwrap()));
    let pipeline = demo_pipeline(&params(source, false)).unwrap();
    let expected = format!(
        "v4l2src device=/dev/video2 ! video/x-raw,framerate=30/1,format=YUY2,width=1280,height=720 ! \
{INFERENCE_TAIL} fullscreen=false"
    );
    assert_eq!(pipeline.to_string(), expected);
}

#[test]
fn camera_without_dims_falls_back_to_vga() {
    let stages = source_stages(&InputSource::camera("/dev/video0", None)).unwrap();
    assert_eq!(
        stages[1].element(),
        "video/x-raw,framerate=30/1,format=YUY2,width=640,height=480"
    );
}

#[test]
fn rtsp_demo_pipeline_uses_codec_depayloader() {
    let source = InputSource::rtsp(
        "rtsp://10.0.0.5/stream",
        Codec::H265,
        Some(Dimensions::new(1920, 1080).unwrap()),
    );
    let pipeline = demo_pipeline(&params(source, false)).unwrap();
    let expected = format!(
        "rtspsrc location=\"rtsp://10.0.0.5/stream\" latency=2000 ! rtpjitterbuffer ! \
rtph265depay wait-for-keyframe=true ! video/x-h265,width=1920,height=1080 ! \
h265parse ! avdec_h265 ! {INFERENCE_TAIL} fullscreen=false"
    );
    assert_eq!(pipeline.to_string(), expected);
}

#[test]
fn rtsp_without_dims_keeps_bare_caps() {
    let source = InputSource::rtsp("rtsp://cam/live", Codec::Av1, None);
    let tokens = probe_pipeline(&source, 10).unwrap().tokens();
    assert!(tokens.iter().any(|t| t == "video/x-av1"));
    assert!(tokens.iter().any(|t| t == "rtpav1depay"));
    assert!(tokens.iter().any(|t| t == "v4l2av1dec"));
}

#[test]
fn probe_pipeline_ends_in_counted_fakesink() {
    let source = InputSource::file("clip.mp4", Codec::H264);
    let pipeline = probe_pipeline(&source, 10).unwrap();
    assert!(pipeline.to_string().ends_with("avdec_h264 ! fakesink num-buffers=10"));
}

#[test]
fn file_source_without_codec_is_fatal() {
    let source = InputSource {
        kind: SourceKind::File,
        location: "clip.mp4".into(),
        dims: None,
        codec: None,
    };
    let err = source_stages(&source).unwrap_err();
    assert!(matches!(err, ConfigError::MissingCodec { kind: SourceKind::File }));
    assert_eq!(
        err.to_string(),
        "Fatal: codec information not provided for file pipeline"
    );
}

#[test]
fn pretty_output_breaks_after_links() {
    let source = InputSource::camera("/dev/video0", None);
    let pretty = probe_pipeline(&source, 3).unwrap().pretty();
    assert_eq!(
        pretty,
        "v4l2src device=/dev/video0 ! \\\nvideo/x-raw,framerate=30/1,format=YUY2,width=640,height=480 ! \\\nfakesink num-buffers=3"
    );
}
