mod common;

use std::fs;
use std::io::Cursor;
use std::path::PathBuf;

use synap_demo::codec::Codec;
use synap_demo::error::{DemoError, SourceError};
use synap_demo::model::ModelCheck;
use synap_demo::params::{DEFAULT_OVERLAY_LABELS, ParamCollector, ParamRequest};
use synap_demo::prompt::Prompter;
use synap_demo::runner::{GstLauncher, LaunchEnv, RunOutcome};
use synap_demo::source::{Dimensions, SourceKind};
use synap_demo::validator::SourceProbe;
use tempfile::tempdir;

use common::{FakeRunner, detector_model, failed, reads_device};

type ScriptedPrompter = Prompter<Cursor<Vec<u8>>, Vec<u8>>;

fn scripted(script: &str) -> ScriptedPrompter {
    Prompter::new(Cursor::new(script.as_bytes().to_vec()), Vec::new())
}

#[test]
fn collects_file_source_with_prompted_values() {
    let temp = tempdir().unwrap();
    let clip = temp.path().join("clip.mp4");
    fs::write(&clip, b"\0").unwrap();
    let model = detector_model(temp.path());

    let runner = FakeRunner::new(|_| RunOutcome::Success);
    let launcher = GstLauncher::new(&runner, LaunchEnv::empty());
    let probe = SourceProbe::new(&launcher);
    let check = ModelCheck::new(&runner, LaunchEnv::empty());

    // skip default, max 7, threshold out of range then 0.3, bad
    // confirmation then "n".
    let mut prompter = scripted("\n7\n2\n0.3\nmaybe\nn\n");
    let request = ParamRequest {
        input: Some(clip.display().to_string()),
        model: Some(model.clone()),
        ..ParamRequest::default()
    };
    let params = ParamCollector::new(&mut prompter, &probe, &check)
        .collect(request)
        .unwrap();

    assert_eq!(params.source.kind, SourceKind::File);
    assert_eq!(params.source.codec, Some(Codec::H264));
    assert_eq!(params.model, model);
    assert_eq!(params.model_input, Dimensions::new(640, 384).unwrap());
    assert_eq!(params.inference.skip, 1);
    assert_eq!(params.inference.max_results, 7);
    assert_eq!(params.inference.threshold, 0.3);
    assert!(!params.fullscreen);
    assert_eq!(params.overlay_labels, DEFAULT_OVERLAY_LABELS);
    assert_eq!(runner.call_count(), 2);

    let transcript = String::from_utf8(prompter.into_output()).unwrap();
    assert!(!transcript.contains("Codec"));
    assert!(transcript.contains("Value must be >= 0 and <= 1"));
    assert!(transcript.contains("Launch demo in fullscreen? (Y/n): "));
}

#[test]
fn rejected_model_is_asked_for_again() {
    let temp = tempdir().unwrap();
    let good = detector_model(temp.path());
    let bad = PathBuf::from("/models/bad.synap");

    let runner = FakeRunner::new(|call| {
        if call.args.iter().any(|arg| arg.ends_with("bad.synap")) {
            failed("invalid model")
        } else {
            RunOutcome::Success
        }
    });
    let launcher = GstLauncher::new(&runner, LaunchEnv::empty());
    let probe = SourceProbe::new(&launcher);
    let check = ModelCheck::new(&runner, LaunchEnv::empty());

    let mut prompter = scripted(&format!("{}\n", good.display()));
    let request = ParamRequest {
        input: Some("/dev/video1".into()),
        dims: Some(Dimensions::new(1280, 720).unwrap()),
        model: Some(bad),
        inference_skip: Some(2),
        max_results: Some(3),
        threshold: Some(0.6),
        fullscreen: Some(true),
        ..ParamRequest::default()
    };
    let params = ParamCollector::new(&mut prompter, &probe, &check)
        .collect(request)
        .unwrap();

    assert_eq!(params.source.location, "/dev/video1");
    assert_eq!(params.source.dims, Some(Dimensions::new(1280, 720).unwrap()));
    assert_eq!(params.model, good);
    assert!(params.fullscreen);
    // probe, failed check, passing check
    assert_eq!(runner.call_count(), 3);

    let transcript = String::from_utf8(prompter.into_output()).unwrap();
    assert_eq!(transcript.matches("Model file path: ").count(), 1);
}

#[test]
fn failed_probe_rejects_the_source() {
    let runner = FakeRunner::new(|_| failed("could not connect"));
    let launcher = GstLauncher::new(&runner, LaunchEnv::empty());
    let probe = SourceProbe::new(&launcher);
    let check = ModelCheck::new(&runner, LaunchEnv::empty());

    let mut prompter = scripted("");
    let request = ParamRequest {
        input: Some("rtsp://10.0.0.9/live".into()),
        codec: Some("h265".into()),
        ..ParamRequest::default()
    };
    let err = ParamCollector::new(&mut prompter, &probe, &check)
        .resolve_source(&request)
        .unwrap_err();
    assert!(matches!(
        err,
        DemoError::Source(SourceError::Rejected {
            kind: SourceKind::Rtsp,
            ..
        })
    ));
}

#[test]
fn unsupported_codec_is_fatal() {
    let runner = FakeRunner::new(|_| RunOutcome::Success);
    let launcher = GstLauncher::new(&runner, LaunchEnv::empty());
    let probe = SourceProbe::new(&launcher);
    let check = ModelCheck::new(&runner, LaunchEnv::empty());

    let mut prompter = scripted("rtsp://10.0.0.9/live\nvp9\n");
    let err = ParamCollector::new(&mut prompter, &probe, &check)
        .resolve_source(&ParamRequest::default())
        .unwrap_err();
    assert!(matches!(
        err,
        DemoError::Source(SourceError::UnsupportedCodec(ref name)) if name == "vp9"
    ));
    assert_eq!(runner.call_count(), 0);
}

#[test]
fn closed_input_is_an_interrupt() {
    let runner = FakeRunner::new(|_| RunOutcome::Success);
    let launcher = GstLauncher::new(&runner, LaunchEnv::empty());
    let probe = SourceProbe::new(&launcher);
    let check = ModelCheck::new(&runner, LaunchEnv::empty());

    let mut prompter = scripted("");
    let err = ParamCollector::new(&mut prompter, &probe, &check)
        .collect(ParamRequest::default())
        .unwrap_err();
    assert!(matches!(err, DemoError::Interrupted));
}

#[test]
fn auto_camera_is_discovered_even_without_validation() {
    let temp = tempdir().unwrap();
    let model = detector_model(temp.path());

    let runner = FakeRunner::new(|call| {
        if reads_device(call, "/dev/video2") {
            RunOutcome::Success
        } else {
            failed("no device")
        }
    });
    let launcher = GstLauncher::new(&runner, LaunchEnv::empty());
    let probe = SourceProbe::new(&launcher);
    let check = ModelCheck::new(&runner, LaunchEnv::empty());

    // Accept the default camera size.
    let mut prompter = scripted("\n");
    let request = ParamRequest {
        input: Some("AUTO".into()),
        model: Some(model),
        inference_skip: Some(1),
        max_results: Some(5),
        threshold: Some(0.5),
        fullscreen: Some(false),
        ..ParamRequest::default()
    };
    let params = ParamCollector::new(&mut prompter, &probe, &check)
        .skip_validation(true)
        .collect(request)
        .unwrap();

    assert_eq!(params.source.location, "/dev/video2");
    assert_eq!(params.source.dims, Some(Dimensions::new(640, 480).unwrap()));
    // Only the ten discovery probes; the model check was skipped.
    assert_eq!(runner.call_count(), 10);
}

#[test]
fn forced_file_kind_still_requires_readable_path() {
    let runner = FakeRunner::new(|_| RunOutcome::Success);
    let launcher = GstLauncher::new(&runner, LaunchEnv::empty());
    let probe = SourceProbe::new(&launcher);
    let check = ModelCheck::new(&runner, LaunchEnv::empty());

    let mut prompter = scripted("");
    let request = ParamRequest {
        input: Some("/no/such/clip.mp4".into()),
        kind: Some(SourceKind::File),
        ..ParamRequest::default()
    };
    let err = ParamCollector::new(&mut prompter, &probe, &check)
        .resolve_source(&request)
        .unwrap_err();
    assert!(matches!(
        err,
        DemoError::Source(SourceError::NotFound { .. })
    ));
}
