#![allow(dead_code)]

use std::cell::RefCell;
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

use serde_json::{Value, json};
use synap_demo::error::ProcessError;
use synap_demo::runner::{Invocation, ProcessRunner, RunOutcome};
use zip::ZipWriter;
use zip::write::SimpleFileOptions;

/// Writes a `.synap`-style archive whose metadata is `metadata`.
pub fn write_model(dir: &Path, name: &str, metadata: Value) -> PathBuf {
    let path = dir.join(name);
    let file = File::create(&path).expect("create model");
    let mut archive = ZipWriter::new(file);
    archive
        .start_file("0/model.json", SimpleFileOptions::default())
        .expect("start entry");
    archive
        .write_all(metadata.to_string().as_bytes())
        .expect("write metadata");
    archive.finish().expect("finish archive");
    path
}

pub fn detector_model(dir: &Path) -> PathBuf {
    write_model(
        dir,
        "model.synap",
        json!({ "Inputs": { "images": { "format": "nhwc", "shape": [1, 384, 640, 3] } } }),
    )
}

/// Answers every invocation from `decide` and remembers what it was asked.
pub struct FakeRunner<F> {
    decide: F,
    pub calls: RefCell<Vec<Invocation>>,
}

impl<F: Fn(&Invocation) -> RunOutcome> FakeRunner<F> {
    pub fn new(decide: F) -> Self {
        Self {
            decide,
            calls: RefCell::new(Vec::new()),
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.borrow().len()
    }

    pub fn rendered_calls(&self) -> Vec<String> {
        self.calls
            .borrow()
            .iter()
            .map(|call| format!("{} {}", call.program, call.args.join(" ")))
            .collect()
    }
}

impl<F: Fn(&Invocation) -> RunOutcome> ProcessRunner for FakeRunner<F> {
    fn run(&self, invocation: &Invocation) -> Result<RunOutcome, ProcessError> {
        self.calls.borrow_mut().push(invocation.clone());
        Ok((self.decide)(invocation))
    }
}

pub fn failed(stderr: &str) -> RunOutcome {
    RunOutcome::Failed {
        code: Some(1),
        stdout: String::new(),
        stderr: stderr.to_string(),
    }
}

/// True when the invocation is a probe or demo pipeline reading `device`.
pub fn reads_device(invocation: &Invocation, device: &str) -> bool {
    invocation
        .args
        .iter()
        .any(|arg| arg == &format!("device={device}"))
}
