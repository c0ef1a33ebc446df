//! Fake stage implementations for driving the pipeline without ffmpeg or
//! whisper installed.

#![allow(dead_code)]

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use encode_and_sub::encoding::EncodeSpec;
use encode_and_sub::error::{Error, Result};
use encode_and_sub::media::{Encoder, Muxer};
use encode_and_sub::pipeline::{Pipeline, PipelineOptions};
use encode_and_sub::process::ToolStatus;
use encode_and_sub::transcribe::{TranscribeRequest, Transcriber};

pub type CallLog = Arc<Mutex<Vec<String>>>;

fn file_name(path: &Path) -> String {
    path.file_name().unwrap().to_string_lossy().to_string()
}

/// Writes the destination unless the source name is in `fail_for` (exit 1)
/// or `error_for` (ffmpeg missing, after a short delay).
pub struct FakeEncoder {
    pub fail_for: Vec<String>,
    pub error_for: Vec<String>,
    pub calls: CallLog,
}

#[async_trait]
impl Encoder for FakeEncoder {
    async fn encode(&self, source: &Path, dest: &Path, _spec: &EncodeSpec) -> Result<ToolStatus> {
        let name = file_name(source);
        self.calls.lock().unwrap().push(format!("encode {}", name));
        if self.fail_for.contains(&name) {
            return Ok(ToolStatus::exited(1));
        }
        if self.error_for.contains(&name) {
            tokio::time::sleep(Duration::from_millis(20)).await;
            return Err(Error::ToolNotFound { tool: "ffmpeg".to_string() });
        }
        std::fs::write(dest, format!("encoded {}", name))?;
        Ok(ToolStatus::ok())
    }
}

/// Writes `<stem>.srt` into the requested directory.
pub struct FakeTranscriber {
    pub calls: CallLog,
}

#[async_trait]
impl Transcriber for FakeTranscriber {
    async fn transcribe(&self, source: &Path, request: &TranscribeRequest) -> Result<ToolStatus> {
        self.calls
            .lock()
            .unwrap()
            .push(format!("transcribe {}", file_name(source)));
        let stem = source.file_stem().unwrap().to_string_lossy().to_string();
        std::fs::write(
            request.output_dir.join(format!("{}.srt", stem)),
            "1\n00:00:01,000 --> 00:00:02,000\nHello\n",
        )?;
        Ok(ToolStatus::ok())
    }
}

/// Writes the destination, stamping how many mux calls happened so far.
pub struct FakeMuxer {
    pub calls: CallLog,
}

#[async_trait]
impl Muxer for FakeMuxer {
    async fn mux(&self, video: &Path, _subtitle: &Path, dest: &Path) -> Result<ToolStatus> {
        let count = {
            let mut calls = self.calls.lock().unwrap();
            calls.push(format!("mux {}", file_name(video)));
            calls.iter().filter(|c| c.starts_with("mux ")).count()
        };
        std::fs::write(dest, format!("muxed run {}", count))?;
        Ok(ToolStatus::ok())
    }
}

pub fn fake_pipeline(fail_for: &[&str], options: PipelineOptions) -> (Pipeline, CallLog) {
    fake_pipeline_with_errors(fail_for, &[], options)
}

pub fn fake_pipeline_with_errors(
    fail_for: &[&str],
    error_for: &[&str],
    options: PipelineOptions,
) -> (Pipeline, CallLog) {
    let calls: CallLog = Arc::new(Mutex::new(Vec::new()));
    let pipeline = Pipeline::new(
        Box::new(FakeEncoder {
            fail_for: fail_for.iter().map(|s| s.to_string()).collect(),
            error_for: error_for.iter().map(|s| s.to_string()).collect(),
            calls: calls.clone(),
        }),
        Box::new(FakeTranscriber { calls: calls.clone() }),
        Box::new(FakeMuxer { calls: calls.clone() }),
        options,
    );
    (pipeline, calls)
}

pub fn calls(log: &CallLog) -> Vec<String> {
    log.lock().unwrap().clone()
}

pub fn touch_all(dir: &Path, names: &[&str]) -> Vec<PathBuf> {
    names
        .iter()
        .map(|name| {
            let path = dir.join(name);
            std::fs::write(&path, b"source").unwrap();
            path
        })
        .collect()
}
