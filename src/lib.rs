//! encode-and-sub - anime encode and subtitle pipeline
//!
//! Encodes videos with ffmpeg (SVT-AV1 or NVENC HEVC), generates English
//! subtitles with whisper-ctranslate2 and muxes them into the result, for a
//! single file or a whole batch.

pub mod benchmark;
pub mod cli;
pub mod config;
pub mod discovery;
pub mod encoding;
pub mod error;
pub mod media;
pub mod pipeline;
pub mod platform;
pub mod process;
pub mod report;
pub mod subtitle;
pub mod tools;
pub mod transcribe;
