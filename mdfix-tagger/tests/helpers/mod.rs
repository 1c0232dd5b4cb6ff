//! Test Helper Utilities
//!
//! Shared fakes and fixtures for the mdfix-tagger integration tests

#![allow(dead_code)]

pub mod audio_generator;
pub mod fakes;
pub mod log_capture;

pub use audio_generator::generate_test_wav;
pub use fakes::{
    FakeFingerprinter, FakeMatchService, FakeRecordings, MemoryTagStore, PanickingTagStore,
    RecordingObserver,
};
pub use log_capture::LogCapture;
