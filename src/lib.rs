//! voxmix - Synthetic speech-separation training corpus generator
//!
//! Mixes pairs of speakers' recordings into (mixed, target, spectra,
//! enrollment-pointer) artifact sets, fanned out over a worker pool with
//! source audio and wav artifacts round-tripped through an object store.

#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]
#![warn(clippy::let_underscore_must_use)]

pub mod audio;
pub mod builder;
pub mod catalog;
pub mod cli;
pub mod config;
pub mod defaults;
pub mod error;
pub mod orchestrator;
pub mod store;

// Core pipeline types
pub use builder::{BuildOutcome, BuiltSample, RejectReason, SampleBuilder};
pub use catalog::{Speaker, SpeakerCatalog, Utterance};
pub use orchestrator::{Generator, RunReport, Split};

// Store contract
pub use store::{FsStore, HttpStore, ObjectStore, RetryPolicy};

// Error handling
pub use error::{MixError, Result};

// Config
pub use config::Config;
