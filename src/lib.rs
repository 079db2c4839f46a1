//! bleepd - Real-time audio profanity filter
//!
//! Sits between an input and an output device, delays the stream long
//! enough to transcribe it with Whisper, and mutes or reverses profane
//! words before they reach the speakers.

pub mod asr;
pub mod audio;
pub mod censor;
pub mod config;
pub mod defaults;
pub mod engine;
pub mod error;
pub mod lyrics;
pub mod stats;

pub use censor::CensorMode;
pub use censor::lexicon::Lexicon;
pub use config::Config;
pub use engine::{Engine, EngineConfig};
pub use error::{BleepdError, Result};
pub use stats::EngineStats;
