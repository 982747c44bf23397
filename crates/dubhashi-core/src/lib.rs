//! Core types and configuration for dubhashi.
//!
//! This crate provides platform-agnostic types that can be used across
//! all dubhashi sub-crates.

mod config;
mod event;
mod language;
mod turn;

pub use config::{Config, ConfigManager};
pub use event::SessionEvent;
pub use language::{
    DEFAULT_LANGUAGE_CODE, DEFAULT_TARGET_NAME, LANGUAGES, Language, LanguagePair, find_language,
};
pub use turn::{Participant, TurnError, TurnMachine, TurnPhase};

/// Application name
pub const APP_NAME: &str = "dubhashi";

/// Pretty application name for display
pub const APP_NAME_PRETTY: &str = "Dubhashi";

/// Default log level
pub const DEFAULT_LOG_LEVEL: &str = "info";
