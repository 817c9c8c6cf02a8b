//! radio-dj library crate
//!
//! Everything the station daemon is made of, exposed for integration
//! testing. The binary wiring lives in main.rs.

#[macro_use]
extern crate log;

pub mod catalog;
pub mod config;
pub mod constants;
pub mod dj;
pub mod encoder;
pub mod error;
pub mod fallback;
pub mod history;
pub mod icecast;
pub mod lang;
pub mod metadata;
pub mod news;
pub mod producer;
pub mod queue;
pub mod schedule;
pub mod segment;
pub mod silence;
pub mod stream;
pub mod transcode;
pub mod voices;
pub mod weather;

#[cfg(test)]
mod config_tests;
#[cfg(test)]
mod encoder_tests;
#[cfg(test)]
mod silence_tests;
#[cfg(test)]
mod voices_tests;
