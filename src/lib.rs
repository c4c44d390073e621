//! Coordii client core
//!
//! Client-side orchestration for the Coordii outfit app: polling of
//! server-side outfit and try-on jobs, staleness-tagged local caches, an
//! in-process invalidation bus, and the onboarding guide sequencer.

pub mod app_state;
pub mod config;
pub mod controllers;
pub mod models;
pub mod services;
