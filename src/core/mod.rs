// src/core/mod.rs
//! Core monitoring loop and session state.

pub mod monitor;
pub mod session;
