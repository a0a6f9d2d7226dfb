// src/lib.rs

//! Trend watcher library.
//!
//! Samples ranked trending feeds, merges a day's captures, matches them
//! against keyword rules and plans size-bounded chat notifications.

pub mod error;
pub mod models;
pub mod pipeline;
pub mod services;
pub mod storage;
pub mod utils;
