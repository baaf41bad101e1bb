//! Foundation module - Core utilities and types
//!
//! This module provides fundamental utilities used throughout the crate:
//! - Math types and operations
//! - Time measurement for capture profiling
//! - Logging utilities

pub mod math;
pub mod time;
pub mod logging;
