//! Common utilities for the mayfly-asm toolkit

pub mod error;

pub use error::{Error, Result};
