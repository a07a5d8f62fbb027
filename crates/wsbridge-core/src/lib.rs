//! # wsbridge-core
//!
//! Core crate for WsBridge. Contains the unified error system, configuration
//! schemas, and the engine-facing identifier and protocol types shared by
//! every bridge component.
//!
//! This crate has **no** internal dependencies on other WsBridge crates.

pub mod config;
pub mod error;
pub mod result;
pub mod types;

pub use error::BridgeError;
pub use result::BridgeResult;
