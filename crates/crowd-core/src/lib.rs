//! # crowd-core
//!
//! Core types and utilities for talking to a Crowd user/group directory over its
//! XML REST interface.
//!
//! This crate provides error handling, configuration, the XML codec and the shared
//! request/response pipeline used by the service client crates.
//!
//! ## Modules
//!
//! - [`error`] - Error taxonomy and the remote error payload
//! - [`config`] - Construction-time configuration with validation
//! - [`client`] - HTTP settings, identity and the request/response pipeline
//! - [`transport`] - The transport seam and its `reqwest` implementation
//! - [`xml`] - XML marshalling helpers
//! - [`query`] - Query-string building with percent-escaping

#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod client;
pub mod config;
pub mod error;
pub mod query;
pub mod transport;
pub mod xml;

// Re-export commonly used types
pub use error::{Error, Result};
