//! skillpack publish and install pipeline.
//!
//! This crate accepts untrusted skill archives, inspects them against the
//! archive safety policy, records releases with a content digest and trust
//! score, and installs them again after byte-for-byte verification. It is
//! used by the `skillpack` and `skillpack-review-trust` binaries and can be
//! embedded by a registry service that supplies its own collaborators.
//!
//! # Modules
//!
//! - [`archive`] - Archive policy, inspection, extraction and packing
//! - [`cli`] - Command-line argument definitions
//! - [`config`] - TOML configuration for the CLI
//! - [`dirs`] - Directory resolution abstraction for platform-specific paths
//! - [`error`] - Failure dispositions shared by every pipeline error
//! - [`fetch`] - Archive download from a store or over HTTP
//! - [`install`] - Install pipeline
//! - [`manifest`] - Publish manifest parsing and validation
//! - [`output`] - Human and JSON output formatting
//! - [`package`] - Validated slug, version and publisher identifiers
//! - [`publish`] - Publish pipeline
//! - [`registry`] - Release metadata registry
//! - [`review`] - Offline trust review of source manifests
//! - [`storage`] - Package byte storage

pub mod archive;
pub mod cli;
pub mod config;
pub mod dirs;
pub mod error;
pub mod fetch;
pub mod install;
pub mod manifest;
pub mod output;
pub mod package;
pub mod publish;
pub mod registry;
pub mod review;
pub mod storage;

#[cfg(any(test, feature = "test-support"))]
pub mod test_utils;
