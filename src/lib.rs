//! # BIDS Uploader Library
//!
//! Maps a BIDS-organised neuroimaging directory onto the XNAT object model
//! (project → subject → experiment → scan → resource) and uploads every file
//! into the matching remote container, creating missing containers on demand.
//!
//! ## Architecture
//!
//! The crate is built using:
//! - **Tokio**: async runtime driving the (strictly sequential) traversal
//! - **Reqwest**: HTTP client for the XNAT REST API
//! - **Serde**: JSON decoding of XNAT listings and the final run report
//! - **Tracing**: structured logging of every classification and upload
//!
//! ## Core Components
//!
//! - [`bids`]: directory classifier and scan-type resolver
//! - [`config`]: layered application configuration
//! - [`error`]: error types for parsing, remote calls and fatal run errors
//! - [`mapper`]: idempotent find-or-create of remote containers
//! - [`metrics`]: counters collected during a run
//! - [`prompt`]: interactive collection of run inputs
//! - [`types`]: traversal context and failure records
//! - [`uploader`]: the traversal driver producing an [`uploader::UploadReport`]
//! - [`xnat`]: the remote capability trait plus HTTP and in-memory backends
//!
//! ## Behaviour
//!
//! - Repeated runs over an unchanged directory reuse every container
//! - Per-file failures are recorded and never abort the run
//! - Dry runs replay the traversal against an in-memory XNAT

pub mod bids;
pub mod config;
pub mod error;
pub mod mapper;
pub mod metrics;
pub mod prompt;
pub mod types;
pub mod uploader;
pub mod xnat;

#[cfg(test)]
mod tests;
