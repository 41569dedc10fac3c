//! Placement CLI
//!
//! A command-line client for the OpenStack Placement API covering resource
//! providers, inventories, allocations, resource classes, traits, aggregates,
//! usages and allocation candidates.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                        Command Tree (clap)                   │
//! ├──────────────────────────────────────────────────────────────┤
//! │  ┌───────────────┐  ┌────────────────┐  ┌────────────────┐   │
//! │  │   Version     │  │    Request     │  │    Response    │   │
//! │  │  Negotiator   │  │    Builder     │  │   Formatter    │   │
//! │  │  + Field Gate │  │  (paths/query) │  │  (ShapeSpec)   │   │
//! │  └───────┬───────┘  └───────┬────────┘  └───────┬────────┘   │
//! │          └──────────────────┼───────────────────┘            │
//! │                     ┌───────┴────────┐                       │
//! │                     │ PlacementClient│                       │
//! │                     │   (reqwest)    │                       │
//! │                     └────────────────┘                       │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Modules
//!
//! - [`version`]: Microversion negotiation and per-field gating
//! - [`request`]: Path templates, query filters and argument parsing
//! - [`client`]: HTTP transport against the Placement service
//! - [`format`]: JSON payload to column/row mapping
//! - [`output`]: Table, CSV, JSON and value rendering
//! - [`commands`]: The per-resource command tree
//! - [`handler`]: Dispatch from parsed CLI to command modules

pub mod client;
pub mod commands;
pub mod error;
pub mod format;
pub mod handler;
pub mod output;
pub mod request;
pub mod version;

pub use client::PlacementClient;
pub use commands::{Cli, Commands};
pub use error::{Error, Result};
pub use format::{ShapeSpec, TabularResult};
pub use output::OutputFormat;
pub use version::{Microversion, MAX_VERSION, MIN_VERSION};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Binary name
pub const NAME: &str = "placement";
