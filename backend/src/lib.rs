//! Industry Portal API
//!
//! REST service over the industry catalog: industries, sub-industries, use
//! cases, solutions, their mappings, customer cases and editorial content.
//! Every write goes through the consistency guards of `portal_storage`.

#![deny(
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    missing_docs,
    dead_code
)]

/// Markdown documents stored in S3
pub mod document_storage;

/// Token issuing and validation
pub mod jwt;

/// Request middleware
pub mod middleware;

/// Route definitions
pub mod routes;

/// Server bootstrap
pub mod server;

/// Shared types: environment, errors, extractors
pub mod types;
