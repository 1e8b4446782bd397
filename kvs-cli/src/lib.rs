//! Shared config/logging plumbing for the `kvs-node`, `kvs-meta`, and
//! `kvs-client` binaries.

pub mod config;
pub mod trace;
