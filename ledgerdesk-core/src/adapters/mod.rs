//! Adapter implementations
//!
//! Adapters implement the port traits with concrete technologies:
//! - DuckDB for the local Repository
//! - reqwest HTTP client for the REST collaborator
//! - Demo dataset for onboarding and tests

pub mod demo;
pub mod duckdb;
pub mod rest;

#[cfg(test)]
pub mod json_server_mock;
