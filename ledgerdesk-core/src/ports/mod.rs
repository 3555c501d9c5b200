//! Ports - trait definitions for external dependencies
//!
//! These traits define the boundaries of the core domain.
//! Adapters implement these traits to connect to the local store or a remote API.

pub mod repository;

pub use repository::Repository;
