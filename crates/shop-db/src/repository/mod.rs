//! # Repository Module
//!
//! Repositories wrap a cloned pool and keep all SQL in one place.
//!
//! - [`KeyValueRepository`](kv::KeyValueRepository) - string entries keyed by name

pub mod kv;
