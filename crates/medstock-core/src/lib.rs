//! # medstock core
//!
//! Pure logic for medstock: the raw table model, header alias resolution,
//! the record normalizer, and the query filter.
//!
//! This crate does no I/O and holds no global state. Every function is a
//! pure transformation over in-memory data, safe to call from any thread.

pub mod aliases;
pub mod filter;
pub mod models;
pub mod normalize;
pub mod parse;
