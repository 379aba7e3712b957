//! Core types shared across the revcompare crates
//!
//! This crate provides the leaf types used by the comparison engine and its
//! logging facility:
//!
//! - **Correlation**: `ComparisonId`, the identifier attached to every
//!   diagnostic emitted while one comparison request runs
//! - **Schema constants**: canonical field keys and event names

pub mod correlation;
pub mod schema;

pub use correlation::ComparisonId;
