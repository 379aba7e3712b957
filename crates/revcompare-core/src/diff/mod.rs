//! Rendering of comparison results.
//!
//! The engine classifies fields; this module turns each changed field into a
//! [`DiffPayload`] through the [`RendererTable`] and offers a plain text
//! summary of a whole [`CompareResult`].
//!
//! ## Guarantees
//!
//! - **Determinism**: identical inputs produce identical payloads and summaries.
//! - **No global state**: the text diff backend is passed in explicitly.

pub mod model;
pub mod renderers;
pub mod summary;
pub mod text;

pub use model::{CompareResult, DiffEntry, DiffPayload};
pub use renderers::{FieldRenderer, RendererTable};
pub use summary::render_summary;
pub use text::{LineDiffRenderer, TextDiffRenderer};
