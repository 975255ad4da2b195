//! Best-effort recovery of near-miss provider output.
//!
//! Two layers: [`extract`] pulls a JSON object out of prose or code fences
//! when direct parsing fails, and [`sanitize`] repairs the parsed value's
//! shape (coercions, inference, unknown-key stripping) before validation.
//! Neither layer performs I/O or calls a model.

pub mod extract;
pub mod sanitize;

pub use extract::{extract_json_object, parse_json_lenient, strip_think_tags};
pub use sanitize::{minimal_spec, sanitize_spec};
