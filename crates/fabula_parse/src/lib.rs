//! Multi-strategy parsing, repair, and normalization of generated payloads.
//!
//! The generation service promises nothing about its output format: it may
//! be fenced, wrongly quoted, trailing-comma'd, truncated, or plain prose.
//! This crate turns that untrusted text into validated typed records in
//! three layers:
//!
//! 1. **Sanitize** ([`sanitize`]) — strip code fences, normalize curly
//!    quotes, remove trailing commas.
//! 2. **Repair** ([`repair_structure`], [`extract_balanced`],
//!    [`extract_span_crude`]) — quote/bracket-aware balancing of JSON-like
//!    text, plus a cruder bracket-count-only extractor for pathological
//!    input.
//! 3. **Parse + normalize** ([`parse_payload`], [`normalize_payload`]) —
//!    an ordered list of decode strategies with early exit, then per-kind
//!    alias resolution, clipping, enum coercion, and de-duplication.
//!
//! The strict decode runs on fence-stripped text before any other
//! sanitation, so valid string content containing curly quotes or `,]`
//! sequences survives byte-for-byte; quote normalization and trailing-comma
//! removal apply only once the strict pass has failed.
//!
//! # Example
//!
//! ```
//! use fabula_core::{EntityKind, IndexRange};
//! use fabula_parse::{normalize_payload, parse_payload};
//!
//! let raw = "```json\n{chapters: [{chapter_num: 1, title: 'A'},]}\n```";
//! let payload = parse_payload(EntityKind::ChapterPlan, raw);
//! let records = normalize_payload(
//!     EntityKind::ChapterPlan,
//!     payload.value.as_ref().unwrap(),
//!     Some(IndexRange::new(1, 10)),
//! );
//! assert_eq!(records.len(), 1);
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod normalize;
mod payload;
mod repair;
mod sanitize;

pub use normalize::{normalize_age, normalize_gender, normalize_payload};
pub use payload::{ParsedPayload, parse_payload};
pub use repair::{extract_balanced, extract_span_crude, repair_structure};
pub use sanitize::{normalize_quotes, sanitize, strip_fences, strip_trailing_commas};
