//! Row normalization for sensor exports of unknown schema
//!
//! Raw header strings are canonicalized, cells are coerced into finite
//! numbers, and each canonical row is mapped onto the fixed set of target
//! measurements by token-based scoring.

pub mod canonical;
pub mod coerce;
pub mod inference;
pub mod timestamp;

pub use canonical::{canonicalize, tokenize};
pub use coerce::{coerce, coerce_str};
pub use inference::{
    FieldInference, FieldMatches, MeaningSpec, RowInference, apply_fallbacks, classify,
    pick_by_meaning, score_key,
};
pub use timestamp::{extract_timestamp, parse_timestamp};
