//! Structural diff between two documents
//!
//! [`diff`] produces an RFC 6902 patch that turns `before` into `after`:
//!
//! ```ignore
//! apply_patch(&before, &diff(&before, &after)) == Ok(after)
//! ```
//!
//! Equal documents yield an empty patch. Diffing is total: any two JSON
//! values can be diffed and the function never fails.
//!
//! # Emitted operations
//!
//! - Objects: `remove` for dropped members, `add` for new members, a
//!   recursive diff for members present on both sides, and `move` when a
//!   dropped member's value reappears under a new key
//! - Arrays: LCS alignment; unmatched elements become `remove`/`add`, and
//!   a removed element paired with an added one is diffed in place
//! - Anything else that differs: `replace`

mod array;
mod engine;

pub use engine::diff;
