//! Operation surface of the store
//!
//! [`DocumentService`] wires the store, branch registry, resolver and
//! write coordinator together and is the only thing callers need.

mod document;

pub use document::DocumentService;
