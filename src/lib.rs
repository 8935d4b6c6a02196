//! palimpsest - a temporal patch-store
//!
//! Every entity is an append-only log of JSON patches. The document is never
//! stored; it is the fold of its patches over `{}`. Any past state can be
//! read by instant or by ordinal version, and branches diverge from the main
//! timeline at an anchor instant without copying anything.

pub mod api;
pub mod branch;
pub mod cli;
pub mod clock;
pub mod config;
pub mod diff;
pub mod errors;
pub mod journal;
pub mod materializer;
pub mod observability;
pub mod patch;
pub mod resolver;
pub mod service;
pub mod store;
pub mod write;
