//! Core types and the record submission protocol for the road survey store.
//!
//! This crate is deliberately free of HTTP and database dependencies. Storage
//! backends implement [`store::SurveyTx`] and [`store::SurveyStore`]; the
//! submission protocol in [`submit`] runs against those traits.

// We intentionally use native `async fn` in traits (stabilised in Rust 1.75).
// Suppress the advisory lint about `Send` bounds on the returned futures.
#![allow(async_fn_in_trait)]

pub mod code;
pub mod dimension;
pub mod error;
pub mod link;
pub mod plan;
pub mod record;
pub mod resolve;
pub mod store;
pub mod submit;

#[cfg(test)]
mod memory;

pub use dimension::{find_links, record_dimensions, update_dimensions};
pub use error::{Entity, ResolveError, SubmitError, ValidationError};
pub use submit::{Stage, Submission, submit_record};
