//! Test fixtures and mock collaborators for `vercre-keys`.

mod fetcher;
pub mod fixtures;

pub use crate::fetcher::{FailingFetcher, StaticFetcher};
