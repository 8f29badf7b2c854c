//! Lazily fetched phase metadata.
//!
//! The phase metadata is a small reference table that lives in a slow remote system. This crate
//! fetches it at most once, shares the in-flight fetch between concurrent callers, and recovers
//! from failed fetches by starting a new generation instead of caching the failure.
//!
//! - [`LazyFetchCell`](cell::LazyFetchCell) memoizes the fetched records.
//! - [`PhaseIndexBuilder`](index::PhaseIndexBuilder) turns them into a [`Phase`](records::Phase)
//!   keyed map on demand.
//! - [`sources`] provides the file and HTTP backed [`MetadataSource`](sources::MetadataSource)s.

#[macro_use]
pub mod metrics;

pub mod cell;
pub mod config;
pub mod error;
pub mod index;
pub mod logging;
pub mod records;
pub mod sources;
pub mod utils;


pub use cell::{FetchResult, LazyFetchCell, Records};
pub use error::FetchError;
pub use index::{PhaseIndex, PhaseIndexBuilder, index_records};
pub use records::{Phase, RawMetadataRecord};
pub use sources::MetadataSource;
