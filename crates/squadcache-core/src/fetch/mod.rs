//! Network access for the sync layer.
//!
//! This module provides the `Fetcher` trait that the lifecycle controller,
//! loaders, and existence probe use for all network traffic, plus the
//! `HttpFetcher` implementation backed by reqwest. Everything above this
//! seam is network-agnostic, which is also what makes offline behavior
//! testable.

pub mod client;
pub mod error;

pub use client::{Fetcher, FetchedResponse, HttpFetcher};
pub use error::FetchError;
