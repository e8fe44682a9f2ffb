//! HTTP helpers for provider key set retrieval.

pub mod client;
