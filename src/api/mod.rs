//! Backend submission.

pub mod client;

pub use client::{interpret_response, HttpSubmitter, OfflineSubmitter, Submitter};
