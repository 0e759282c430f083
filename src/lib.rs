// src/lib.rs
// Public library surface for the binary and integration tests.

pub mod api;
pub mod config;
pub mod digest;
pub mod fetch;
pub mod metrics;
pub mod notify;
pub mod post;
pub mod ranking;
pub mod scheduler;
pub mod store;
pub mod summarize;

// ---- Re-exports for stable public API ----
pub use crate::api::router;
pub use crate::digest::{DigestMode, DigestOutcome, DigestService};
pub use crate::post::{CandidatePost, DigestPost, RankedPost, SignalBreakdown};
pub use crate::ranking::{rank, select_diverse};
