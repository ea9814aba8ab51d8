//! State module for tracking crawl progress
//!
//! # Components
//!
//! - `CandidateState`: lifecycle of an artist from the frontier to explored

mod candidate_state;

pub use candidate_state::CandidateState;
