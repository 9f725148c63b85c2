//! Core domain for the Fork This Idea bot.
//!
//! - **Domain** (`domain`) - the `Idea` record and its vote tally
//! - **Parser** (`parser`) - `PI: <title> | <description>` text parsing
//! - **Config** (`config`) - layered configuration with validation

pub mod config;
pub mod domain;
pub mod parser;

pub use domain::idea::{Idea, IdeaId, NewIdea, VoteDelta, VoteTally, VoteUpdate};
pub use parser::{is_idea_submission, parse_idea_text, strip_trigger};
