use async_trait::async_trait;
use thiserror::Error;

use forkidea_core::domain::idea::{Idea, IdeaId, NewIdea, VoteUpdate};

pub mod idea;
pub mod memory;

pub use idea::SqlIdeaRepository;
pub use memory::InMemoryIdeaRepository;

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("decode error: {0}")]
    Decode(String),
}

/// The idea store: a keyed append log. Records are created once, read many
/// times, and mutated only through `update_votes`. Storage order is
/// unspecified; callers sort by `submitted_at` themselves.
#[async_trait]
pub trait IdeaRepository: Send + Sync {
    /// Appends a new record with a zeroed tally and returns its id. Ids are
    /// assigned by the store and never reused.
    async fn create(&self, idea: NewIdea) -> Result<IdeaId, RepositoryError>;

    async fn find_by_id(&self, id: &IdeaId) -> Result<Option<Idea>, RepositoryError>;

    async fn list_all(&self) -> Result<Vec<Idea>, RepositoryError>;

    async fn list_by_user(&self, user_id: &str) -> Result<Vec<Idea>, RepositoryError>;

    /// Both bounds inclusive.
    async fn list_by_time_range(&self, start: i64, end: i64) -> Result<Vec<Idea>, RepositoryError>;

    async fn count(&self, user_id: Option<&str>) -> Result<u64, RepositoryError>;

    /// Returns `false` when the idea does not exist.
    async fn update_votes(&self, id: &IdeaId, update: VoteUpdate)
        -> Result<bool, RepositoryError>;
}
