use std::collections::HashMap;

use tokio::sync::RwLock;
use uuid::Uuid;

use forkidea_core::domain::idea::{Idea, IdeaId, NewIdea, VoteTally, VoteUpdate};

use super::{IdeaRepository, RepositoryError};

/// Map-backed store for tests and ephemeral runs. Delta updates are applied
/// under the write lock, so they are as race-free as the SQL implementation.
#[derive(Default)]
pub struct InMemoryIdeaRepository {
    ideas: RwLock<HashMap<String, Idea>>,
}

#[async_trait::async_trait]
impl IdeaRepository for InMemoryIdeaRepository {
    async fn create(&self, idea: NewIdea) -> Result<IdeaId, RepositoryError> {
        let id = IdeaId(Uuid::new_v4().to_string());
        let record = Idea {
            id: id.clone(),
            user_id: idea.user_id,
            user_name: idea.user_name,
            title: idea.title,
            description: idea.description,
            submitted_at: idea.submitted_at,
            votes: VoteTally::default(),
        };

        let mut ideas = self.ideas.write().await;
        ideas.insert(id.0.clone(), record);
        Ok(id)
    }

    async fn find_by_id(&self, id: &IdeaId) -> Result<Option<Idea>, RepositoryError> {
        let ideas = self.ideas.read().await;
        Ok(ideas.get(&id.0).cloned())
    }

    async fn list_all(&self) -> Result<Vec<Idea>, RepositoryError> {
        let ideas = self.ideas.read().await;
        Ok(ideas.values().cloned().collect())
    }

    async fn list_by_user(&self, user_id: &str) -> Result<Vec<Idea>, RepositoryError> {
        let ideas = self.ideas.read().await;
        Ok(ideas.values().filter(|idea| idea.user_id == user_id).cloned().collect())
    }

    async fn list_by_time_range(
        &self,
        start: i64,
        end: i64,
    ) -> Result<Vec<Idea>, RepositoryError> {
        let ideas = self.ideas.read().await;
        Ok(ideas
            .values()
            .filter(|idea| idea.submitted_at >= start && idea.submitted_at <= end)
            .cloned()
            .collect())
    }

    async fn count(&self, user_id: Option<&str>) -> Result<u64, RepositoryError> {
        let ideas = self.ideas.read().await;
        let count = match user_id {
            Some(user_id) => ideas.values().filter(|idea| idea.user_id == user_id).count(),
            None => ideas.len(),
        };
        Ok(count as u64)
    }

    async fn update_votes(
        &self,
        id: &IdeaId,
        update: VoteUpdate,
    ) -> Result<bool, RepositoryError> {
        let mut ideas = self.ideas.write().await;
        let Some(idea) = ideas.get_mut(&id.0) else {
            return Ok(false);
        };

        idea.votes = match update {
            VoteUpdate::Absolute(tally) => tally,
            VoteUpdate::Delta(delta) => idea.votes.apply(delta),
        };
        Ok(true)
    }
}
