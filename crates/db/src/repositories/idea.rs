use sqlx::Row;
use uuid::Uuid;

use forkidea_core::domain::idea::{Idea, IdeaId, NewIdea, VoteTally, VoteUpdate};

use super::{IdeaRepository, RepositoryError};
use crate::DbPool;

pub struct SqlIdeaRepository {
    pool: DbPool,
}

impl SqlIdeaRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn row_to_idea(row: &sqlx::sqlite::SqliteRow) -> Result<Idea, RepositoryError> {
    let id: String = row.try_get("id").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let user_id: String =
        row.try_get("user_id").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let user_name: String =
        row.try_get("user_name").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let title: String =
        row.try_get("title").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let description: String =
        row.try_get("description").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let submitted_at: i64 =
        row.try_get("submitted_at").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let upvotes: i64 =
        row.try_get("upvotes").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let downvotes: i64 =
        row.try_get("downvotes").map_err(|e| RepositoryError::Decode(e.to_string()))?;

    Ok(Idea {
        id: IdeaId(id),
        user_id,
        user_name,
        title,
        description,
        submitted_at,
        votes: VoteTally { upvotes, downvotes },
    })
}

const IDEA_COLUMNS: &str =
    "id, user_id, user_name, title, description, submitted_at, upvotes, downvotes";

#[async_trait::async_trait]
impl IdeaRepository for SqlIdeaRepository {
    async fn create(&self, idea: NewIdea) -> Result<IdeaId, RepositoryError> {
        let id = Uuid::new_v4().to_string();

        sqlx::query(
            "INSERT INTO ideas (id, user_id, user_name, title, description, submitted_at, upvotes, downvotes)
             VALUES (?, ?, ?, ?, ?, ?, 0, 0)",
        )
        .bind(&id)
        .bind(&idea.user_id)
        .bind(&idea.user_name)
        .bind(&idea.title)
        .bind(&idea.description)
        .bind(idea.submitted_at)
        .execute(&self.pool)
        .await?;

        Ok(IdeaId(id))
    }

    async fn find_by_id(&self, id: &IdeaId) -> Result<Option<Idea>, RepositoryError> {
        let row = sqlx::query(&format!("SELECT {IDEA_COLUMNS} FROM ideas WHERE id = ?"))
            .bind(&id.0)
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(ref r) => Ok(Some(row_to_idea(r)?)),
            None => Ok(None),
        }
    }

    async fn list_all(&self) -> Result<Vec<Idea>, RepositoryError> {
        let rows: Vec<sqlx::sqlite::SqliteRow> =
            sqlx::query(&format!("SELECT {IDEA_COLUMNS} FROM ideas"))
                .fetch_all(&self.pool)
                .await?;

        rows.iter().map(row_to_idea).collect::<Result<Vec<_>, _>>()
    }

    async fn list_by_user(&self, user_id: &str) -> Result<Vec<Idea>, RepositoryError> {
        let rows: Vec<sqlx::sqlite::SqliteRow> =
            sqlx::query(&format!("SELECT {IDEA_COLUMNS} FROM ideas WHERE user_id = ?"))
                .bind(user_id)
                .fetch_all(&self.pool)
                .await?;

        rows.iter().map(row_to_idea).collect::<Result<Vec<_>, _>>()
    }

    async fn list_by_time_range(
        &self,
        start: i64,
        end: i64,
    ) -> Result<Vec<Idea>, RepositoryError> {
        let rows: Vec<sqlx::sqlite::SqliteRow> = sqlx::query(&format!(
            "SELECT {IDEA_COLUMNS} FROM ideas WHERE submitted_at BETWEEN ? AND ?"
        ))
        .bind(start)
        .bind(end)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(row_to_idea).collect::<Result<Vec<_>, _>>()
    }

    async fn count(&self, user_id: Option<&str>) -> Result<u64, RepositoryError> {
        let count: i64 = if let Some(user_id) = user_id {
            sqlx::query_scalar("SELECT COUNT(*) FROM ideas WHERE user_id = ?")
                .bind(user_id)
                .fetch_one(&self.pool)
                .await?
        } else {
            sqlx::query_scalar("SELECT COUNT(*) FROM ideas").fetch_one(&self.pool).await?
        };

        Ok(count.max(0) as u64)
    }

    async fn update_votes(
        &self,
        id: &IdeaId,
        update: VoteUpdate,
    ) -> Result<bool, RepositoryError> {
        // Delta mode is a single UPDATE so concurrent reactions on the same
        // idea cannot lose increments.
        let result = match update {
            VoteUpdate::Absolute(tally) => {
                sqlx::query("UPDATE ideas SET upvotes = ?, downvotes = ? WHERE id = ?")
                    .bind(tally.upvotes)
                    .bind(tally.downvotes)
                    .bind(&id.0)
                    .execute(&self.pool)
                    .await?
            }
            VoteUpdate::Delta(delta) => sqlx::query(
                "UPDATE ideas SET upvotes = upvotes + ?, downvotes = downvotes + ? WHERE id = ?",
            )
            .bind(delta.upvotes)
            .bind(delta.downvotes)
            .bind(&id.0)
            .execute(&self.pool)
            .await?,
        };

        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use forkidea_core::domain::idea::{IdeaId, NewIdea, VoteDelta, VoteTally, VoteUpdate};

    use super::SqlIdeaRepository;
    use crate::repositories::IdeaRepository;
    use crate::{connect_with_settings, migrations};

    async fn setup() -> sqlx::SqlitePool {
        let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");
        migrations::run_pending(&pool).await.expect("migrations");
        pool
    }

    fn sample_idea(user_id: &str, title: &str, submitted_at: i64) -> NewIdea {
        NewIdea {
            user_id: user_id.to_string(),
            user_name: format!("{user_id}-name"),
            title: title.to_string(),
            description: format!("{title} description"),
            submitted_at,
        }
    }

    #[tokio::test]
    async fn create_and_find_round_trip() {
        let repo = SqlIdeaRepository::new(setup().await);

        let id = repo.create(sample_idea("U1", "Dark mode", 1000)).await.expect("create");
        let found = repo.find_by_id(&id).await.expect("find").expect("should exist");

        assert_eq!(found.id, id);
        assert_eq!(found.user_id, "U1");
        assert_eq!(found.user_name, "U1-name");
        assert_eq!(found.title, "Dark mode");
        assert_eq!(found.submitted_at, 1000);
        assert_eq!(found.votes, VoteTally::default());
    }

    #[tokio::test]
    async fn created_ids_are_unique() {
        let repo = SqlIdeaRepository::new(setup().await);

        let first = repo.create(sample_idea("U1", "One", 1)).await.expect("create 1");
        let second = repo.create(sample_idea("U1", "One", 1)).await.expect("create 2");

        assert_ne!(first, second);
    }

    #[tokio::test]
    async fn find_by_id_returns_none_for_missing_record() {
        let repo = SqlIdeaRepository::new(setup().await);
        let found = repo.find_by_id(&IdeaId("missing".to_string())).await.expect("find");
        assert!(found.is_none());
    }

    #[tokio::test]
    async fn list_by_user_filters_by_submitter() {
        let repo = SqlIdeaRepository::new(setup().await);

        repo.create(sample_idea("U1", "First", 1)).await.expect("create 1");
        repo.create(sample_idea("U2", "Second", 2)).await.expect("create 2");
        repo.create(sample_idea("U1", "Third", 3)).await.expect("create 3");

        let mine = repo.list_by_user("U1").await.expect("list");
        assert_eq!(mine.len(), 2);
        assert!(mine.iter().all(|idea| idea.user_id == "U1"));
    }

    #[tokio::test]
    async fn exact_timestamp_range_returns_the_single_match() {
        let repo = SqlIdeaRepository::new(setup().await);

        repo.create(sample_idea("U1", "Before", 999)).await.expect("create before");
        let target = repo.create(sample_idea("U1", "Target", 1000)).await.expect("create target");
        repo.create(sample_idea("U1", "After", 1001)).await.expect("create after");

        let matches = repo.list_by_time_range(1000, 1000).await.expect("range");
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].id, target);
    }

    #[tokio::test]
    async fn time_range_bounds_are_inclusive() {
        let repo = SqlIdeaRepository::new(setup().await);

        repo.create(sample_idea("U1", "Start", 10)).await.expect("create");
        repo.create(sample_idea("U1", "Middle", 15)).await.expect("create");
        repo.create(sample_idea("U1", "End", 20)).await.expect("create");
        repo.create(sample_idea("U1", "Outside", 21)).await.expect("create");

        let matches = repo.list_by_time_range(10, 20).await.expect("range");
        assert_eq!(matches.len(), 3);
    }

    #[tokio::test]
    async fn count_is_idempotent_and_user_scoped() {
        let repo = SqlIdeaRepository::new(setup().await);

        repo.create(sample_idea("U1", "First", 1)).await.expect("create 1");
        repo.create(sample_idea("U2", "Second", 2)).await.expect("create 2");

        assert_eq!(repo.count(None).await.expect("count all"), 2);
        assert_eq!(repo.count(None).await.expect("count all again"), 2);
        assert_eq!(repo.count(Some("U1")).await.expect("count user"), 1);
        assert_eq!(repo.count(Some("nobody")).await.expect("count nobody"), 0);
    }

    #[tokio::test]
    async fn absolute_then_delta_votes_compose() {
        let repo = SqlIdeaRepository::new(setup().await);
        let id = repo.create(sample_idea("U1", "Votes", 1)).await.expect("create");

        let updated = repo
            .update_votes(&id, VoteUpdate::Absolute(VoteTally::new(1, 2)))
            .await
            .expect("absolute");
        assert!(updated);

        let updated = repo
            .update_votes(
                &id,
                VoteUpdate::Delta(VoteDelta { upvotes: 1, downvotes: -1 }),
            )
            .await
            .expect("delta");
        assert!(updated);

        let idea = repo.find_by_id(&id).await.expect("find").expect("exists");
        assert_eq!(idea.votes, VoteTally::new(2, 1));
    }

    #[tokio::test]
    async fn update_votes_on_missing_idea_returns_false() {
        let repo = SqlIdeaRepository::new(setup().await);

        let updated = repo
            .update_votes(&IdeaId("missing".to_string()), VoteUpdate::Delta(VoteDelta::upvote(1)))
            .await
            .expect("update");

        assert!(!updated);
    }

    #[tokio::test]
    async fn concurrent_deltas_do_not_lose_increments() {
        let pool = setup().await;
        let repo = std::sync::Arc::new(SqlIdeaRepository::new(pool));
        let id = repo.create(sample_idea("U1", "Hot idea", 1)).await.expect("create");

        let mut handles = Vec::new();
        for _ in 0..8 {
            let repo = repo.clone();
            let id = id.clone();
            handles.push(tokio::spawn(async move {
                repo.update_votes(&id, VoteUpdate::Delta(VoteDelta::upvote(1))).await
            }));
        }
        for handle in handles {
            handle.await.expect("join").expect("update");
        }

        let idea = repo.find_by_id(&id).await.expect("find").expect("exists");
        assert_eq!(idea.votes.upvotes, 8);
    }
}
