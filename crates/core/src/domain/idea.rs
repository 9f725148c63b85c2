use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct IdeaId(pub String);

/// Upvote/downvote counters for a single idea.
///
/// Counts are signed: reaction-removed events apply a negative delta
/// without clamping, so an out-of-order or double-processed removal can
/// briefly drive a counter below zero.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoteTally {
    pub upvotes: i64,
    pub downvotes: i64,
}

impl VoteTally {
    pub fn new(upvotes: i64, downvotes: i64) -> Self {
        Self { upvotes, downvotes }
    }

    pub fn apply(&self, delta: VoteDelta) -> VoteTally {
        VoteTally {
            upvotes: self.upvotes + delta.upvotes,
            downvotes: self.downvotes + delta.downvotes,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct VoteDelta {
    pub upvotes: i64,
    pub downvotes: i64,
}

impl VoteDelta {
    pub fn upvote(sign: i64) -> Self {
        Self { upvotes: sign, downvotes: 0 }
    }

    pub fn downvote(sign: i64) -> Self {
        Self { upvotes: 0, downvotes: sign }
    }
}

/// A vote mutation: either replace the tally outright or adjust it by a
/// signed delta. Exactly-one-of is enforced by the type itself.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum VoteUpdate {
    Absolute(VoteTally),
    Delta(VoteDelta),
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Idea {
    pub id: IdeaId,
    pub user_id: String,
    pub user_name: String,
    pub title: String,
    pub description: String,
    /// Unix seconds of the originating submission event. This is the
    /// authoritative ordering key and the correlation key for reaction
    /// votes, so it must come from the triggering message's own
    /// timestamp whenever one is available.
    pub submitted_at: i64,
    pub votes: VoteTally,
}

/// Everything the store needs to append a new idea. The id and the
/// zeroed tally are assigned by the store at creation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NewIdea {
    pub user_id: String,
    pub user_name: String,
    pub title: String,
    pub description: String,
    pub submitted_at: i64,
}
