use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use super::Identified;
use crate::error::SyncError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedPost {
    pub id: String,
    #[serde(default)]
    pub author_name: String,
    pub body: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub community_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    /// emoji -> count
    #[serde(default)]
    pub reactions: BTreeMap<String, u32>,
    /// Emoji the viewer has reacted with
    #[serde(default)]
    pub my_reactions: BTreeSet<String>,
    #[serde(skip)]
    pub pending: bool,
}

impl FeedPost {
    pub fn placeholder(temp_id: String, draft: &NewPost, author_name: &str) -> Self {
        Self {
            id: temp_id,
            author_name: author_name.to_string(),
            body: draft.body.trim().to_string(),
            community_id: draft.community_id.clone(),
            created_at: None,
            reactions: BTreeMap::new(),
            my_reactions: BTreeSet::new(),
            pending: true,
        }
    }

    pub fn reaction_count(&self, emoji: &str) -> u32 {
        self.reactions.get(emoji).copied().unwrap_or(0)
    }

    pub fn has_reacted(&self, emoji: &str) -> bool {
        self.my_reactions.contains(emoji)
    }

    /// Flip the viewer's reaction for `emoji`. Counts floor at zero and
    /// zero-count entries are dropped.
    pub fn toggle_reaction(&mut self, emoji: &str) {
        if self.my_reactions.remove(emoji) {
            let next = self.reaction_count(emoji).saturating_sub(1);
            if next == 0 {
                self.reactions.remove(emoji);
            } else {
                self.reactions.insert(emoji.to_string(), next);
            }
        } else {
            self.my_reactions.insert(emoji.to_string());
            let count = self.reactions.entry(emoji.to_string()).or_insert(0);
            *count = count.saturating_add(1);
        }
    }
}

impl Identified for FeedPost {
    fn id(&self) -> &str {
        &self.id
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewPost {
    pub body: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub community_id: Option<String>,
}

impl NewPost {
    pub fn validate(&self) -> Result<(), SyncError> {
        if self.body.trim().is_empty() {
            return Err(SyncError::validation("Post cannot be empty"));
        }
        Ok(())
    }
}
