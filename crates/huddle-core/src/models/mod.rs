pub mod chat;
pub mod community;
pub mod event;
pub mod post;

pub use chat::{format_display_time, ChatAuthor, ChatMessage, ChatMessageRecord, ThreadRef};
pub use community::Community;
pub use event::{Event, NewEvent};
pub use post::{FeedPost, NewPost};

use uuid::Uuid;

pub const TEMP_ID_PREFIX: &str = "temp-";

/// Generate a client-side id for an entity the server has not confirmed yet
pub fn generate_temp_id() -> String {
    format!("{}{}", TEMP_ID_PREFIX, Uuid::new_v4())
}

pub fn is_temporary_id(id: &str) -> bool {
    id.starts_with(TEMP_ID_PREFIX)
}

/// Records addressable by a string id within a collection.
pub trait Identified {
    fn id(&self) -> &str;
}

/// Replace the record with `id` in place. Returns false if absent.
pub fn replace_by_id<T: Identified>(items: &mut [T], id: &str, replacement: T) -> bool {
    match items.iter_mut().find(|item| item.id() == id) {
        Some(slot) => {
            *slot = replacement;
            true
        }
        None => false,
    }
}

/// Remove every record with `id`. Returns true if anything was removed.
pub fn remove_by_id<T: Identified>(items: &mut Vec<T>, id: &str) -> bool {
    let before = items.len();
    items.retain(|item| item.id() != id);
    items.len() != before
}

pub fn find_by_id<'a, T: Identified>(items: &'a [T], id: &str) -> Option<&'a T> {
    items.iter().find(|item| item.id() == id)
}
