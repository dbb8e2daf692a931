// This is the infra layer - it implements the traits defined in core.
// This file provides an IN-MEMORY implementation of ModerationStore.
//
// Everything lives for the lifetime of the process. The SQLite store in
// this same folder implements the same trait when durability is wanted.

use crate::core::moderation::{
    newest_first, ModerationError, ModerationStore, NewPost, Post, PostId, PostStatus,
    ReviewAction, SessionId, User,
};
use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, Ordering};

/// In-memory implementation of ModerationStore.
///
/// **DashMap:**
/// Each map is sharded and locks per key, so a ban flag write is visible to
/// the next read of the same key from any task, and two submissions for
/// different users never contend. No lock is held across an `.await`.
///
/// **Post ids:**
/// Taken from an atomic counter before the post is inserted as a whole, so
/// two concurrent inserts never share an id and readers never see a post
/// without its status.
pub struct InMemoryModerationStore {
    users: DashMap<SessionId, bool>,
    posts: DashMap<PostId, Post>,
    next_post_id: AtomicU64,
}

impl InMemoryModerationStore {
    /// Create a new empty in-memory store.
    pub fn new() -> Self {
        Self {
            users: DashMap::new(),
            posts: DashMap::new(),
            next_post_id: AtomicU64::new(0),
        }
    }

    fn user_not_found(id: &SessionId) -> ModerationError {
        ModerationError::NotFound(format!("user {}", id))
    }

    fn post_not_found(id: PostId) -> ModerationError {
        ModerationError::NotFound(format!("post {}", id))
    }

    /// Clone out the matching posts, newest first.
    fn collect_posts(&self, keep: impl Fn(&Post) -> bool) -> Vec<Post> {
        let mut posts: Vec<Post> = self
            .posts
            .iter()
            .filter(|entry| keep(entry.value()))
            .map(|entry| entry.value().clone())
            .collect();

        posts.sort_by(newest_first);
        posts
    }
}

#[async_trait]
impl ModerationStore for InMemoryModerationStore {
    async fn create_user_if_absent(&self, id: &SessionId) -> Result<User, ModerationError> {
        // or_insert leaves an existing flag untouched
        let is_banned = *self.users.entry(id.clone()).or_insert(false);

        Ok(User {
            id: id.clone(),
            is_banned,
        })
    }

    async fn is_banned(&self, id: &SessionId) -> Result<bool, ModerationError> {
        Ok(self.users.get(id).map(|entry| *entry).unwrap_or(false))
    }

    async fn set_banned(&self, id: &SessionId, banned: bool) -> Result<User, ModerationError> {
        let mut entry = self
            .users
            .get_mut(id)
            .ok_or_else(|| Self::user_not_found(id))?;
        *entry = banned;

        Ok(User {
            id: id.clone(),
            is_banned: banned,
        })
    }

    async fn get_user(&self, id: &SessionId) -> Result<User, ModerationError> {
        self.users
            .get(id)
            .map(|entry| User {
                id: id.clone(),
                is_banned: *entry,
            })
            .ok_or_else(|| Self::user_not_found(id))
    }

    async fn insert_post(&self, post: NewPost) -> Result<Post, ModerationError> {
        let id = PostId(self.next_post_id.fetch_add(1, Ordering::SeqCst));
        let post = post.into_post(id);
        self.posts.insert(id, post.clone());
        Ok(post)
    }

    async fn get_post(&self, id: PostId) -> Result<Post, ModerationError> {
        self.posts
            .get(&id)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| Self::post_not_found(id))
    }

    async fn list_posts_for_owner(
        &self,
        owner: &SessionId,
        statuses: &[PostStatus],
    ) -> Result<Vec<Post>, ModerationError> {
        Ok(self.collect_posts(|post| &post.owner == owner && statuses.contains(&post.status)))
    }

    async fn list_posts_by_status(&self, status: PostStatus) -> Result<Vec<Post>, ModerationError> {
        Ok(self.collect_posts(|post| post.status == status))
    }

    async fn apply_moderator_decision(
        &self,
        id: PostId,
        action: ReviewAction,
    ) -> Result<Post, ModerationError> {
        // get_mut holds the shard lock, so check-and-set is atomic
        let mut post = self
            .posts
            .get_mut(&id)
            .ok_or_else(|| Self::post_not_found(id))?;

        if post.status != PostStatus::HumanReview {
            return Err(ModerationError::InvalidTransition {
                id,
                current: post.status,
            });
        }

        post.status = action.target_status();
        Ok(post.clone())
    }

    async fn list_users(&self) -> Result<Vec<User>, ModerationError> {
        let mut users: Vec<User> = self
            .users
            .iter()
            .map(|entry| User {
                id: entry.key().clone(),
                is_banned: *entry.value(),
            })
            .collect();

        users.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(users)
    }
}

impl Default for InMemoryModerationStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::moderation::{ContentKind, ModerationReport, ModerationResult};
    use chrono::{DateTime, Duration, Utc};
    use std::collections::HashSet;
    use std::sync::Arc;

    fn draft(owner: &str, status: PostStatus, created_at: DateTime<Utc>) -> NewPost {
        NewPost {
            owner: SessionId::new(owner),
            kind: ContentKind::Text,
            content: "hello".to_string(),
            created_at,
            moderation: ModerationReport {
                action: None,
                result: ModerationResult {
                    is_harmful: false,
                    confidence: 10.0,
                    label: None,
                    text_analysis: None,
                },
                summary: None,
            },
            status,
            summary: None,
        }
    }

    #[tokio::test]
    async fn test_create_user_keeps_ban_flag() {
        let store = InMemoryModerationStore::new();
        let id = SessionId::new("user-1");

        let user = store.create_user_if_absent(&id).await.unwrap();
        assert!(!user.is_banned);

        store.set_banned(&id, true).await.unwrap();
        let user = store.create_user_if_absent(&id).await.unwrap();
        assert!(user.is_banned);
        assert!(store.is_banned(&id).await.unwrap());
    }

    #[tokio::test]
    async fn test_unknown_ids_are_not_found() {
        let store = InMemoryModerationStore::new();
        let ghost = SessionId::new("ghost");

        assert!(!store.is_banned(&ghost).await.unwrap());
        assert!(matches!(
            store.set_banned(&ghost, true).await,
            Err(ModerationError::NotFound(_))
        ));
        assert!(matches!(
            store.get_user(&ghost).await,
            Err(ModerationError::NotFound(_))
        ));
        assert!(matches!(
            store.get_post(PostId(7)).await,
            Err(ModerationError::NotFound(_))
        ));
        assert!(matches!(
            store
                .apply_moderator_decision(PostId(7), ReviewAction::Approve)
                .await,
            Err(ModerationError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_owner_listing_is_newest_first_with_tie_break() {
        let store = InMemoryModerationStore::new();
        let t0 = Utc::now();

        let old = store
            .insert_post(draft("a", PostStatus::Pass, t0))
            .await
            .unwrap();
        let tie_first = store
            .insert_post(draft("a", PostStatus::Pass, t0 + Duration::seconds(5)))
            .await
            .unwrap();
        let tie_second = store
            .insert_post(draft("a", PostStatus::HumanReview, t0 + Duration::seconds(5)))
            .await
            .unwrap();
        store
            .insert_post(draft("a", PostStatus::AutoRemove, t0 + Duration::seconds(9)))
            .await
            .unwrap();
        store
            .insert_post(draft("b", PostStatus::Pass, t0 + Duration::seconds(9)))
            .await
            .unwrap();

        let posts = store
            .list_posts_for_owner(
                &SessionId::new("a"),
                &[PostStatus::Pass, PostStatus::HumanReview],
            )
            .await
            .unwrap();

        let ids: Vec<PostId> = posts.iter().map(|p| p.id).collect();
        assert_eq!(ids, vec![tie_second.id, tie_first.id, old.id]);
    }

    #[tokio::test]
    async fn test_moderator_decision_only_from_human_review() {
        let store = InMemoryModerationStore::new();
        let now = Utc::now();

        let passed = store
            .insert_post(draft("a", PostStatus::Pass, now))
            .await
            .unwrap();
        let flagged = store
            .insert_post(draft("a", PostStatus::HumanReview, now))
            .await
            .unwrap();

        let err = store
            .apply_moderator_decision(passed.id, ReviewAction::Approve)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ModerationError::InvalidTransition {
                current: PostStatus::Pass,
                ..
            }
        ));
        assert_eq!(
            store.get_post(passed.id).await.unwrap().status,
            PostStatus::Pass
        );

        let approved = store
            .apply_moderator_decision(flagged.id, ReviewAction::Approve)
            .await
            .unwrap();
        assert_eq!(approved.status, PostStatus::Approved);
        assert!(store
            .list_posts_by_status(PostStatus::HumanReview)
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_inserts_get_distinct_ids() {
        let store = Arc::new(InMemoryModerationStore::new());
        let mut handles = Vec::new();

        for i in 0..64 {
            let store = Arc::clone(&store);
            handles.push(tokio::spawn(async move {
                store
                    .insert_post(draft(&format!("owner-{}", i % 4), PostStatus::Pass, Utc::now()))
                    .await
                    .unwrap()
                    .id
            }));
        }

        let mut ids = Vec::new();
        for handle in handles {
            ids.push(handle.await.unwrap());
        }

        let unique: HashSet<PostId> = ids.iter().copied().collect();
        assert_eq!(unique.len(), 64);

        ids.sort();
        let expected: Vec<PostId> = (0..64).map(PostId).collect();
        assert_eq!(ids, expected);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_ban_is_visible_across_tasks() {
        let store = Arc::new(InMemoryModerationStore::new());
        let id = SessionId::new("target");
        store.create_user_if_absent(&id).await.unwrap();

        let writer = {
            let store = Arc::clone(&store);
            let id = id.clone();
            tokio::spawn(async move { store.set_banned(&id, true).await.unwrap() })
        };
        writer.await.unwrap();

        let reader = {
            let store = Arc::clone(&store);
            tokio::spawn(async move { store.is_banned(&id).await.unwrap() })
        };
        assert!(reader.await.unwrap());
    }

    #[tokio::test]
    async fn test_list_users() {
        let store = InMemoryModerationStore::new();
        store
            .create_user_if_absent(&SessionId::new("b"))
            .await
            .unwrap();
        store
            .create_user_if_absent(&SessionId::new("a"))
            .await
            .unwrap();
        store.set_banned(&SessionId::new("b"), true).await.unwrap();

        let users = store.list_users().await.unwrap();
        assert_eq!(
            users,
            vec![
                User {
                    id: SessionId::new("a"),
                    is_banned: false
                },
                User {
                    id: SessionId::new("b"),
                    is_banned: true
                },
            ]
        );
    }
}
