// Moderation service - core business logic for content submission and review.
//
// This service handles:
// - Accepting submissions (ban check, validation, classification, decision)
// - Applying auto-bans decided by the decision engine
// - Moderator actions (approve/remove reviewed posts, ban/unban users)
// - Derived views (a user's own feed, the review queue, the dashboard)
//
// NO HTTP or database dependencies here - storage and the moderation service
// are reached through the `ModerationStore` and `ModerationProvider` traits.

use super::decision_engine::decide;
use super::moderation_client::{ModerationClient, ModerationProvider};
use super::moderation_models::{
    BanAction, BanDecision, ContentKind, NewPost, Post, PostId, PostStatus, ReviewAction,
    SessionId, User, OWNER_VISIBLE_STATUSES,
};
use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use chrono::Utc;
use thiserror::Error;

// ============================================================================
// ERRORS
// ============================================================================

#[derive(Debug, Error)]
pub enum ModerationError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("User {0} is banned")]
    Banned(SessionId),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Post {id} is {current}, only posts in human_review can be reviewed")]
    InvalidTransition { id: PostId, current: PostStatus },

    #[error("Storage error: {0}")]
    StorageError(String),
}

// ============================================================================
// STORAGE TRAIT (PORT)
// ============================================================================

/// Repository of posts and users.
///
/// Implementations must be safe to call from many submission flows at once:
/// post ids are strictly increasing and never reused, a post is never visible
/// half-written, and a `set_banned` is observed by every later `is_banned`.
#[async_trait]
pub trait ModerationStore: Send + Sync {
    /// Create the user if missing. Never touches an existing ban flag.
    async fn create_user_if_absent(&self, id: &SessionId) -> Result<User, ModerationError>;

    /// Unknown users are not banned.
    async fn is_banned(&self, id: &SessionId) -> Result<bool, ModerationError>;

    async fn set_banned(&self, id: &SessionId, banned: bool) -> Result<User, ModerationError>;

    async fn get_user(&self, id: &SessionId) -> Result<User, ModerationError>;

    /// Assign the next id and store the post.
    async fn insert_post(&self, post: NewPost) -> Result<Post, ModerationError>;

    async fn get_post(&self, id: PostId) -> Result<Post, ModerationError>;

    /// Posts of `owner` with a status in `statuses`, newest first.
    async fn list_posts_for_owner(
        &self,
        owner: &SessionId,
        statuses: &[PostStatus],
    ) -> Result<Vec<Post>, ModerationError>;

    /// Posts with the given status, newest first.
    async fn list_posts_by_status(&self, status: PostStatus) -> Result<Vec<Post>, ModerationError>;

    /// Move a `HumanReview` post to `Approved` or `Removed`.
    async fn apply_moderator_decision(
        &self,
        id: PostId,
        action: ReviewAction,
    ) -> Result<Post, ModerationError>;

    async fn list_users(&self) -> Result<Vec<User>, ModerationError>;
}

// Blanket implementation so the backend can be chosen at startup.
#[async_trait]
impl ModerationStore for Box<dyn ModerationStore> {
    async fn create_user_if_absent(&self, id: &SessionId) -> Result<User, ModerationError> {
        (**self).create_user_if_absent(id).await
    }

    async fn is_banned(&self, id: &SessionId) -> Result<bool, ModerationError> {
        (**self).is_banned(id).await
    }

    async fn set_banned(&self, id: &SessionId, banned: bool) -> Result<User, ModerationError> {
        (**self).set_banned(id, banned).await
    }

    async fn get_user(&self, id: &SessionId) -> Result<User, ModerationError> {
        (**self).get_user(id).await
    }

    async fn insert_post(&self, post: NewPost) -> Result<Post, ModerationError> {
        (**self).insert_post(post).await
    }

    async fn get_post(&self, id: PostId) -> Result<Post, ModerationError> {
        (**self).get_post(id).await
    }

    async fn list_posts_for_owner(
        &self,
        owner: &SessionId,
        statuses: &[PostStatus],
    ) -> Result<Vec<Post>, ModerationError> {
        (**self).list_posts_for_owner(owner, statuses).await
    }

    async fn list_posts_by_status(&self, status: PostStatus) -> Result<Vec<Post>, ModerationError> {
        (**self).list_posts_by_status(status).await
    }

    async fn apply_moderator_decision(
        &self,
        id: PostId,
        action: ReviewAction,
    ) -> Result<Post, ModerationError> {
        (**self).apply_moderator_decision(id, action).await
    }

    async fn list_users(&self) -> Result<Vec<User>, ModerationError> {
        (**self).list_users().await
    }
}

// ============================================================================
// SUBMISSIONS
// ============================================================================

/// Raw user input: optional text and optional image bytes.
#[derive(Debug, Clone, Default)]
pub struct Submission {
    pub text: Option<String>,
    pub image: Option<Vec<u8>>,
}

impl Submission {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            image: None,
        }
    }

    pub fn image(bytes: Vec<u8>) -> Self {
        Self {
            text: None,
            image: Some(bytes),
        }
    }

    /// Pick the content to moderate. Text wins over an image when both are
    /// present; the image is dropped.
    pub fn into_content(self) -> Result<(ContentKind, String), ModerationError> {
        match (self.text, self.image) {
            (Some(text), image) if !text.is_empty() => {
                if image.is_some() {
                    tracing::debug!("Submission has text and image, ignoring image");
                }
                Ok((ContentKind::Text, text))
            }
            (_, Some(bytes)) if !bytes.is_empty() => {
                Ok((ContentKind::Image, BASE64.encode(bytes)))
            }
            _ => Err(ModerationError::Validation(
                "Please provide either text or an image to post.".to_string(),
            )),
        }
    }
}

/// Result of an accepted submission.
#[derive(Debug, Clone)]
pub struct SubmissionOutcome {
    pub post: Post,
    /// The submitter was banned by this submission.
    pub banned: bool,
}

impl SubmissionOutcome {
    /// Message shown to the submitter.
    pub fn notice(&self) -> &'static str {
        match self.post.status {
            PostStatus::AutoRemove => BANNED_NOTICE,
            PostStatus::HumanReview => "Your post has been flagged for review.",
            _ => "Your post has been submitted!",
        }
    }
}

pub const BANNED_NOTICE: &str = "Your post violates our guidelines. You have been banned.";

/// What the moderator queue page shows.
#[derive(Debug, Clone)]
pub struct ModeratorDashboard {
    pub review_posts: Vec<Post>,
    pub users: Vec<User>,
}

// ============================================================================
// CORE SERVICE
// ============================================================================

pub struct ModerationService<S: ModerationStore, P: ModerationProvider> {
    store: S,
    client: ModerationClient<P>,
}

impl<S: ModerationStore, P: ModerationProvider> ModerationService<S, P> {
    pub fn new(store: S, client: ModerationClient<P>) -> Self {
        Self { store, client }
    }

    /// Register a session on first contact.
    pub async fn touch_user(&self, id: &SessionId) -> Result<User, ModerationError> {
        self.store.create_user_if_absent(id).await
    }

    /// Moderate and store a submission.
    ///
    /// Banned users are rejected before anything else happens. Moderation
    /// service failures never surface here: the client falls back locally.
    pub async fn submit(
        &self,
        owner: &SessionId,
        submission: Submission,
    ) -> Result<SubmissionOutcome, ModerationError> {
        self.store.create_user_if_absent(owner).await?;
        if self.store.is_banned(owner).await? {
            tracing::info!(owner = %owner, "Rejected submission from banned user");
            return Err(ModerationError::Banned(owner.clone()));
        }

        let (kind, content) = submission.into_content()?;
        let created_at = Utc::now();

        let report = self.client.classify(&content, kind, owner).await;
        let (status, ban) = decide(&report.result, kind);

        let post = self
            .store
            .insert_post(NewPost {
                owner: owner.clone(),
                kind,
                content,
                created_at,
                summary: report.summary.clone(),
                moderation: report,
                status,
            })
            .await?;

        let banned = ban == BanDecision::Ban;
        if banned {
            self.store.set_banned(owner, true).await?;
        }

        tracing::info!(
            post_id = %post.id,
            owner = %owner,
            kind = %kind,
            status = %post.status,
            banned,
            "Submission moderated"
        );

        Ok(SubmissionOutcome { post, banned })
    }

    /// The owner's posts that are still visible to them, newest first.
    pub async fn own_feed(&self, owner: &SessionId) -> Result<Vec<Post>, ModerationError> {
        self.store
            .list_posts_for_owner(owner, &OWNER_VISIBLE_STATUSES)
            .await
    }

    /// Posts waiting for a human decision, newest first.
    pub async fn review_queue(&self) -> Result<Vec<Post>, ModerationError> {
        self.store.list_posts_by_status(PostStatus::HumanReview).await
    }

    pub async fn review_post(
        &self,
        id: PostId,
        action: ReviewAction,
    ) -> Result<Post, ModerationError> {
        let post = self.store.apply_moderator_decision(id, action).await?;
        tracing::info!(post_id = %id, status = %post.status, "Moderator reviewed post");
        Ok(post)
    }

    /// Ban or unban a known user. Takes effect on their next submission.
    pub async fn set_user_ban(
        &self,
        id: &SessionId,
        action: BanAction,
    ) -> Result<User, ModerationError> {
        let user = self.store.set_banned(id, action.is_banned()).await?;
        tracing::info!(user_id = %id, banned = user.is_banned, "Moderator updated ban flag");
        Ok(user)
    }

    pub async fn get_post(&self, id: PostId) -> Result<Post, ModerationError> {
        self.store.get_post(id).await
    }

    pub async fn get_user(&self, id: &SessionId) -> Result<User, ModerationError> {
        self.store.get_user(id).await
    }

    pub async fn list_users(&self) -> Result<Vec<User>, ModerationError> {
        self.store.list_users().await
    }

    pub async fn dashboard(&self) -> Result<ModeratorDashboard, ModerationError> {
        Ok(ModeratorDashboard {
            review_posts: self.review_queue().await?,
            users: self.list_users().await?,
        })
    }
}

// ============================================================================
// TESTS
// ============================================================================
