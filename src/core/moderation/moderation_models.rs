// Moderation domain models - data structures for content moderation.
//
// These are pure domain types with no HTTP or storage dependencies.
// The wire shapes (ModerationReport and friends) match the moderation
// service's JSON so the same types are produced by the remote client and
// the local classifier.

use chrono::{DateTime, Utc};
use rand::distributions::Alphanumeric;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Length of a freshly generated session token.
const SESSION_TOKEN_LEN: usize = 32;

/// Opaque session identifier. Used both as the user id and as a post's owner.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(String);

impl SessionId {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Issue a new random alphanumeric token.
    pub fn generate() -> Self {
        let token: String = rand::thread_rng()
            .sample_iter(&Alphanumeric)
            .take(SESSION_TOKEN_LEN)
            .map(char::from)
            .collect();
        Self(token)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Post identifier, assigned by the store at insertion time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PostId(pub u64);

impl fmt::Display for PostId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// What kind of content a post carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentKind {
    Text,
    /// `content` holds base64-encoded image bytes.
    Image,
}

impl ContentKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContentKind::Text => "text",
            ContentKind::Image => "image",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "text" => Some(ContentKind::Text),
            "image" => Some(ContentKind::Image),
            _ => None,
        }
    }
}

impl fmt::Display for ContentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lifecycle status of a post.
///
/// `Pending` only exists while a submission is being processed and is never
/// stored. `Approved` and `Removed` are reachable only from `HumanReview`
/// through a moderator decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PostStatus {
    Pending,
    Pass,
    HumanReview,
    AutoRemove,
    Approved,
    Removed,
}

impl PostStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PostStatus::Pending => "pending",
            PostStatus::Pass => "pass",
            PostStatus::HumanReview => "human_review",
            PostStatus::AutoRemove => "auto_remove",
            PostStatus::Approved => "approved",
            PostStatus::Removed => "removed",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "pending" => Some(PostStatus::Pending),
            "pass" => Some(PostStatus::Pass),
            "human_review" => Some(PostStatus::HumanReview),
            "auto_remove" => Some(PostStatus::AutoRemove),
            "approved" => Some(PostStatus::Approved),
            "removed" => Some(PostStatus::Removed),
            _ => None,
        }
    }
}

impl fmt::Display for PostStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Statuses a submitter can see in their own feed.
pub const OWNER_VISIBLE_STATUSES: [PostStatus; 3] = [
    PostStatus::Pass,
    PostStatus::HumanReview,
    PostStatus::Approved,
];

/// Whether a submission should get its author banned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BanDecision {
    None,
    Ban,
}

/// A human moderator's verdict on a post waiting in the review queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReviewAction {
    Approve,
    Remove,
}

impl ReviewAction {
    /// The status a post in `HumanReview` moves to.
    pub fn target_status(&self) -> PostStatus {
        match self {
            ReviewAction::Approve => PostStatus::Approved,
            ReviewAction::Remove => PostStatus::Removed,
        }
    }
}

/// A moderator's ban/unban action on a user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BanAction {
    Ban,
    Unban,
}

impl BanAction {
    pub fn is_banned(&self) -> bool {
        matches!(self, BanAction::Ban)
    }
}

// ============================================================================
// MODERATION RESULT (wire shape)
// ============================================================================

/// Nested analysis of text found inside an image.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextAnalysis {
    pub confidence: f64,
}

/// The harm assessment itself.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModerationResult {
    pub is_harmful: bool,
    /// Score in `[0, 100]`.
    pub confidence: f64,
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default)]
    pub text_analysis: Option<TextAnalysis>,
}

impl ModerationResult {
    /// Whether every score in the result lies in `[0, 100]`.
    pub fn scores_in_range(&self) -> bool {
        let in_range = |v: f64| v.is_finite() && (0.0..=100.0).contains(&v);
        in_range(self.confidence)
            && self
                .text_analysis
                .as_ref()
                .map_or(true, |t| in_range(t.confidence))
    }
}

/// Full response from the moderation service (or the local classifier).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModerationReport {
    /// Action suggested by the service; informational only.
    #[serde(default)]
    pub action: Option<String>,
    pub result: ModerationResult,
    #[serde(default)]
    pub summary: Option<String>,
}

// ============================================================================
// POSTS AND USERS
// ============================================================================

/// A post that has been moderated but not yet stored.
#[derive(Debug, Clone)]
pub struct NewPost {
    pub owner: SessionId,
    pub kind: ContentKind,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub moderation: ModerationReport,
    pub status: PostStatus,
    pub summary: Option<String>,
}

impl NewPost {
    pub fn into_post(self, id: PostId) -> Post {
        Post {
            id,
            owner: self.owner,
            kind: self.kind,
            content: self.content,
            created_at: self.created_at,
            moderation: self.moderation,
            status: self.status,
            summary: self.summary,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Post {
    pub id: PostId,
    pub owner: SessionId,
    pub kind: ContentKind,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub moderation: ModerationReport,
    pub status: PostStatus,
    pub summary: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: SessionId,
    pub is_banned: bool,
}

/// Newest first; equal timestamps put the later insertion (higher id) first.
pub fn newest_first(a: &Post, b: &Post) -> std::cmp::Ordering {
    b.created_at
        .cmp(&a.created_at)
        .then_with(|| b.id.cmp(&a.id))
}
