// SQLite-backed moderation store for optional durable storage.
//
// Tables:
// - moderation_users: session id + ban flag
// - moderation_posts: posts with their moderation report as JSON
//
// Post ids come from AUTOINCREMENT, so they are never reused even after a
// restart. Timestamps are stored as microseconds since the epoch so that
// ORDER BY sorts them correctly.

use crate::core::moderation::{
    ContentKind, ModerationError, ModerationReport, ModerationStore, NewPost, Post, PostId,
    PostStatus, ReviewAction, SessionId, User,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions, SqliteRow};
use sqlx::Row;
use std::path::Path;

const POST_COLUMNS: &str =
    "id, owner, kind, content, created_at_us, moderation, status, summary";

pub struct SqliteModerationStore {
    pool: SqlitePool,
}

fn storage_err(e: impl std::fmt::Display) -> ModerationError {
    ModerationError::StorageError(e.to_string())
}

impl SqliteModerationStore {
    /// Open (creating if needed) the database at `database_path`.
    pub async fn new(database_path: &str) -> anyhow::Result<Self> {
        if let Some(parent) = Path::new(database_path).parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect(&format!("sqlite://{}?mode=rwc", database_path))
            .await?;

        let store = Self { pool };
        store.migrate().await?;
        Ok(store)
    }

    /// Run database migrations to create required tables.
    async fn migrate(&self) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS moderation_users (
                id TEXT PRIMARY KEY,
                is_banned BOOLEAN NOT NULL DEFAULT 0
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS moderation_posts (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                owner TEXT NOT NULL,
                kind TEXT NOT NULL,
                content TEXT NOT NULL,
                created_at_us INTEGER NOT NULL,
                moderation TEXT NOT NULL,
                status TEXT NOT NULL,
                summary TEXT
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_moderation_posts_owner ON moderation_posts(owner, created_at_us)",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_moderation_posts_status ON moderation_posts(status, created_at_us)",
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    fn row_to_post(row: &SqliteRow) -> Result<Post, ModerationError> {
        let kind: String = row.get("kind");
        let status: String = row.get("status");
        let created_at_us: i64 = row.get("created_at_us");
        let moderation: String = row.get("moderation");

        let kind = ContentKind::parse(&kind)
            .ok_or_else(|| storage_err(format!("unknown content kind '{}'", kind)))?;
        let status = PostStatus::parse(&status)
            .ok_or_else(|| storage_err(format!("unknown post status '{}'", status)))?;
        let created_at = DateTime::<Utc>::from_timestamp_micros(created_at_us)
            .ok_or_else(|| storage_err(format!("bad timestamp {}", created_at_us)))?;
        let moderation: ModerationReport =
            serde_json::from_str(&moderation).map_err(storage_err)?;

        Ok(Post {
            id: PostId(row.get::<i64, _>("id") as u64),
            owner: SessionId::new(row.get::<String, _>("owner")),
            kind,
            content: row.get("content"),
            created_at,
            moderation,
            status,
            summary: row.get("summary"),
        })
    }

    fn rows_to_posts(rows: &[SqliteRow]) -> Result<Vec<Post>, ModerationError> {
        rows.iter().map(Self::row_to_post).collect()
    }
}

#[async_trait]
impl ModerationStore for SqliteModerationStore {
    async fn create_user_if_absent(&self, id: &SessionId) -> Result<User, ModerationError> {
        sqlx::query("INSERT INTO moderation_users (id, is_banned) VALUES (?, 0) ON CONFLICT(id) DO NOTHING")
            .bind(id.as_str())
            .execute(&self.pool)
            .await
            .map_err(storage_err)?;

        self.get_user(id).await
    }

    async fn is_banned(&self, id: &SessionId) -> Result<bool, ModerationError> {
        let row = sqlx::query("SELECT is_banned FROM moderation_users WHERE id = ?")
            .bind(id.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(storage_err)?;

        Ok(row.map(|r| r.get::<bool, _>("is_banned")).unwrap_or(false))
    }

    async fn set_banned(&self, id: &SessionId, banned: bool) -> Result<User, ModerationError> {
        let result = sqlx::query("UPDATE moderation_users SET is_banned = ? WHERE id = ?")
            .bind(banned)
            .bind(id.as_str())
            .execute(&self.pool)
            .await
            .map_err(storage_err)?;

        if result.rows_affected() == 0 {
            return Err(ModerationError::NotFound(format!("user {}", id)));
        }

        Ok(User {
            id: id.clone(),
            is_banned: banned,
        })
    }

    async fn get_user(&self, id: &SessionId) -> Result<User, ModerationError> {
        let row = sqlx::query("SELECT is_banned FROM moderation_users WHERE id = ?")
            .bind(id.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(storage_err)?
            .ok_or_else(|| ModerationError::NotFound(format!("user {}", id)))?;

        Ok(User {
            id: id.clone(),
            is_banned: row.get("is_banned"),
        })
    }

    async fn insert_post(&self, post: NewPost) -> Result<Post, ModerationError> {
        let moderation = serde_json::to_string(&post.moderation).map_err(storage_err)?;

        let result = sqlx::query(
            r#"
            INSERT INTO moderation_posts (owner, kind, content, created_at_us, moderation, status, summary)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(post.owner.as_str())
        .bind(post.kind.as_str())
        .bind(&post.content)
        .bind(post.created_at.timestamp_micros())
        .bind(&moderation)
        .bind(post.status.as_str())
        .bind(&post.summary)
        .execute(&self.pool)
        .await
        .map_err(storage_err)?;

        let id = PostId(result.last_insert_rowid() as u64);
        Ok(post.into_post(id))
    }

    async fn get_post(&self, id: PostId) -> Result<Post, ModerationError> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM moderation_posts WHERE id = ?",
            POST_COLUMNS
        ))
        .bind(id.0 as i64)
        .fetch_optional(&self.pool)
        .await
        .map_err(storage_err)?
        .ok_or_else(|| ModerationError::NotFound(format!("post {}", id)))?;

        Self::row_to_post(&row)
    }

    async fn list_posts_for_owner(
        &self,
        owner: &SessionId,
        statuses: &[PostStatus],
    ) -> Result<Vec<Post>, ModerationError> {
        if statuses.is_empty() {
            return Ok(Vec::new());
        }

        let placeholders = vec!["?"; statuses.len()].join(", ");
        let sql = format!(
            "SELECT {} FROM moderation_posts WHERE owner = ? AND status IN ({}) ORDER BY created_at_us DESC, id DESC",
            POST_COLUMNS, placeholders
        );

        let mut query = sqlx::query(&sql).bind(owner.as_str());
        for status in statuses {
            query = query.bind(status.as_str());
        }

        let rows = query.fetch_all(&self.pool).await.map_err(storage_err)?;
        Self::rows_to_posts(&rows)
    }

    async fn list_posts_by_status(&self, status: PostStatus) -> Result<Vec<Post>, ModerationError> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM moderation_posts WHERE status = ? ORDER BY created_at_us DESC, id DESC",
            POST_COLUMNS
        ))
        .bind(status.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(storage_err)?;

        Self::rows_to_posts(&rows)
    }

    async fn apply_moderator_decision(
        &self,
        id: PostId,
        action: ReviewAction,
    ) -> Result<Post, ModerationError> {
        // Single conditional UPDATE: the status check and write cannot interleave.
        let result = sqlx::query("UPDATE moderation_posts SET status = ? WHERE id = ? AND status = ?")
            .bind(action.target_status().as_str())
            .bind(id.0 as i64)
            .bind(PostStatus::HumanReview.as_str())
            .execute(&self.pool)
            .await
            .map_err(storage_err)?;

        let post = self.get_post(id).await?;
        if result.rows_affected() == 0 {
            return Err(ModerationError::InvalidTransition {
                id,
                current: post.status,
            });
        }

        Ok(post)
    }

    async fn list_users(&self) -> Result<Vec<User>, ModerationError> {
        let rows = sqlx::query("SELECT id, is_banned FROM moderation_users ORDER BY id")
            .fetch_all(&self.pool)
            .await
            .map_err(storage_err)?;

        Ok(rows
            .iter()
            .map(|row| User {
                id: SessionId::new(row.get::<String, _>("id")),
                is_banned: row.get("is_banned"),
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::moderation::{ModerationResult, TextAnalysis};
    use chrono::Duration;
    use tempfile::TempDir;

    async fn open_store(dir: &TempDir) -> SqliteModerationStore {
        let path = dir.path().join("moderation.db");
        SqliteModerationStore::new(path.to_str().unwrap())
            .await
            .unwrap()
    }

    fn draft(owner: &str, kind: ContentKind, status: PostStatus, created_at: DateTime<Utc>) -> NewPost {
        NewPost {
            owner: SessionId::new(owner),
            kind,
            content: "aGVsbG8=".to_string(),
            created_at,
            moderation: ModerationReport {
                action: Some("pass".to_string()),
                result: ModerationResult {
                    is_harmful: false,
                    confidence: 12.5,
                    label: Some("POSITIVE".to_string()),
                    text_analysis: Some(TextAnalysis { confidence: 3.0 }),
                },
                summary: Some("ok".to_string()),
            },
            status,
            summary: Some("ok".to_string()),
        }
    }

    #[tokio::test]
    async fn test_posts_survive_reopen() {
        let dir = TempDir::new().unwrap();
        let now = Utc::now();

        let inserted = {
            let store = open_store(&dir).await;
            store
                .insert_post(draft("a", ContentKind::Image, PostStatus::Pass, now))
                .await
                .unwrap()
        };

        let store = open_store(&dir).await;
        let loaded = store.get_post(inserted.id).await.unwrap();
        assert_eq!(loaded.kind, ContentKind::Image);
        assert_eq!(loaded.moderation, inserted.moderation);
        assert_eq!(
            loaded.created_at.timestamp_micros(),
            now.timestamp_micros()
        );

        // Ids keep increasing after a reopen.
        let next = store
            .insert_post(draft("a", ContentKind::Text, PostStatus::Pass, now))
            .await
            .unwrap();
        assert!(next.id > inserted.id);
    }

    #[tokio::test]
    async fn test_users_and_bans() {
        let dir = TempDir::new().unwrap();
        let store = open_store(&dir).await;
        let id = SessionId::new("session-1");

        assert!(matches!(
            store.set_banned(&id, true).await,
            Err(ModerationError::NotFound(_))
        ));

        store.create_user_if_absent(&id).await.unwrap();
        store.set_banned(&id, true).await.unwrap();
        let user = store.create_user_if_absent(&id).await.unwrap();
        assert!(user.is_banned);
        assert!(store.is_banned(&id).await.unwrap());

        assert_eq!(store.list_users().await.unwrap(), vec![user]);
    }

    #[tokio::test]
    async fn test_listing_order_and_filter() {
        let dir = TempDir::new().unwrap();
        let store = open_store(&dir).await;
        let t0 = Utc::now();

        let old = store
            .insert_post(draft("a", ContentKind::Text, PostStatus::Pass, t0))
            .await
            .unwrap();
        let tie_first = store
            .insert_post(draft("a", ContentKind::Text, PostStatus::HumanReview, t0 + Duration::seconds(1)))
            .await
            .unwrap();
        let tie_second = store
            .insert_post(draft("a", ContentKind::Text, PostStatus::Pass, t0 + Duration::seconds(1)))
            .await
            .unwrap();
        store
            .insert_post(draft("a", ContentKind::Text, PostStatus::AutoRemove, t0 + Duration::seconds(2)))
            .await
            .unwrap();

        let posts = store
            .list_posts_for_owner(
                &SessionId::new("a"),
                &[PostStatus::Pass, PostStatus::HumanReview, PostStatus::Approved],
            )
            .await
            .unwrap();
        let ids: Vec<PostId> = posts.iter().map(|p| p.id).collect();
        assert_eq!(ids, vec![tie_second.id, tie_first.id, old.id]);

        let queue = store
            .list_posts_by_status(PostStatus::HumanReview)
            .await
            .unwrap();
        assert_eq!(queue.len(), 1);
        assert_eq!(queue[0].id, tie_first.id);
    }

    #[tokio::test]
    async fn test_moderator_decision() {
        let dir = TempDir::new().unwrap();
        let store = open_store(&dir).await;
        let now = Utc::now();

        let passed = store
            .insert_post(draft("a", ContentKind::Text, PostStatus::Pass, now))
            .await
            .unwrap();
        let flagged = store
            .insert_post(draft("a", ContentKind::Text, PostStatus::HumanReview, now))
            .await
            .unwrap();

        assert!(matches!(
            store
                .apply_moderator_decision(passed.id, ReviewAction::Remove)
                .await,
            Err(ModerationError::InvalidTransition {
                current: PostStatus::Pass,
                ..
            })
        ));
        assert!(matches!(
            store
                .apply_moderator_decision(PostId(999), ReviewAction::Remove)
                .await,
            Err(ModerationError::NotFound(_))
        ));

        let removed = store
            .apply_moderator_decision(flagged.id, ReviewAction::Remove)
            .await
            .unwrap();
        assert_eq!(removed.status, PostStatus::Removed);
    }
}
