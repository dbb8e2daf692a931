use crate::core::moderation::{ContentKind, ModeratorDashboard, Post, User};

/// Longest text preview shown for a post.
const PREVIEW_CHARS: usize = 80;

pub fn format_post(post: &Post) -> String {
    let preview = match post.kind {
        ContentKind::Text => {
            let mut preview: String = post.content.chars().take(PREVIEW_CHARS).collect();
            if post.content.chars().count() > PREVIEW_CHARS {
                preview.push_str("...");
            }
            format!("\"{}\"", preview)
        }
        ContentKind::Image => format!("[image, {} base64 chars]", post.content.len()),
    };

    let mut line = format!(
        "#{} [{}] {} {} by {}",
        post.id,
        post.status,
        post.created_at.format("%Y-%m-%d %H:%M:%S"),
        preview,
        post.owner
    );
    if let Some(summary) = &post.summary {
        line.push_str(&format!(" ({})", summary));
    }
    line
}

pub fn format_posts(posts: &[Post]) -> String {
    if posts.is_empty() {
        return "No posts.".to_string();
    }
    posts.iter().map(format_post).collect::<Vec<_>>().join("\n")
}

pub fn format_user(user: &User) -> String {
    let state = if user.is_banned { "banned" } else { "active" };
    format!("{} ({})", user.id, state)
}

pub fn format_users(users: &[User]) -> String {
    if users.is_empty() {
        return "No users.".to_string();
    }
    users.iter().map(format_user).collect::<Vec<_>>().join("\n")
}

pub fn format_dashboard(dashboard: &ModeratorDashboard) -> String {
    format!(
        "Review queue ({}):\n{}\n\nUsers ({}):\n{}",
        dashboard.review_posts.len(),
        format_posts(&dashboard.review_posts),
        dashboard.users.len(),
        format_users(&dashboard.users)
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::moderation::{
        ModerationReport, ModerationResult, PostId, PostStatus, SessionId,
    };
    use chrono::{TimeZone, Utc};

    fn post(kind: ContentKind, content: &str) -> Post {
        Post {
            id: PostId(4),
            owner: SessionId::new("abc"),
            kind,
            content: content.to_string(),
            created_at: Utc.with_ymd_and_hms(2025, 3, 1, 12, 30, 0).unwrap(),
            moderation: ModerationReport {
                action: None,
                result: ModerationResult {
                    is_harmful: false,
                    confidence: 1.0,
                    label: None,
                    text_analysis: None,
                },
                summary: None,
            },
            status: PostStatus::HumanReview,
            summary: Some("needs a look".to_string()),
        }
    }

    #[test]
    fn test_text_post_line() {
        assert_eq!(
            format_post(&post(ContentKind::Text, "hi there")),
            "#4 [human_review] 2025-03-01 12:30:00 \"hi there\" by abc (needs a look)"
        );
    }

    #[test]
    fn test_long_text_is_truncated_and_images_summarized() {
        let long = "x".repeat(200);
        let line = format_post(&post(ContentKind::Text, &long));
        assert!(line.contains(&format!("\"{}...\"", "x".repeat(PREVIEW_CHARS))));

        let line = format_post(&post(ContentKind::Image, "aGVsbG8="));
        assert!(line.contains("[image, 8 base64 chars]"));
    }

    #[test]
    fn test_empty_lists() {
        assert_eq!(format_posts(&[]), "No posts.");
        assert_eq!(format_users(&[]), "No users.");
    }
}
