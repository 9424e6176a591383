use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

// Document ids are opaque strings assigned by the store
pub type DocId = String;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ToSchema, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "article_status", rename_all = "lowercase")]
pub enum ArticleStatus {
    Draft,
    #[default]
    Published,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, sqlx::FromRow)]
pub struct Article {
    pub id: DocId,
    pub title: String,
    pub content: String,
    pub summary: Option<String>,
    pub image_url: Option<String>,
    pub author_id: String, // fixed at creation; decides who may edit/delete
    pub author_name: String,
    pub status: ArticleStatus,
    pub tags: Vec<String>,
    pub category: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub view_count: i64,
}

impl Article {
    pub fn is_authored_by(&self, uid: &str) -> bool {
        self.author_id == uid
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct NewArticle {
    pub title: String,
    pub content: String,
    pub summary: Option<String>,
    pub image_url: Option<String>,
    pub author_id: String,
    pub author_name: String,
    pub status: ArticleStatus,
    pub tags: Vec<String>,
    pub category: Option<String>,
}

/// Partial merge applied by `update_article`; `None` leaves a field untouched.
/// On the optional fields `Some(None)` clears the stored value.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ArticleUpdate {
    pub title: Option<String>,
    pub content: Option<String>,
    pub summary: Option<Option<String>>,
    pub image_url: Option<Option<String>>,
    pub status: Option<ArticleStatus>,
    pub tags: Option<Vec<String>>,
    pub category: Option<Option<String>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema, sqlx::FromRow)]
pub struct UserProfile {
    pub uid: String,
    pub nickname: String,
    pub introduction: String,
    pub avatar_url: Option<String>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl UserProfile {
    /// Shown before the first save; nothing is written until then.
    pub fn empty(uid: &str) -> Self {
        Self {
            uid: uid.to_string(),
            nickname: String::new(),
            introduction: String::new(),
            avatar_url: None,
            updated_at: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "ticket_status", rename_all = "lowercase")]
pub enum TicketStatus {
    New,
    Read,
    Replied,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, sqlx::FromRow)]
pub struct ContactTicket {
    pub id: DocId,
    pub name: String,
    pub email: String,
    pub message: String,
    pub user_id: Option<String>,
    pub user_email: Option<String>,
    pub status: TicketStatus,
    pub reply: Option<String>,
    pub created_at: DateTime<Utc>,
    pub replied_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct NewContact {
    pub name: String,
    pub email: String,
    pub message: String,
    pub user_id: Option<String>,
    pub user_email: Option<String>,
}

/// Authenticated identity as reported by the identity provider. Also the
/// exact shape of the local session cache.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Identity {
    pub email: Option<String>,
    pub uid: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Success,
    Warning,
    Error,
}

/// Transient notification shown after an action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Notice {
    pub severity: Severity,
    pub message: String,
}

impl Notice {
    pub fn success(message: impl Into<String>) -> Self {
        Self { severity: Severity::Success, message: message.into() }
    }
    pub fn warning(message: impl Into<String>) -> Self {
        Self { severity: Severity::Warning, message: message.into() }
    }
}
