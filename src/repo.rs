use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use chrono::Utc;

use crate::models::*;

#[derive(thiserror::Error, Debug)]
pub enum RepoError {
    #[error("not found")] NotFound,
    #[error("conflict")] Conflict,
    #[error("internal: {0}")] Internal(String),
}

pub type RepoResult<T> = Result<T, RepoError>;

use async_trait::async_trait;

#[async_trait]
pub trait ArticleRepo: Send + Sync {
    /// Articles owned by `author_id`, newest first, optionally capped at `limit` rows.
    async fn list_articles_by_author(&self, author_id: &str, limit: Option<usize>) -> RepoResult<Vec<Article>>;
    async fn get_article(&self, id: &str) -> RepoResult<Article>;
    async fn create_article(&self, new: NewArticle) -> RepoResult<Article>;
    async fn update_article(&self, id: &str, upd: ArticleUpdate) -> RepoResult<Article>;
    async fn delete_article(&self, id: &str) -> RepoResult<()>;
}

#[async_trait]
pub trait ContactRepo: Send + Sync {
    async fn create_contact(&self, new: NewContact) -> RepoResult<ContactTicket>;
    async fn list_contacts(&self) -> RepoResult<Vec<ContactTicket>>;
    async fn set_contact_status(&self, id: &str, status: TicketStatus) -> RepoResult<ContactTicket>;
    async fn reply_contact(&self, id: &str, reply: &str) -> RepoResult<ContactTicket>;
    async fn delete_contact(&self, id: &str) -> RepoResult<()>;
}

#[async_trait]
pub trait ProfileRepo: Send + Sync {
    async fn get_profile(&self, uid: &str) -> RepoResult<Option<UserProfile>>;
    /// Create-or-merge; the document appears on first save.
    async fn upsert_profile(&self, profile: UserProfile) -> RepoResult<UserProfile>;
}

pub trait Repo: ArticleRepo + ContactRepo + ProfileRepo {}

impl<T> Repo for T where T: ArticleRepo + ContactRepo + ProfileRepo {}

fn new_doc_id() -> DocId {
    uuid::Uuid::new_v4().simple().to_string()
}

/// Row cap as bound to a SQL `LIMIT`; sizes beyond `i64` saturate.
#[cfg(any(feature = "postgres-store", test))]
fn sql_limit(limit: Option<usize>) -> Option<i64> {
    limit.map(|n| i64::try_from(n).unwrap_or(i64::MAX))
}

#[cfg(feature = "inmem-store")]
pub mod inmem {
    use super::*;
    use serde::{Serialize, Deserialize};
    use std::path::{PathBuf, Path};

    const SNAPSHOT_FILE: &str = "documents.json";

    #[derive(Default, Serialize, Deserialize)]
    struct State {
        articles: HashMap<DocId, Article>,
        contacts: HashMap<DocId, ContactTicket>,
        profiles: HashMap<String, UserProfile>,
    }

    #[derive(Clone)]
    pub struct InMemRepo {
        state: Arc<RwLock<State>>,
        snapshot_path: Option<Arc<PathBuf>>,
    }

    impl InMemRepo {
        fn lock_err<E>(_: E) -> RepoError {
            RepoError::Internal("document state lock poisoned".into())
        }

        fn load_state_from(path: &Path) -> State {
            match std::fs::read(path) {
                Ok(bytes) => match serde_json::from_slice::<State>(&bytes) {
                    Ok(s) => {
                        log::info!("loaded document snapshot '{}'", path.display());
                        s
                    }
                    Err(e) => {
                        log::warn!("failed to parse snapshot '{}': {e}; starting empty", path.display());
                        State::default()
                    }
                },
                Err(e) => {
                    log::info!("no snapshot at '{}' ({e}); starting empty", path.display());
                    State::default()
                }
            }
        }

        fn persist(&self) {
            let Some(path) = self.snapshot_path.as_ref() else { return };
            let bytes = match self.state.read() {
                Ok(s) => serde_json::to_vec_pretty(&*s),
                Err(_) => return,
            };
            if let Ok(bytes) = bytes {
                if let Some(dir) = path.parent() {
                    let _ = std::fs::create_dir_all(dir);
                }
                if let Err(e) = std::fs::write(path.as_ref(), bytes) {
                    log::error!("failed to write snapshot '{}': {e}", path.display());
                }
            }
        }

        /// Snapshot-backed store living under `data_dir`.
        pub fn open(data_dir: &Path) -> Self {
            let path = data_dir.join(SNAPSHOT_FILE);
            let state = Self::load_state_from(&path);
            Self {
                state: Arc::new(RwLock::new(state)),
                snapshot_path: Some(Arc::new(path)),
            }
        }

        /// Purely in-memory; nothing touches disk.
        pub fn new() -> Self {
            Self { state: Arc::new(RwLock::new(State::default())), snapshot_path: None }
        }
    }

    impl Default for InMemRepo {
        fn default() -> Self { Self::new() }
    }

    #[async_trait]
    impl ArticleRepo for InMemRepo {
        async fn list_articles_by_author(&self, author_id: &str, limit: Option<usize>) -> RepoResult<Vec<Article>> {
            let s = self.state.read().map_err(Self::lock_err)?;
            let mut v: Vec<_> = s.articles.values()
                .filter(|a| a.author_id == author_id)
                .cloned()
                .collect();
            // HashMap order is arbitrary; the id breaks timestamp ties
            v.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| a.id.cmp(&b.id)));
            if let Some(n) = limit { v.truncate(n); }
            Ok(v)
        }
        async fn get_article(&self, id: &str) -> RepoResult<Article> {
            let s = self.state.read().map_err(Self::lock_err)?;
            s.articles.get(id).cloned().ok_or(RepoError::NotFound)
        }
        async fn create_article(&self, new: NewArticle) -> RepoResult<Article> {
            let mut s = self.state.write().map_err(Self::lock_err)?;
            let now = Utc::now();
            let article = Article {
                id: new_doc_id(),
                title: new.title,
                content: new.content,
                summary: new.summary,
                image_url: new.image_url,
                author_id: new.author_id,
                author_name: new.author_name,
                status: new.status,
                tags: new.tags,
                category: new.category,
                created_at: now,
                updated_at: now,
                view_count: 0,
            };
            s.articles.insert(article.id.clone(), article.clone());
            drop(s);                       // release lock before persisting
            self.persist();
            Ok(article)
        }
        async fn update_article(&self, id: &str, upd: ArticleUpdate) -> RepoResult<Article> {
            let mut s = self.state.write().map_err(Self::lock_err)?;
            let article = s.articles.get_mut(id).ok_or(RepoError::NotFound)?;
            if let Some(title) = upd.title { article.title = title; }
            if let Some(content) = upd.content { article.content = content; }
            if let Some(summary) = upd.summary { article.summary = summary; }
            if let Some(image_url) = upd.image_url { article.image_url = image_url; }
            if let Some(status) = upd.status { article.status = status; }
            if let Some(tags) = upd.tags { article.tags = tags; }
            if let Some(category) = upd.category { article.category = category; }
            article.updated_at = Utc::now();
            let updated = article.clone();
            drop(s);
            self.persist();
            Ok(updated)
        }
        async fn delete_article(&self, id: &str) -> RepoResult<()> {
            let mut s = self.state.write().map_err(Self::lock_err)?;
            s.articles.remove(id).ok_or(RepoError::NotFound)?;
            drop(s);
            self.persist();
            Ok(())
        }
    }

    #[async_trait]
    impl ContactRepo for InMemRepo {
        async fn create_contact(&self, new: NewContact) -> RepoResult<ContactTicket> {
            let mut s = self.state.write().map_err(Self::lock_err)?;
            let ticket = ContactTicket {
                id: new_doc_id(),
                name: new.name,
                email: new.email,
                message: new.message,
                user_id: new.user_id,
                user_email: new.user_email,
                status: TicketStatus::New,
                reply: None,
                created_at: Utc::now(),
                replied_at: None,
            };
            s.contacts.insert(ticket.id.clone(), ticket.clone());
            drop(s);
            self.persist();
            Ok(ticket)
        }
        async fn list_contacts(&self) -> RepoResult<Vec<ContactTicket>> {
            let s = self.state.read().map_err(Self::lock_err)?;
            let mut v: Vec<_> = s.contacts.values().cloned().collect();
            v.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| a.id.cmp(&b.id)));
            Ok(v)
        }
        async fn set_contact_status(&self, id: &str, status: TicketStatus) -> RepoResult<ContactTicket> {
            let mut s = self.state.write().map_err(Self::lock_err)?;
            let ticket = s.contacts.get_mut(id).ok_or(RepoError::NotFound)?;
            ticket.status = status;
            let updated = ticket.clone();
            drop(s);
            self.persist();
            Ok(updated)
        }
        async fn reply_contact(&self, id: &str, reply: &str) -> RepoResult<ContactTicket> {
            let mut s = self.state.write().map_err(Self::lock_err)?;
            let ticket = s.contacts.get_mut(id).ok_or(RepoError::NotFound)?;
            ticket.reply = Some(reply.to_string());
            ticket.replied_at = Some(Utc::now());
            ticket.status = TicketStatus::Replied;
            let updated = ticket.clone();
            drop(s);
            self.persist();
            Ok(updated)
        }
        async fn delete_contact(&self, id: &str) -> RepoResult<()> {
            let mut s = self.state.write().map_err(Self::lock_err)?;
            s.contacts.remove(id).ok_or(RepoError::NotFound)?;
            drop(s);
            self.persist();
            Ok(())
        }
    }

    #[async_trait]
    impl ProfileRepo for InMemRepo {
        async fn get_profile(&self, uid: &str) -> RepoResult<Option<UserProfile>> {
            let s = self.state.read().map_err(Self::lock_err)?;
            Ok(s.profiles.get(uid).cloned())
        }
        async fn upsert_profile(&self, profile: UserProfile) -> RepoResult<UserProfile> {
            let mut s = self.state.write().map_err(Self::lock_err)?;
            let stored = UserProfile { updated_at: Some(Utc::now()), ..profile };
            s.profiles.insert(stored.uid.clone(), stored.clone());
            drop(s);
            self.persist();
            Ok(stored)
        }
    }
}

// Postgres implementation (feature = "postgres-store"); schema lives in migrations/
#[cfg(feature = "postgres-store")]
pub mod pg {
    use super::*;
    use sqlx::{Pool, Postgres};

    const ARTICLE_COLUMNS: &str = "id, title, content, summary, image_url, author_id, author_name, status, tags, category, created_at, updated_at, view_count";
    const CONTACT_COLUMNS: &str = "id, name, email, message, user_id, user_email, status, reply, created_at, replied_at";

    fn db_err(e: sqlx::Error) -> RepoError {
        match e {
            sqlx::Error::RowNotFound => RepoError::NotFound,
            sqlx::Error::Database(db) if db.is_unique_violation() => RepoError::Conflict,
            other => RepoError::Internal(other.to_string()),
        }
    }

    #[derive(Clone)]
    pub struct PgRepo { pool: Pool<Postgres> }

    impl PgRepo {
        pub fn new(pool: Pool<Postgres>) -> Self { Self { pool } }

        pub async fn migrate(&self) -> anyhow::Result<()> {
            sqlx::migrate!("./migrations").run(&self.pool).await?;
            Ok(())
        }
    }

    #[async_trait]
    impl ArticleRepo for PgRepo {
        async fn list_articles_by_author(&self, author_id: &str, limit: Option<usize>) -> RepoResult<Vec<Article>> {
            let sql = format!(
                "SELECT {ARTICLE_COLUMNS} FROM articles WHERE author_id = $1 ORDER BY created_at DESC, id LIMIT $2"
            );
            // LIMIT NULL means no limit in Postgres
            let recs = sqlx::query_as::<_, Article>(&sql)
                .bind(author_id)
                .bind(sql_limit(limit))
                .fetch_all(&self.pool).await.map_err(db_err)?;
            Ok(recs)
        }
        async fn get_article(&self, id: &str) -> RepoResult<Article> {
            let sql = format!("SELECT {ARTICLE_COLUMNS} FROM articles WHERE id = $1");
            sqlx::query_as::<_, Article>(&sql)
                .bind(id)
                .fetch_one(&self.pool).await.map_err(db_err)
        }
        async fn create_article(&self, new: NewArticle) -> RepoResult<Article> {
            let sql = format!(
                "INSERT INTO articles (id, title, content, summary, image_url, author_id, author_name, status, tags, category)
                 VALUES ($1,$2,$3,$4,$5,$6,$7,$8,$9,$10) RETURNING {ARTICLE_COLUMNS}"
            );
            sqlx::query_as::<_, Article>(&sql)
                .bind(new_doc_id())
                .bind(&new.title)
                .bind(&new.content)
                .bind(&new.summary)
                .bind(&new.image_url)
                .bind(&new.author_id)
                .bind(&new.author_name)
                .bind(new.status)
                .bind(&new.tags)
                .bind(&new.category)
                .fetch_one(&self.pool).await.map_err(db_err)
        }
        async fn update_article(&self, id: &str, upd: ArticleUpdate) -> RepoResult<Article> {
            // (set?, value) pairs for the clearable columns
            fn clearable(field: Option<Option<String>>) -> (bool, Option<String>) {
                match field {
                    Some(v) => (true, v),
                    None => (false, None),
                }
            }
            let (set_summary, summary) = clearable(upd.summary);
            let (set_image, image_url) = clearable(upd.image_url);
            let (set_category, category) = clearable(upd.category);
            let sql = format!(
                "UPDATE articles SET
                    title = COALESCE($2, title),
                    content = COALESCE($3, content),
                    summary = CASE WHEN $4 THEN $5 ELSE summary END,
                    image_url = CASE WHEN $6 THEN $7 ELSE image_url END,
                    status = COALESCE($8, status),
                    tags = COALESCE($9, tags),
                    category = CASE WHEN $10 THEN $11 ELSE category END,
                    updated_at = now()
                 WHERE id = $1 RETURNING {ARTICLE_COLUMNS}"
            );
            sqlx::query_as::<_, Article>(&sql)
                .bind(id)
                .bind(upd.title)
                .bind(upd.content)
                .bind(set_summary)
                .bind(summary)
                .bind(set_image)
                .bind(image_url)
                .bind(upd.status)
                .bind(upd.tags)
                .bind(set_category)
                .bind(category)
                .fetch_one(&self.pool).await.map_err(db_err)
        }
        async fn delete_article(&self, id: &str) -> RepoResult<()> {
            let res = sqlx::query("DELETE FROM articles WHERE id = $1")
                .bind(id)
                .execute(&self.pool).await.map_err(db_err)?;
            if res.rows_affected() == 0 { return Err(RepoError::NotFound); }
            Ok(())
        }
    }

    #[async_trait]
    impl ContactRepo for PgRepo {
        async fn create_contact(&self, new: NewContact) -> RepoResult<ContactTicket> {
            let sql = format!(
                "INSERT INTO contacts (id, name, email, message, user_id, user_email, status)
                 VALUES ($1,$2,$3,$4,$5,$6,'new') RETURNING {CONTACT_COLUMNS}"
            );
            sqlx::query_as::<_, ContactTicket>(&sql)
                .bind(new_doc_id())
                .bind(&new.name)
                .bind(&new.email)
                .bind(&new.message)
                .bind(&new.user_id)
                .bind(&new.user_email)
                .fetch_one(&self.pool).await.map_err(db_err)
        }
        async fn list_contacts(&self) -> RepoResult<Vec<ContactTicket>> {
            let sql = format!("SELECT {CONTACT_COLUMNS} FROM contacts ORDER BY created_at DESC, id");
            sqlx::query_as::<_, ContactTicket>(&sql)
                .fetch_all(&self.pool).await.map_err(db_err)
        }
        async fn set_contact_status(&self, id: &str, status: TicketStatus) -> RepoResult<ContactTicket> {
            let sql = format!("UPDATE contacts SET status = $2 WHERE id = $1 RETURNING {CONTACT_COLUMNS}");
            sqlx::query_as::<_, ContactTicket>(&sql)
                .bind(id)
                .bind(status)
                .fetch_one(&self.pool).await.map_err(db_err)
        }
        async fn reply_contact(&self, id: &str, reply: &str) -> RepoResult<ContactTicket> {
            let sql = format!(
                "UPDATE contacts SET reply = $2, replied_at = now(), status = 'replied' WHERE id = $1 RETURNING {CONTACT_COLUMNS}"
            );
            sqlx::query_as::<_, ContactTicket>(&sql)
                .bind(id)
                .bind(reply)
                .fetch_one(&self.pool).await.map_err(db_err)
        }
        async fn delete_contact(&self, id: &str) -> RepoResult<()> {
            let res = sqlx::query("DELETE FROM contacts WHERE id = $1")
                .bind(id)
                .execute(&self.pool).await.map_err(db_err)?;
            if res.rows_affected() == 0 { return Err(RepoError::NotFound); }
            Ok(())
        }
    }

    #[async_trait]
    impl ProfileRepo for PgRepo {
        async fn get_profile(&self, uid: &str) -> RepoResult<Option<UserProfile>> {
            sqlx::query_as::<_, UserProfile>(
                "SELECT uid, nickname, introduction, avatar_url, updated_at FROM user_profiles WHERE uid = $1"
            )
                .bind(uid)
                .fetch_optional(&self.pool).await.map_err(db_err)
        }
        async fn upsert_profile(&self, profile: UserProfile) -> RepoResult<UserProfile> {
            sqlx::query_as::<_, UserProfile>(r#"
                INSERT INTO user_profiles (uid, nickname, introduction, avatar_url, updated_at)
                VALUES ($1,$2,$3,$4, now())
                ON CONFLICT (uid) DO UPDATE SET
                    nickname = EXCLUDED.nickname,
                    introduction = EXCLUDED.introduction,
                    avatar_url = EXCLUDED.avatar_url,
                    updated_at = now()
                RETURNING uid, nickname, introduction, avatar_url, updated_at
            "#)
                .bind(&profile.uid)
                .bind(&profile.nickname)
                .bind(&profile.introduction)
                .bind(&profile.avatar_url)
                .fetch_one(&self.pool).await.map_err(db_err)
        }
    }
}
