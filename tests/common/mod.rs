#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use blogdesk::models::*;
use blogdesk::repo::inmem::InMemRepo;
use blogdesk::repo::{ArticleRepo, ContactRepo, ProfileRepo, RepoError, RepoResult};
use blogdesk::storage::{ObjectStore, ObjectStoreError};

pub const CDN: &str = "https://cdn.test/blog-assets";

// ---------------- In-memory mock ObjectStore (tests only) ----------------
#[derive(Default)]
pub struct MockObjectStore {
    pub uploads: Mutex<Vec<(String, String)>>, // (path, content type)
    pub deletes: Mutex<Vec<String>>,
    pub fail_uploads: AtomicBool,
    pub fail_deletes: AtomicBool,
}

impl MockObjectStore {
    pub fn upload_count(&self) -> usize { self.uploads.lock().unwrap().len() }
    pub fn deleted(&self) -> Vec<String> { self.deletes.lock().unwrap().clone() }
    pub fn calls(&self) -> usize { self.upload_count() + self.deleted().len() }
}

#[async_trait]
impl ObjectStore for MockObjectStore {
    async fn upload(&self, path: &str, content_type: &str, _bytes: &[u8]) -> Result<String, ObjectStoreError> {
        if self.fail_uploads.load(Ordering::SeqCst) {
            return Err(ObjectStoreError::Other("upload refused".into()));
        }
        self.uploads.lock().unwrap().push((path.to_string(), content_type.to_string()));
        Ok(format!("{CDN}/{path}"))
    }
    async fn delete(&self, reference: &str) -> Result<(), ObjectStoreError> {
        self.deletes.lock().unwrap().push(reference.to_string());
        if self.fail_deletes.load(Ordering::SeqCst) {
            return Err(ObjectStoreError::Other("delete refused".into()));
        }
        Ok(())
    }
}

// ---------------- Repository wrapper counting every call ----------------
#[derive(Default)]
pub struct CountingRepo {
    pub inner: InMemRepo,
    calls: AtomicUsize,
    /// Article create/update/delete fail with `RepoError::Internal` while set.
    pub fail_writes: AtomicBool,
}

impl CountingRepo {
    pub fn calls(&self) -> usize { self.calls.load(Ordering::SeqCst) }
    pub fn reset(&self) { self.calls.store(0, Ordering::SeqCst) }
    fn hit(&self) { self.calls.fetch_add(1, Ordering::SeqCst); }
    fn write(&self) -> RepoResult<()> {
        self.hit();
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(RepoError::Internal("write refused".into()));
        }
        Ok(())
    }
}

#[async_trait]
impl ArticleRepo for CountingRepo {
    async fn list_articles_by_author(&self, author_id: &str, limit: Option<usize>) -> RepoResult<Vec<Article>> {
        self.hit();
        self.inner.list_articles_by_author(author_id, limit).await
    }
    async fn get_article(&self, id: &str) -> RepoResult<Article> {
        self.hit();
        self.inner.get_article(id).await
    }
    async fn create_article(&self, new: NewArticle) -> RepoResult<Article> {
        self.write()?;
        self.inner.create_article(new).await
    }
    async fn update_article(&self, id: &str, upd: ArticleUpdate) -> RepoResult<Article> {
        self.write()?;
        self.inner.update_article(id, upd).await
    }
    async fn delete_article(&self, id: &str) -> RepoResult<()> {
        self.write()?;
        self.inner.delete_article(id).await
    }
}

#[async_trait]
impl ContactRepo for CountingRepo {
    async fn create_contact(&self, new: NewContact) -> RepoResult<ContactTicket> {
        self.hit();
        self.inner.create_contact(new).await
    }
    async fn list_contacts(&self) -> RepoResult<Vec<ContactTicket>> {
        self.hit();
        self.inner.list_contacts().await
    }
    async fn set_contact_status(&self, id: &str, status: TicketStatus) -> RepoResult<ContactTicket> {
        self.hit();
        self.inner.set_contact_status(id, status).await
    }
    async fn reply_contact(&self, id: &str, reply: &str) -> RepoResult<ContactTicket> {
        self.hit();
        self.inner.reply_contact(id, reply).await
    }
    async fn delete_contact(&self, id: &str) -> RepoResult<()> {
        self.hit();
        self.inner.delete_contact(id).await
    }
}

#[async_trait]
impl ProfileRepo for CountingRepo {
    async fn get_profile(&self, uid: &str) -> RepoResult<Option<UserProfile>> {
        self.hit();
        self.inner.get_profile(uid).await
    }
    async fn upsert_profile(&self, profile: UserProfile) -> RepoResult<UserProfile> {
        self.hit();
        self.inner.upsert_profile(profile).await
    }
}

pub fn identity(uid: &str) -> Identity {
    Identity { email: Some(format!("{uid}@example.com")), uid: uid.to_string() }
}

/// Smallest byte prefix `infer` recognises as PNG.
pub fn png() -> Vec<u8> {
    vec![0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, 0, 0, 0, 0x0D, b'I', b'H', b'D', b'R']
}

pub fn new_article(author: &str, title: &str, image_url: Option<String>) -> NewArticle {
    NewArticle {
        title: title.into(),
        content: format!("{title} body"),
        summary: None,
        image_url,
        author_id: author.into(),
        author_name: format!("{author}@example.com"),
        status: ArticleStatus::Published,
        tags: vec![],
        category: None,
    }
}
