use chrono::Utc;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::error::FieldErrors;
use crate::images::{AssetPlan, ImageChange};
use crate::models::*;
use crate::repo::{ArticleRepo, RepoError};
use crate::storage::{ObjectStore, ObjectStoreError, FEATURED_IMAGES};

const REPLACED_IMAGE_WARNING: &str =
    "Failed to delete the old image. An unused file may remain in storage.";
const DELETED_ARTICLE_IMAGE_WARNING: &str =
    "Failed to delete the cover image. The file may remain in storage.";

#[derive(Debug, thiserror::Error)]
pub enum AuthoringError {
    #[error("validation failed")]
    Invalid(FieldErrors),
    #[error("sign-in required")]
    Unauthenticated,
    #[error("you are not allowed to change this article")]
    NotAuthor,
    #[error("article not found")]
    NotFound,
    #[error("image upload failed: {0}")]
    Upload(ObjectStoreError),
    #[error("document write failed: {0}")]
    Repo(RepoError),
}

impl From<RepoError> for AuthoringError {
    fn from(e: RepoError) -> Self {
        match e {
            RepoError::NotFound => AuthoringError::NotFound,
            other => AuthoringError::Repo(other),
        }
    }
}

/// Editable article fields.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct ArticleForm {
    pub title: String,
    pub content: String,
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default)]
    pub status: Option<ArticleStatus>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub category: Option<String>,
}

impl ArticleForm {
    pub fn from_article(a: &Article) -> Self {
        Self {
            title: a.title.clone(),
            content: a.content.clone(),
            summary: a.summary.clone(),
            status: Some(a.status),
            tags: a.tags.clone(),
            category: a.category.clone(),
        }
    }

    pub fn validate(&self, errors: &mut FieldErrors) {
        if self.title.trim().is_empty() {
            errors.add("title", "Title is required.");
        }
        if self.content.trim().is_empty() {
            errors.add("content", "Content is required.");
        }
    }
}

/// What the editor shows: blank in create mode, the stored article in edit mode.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct EditorState {
    pub article_id: Option<DocId>,
    pub form: ArticleForm,
    pub image_url: Option<String>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct SubmitOutcome {
    pub article: Article,
    pub notices: Vec<Notice>,
    pub redirect: String,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct DeleteOutcome {
    pub notices: Vec<Notice>,
    pub redirect: String,
}

/// Fetches `id` and checks that `uid` wrote it.
async fn owned_article<R: ArticleRepo + ?Sized>(repo: &R, id: &str, uid: &str) -> Result<Article, AuthoringError> {
    let article = repo.get_article(id).await?;
    if !article.is_authored_by(uid) {
        tracing::warn!(article = %id, uid = %uid, "rejected change by non-author");
        return Err(AuthoringError::NotAuthor);
    }
    Ok(article)
}

pub async fn load_editor<R: ArticleRepo + ?Sized>(
    repo: &R,
    article_id: Option<&str>,
    identity: Option<&Identity>,
) -> Result<EditorState, AuthoringError> {
    let Some(id) = article_id else {
        return Ok(EditorState { article_id: None, form: ArticleForm::default(), image_url: None });
    };
    let identity = identity.ok_or(AuthoringError::Unauthenticated)?;
    let article = owned_article(repo, id, &identity.uid).await?;
    Ok(EditorState {
        article_id: Some(article.id.clone()),
        form: ArticleForm::from_article(&article),
        image_url: article.image_url.clone(),
    })
}

/// Saves the editor. `article_id` selects edit mode.
pub async fn submit_article<R, S>(
    repo: &R,
    assets: &S,
    identity: Option<&Identity>,
    article_id: Option<&str>,
    form: ArticleForm,
    image: ImageChange,
) -> Result<SubmitOutcome, AuthoringError>
where
    R: ArticleRepo + ?Sized,
    S: ObjectStore + ?Sized,
{
    let mut errors = FieldErrors::new();
    form.validate(&mut errors);
    image.validate("image", &mut errors);
    errors.into_result().map_err(AuthoringError::Invalid)?;

    let identity = identity.ok_or(AuthoringError::Unauthenticated)?;

    let prior_image = match article_id {
        Some(id) => owned_article(repo, id, &identity.uid).await?.image_url,
        None => None,
    };

    let plan = AssetPlan::build(image, prior_image.as_deref(), FEATURED_IMAGES, Utc::now());
    let assets_done = plan
        .run(assets, REPLACED_IMAGE_WARNING)
        .await
        .map_err(AuthoringError::Upload)?;
    let uploaded = assets_done.uploaded_url().map(str::to_string);
    let mut notices = assets_done.notices;

    let written = match article_id {
        Some(id) => {
            let upd = ArticleUpdate {
                title: Some(form.title),
                content: Some(form.content),
                summary: Some(form.summary),
                image_url: assets_done.image_url,
                status: form.status,
                tags: Some(form.tags),
                category: Some(form.category),
            };
            repo.update_article(id, upd).await
        }
        None => {
            let new = NewArticle {
                title: form.title,
                content: form.content,
                summary: form.summary,
                image_url: assets_done.image_url.flatten(),
                author_id: identity.uid.clone(),
                author_name: identity.email.clone().unwrap_or_default(),
                status: form.status.unwrap_or_default(),
                tags: form.tags,
                category: form.category,
            };
            repo.create_article(new).await
        }
    };
    let article = written.map_err(|e| {
        if let Some(url) = &uploaded {
            // no compensation: the new object stays in storage
            tracing::warn!(image = %url, "document write failed after upload; image orphaned");
        }
        AuthoringError::Repo(e)
    })?;

    let (message, redirect) = match article_id {
        Some(_) => ("Article updated.", format!("/articles/{}", article.id)),
        None => ("Article published.", "/articles".to_string()),
    };
    tracing::info!(article = %article.id, uid = %identity.uid, "article saved");
    notices.push(Notice::success(message));
    Ok(SubmitOutcome { article, notices, redirect })
}

/// Deletes an article and, best-effort, its cover image.
pub async fn delete_article<R, S>(
    repo: &R,
    assets: &S,
    identity: Option<&Identity>,
    article_id: &str,
) -> Result<DeleteOutcome, AuthoringError>
where
    R: ArticleRepo + ?Sized,
    S: ObjectStore + ?Sized,
{
    let identity = identity.ok_or(AuthoringError::Unauthenticated)?;
    let article = owned_article(repo, article_id, &identity.uid).await?;

    let cleanup = AssetPlan::cleanup(article.image_url.as_deref())
        .run(assets, DELETED_ARTICLE_IMAGE_WARNING)
        .await
        .map_err(AuthoringError::Upload)?;
    let mut notices = cleanup.notices;

    repo.delete_article(article_id).await.map_err(AuthoringError::Repo)?;
    tracing::info!(article = %article_id, "article deleted");
    notices.push(Notice::success("Article deleted."));
    Ok(DeleteOutcome { notices, redirect: "/articles".into() })
}
