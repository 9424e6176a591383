use std::collections::HashMap;
use std::sync::Arc;

use actix_multipart::Multipart;
use actix_web::{web, HttpResponse};
use futures_util::TryStreamExt as _;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::auth::CurrentUser;
use crate::authoring::{self, ArticleForm, DeleteOutcome, EditorState, SubmitOutcome};
use crate::browse::{self, ArticleQuery, RECENT_LIMIT};
use crate::contact::{self, ContactForm};
use crate::error::{ApiError, FieldErrors};
use crate::identity::{user_message, AuthAction, AuthError, AuthErrorKind, IdentityProvider};
use crate::images::{ImageChange, ImageUpload};
use crate::models::*;
use crate::profile::{self, ProfileForm, ProfileOutcome};
use crate::rate_limit::{RateLimiter, Throttled};
use crate::repo::Repo;
use crate::session::{SessionCache, SessionState, SessionStore};
use crate::storage::{ObjectStore, IMAGE_SIZE_LIMIT};

const PASSWORD_MIN_CHARS: usize = 6;

pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api/v1")
            .service(web::resource("/auth/register").route(web::post().to(register)))
            .service(web::resource("/auth/login").route(web::post().to(login)))
            .service(web::resource("/auth/logout").route(web::post().to(logout)))
            .service(web::resource("/auth/session").route(web::get().to(session)))
            .service(web::resource("/auth/password-reset").route(web::post().to(request_password_reset)))
            .service(web::resource("/auth/password-reset/confirm").route(web::post().to(confirm_password_reset)))
            .service(
                web::resource("/articles")
                    .route(web::get().to(list_articles))
                    .route(web::post().to(create_article)),
            )
            // fixed segments must precede `/articles/{id}`
            .service(web::resource("/articles/recent").route(web::get().to(recent_articles)))
            .service(web::resource("/articles/new").route(web::get().to(new_article)))
            .service(
                web::resource("/articles/{id}")
                    .route(web::get().to(get_article))
                    .route(web::put().to(update_article))
                    .route(web::delete().to(delete_article)),
            )
            .service(web::resource("/articles/{id}/edit").route(web::get().to(edit_article)))
            .service(
                web::resource("/profile")
                    .route(web::get().to(get_profile))
                    .route(web::put().to(update_profile)),
            )
            .service(web::resource("/contacts").route(web::post().to(create_contact)))
            .service(web::resource("/admin/contacts").route(web::get().to(list_contacts)))
            .service(web::resource("/admin/contacts/{id}").route(web::delete().to(delete_contact)))
            .service(web::resource("/admin/contacts/{id}/status").route(web::patch().to(set_contact_status)))
            .service(web::resource("/admin/contacts/{id}/reply").route(web::post().to(reply_contact)))
            .default_service(web::route().to(not_found)),
    );
}

#[derive(Clone)]
pub struct AppState {
    pub repo: Arc<dyn Repo>,
    pub assets: Arc<dyn ObjectStore>,
    pub identity: Arc<dyn IdentityProvider>,
    pub session: SessionStore,
    pub cache: SessionCache,
    pub rate_limiter: Option<RateLimiter>,
    /// Continue URL embedded in password reset emails.
    pub reset_continue_url: Option<String>,
}

pub async fn not_found() -> Result<HttpResponse, ApiError> {
    Err(ApiError::NotFound)
}

// ---------------- auth ----------------

#[derive(Debug, Deserialize, ToSchema)]
pub struct Credentials {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct RegisterRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub confirm_password: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct PasswordResetRequest {
    #[serde(default)]
    pub email: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct NewPasswordRequest {
    #[serde(default)]
    pub new_password: String,
    #[serde(default)]
    pub confirm_password: String,
}

#[derive(Debug, Deserialize)]
pub struct ResetCodeQuery {
    #[serde(default, rename = "oobCode")]
    pub oob_code: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct NoticeResponse {
    pub notices: Vec<Notice>,
}

fn establish(data: &AppState, identity: Identity) -> SessionState {
    data.cache.store(&identity);
    data.session.sign_in_success(identity);
    data.session.snapshot()
}

/// Records a failed sign-in/sign-up on the session and maps it for the form.
fn sign_in_failed(data: &AppState, action: AuthAction, err: AuthError) -> ApiError {
    let message = user_message(action, &err);
    log::warn!("{action:?} failed: {err}");
    data.session.sign_in_failure(message.clone());
    ApiError::auth(&err, message)
}

fn throttled(action: AuthAction) -> ApiError {
    let err = AuthError::new(AuthErrorKind::TooManyRequests, "local request limit reached");
    let message = user_message(action, &err);
    ApiError::auth(&err, message)
}

#[utoipa::path(
    post,
    path = "/api/v1/auth/register",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "Account created and signed in", body = SessionState),
        (status = 401, description = "Provider rejected the account"),
        (status = 422, description = "Validation failed")
    )
)]
pub async fn register(data: web::Data<AppState>, payload: web::Json<RegisterRequest>) -> Result<HttpResponse, ApiError> {
    let req = payload.into_inner();
    let mut errors = FieldErrors::new();
    if req.email.trim().is_empty() {
        errors.add("email", "Please enter your email address.");
    }
    if req.password.is_empty() {
        errors.add("password", "Please enter a password.");
    }
    if req.password != req.confirm_password {
        errors.add("confirm_password", "Passwords do not match.");
    }
    errors.into_result()?;

    data.session.sign_in_start();
    match data.identity.sign_up(req.email.trim(), &req.password).await {
        Ok(identity) => {
            tracing::info!(uid = %identity.uid, "account registered");
            Ok(HttpResponse::Created().json(establish(&data, identity)))
        }
        Err(e) => Err(sign_in_failed(&data, AuthAction::SignUp, e)),
    }
}

#[utoipa::path(
    post,
    path = "/api/v1/auth/login",
    request_body = Credentials,
    responses(
        (status = 200, description = "Signed in", body = SessionState),
        (status = 401, description = "Sign-in failed"),
        (status = 429, description = "Too many attempts")
    )
)]
pub async fn login(data: web::Data<AppState>, payload: web::Json<Credentials>) -> Result<HttpResponse, ApiError> {
    let req = payload.into_inner();
    let mut errors = FieldErrors::new();
    if req.email.trim().is_empty() {
        errors.add("email", "Please enter your email address.");
    }
    if req.password.is_empty() {
        errors.add("password", "Please enter your password.");
    }
    errors.into_result()?;

    if let Some(rl) = &data.rate_limiter {
        if !rl.allow(Throttled::SignIn, &req.email) {
            return Err(sign_in_failed(
                &data,
                AuthAction::SignIn,
                AuthError::new(AuthErrorKind::TooManyRequests, "local sign-in limit reached"),
            ));
        }
    }

    data.session.sign_in_start();
    match data.identity.sign_in(req.email.trim(), &req.password).await {
        Ok(identity) => Ok(HttpResponse::Ok().json(establish(&data, identity))),
        Err(e) => Err(sign_in_failed(&data, AuthAction::SignIn, e)),
    }
}

#[utoipa::path(
    post,
    path = "/api/v1/auth/logout",
    responses((status = 200, description = "Signed out", body = SessionState))
)]
pub async fn logout(data: web::Data<AppState>) -> Result<HttpResponse, ApiError> {
    if let Err(e) = data.identity.sign_out().await {
        log::error!("sign-out failed: {e}");
        return Err(ApiError::Auth { kind: e.kind, message: "Sign-out failed.".into() });
    }
    data.cache.clear();
    data.session.sign_out();
    Ok(HttpResponse::Ok().json(data.session.snapshot()))
}

#[utoipa::path(
    get,
    path = "/api/v1/auth/session",
    responses((status = 200, description = "Current session", body = SessionState))
)]
pub async fn session(data: web::Data<AppState>) -> Result<HttpResponse, ApiError> {
    Ok(HttpResponse::Ok().json(data.session.snapshot()))
}

#[utoipa::path(
    post,
    path = "/api/v1/auth/password-reset",
    request_body = PasswordResetRequest,
    responses(
        (status = 200, description = "Reset email sent", body = NoticeResponse),
        (status = 401, description = "Provider rejected the request"),
        (status = 422, description = "Validation failed")
    )
)]
pub async fn request_password_reset(
    data: web::Data<AppState>,
    payload: web::Json<PasswordResetRequest>,
) -> Result<HttpResponse, ApiError> {
    let email = payload.into_inner().email;
    let email = email.trim();
    if email.is_empty() {
        let mut errors = FieldErrors::new();
        errors.add("email", "Please enter your email address.");
        return Err(errors.into());
    }
    if let Some(rl) = &data.rate_limiter {
        if !rl.allow(Throttled::PasswordReset, email) {
            return Err(throttled(AuthAction::SendPasswordReset));
        }
    }
    data.identity
        .send_password_reset(email, data.reset_continue_url.as_deref())
        .await
        .map_err(|e| {
            log::warn!("password reset email failed: {e}");
            ApiError::auth(&e, user_message(AuthAction::SendPasswordReset, &e))
        })?;
    Ok(HttpResponse::Ok().json(NoticeResponse {
        notices: vec![Notice::success("A password reset email has been sent. Please check your inbox.")],
    }))
}

#[utoipa::path(
    post,
    path = "/api/v1/auth/password-reset/confirm",
    params(("oobCode" = Option<String>, Query, description = "Code from the reset email link")),
    request_body = NewPasswordRequest,
    responses(
        (status = 200, description = "Password changed", body = NoticeResponse),
        (status = 401, description = "Expired or invalid link"),
        (status = 422, description = "Validation failed")
    )
)]
pub async fn confirm_password_reset(
    data: web::Data<AppState>,
    query: web::Query<ResetCodeQuery>,
    payload: web::Json<NewPasswordRequest>,
) -> Result<HttpResponse, ApiError> {
    let Some(code) = query.into_inner().oob_code.filter(|c| !c.is_empty()) else {
        let err = AuthError::new(AuthErrorKind::InvalidActionCode, "missing oobCode");
        return Err(ApiError::auth(&err, user_message(AuthAction::ConfirmPasswordReset, &err)));
    };
    let req = payload.into_inner();
    let mut errors = FieldErrors::new();
    if req.new_password.is_empty() {
        errors.add("new_password", "Please enter a new password.");
    } else if req.new_password.chars().count() < PASSWORD_MIN_CHARS {
        errors.add("new_password", "Password must be at least 6 characters.");
    }
    if req.new_password != req.confirm_password {
        errors.add("confirm_password", "Passwords do not match.");
    }
    errors.into_result()?;

    data.identity
        .confirm_password_reset(&code, &req.new_password)
        .await
        .map_err(|e| {
            log::warn!("password reset confirmation failed: {e}");
            ApiError::auth(&e, user_message(AuthAction::ConfirmPasswordReset, &e))
        })?;
    Ok(HttpResponse::Ok().json(NoticeResponse {
        notices: vec![Notice::success("Your password has been changed. Please sign in with your new password.")],
    }))
}

// ---------------- multipart forms ----------------

#[derive(Default)]
struct FormParts {
    text: HashMap<String, String>,
    file: Option<ImageUpload>,
}

impl FormParts {
    fn text(&self, name: &str) -> String {
        self.text.get(name).cloned().unwrap_or_default()
    }

    fn optional(&self, name: &str) -> Option<String> {
        self.text.get(name).map(|v| v.trim()).filter(|v| !v.is_empty()).map(str::to_string)
    }

    fn flag(&self, name: &str) -> bool {
        self.text
            .get(name)
            .map(|v| matches!(v.trim().to_ascii_lowercase().as_str(), "1" | "true" | "on" | "yes"))
            .unwrap_or(false)
    }

    /// A chosen file wins over the clear flag.
    fn image_change(&mut self, clear_field: &str) -> ImageChange {
        let clear = self.flag(clear_field);
        match self.file.take() {
            Some(upload) => ImageChange::Replace(upload),
            None if clear => ImageChange::Clear,
            None => ImageChange::Keep,
        }
    }
}

async fn read_form(mut payload: Multipart, file_field: &str) -> Result<FormParts, ApiError> {
    let mut parts = FormParts::default();
    while let Some(mut field) = payload.try_next().await.map_err(|e| {
        log::error!("multipart error: {e}");
        ApiError::BadRequest("malformed multipart body".into())
    })? {
        let disposition = field.content_disposition();
        let Some(name) = disposition.get_name().map(str::to_string) else { continue; };
        let file_name = disposition.get_filename().map(str::to_string).unwrap_or_default();

        let mut buf: Vec<u8> = Vec::new();
        while let Some(chunk) = field.try_next().await.map_err(|e| {
            log::error!("stream read error: {e}");
            ApiError::BadRequest("malformed multipart body".into())
        })? {
            // past the limit the rest is drained; validation reports the size
            if buf.len() <= IMAGE_SIZE_LIMIT {
                buf.extend_from_slice(&chunk);
            }
        }

        if name == file_field {
            // browsers send an empty part when no file was chosen
            if buf.is_empty() && file_name.is_empty() {
                continue;
            }
            let file_name = if file_name.is_empty() { "image".to_string() } else { file_name };
            parts.file = Some(ImageUpload { file_name, bytes: buf });
        } else {
            let value = String::from_utf8(buf)
                .map_err(|_| ApiError::BadRequest(format!("field '{name}' is not valid UTF-8")))?;
            parts.text.insert(name, value);
        }
    }
    Ok(parts)
}

fn split_tags(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}

fn article_form(parts: &FormParts) -> Result<ArticleForm, ApiError> {
    let status = match parts.text("status").trim() {
        "" => None,
        "draft" => Some(ArticleStatus::Draft),
        "published" => Some(ArticleStatus::Published),
        other => {
            let mut errors = FieldErrors::new();
            errors.add("status", format!("Unknown status '{other}'."));
            return Err(errors.into());
        }
    };
    Ok(ArticleForm {
        title: parts.text("title"),
        content: parts.text("content"),
        summary: parts.optional("summary"),
        status,
        tags: split_tags(&parts.text("tags")),
        category: parts.optional("category"),
    })
}

// ---------------- articles ----------------

#[derive(Debug, Serialize, ToSchema)]
pub struct ArticleListResponse {
    pub articles: Vec<Article>,
    /// Filter options, `all` first.
    pub categories: Vec<String>,
    /// Articles fetched before filtering.
    pub total: usize,
}

#[derive(Debug, Deserialize)]
pub struct RecentQuery {
    pub limit: Option<usize>,
}

#[utoipa::path(
    get,
    path = "/api/v1/articles",
    params(
        ("q" = Option<String>, Query, description = "Case-insensitive match on title or content"),
        ("category" = Option<String>, Query, description = "Exact category, `all` for none"),
        ("sort" = Option<String>, Query, description = "newest | oldest | title")
    ),
    responses(
        (status = 200, description = "Own articles, filtered", body = ArticleListResponse),
        (status = 401, description = "Sign-in required")
    )
)]
pub async fn list_articles(
    user: CurrentUser,
    data: web::Data<AppState>,
    query: web::Query<ArticleQuery>,
) -> Result<HttpResponse, ApiError> {
    let fetched = data.repo.list_articles_by_author(&user.0.uid, None).await?;
    let articles = query.apply(&fetched);
    Ok(HttpResponse::Ok().json(ArticleListResponse {
        categories: browse::categories(&fetched),
        total: fetched.len(),
        articles,
    }))
}

#[utoipa::path(
    get,
    path = "/api/v1/articles/recent",
    params(("limit" = Option<usize>, Query, description = "Row limit, default 3")),
    responses((status = 200, description = "Newest own articles", body = [Article]))
)]
pub async fn recent_articles(
    user: CurrentUser,
    data: web::Data<AppState>,
    query: web::Query<RecentQuery>,
) -> Result<HttpResponse, ApiError> {
    let limit = query.limit.unwrap_or(RECENT_LIMIT);
    let articles = data.repo.list_articles_by_author(&user.0.uid, Some(limit)).await?;
    Ok(HttpResponse::Ok().json(articles))
}

#[utoipa::path(
    get,
    path = "/api/v1/articles/{id}",
    params(("id" = String, Path, description = "Article id")),
    responses(
        (status = 200, description = "Article", body = Article),
        (status = 404, description = "Article not found")
    )
)]
pub async fn get_article(
    _user: CurrentUser,
    data: web::Data<AppState>,
    path: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    let article = data.repo.get_article(&path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(article))
}

#[utoipa::path(
    get,
    path = "/api/v1/articles/new",
    responses((status = 200, description = "Blank editor", body = EditorState))
)]
pub async fn new_article(user: CurrentUser, data: web::Data<AppState>) -> Result<HttpResponse, ApiError> {
    let editor = authoring::load_editor(data.repo.as_ref(), None, Some(&user.0)).await?;
    Ok(HttpResponse::Ok().json(editor))
}

#[utoipa::path(
    get,
    path = "/api/v1/articles/{id}/edit",
    params(("id" = String, Path, description = "Article id")),
    responses(
        (status = 200, description = "Editor loaded with the article", body = EditorState),
        (status = 403, description = "Not the author"),
        (status = 404, description = "Article not found")
    )
)]
pub async fn edit_article(
    user: CurrentUser,
    data: web::Data<AppState>,
    path: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    let id = path.into_inner();
    let editor = authoring::load_editor(data.repo.as_ref(), Some(&id), Some(&user.0)).await?;
    Ok(HttpResponse::Ok().json(editor))
}

#[utoipa::path(
    post,
    path = "/api/v1/articles",
    responses(
        (status = 201, description = "Article published", body = SubmitOutcome),
        (status = 422, description = "Validation failed"),
        (status = 500, description = "Upload or write failed")
    )
)]
pub async fn create_article(
    user: CurrentUser,
    data: web::Data<AppState>,
    payload: Multipart,
) -> Result<HttpResponse, ApiError> {
    let mut parts = read_form(payload, "image").await?;
    let form = article_form(&parts)?;
    let image = parts.image_change("clear_image");
    let outcome = authoring::submit_article(data.repo.as_ref(), data.assets.as_ref(), Some(&user.0), None, form, image).await?;
    Ok(HttpResponse::Created().json(outcome))
}

#[utoipa::path(
    put,
    path = "/api/v1/articles/{id}",
    params(("id" = String, Path, description = "Article id")),
    responses(
        (status = 200, description = "Article updated", body = SubmitOutcome),
        (status = 403, description = "Not the author"),
        (status = 404, description = "Article not found"),
        (status = 422, description = "Validation failed")
    )
)]
pub async fn update_article(
    user: CurrentUser,
    data: web::Data<AppState>,
    path: web::Path<String>,
    payload: Multipart,
) -> Result<HttpResponse, ApiError> {
    let id = path.into_inner();
    let mut parts = read_form(payload, "image").await?;
    let form = article_form(&parts)?;
    let image = parts.image_change("clear_image");
    let outcome =
        authoring::submit_article(data.repo.as_ref(), data.assets.as_ref(), Some(&user.0), Some(&id), form, image).await?;
    Ok(HttpResponse::Ok().json(outcome))
}

#[utoipa::path(
    delete,
    path = "/api/v1/articles/{id}",
    params(("id" = String, Path, description = "Article id")),
    responses(
        (status = 200, description = "Article deleted", body = DeleteOutcome),
        (status = 403, description = "Not the author"),
        (status = 404, description = "Article not found")
    )
)]
pub async fn delete_article(
    user: CurrentUser,
    data: web::Data<AppState>,
    path: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    let id = path.into_inner();
    let outcome = authoring::delete_article(data.repo.as_ref(), data.assets.as_ref(), Some(&user.0), &id).await?;
    Ok(HttpResponse::Ok().json(outcome))
}

// ---------------- profile ----------------

#[utoipa::path(
    get,
    path = "/api/v1/profile",
    responses((status = 200, description = "Own profile (empty before first save)", body = UserProfile))
)]
pub async fn get_profile(user: CurrentUser, data: web::Data<AppState>) -> Result<HttpResponse, ApiError> {
    let profile = profile::load_profile(data.repo.as_ref(), &user.0.uid).await?;
    Ok(HttpResponse::Ok().json(profile))
}

#[utoipa::path(
    put,
    path = "/api/v1/profile",
    responses(
        (status = 200, description = "Profile saved", body = ProfileOutcome),
        (status = 422, description = "Validation failed")
    )
)]
pub async fn update_profile(
    user: CurrentUser,
    data: web::Data<AppState>,
    payload: Multipart,
) -> Result<HttpResponse, ApiError> {
    let mut parts = read_form(payload, "avatar").await?;
    let form = ProfileForm { nickname: parts.text("nickname"), introduction: parts.text("introduction") };
    let image = parts.image_change("clear_avatar");
    let outcome = profile::save_profile(data.repo.as_ref(), data.assets.as_ref(), &user.0, form, image).await?;
    Ok(HttpResponse::Ok().json(outcome))
}

// ---------------- contact ----------------

#[derive(Debug, Serialize, ToSchema)]
pub struct ContactReceipt {
    pub ticket: ContactTicket,
    pub notices: Vec<Notice>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct StatusUpdate {
    pub status: TicketStatus,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct ReplyRequest {
    #[serde(default)]
    pub reply: String,
}

#[utoipa::path(
    post,
    path = "/api/v1/contacts",
    request_body = ContactForm,
    responses(
        (status = 201, description = "Message received", body = ContactReceipt),
        (status = 422, description = "Validation failed"),
        (status = 429, description = "Too many messages")
    )
)]
pub async fn create_contact(
    user: Option<CurrentUser>,
    data: web::Data<AppState>,
    payload: web::Json<ContactForm>,
) -> Result<HttpResponse, ApiError> {
    let form = payload.into_inner();
    let identity = user.map(|u| u.0);
    // rejected forms do not count against the sender's quota
    form.validate().map_err(contact::ContactError::Invalid)?;
    if let Some(rl) = &data.rate_limiter {
        let sender = identity.as_ref().map_or(form.email.as_str(), |i| i.uid.as_str());
        if !rl.allow(Throttled::Contact, sender) {
            return Err(ApiError::RateLimited);
        }
    }
    let ticket = contact::submit_contact(data.repo.as_ref(), identity.as_ref(), form).await?;
    Ok(HttpResponse::Created().json(ContactReceipt {
        ticket,
        notices: vec![Notice::success("Your message has been sent.")],
    }))
}

#[utoipa::path(
    get,
    path = "/api/v1/admin/contacts",
    responses((status = 200, description = "Tickets, newest first", body = [ContactTicket]))
)]
pub async fn list_contacts(_user: CurrentUser, data: web::Data<AppState>) -> Result<HttpResponse, ApiError> {
    let tickets = contact::list_tickets(data.repo.as_ref()).await?;
    Ok(HttpResponse::Ok().json(tickets))
}

#[utoipa::path(
    patch,
    path = "/api/v1/admin/contacts/{id}/status",
    params(("id" = String, Path, description = "Ticket id")),
    request_body = StatusUpdate,
    responses(
        (status = 200, description = "Status changed", body = ContactTicket),
        (status = 404, description = "Ticket not found")
    )
)]
pub async fn set_contact_status(
    _user: CurrentUser,
    data: web::Data<AppState>,
    path: web::Path<String>,
    payload: web::Json<StatusUpdate>,
) -> Result<HttpResponse, ApiError> {
    let ticket = contact::set_ticket_status(data.repo.as_ref(), &path.into_inner(), payload.status).await?;
    Ok(HttpResponse::Ok().json(ticket))
}

#[utoipa::path(
    post,
    path = "/api/v1/admin/contacts/{id}/reply",
    params(("id" = String, Path, description = "Ticket id")),
    request_body = ReplyRequest,
    responses(
        (status = 200, description = "Reply stored", body = ContactTicket),
        (status = 404, description = "Ticket not found"),
        (status = 422, description = "Empty reply")
    )
)]
pub async fn reply_contact(
    _user: CurrentUser,
    data: web::Data<AppState>,
    path: web::Path<String>,
    payload: web::Json<ReplyRequest>,
) -> Result<HttpResponse, ApiError> {
    let ticket = contact::reply_to_ticket(data.repo.as_ref(), &path.into_inner(), &payload.reply).await?;
    Ok(HttpResponse::Ok().json(ticket))
}

#[utoipa::path(
    delete,
    path = "/api/v1/admin/contacts/{id}",
    params(("id" = String, Path, description = "Ticket id")),
    responses(
        (status = 204, description = "Ticket deleted"),
        (status = 404, description = "Ticket not found")
    )
)]
pub async fn delete_contact(
    _user: CurrentUser,
    data: web::Data<AppState>,
    path: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    contact::delete_ticket(data.repo.as_ref(), &path.into_inner()).await?;
    Ok(HttpResponse::NoContent().finish())
}
