use crate::authoring::{ArticleForm, DeleteOutcome, EditorState, SubmitOutcome};
use crate::browse::SortOrder;
use crate::contact::ContactForm;
use crate::models::{Article, ArticleStatus, ContactTicket, Identity, Notice, Severity, TicketStatus, UserProfile};
use crate::profile::{ProfileForm, ProfileOutcome};
use crate::session::SessionState;
use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    paths(
        crate::routes::register,
        crate::routes::login,
        crate::routes::logout,
        crate::routes::session,
        crate::routes::request_password_reset,
        crate::routes::confirm_password_reset,
        crate::routes::list_articles,
        crate::routes::recent_articles,
        crate::routes::get_article,
        crate::routes::new_article,
        crate::routes::edit_article,
        crate::routes::create_article,
        crate::routes::update_article,
        crate::routes::delete_article,
        crate::routes::get_profile,
        crate::routes::update_profile,
        crate::routes::create_contact,
        crate::routes::list_contacts,
        crate::routes::set_contact_status,
        crate::routes::reply_contact,
        crate::routes::delete_contact,
    ),
    components(schemas(
        Article, ArticleStatus, ArticleForm, EditorState, SubmitOutcome, DeleteOutcome,
        SortOrder, UserProfile, ProfileForm, ProfileOutcome,
        ContactTicket, TicketStatus, ContactForm,
        Identity, Notice, Severity, SessionState,
        crate::routes::Credentials, crate::routes::RegisterRequest,
        crate::routes::PasswordResetRequest, crate::routes::NewPasswordRequest,
        crate::routes::NoticeResponse, crate::routes::ArticleListResponse,
        crate::routes::ContactReceipt, crate::routes::StatusUpdate, crate::routes::ReplyRequest
    )),
    tags(
        (name = "auth", description = "Registration, sign-in and password reset"),
        (name = "articles", description = "Own articles"),
        (name = "contacts", description = "Contact messages and admin triage"),
    )
)]
pub struct ApiDoc;
