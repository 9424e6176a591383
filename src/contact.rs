use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::error::FieldErrors;
use crate::models::{ContactTicket, Identity, NewContact, TicketStatus};
use crate::repo::{ContactRepo, RepoError};

const MESSAGE_MIN_CHARS: usize = 10;

#[derive(Debug, thiserror::Error)]
pub enum ContactError {
    #[error("validation failed")]
    Invalid(FieldErrors),
    #[error(transparent)]
    Repo(#[from] RepoError),
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct ContactForm {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub message: String,
}

/// Same acceptance as `\S+@\S+\.\S+` searched anywhere in the input.
pub fn is_plausible_email(input: &str) -> bool {
    let chars: Vec<char> = input.chars().collect();
    chars.iter().enumerate().any(|(at, c)| {
        if *c != '@' || at == 0 || chars[at - 1].is_whitespace() {
            return false;
        }
        let domain: Vec<char> = chars[at + 1..].iter().copied().take_while(|c| !c.is_whitespace()).collect();
        domain
            .iter()
            .enumerate()
            .any(|(i, c)| *c == '.' && i >= 1 && i + 1 < domain.len())
    })
}

impl ContactForm {
    pub fn validate(&self) -> Result<(), FieldErrors> {
        let mut errors = FieldErrors::new();
        if self.name.trim().is_empty() {
            errors.add("name", "Please enter your name.");
        }
        if self.email.trim().is_empty() {
            errors.add("email", "Please enter your email address.");
        } else if !is_plausible_email(&self.email) {
            errors.add("email", "Please enter a valid email address.");
        }
        if self.message.trim().is_empty() {
            errors.add("message", "Please enter a message.");
        } else if self.message.chars().count() < MESSAGE_MIN_CHARS {
            errors.add("message", "Messages must be at least 10 characters.");
        }
        errors.into_result()
    }
}

/// Persists a ticket with status `new`, linked to `identity` when signed in.
pub async fn submit_contact<R: ContactRepo + ?Sized>(
    repo: &R,
    identity: Option<&Identity>,
    form: ContactForm,
) -> Result<ContactTicket, ContactError> {
    form.validate().map_err(ContactError::Invalid)?;
    let ticket = repo
        .create_contact(NewContact {
            name: form.name.trim().to_string(),
            email: form.email.trim().to_string(),
            message: form.message.trim().to_string(),
            user_id: identity.map(|i| i.uid.clone()),
            user_email: identity.and_then(|i| i.email.clone()),
        })
        .await?;
    tracing::info!(ticket = %ticket.id, linked = ticket.user_id.is_some(), "contact ticket created");
    Ok(ticket)
}

// ---------------- admin triage ----------------

pub async fn list_tickets<R: ContactRepo + ?Sized>(repo: &R) -> Result<Vec<ContactTicket>, ContactError> {
    Ok(repo.list_contacts().await?)
}

/// Any transition is accepted; the admin view normally walks new → read → replied.
pub async fn set_ticket_status<R: ContactRepo + ?Sized>(
    repo: &R,
    id: &str,
    status: TicketStatus,
) -> Result<ContactTicket, ContactError> {
    Ok(repo.set_contact_status(id, status).await?)
}

pub async fn reply_to_ticket<R: ContactRepo + ?Sized>(
    repo: &R,
    id: &str,
    reply: &str,
) -> Result<ContactTicket, ContactError> {
    let reply = reply.trim();
    if reply.is_empty() {
        let mut errors = FieldErrors::new();
        errors.add("reply", "Please enter a reply.");
        return Err(ContactError::Invalid(errors));
    }
    Ok(repo.reply_contact(id, reply).await?)
}

pub async fn delete_ticket<R: ContactRepo + ?Sized>(repo: &R, id: &str) -> Result<(), ContactError> {
    Ok(repo.delete_contact(id).await?)
}
