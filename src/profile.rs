use chrono::Utc;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::error::FieldErrors;
use crate::images::{AssetPlan, ImageChange};
use crate::models::{Identity, Notice, UserProfile};
use crate::repo::{ProfileRepo, RepoError};
use crate::storage::{profile_images, ObjectStore, ObjectStoreError};

const NICKNAME_MAX_CHARS: usize = 50;

#[derive(Debug, thiserror::Error)]
pub enum ProfileError {
    #[error("validation failed")]
    Invalid(FieldErrors),
    #[error("image upload failed: {0}")]
    Upload(ObjectStoreError),
    #[error(transparent)]
    Repo(#[from] RepoError),
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct ProfileForm {
    #[serde(default)]
    pub nickname: String,
    #[serde(default)]
    pub introduction: String,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ProfileOutcome {
    pub profile: UserProfile,
    pub notices: Vec<Notice>,
}

/// Stored profile, or an empty one when the user never saved.
pub async fn load_profile<R: ProfileRepo + ?Sized>(repo: &R, uid: &str) -> Result<UserProfile, ProfileError> {
    Ok(repo.get_profile(uid).await?.unwrap_or_else(|| UserProfile::empty(uid)))
}

pub async fn save_profile<R, S>(
    repo: &R,
    assets: &S,
    identity: &Identity,
    form: ProfileForm,
    image: ImageChange,
) -> Result<ProfileOutcome, ProfileError>
where
    R: ProfileRepo + ?Sized,
    S: ObjectStore + ?Sized,
{
    let mut errors = FieldErrors::new();
    if form.nickname.chars().count() > NICKNAME_MAX_CHARS {
        errors.add("nickname", "Nickname must be 50 characters or fewer.");
    }
    image.validate("avatar", &mut errors);
    errors.into_result().map_err(ProfileError::Invalid)?;

    let existing = load_profile(repo, &identity.uid).await?;
    let plan = AssetPlan::build(image, existing.avatar_url.as_deref(), &profile_images(&identity.uid), Utc::now());
    let done = plan
        .run(assets, "Failed to delete the previous profile image.")
        .await
        .map_err(ProfileError::Upload)?;

    let avatar_url = match done.image_url {
        Some(next) => next,
        None => existing.avatar_url,
    };
    let profile = repo
        .upsert_profile(UserProfile {
            uid: identity.uid.clone(),
            nickname: form.nickname.trim().to_string(),
            introduction: form.introduction.trim().to_string(),
            avatar_url,
            updated_at: existing.updated_at,
        })
        .await?;
    let mut notices = done.notices;
    notices.push(Notice::success("Profile saved."));
    Ok(ProfileOutcome { profile, notices })
}
