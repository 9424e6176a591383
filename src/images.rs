//! Image replace/clear policy shared by articles and profiles.
//!
//! A save turns the user's image choice into an ordered list of asset steps.
//! Uploads abort the save when they fail; deletions of the previous object are
//! best-effort and only produce a warning notice.

use chrono::{DateTime, Utc};
use log::warn;

use crate::error::FieldErrors;
use crate::models::Notice;
use crate::storage::{asset_path, sniff_image, ObjectStore, ObjectStoreError, IMAGE_SIZE_LIMIT};

#[derive(Debug, Clone)]
pub struct ImageUpload {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

/// What the user did with the image control before saving.
#[derive(Debug, Clone, Default)]
pub enum ImageChange {
    #[default]
    Keep,
    Replace(ImageUpload),
    /// Existing image removed and no new file chosen.
    Clear,
}

impl ImageChange {
    pub fn validate(&self, field: &str, errors: &mut FieldErrors) {
        if let ImageChange::Replace(upload) = self {
            if upload.bytes.is_empty() {
                errors.add(field, "The selected file is empty.");
            } else if upload.bytes.len() > IMAGE_SIZE_LIMIT {
                errors.add(field, "Images must be 10 MB or smaller.");
            } else if sniff_image(&upload.bytes).is_none() {
                errors.add(field, "Only PNG, JPEG, GIF and WebP images are supported.");
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepPolicy {
    AbortOnFailure,
    ContinueOnFailure,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AssetStep {
    Upload { path: String, content_type: &'static str, bytes: Vec<u8> },
    Delete { reference: String },
}

impl AssetStep {
    pub fn policy(&self) -> StepPolicy {
        match self {
            AssetStep::Upload { .. } => StepPolicy::AbortOnFailure,
            AssetStep::Delete { .. } => StepPolicy::ContinueOnFailure,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Target {
    Unchanged,
    Uploaded,
    Cleared,
}

#[derive(Debug)]
pub struct AssetPlan {
    pub steps: Vec<AssetStep>,
    target: Target,
}

#[derive(Debug, Default)]
pub struct AssetOutcome {
    /// `None`: leave the stored reference alone. `Some(None)`: store an empty reference.
    pub image_url: Option<Option<String>>,
    pub notices: Vec<Notice>,
}

impl AssetOutcome {
    pub fn uploaded_url(&self) -> Option<&str> {
        match &self.image_url {
            Some(Some(url)) => Some(url),
            _ => None,
        }
    }
}

impl AssetPlan {
    /// `prior` is the reference currently stored on the document (edit mode only).
    pub fn build(change: ImageChange, prior: Option<&str>, namespace: &str, now: DateTime<Utc>) -> Self {
        let prior = prior.filter(|p| !p.is_empty());
        match change {
            ImageChange::Keep => Self { steps: Vec::new(), target: Target::Unchanged },
            ImageChange::Replace(upload) => {
                let content_type = sniff_image(&upload.bytes).unwrap_or("application/octet-stream");
                let path = asset_path(namespace, &upload.file_name, now);
                let mut steps = vec![AssetStep::Upload { path, content_type, bytes: upload.bytes }];
                if let Some(p) = prior {
                    steps.push(AssetStep::Delete { reference: p.to_string() });
                }
                Self { steps, target: Target::Uploaded }
            }
            ImageChange::Clear => {
                let steps = prior
                    .map(|p| vec![AssetStep::Delete { reference: p.to_string() }])
                    .unwrap_or_default();
                Self { steps, target: Target::Cleared }
            }
        }
    }

    /// Best-effort removal of one stored object.
    pub fn cleanup(reference: Option<&str>) -> Self {
        let steps = reference
            .filter(|r| !r.is_empty())
            .map(|r| vec![AssetStep::Delete { reference: r.to_string() }])
            .unwrap_or_default();
        Self { steps, target: Target::Unchanged }
    }

    /// Runs the steps in order; `warning` is the notice text for a failed deletion.
    pub async fn run<S: ObjectStore + ?Sized>(self, store: &S, warning: &str) -> Result<AssetOutcome, ObjectStoreError> {
        let mut uploaded: Option<String> = None;
        let mut notices = Vec::new();
        for step in self.steps {
            let policy = step.policy();
            let result = match step {
                AssetStep::Upload { path, content_type, bytes } => {
                    store.upload(&path, content_type, &bytes).await.map(Some)
                }
                AssetStep::Delete { reference } => store.delete(&reference).await.map(|_| None).map_err(|e| {
                    warn!("failed to delete stored image '{reference}': {e}");
                    e
                }),
            };
            match (result, policy) {
                (Ok(Some(url)), _) => uploaded = Some(url),
                (Ok(None), _) => {}
                (Err(e), StepPolicy::AbortOnFailure) => return Err(e),
                (Err(_), StepPolicy::ContinueOnFailure) => notices.push(Notice::warning(warning)),
            }
        }
        let image_url = match self.target {
            Target::Unchanged => None,
            Target::Uploaded => Some(uploaded),
            Target::Cleared => Some(None),
        };
        Ok(AssetOutcome { image_url, notices })
    }
}
