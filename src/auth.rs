use actix_web::{dev::Payload, web, FromRequest, HttpRequest};
use std::future::{ready, Ready};

use crate::error::ApiError;
use crate::models::Identity;
use crate::routes::AppState;

/// Extractor yielding the signed-in identity of the desk session.
/// Handlers taking `CurrentUser` are only reachable while signed in;
/// `Option<CurrentUser>` serves pages open to everyone.
pub struct CurrentUser(pub Identity);

impl FromRequest for CurrentUser {
    type Error = ApiError;
    type Future = Ready<Result<Self, ApiError>>;

    fn from_request(req: &HttpRequest, _pl: &mut Payload) -> Self::Future {
        let Some(state) = req.app_data::<web::Data<AppState>>() else {
            log::error!("AppState missing from app data");
            return ready(Err(ApiError::Internal));
        };
        match state.session.current() {
            Some(identity) => ready(Ok(CurrentUser(identity))),
            None => ready(Err(ApiError::Unauthorized)),
        }
    }
}
