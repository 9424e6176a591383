use std::rc::Rc;

use actix_web::dev::{Service, ServiceRequest, ServiceResponse, Transform};
use actix_web::http::header::{self, HeaderName, HeaderValue};
use actix_web::Error;
use futures_util::future::{ready, LocalBoxFuture, Ready};

const HSTS: &str = "max-age=63072000; includeSubDomains";

/// Response hardening for the desk API. Cover images and avatars are served
/// straight from the object store, so its origin is allowed in `img-src`.
#[derive(Clone, Default)]
pub struct SecurityHeaders {
    pub enable_hsts: bool,
    pub image_origin: Option<String>,
}

impl SecurityHeaders {
    /// `ENABLE_HSTS=1|true` turns on Strict-Transport-Security.
    pub fn from_env() -> Self {
        let enable_hsts = std::env::var("ENABLE_HSTS")
            .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
            .unwrap_or(false);
        Self { enable_hsts, image_origin: None }
    }

    pub fn with_hsts(self, enable_hsts: bool) -> Self {
        Self { enable_hsts, ..self }
    }

    pub fn with_image_origin(self, origin: impl Into<String>) -> Self {
        Self { image_origin: Some(origin.into()), ..self }
    }

    pub fn content_security_policy(&self) -> String {
        let mut img_src = String::from("'self' data: blob:");
        if let Some(origin) = &self.image_origin {
            img_src.push(' ');
            img_src.push_str(origin);
        }
        format!(
            "default-src 'self'; img-src {img_src}; object-src 'none'; base-uri 'none'; \
             frame-ancestors 'none'; form-action 'self'"
        )
    }

    fn headers(&self) -> Vec<(HeaderName, HeaderValue)> {
        let csp = HeaderValue::from_str(&self.content_security_policy()).unwrap_or_else(|e| {
            log::warn!("image origin not usable in CSP ({e}); falling back to 'self'");
            HeaderValue::from_static("default-src 'self'")
        });
        let mut set = vec![
            (header::CONTENT_SECURITY_POLICY, csp),
            (header::REFERRER_POLICY, HeaderValue::from_static("no-referrer")),
            (header::X_CONTENT_TYPE_OPTIONS, HeaderValue::from_static("nosniff")),
            (header::X_FRAME_OPTIONS, HeaderValue::from_static("DENY")),
        ];
        if self.enable_hsts {
            set.push((header::STRICT_TRANSPORT_SECURITY, HeaderValue::from_static(HSTS)));
        }
        set
    }
}

impl<S, B> Transform<S, ServiceRequest> for SecurityHeaders
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type InitError = ();
    type Transform = SecurityHeadersMiddleware<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(SecurityHeadersMiddleware { service: Rc::new(service), headers: Rc::new(self.headers()) }))
    }
}

pub struct SecurityHeadersMiddleware<S> {
    service: Rc<S>,
    headers: Rc<Vec<(HeaderName, HeaderValue)>>,
}

impl<S, B> Service<ServiceRequest> for SecurityHeadersMiddleware<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    actix_web::dev::forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let svc = Rc::clone(&self.service);
        let set = Rc::clone(&self.headers);
        Box::pin(async move {
            let mut res = svc.call(req).await?;
            let out = res.response_mut().headers_mut();
            // handlers may set their own values; those win
            for (name, value) in set.iter() {
                if !out.contains_key(name) {
                    out.insert(name.clone(), value.clone());
                }
            }
            Ok(res)
        })
    }
}
