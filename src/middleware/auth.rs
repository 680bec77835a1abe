//! Bearer API key authentication middleware.
//!
//! # Security Features
//!
//! - **Constant-time comparison**: every configured key is checked without
//!   early exit (see [`SettingsHandle::contains_key`])
//! - **Live key set**: keys are read from the settings handle per request,
//!   so rotations apply without a restart
//! - **No key echo**: neither the provided nor the expected keys are logged
//!
//! # Enforcement
//!
//! [`ApiKeyAuth`] resolves the verdict and stores it in the request
//! extensions. Handlers enforce it by taking an [`Authenticated`] argument.
//! Extractors run in argument order, so a handler that lists its path
//! parameters first rejects a malformed path (422) before the credential
//! is looked at.
//!
//! # Usage
//!
//! ```bash
//! API_KEYS=key-one,key-two cargo run
//! curl -H "Authorization: Bearer key-one" http://localhost:8000/v1/now
//! ```
//!
//! # Failures
//!
//! | Request                                  | Status | Detail                       |
//! |------------------------------------------|--------|------------------------------|
//! | no header, other scheme, empty credential| 401    | `Please provide credentials` |
//! | bearer credential not in the key set     | 401    | `Unauthorized`               |

use std::task::{Context, Poll};

use axum::body::Body;
use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use axum::http::{Request, Response};
use tower::{Layer, Service};
use tracing::{debug, warn};

use crate::error::AppError;
use crate::settings::SettingsHandle;

/// Authentication scheme accepted in the `Authorization` header.
pub const BEARER_SCHEME: &str = "bearer";

/// Verdict of [`ApiKeyAuth`] for one request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AuthVerdict {
    Granted,
    MissingCredential,
    UnknownKey,
}

/// Proof that the request carried an accepted API key.
///
/// Extracting it fails with 401 unless [`ApiKeyAuth`] granted the request.
/// Without the layer in front, extraction fails as well.
#[derive(Debug, Clone, Copy)]
pub struct Authenticated;

impl<S> FromRequestParts<S> for Authenticated
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        match parts.extensions.get::<AuthVerdict>() {
            Some(AuthVerdict::Granted) => Ok(Authenticated),
            Some(AuthVerdict::UnknownKey) => Err(AppError::Authorization),
            Some(AuthVerdict::MissingCredential) | None => Err(AppError::Authentication),
        }
    }
}

/// API key authentication layer.
#[derive(Clone)]
pub struct ApiKeyAuth {
    settings: SettingsHandle,
}

impl ApiKeyAuth {
    pub fn new(settings: SettingsHandle) -> Self {
        Self { settings }
    }
}

impl<S> Layer<S> for ApiKeyAuth {
    type Service = ApiKeyAuthService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        ApiKeyAuthService {
            inner,
            settings: self.settings.clone(),
        }
    }
}

/// API key authentication service wrapper.
#[derive(Clone)]
pub struct ApiKeyAuthService<S> {
    inner: S,
    settings: SettingsHandle,
}

impl<S> Service<Request<Body>> for ApiKeyAuthService<S>
where
    S: Service<Request<Body>, Response = Response<Body>> + Clone + Send + 'static,
    S::Future: Send,
{
    type Response = Response<Body>;
    type Error = S::Error;
    type Future = std::pin::Pin<
        Box<dyn std::future::Future<Output = Result<Self::Response, Self::Error>> + Send>,
    >;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, mut req: Request<Body>) -> Self::Future {
        let settings = self.settings.clone();
        let mut inner = self.inner.clone();

        // Owned copy: the request body is not Sync, so no borrow of req may
        // live across an await
        let credential = extract_bearer(&req).map(str::to_owned);

        Box::pin(async move {
            let verdict = match credential {
                None => {
                    warn!(path = %req.uri().path(), "Missing or malformed bearer credential");
                    AuthVerdict::MissingCredential
                }
                Some(credential) if settings.contains_key(&credential).await => {
                    debug!("API key authentication successful");
                    AuthVerdict::Granted
                }
                Some(_) => {
                    warn!(path = %req.uri().path(), "Unrecognized API key");
                    AuthVerdict::UnknownKey
                }
            };

            req.extensions_mut().insert(verdict);
            inner.call(req).await
        })
    }
}

/// Extract the credential of a `Bearer` authorization header.
///
/// The scheme is matched case-insensitively. Returns `None` if the header
/// is missing, not valid text, uses another scheme, or carries an empty
/// credential.
fn extract_bearer<B>(req: &Request<B>) -> Option<&str> {
    let value = req.headers().get(AUTHORIZATION)?.to_str().ok()?;
    let (scheme, credential) = value.trim().split_once(' ')?;
    let credential = credential.trim();

    if !scheme.eq_ignore_ascii_case(BEARER_SCHEME) || credential.is_empty() {
        return None;
    }
    Some(credential)
}
