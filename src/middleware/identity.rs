//! Caller identity used to key rate-limit buckets.
//!
//! # Resolution Order
//!
//! 1. The raw `Authorization` header value, so every credential gets its
//!    own budget (valid or not)
//! 2. The peer address recorded by axum's `ConnectInfo`
//! 3. [`FALLBACK_IDENTITY`], shared by every request that has neither
//!
//! The identity may contain a secret, so only its [`CallerIdentity::source`]
//! is ever logged.

use std::borrow::Cow;
use std::net::{IpAddr, SocketAddr};

use axum::extract::ConnectInfo;
use axum::http::Request;
use axum::http::header::AUTHORIZATION;

/// Identity shared by requests with neither a credential nor a peer address.
pub const FALLBACK_IDENTITY: &str = "127.0.0.1";

/// Where a caller's rate-limit identity came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallerIdentity<'a> {
    /// Raw `Authorization` header value.
    Credential(&'a str),
    /// Peer IP address of the connection.
    Address(IpAddr),
    /// Nothing identifying was available.
    Unknown,
}

impl<'a> CallerIdentity<'a> {
    /// Resolve the identity of the caller that sent `req`.
    pub fn of<B>(req: &'a Request<B>) -> Self {
        if let Some(value) = req.headers().get(AUTHORIZATION)
            && let Ok(value) = value.to_str()
            && !value.is_empty()
        {
            return CallerIdentity::Credential(value);
        }

        if let Some(ConnectInfo(addr)) = req.extensions().get::<ConnectInfo<SocketAddr>>() {
            return CallerIdentity::Address(addr.ip());
        }

        CallerIdentity::Unknown
    }

    /// Bucket key for the rate limiter.
    pub fn key(&self) -> Cow<'a, str> {
        match self {
            CallerIdentity::Credential(value) => Cow::Borrowed(value),
            CallerIdentity::Address(ip) => Cow::Owned(ip.to_string()),
            CallerIdentity::Unknown => Cow::Borrowed(FALLBACK_IDENTITY),
        }
    }

    /// Log-safe label of where the identity came from.
    pub fn source(&self) -> &'static str {
        match self {
            CallerIdentity::Credential(_) => "credential",
            CallerIdentity::Address(_) => "address",
            CallerIdentity::Unknown => "fallback",
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use axum::body::Body;

    use super::*;

    #[test]
    fn test_authorization_header_wins() {
        let mut req = Request::builder()
            .header("authorization", "Bearer abc")
            .body(Body::empty())
            .unwrap();
        req.extensions_mut()
            .insert(ConnectInfo(SocketAddr::from(([10, 0, 0, 1], 5000))));

        let identity = CallerIdentity::of(&req);
        assert_eq!(identity, CallerIdentity::Credential("Bearer abc"));
        assert_eq!(identity.key(), "Bearer abc");
        assert_eq!(identity.source(), "credential");
    }

    #[test]
    fn test_peer_address_without_header() {
        let mut req = Request::builder().body(Body::empty()).unwrap();
        req.extensions_mut()
            .insert(ConnectInfo(SocketAddr::from(([10, 0, 0, 1], 5000))));

        let identity = CallerIdentity::of(&req);
        assert_eq!(identity.key(), "10.0.0.1");
        assert_eq!(identity, CallerIdentity::Address(IpAddr::from([10, 0, 0, 1])));
        assert_eq!(identity.source(), "address");
    }

    #[test]
    fn test_fallback_identity() {
        let req = Request::builder()
            .header("authorization", "")
            .body(Body::empty())
            .unwrap();

        let identity = CallerIdentity::of(&req);
        assert_eq!(identity, CallerIdentity::Unknown);
        assert_eq!(identity.key(), FALLBACK_IDENTITY);
    }
}
