use std::sync::Arc;
use std::time::Duration;

use hyper::client::HttpConnector;
use hyper::header::RETRY_AFTER;
use hyper::{Body, Client, HeaderMap, StatusCode};
use hyper_rustls::HttpsConnector;
use rustls::{ClientConfig, OwnedTrustAnchor, RootCertStore};
use webpki_roots::TLS_SERVER_ROOTS;

use crate::traits::{AdapterError, AdapterResult};

pub(crate) type HyperClient = Client<HttpsConnector<HttpConnector>, Body>;

#[allow(clippy::unnecessary_wraps)]
pub(crate) fn build_https_client() -> AdapterResult<HyperClient> {
    let mut roots = RootCertStore::empty();
    roots.add_trust_anchors(TLS_SERVER_ROOTS.iter().map(|anchor| {
        OwnedTrustAnchor::from_subject_spki_name_constraints(
            anchor.subject,
            anchor.spki,
            anchor.name_constraints,
        )
    }));

    let config = ClientConfig::builder()
        .with_safe_defaults()
        .with_root_certificates(roots)
        .with_no_client_auth();

    let mut http = HttpConnector::new();
    http.enforce_http(false);

    let connector = HttpsConnector::from((http, Arc::new(config)));

    Ok(Client::builder().build::<_, Body>(connector))
}

/// Maps a non-success status to an adapter error. 429 becomes
/// [`AdapterError::RateLimited`] carrying the `retry-after` delay in seconds.
pub(crate) fn status_error(
    provider: &str,
    status: StatusCode,
    headers: &HeaderMap,
    body: &[u8],
) -> AdapterError {
    if status == StatusCode::TOO_MANY_REQUESTS {
        let retry_after = headers
            .get(RETRY_AFTER)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.trim().parse::<u64>().ok())
            .map(Duration::from_secs);
        return AdapterError::RateLimited { retry_after };
    }
    let reason = String::from_utf8_lossy(body);
    AdapterError::response(format!("{provider} returned {status}: {reason}"))
}

/// Validates and normalises a base URL so that paths can be appended.
pub(crate) fn sanitize_base_url(provider: &str, input: &str) -> AdapterResult<String> {
    let mut base = input.trim().to_owned();
    if !(base.starts_with("http://") || base.starts_with("https://")) {
        return Err(AdapterError::configuration(format!(
            "{provider} base URL must start with http:// or https://"
        )));
    }
    if !base.ends_with('/') {
        base.push('/');
    }
    base.parse::<hyper::Uri>().map_err(|err| {
        AdapterError::configuration(format!("invalid {provider} base URL: {err}"))
    })?;
    Ok(base)
}

#[cfg(test)]
mod tests {
    use hyper::header::HeaderValue;

    use super::*;

    #[test]
    fn too_many_requests_carries_retry_after() {
        let mut headers = HeaderMap::new();
        headers.insert(RETRY_AFTER, HeaderValue::from_static("7"));

        let err = status_error("OpenAI", StatusCode::TOO_MANY_REQUESTS, &headers, b"");
        assert!(matches!(
            err,
            AdapterError::RateLimited { retry_after: Some(delay) } if delay == Duration::from_secs(7)
        ));
    }

    #[test]
    fn other_statuses_are_response_errors() {
        let err = status_error(
            "Gemini",
            StatusCode::INTERNAL_SERVER_ERROR,
            &HeaderMap::new(),
            b"boom",
        );
        assert!(matches!(err, AdapterError::Response { ref reason } if reason.contains("boom")));
    }

    #[test]
    fn base_url_gets_trailing_slash() {
        assert_eq!(
            sanitize_base_url("OpenAI", "https://example.com/openai").unwrap(),
            "https://example.com/openai/"
        );
        assert!(sanitize_base_url("OpenAI", "example.com").is_err());
    }
}
