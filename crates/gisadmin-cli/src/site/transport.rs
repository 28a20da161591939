//! HTTP transport for the administrative REST API.
//!
//! Every call is a single form-encoded POST on a fresh connection. The
//! transport reports what the server said and nothing more: interpreting the
//! status code and body is left to [`super::execute`].

use std::error::Error;

use gisadmin_config::{Config, SiteEndpoint};
use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};
use reqwest::blocking::Client;
use reqwest::header::{ACCEPT, CONNECTION, HeaderMap, HeaderName, HeaderValue, REFERER};
use reqwest::redirect::Policy;
use thiserror::Error;

use super::call::FormParameters;

/// Value sent in both referrer headers and in token requests.
pub const REFERER_TAG: &str = "backuputility";

/// Bytes left untouched when encoding a request path.
const PATH_ENCODE_SET: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~')
    .remove(b'/');

/// Status line and body returned by the server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawResponse {
    /// HTTP status code.
    pub status: u16,
    /// Response body decoded as text.
    pub body: String,
}

impl RawResponse {
    /// Builds a response from its parts.
    #[must_use]
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }
}

/// Failures that prevented a response from being read.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The HTTP client could not be constructed.
    #[error("failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),
    /// The request could not be delivered.
    #[error("failed to reach {url}: {source}")]
    Connect {
        /// Request URL.
        url: String,
        /// Underlying failure.
        #[source]
        source: Box<dyn Error + Send + Sync>,
    },
    /// The response body could not be read.
    #[error("failed to read response from {url}: {source}")]
    ReadBody {
        /// Request URL.
        url: String,
        /// Underlying failure.
        #[source]
        source: Box<dyn Error + Send + Sync>,
    },
}

/// Issues form-encoded POST requests against a site.
pub trait Transport {
    /// Posts `form` to `path` on `endpoint` and returns the raw response.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError`] when no response could be obtained. HTTP
    /// error statuses are not errors at this layer.
    fn post(
        &self,
        endpoint: &SiteEndpoint,
        path: &str,
        form: &FormParameters,
    ) -> Result<RawResponse, TransportError>;
}

impl<T> Transport for &T
where
    T: Transport + ?Sized,
{
    fn post(
        &self,
        endpoint: &SiteEndpoint,
        path: &str,
        form: &FormParameters,
    ) -> Result<RawResponse, TransportError> {
        (**self).post(endpoint, path, form)
    }
}

/// Production transport backed by `reqwest`'s blocking client.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    /// Builds a transport; `insecure_tls` disables certificate verification.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::Client`] when the TLS backend fails to
    /// initialise.
    pub fn new(insecure_tls: bool) -> Result<Self, TransportError> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("text/plain"));
        headers.insert(REFERER, HeaderValue::from_static(REFERER_TAG));
        headers.insert(
            HeaderName::from_static("referrer"),
            HeaderValue::from_static(REFERER_TAG),
        );
        headers.insert(CONNECTION, HeaderValue::from_static("close"));

        // Imports can run for many minutes without sending a byte. A redirect
        // is returned as-is so each call stays a single POST.
        let client = Client::builder()
            .default_headers(headers)
            .redirect(Policy::none())
            .timeout(None)
            .pool_max_idle_per_host(0)
            .danger_accept_invalid_certs(insecure_tls)
            .build()
            .map_err(TransportError::Client)?;
        Ok(Self { client })
    }

    /// Builds a transport honouring the `insecure_tls` setting.
    ///
    /// # Errors
    ///
    /// See [`HttpTransport::new`].
    pub fn from_config(config: &Config) -> Result<Self, TransportError> {
        Self::new(config.insecure_tls())
    }
}

impl Transport for HttpTransport {
    fn post(
        &self,
        endpoint: &SiteEndpoint,
        path: &str,
        form: &FormParameters,
    ) -> Result<RawResponse, TransportError> {
        let url = request_url(endpoint, path);
        tracing::debug!(
            target: "gisadmin::transport",
            event = "request",
            url = %url,
            "posting administrative request"
        );

        let response = self
            .client
            .post(&url)
            .form(form.pairs())
            .send()
            .map_err(|source| TransportError::Connect {
                url: url.clone(),
                source: Box::new(source),
            })?;
        let status = response.status().as_u16();
        let body = response
            .text()
            .map_err(|source| TransportError::ReadBody {
                url: url.clone(),
                source: Box::new(source),
            })?;

        tracing::debug!(
            target: "gisadmin::transport",
            event = "response",
            url = %url,
            status,
            bytes = body.len(),
            "received administrative response"
        );
        Ok(RawResponse { status, body })
    }
}

/// Percent-encodes `path` as UTF-8, leaving separators intact.
#[must_use]
pub fn encode_path(path: &str) -> String {
    utf8_percent_encode(path, PATH_ENCODE_SET).to_string()
}

/// Full request URL with the default port resolved.
#[must_use]
pub fn request_url(endpoint: &SiteEndpoint, path: &str) -> String {
    format!("{}{}", endpoint.origin(), encode_path(path))
}
