//! Parses operator-supplied site URLs into a [`SiteEndpoint`].
//!
//! Operators usually paste something like `https://geo.example.org:6443/arcgis`
//! but scheme, port, and context path are all optional. The parser fills the
//! gaps with the server's conventional defaults and normalises the context so
//! it always addresses the administrative API.

use std::borrow::Cow;
use std::fmt;
use std::str::FromStr;

use percent_encoding::percent_decode_str;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use thiserror::Error;
use url::Url;

/// Context path used when the URL carries no path of its own.
pub const DEFAULT_CONTEXT_PATH: &str = "/arcgis";

/// Trailing segment that every administrative context path ends with.
pub const ADMIN_SEGMENT: &str = "admin/";

/// Wire protocol spoken to the site.
#[derive(
    Debug, Clone, Copy, Default, Deserialize, Serialize, PartialEq, Eq, EnumString, Display,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum Protocol {
    /// Plain HTTP.
    #[default]
    Http,
    /// HTTP over TLS.
    Https,
}

impl Protocol {
    /// Port used when the URL does not name one.
    #[must_use]
    pub const fn default_port(self) -> u16 {
        match self {
            Self::Http => 80,
            Self::Https => 443,
        }
    }

    /// URL scheme for the protocol.
    #[must_use]
    pub const fn scheme(self) -> &'static str {
        match self {
            Self::Http => "http",
            Self::Https => "https",
        }
    }
}

/// Port selection for a site endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Port {
    /// No port was supplied; resolved per protocol at dispatch time.
    Default,
    /// Operator-supplied port.
    Explicit(u16),
}

impl Port {
    /// Resolves the concrete port number for `protocol`.
    #[must_use]
    pub const fn resolve(self, protocol: Protocol) -> u16 {
        match self {
            Self::Default => protocol.default_port(),
            Self::Explicit(port) => port,
        }
    }
}

/// Immutable description of the site being administered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SiteEndpoint {
    protocol: Protocol,
    host: String,
    port: Port,
    admin_context_path: String,
}

impl SiteEndpoint {
    /// Builds an endpoint, normalising `context_path` onto the admin segment.
    #[must_use]
    pub fn new(protocol: Protocol, host: impl Into<String>, port: Port, context_path: &str) -> Self {
        Self {
            protocol,
            host: host.into(),
            port,
            admin_context_path: normalise_context_path(context_path),
        }
    }

    /// Protocol used to reach the site.
    #[must_use]
    pub const fn protocol(&self) -> Protocol {
        self.protocol
    }

    /// Host name (IPv6 literals keep their brackets).
    #[must_use]
    pub fn host(&self) -> &str {
        &self.host
    }

    /// Port as supplied by the operator.
    #[must_use]
    pub const fn port(&self) -> Port {
        self.port
    }

    /// Port after applying the protocol default.
    #[must_use]
    pub const fn resolved_port(&self) -> u16 {
        self.port.resolve(self.protocol)
    }

    /// Administrative context, for example `/arcgis/admin/`.
    #[must_use]
    pub fn admin_context_path(&self) -> &str {
        &self.admin_context_path
    }

    /// Site context without the admin segment, for example `/arcgis/`.
    #[must_use]
    pub fn site_root(&self) -> &str {
        self.admin_context_path
            .strip_suffix(ADMIN_SEGMENT)
            .unwrap_or(&self.admin_context_path)
    }

    /// Path of an administrative operation such as `exportSite`.
    #[must_use]
    pub fn admin_path(&self, operation: &str) -> String {
        format!("{}{operation}", self.admin_context_path)
    }

    /// Path of a resource relative to the site root such as
    /// `tokens/generateToken`.
    #[must_use]
    pub fn site_path(&self, resource: &str) -> String {
        format!("{}{resource}", self.site_root())
    }

    /// Scheme, host, and resolved port without any path.
    #[must_use]
    pub fn origin(&self) -> String {
        format!(
            "{}://{}:{}",
            self.protocol.scheme(),
            self.host,
            self.resolved_port()
        )
    }
}

impl fmt::Display for SiteEndpoint {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(formatter, "{}://{}", self.protocol.scheme(), self.host)?;
        if let Port::Explicit(port) = self.port {
            write!(formatter, ":{port}")?;
        }
        formatter.write_str(&self.admin_context_path)
    }
}

impl FromStr for SiteEndpoint {
    type Err = EndpointParseError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Err(EndpointParseError::Empty);
        }

        let candidate = if trimmed.contains("://") {
            Cow::Borrowed(trimmed)
        } else {
            Cow::Owned(format!("{}://{trimmed}", Protocol::default().scheme()))
        };

        let url = Url::parse(&candidate).map_err(|source| match source {
            url::ParseError::EmptyHost => EndpointParseError::MissingHost(input.to_owned()),
            other => EndpointParseError::Url {
                input: input.to_owned(),
                source: other,
            },
        })?;

        let protocol = match url.scheme() {
            "http" => Protocol::Http,
            "https" => Protocol::Https,
            other => return Err(EndpointParseError::UnsupportedScheme(other.to_owned())),
        };

        let host = url
            .host_str()
            .filter(|host| !host.is_empty())
            .ok_or_else(|| EndpointParseError::MissingHost(input.to_owned()))?;

        let port = url.port().map_or(Port::Default, Port::Explicit);

        // `Url` escapes non-ASCII path text; keep the operator's spelling so the
        // transport encodes it exactly once.
        let path = percent_decode_str(url.path())
            .decode_utf8()
            .map_err(|_| EndpointParseError::InvalidPath(input.to_owned()))?;

        Ok(Self::new(protocol, host, port, &path))
    }
}

fn normalise_context_path(path: &str) -> String {
    let trimmed = path.trim_end_matches('/');
    let base = if trimmed.is_empty() {
        DEFAULT_CONTEXT_PATH
    } else {
        trimmed
    };

    let mut context = String::with_capacity(base.len() + ADMIN_SEGMENT.len() + 2);
    if !base.starts_with('/') {
        context.push('/');
    }
    context.push_str(base);
    context.push('/');
    if !context.ends_with(&format!("/{ADMIN_SEGMENT}")) {
        context.push_str(ADMIN_SEGMENT);
    }
    context
}

/// Errors raised while parsing a [`SiteEndpoint`].
#[derive(Debug, Error)]
pub enum EndpointParseError {
    /// The URL was blank.
    #[error("site URL is empty; expected http(s)://<host>:<port>/arcgis")]
    Empty,
    /// Scheme other than `http` or `https`.
    #[error("unsupported site URL scheme '{0}'; expected http or https")]
    UnsupportedScheme(String),
    /// The host could not be determined.
    #[error("site URL '{0}' does not name a host; expected http(s)://<host>:<port>/arcgis")]
    MissingHost(String),
    /// The path was not valid UTF-8 once unescaped.
    #[error("site URL '{0}' has a context path that is not valid UTF-8")]
    InvalidPath(String),
    /// URL failed to parse.
    #[error("site URL '{input}' is malformed: {source}")]
    Url {
        /// Text supplied by the operator.
        input: String,
        /// Parser failure.
        #[source]
        source: url::ParseError,
    },
}
