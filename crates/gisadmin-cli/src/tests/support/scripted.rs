//! In-memory transport that replays canned responses.

use std::collections::VecDeque;
use std::io;
use std::sync::{Mutex, PoisonError};

use gisadmin_config::SiteEndpoint;

use crate::site::{FormParameters, RawResponse, Transport, TransportError};

/// A request observed by [`ScriptedTransport`].
#[derive(Debug, Clone)]
pub(crate) struct RecordedCall {
    pub(crate) path: String,
    pub(crate) form: FormParameters,
}

/// Transport that answers each call with the next scripted outcome.
///
/// Calls beyond the end of the script fail with a connection error so a
/// controller that issues too many requests is caught.
pub(crate) struct ScriptedTransport {
    script: Mutex<VecDeque<Result<RawResponse, TransportError>>>,
    calls: Mutex<Vec<RecordedCall>>,
}

impl ScriptedTransport {
    pub(crate) fn new(script: Vec<Result<RawResponse, TransportError>>) -> Self {
        Self {
            script: Mutex::new(script.into()),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// A transport failure as produced when nothing listens on the port.
    pub(crate) fn refused() -> TransportError {
        TransportError::Connect {
            url: String::from("https://geo.example.org:443/"),
            source: Box::new(io::Error::from(io::ErrorKind::ConnectionRefused)),
        }
    }

    pub(crate) fn calls(&self) -> Vec<RecordedCall> {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub(crate) fn paths(&self) -> Vec<String> {
        self.calls().into_iter().map(|call| call.path).collect()
    }
}

impl Transport for ScriptedTransport {
    fn post(
        &self,
        _endpoint: &SiteEndpoint,
        path: &str,
        form: &FormParameters,
    ) -> Result<RawResponse, TransportError> {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(RecordedCall {
                path: path.to_owned(),
                form: form.clone(),
            });
        self.script
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop_front()
            .unwrap_or_else(|| {
                Err(TransportError::Connect {
                    url: path.to_owned(),
                    source: Box::new(io::Error::other("script exhausted")),
                })
            })
    }
}
