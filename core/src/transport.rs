//! The network seam.
//!
//! `ApiSession` never performs I/O itself; it hands each `HttpRequest` to a
//! `Transport` and gets back an `HttpResponse`. Non-2xx statuses are data,
//! not transport errors: a transport fails only when no response arrived.

use crate::error::TransportError;
use crate::http::{HttpRequest, HttpResponse};

pub trait Transport {
    fn execute(&self, request: HttpRequest) -> Result<HttpResponse, TransportError>;
}

impl<T: Transport + ?Sized> Transport for &T {
    fn execute(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        (**self).execute(request)
    }
}

impl<T: Transport + ?Sized> Transport for Box<T> {
    fn execute(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        (**self).execute(request)
    }
}

/// Join a possibly relative request path onto `origin`.
pub fn resolve_url(origin: &str, path: &str) -> String {
    if path.starts_with("http://") || path.starts_with("https://") {
        return path.to_string();
    }
    format!("{}{path}", origin.trim_end_matches('/'))
}

#[cfg(feature = "ureq")]
pub use self::blocking::UreqTransport;

#[cfg(feature = "ureq")]
mod blocking {
    use std::time::Duration;

    use tracing::debug;

    use super::{resolve_url, Transport};
    use crate::error::TransportError;
    use crate::http::{HttpMethod, HttpRequest, HttpResponse};

    /// Blocking transport over `ureq`.
    ///
    /// Relative request paths (the default `/api` base) are resolved against
    /// `origin`. ureq's status-as-error behaviour is disabled so 4xx/5xx
    /// responses come back as data for the parse layer to interpret.
    #[derive(Debug, Clone)]
    pub struct UreqTransport {
        agent: ureq::Agent,
        origin: String,
    }

    impl UreqTransport {
        pub fn new(origin: &str) -> Self {
            Self::with_timeout(origin, None)
        }

        pub fn with_timeout(origin: &str, timeout: Option<Duration>) -> Self {
            let agent = ureq::Agent::config_builder()
                .http_status_as_error(false)
                .timeout_global(timeout)
                .build()
                .new_agent();
            Self {
                agent,
                origin: origin.trim_end_matches('/').to_string(),
            }
        }

        pub fn origin(&self) -> &str {
            &self.origin
        }
    }

    impl Transport for UreqTransport {
        fn execute(&self, req: HttpRequest) -> Result<HttpResponse, TransportError> {
            let url = resolve_url(&self.origin, &req.path);
            debug!(method = %req.method, %url, "sending request");

            let result = match req.method {
                HttpMethod::Get => apply_headers(self.agent.get(&url), &req.headers).call(),
                HttpMethod::Delete => apply_headers(self.agent.delete(&url), &req.headers).call(),
                HttpMethod::Post => send(apply_headers(self.agent.post(&url), &req.headers), req.body),
                HttpMethod::Put => send(apply_headers(self.agent.put(&url), &req.headers), req.body),
                HttpMethod::Patch => {
                    send(apply_headers(self.agent.patch(&url), &req.headers), req.body)
                }
            };
            let mut response = result.map_err(|e| TransportError(e.to_string()))?;

            let status = response.status().as_u16();
            let headers = response
                .headers()
                .iter()
                .filter_map(|(name, value)| {
                    value
                        .to_str()
                        .ok()
                        .map(|v| (name.as_str().to_string(), v.to_string()))
                })
                .collect();
            let body = response
                .body_mut()
                .read_to_string()
                .map_err(|e| TransportError(e.to_string()))?;

            Ok(HttpResponse {
                status,
                headers,
                body,
            })
        }
    }

    fn apply_headers<B>(
        mut builder: ureq::RequestBuilder<B>,
        headers: &[(String, String)],
    ) -> ureq::RequestBuilder<B> {
        for (name, value) in headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        builder
    }

    fn send(
        builder: ureq::RequestBuilder<ureq::typestate::WithBody>,
        body: Option<String>,
    ) -> Result<ureq::http::Response<ureq::Body>, ureq::Error> {
        match body {
            Some(body) => builder.send(body.as_bytes()),
            None => builder.send_empty(),
        }
    }
}
