//! HTTP listener for the submission log
//!
//! GET query parameters and POST form bodies are handled identically: both
//! end up in [`handle_submission`] and receive its plain-text reply.

use std::collections::HashMap;
use std::io::Read;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tiny_http::{Header, Method, Request, Response, Server};

use crate::log_store::{handle_submission, AppendOnlyLog};
use crate::{Error, Result};

const MAX_BODY_BYTES: u64 = 64 * 1024;

pub struct LogServer {
    server: Server,
    store: Arc<dyn AppendOnlyLog>,
}

impl LogServer {
    /// Bind to `addr` (use port 0 for an ephemeral port).
    pub fn bind(addr: &str, store: Arc<dyn AppendOnlyLog>) -> Result<Self> {
        let server = Server::http(addr)
            .map_err(|e| Error::NetworkError(format!("Failed to bind {}: {}", addr, e)))?;
        Ok(Self { server, store })
    }

    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.server.server_addr().to_ip()
    }

    /// Serve until [`unblock`](Self::unblock) is called.
    pub fn run(&self) {
        for request in self.server.incoming_requests() {
            self.handle(request);
        }
    }

    /// Serve at most one request, waiting up to `timeout`. Returns whether a
    /// request was handled.
    pub fn serve_one(&self, timeout: Duration) -> Result<bool> {
        match self.server.recv_timeout(timeout)? {
            Some(request) => {
                self.handle(request);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    pub fn unblock(&self) {
        self.server.unblock();
    }

    fn handle(&self, mut request: Request) {
        let method = request.method().clone();
        let response = match method {
            Method::Get | Method::Post => {
                let body = if method == Method::Post {
                    let mut buf = Vec::new();
                    match request.as_reader().take(MAX_BODY_BYTES).read_to_end(&mut buf) {
                        Ok(_) => Some(buf),
                        Err(e) => {
                            log::warn!("failed to read submission body: {}", e);
                            None
                        }
                    }
                } else {
                    None
                };
                let params = request_params(request.url(), body.as_deref());
                Response::from_string(handle_submission(self.store.as_ref(), &params, Utc::now()))
            }
            _ => Response::from_string("Method Not Allowed").with_status_code(405),
        };
        let response = match Header::from_bytes(&b"Content-Type"[..], &b"text/plain; charset=utf-8"[..]) {
            Ok(h) => response.with_header(h),
            Err(()) => response,
        };
        if let Err(e) = request.respond(response) {
            log::warn!("failed to answer submission: {}", e);
        }
    }
}

/// Merge query parameters and a form-encoded body; body values win.
pub fn request_params(url: &str, body: Option<&[u8]>) -> HashMap<String, String> {
    let mut params = HashMap::new();
    if let Some((_, query)) = url.split_once('?') {
        params.extend(url::form_urlencoded::parse(query.as_bytes()).into_owned());
    }
    if let Some(body) = body {
        params.extend(url::form_urlencoded::parse(body).into_owned());
    }
    params
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn query_and_body_are_merged() {
        let p = request_params("/exec?fullName=Jane+Doe&phone=1", Some(b"phone=2&resolution=Run%21"));
        assert_eq!(p["fullName"], "Jane Doe");
        assert_eq!(p["phone"], "2");
        assert_eq!(p["resolution"], "Run!");
    }

    #[test]
    fn path_without_query_has_no_params() {
        assert!(request_params("/exec", None).is_empty());
    }
}
