//! Best-effort submission logging
//!
//! A [`TelemetrySink`] takes a [`SubmissionEvent`] and returns nothing the
//! caller could inspect. [`RemoteLogger`] turns each event into one GET
//! request against the remote append-only log, sent from a detached thread.
//! The response is treated as opaque: its status and body are never read,
//! network failures are logged and dropped, and nothing is retried.

use std::sync::{Arc, Condvar, Mutex, PoisonError};
use std::time::Duration;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::{Error, PledgeConfig, Result, UserData};

/// One submission of the details form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionEvent {
    pub full_name: String,
    pub phone: String,
    /// The user's custom pledge
    pub resolution: String,
    /// Milliseconds since the epoch; only used to defeat caches
    pub timestamp: i64,
}

impl SubmissionEvent {
    pub fn from_user(user: &UserData) -> Self {
        Self::at(user, Utc::now().timestamp_millis())
    }

    pub fn at(user: &UserData, timestamp: i64) -> Self {
        Self {
            full_name: user.full_name.clone(),
            phone: user.phone.clone(),
            resolution: user.custom_pledge.clone(),
            timestamp,
        }
    }
}

/// `endpoint?fullName=..&phone=..&resolution=..&timestamp=..`
pub fn submission_url(endpoint: &Url, event: &SubmissionEvent) -> Url {
    let mut url = endpoint.clone();
    url.query_pairs_mut()
        .append_pair("fullName", &event.full_name)
        .append_pair("phone", &event.phone)
        .append_pair("resolution", &event.resolution)
        .append_pair("timestamp", &event.timestamp.to_string());
    url
}

/// One-way sink for submissions. Implementations must not block the caller.
pub trait TelemetrySink: Send + Sync {
    fn record(&self, event: SubmissionEvent);
}

/// Drops every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopSink;

impl TelemetrySink for NoopSink {
    fn record(&self, event: SubmissionEvent) {
        log::debug!("telemetry disabled, dropping submission at {}", event.timestamp);
    }
}

/// Count of outstanding sends that can be waited on until it reaches zero.
#[derive(Debug, Default)]
struct InFlight {
    count: Mutex<usize>,
    idle: Condvar,
}

impl InFlight {
    fn begin(self: &Arc<Self>) -> InFlightTicket {
        *self.count.lock().unwrap_or_else(PoisonError::into_inner) += 1;
        InFlightTicket(self.clone())
    }

    fn get(&self) -> usize {
        *self.count.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn wait_idle(&self, timeout: Duration) -> bool {
        let count = self.count.lock().unwrap_or_else(PoisonError::into_inner);
        let (count, _) = self
            .idle
            .wait_timeout_while(count, timeout, |n| *n > 0)
            .unwrap_or_else(PoisonError::into_inner);
        *count == 0
    }
}

// Finishes its send when dropped, including on panic in the sender.
struct InFlightTicket(Arc<InFlight>);

impl Drop for InFlightTicket {
    fn drop(&mut self) {
        let mut count = self.0.count.lock().unwrap_or_else(PoisonError::into_inner);
        *count = count.saturating_sub(1);
        if *count == 0 {
            self.0.idle.notify_all();
        }
    }
}

/// Fire-and-forget delivery to the remote log endpoint.
#[derive(Debug, Clone)]
pub struct RemoteLogger {
    endpoint: Url,
    #[cfg_attr(not(feature = "remote-log"), allow(dead_code))]
    user_agent: String,
    #[cfg_attr(not(feature = "remote-log"), allow(dead_code))]
    timeout: Duration,
    in_flight: Arc<InFlight>,
}

impl RemoteLogger {
    pub fn new(config: &PledgeConfig) -> Result<Self> {
        let endpoint = Url::parse(&config.log_endpoint)
            .map_err(|e| Error::ConfigError(format!("log endpoint {:?}: {}", config.log_endpoint, e)))?;
        Ok(Self {
            endpoint,
            user_agent: config.user_agent.clone(),
            timeout: Duration::from_millis(config.request_timeout_ms),
            in_flight: Arc::new(InFlight::default()),
        })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    /// Number of submissions whose request has not finished yet.
    pub fn in_flight(&self) -> usize {
        self.in_flight.get()
    }

    /// Wait up to `timeout` for outstanding requests. Only meant for process
    /// shutdown; returns whether everything finished.
    pub fn drain(&self, timeout: Duration) -> bool {
        self.in_flight.wait_idle(timeout)
    }

    #[cfg(feature = "remote-log")]
    fn deliver(url: Url, user_agent: String, timeout: Duration) -> Result<()> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .user_agent(user_agent)
            .build()
            .map_err(|e| Error::DeliveryError(format!("Failed to build HTTP client: {}", e)))?;
        // the response is opaque: neither status nor body is inspected
        client
            .get(url)
            .send()
            .map_err(|e| Error::DeliveryError(e.to_string()))?;
        Ok(())
    }

    #[cfg(not(feature = "remote-log"))]
    fn deliver(_url: Url, _user_agent: String, _timeout: Duration) -> Result<()> {
        Err(Error::DeliveryError("built without the remote-log feature".into()))
    }
}

impl TelemetrySink for RemoteLogger {
    fn record(&self, event: SubmissionEvent) {
        let url = submission_url(&self.endpoint, &event);
        let user_agent = self.user_agent.clone();
        let timeout = self.timeout;
        let ticket = self.in_flight.begin();

        // a failed spawn drops the closure, and the ticket with it
        let spawned = std::thread::Builder::new()
            .name("pledgecard-telemetry".into())
            .spawn(move || {
                let _ticket = ticket;
                match Self::deliver(url, user_agent, timeout) {
                    Ok(()) => log::debug!("submission sent to remote log"),
                    Err(e) => log::warn!("remote log: {}", e),
                }
            });
        if let Err(e) = spawned {
            log::warn!("remote log: {}", Error::DeliveryError(format!("could not spawn sender: {}", e)));
        }
    }
}
