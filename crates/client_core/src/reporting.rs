use anyhow::{Context, Result};
use reqwest::Client;
use shared::protocol::{TrackEvent, TRACK_EVENT_ROUTE};
use tokio::{runtime::Handle, task::JoinHandle};
use tracing::debug;
use url::Url;

/// Best-effort; delivery is never awaited or retried.
pub trait EventSink: Send + Sync {
    fn report(&self, event: TrackEvent);
}

pub struct DisabledEventSink;

impl EventSink for DisabledEventSink {
    fn report(&self, event: TrackEvent) {
        debug!(
            event_type = %event.event_type,
            control_id = %event.control_id,
            "event reporting disabled; dropping event"
        );
    }
}

/// Posts events as JSON to the collector's track-event route.
#[derive(Clone)]
pub struct HttpEventSink {
    http: Client,
    endpoint: Url,
}

impl HttpEventSink {
    pub fn new(collector_url: &str) -> Result<Self> {
        let mut base = collector_url.trim().to_string();
        if !base.ends_with('/') {
            base.push('/');
        }
        let endpoint = Url::parse(&base)
            .and_then(|base| base.join(TRACK_EVENT_ROUTE.trim_start_matches('/')))
            .with_context(|| format!("invalid collector url '{collector_url}'"))?;
        Ok(Self {
            http: Client::new(),
            endpoint,
        })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    pub fn send(&self, event: TrackEvent) -> JoinHandle<()> {
        let http = self.http.clone();
        let endpoint = self.endpoint.clone();
        tokio::spawn(async move {
            match http.post(endpoint).json(&event).send().await {
                Ok(response) if !response.status().is_success() => {
                    debug!(
                        event_type = %event.event_type,
                        control_id = %event.control_id,
                        status = %response.status(),
                        "collector rejected event"
                    );
                }
                Ok(_) => {}
                Err(error) => {
                    debug!(
                        event_type = %event.event_type,
                        control_id = %event.control_id,
                        %error,
                        "event delivery failed"
                    );
                }
            }
        })
    }
}

impl EventSink for HttpEventSink {
    fn report(&self, event: TrackEvent) {
        if Handle::try_current().is_err() {
            debug!(event_type = %event.event_type, "no async runtime; dropping event");
            return;
        }
        drop(self.send(event));
    }
}

#[cfg(test)]
#[path = "tests/reporting_tests.rs"]
mod tests;
