//! The HTTP side of a job: one search call, timed and classified.

use std::time::Duration;

use reqwest::{Client, StatusCode, Url};
use serde_json::Value;
use tokio::time::Instant;

use crate::{
    error::{Error, Result},
    metric::{Job, Outcome, Verdict},
    request,
};

/// Upper bound for a single request, connect included.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Read the `success` flag of a search response body.
///
/// The key is matched case-insensitively. A `null` body, a missing key and a
/// `null` value all read as `false`. Anything that isn't JSON, isn't an object,
/// or carries a non-boolean flag gives `None`.
fn app_success(body: &[u8]) -> Option<bool> {
    let fields = match serde_json::from_slice::<Value>(body).ok()? {
        Value::Null => return Some(false),
        Value::Object(fields) => fields,
        _ => return None,
    };

    let mut success = false;
    for (key, value) in fields {
        if !key.eq_ignore_ascii_case("success") {
            continue;
        }
        match value {
            Value::Bool(flag) => success = flag,
            Value::Null => {}
            _ => return None,
        }
    }
    Some(success)
}

/// Turn a finished HTTP exchange into a [`Verdict`].
///
/// The body is only inspected for 200s, and an undecodable body leaves the
/// verdict at "no application signal".
pub fn classify(status: StatusCode, body: &[u8]) -> Verdict {
    if status != StatusCode::OK {
        return Verdict::BadStatus(status.as_u16());
    }
    Verdict::Ok {
        app_success: app_success(body),
    }
}

/// A pooled client bound to one target.
///
/// Cheap to clone; clones share the connection pool.
#[derive(Clone, Debug)]
pub struct SearchClient {
    client: Client,
    endpoint: Url,
}

impl SearchClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let endpoint = request::endpoint(base_url)?;
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self { client, endpoint })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    /// Issue one random search and classify the result.
    ///
    /// Latency is measured up to the response headers. Errors never escape:
    /// a transport failure is an [`Outcome`] like any other.
    pub async fn search(&self, job: Job) -> Outcome {
        // thread-local generator, released before the first await
        let url = request::generate(&self.endpoint, &mut rand::rng());
        let start = Instant::now();

        let response = match self.client.get(url).send().await {
            Ok(response) => response,
            Err(e) => {
                let latency = start.elapsed();
                tracing::debug!(stage = job.stage, seq = job.seq, "request failed: {e}");
                return Outcome::new(latency, Verdict::TransportError);
            }
        };
        let latency = start.elapsed();

        let status = response.status();
        let verdict = if status == StatusCode::OK {
            // an unreadable body is treated like an undecodable one
            let body = response.bytes().await.unwrap_or_default();
            classify(status, &body)
        } else {
            classify(status, &[])
        };

        tracing::trace!(stage = job.stage, seq = job.seq, ?verdict, ?latency, "request done");
        Outcome::new(latency, verdict)
    }

    /// One-shot health check: `GET {base}/api/search?keyword=test` must answer 200.
    pub async fn probe(&self) -> Result<()> {
        let mut url = self.endpoint.clone();
        url.query_pairs_mut().clear().append_pair("keyword", "test");

        let status = self.client.get(url).send().await?.status();
        if status != StatusCode::OK {
            return Err(Error::Unhealthy {
                status: status.as_u16(),
            });
        }
        Ok(())
    }
}
