//! Link probing: HEAD requests with rate-limit backoff.

use std::time::Duration;

use reqwest::blocking::Client;
use reqwest::header::RETRY_AFTER;
use reqwest::StatusCode;
use tracing::{debug, warn};

/// Status recorded when a request fails before any response arrives.
pub const UNREACHABLE_STATUS: u16 = 599;

/// First backoff, in seconds; also the floor for a server-supplied `Retry-After`.
const INITIAL_BACKOFF_SECS: u64 = 10;

/// Upper bound for any single backoff, in seconds.
const MAX_BACKOFF_SECS: u64 = 60;

/// What a probe learned about one URL.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProbeResponse {
    /// `Retry-After` in seconds, when present and numeric.
    pub retry_after: Option<u64>,
    /// HTTP status code.
    pub status: u16,
}

/// Something that can issue a HEAD request for a URL.
pub trait Probe {
    /// Issue one request without following retries.
    ///
    /// # Errors
    ///
    /// Returns a reason when no response was received.
    fn head(&self, url: &str) -> Result<ProbeResponse, String>;
}

/// Probe backed by the shared blocking client.
#[derive(Debug)]
pub struct HttpProbe {
    /// Client with the configured timeout.
    client: Client,
}

impl HttpProbe {
    /// Wrap `client`.
    pub const fn new(client: Client) -> Self {
        return Self { client };
    }
}

impl Probe for HttpProbe {
    fn head(&self, url: &str) -> Result<ProbeResponse, String> {
        let response = self.client.head(url).send().map_err(|e| return e.to_string())?;
        let retry_after = response
            .headers()
            .get(RETRY_AFTER)
            .and_then(|v| return v.to_str().ok())
            .and_then(parse_retry_after);
        return Ok(ProbeResponse {
            retry_after,
            status: response.status().as_u16(),
        });
    }
}

/// Doubling backoff for the retries of a single URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Backoff {
    /// Delay used when the server gives no `Retry-After`, in seconds.
    next_secs: u64,
}

impl Default for Backoff {
    fn default() -> Self {
        return Self {
            next_secs: INITIAL_BACKOFF_SECS,
        };
    }
}

impl Backoff {
    /// Delay before retrying after a 429, then double the stored backoff.
    ///
    /// A server-supplied `Retry-After` is raised to at least the initial backoff; both
    /// it and the stored backoff are capped.
    pub fn delay(&mut self, retry_after: Option<u64>) -> Duration {
        let secs = match retry_after {
            None => self.next_secs,
            Some(server) => server.max(INITIAL_BACKOFF_SECS).min(MAX_BACKOFF_SECS),
        };
        self.next_secs = self.next_secs.saturating_mul(2).min(MAX_BACKOFF_SECS);
        return Duration::from_secs(secs);
    }
}

/// `Retry-After` as whole seconds. The HTTP-date form yields `None`, so the
/// caller falls back to its own backoff.
pub fn parse_retry_after(value: &str) -> Option<u64> {
    return value.trim().parse::<u64>().ok();
}

/// Final status for `url`, retrying for as long as the server answers 429.
/// Every URL starts from the initial backoff.
/// A request that gets no response yields [`UNREACHABLE_STATUS`].
pub fn probe_status(probe: &dyn Probe, url: &str, sleep: &mut dyn FnMut(Duration)) -> u16 {
    let mut backoff = Backoff::default();
    loop {
        let response = match probe.head(url) {
            Err(reason) => {
                debug!(%url, %reason, "request failed");
                return UNREACHABLE_STATUS;
            },
            Ok(r) => r,
        };

        if response.status != StatusCode::TOO_MANY_REQUESTS.as_u16() {
            return response.status;
        }

        let delay = backoff.delay(response.retry_after);
        warn!(%url, seconds = delay.as_secs(), "rate limited, backing off");
        sleep(delay);
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::collections::VecDeque;

    use super::*;

    struct Scripted {
        responses: RefCell<VecDeque<Result<ProbeResponse, String>>>,
    }

    impl Probe for Scripted {
        fn head(&self, _url: &str) -> Result<ProbeResponse, String> {
            return self.responses.borrow_mut().pop_front().unwrap();
        }
    }

    fn status(status: u16, retry_after: Option<u64>) -> Result<ProbeResponse, String> {
        return Ok(ProbeResponse { retry_after, status });
    }

    #[test]
    fn short_retry_after_is_raised_to_floor() {
        let probe = Scripted {
            responses: RefCell::new(VecDeque::from([status(429, Some(5)), status(200, None)])),
        };
        let mut slept = Vec::new();

        let result = probe_status(&probe, "https://x.test", &mut |d| slept.push(d));

        assert_eq!(result, 200);
        assert_eq!(slept, vec![Duration::from_secs(10)]);
    }

    #[test]
    fn backoff_doubles_and_caps() {
        let mut backoff = Backoff::default();
        let delays: Vec<u64> = (0..5).map(|_| backoff.delay(None).as_secs()).collect();
        assert_eq!(delays, vec![10, 20, 40, 60, 60]);
        assert_eq!(backoff.delay(Some(300)).as_secs(), 60);
    }

    #[test]
    fn retries_of_one_url_double_the_wait() {
        let probe = Scripted {
            responses: RefCell::new(VecDeque::from([
                status(429, None),
                status(429, Some(30)),
                status(429, None),
                status(404, None),
            ])),
        };
        let mut slept = Vec::new();

        let result = probe_status(&probe, "https://x.test", &mut |d| slept.push(d.as_secs()));

        assert_eq!(result, 404);
        assert_eq!(slept, vec![10, 30, 40]);
    }

    #[test]
    fn each_url_starts_from_initial_backoff() {
        let probe = Scripted {
            responses: RefCell::new(VecDeque::from([
                status(429, None),
                status(200, None),
                status(429, None),
                status(200, None),
            ])),
        };
        let mut slept = Vec::new();

        assert_eq!(probe_status(&probe, "https://a.test", &mut |d| slept.push(d.as_secs())), 200);
        assert_eq!(probe_status(&probe, "https://b.test", &mut |d| slept.push(d.as_secs())), 200);

        assert_eq!(slept, vec![10, 10]);
    }

    #[test]
    fn retry_after_accepts_seconds_only() {
        assert_eq!(parse_retry_after(" 120 "), Some(120));
        assert_eq!(parse_retry_after("Wed, 21 Oct 2026 07:28:00 GMT"), None);
        assert_eq!(parse_retry_after("-5"), None);
    }

    #[test]
    fn transport_failure_maps_to_unreachable() {
        let probe = Scripted {
            responses: RefCell::new(VecDeque::from([Err("timed out".to_string())])),
        };
        let result = probe_status(&probe, "https://x.test", &mut |_| {});
        assert_eq!(result, UNREACHABLE_STATUS);
    }
}
