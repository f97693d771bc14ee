//! Blocking HTTP plumbing shared by index fetching and link probing.

use std::time::Duration;

use reqwest::blocking::Client;

use crate::error::Error;

/// Build the client used for every request of a run.
///
/// # Errors
///
/// Returns `Error::Http` if the TLS backend cannot be initialised.
pub fn build_client(timeout_secs: u64) -> Result<Client, Error> {
    let client = Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .user_agent(concat!("portalref/", env!("CARGO_PKG_VERSION")))
        .build()?;
    return Ok(client);
}

/// GET `url` and return the body. Single attempt, no retry.
///
/// # Errors
///
/// Returns `Error::Connectivity` if the request fails, the status is not 2xx, or the
/// body cannot be read.
pub fn get_bytes(
    client: &Client,
    url: &str,
    credentials: Option<&(String, String)>,
) -> Result<Vec<u8>, Error> {
    let mut request = client.get(url);
    if let Some((user, token)) = credentials {
        request = request.basic_auth(user, Some(token));
    }

    let response = request.send().map_err(|e| return connectivity(url, &e))?;
    let status = response.status();
    if !status.is_success() {
        return Err(Error::Connectivity {
            reason: format!("status {}", status.as_u16()),
            url: url.to_string(),
        });
    }

    let body = response.bytes().map_err(|e| return connectivity(url, &e))?;
    return Ok(body.to_vec());
}

/// Wrap a transport error for `url`.
fn connectivity(url: &str, err: &reqwest::Error) -> Error {
    return Error::Connectivity {
        reason: err.to_string(),
        url: url.to_string(),
    };
}
