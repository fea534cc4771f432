use std::time::Duration;

use reqwest::Client;

use crate::prelude::*;

/// Default timeout of the API calls.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Build a client, which gives up on every request after the timeout.
pub fn try_new(timeout: Duration) -> Result<Client> {
    Client::builder()
        .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
        .timeout(timeout)
        .build()
        .context("failed to build the HTTP client")
}
