//! Apprise-compatible notification webhooks.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Url};
use serde::Serialize;

use crate::{api::client, core::source::Notifier, prelude::*};

pub struct Webhooks {
    client: Client,
    urls: Vec<Url>,
    title: String,
}

impl Webhooks {
    /// Every delivery gives up after the timeout, so that a slow notification service only holds
    /// the run up briefly.
    pub fn try_new(urls: Vec<Url>, title: String, timeout: Duration) -> Result<Self> {
        Ok(Self { client: client::try_new(timeout)?, urls, title })
    }

    /// Discord renders the plain-text reports best as inline code.
    fn format_body(&self, message: &str) -> String {
        let is_only_discord = !self.urls.is_empty()
            && self.urls.iter().all(|url| url.as_str().to_lowercase().contains("discord"));
        if is_only_discord { format!("`{message}`") } else { message.to_owned() }
    }

    #[instrument(skip_all, level = Level::DEBUG, fields(host = url.host_str()))]
    async fn send(&self, url: &Url, body: &str) -> Result {
        #[derive(Serialize)]
        struct Notification<'a> {
            title: &'a str,
            body: &'a str,
        }

        self.client
            .post(url.clone())
            .json(&Notification { title: &self.title, body })
            .send()
            .await
            .context("failed to send the notification")?
            .error_for_status()
            .context("the notification service failed")?;
        Ok(())
    }
}

#[async_trait]
impl Notifier for Webhooks {
    async fn notify(&self, message: &str) {
        info!("{message}");
        let body = self.format_body(message);
        for url in &self.urls {
            if let Err(error) = self.send(url, &body).await {
                warn!(host = url.host_str(), "failed to notify: {error:#}");
            }
        }
    }
}
