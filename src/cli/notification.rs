use clap::Parser;
use reqwest::Url;

use crate::{api::notify::Webhooks, prelude::*};

#[derive(Parser)]
pub struct NotificationArgs {
    /// Apprise-compatible webhooks, which receive every report.
    #[clap(
        long = "notification-urls",
        env = "NOTIFICATION_URLS",
        value_delimiter = ',',
        num_args = 0..
    )]
    pub urls: Vec<Url>,

    #[clap(long = "notification-title", env = "NOTIFICATION_TITLE", default_value = "Octohop")]
    pub title: String,

    /// Give up delivering a notification after this long.
    #[clap(id = "notification_timeout", long = "notification-timeout", env = "NOTIFICATION_TIMEOUT", default_value = "5s")]
    pub timeout: humantime::Duration,
}

impl NotificationArgs {
    pub fn webhooks(&self) -> Result<Webhooks> {
        if self.urls.is_empty() {
            warn!("no notification URLs configured, the reports only go to the log");
        }
        Webhooks::try_new(self.urls.clone(), self.title.clone(), self.timeout.into())
    }
}
