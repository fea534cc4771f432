//! Sign-up automation behind a webhook.

use async_trait::async_trait;
use reqwest::{Client, Url};
use serde::Serialize;

use crate::{
    api::client,
    core::{source::SwitchInitiator, tariff::Tariff},
    prelude::*,
};

/// Asks the sign-up automation to move the account onto a tariff.
pub struct Webhook {
    client: Client,
    url: Option<Url>,
    account_number: String,
}

impl Webhook {
    /// The URL may only be absent in dry runs, which never initiate a switch.
    pub fn try_new(url: Option<Url>, account_number: String) -> Result<Self> {
        Ok(Self { client: client::try_new(client::DEFAULT_TIMEOUT)?, url, account_number })
    }
}

#[derive(Serialize)]
struct SwitchRequest<'a> {
    tariff: &'a str,
    account_number: &'a str,
    sign_up_url: String,
}

/// Octopus smart tariff sign-up page for the account.
pub fn sign_up_url(tariff: &Tariff, account_number: &str) -> Result<Url> {
    let mut url = Url::parse("https://octopus.energy/smart/")?;
    url.path_segments_mut()
        .map_err(|()| anyhow!("invalid sign-up URL"))?
        .pop_if_empty()
        .extend([tariff.external_name, "sign-up", ""]);
    url.query_pairs_mut().append_pair("accountNumber", account_number);
    Ok(url)
}

#[async_trait]
impl SwitchInitiator for Webhook {
    #[instrument(skip_all, fields(tariff = tariff.id))]
    async fn initiate(&self, tariff: &Tariff) -> Result {
        let url = self.url.as_ref().context("the switch webhook URL is not configured")?;
        let request = SwitchRequest {
            tariff: tariff.external_name,
            account_number: &self.account_number,
            sign_up_url: sign_up_url(tariff, &self.account_number)?.into(),
        };
        info!(sign_up_url = %request.sign_up_url, "requesting the switch…");
        self.client
            .post(url.clone())
            .json(&request)
            .send()
            .await
            .context("failed to call the switch webhook")?
            .error_for_status()
            .context("the switch webhook failed")?;
        Ok(())
    }
}
