//! [Octopus Energy](https://developer.octopus.energy/) REST and Kraken GraphQL client.

mod account;
mod enrolment;
mod graphql;
mod products;

use std::ops::Range;

use chrono::{DateTime, Local, NaiveDate, TimeDelta};
use http::HeaderValue;
use reqwest::{Client, Url};
use serde::{Deserialize, Serialize, de::DeserializeOwned};

pub use self::products::Product;
use self::graphql::Response;
use crate::{api::client, prelude::*};

pub struct Api {
    client: Client,
    base_url: Url,
    account_number: String,

    /// Kraken token, obtained once per run.
    token: Option<HeaderValue>,
}

impl Api {
    pub fn try_new(base_url: Url, account_number: String) -> Result<Self> {
        Ok(Self { client: client::try_new(client::DEFAULT_TIMEOUT)?, base_url, account_number, token: None })
    }

    #[must_use]
    pub fn account_number(&self) -> &str {
        &self.account_number
    }

    /// Exchange the API key for a Kraken token, which authorizes the subsequent GraphQL calls.
    #[instrument(skip_all)]
    pub async fn authenticate(&mut self, api_key: &str) -> Result {
        const QUERY: &str = r"
            mutation ObtainKrakenToken($input: ObtainJSONWebTokenInput!) {
                obtainKrakenToken(input: $input) {
                    token
                }
            }
        ";

        #[derive(Serialize)]
        struct Variables<'a> {
            input: Input<'a>,
        }

        #[derive(Serialize)]
        struct Input<'a> {
            #[serde(rename = "APIKey")]
            api_key: &'a str,
        }

        #[derive(Deserialize)]
        #[serde(rename_all = "camelCase")]
        struct Data {
            obtain_kraken_token: Token,
        }

        #[derive(Deserialize)]
        struct Token {
            token: String,
        }

        info!("obtaining a token…");
        let data: Data = self
            .graphql(QUERY, Variables { input: Input { api_key } })
            .await
            .context("failed to obtain a Kraken token")?;
        let mut token = HeaderValue::from_str(&data.obtain_kraken_token.token)
            .context("the token is not a valid header value")?;
        token.set_sensitive(true);
        self.token = Some(token);
        Ok(())
    }

    #[instrument(skip_all, level = Level::DEBUG)]
    async fn graphql<V: Serialize, R: DeserializeOwned>(
        &self,
        query: &'static str,
        variables: V,
    ) -> Result<R> {
        #[derive(Serialize)]
        struct Request<V> {
            query: &'static str,
            variables: V,
        }

        let url = self.url(&["graphql", ""])?;
        let mut request = self.client.post(url).json(&Request { query, variables });
        if let Some(token) = &self.token {
            request = request.header("Authorization", token.clone());
        }
        let data = Result::<serde_json::Value>::from(
            request
                .send()
                .await
                .context("failed to call the GraphQL API")?
                .error_for_status()
                .context("GraphQL request failed")?
                .json::<Response>()
                .await
                .context("failed to deserialize the GraphQL response JSON")?,
        )?;
        debug!(?data, "call succeeded");
        serde_json::from_value(data).context("failed to deserialize the GraphQL response data")
    }

    #[instrument(skip_all, level = Level::DEBUG, fields(url = %url))]
    async fn get<R: DeserializeOwned>(&self, url: Url) -> Result<R> {
        self.client
            .get(url.clone())
            .send()
            .await
            .with_context(|| format!("failed to call `{url}`"))?
            .error_for_status()
            .with_context(|| format!("`{url}` failed"))?
            .json()
            .await
            .with_context(|| format!("failed to deserialize `{url}` response"))
    }

    /// Follow the `next` links and collect the results from every page.
    async fn get_all_pages<T: DeserializeOwned>(&self, url: Url) -> Result<Vec<T>> {
        let mut results = Vec::new();
        let mut next_url = Some(url);
        while let Some(url) = next_url {
            let page: Page<T> = self.get(url).await?;
            results.extend(page.results);
            next_url = page
                .next
                .map(|next| Url::parse(&next))
                .transpose()
                .context("invalid next page URL")?;
        }
        debug!(n_results = results.len(), "fetched all pages");
        Ok(results)
    }

    /// Build an endpoint URL relative to the base URL.
    ///
    /// The trailing empty segment produces the trailing slash the API expects.
    fn url(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| anyhow!("invalid base URL"))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }
}

/// Paginated REST response.
#[derive(Deserialize)]
struct Page<T> {
    next: Option<String>,
    results: Vec<T>,
}

/// Local day as a half-open time range.
fn local_day(on: NaiveDate) -> Result<Range<DateTime<Local>>> {
    let start = on
        .and_hms_opt(0, 0, 0)
        .and_then(|midnight| midnight.and_local_timezone(Local).earliest())
        .with_context(|| format!("no local midnight on {on}"))?;
    let end = on
        .succ_opt()
        .and_then(|next| next.and_hms_opt(0, 0, 0))
        .and_then(|midnight| midnight.and_local_timezone(Local).earliest())
        .unwrap_or(start + TimeDelta::days(1));
    Ok(start..end)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_url_keeps_base_path() -> Result {
        let api = Api::try_new(Url::parse("https://api.octopus.energy/v1/")?, "A-123".to_owned())?;
        assert_eq!(api.url(&["graphql", ""])?.as_str(), "https://api.octopus.energy/v1/graphql/");
        assert_eq!(
            api.url(&["products", "AGILE-24-10-01", ""])?.as_str(),
            "https://api.octopus.energy/v1/products/AGILE-24-10-01/",
        );
        Ok(())
    }

    #[test]
    fn test_local_day() -> Result {
        let on = NaiveDate::from_ymd_opt(2025, 3, 14).unwrap();
        let day = local_day(on)?;
        assert_eq!(day.start.date_naive(), on);
        assert_eq!(day.end.date_naive(), on.succ_opt().unwrap());
        Ok(())
    }

    #[test]
    fn test_deserialize_page_ok() -> Result {
        // language=JSON
        const RESPONSE: &str = r#"
            {
                "count": 3,
                "next": "https://api.octopus.energy/v1/products/?page=2",
                "previous": null,
                "results": [1, 2]
            }
        "#;
        let page: Page<u32> = serde_json::from_str(RESPONSE)?;
        assert_eq!(page.results, [1, 2]);
        assert_eq!(page.next.as_deref(), Some("https://api.octopus.energy/v1/products/?page=2"));
        Ok(())
    }
}
