use std::collections::HashMap;

use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::Url;
use serde::Deserialize;

use crate::{
    api::octopus::{Api, local_day},
    core::{
        error::RateNotFoundError,
        rates::{RateInterval, RateSchedule},
        source::RateSource,
        tariff::Tariff,
    },
    prelude::*,
    quantity::cost::Cost,
};

/// Catalog entry.
#[derive(Debug, Deserialize)]
pub struct Product {
    pub code: String,
    pub direction: String,
    pub display_name: String,

    #[serde(default)]
    links: Vec<Link>,
}

impl Product {
    #[must_use]
    pub fn is_import(&self) -> bool {
        self.direction == "IMPORT"
    }
}

#[derive(Debug, Deserialize)]
struct Link {
    href: String,
    rel: String,
}

#[derive(Deserialize)]
struct ProductDetails {
    #[serde(default)]
    single_register_electricity_tariffs: HashMap<String, RegionTariffs>,
}

/// Pricing variants available in a region.
#[derive(Deserialize)]
struct RegionTariffs {
    direct_debit_monthly: Option<RegionTariff>,
    varying: Option<RegionTariff>,
}

#[derive(Deserialize)]
struct RegionTariff {
    standing_charge_inc_vat: Option<Cost>,

    #[serde(default)]
    links: Vec<Link>,
}

fn find_link<'a>(links: &'a [Link], rel: &str) -> Option<&'a str> {
    links.iter().find(|link| link.rel.eq_ignore_ascii_case(rel)).map(|link| link.href.as_str())
}

fn find_product<'a>(products: &'a [Product], tariff: &Tariff) -> Option<&'a Product> {
    products
        .iter()
        .find(|product| product.display_name == tariff.product_name && product.is_import())
}

/// Standing charge and the unit rates link of the region, preferring the fixed direct debit prices.
fn find_region_tariff(
    details: &ProductDetails,
    region_code: char,
) -> Result<(Cost, &str), RateNotFoundError> {
    let region_key = format!("_{region_code}");
    let region_tariffs = details
        .single_register_electricity_tariffs
        .get(&region_key)
        .ok_or_else(|| RateNotFoundError::new(region_key.clone()))?;
    let region_tariff = region_tariffs
        .direct_debit_monthly
        .as_ref()
        .or(region_tariffs.varying.as_ref())
        .ok_or_else(|| RateNotFoundError::new(format!("{region_key}.direct_debit_monthly")))?;
    let standing_charge = region_tariff
        .standing_charge_inc_vat
        .ok_or_else(|| RateNotFoundError::new("standing_charge_inc_vat"))?;
    let unit_rates_link = find_link(&region_tariff.links, "standard_unit_rates")
        .ok_or_else(|| RateNotFoundError::new("standard_unit_rates"))?;
    Ok((standing_charge, unit_rates_link))
}

impl Api {
    /// Fetch the residential Octopus Energy product catalog.
    #[instrument(skip_all)]
    pub async fn fetch_products(&self) -> Result<Vec<Product>> {
        let mut url = self.url(&["products", ""])?;
        url.query_pairs_mut()
            .append_pair("brand", "OCTOPUS_ENERGY")
            .append_pair("is_business", "false");
        let products: Vec<Product> =
            self.get_all_pages(url).await.context("failed to fetch the products")?;
        info!(n_products = products.len(), "fetched");
        Ok(products)
    }

    #[instrument(skip_all, fields(url = %url, on = %on))]
    async fn fetch_unit_rates(&self, url: &str, on: NaiveDate) -> Result<Vec<RateInterval>> {
        let day = local_day(on)?;
        let mut url =
            Url::parse(url).with_context(|| format!("invalid unit rates URL `{url}`"))?;
        url.query_pairs_mut()
            .append_pair("period_from", &day.start.to_rfc3339())
            .append_pair("period_to", &day.end.to_rfc3339());
        let rates: Vec<RateInterval> =
            self.get_all_pages(url).await.context("failed to fetch the unit rates")?;
        info!(n_rates = rates.len(), "fetched");
        Ok(rates)
    }
}

#[async_trait]
impl RateSource for Api {
    #[instrument(skip_all, fields(tariff = tariff.id, region_code = %region_code, on = %on))]
    async fn fetch_rates(
        &self,
        tariff: &Tariff,
        region_code: char,
        on: NaiveDate,
    ) -> Result<RateSchedule> {
        let products = self.fetch_products().await?;
        let product = find_product(&products, tariff).ok_or_else(|| {
            RateNotFoundError::new(format!("product `{}`", tariff.product_name))
        })?;
        info!(code = %product.code, "found the product");

        let self_link =
            find_link(&product.links, "self").ok_or_else(|| RateNotFoundError::new("self"))?;
        let self_link = Url::parse(self_link)
            .with_context(|| format!("invalid product link `{self_link}`"))?;
        let details: ProductDetails = self
            .get(self_link)
            .await
            .with_context(|| format!("failed to fetch the product `{}`", product.code))?;

        let (standing_charge, unit_rates_link) = find_region_tariff(&details, region_code)?;
        let intervals = self.fetch_unit_rates(unit_rates_link, on).await?;
        Ok(RateSchedule::new(standing_charge, intervals))
    }
}
