use async_trait::async_trait;
use chrono::{DateTime, Local, NaiveDate, TimeDelta};
use serde::{Deserialize, Serialize};
use serde_with::{DisplayFromStr, PickFirst, serde_as};

use crate::{
    api::octopus::{Api, local_day},
    core::{
        account::{AccountSnapshot, ConsumptionInterval},
        error::{LookupError, UnsupportedTariffError},
        source::AccountSource,
        tariff::{self, Tariff},
    },
    prelude::*,
    quantity::{cost::Cost, energy::KilowattHours},
};

const ACCOUNT_QUERY: &str = r"
    query Account($accountNumber: String!) {
        account(accountNumber: $accountNumber) {
            electricityAgreements(active: true) {
                validFrom
                tariff {
                    ... on TariffType {
                        tariffCode
                        productCode
                        standingCharge
                    }
                }
                meterPoint {
                    meters(includeInactive: false) {
                        smartDevices {
                            deviceId
                        }
                    }
                }
            }
        }
    }
";

const TELEMETRY_QUERY: &str = r"
    query Telemetry($deviceId: String!, $start: DateTime!, $end: DateTime!) {
        smartMeterTelemetry(deviceId: $deviceId, grouping: HALF_HOURLY, start: $start, end: $end) {
            readAt
            consumptionDelta
            costDeltaWithTax
        }
    }
";

#[derive(Deserialize)]
struct AccountData {
    account: Account,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Account {
    electricity_agreements: Vec<Agreement>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Agreement {
    valid_from: Option<DateTime<Local>>,

    tariff: Option<AgreementTariff>,

    meter_point: Option<MeterPoint>,
}

/// Tariff types other than `TariffType` come back as empty objects.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct AgreementTariff {
    tariff_code: Option<String>,
    product_code: Option<String>,
    standing_charge: Option<Cost>,
}

#[derive(Deserialize)]
struct MeterPoint {
    #[serde(default)]
    meters: Vec<Meter>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Meter {
    #[serde(default)]
    smart_devices: Vec<SmartDevice>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SmartDevice {
    device_id: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct TelemetryData {
    smart_meter_telemetry: Option<Vec<Telemetry>>,
}

/// Smart meter reading, the deltas come as strings or numbers.
#[serde_as]
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Telemetry {
    read_at: DateTime<Local>,

    /// Watt-hours.
    #[serde_as(as = "PickFirst<(_, DisplayFromStr)>")]
    consumption_delta: f64,

    /// Pence.
    #[serde_as(as = "Option<PickFirst<(_, DisplayFromStr)>>")]
    cost_delta_with_tax: Option<f64>,
}

impl From<Telemetry> for ConsumptionInterval {
    fn from(telemetry: Telemetry) -> Self {
        Self {
            read_at: telemetry.read_at,
            energy: KilowattHours::from_watt_hours(telemetry.consumption_delta),
            cost: telemetry.cost_delta_with_tax.map(Cost::from_pence),
        }
    }
}

fn find_tariff_code(agreements: &[Agreement]) -> Option<&str> {
    agreements.iter().find_map(|agreement| agreement.tariff.as_ref()?.tariff_code.as_deref())
}

fn find_product_code(agreements: &[Agreement]) -> Option<&str> {
    agreements.iter().find_map(|agreement| agreement.tariff.as_ref()?.product_code.as_deref())
}

fn find_standing_charge(agreements: &[Agreement]) -> Option<Cost> {
    agreements.iter().find_map(|agreement| agreement.tariff.as_ref()?.standing_charge)
}

fn find_device_id(agreements: &[Agreement]) -> Option<&str> {
    agreements
        .iter()
        .filter_map(|agreement| agreement.meter_point.as_ref())
        .flat_map(|meter_point| &meter_point.meters)
        .flat_map(|meter| &meter.smart_devices)
        .find_map(|device| device.device_id.as_deref())
}

/// Everything the snapshot needs from the agreements.
#[derive(Debug)]
struct ResolvedAgreement<'a> {
    tariff: &'static Tariff,
    region_code: char,
    product_code: &'a str,
    standing_charge: Cost,
    device_id: &'a str,
}

impl<'a> ResolvedAgreement<'a> {
    fn resolve(agreements: &'a [Agreement]) -> Result<Self> {
        ensure!(!agreements.is_empty(), LookupError::NoAgreement);
        let tariff_code = find_tariff_code(agreements).ok_or(LookupError::NoTariffCode)?;
        let product_code = find_product_code(agreements).ok_or(LookupError::NoProductCode)?;
        let device_id = find_device_id(agreements).ok_or(LookupError::NoDevice)?;
        let standing_charge =
            find_standing_charge(agreements).ok_or(LookupError::NoStandingCharge)?;
        let region_code = tariff::region_code(tariff_code)
            .ok_or_else(|| UnsupportedTariffError(tariff_code.to_owned()))?;
        let tariff = tariff::find_by_code(tariff_code)
            .ok_or_else(|| UnsupportedTariffError(tariff_code.to_owned()))?;
        Ok(Self { tariff, region_code, product_code, standing_charge, device_id })
    }
}

impl Api {
    #[instrument(skip_all, fields(account_number = %self.account_number))]
    async fn fetch_agreements(&self) -> Result<Vec<Agreement>> {
        #[derive(Serialize)]
        #[serde(rename_all = "camelCase")]
        struct Variables<'a> {
            account_number: &'a str,
        }

        let data: AccountData = self
            .graphql(ACCOUNT_QUERY, Variables { account_number: &self.account_number })
            .await
            .context("failed to fetch the account")?;
        info!(n_agreements = data.account.electricity_agreements.len(), "fetched");
        Ok(data.account.electricity_agreements)
    }

    #[instrument(skip_all, fields(device_id = device_id, on = %on))]
    async fn fetch_telemetry(
        &self,
        device_id: &str,
        on: NaiveDate,
    ) -> Result<Vec<ConsumptionInterval>> {
        #[derive(Serialize)]
        #[serde(rename_all = "camelCase")]
        struct Variables<'a> {
            device_id: &'a str,
            start: DateTime<Local>,
            end: DateTime<Local>,
        }

        let day = local_day(on)?;
        let variables =
            Variables { device_id, start: day.start, end: day.end - TimeDelta::seconds(1) };
        let data: TelemetryData = self
            .graphql(TELEMETRY_QUERY, variables)
            .await
            .context("failed to fetch the smart meter telemetry")?;
        let mut consumption: Vec<ConsumptionInterval> = data
            .smart_meter_telemetry
            .unwrap_or_default()
            .into_iter()
            .map(ConsumptionInterval::from)
            .collect();
        consumption.sort_by_key(|interval| interval.read_at);
        info!(n_intervals = consumption.len(), "fetched");
        Ok(consumption)
    }
}

#[async_trait]
impl AccountSource for Api {
    #[instrument(skip_all, fields(on = %on))]
    async fn fetch_snapshot(&self, on: NaiveDate) -> Result<AccountSnapshot> {
        let agreements = self.fetch_agreements().await?;
        let agreement = ResolvedAgreement::resolve(&agreements)?;
        info!(
            tariff = agreement.tariff.id,
            region_code = %agreement.region_code,
            product_code = agreement.product_code,
            "resolved the current agreement",
        );
        let consumption = self.fetch_telemetry(agreement.device_id, on).await?;
        Ok(AccountSnapshot {
            tariff: agreement.tariff,
            standing_charge: agreement.standing_charge,
            region_code: agreement.region_code,
            product_code: agreement.product_code.to_owned(),
            consumption,
        })
    }

    async fn fetch_agreement_start_dates(&self) -> Result<Vec<NaiveDate>> {
        Ok(self
            .fetch_agreements()
            .await?
            .into_iter()
            .filter_map(|agreement| agreement.valid_from)
            .map(|valid_from| valid_from.date_naive())
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_abs_diff_eq;

    use super::*;

    // language=JSON
    const ACCOUNT_RESPONSE: &str = r#"
        {
            "account": {
                "electricityAgreements": [
                    {
                        "validFrom": "2025-03-01T00:00:00+00:00",
                        "tariff": {
                            "tariffCode": "E-1R-AGILE-24-10-01-C",
                            "productCode": "AGILE-24-10-01",
                            "standingCharge": 47.85
                        },
                        "meterPoint": {
                            "meters": [
                                {"smartDevices": []},
                                {"smartDevices": [{"deviceId": "00-11-22-33-44-55-66-77"}]}
                            ]
                        }
                    }
                ]
            }
        }
    "#;

    #[test]
    fn test_resolve_agreement_ok() -> Result {
        let data: AccountData = serde_json::from_str(ACCOUNT_RESPONSE)?;
        let agreement = ResolvedAgreement::resolve(&data.account.electricity_agreements)?;
        assert_eq!(agreement.tariff.id, "agile");
        assert_eq!(agreement.region_code, 'C');
        assert_eq!(agreement.product_code, "AGILE-24-10-01");
        assert_eq!(agreement.device_id, "00-11-22-33-44-55-66-77");
        assert_abs_diff_eq!(agreement.standing_charge.as_pence(), 47.85);
        Ok(())
    }

    #[test]
    fn test_resolve_agreement_no_device() -> Result {
        // language=JSON
        const RESPONSE: &str = r#"
            {
                "account": {
                    "electricityAgreements": [
                        {
                            "validFrom": "2025-03-01T00:00:00+00:00",
                            "tariff": {
                                "tariffCode": "E-1R-AGILE-24-10-01-C",
                                "productCode": "AGILE-24-10-01",
                                "standingCharge": 47.85
                            },
                            "meterPoint": {"meters": [{"smartDevices": []}]}
                        }
                    ]
                }
            }
        "#;
        let data: AccountData = serde_json::from_str(RESPONSE)?;
        let error = ResolvedAgreement::resolve(&data.account.electricity_agreements).unwrap_err();
        assert!(matches!(error.downcast_ref::<LookupError>(), Some(LookupError::NoDevice)));
        Ok(())
    }

    #[test]
    fn test_resolve_agreement_unsupported_tariff() -> Result {
        let json = ACCOUNT_RESPONSE.replace("E-1R-AGILE-24-10-01-C", "E-1R-OE-FIX-12M-24-01-01-C");
        let data: AccountData = serde_json::from_str(&json)?;
        let error = ResolvedAgreement::resolve(&data.account.electricity_agreements).unwrap_err();
        let error = error.downcast_ref::<UnsupportedTariffError>().unwrap();
        assert_eq!(error.0, "E-1R-OE-FIX-12M-24-01-01-C");
        Ok(())
    }

    #[test]
    fn test_resolve_agreement_empty() {
        let error = ResolvedAgreement::resolve(&[]).unwrap_err();
        assert!(matches!(error.downcast_ref::<LookupError>(), Some(LookupError::NoAgreement)));
    }

    #[test]
    fn test_non_tariff_type_is_empty() -> Result {
        // language=JSON
        const RESPONSE: &str = r#"
            {
                "account": {
                    "electricityAgreements": [
                        {"validFrom": null, "tariff": {}, "meterPoint": null}
                    ]
                }
            }
        "#;
        let data: AccountData = serde_json::from_str(RESPONSE)?;
        let error = ResolvedAgreement::resolve(&data.account.electricity_agreements).unwrap_err();
        assert!(matches!(error.downcast_ref::<LookupError>(), Some(LookupError::NoTariffCode)));
        Ok(())
    }

    #[test]
    fn test_deserialize_telemetry_ok() -> Result {
        // language=JSON
        const RESPONSE: &str = r#"
            {
                "smartMeterTelemetry": [
                    {
                        "readAt": "2025-03-14T00:29:59+00:00",
                        "consumptionDelta": "125.0",
                        "costDeltaWithTax": "3.0581"
                    },
                    {
                        "readAt": "2025-03-14T00:59:59+00:00",
                        "consumptionDelta": 250,
                        "costDeltaWithTax": null
                    }
                ]
            }
        "#;
        let data: TelemetryData = serde_json::from_str(RESPONSE)?;
        let consumption: Vec<ConsumptionInterval> = data
            .smart_meter_telemetry
            .unwrap()
            .into_iter()
            .map(ConsumptionInterval::from)
            .collect();
        assert_eq!(consumption.len(), 2);
        assert_abs_diff_eq!(consumption[0].energy.0.0, 0.125);
        assert_abs_diff_eq!(consumption[0].cost.unwrap().as_pence(), 3.0581);
        assert_abs_diff_eq!(consumption[1].energy.0.0, 0.25);
        assert!(consumption[1].cost.is_none());
        Ok(())
    }
}
