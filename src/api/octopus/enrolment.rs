use async_trait::async_trait;
use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

use crate::{
    api::octopus::Api,
    core::source::{Enrolment, EnrolmentStage, EnrolmentStatus, Enrolments, TermsVersion},
    prelude::*,
};

const ENROLMENTS_QUERY: &str = r"
    query ProductEnrolments($accountNumber: String!) {
        productEnrolments(accountNumber: $accountNumber) {
            id
            status
            product {
                code
            }
            stages {
                name
                status
                steps {
                    name
                    status
                    updatedAt
                }
            }
        }
    }
";

const TERMS_QUERY: &str = r"
    query TermsAndConditions($productCode: String!) {
        termsAndConditionsForProduct(productCode: $productCode) {
            name
            version
            effectiveFrom
        }
    }
";

const ACCEPT_TERMS_MUTATION: &str = r"
    mutation AcceptTermsAndConditions($input: AcceptTermsAndConditionsInput!) {
        acceptTermsAndConditions(input: $input) {
            acceptedVersion
        }
    }
";

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct EnrolmentsData {
    #[serde(default)]
    product_enrolments: Vec<ProductEnrolment>,
}

#[derive(Deserialize)]
struct ProductEnrolment {
    id: String,
    status: EnrolmentStatus,
    product: Option<EnrolmentProduct>,

    #[serde(default)]
    stages: Vec<Stage>,
}

#[derive(Deserialize)]
struct EnrolmentProduct {
    code: Option<String>,
}

#[derive(Deserialize)]
struct Stage {
    name: String,
    status: EnrolmentStatus,

    #[serde(default)]
    steps: Vec<Step>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Step {
    updated_at: Option<DateTime<Local>>,
}

impl From<ProductEnrolment> for Enrolment {
    fn from(enrolment: ProductEnrolment) -> Self {
        Self {
            id: enrolment.id,
            status: enrolment.status,
            product_code: enrolment.product.and_then(|product| product.code),
            stages: enrolment
                .stages
                .into_iter()
                .map(|stage| EnrolmentStage {
                    name: stage.name,
                    status: stage.status,
                    step_dates: stage
                        .steps
                        .into_iter()
                        .filter_map(|step| step.updated_at)
                        .map(|updated_at| updated_at.date_naive())
                        .collect(),
                })
                .collect(),
        }
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct TermsData {
    terms_and_conditions_for_product: Option<Terms>,
}

#[derive(Deserialize)]
struct Terms {
    version: Option<String>,
}

#[derive(Serialize)]
struct AcceptTermsVariables<'a> {
    input: AcceptTermsInput<'a>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct AcceptTermsInput<'a> {
    account_number: &'a str,
    enrolment_id: &'a str,
    terms_version: AcceptTermsVersion,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct AcceptTermsVersion {
    version_major: u32,
    version_minor: u32,
}

#[async_trait]
impl Enrolments for Api {
    #[instrument(skip_all, fields(account_number = %self.account_number))]
    async fn list_enrolments(&self) -> Result<Vec<Enrolment>> {
        #[derive(Serialize)]
        #[serde(rename_all = "camelCase")]
        struct Variables<'a> {
            account_number: &'a str,
        }

        let data: EnrolmentsData = self
            .graphql(ENROLMENTS_QUERY, Variables { account_number: &self.account_number })
            .await
            .context("failed to fetch the product enrolments")?;
        Ok(data.product_enrolments.into_iter().map(Enrolment::from).collect())
    }

    #[instrument(skip_all, fields(product_code = product_code))]
    async fn get_terms_version(&self, product_code: &str) -> Result<TermsVersion> {
        #[derive(Serialize)]
        #[serde(rename_all = "camelCase")]
        struct Variables<'a> {
            product_code: &'a str,
        }

        let data: TermsData = self
            .graphql(TERMS_QUERY, Variables { product_code })
            .await
            .context("failed to fetch the terms and conditions")?;
        let version = data.terms_and_conditions_for_product.and_then(|terms| terms.version);
        let version = TermsVersion::parse_or_default(version.as_deref());
        info!(%version, "fetched");
        Ok(version)
    }

    #[instrument(skip_all, fields(enrolment_id = enrolment_id, version = %version))]
    async fn accept_terms(&self, enrolment_id: &str, version: TermsVersion) -> Result {
        let variables = AcceptTermsVariables {
            input: AcceptTermsInput {
                account_number: &self.account_number,
                enrolment_id,
                terms_version: AcceptTermsVersion {
                    version_major: version.major,
                    version_minor: version.minor,
                },
            },
        };
        let _: serde_json::Value = self
            .graphql(ACCEPT_TERMS_MUTATION, variables)
            .await
            .context("failed to accept the terms and conditions")?;
        info!("accepted");
        Ok(())
    }
}
