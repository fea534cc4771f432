use itertools::Itertools;
use serde::Deserialize;

use crate::prelude::*;

/// Generic GraphQL response.
///
/// The data is first read into [`serde_json::Value`] in order to log it, and only then parsed.
#[derive(Deserialize)]
pub struct Response {
    data: Option<serde_json::Value>,

    #[serde(default)]
    errors: Vec<ResponseError>,
}

#[derive(Deserialize)]
struct ResponseError {
    message: String,
}

impl From<Response> for Result<serde_json::Value> {
    fn from(response: Response) -> Self {
        if !response.errors.is_empty() {
            bail!(
                "GraphQL error: {}",
                response.errors.iter().map(|error| error.message.as_str()).join("; "),
            );
        }
        response.data.context("GraphQL response has no data")
    }
}
