use clap::Parser;
use reqwest::Url;

#[derive(Parser)]
pub struct OctopusArgs {
    /// Octopus Energy API base URL.
    #[clap(
        long = "base-url",
        env = "OCTOPUS_BASE_URL",
        default_value = "https://api.octopus.energy/v1/"
    )]
    pub base_url: Url,
}

#[derive(Parser)]
pub struct AccountArgs {
    #[clap(flatten)]
    pub octopus: OctopusArgs,

    #[clap(long = "api-key", env = "OCTOPUS_API_KEY", hide_env_values = true)]
    pub api_key: String,

    /// Account number, like `A-1B2C3D4E`.
    #[clap(long = "account-number", env = "OCTOPUS_ACCOUNT_NUMBER")]
    pub account_number: String,
}
