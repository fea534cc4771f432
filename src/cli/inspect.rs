use chrono::{Local, NaiveDate};
use clap::{Parser, Subcommand};

use crate::{
    api::octopus,
    cli::account::OctopusArgs,
    core::{
        source::RateSource,
        tariff::{self, TARIFFS},
    },
    prelude::*,
    tables::{build_products_table, build_rates_table, build_tariffs_table},
};

#[derive(Parser)]
pub struct InspectArgs {
    #[command(subcommand)]
    command: InspectCommand,
}

impl InspectArgs {
    pub async fn run(self) -> Result {
        match self.command {
            InspectCommand::Tariffs => {
                println!("{}", build_tariffs_table(TARIFFS));
                Ok(())
            }
            InspectCommand::Products(args) => {
                let products = octopus::Api::try_new(args.base_url, String::new())?
                    .fetch_products()
                    .await?;
                println!("{}", build_products_table(&products));
                Ok(())
            }
            InspectCommand::Rates(args) => args.run().await,
        }
    }
}

#[derive(Subcommand)]
enum InspectCommand {
    /// List the known tariffs.
    Tariffs,

    /// List the residential products in the catalog.
    Products(OctopusArgs),

    /// Fetch the tariff's standing charge and unit rates.
    Rates(InspectRatesArgs),
}

#[derive(Parser)]
struct InspectRatesArgs {
    #[clap(flatten)]
    octopus: OctopusArgs,

    /// Tariff ID, see `inspect tariffs`.
    #[clap(long)]
    tariff: String,

    /// Region letter, the last character of the tariff code.
    #[clap(long = "region", default_value = "C")]
    region_code: char,

    /// Day to fetch the rates for, today by default.
    #[clap(long)]
    on: Option<NaiveDate>,
}

impl InspectRatesArgs {
    #[instrument(skip_all, fields(tariff = %self.tariff))]
    async fn run(self) -> Result {
        let tariff = tariff::find_by_id(&self.tariff)
            .with_context(|| format!("unknown tariff `{}`", self.tariff))?;
        let on = self.on.unwrap_or_else(|| Local::now().date_naive());
        let schedule = octopus::Api::try_new(self.octopus.base_url, String::new())?
            .fetch_rates(tariff, self.region_code.to_ascii_uppercase(), on)
            .await?;
        info!(n_rates = schedule.intervals().len(), "gotcha");
        println!("{tariff} in region {}: {} per day", self.region_code, schedule.standing_charge);
        println!("{}", build_rates_table(&schedule));
        Ok(())
    }
}
