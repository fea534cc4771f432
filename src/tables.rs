use comfy_table::{Attribute, Cell, CellAlignment, Color, Table, modifiers, presets};

use crate::{
    api::octopus::Product,
    core::{
        decision::{Comparison, Decision},
        rates::{PaymentMethod, RateSchedule},
        tariff::{self, Tariff},
    },
};

fn new_table() -> Table {
    let mut table = Table::new();
    table.load_preset(presets::UTF8_FULL_CONDENSED).apply_modifier(modifiers::UTF8_ROUND_CORNERS);
    table.enforce_styling();
    table
}

#[must_use]
pub fn build_tariffs_table(tariffs: &[Tariff]) -> Table {
    let mut table = new_table();
    table.set_header(vec!["ID", "Name", "Catalog name", "Sign-up name", "Switchable"]);
    for tariff in tariffs {
        table.add_row(vec![
            Cell::new(tariff.id).add_attribute(Attribute::Bold),
            Cell::new(tariff.display_name),
            Cell::new(tariff.product_name),
            Cell::new(tariff.external_name).add_attribute(Attribute::Dim),
            if tariff.is_switchable {
                Cell::new("yes").fg(Color::Green)
            } else {
                Cell::new("no").fg(Color::DarkYellow)
            },
        ]);
    }
    table
}

#[must_use]
pub fn build_products_table(products: &[Product]) -> Table {
    let mut table = new_table();
    table.set_header(vec!["Code", "Name", "Direction", "Tariff ID"]);
    for product in products {
        let tariff =
            tariff::TARIFFS.iter().find(|tariff| tariff.matches_product_code(&product.code));
        table.add_row(vec![
            Cell::new(&product.code).add_attribute(Attribute::Bold),
            Cell::new(&product.display_name),
            if product.is_import() {
                Cell::new(&product.direction)
            } else {
                Cell::new(&product.direction).fg(Color::DarkGrey)
            },
            tariff.map_or_else(
                || Cell::new("unsupported").fg(Color::DarkGrey),
                |tariff| Cell::new(tariff.id).fg(Color::Green),
            ),
        ]);
    }
    table
}

#[must_use]
pub fn build_rates_table(schedule: &RateSchedule) -> Table {
    let mut table = new_table();
    table.set_header(vec!["From", "To", "Unit rate", "Payment"]);
    for interval in schedule.intervals() {
        table.add_row(vec![
            Cell::new(interval.valid_from.format("%Y-%m-%d %H:%M")),
            Cell::new(
                interval
                    .valid_to
                    .map_or_else(|| "…".to_owned(), |to| to.format("%Y-%m-%d %H:%M").to_string()),
            )
            .add_attribute(Attribute::Dim),
            Cell::new(interval.unit_rate).set_alignment(CellAlignment::Right),
            match interval.payment_method {
                None => Cell::new("any"),
                Some(PaymentMethod::DirectDebit) => Cell::new("direct debit"),
                Some(PaymentMethod::NonDirectDebit) => {
                    Cell::new("non-direct debit").fg(Color::DarkGrey)
                }
                Some(PaymentMethod::Other) => Cell::new("other").fg(Color::DarkGrey),
            },
        ]);
    }
    table
}

#[must_use]
pub fn build_comparison_table(comparison: &Comparison, decision: &Decision) -> Table {
    let mut table = new_table();
    table.set_header(vec!["Tariff", "Consumption", "Standing charge", "Total"]);
    let breakdowns = std::iter::once((comparison.current.tariff, Some(comparison.current))).chain(
        comparison.candidates.iter().map(|candidate| (candidate.tariff, candidate.breakdown)),
    );
    for (tariff, breakdown) in breakdowns {
        let name_cell = if tariff == comparison.current.tariff {
            Cell::new(format!("{tariff} (current)")).add_attribute(Attribute::Bold)
        } else {
            Cell::new(tariff)
        };
        let Some(breakdown) = breakdown else {
            table.add_row(vec![name_cell, Cell::new("unknown").fg(Color::DarkGrey)]);
            continue;
        };
        let total_color = if tariff == decision.winner.tariff {
            Color::Green
        } else if breakdown.total() > comparison.current.total() {
            Color::Red
        } else {
            Color::Reset
        };
        table.add_row(vec![
            name_cell,
            Cell::new(breakdown.consumption_cost).set_alignment(CellAlignment::Right),
            Cell::new(breakdown.standing_charge).set_alignment(CellAlignment::Right),
            Cell::new(breakdown.total()).set_alignment(CellAlignment::Right).fg(total_color),
        ]);
    }
    table
}
