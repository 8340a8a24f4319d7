use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use comfy_table::{Attribute, Cell, CellAlignment, Color, Table, modifiers, presets};

use crate::{
    core::{
        TIMEZONE,
        bill::{Bill, VAT_RATE},
        estimation::{AcontoEstimation, HybridEstimation},
        period::{CalculationType, Period, PeriodType, classify},
        tariff::{Charges, HourlyTariffCost},
    },
    quantity::{cost::Cost, energy::KilowattHours},
};

fn new_table() -> Table {
    let mut table = Table::new();
    table
        .load_preset(presets::UTF8_FULL_CONDENSED)
        .apply_modifier(modifiers::UTF8_ROUND_CORNERS)
        .enforce_styling();
    table
}

const fn period_type_color(period_type: PeriodType) -> Color {
    match period_type {
        PeriodType::Historical => Color::Reset,
        PeriodType::Aconto => Color::Cyan,
        PeriodType::Hybrid => Color::DarkYellow,
    }
}

pub fn build_periods_table(
    periods: &[Period],
    calculation_type: CalculationType,
    now: DateTime<Utc>,
) -> Table {
    let mut table = new_table();
    table.set_header(vec!["#", "Period", "First day", "Last day", "Hours", "Type"]);
    for (index, period) in periods.iter().enumerate() {
        let period_type = classify(period, calculation_type, now);
        table.add_row(vec![
            Cell::new(index + 1).add_attribute(Attribute::Dim),
            Cell::new(&period.label),
            Cell::new(period.first_day()),
            Cell::new(period.last_day()),
            Cell::new(period.interval.n_hours()).set_alignment(CellAlignment::Right),
            Cell::new(period_type).fg(period_type_color(period_type)),
        ]);
    }
    table
}

pub fn build_aconto_table(estimation: &AcontoEstimation) -> Table {
    let mut table = new_table();
    table.set_header(vec!["Aconto estimate", ""]);
    table.add_row(vec![
        Cell::new("Hours"),
        Cell::new(estimation.n_hours).set_alignment(CellAlignment::Right),
    ]);
    table.add_row(vec![
        Cell::new("Consumption"),
        Cell::new(estimation.total_consumption).set_alignment(CellAlignment::Right),
    ]);
    table.add_row(vec![
        Cell::new("Average per hour"),
        Cell::new(estimation.average_hourly_consumption).set_alignment(CellAlignment::Right),
    ]);
    table.add_row(vec![
        Cell::new("Average spot price"),
        Cell::new(estimation.average_spot_price).set_alignment(CellAlignment::Right),
    ]);
    table.add_row(vec![
        Cell::new("Spot prices"),
        Cell::new(estimation.method).add_attribute(Attribute::Dim),
    ]);
    table
}

pub fn build_hybrid_table(estimation: &HybridEstimation) -> Table {
    let mut table = new_table();
    table.set_header(vec!["Hybrid estimate", "Hours", "Consumption"]);
    table.add_row(vec![
        Cell::new("Elapsed"),
        Cell::new(estimation.n_past_hours).set_alignment(CellAlignment::Right),
        Cell::new(estimation.past_consumption).set_alignment(CellAlignment::Right),
    ]);
    table.add_row(vec![
        Cell::new("Remaining"),
        Cell::new(estimation.n_future_hours).set_alignment(CellAlignment::Right),
        Cell::new(estimation.future_consumption).set_alignment(CellAlignment::Right),
    ]);
    table.add_row(vec![
        Cell::new("Total").add_attribute(Attribute::Bold),
        Cell::new(estimation.consumption.len()).set_alignment(CellAlignment::Right),
        Cell::new(estimation.total_consumption())
            .set_alignment(CellAlignment::Right)
            .add_attribute(Attribute::Bold),
    ]);
    table.add_row(vec![
        Cell::new("Actual spot prices"),
        Cell::new(estimation.n_actual_spot_prices).set_alignment(CellAlignment::Right),
        Cell::new(format!("until {}", estimation.spot_price_split.format("%Y-%m-%d %H:%M UTC")))
            .add_attribute(Attribute::Dim),
    ]);
    table.add_row(vec![
        Cell::new("Fixed spot prices"),
        Cell::new(estimation.n_fixed_spot_prices).set_alignment(CellAlignment::Right),
        Cell::new(estimation.fixed_spot_price).set_alignment(CellAlignment::Right),
    ]);
    table.add_row(vec![
        Cell::new("Spot prices"),
        Cell::new(""),
        Cell::new(estimation.description()).add_attribute(Attribute::Dim),
    ]);
    table
}

pub fn build_hourly_profile_table(profile: &BTreeMap<u32, KilowattHours>) -> Table {
    let maximum = profile.values().copied().fold(KilowattHours::ZERO, |maximum, energy| {
        if energy > maximum { energy } else { maximum }
    });
    let mut table = new_table();
    table.set_header(vec!["Hour", "Consumption"]);
    for (hour, energy) in profile {
        table.add_row(vec![
            Cell::new(format!("{hour:02}:00")).add_attribute(Attribute::Dim),
            Cell::new(energy).set_alignment(CellAlignment::Right).fg(if *energy >= maximum {
                Color::Red
            } else {
                Color::Reset
            }),
        ]);
    }
    table
}

pub fn build_bill_table(period: &Period, period_type: PeriodType, bill: &Bill) -> Table {
    let mut table = new_table();
    table.set_header(vec![
        Cell::new(format!("{} ({period_type})", period.label)).fg(period_type_color(period_type)),
        Cell::new(format!("{} .. {}", period.first_day(), period.last_day())),
        Cell::new(bill.total_consumption).set_alignment(CellAlignment::Right),
    ]);

    for (name, cost) in &bill.tariff_costs {
        table.add_row(vec![
            Cell::new("Usage").add_attribute(Attribute::Dim),
            Cell::new(name),
            Cell::new(cost).set_alignment(CellAlignment::Right),
        ]);
    }
    table.add_row(vec![
        Cell::new("Usage").add_attribute(Attribute::Dim),
        Cell::new("Elleverandør"),
        Cell::new(bill.supplier_cost).set_alignment(CellAlignment::Right),
    ]);
    table.add_row(vec![
        Cell::new("Usage").add_attribute(Attribute::Dim),
        Cell::new("Spotpris"),
        Cell::new(bill.spot_cost).set_alignment(CellAlignment::Right),
    ]);
    table.add_row(vec![
        Cell::new("Usage").add_attribute(Attribute::Dim),
        Cell::new("Total usage").add_attribute(Attribute::Bold),
        Cell::new(bill.usage_cost).set_alignment(CellAlignment::Right).add_attribute(Attribute::Bold),
    ]);

    for (name, cost) in &bill.subscription_costs {
        table.add_row(vec![
            Cell::new("Fixed").add_attribute(Attribute::Dim),
            Cell::new(name),
            Cell::new(cost).set_alignment(CellAlignment::Right),
        ]);
    }
    table.add_row(vec![
        Cell::new("Fixed").add_attribute(Attribute::Dim),
        Cell::new("Total subscriptions").add_attribute(Attribute::Bold),
        Cell::new(bill.subscription_cost)
            .set_alignment(CellAlignment::Right)
            .add_attribute(Attribute::Bold),
    ]);

    table.add_row(vec![
        Cell::new("Bill").add_attribute(Attribute::Dim),
        Cell::new("Subtotal excluding VAT"),
        Cell::new(bill.subtotal).set_alignment(CellAlignment::Right),
    ]);
    table.add_row(vec![
        Cell::new("Bill").add_attribute(Attribute::Dim),
        Cell::new(format!("VAT ({:.0}%)", VAT_RATE * 100.0)),
        Cell::new(bill.vat).set_alignment(CellAlignment::Right),
    ]);
    table.add_row(vec![
        Cell::new("Bill").add_attribute(Attribute::Dim),
        Cell::new("Total including VAT").add_attribute(Attribute::Bold),
        Cell::new(bill.total)
            .set_alignment(CellAlignment::Right)
            .add_attribute(Attribute::Bold)
            .fg(Color::Green),
    ]);
    table
}

pub fn build_charges_table(charges: &Charges) -> Table {
    let mut table = new_table();
    table.set_header(vec!["Charge", "Owner", "Resolution", "Prices", "Description"]);
    for tariff in &charges.tariffs {
        table.add_row(vec![
            Cell::new(&tariff.name),
            Cell::new(&tariff.owner).add_attribute(Attribute::Dim),
            Cell::new(&tariff.resolution),
            Cell::new(tariff.prices.len()).set_alignment(CellAlignment::Right),
            Cell::new(&tariff.description).add_attribute(Attribute::Dim),
        ]);
    }
    for subscription in &charges.subscriptions {
        table.add_row(vec![
            Cell::new(&subscription.name),
            Cell::new(""),
            Cell::new("monthly"),
            Cell::new(format!("{} × {}", subscription.quantity, subscription.unit_price))
                .set_alignment(CellAlignment::Right),
            Cell::new(""),
        ]);
    }
    table
}

pub fn build_hourly_costs_table(hourly_costs: &[HourlyTariffCost]) -> Table {
    let mut table = new_table();
    table.set_header(vec!["Hour", "Consumption", "Quality", "Spot price", "Tariffs", "Total"]);
    for hour in hourly_costs {
        table.add_row(vec![
            Cell::new(hour.instant.with_timezone(&TIMEZONE).format("%Y-%m-%d %H:%M"))
                .add_attribute(Attribute::Dim),
            Cell::new(hour.consumption).set_alignment(CellAlignment::Right),
            Cell::new(hour.quality).add_attribute(Attribute::Dim),
            Cell::new(hour.spot_price).set_alignment(CellAlignment::Right),
            Cell::new(hour.tariff_costs.values().copied().sum::<Cost>())
                .set_alignment(CellAlignment::Right),
            Cell::new(hour.total_cost).set_alignment(CellAlignment::Right),
        ]);
    }
    table
}
