mod bill;
mod periods;

use clap::{Parser, Subcommand};

pub use self::{
    bill::{BillArgs, bill},
    periods::{PeriodArgs, periods},
};

#[derive(Parser)]
#[command(author, version, about, propagate_version = true)]
#[must_use]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// List the billing periods to choose from.
    #[clap(name = "periods")]
    Periods(Box<PeriodArgs>),

    /// Compute the bill for one of the listed periods.
    #[clap(name = "bill")]
    Bill(Box<BillArgs>),
}
