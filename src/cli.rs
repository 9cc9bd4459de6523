use clap::{Parser, Subcommand};

use crate::report::RateNotation;

#[derive(Debug, Parser)]
#[command(name = "finchat")]
#[command(about = "Financial chat assistant with a compound-interest calculator", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Without a subcommand, starts the interactive chat.
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Send one prompt to the advisor and print its answer.
    Ask {
        #[arg(value_name = "PROMPT", required = true, num_args = 1..)]
        prompt: Vec<String>,
    },
    /// Run the calculator directly, without a model.
    #[command(allow_negative_numbers = true)]
    Calc {
        /// Initial investment amount.
        principal: f64,
        /// Annual interest rate as a percentage.
        #[arg(value_parser = parse_rate)]
        rate: RateArg,
        /// Time period in years.
        years: i64,
        /// Monthly withdrawal/expense amount.
        monthly_expense: f64,
    },
}

/// A rate plus whether it was typed as a whole number.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RateArg {
    pub value: f64,
    pub notation: RateNotation,
}

fn parse_rate(raw: &str) -> Result<RateArg, String> {
    let raw = raw.trim();
    if let Ok(whole) = raw.parse::<i64>() {
        return Ok(RateArg {
            value: whole as f64,
            notation: RateNotation::Whole,
        });
    }
    raw.parse::<f64>()
        .map(|value| RateArg {
            value,
            notation: RateNotation::Decimal,
        })
        .map_err(|err| format!("invalid rate '{raw}': {err}"))
}
