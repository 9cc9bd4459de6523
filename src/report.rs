use crate::interest::{InvestmentParameters, Schedule, Summary};

pub fn format_currency(amount: f64) -> String {
    if !amount.is_finite() {
        return format!("${}", non_finite_label(amount));
    }

    let fixed = format!("{:.2}", amount.abs());
    let (whole, cents) = fixed.split_once('.').unwrap_or((fixed.as_str(), "00"));
    let sign = if amount.is_sign_negative() { "-" } else { "" };
    format!("${sign}{}.{cents}", group_thousands(whole))
}

fn non_finite_label(amount: f64) -> &'static str {
    if amount.is_nan() {
        "nan"
    } else if amount.is_sign_negative() {
        "-inf"
    } else {
        "inf"
    }
}

fn group_thousands(digits: &str) -> String {
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (idx, ch) in digits.chars().enumerate() {
        if idx > 0 && (digits.len() - idx) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    grouped
}

/// How the caller wrote the rate. A whole number entered without a decimal
/// point is echoed back the same way (`5%`, not `5.0%`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RateNotation {
    #[default]
    Decimal,
    Whole,
}

fn format_rate(rate: f64, notation: RateNotation) -> String {
    match notation {
        RateNotation::Whole if rate.is_finite() && rate.fract() == 0.0 => format!("{rate:.0}"),
        _ => format!("{rate:?}"),
    }
}

pub fn render_results(
    params: &InvestmentParameters,
    summary: &Summary,
    notation: RateNotation,
) -> String {
    [
        "Results:".to_string(),
        format!("Initial Investment: {}", format_currency(params.principal)),
        format!(
            "Interest Rate: {}%",
            format_rate(params.annual_rate_percent, notation)
        ),
        format!("Time Period: {} years", params.term_years),
        format!("Monthly Expense: {}", format_currency(params.monthly_expense)),
        format!("Final Amount: {}", format_currency(summary.final_balance)),
    ]
    .join("\n")
}

pub fn render_schedule(schedule: &Schedule) -> String {
    let mut lines = vec![
        "Yearly Investment Schedule:".to_string(),
        "Year    Balance".to_string(),
    ];
    lines.extend(
        schedule
            .iter()
            .map(|point| format!("Year {:<4} {}", point.year, format_currency(point.balance))),
    );
    lines.join("\n")
}

/// Results block and schedule table, separated by a blank line.
pub fn render_report(
    params: &InvestmentParameters,
    summary: &Summary,
    notation: RateNotation,
) -> String {
    format!(
        "{}\n\n{}",
        render_results(params, summary, notation),
        render_schedule(&summary.schedule)
    )
}
