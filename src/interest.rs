//! Monthly compounding with a fixed monthly withdrawal.
//!
//! Every function here is pure: no state survives a call, so results are
//! reproducible bit for bit and callable from any thread.

use thiserror::Error;

const MONTHS_PER_YEAR: u64 = 12;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InterestError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
}

/// Inputs for one projection. Every field is required.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InvestmentParameters {
    pub principal: f64,
    pub annual_rate_percent: f64,
    pub term_years: i64,
    pub monthly_expense: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BalancePoint {
    pub year: u64,
    pub balance: f64,
}

/// Year-end balances from year 0 through the final year, in order.
pub type Schedule = Vec<BalancePoint>;

#[derive(Debug, Clone, PartialEq)]
pub struct Summary {
    pub final_balance: f64,
    pub schedule: Schedule,
}

fn monthly_rate(annual_rate_percent: f64) -> f64 {
    annual_rate_percent / 12.0 / 100.0
}

/// Balance after `months` rounds of "apply interest, then withdraw", floored at zero.
///
/// The floor is applied once, at the end. NaN collapses to zero and positive
/// infinity passes through unchanged.
pub fn balance_after_months(
    principal: f64,
    annual_rate_percent: f64,
    months: u64,
    monthly_expense: f64,
) -> f64 {
    let rate = monthly_rate(annual_rate_percent);
    let mut balance = principal;
    for _ in 0..months {
        balance = balance * (1.0 + rate);
        balance -= monthly_expense;
    }
    clamp_balance(balance)
}

// Anything not strictly positive, NaN and negative zero included, becomes +0.0.
fn clamp_balance(balance: f64) -> f64 {
    if balance > 0.0 { balance } else { 0.0 }
}

fn term_months(term_years: i64) -> Result<u64, InterestError> {
    let years = u64::try_from(term_years).map_err(|_| {
        InterestError::InvalidArgument(format!(
            "term_years must be non-negative, got {term_years}"
        ))
    })?;
    years.checked_mul(MONTHS_PER_YEAR).ok_or_else(|| {
        InterestError::InvalidArgument(format!("term_years {term_years} is too large"))
    })
}

pub fn build_schedule(params: &InvestmentParameters) -> Result<Schedule, InterestError> {
    let total_months = term_months(params.term_years)?;
    let rate = monthly_rate(params.annual_rate_percent);

    // One forward pass: the unclamped running balance at month `year * 12`
    // is the same float sequence `balance_after_months` would produce.
    let years = total_months / MONTHS_PER_YEAR;
    let mut schedule = Vec::with_capacity(usize::try_from(years + 1).unwrap_or(0).min(1024));
    let mut balance = params.principal;
    let mut month = 0;
    loop {
        if month % MONTHS_PER_YEAR == 0 {
            schedule.push(BalancePoint {
                year: month / MONTHS_PER_YEAR,
                balance: clamp_balance(balance),
            });
        }
        if month == total_months {
            break;
        }
        balance = balance * (1.0 + rate);
        balance -= params.monthly_expense;
        month += 1;
    }

    Ok(schedule)
}

pub fn summarize(params: &InvestmentParameters) -> Result<Summary, InterestError> {
    let months = term_months(params.term_years)?;
    let final_balance = balance_after_months(
        params.principal,
        params.annual_rate_percent,
        months,
        params.monthly_expense,
    );
    let schedule = build_schedule(params)?;
    Ok(Summary {
        final_balance,
        schedule,
    })
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::{
        InterestError, InvestmentParameters, Summary, balance_after_months, build_schedule,
        summarize,
    };

    fn params(principal: f64, rate: f64, years: i64, expense: f64) -> InvestmentParameters {
        InvestmentParameters {
            principal,
            annual_rate_percent: rate,
            term_years: years,
            monthly_expense: expense,
        }
    }

    #[test]
    fn reference_case_matches_iteration() {
        let summary = summarize(&params(100_000.0, 5.0, 10, 500.0)).expect("summary should work");
        assert!((summary.final_balance - 87_059.810_046_194_03).abs() < 1e-6);
        assert_eq!(summary.schedule.len(), 11);
        assert_eq!(summary.schedule[0].year, 0);
        assert_eq!(summary.schedule[0].balance, 100_000.0);
        assert_eq!(summary.schedule[10].year, 10);
        assert_eq!(
            summary.schedule[10].balance.to_bits(),
            summary.final_balance.to_bits()
        );
    }

    #[test]
    fn expenses_larger_than_principal_clamp_to_zero() {
        assert_eq!(balance_after_months(1000.0, 0.0, 12, 100.0), 0.0);
    }

    #[test]
    fn zero_months_returns_floored_principal() {
        assert_eq!(balance_after_months(2500.0, 7.5, 0, 9999.0), 2500.0);
        assert_eq!(balance_after_months(-10.0, 7.5, 0, 0.0), 0.0);
    }

    #[test]
    fn non_finite_inputs_follow_the_zero_floor() {
        assert_eq!(balance_after_months(f64::NAN, 5.0, 12, 0.0), 0.0);
        assert_eq!(
            balance_after_months(f64::INFINITY, 5.0, 12, 0.0),
            f64::INFINITY
        );
        assert_eq!(balance_after_months(1000.0, 5.0, 12, f64::INFINITY), 0.0);
    }

    #[test]
    fn negative_rate_shrinks_balance() {
        let balance = balance_after_months(1000.0, -12.0, 1, 0.0);
        assert!((balance - 990.0).abs() < 1e-9);
    }

    #[test]
    fn negative_term_is_rejected() {
        let err = build_schedule(&params(1000.0, 5.0, -1, 0.0)).expect_err("should reject");
        assert!(matches!(err, InterestError::InvalidArgument(_)));
        assert!(summarize(&params(1000.0, 5.0, -3, 0.0)).is_err());
    }

    #[test]
    fn overflowing_term_is_rejected() {
        let err = summarize(&params(1000.0, 5.0, i64::MAX, 0.0)).expect_err("should reject");
        assert!(err.to_string().contains("too large"));
    }

    #[test]
    fn zero_term_yields_single_point() {
        let summary = summarize(&params(500.0, 3.0, 0, 50.0)).expect("summary should work");
        assert_eq!(summary.final_balance, 500.0);
        assert_eq!(summary.schedule.len(), 1);
        assert_eq!(summary.schedule[0].year, 0);
    }

    #[test]
    fn summarize_is_repeatable() {
        let p = params(123_456.78, 4.25, 30, 812.5);
        let first = summarize(&p).expect("summary should work");
        let second = summarize(&p).expect("summary should work");
        assert_eq!(first.final_balance.to_bits(), second.final_balance.to_bits());
        for (a, b) in first.schedule.iter().zip(&second.schedule) {
            assert_eq!(a.year, b.year);
            assert_eq!(a.balance.to_bits(), b.balance.to_bits());
        }
    }

    #[test]
    fn clamped_zero_is_positive_zero() {
        let balance = balance_after_months(-0.0, 5.0, 0, 0.0);
        assert_eq!(balance.to_bits(), 0.0_f64.to_bits());
    }

    #[test]
    fn engine_types_are_thread_safe() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<InvestmentParameters>();
        assert_send_sync::<Summary>();
        assert_send_sync::<InterestError>();
    }

    #[test]
    fn concurrent_summaries_match_a_single_call() {
        let p = params(250_000.0, 6.5, 40, 1_250.0);
        let expected = summarize(&p).expect("summary should work");

        let results: Vec<Summary> = std::thread::scope(|scope| {
            let handles: Vec<_> = (0..8)
                .map(|_| scope.spawn(|| summarize(&p).expect("summary should work")))
                .collect();
            handles
                .into_iter()
                .map(|handle| handle.join().expect("worker should not panic"))
                .collect()
        });

        for summary in results {
            assert_eq!(
                summary.final_balance.to_bits(),
                expected.final_balance.to_bits()
            );
            assert_eq!(summary.schedule.len(), expected.schedule.len());
            for (got, want) in summary.schedule.iter().zip(&expected.schedule) {
                assert_eq!(got.year, want.year);
                assert_eq!(got.balance.to_bits(), want.balance.to_bits());
            }
        }
    }

    proptest! {
        #![proptest_config(proptest::test_runner::Config::with_cases(64))]

        #[test]
        fn prop_schedule_has_one_point_per_year(
            principal in -1_000_000.0f64..1_000_000.0,
            rate in -50.0f64..50.0,
            years in 0i64..40,
            expense in -5_000.0f64..5_000.0
        ) {
            let schedule = build_schedule(&params(principal, rate, years, expense)).unwrap();
            prop_assert_eq!(schedule.len() as i64, years + 1);
            for (idx, point) in schedule.iter().enumerate() {
                prop_assert_eq!(point.year, idx as u64);
            }
        }

        #[test]
        fn prop_schedule_matches_direct_computation(
            principal in 0.0f64..1_000_000.0,
            rate in -20.0f64..20.0,
            years in 0i64..25,
            expense in 0.0f64..5_000.0
        ) {
            let schedule = build_schedule(&params(principal, rate, years, expense)).unwrap();
            for point in &schedule {
                let direct = balance_after_months(principal, rate, point.year * 12, expense);
                prop_assert_eq!(point.balance.to_bits(), direct.to_bits());
            }
        }

        #[test]
        fn prop_balance_is_never_negative(
            principal in -1_000_000.0f64..1_000_000.0,
            rate in -100.0f64..100.0,
            months in 0u64..600,
            expense in -10_000.0f64..10_000.0
        ) {
            prop_assert!(balance_after_months(principal, rate, months, expense) >= 0.0);
        }

        #[test]
        fn prop_zero_months_is_floored_principal(
            principal in -1_000_000.0f64..1_000_000.0,
            rate in -100.0f64..100.0,
            expense in -10_000.0f64..10_000.0
        ) {
            prop_assert_eq!(balance_after_months(principal, rate, 0, expense), principal.max(0.0));
        }

        #[test]
        fn prop_growth_without_expense_is_non_decreasing(
            principal in 0.0f64..1_000_000.0,
            rate in 0.0f64..30.0,
            months in 0u64..480
        ) {
            let now = balance_after_months(principal, rate, months, 0.0);
            let next = balance_after_months(principal, rate, months + 1, 0.0);
            prop_assert!(next >= now);
        }
    }
}
