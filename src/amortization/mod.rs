//! Amortization engine
//!
//! Pure numeric functions for a single fixed-rate, fixed-payment loan.
//! No I/O and no shared state, so concurrent callers need no locking.
//! Balances stay in full f64 precision; only the returned `total_paid`
//! and closed-form payments are rounded to cents.

use crate::models::{LoanTerms, PayoffResult};
use thiserror::Error;

/// Upper bound on simulated months (100 years)
pub const MAX_PAYOFF_MONTHS: u32 = 1200;

#[derive(Error, Debug, Clone, Copy, PartialEq)]
pub enum PayoffError {
    /// The payment does not exceed the interest accrued in the first month,
    /// so the balance never shrinks.
    #[error("Your monthly payment is too low to cover interest. Debt will grow indefinitely.")]
    InsufficientPayment { first_month_interest: f64 },

    #[error("This payment plan exceeds a reasonable horizon ({months} months)")]
    RunawayCalculation { months: u32 },
}

impl PayoffError {
    /// Smallest payment that starts reducing principal: interest rounded to cents plus one unit.
    pub fn suggested_minimum(&self) -> Option<f64> {
        match self {
            PayoffError::InsufficientPayment {
                first_month_interest,
            } => Some(round_to_cents(*first_month_interest) + 1.0),
            PayoffError::RunawayCalculation { .. } => None,
        }
    }
}

/// Simulate month-by-month payoff of a loan.
///
/// Inputs are assumed validated by the caller (principal > 0, rate in
/// [0, 100)). The only degeneracy guarded here is a payment that cannot
/// cover the first month's interest, checked once up front since rate and
/// payment never change during the simulation.
pub fn calculate_payoff(
    principal: f64,
    annual_interest_rate: f64,
    monthly_payment: f64,
) -> Result<PayoffResult, PayoffError> {
    let monthly_rate = annual_interest_rate / 100.0 / 12.0;
    let mut balance = principal;
    let mut months: u32 = 0;
    let mut total_paid = 0.0;

    if monthly_payment <= balance * monthly_rate {
        return Err(PayoffError::InsufficientPayment {
            first_month_interest: balance * monthly_rate,
        });
    }

    while balance > 0.0 {
        if months >= MAX_PAYOFF_MONTHS {
            return Err(PayoffError::RunawayCalculation { months });
        }

        let interest = balance * monthly_rate;
        let principal_portion = monthly_payment - interest;
        balance -= principal_portion;
        total_paid += monthly_payment;
        months += 1;

        // Final month overshoot: only the remaining balance was actually owed
        if balance < 0.0 {
            total_paid += balance;
            balance = 0.0;
        }
    }

    Ok(PayoffResult {
        years: months / 12,
        months: months % 12,
        total_paid: round_to_cents(total_paid),
    })
}

pub fn calculate_payoff_for(terms: &LoanTerms) -> Result<PayoffResult, PayoffError> {
    calculate_payoff(
        terms.principal,
        terms.annual_interest_rate,
        terms.monthly_payment,
    )
}

/// Fixed payment that retires `principal` in exactly `months` payments.
///
/// Closed-form annuity formula `M = P * i / (1 - (1+i)^-n)`, evaluated with
/// `ln_1p`/`exp_m1` so long terms tend to `P * i` instead of overflowing.
/// Returns `None` when `months <= 0`; no payment can satisfy that schedule.
pub fn calculate_monthly_payment(
    principal: f64,
    annual_interest_rate: f64,
    months: i64,
) -> Option<f64> {
    if months <= 0 {
        return None;
    }

    let monthly_rate = annual_interest_rate / 100.0 / 12.0;

    if monthly_rate == 0.0 {
        return Some(principal / months as f64);
    }

    // 1 - (1+i)^-n
    let denominator = -(-(months as f64) * monthly_rate.ln_1p()).exp_m1();
    let payment = principal * monthly_rate / denominator;

    if !payment.is_finite() {
        return Some(principal / months as f64);
    }

    Some(round_to_cents(payment))
}

pub fn round_to_cents(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Independent month count from the closed-form payoff horizon
    fn closed_form_months(principal: f64, rate: f64, payment: f64) -> f64 {
        let i = rate / 100.0 / 12.0;
        if i == 0.0 {
            return (principal / payment).ceil();
        }
        (-(1.0 - i * principal / payment).ln() / (1.0 + i).ln()).ceil()
    }

    /// Straightforward re-simulation used to pin exact totals
    fn resimulate(principal: f64, rate: f64, payment: f64) -> (u32, f64) {
        let i = rate / 100.0 / 12.0;
        let mut balance = principal;
        let mut paid = 0.0;
        let mut n = 0;
        while balance > 0.0 {
            balance = balance + balance * i - payment;
            n += 1;
            paid += if balance < 0.0 { payment + balance } else { payment };
        }
        (n, paid)
    }

    #[test]
    fn test_credit_card_example() {
        let result = calculate_payoff(5000.0, 18.0, 150.0).unwrap();
        let (n, paid) = resimulate(5000.0, 18.0, 150.0);

        assert_eq!(result.total_months(), n);
        assert_eq!(result.total_months(), 47);
        assert_eq!((result.years, result.months), (3, 11));
        assert!((result.total_paid - paid).abs() < 0.01);
        assert!((result.total_paid - 6983.60).abs() < 0.005);
    }

    #[test]
    fn test_few_shot_examples() {
        let short = calculate_payoff(23980.0, 13.0, 3500.0).unwrap();
        assert_eq!(short.total_months(), 8);
        assert!(short.total_paid >= 23980.0);

        let mortgage = calculate_payoff(785900.0, 6.875, 5500.0).unwrap();
        assert_eq!(mortgage.total_months(), 299);
        assert_eq!((mortgage.years, mortgage.months), (24, 11));
    }

    #[test]
    fn test_few_shot_mortgage_at_4500_cannot_amortize() {
        // 785900 * 6.875% / 12 = 4502.55 of interest in month one
        let err = calculate_payoff(785900.0, 6.875, 4500.0).unwrap_err();
        match err {
            PayoffError::InsufficientPayment {
                first_month_interest,
            } => assert!((first_month_interest - 4502.55).abs() < 0.01),
            other => panic!("unexpected error: {:?}", other),
        }
        assert_eq!(err.suggested_minimum(), Some(4503.55));
    }

    #[test]
    fn test_payoff_matches_closed_form_horizon() {
        let principals: [f64; 4] = [500.0, 5000.0, 23980.0, 120000.0];
        let rates = [0.0, 3.5, 13.0, 29.99];

        for &p in &principals {
            for &r in &rates {
                let interest = p * r / 100.0 / 12.0;
                for factor in [1.05, 1.5, 4.0] {
                    let payment = (interest * factor).max(p / 600.0) + 1.0;
                    let result = calculate_payoff(p, r, payment).unwrap();
                    let expected = closed_form_months(p, r, payment);
                    let (n, _) = resimulate(p, r, payment);

                    assert_eq!(result.total_months(), n, "P={} R={} M={}", p, r, payment);
                    assert!((result.total_months() as f64 - expected).abs() <= 1.0);
                    assert!(result.total_paid >= p - 0.005);
                    assert!(result.months < 12);
                }
            }
        }
    }

    #[test]
    fn test_insufficient_payment_for_any_positive_rate() {
        for &(p, r) in &[(1000.0, 1.0), (5000.0, 18.0), (250000.0, 99.0)] {
            let interest = p * r / 100.0 / 12.0;
            assert!(matches!(
                calculate_payoff(p, r, interest),
                Err(PayoffError::InsufficientPayment { .. })
            ));
            assert!(matches!(
                calculate_payoff(p, r, interest * 0.5),
                Err(PayoffError::InsufficientPayment { .. })
            ));
        }
    }

    #[test]
    fn test_zero_rate_payoff() {
        let result = calculate_payoff(10000.0, 0.0, 250.0).unwrap();
        assert_eq!(result.total_months(), 40);
        assert_eq!(result.total_paid, 10000.0);

        let result = calculate_payoff(1000.0, 0.0, 300.0).unwrap();
        assert_eq!((result.years, result.months), (0, 4));
        assert_eq!(result.total_paid, 1000.0);
    }

    #[test]
    fn test_runaway_calculation_is_bounded() {
        // Interest 100.00/month; a hundredth of a cent over it barely moves the balance
        let err = calculate_payoff(10000.0, 12.0, 100.0001).unwrap_err();
        assert_eq!(
            err,
            PayoffError::RunawayCalculation {
                months: MAX_PAYOFF_MONTHS
            }
        );
        assert_eq!(err.suggested_minimum(), None);
    }

    #[test]
    fn test_monthly_payment_zero_rate() {
        for n in [1, 7, 12, 360] {
            assert_eq!(
                calculate_monthly_payment(9000.0, 0.0, n),
                Some(9000.0 / n as f64)
            );
        }
    }

    #[test]
    fn test_monthly_payment_undefined_for_non_positive_months() {
        assert_eq!(calculate_monthly_payment(5000.0, 18.0, 0), None);
        assert_eq!(calculate_monthly_payment(5000.0, 0.0, 0), None);
        assert_eq!(calculate_monthly_payment(5000.0, 18.0, -6), None);
    }

    #[test]
    fn test_monthly_payment_known_values() {
        assert_eq!(calculate_monthly_payment(20000.0, 6.0, 60), Some(386.66));
        assert_eq!(calculate_monthly_payment(250000.0, 7.0, 360), Some(1663.26));
        assert_eq!(calculate_monthly_payment(10000.0, 12.0, 1), Some(10100.0));
    }

    #[test]
    fn test_monthly_payment_finite_for_long_terms() {
        // Growth factor overflows f64 well before 200k months at 7%
        let payment = calculate_monthly_payment(250000.0, 7.0, 200_000).unwrap();
        assert!(payment.is_finite());
        assert_eq!(payment, round_to_cents(250000.0 * 7.0 / 100.0 / 12.0));

        for n in [i64::from(u32::MAX), i64::MAX] {
            for r in [0.01, 13.0, 99.99] {
                let payment = calculate_monthly_payment(1000.0, r, n).unwrap();
                assert!(payment.is_finite(), "R={} n={} -> {}", r, n, payment);
                assert!(payment > 0.0);
            }
        }

        let tiny_rate = calculate_monthly_payment(1200.0, 1e-300, 12).unwrap();
        assert_eq!(tiny_rate, 100.0);
    }

    #[test]
    fn test_payoff_at_exact_horizon_succeeds() {
        // Unrounded annuity payment for 1200 months, nudged so float error cannot add a month
        let principal: f64 = 100000.0;
        let i = 6.0 / 100.0 / 12.0;
        let exact = principal * i / (1.0 - (1.0 + i).powf(-(MAX_PAYOFF_MONTHS as f64)));
        let payment = exact * (1.0 + 1e-9);

        let result = calculate_payoff(principal, 6.0, payment).unwrap();
        assert_eq!(result.total_months(), MAX_PAYOFF_MONTHS);
        assert_eq!(resimulate(principal, 6.0, payment).0, MAX_PAYOFF_MONTHS);

        // Zero rate lands exactly on the bound
        let result = calculate_payoff(1200.0, 0.0, 1.0).unwrap();
        assert_eq!(result.total_months(), MAX_PAYOFF_MONTHS);
        assert_eq!((result.years, result.months), (100, 0));
    }

    #[test]
    fn test_monthly_payment_round_trips_through_simulation() {
        let cases = [
            (20000.0, 6.0, 60),
            (5000.0, 18.0, 36),
            (250000.0, 7.0, 360),
            (1000.0, 99.9, 12),
            (9000.0, 0.0, 7),
            (750.0, 4.25, 18),
        ];

        for (p, r, n) in cases {
            let payment = calculate_monthly_payment(p, r, n).unwrap();
            assert!(payment.is_finite());

            let result = calculate_payoff(p, r, payment).unwrap();
            let months = result.total_months() as i64;
            assert!(
                (months - n).abs() <= 1,
                "P={} R={} n={} payment={} -> {} months",
                p,
                r,
                n,
                payment,
                months
            );
        }
    }
}
