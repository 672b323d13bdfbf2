//! Answer composition
//!
//! Numbers always come from the amortization engine. The composer only
//! decides how they are phrased: fixed templates, or a second model call
//! that is handed the computed figures.

use crate::amortization::{PayoffError, MAX_PAYOFF_MONTHS};
use crate::error::NavigatorError;
use crate::llm::LlmRouter;
use crate::models::{LoanTerms, PayoffResult};
use crate::Result;
use std::str::FromStr;
use std::sync::Arc;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnswerStyle {
    /// Deterministic phrasing with interpolated figures
    Template,
    /// Conversational phrasing delegated to the model
    Llm,
}

impl FromStr for AnswerStyle {
    type Err = NavigatorError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "template" => Ok(Self::Template),
            "llm" => Ok(Self::Llm),
            other => Err(NavigatorError::Config(format!(
                "unknown answer style '{}', expected 'template' or 'llm'",
                other
            ))),
        }
    }
}

pub struct AnswerComposer {
    style: AnswerStyle,
    router: Arc<LlmRouter>,
}

impl AnswerComposer {
    pub fn new(style: AnswerStyle, router: Arc<LlmRouter>) -> Self {
        Self { style, router }
    }

    /// Phrase the outcome of a payoff calculation.
    ///
    /// Insufficient-payment and runaway outcomes are always templated; only a
    /// successful result is handed to the model under [`AnswerStyle::Llm`].
    pub async fn compose_payoff(
        &self,
        question: &str,
        terms: &LoanTerms,
        outcome: &std::result::Result<PayoffResult, PayoffError>,
    ) -> Result<String> {
        match outcome {
            Ok(result) => match self.style {
                AnswerStyle::Template => Ok(payoff_text(result, terms.principal)),
                AnswerStyle::Llm => {
                    debug!("Composing conversational payoff answer");
                    let prompt = build_conversational_prompt(question, result, terms.principal);
                    self.router.invoke(&prompt).await
                }
            },
            Err(e) => Ok(payoff_error_text(e, terms.monthly_payment)),
        }
    }
}

pub fn payoff_text(result: &PayoffResult, principal: f64) -> String {
    format!(
        "It will take approximately {} years and {} months to pay off this debt. \
         You will pay a total of ${}, which includes ${} in interest.",
        result.years,
        result.months,
        format_currency(result.total_paid),
        format_currency(result.total_interest(principal))
    )
}

pub fn payoff_error_text(error: &PayoffError, monthly_payment: f64) -> String {
    match error {
        PayoffError::InsufficientPayment { .. } => {
            let suggested = error.suggested_minimum().unwrap_or_default();
            insufficient_payment_text(monthly_payment, suggested)
        }
        PayoffError::RunawayCalculation { .. } => runaway_text(),
    }
}

pub fn insufficient_payment_text(monthly_payment: f64, suggested_minimum: f64) -> String {
    format!(
        "Your monthly payment of ${} is too low to cover the interest. \
         You need to pay at least ${} per month to start reducing the principal.",
        format_currency(monthly_payment),
        format_currency(suggested_minimum)
    )
}

pub fn runaway_text() -> String {
    format!(
        "This payment plan exceeds a reasonable horizon: the debt would not be paid off within {} years. \
         Try a larger monthly payment.",
        MAX_PAYOFF_MONTHS / 12
    )
}

/// `None` is the undefined-payment sentinel for a non-positive term
pub fn monthly_payment_text(payment: Option<f64>, months: i64) -> String {
    match payment {
        Some(payment) => format!(
            "You would need to pay approximately ${} per month to pay off the debt in {} months.",
            format_currency(payment),
            months
        ),
        None => "The number of months must be greater than zero.".to_string(),
    }
}

pub fn build_conversational_prompt(question: &str, result: &PayoffResult, principal: f64) -> String {
    format!(
        "You are a helpful and friendly financial assistant.\n\
         A user asked the following question: '{}'\n\n\
         Based on their numbers, I have performed the following calculation:\n\
         - Time to Pay Off: {} years and {} months\n\
         - Total Amount Paid: ${}\n\
         - Total Interest Paid: ${}\n\n\
         Now, please present this information back to the user in a comprehensive, conversational, and easy-to-understand way.\n\
         Use exactly these figures; do not recalculate them.\n\
         Be encouraging and offer one or two general tips for paying off debt faster.\n",
        question.trim(),
        result.years,
        result.months,
        format_currency(result.total_paid),
        format_currency(result.total_interest(principal))
    )
}

/// Open-ended assistant prompt for questions outside the finance domain
pub fn build_general_prompt(question: &str) -> String {
    format!(
        "You are Momentum AI, a helpful and friendly assistant.\n\
         Your goal is to provide accurate, conversational, and engaging answers to a wide range of questions.\n\
         If a question is unclear, ask for clarification.\n\
         If you don't know the answer to a question, say so honestly.\n\
         If it is helpful, you are encouraged to suggest reputable websites where the user can find more information.\n\n\
         Question: {}\n\
         Answer:",
        question.trim()
    )
}

/// Two decimals with thousands separators: `1234567.891` → `1,234,567.89`
pub fn format_currency(value: f64) -> String {
    let fixed = format!("{:.2}", value.abs());
    let (whole, cents) = fixed.split_once('.').unwrap_or((fixed.as_str(), "00"));

    let mut grouped = String::with_capacity(whole.len() + whole.len() / 3);
    for (i, digit) in whole.chars().enumerate() {
        if i > 0 && (whole.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(digit);
    }

    let negative = value < 0.0 && fixed.chars().any(|c| c.is_ascii_digit() && c != '0');
    format!("{}{}.{}", if negative { "-" } else { "" }, grouped, cents)
}
