//! Core data models for the debt navigator

use serde::{Deserialize, Serialize};

//
// ================= Loan Terms =================
//

/// Immutable input to payoff calculations.
///
/// `annual_interest_rate` is a percentage (6.5 means 6.5%), not a fraction.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct LoanTerms {
    pub principal: f64,
    pub annual_interest_rate: f64,
    pub monthly_payment: f64,
}

impl LoanTerms {
    pub fn new(principal: f64, annual_interest_rate: f64, monthly_payment: f64) -> Self {
        Self {
            principal,
            annual_interest_rate,
            monthly_payment,
        }
    }
}

//
// ================= Payoff Result =================
//

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct PayoffResult {
    pub years: u32,
    /// Remaining months after whole years, 0..=11
    pub months: u32,
    /// Rounded to cents
    pub total_paid: f64,
}

impl PayoffResult {
    pub fn total_months(&self) -> u32 {
        self.years * 12 + self.months
    }

    pub fn total_interest(&self, principal: f64) -> f64 {
        self.total_paid - principal
    }
}

//
// ================= Extraction =================
//

/// Raw parameters as the model returned them. Any field may be missing.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ExtractionParams {
    pub principal: Option<f64>,
    pub interest_rate: Option<f64>,
    pub monthly_payment: Option<f64>,
}

//
// ================= Debt Records =================
//

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewDebt {
    pub user_id: i64,
    pub name: String,
    pub amount: f64,
    pub interest_rate: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DebtRecord {
    pub id: i64,
    pub user_id: i64,
    pub name: String,
    pub amount: f64,
    pub interest_rate: f64,
}

/// The slice of a stored debt the calculators need
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct DebtTerms {
    pub amount: f64,
    pub interest_rate: f64,
}

impl From<&DebtRecord> for DebtTerms {
    fn from(record: &DebtRecord) -> Self {
        Self {
            amount: record.amount,
            interest_rate: record.interest_rate,
        }
    }
}

//
// ================= HTTP Payloads =================
//

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Question {
    pub question: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DebtCalculationRequest {
    pub debt_amount: f64,
    pub interest_rate: f64,
    pub monthly_payment: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentCalculationRequest {
    pub debt_amount: f64,
    pub interest_rate: f64,
    pub months: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RepaymentPlanRequest {
    pub debt_id: i64,
    pub monthly_payment: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Answer {
    pub answer: String,
}

impl Answer {
    pub fn new(answer: impl Into<String>) -> Self {
        Self {
            answer: answer.into(),
        }
    }
}
