//! Parameter extraction
//!
//! Turns a free-text debt question into [`LoanTerms`] by asking the model for
//! a strict JSON object, then recovering and validating that object from
//! whatever prose or fencing the model wrapped around it.

use crate::llm::LlmRouter;
use crate::models::{ExtractionParams, LoanTerms};
use lazy_static::lazy_static;
use regex::Regex;
use serde_json::Value;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, warn};

lazy_static! {
    static ref FENCED_JSON: Regex = Regex::new(r"(?s)```(?:json)?\s*(\{.*?\})\s*```").unwrap();
}

const EXTRACTION_EXAMPLES: &[(&str, &str)] = &[
    (
        "i have 23980 debt with 13% interest rate, i will pay 3500 a month, how long will it take to pay it off",
        r#"{"principal": 23980, "interest_rate": 13, "monthly_payment": 3500}"#,
    ),
    (
        "My total outstanding educational debt is a staggering $785,900. The weighted average annual interest rate on this colossal sum is 6.875%. If I am absolutely committed to making a consistent monthly payment of $4,500, what is the repayment duration and total cost?",
        r#"{"principal": 785900, "interest_rate": 6.875, "monthly_payment": 4500}"#,
    ),
    (
        "What are the current student loan interest rates?",
        r#"{"principal": null, "interest_rate": null, "monthly_payment": null}"#,
    ),
    (
        "Given a debt amount of $23,980 with an annual interest rate of 13%, and a fixed monthly payment of $3,500, how long will it take to fully repay the loan?",
        r#"{"principal": 23980, "interest_rate": 13, "monthly_payment": 3500}"#,
    ),
];

/// Why a question did not yield usable loan terms.
///
/// Only `InvalidInput` is meant for the user; every other variant sends the
/// question down the document fallback path.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ExtractionError {
    #[error("model invocation failed: {0}")]
    Invocation(String),

    #[error("malformed JSON in model output: {0}")]
    MalformedJson(String),

    #[error("missing or non-numeric field: {0}")]
    MissingField(&'static str),

    #[error("{0}")]
    InvalidInput(String),
}

pub struct ParameterExtractor {
    router: Arc<LlmRouter>,
}

impl ParameterExtractor {
    pub fn new(router: Arc<LlmRouter>) -> Self {
        Self { router }
    }

    pub async fn extract(&self, question: &str) -> Result<LoanTerms, ExtractionError> {
        let prompt = build_extraction_prompt(question);

        let raw = self
            .router
            .invoke(&prompt)
            .await
            .map_err(|e| ExtractionError::Invocation(e.to_string()))?;

        debug!(output_len = raw.len(), "Extraction output received");

        let result = parse_extraction(&raw);
        if let Err(e) = &result {
            warn!(error = %e, "Parameter extraction failed");
        }
        result
    }
}

pub fn build_extraction_prompt(question: &str) -> String {
    let mut prompt = String::from(
        "Analyze the user's question to extract the following financial parameters: \
         principal (total loan amount), annual_interest_rate (as a percentage), and monthly_payment.\n\
         Your response MUST be a single, valid JSON object with the keys \"principal\", \"interest_rate\", and \"monthly_payment\".\n\
         If a value cannot be found for any of these keys, its value MUST be null.\n\
         Do not include any explanatory text, markdown formatting, or anything else outside of the JSON object.\n\n\
         Examples:\n",
    );

    for (example_question, example_response) in EXTRACTION_EXAMPLES {
        prompt.push_str(&format!(
            "- User Question: \"{}\"\n- Your Response: {}\n\n",
            example_question, example_response
        ));
    }

    prompt.push_str(&format!(
        "Now, process the following question.\nUser Question: \"{}\"\nYour Response:",
        question.trim()
    ));

    prompt
}

/// Full recovery pipeline: locate, parse, validate
pub fn parse_extraction(raw: &str) -> Result<LoanTerms, ExtractionError> {
    let json = locate_json(raw)
        .ok_or_else(|| ExtractionError::MalformedJson("no JSON object in output".into()))?;
    let params = parse_params(json)?;
    validate(params)
}

/// Find the JSON object in model output. A fenced block wins; otherwise the
/// first balanced brace-delimited object.
pub fn locate_json(raw: &str) -> Option<&str> {
    if let Some(m) = FENCED_JSON.captures(raw).and_then(|c| c.get(1)) {
        return Some(m.as_str());
    }

    first_object(raw)
}

fn first_object(text: &str) -> Option<&str> {
    let mut depth = 0usize;
    let mut start = None;
    let mut in_string = false;
    let mut escape_next = false;

    for (i, ch) in text.char_indices() {
        if escape_next {
            escape_next = false;
            continue;
        }

        match ch {
            '\\' if in_string => escape_next = true,
            '"' if start.is_some() => in_string = !in_string,
            '{' if !in_string => {
                if depth == 0 {
                    start = Some(i);
                }
                depth += 1;
            }
            '}' if !in_string && depth > 0 => {
                depth -= 1;
                if depth == 0 {
                    return start.map(|s| &text[s..=i]);
                }
            }
            _ => {}
        }
    }

    None
}

pub fn parse_params(json: &str) -> Result<ExtractionParams, ExtractionError> {
    let value: Value =
        serde_json::from_str(json).map_err(|e| ExtractionError::MalformedJson(e.to_string()))?;

    let object = value
        .as_object()
        .ok_or_else(|| ExtractionError::MalformedJson("expected a JSON object".into()))?;

    let number = |key: &str| object.get(key).and_then(Value::as_f64);

    Ok(ExtractionParams {
        principal: number("principal"),
        interest_rate: number("interest_rate"),
        monthly_payment: number("monthly_payment"),
    })
}

/// All three fields are required. A rate in (0, 1) is read as a fraction
/// and scaled to a percentage before the range check.
pub fn validate(params: ExtractionParams) -> Result<LoanTerms, ExtractionError> {
    let principal = params
        .principal
        .ok_or(ExtractionError::MissingField("principal"))?;
    let mut interest_rate = params
        .interest_rate
        .ok_or(ExtractionError::MissingField("interest_rate"))?;
    let monthly_payment = params
        .monthly_payment
        .ok_or(ExtractionError::MissingField("monthly_payment"))?;

    if interest_rate > 0.0 && interest_rate < 1.0 {
        interest_rate *= 100.0;
    }

    if !(0.0..100.0).contains(&interest_rate) {
        return Err(ExtractionError::InvalidInput(format!(
            "The extracted interest rate ({}) is not a valid percentage between 0 and 100.",
            interest_rate
        )));
    }

    if principal <= 0.0 {
        return Err(ExtractionError::InvalidInput(format!(
            "The extracted debt amount ({}) must be greater than zero.",
            principal
        )));
    }

    if monthly_payment <= 0.0 {
        return Err(ExtractionError::InvalidInput(format!(
            "The extracted monthly payment ({}) must be greater than zero.",
            monthly_payment
        )));
    }

    Ok(LoanTerms::new(principal, interest_rate, monthly_payment))
}
