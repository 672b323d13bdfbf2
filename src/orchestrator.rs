//! Question router - the /ask pipeline
//!
//! QUESTION → EXTRACT → CALCULATE → COMPOSE
//!              ↓ (extraction failed)
//!          TOPIC FILTER → DOCUMENTS | OFF-TOPIC (refuse or converse)

use crate::amortization::{calculate_monthly_payment, calculate_payoff, calculate_payoff_for};
use crate::classifier::{OffTopicPolicy, TopicClass, TopicClassifier, OFF_TOPIC_REPLY};
use crate::composer::{
    build_general_prompt, monthly_payment_text, payoff_error_text, payoff_text, AnswerComposer,
};
use crate::extraction::{ExtractionError, ParameterExtractor};
use crate::llm::LlmRouter;
use crate::models::{Answer, DebtCalculationRequest, PaymentCalculationRequest};
use crate::retrieval::DocumentAnswerer;
use crate::Result;
use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};
use uuid::Uuid;

pub const INVALID_RATE_MESSAGE: &str = "Interest rate must be a percentage between 0 and 100.";

/// Which path produced an answer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AnswerSource {
    Calculation,
    Rejected,
    Documents,
    OffTopic,
    General,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RoutedAnswer {
    pub answer: String,
    pub source: AnswerSource,
}

impl RoutedAnswer {
    fn new(answer: String, source: AnswerSource) -> Self {
        Self { answer, source }
    }
}

pub struct QuestionRouter {
    extractor: ParameterExtractor,
    composer: AnswerComposer,
    documents: Arc<dyn DocumentAnswerer>,
    /// Set when off-topic questions are answered instead of refused
    general: Option<Arc<LlmRouter>>,
}

impl QuestionRouter {
    pub fn new(
        extractor: ParameterExtractor,
        composer: AnswerComposer,
        documents: Arc<dyn DocumentAnswerer>,
    ) -> Self {
        Self {
            extractor,
            composer,
            documents,
            general: None,
        }
    }

    pub fn with_off_topic_policy(mut self, policy: OffTopicPolicy, llm: Arc<LlmRouter>) -> Self {
        self.general = match policy {
            OffTopicPolicy::Refuse => None,
            OffTopicPolicy::Converse => Some(llm),
        };
        self
    }

    /// Answer a free-text question.
    ///
    /// Errors only when the model chain is exhausted on the compose or
    /// document path; every expected outcome is an answer.
    pub async fn answer(&self, question: &str) -> Result<RoutedAnswer> {
        let start_time = Instant::now();
        let request_id = Uuid::new_v4();

        info!(%request_id, question_len = question.len(), "QuestionRouter: received question");

        let routed = match self.extractor.extract(question).await {
            Ok(terms) => {
                debug!(%request_id, ?terms, "Parameters extracted");
                let outcome = calculate_payoff_for(&terms);
                let answer = self.composer.compose_payoff(question, &terms, &outcome).await?;
                RoutedAnswer::new(answer, AnswerSource::Calculation)
            }
            Err(ExtractionError::InvalidInput(message)) => {
                info!(%request_id, "Extracted parameters rejected");
                RoutedAnswer::new(message, AnswerSource::Rejected)
            }
            Err(e) => {
                warn!(%request_id, error = %e, "Falling back from calculation path");
                self.fallback(question).await?
            }
        };

        info!(
            %request_id,
            source = ?routed.source,
            elapsed_ms = start_time.elapsed().as_millis() as u64,
            "QuestionRouter: answered"
        );

        Ok(routed)
    }

    async fn fallback(&self, question: &str) -> Result<RoutedAnswer> {
        match TopicClassifier::classify(question) {
            TopicClass::Finance => {
                let answer = self.documents.answer_from_documents(question).await?;
                Ok(RoutedAnswer::new(answer, AnswerSource::Documents))
            }
            TopicClass::OffTopic => match &self.general {
                Some(llm) => {
                    let answer = llm.invoke(&build_general_prompt(question)).await?;
                    Ok(RoutedAnswer::new(answer, AnswerSource::General))
                }
                None => Ok(RoutedAnswer::new(
                    OFF_TOPIC_REPLY.to_string(),
                    AnswerSource::OffTopic,
                )),
            },
        }
    }
}

/// Deterministic payoff answer for the calculator endpoint
pub fn answer_payoff_time(req: &DebtCalculationRequest) -> Answer {
    if !(0.0..100.0).contains(&req.interest_rate) {
        return Answer::new(INVALID_RATE_MESSAGE);
    }
    if !(req.debt_amount > 0.0) || !(req.monthly_payment > 0.0) {
        return Answer::new("Debt amount and monthly payment must be greater than zero.");
    }

    match calculate_payoff(req.debt_amount, req.interest_rate, req.monthly_payment) {
        Ok(result) => Answer::new(payoff_text(&result, req.debt_amount)),
        Err(e) => Answer::new(payoff_error_text(&e, req.monthly_payment)),
    }
}

/// Deterministic payment answer for the calculator endpoint
pub fn answer_monthly_payment(req: &PaymentCalculationRequest) -> Answer {
    if !(0.0..100.0).contains(&req.interest_rate) {
        return Answer::new(INVALID_RATE_MESSAGE);
    }
    if !(req.debt_amount > 0.0) {
        return Answer::new("Debt amount must be greater than zero.");
    }

    let payment = calculate_monthly_payment(req.debt_amount, req.interest_rate, req.months);
    Answer::new(monthly_payment_text(payment, req.months))
}
