//! REST API server for the debt navigator
//!
//! Thin adapters over the calculators, the question router and the
//! debt store. No endpoint carries logic of its own.

use axum::{
    extract::{Path, State},
    http::{HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    routing::{delete, get, post},
    Json, Router,
};
use serde_json::{json, Map, Value};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

use crate::amortization::calculate_payoff;
use crate::error::NavigatorError;
use crate::llm::LlmRouter;
use crate::models::{
    Answer, DebtCalculationRequest, DebtRecord, NewDebt, PaymentCalculationRequest, PayoffResult,
    Question, RepaymentPlanRequest,
};
use crate::orchestrator::{answer_monthly_payment, answer_payoff_time, QuestionRouter};
use crate::store::DebtStore;

/// =============================
/// Error Response
/// =============================

/// Maps crate errors onto `{detail}` bodies
#[derive(Debug)]
pub struct ApiError(NavigatorError);

impl From<NavigatorError> for ApiError {
    fn from(e: NavigatorError) -> Self {
        Self(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            NavigatorError::NotFound(_) => StatusCode::NOT_FOUND,
            NavigatorError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };

        if self.0.is_fatal() {
            error!("Request failed: {}", self.0);
        }

        let detail = match self.0 {
            NavigatorError::NotFound(msg) | NavigatorError::InvalidInput(msg) => msg,
            other => other.to_string(),
        };

        (status, Json(json!({ "detail": detail }))).into_response()
    }
}

type ApiResult<T> = std::result::Result<Json<T>, ApiError>;

/// =============================
/// API State
/// =============================

#[derive(Clone)]
pub struct ApiState {
    pub question_router: Arc<QuestionRouter>,
    pub llm: Arc<LlmRouter>,
    pub store: Arc<dyn DebtStore>,
}

/// =============================
/// Health Endpoints
/// =============================

async fn health() -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "message": "Momentum AI is running",
        "timestamp": chrono::Utc::now().to_rfc3339()
    }))
}

async fn llm_status(State(state): State<ApiState>) -> Json<Map<String, Value>> {
    Json(state.llm.status().await)
}

/// =============================
/// Question & Calculator Endpoints
/// =============================

async fn ask(State(state): State<ApiState>, Json(q): Json<Question>) -> ApiResult<Answer> {
    let routed = state.question_router.answer(&q.question).await?;
    Ok(Json(Answer::new(routed.answer)))
}

async fn calculate_payoff_time(Json(req): Json<DebtCalculationRequest>) -> Json<Answer> {
    Json(answer_payoff_time(&req))
}

async fn calculate_monthly_payment(Json(req): Json<PaymentCalculationRequest>) -> Json<Answer> {
    Json(answer_monthly_payment(&req))
}

/// =============================
/// Debt Endpoints
/// =============================

async fn create_debt(State(state): State<ApiState>, Json(debt): Json<NewDebt>) -> ApiResult<DebtRecord> {
    let record = state.store.create_debt(debt).await?;
    info!(debt_id = record.id, user_id = record.user_id, "Debt created");
    Ok(Json(record))
}

async fn list_debts(
    State(state): State<ApiState>,
    Path(user_id): Path<i64>,
) -> ApiResult<Vec<DebtRecord>> {
    Ok(Json(state.store.list_debts(user_id).await?))
}

async fn calculate_repayment_plan(
    State(state): State<ApiState>,
    Json(req): Json<RepaymentPlanRequest>,
) -> ApiResult<PayoffResult> {
    let terms = state
        .store
        .lookup_debt(req.debt_id)
        .await?
        .ok_or_else(|| NavigatorError::NotFound("Debt not found.".into()))?;

    if !(req.monthly_payment > 0.0) {
        return Err(NavigatorError::InvalidInput("Monthly payment must be greater than zero.".into()).into());
    }

    calculate_payoff(terms.amount, terms.interest_rate, req.monthly_payment)
        .map(Json)
        .map_err(|e| {
            warn!(debt_id = req.debt_id, error = %e, "Repayment plan rejected");
            NavigatorError::InvalidInput(e.to_string()).into()
        })
}

async fn delete_user(State(state): State<ApiState>, Path(user_id): Path<i64>) -> ApiResult<Value> {
    if !state.store.delete_user(user_id).await? {
        return Err(NavigatorError::NotFound("User not found.".into()).into());
    }

    info!(user_id, "User debts deleted");
    Ok(Json(json!({ "message": "User and associated debts deleted successfully." })))
}

/// =============================
/// Router
/// =============================

fn cors_layer(origins: &[String]) -> CorsLayer {
    if origins.iter().any(|o| o == "*") {
        return CorsLayer::permissive();
    }

    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|o| match HeaderValue::from_str(o) {
            Ok(value) => Some(value),
            Err(_) => {
                warn!(origin = %o, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(allowed)
        .allow_methods(Any)
        .allow_headers(Any)
}

pub fn create_router(state: ApiState, cors_origins: &[String]) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/llm_status", get(llm_status))
        .route("/ask", post(ask))
        .route("/calculate_payoff_time", post(calculate_payoff_time))
        .route("/calculate_monthly_payment", post(calculate_monthly_payment))
        .route("/calculate_repayment_plan", post(calculate_repayment_plan))
        .route("/debts", post(create_debt))
        .route("/debts/:user_id", get(list_debts))
        .route("/users/:user_id", delete(delete_user))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer(cors_origins))
}

/// =============================
/// Server Startup
/// =============================

pub async fn start_server(
    state: ApiState,
    cors_origins: &[String],
    port: u16,
) -> std::result::Result<(), Box<dyn std::error::Error>> {
    let router = create_router(state, cors_origins);

    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", port)).await?;

    info!("API Server listening on http://0.0.0.0:{}", port);
    info!("Local: http://127.0.0.1:{}", port);

    axum::serve(listener, router).await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::composer::{AnswerComposer, AnswerStyle};
    use crate::extraction::ParameterExtractor;
    use crate::llm::{MockProvider, ProviderKind, ProviderSpec, RetryPolicy};
    use crate::retrieval::{DocumentContext, RetrievalAnswerer};
    use crate::store::InMemoryDebtStore;
    use axum::body::Body;
    use axum::http::Request;
    use std::time::Duration;
    use tower::ServiceExt;

    fn app(provider: Arc<MockProvider>) -> Router {
        let spec = ProviderSpec::new(
            provider,
            ProviderKind::Hosted,
            RetryPolicy::new(1, Duration::from_millis(1)),
        );
        let llm = Arc::new(LlmRouter::new(vec![spec]).unwrap());

        let question_router = QuestionRouter::new(
            ParameterExtractor::new(llm.clone()),
            AnswerComposer::new(AnswerStyle::Template, llm.clone()),
            Arc::new(RetrievalAnswerer::new(
                llm.clone(),
                Arc::new(DocumentContext::empty()),
            )),
        );

        let state = ApiState {
            question_router: Arc::new(question_router),
            llm,
            store: Arc::new(InMemoryDebtStore::new()),
        };

        create_router(state, &["http://localhost:3000".to_string()])
    }

    fn offline_app() -> Router {
        app(Arc::new(MockProvider::failing("mock", "connection refused")))
    }

    async fn send(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let builder = Request::builder().method(method).uri(uri);
        let request = match body {
            Some(json) => builder
                .header("content-type", "application/json")
                .body(Body::from(json.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };

        (status, value)
    }

    #[tokio::test]
    async fn test_health() {
        let (status, body) = send(&offline_app(), "GET", "/health", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "healthy");
        assert_eq!(body["message"], "Momentum AI is running");
    }

    #[tokio::test]
    async fn test_llm_status() {
        let (status, body) = send(&offline_app(), "GET", "/llm_status", None).await;
        assert_eq!(status, StatusCode::OK);
        assert!(body["mock"].as_str().unwrap().starts_with("Unavailable:"));
    }

    #[tokio::test]
    async fn test_calculate_payoff_time() {
        let app = offline_app();

        let (status, body) = send(
            &app,
            "POST",
            "/calculate_payoff_time",
            Some(json!({"debt_amount": 5000, "interest_rate": 18, "monthly_payment": 150})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert!(body["answer"].as_str().unwrap().contains("3 years and 11 months"));

        let (status, body) = send(
            &app,
            "POST",
            "/calculate_payoff_time",
            Some(json!({"debt_amount": 785900, "interest_rate": 6.875, "monthly_payment": 4500})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert!(body["answer"].as_str().unwrap().contains("$4,503.55"));

        let (status, body) = send(
            &app,
            "POST",
            "/calculate_payoff_time",
            Some(json!({"debt_amount": 5000, "interest_rate": 120, "monthly_payment": 150})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            body["answer"],
            "Interest rate must be a percentage between 0 and 100."
        );
    }

    #[tokio::test]
    async fn test_calculate_monthly_payment() {
        let app = offline_app();

        let (status, body) = send(
            &app,
            "POST",
            "/calculate_monthly_payment",
            Some(json!({"debt_amount": 250000, "interest_rate": 7, "months": 360})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert!(body["answer"].as_str().unwrap().contains("$1,663.26"));

        let (_, body) = send(
            &app,
            "POST",
            "/calculate_monthly_payment",
            Some(json!({"debt_amount": 250000, "interest_rate": 7, "months": 0})),
        )
        .await;
        assert_eq!(body["answer"], "The number of months must be greater than zero.");
    }

    #[tokio::test]
    async fn test_ask_calculation() {
        let app = app(Arc::new(MockProvider::replying(
            "mock",
            r#"```json
{"principal": 23980, "interest_rate": 13, "monthly_payment": 3500}
```"#,
        )));

        let (status, body) = send(
            &app,
            "POST",
            "/ask",
            Some(json!({"question": "i have 23980 debt with 13% interest rate, i will pay 3500 a month"})),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert!(body["answer"]
            .as_str()
            .unwrap()
            .starts_with("It will take approximately 0 years and 8 months"));
    }

    #[tokio::test]
    async fn test_ask_exhausted_is_server_error() {
        let (status, body) = send(
            &offline_app(),
            "POST",
            "/ask",
            Some(json!({"question": "What is a good credit score?"})),
        )
        .await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(body["detail"]
            .as_str()
            .unwrap()
            .starts_with("All available LLMs failed. Last error from mock"));
    }

    #[tokio::test]
    async fn test_debt_lifecycle() {
        let app = offline_app();

        let (status, created) = send(
            &app,
            "POST",
            "/debts",
            Some(json!({"user_id": 7, "name": "Credit card", "amount": 5000, "interest_rate": 18})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let debt_id = created["id"].as_i64().unwrap();

        let (status, listed) = send(&app, "GET", "/debts/7", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(listed.as_array().unwrap().len(), 1);

        let (status, plan) = send(
            &app,
            "POST",
            "/calculate_repayment_plan",
            Some(json!({"debt_id": debt_id, "monthly_payment": 150})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(plan["years"], 3);
        assert_eq!(plan["months"], 11);
        assert_eq!(plan["total_paid"], 6983.6);

        let (status, body) = send(
            &app,
            "POST",
            "/calculate_repayment_plan",
            Some(json!({"debt_id": debt_id, "monthly_payment": 50})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["detail"].as_str().unwrap().contains("too low"));

        let (status, _) = send(&app, "DELETE", "/users/7", None).await;
        assert_eq!(status, StatusCode::OK);

        let (status, body) = send(&app, "DELETE", "/users/7", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["detail"], "User not found.");
    }

    #[tokio::test]
    async fn test_repayment_plan_missing_debt() {
        let (status, body) = send(
            &offline_app(),
            "POST",
            "/calculate_repayment_plan",
            Some(json!({"debt_id": 404, "monthly_payment": 150})),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["detail"], "Debt not found.");
    }

    #[tokio::test]
    async fn test_invalid_debt_is_bad_request() {
        let (status, _) = send(
            &offline_app(),
            "POST",
            "/debts",
            Some(json!({"user_id": 1, "name": "Bad", "amount": -5, "interest_rate": 5})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }
}
