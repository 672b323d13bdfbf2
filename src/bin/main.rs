use debt_navigator::{
    amortization::{calculate_monthly_payment, calculate_payoff},
    composer::{AnswerComposer, AnswerStyle},
    extraction::ParameterExtractor,
    llm::{LlmRouter, MockProvider, ProviderKind, ProviderSpec, RetryPolicy},
    orchestrator::QuestionRouter,
    retrieval::{DocumentContext, RetrievalAnswerer},
};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .init();

    info!("Debt Navigator offline demo starting");

    println!("\n=== CALCULATORS ===");
    for (principal, rate, payment) in [(5000.0, 18.0, 150.0), (785900.0, 6.875, 5500.0), (785900.0, 6.875, 4500.0)] {
        match calculate_payoff(principal, rate, payment) {
            Ok(result) => println!(
                "{:>10.2} @ {:>6.3}% paying {:>8.2}: {}y {}m, total {:.2}",
                principal, rate, payment, result.years, result.months, result.total_paid
            ),
            Err(e) => println!(
                "{:>10.2} @ {:>6.3}% paying {:>8.2}: {} (minimum {:.2})",
                principal,
                rate,
                payment,
                e,
                e.suggested_minimum().unwrap_or_default()
            ),
        }
    }

    if let Some(payment) = calculate_monthly_payment(250000.0, 7.0, 360) {
        println!("250000.00 @ 7% over 360 months: {:.2}/month", payment);
    }

    // Scripted chain: the hosted provider is rate limited, the local one answers
    let hosted = Arc::new(MockProvider::failing("Gemini", "429 Too Many Requests"));
    let local = Arc::new(MockProvider::scripted(
        "Ollama",
        vec![
            Ok(r#"{"principal": 23980, "interest_rate": 13, "monthly_payment": 3500}"#.to_string()),
            Ok(r#"{"principal": null, "interest_rate": null, "monthly_payment": null}"#.to_string()),
            Ok("Paying a little extra each month shortens any loan.".to_string()),
        ],
    ));

    let retry = RetryPolicy::new(2, Duration::from_millis(100));
    let llm = Arc::new(LlmRouter::new(vec![
        ProviderSpec::new(hosted, ProviderKind::Hosted, retry),
        ProviderSpec::new(local, ProviderKind::Local, retry),
    ])?);

    let router = QuestionRouter::new(
        ParameterExtractor::new(llm.clone()),
        AnswerComposer::new(AnswerStyle::Template, llm.clone()),
        Arc::new(RetrievalAnswerer::new(llm, Arc::new(DocumentContext::empty()))),
    );

    println!("\n=== QUESTIONS ===");
    for question in [
        "i have 23980 debt with 13% interest rate, i will pay 3500 a month, how long will it take to pay it off",
        "How can I pay off my credit card debt faster?",
        "What's the capital of France?",
    ] {
        match router.answer(question).await {
            Ok(routed) => println!("Q: {}\nA [{:?}]: {}\n", question, routed.source, routed.answer),
            Err(e) => {
                eprintln!("Question failed: {}", e);
                return Err(Box::new(e) as Box<dyn std::error::Error>);
            }
        }
    }

    Ok(())
}
