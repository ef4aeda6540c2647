//! End-to-end gate behavior against stand-in upstream services.

use std::time::Duration;

use bastion_core::{
    ContentGate, GateConfig, SafetyVerdict, SemanticConfig, StatisticalConfig, VerdictSource,
};
use serde_json::json;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const CHAT_PATH: &str = "/v1/chat/completions";
const ANALYZE_PATH: &str = "/v1alpha1/comments:analyze";

fn gate_for(semantic: &MockServer, statistical: &MockServer) -> ContentGate {
    let config = GateConfig::new(
        SemanticConfig::new(format!("{}{}", semantic.uri(), CHAT_PATH))
            .with_timeout(Duration::from_millis(500)),
        StatisticalConfig::new("test-key")
            .with_endpoint(format!("{}{}", statistical.uri(), ANALYZE_PATH))
            .with_timeout(Duration::from_millis(500)),
    );
    ContentGate::new(config).unwrap()
}

async fn semantic_replies(server: &MockServer, content: &str) {
    Mock::given(method("POST"))
        .and(path(CHAT_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "choices": [{"message": {"role": "assistant", "content": content}}]
        })))
        .mount(server)
        .await;
}

async fn statistical_scores(server: &MockServer, toxicity: f64, expected_calls: u64) {
    Mock::given(method("POST"))
        .and(path(ANALYZE_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "attributeScores": {
                "TOXICITY": {"summaryScore": {"value": toxicity}}
            }
        })))
        .expect(expected_calls)
        .mount(server)
        .await;
}

async fn fails_with(server: &MockServer, status: u16) {
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(status))
        .mount(server)
        .await;
}

#[tokio::test]
async fn semantic_outage_falls_through_to_statistical_layer() {
    let semantic = MockServer::start().await;
    let statistical = MockServer::start().await;
    fails_with(&semantic, 503).await;
    statistical_scores(&statistical, 0.1, 1).await;

    let (verdict, stats) = gate_for(&semantic, &statistical)
        .validate_content_with_stats("hello friend")
        .await;

    assert_ne!(verdict.source_name(), "SemanticLayer");
    assert_eq!(verdict, SafetyVerdict::clean());
    assert_eq!(stats.degraded_layers, vec!["semantic"]);
}

#[tokio::test]
async fn semantic_outage_still_blocks_toxic_text() {
    let semantic = MockServer::start().await;
    let statistical = MockServer::start().await;
    fails_with(&semantic, 500).await;
    statistical_scores(&statistical, 0.93, 1).await;

    let verdict = gate_for(&semantic, &statistical)
        .validate_content("something hateful")
        .await;

    assert!(!verdict.is_safe());
    assert_eq!(verdict.source_name(), "StatisticalLayer");
    assert_eq!(verdict.score(), Some(0.93));
}

#[tokio::test]
async fn statistical_outage_fails_closed() {
    let semantic = MockServer::start().await;
    let statistical = MockServer::start().await;
    semantic_replies(&semantic, "safe").await;
    fails_with(&statistical, 500).await;

    let verdict = gate_for(&semantic, &statistical)
        .validate_content("hello friend")
        .await;

    assert!(!verdict.is_safe());
    assert_eq!(
        verdict.source(),
        &VerdictSource::StatisticalLayer { score: None }
    );
}

#[tokio::test]
async fn whitespace_input_fails_closed_on_statistical_outage() {
    let semantic = MockServer::start().await;
    let statistical = MockServer::start().await;
    semantic_replies(&semantic, "safe").await;
    fails_with(&statistical, 503).await;

    let verdict = gate_for(&semantic, &statistical)
        .validate_content("   \n\t")
        .await;

    assert!(!verdict.is_safe());
    assert_eq!(
        verdict.source(),
        &VerdictSource::StatisticalLayer { score: None }
    );
}

#[tokio::test]
async fn bare_unsafe_reports_unknown_category() {
    let semantic = MockServer::start().await;
    let statistical = MockServer::start().await;
    semantic_replies(&semantic, "unsafe").await;
    statistical_scores(&statistical, 0.0, 0).await;

    let verdict = gate_for(&semantic, &statistical)
        .validate_content("bad request")
        .await;

    assert!(!verdict.is_safe());
    assert_eq!(
        verdict.flagged_categories(),
        Some(&["Unknown".to_string()][..])
    );
}

#[tokio::test]
async fn semantic_unsafe_skips_statistical_layer() {
    let semantic = MockServer::start().await;
    let statistical = MockServer::start().await;
    semantic_replies(&semantic, "unsafe\nO1,O3").await;
    statistical_scores(&statistical, 0.0, 0).await;

    let (verdict, stats) = gate_for(&semantic, &statistical)
        .validate_content_with_stats("bad request")
        .await;

    assert_eq!(
        verdict.flagged_categories(),
        Some(&["O1".to_string(), "O3".to_string()][..])
    );
    assert!(stats.short_circuited);
    // Dropping the statistical server verifies `.expect(0)`.
}

#[tokio::test]
async fn toxicity_at_threshold_passes() {
    let semantic = MockServer::start().await;
    let statistical = MockServer::start().await;
    semantic_replies(&semantic, "safe").await;
    statistical_scores(&statistical, 0.70, 1).await;

    let verdict = gate_for(&semantic, &statistical)
        .validate_content("borderline")
        .await;

    assert!(verdict.is_safe());
}

#[tokio::test]
async fn toxicity_above_threshold_blocks() {
    let semantic = MockServer::start().await;
    let statistical = MockServer::start().await;
    semantic_replies(&semantic, "safe").await;
    statistical_scores(&statistical, 0.71, 1).await;

    let verdict = gate_for(&semantic, &statistical)
        .validate_content("rude words")
        .await;

    assert!(!verdict.is_safe());
    assert_eq!(verdict.source_name(), "StatisticalLayer");
    assert_eq!(verdict.score(), Some(0.71));
}

#[tokio::test]
async fn both_layers_safe_is_clean() {
    let semantic = MockServer::start().await;
    let statistical = MockServer::start().await;
    semantic_replies(&semantic, "safe").await;
    statistical_scores(&statistical, 0.05, 1).await;

    let verdict = gate_for(&semantic, &statistical)
        .validate_content("what is the capital of France?")
        .await;

    assert_eq!(
        serde_json::to_value(&verdict).unwrap(),
        json!({"isSafe": true, "source": "Clean"})
    );
}

#[tokio::test]
async fn concurrent_calls_are_independent() {
    let semantic = MockServer::start().await;
    let statistical = MockServer::start().await;
    semantic_replies(&semantic, "safe").await;
    statistical_scores(&statistical, 0.2, 3).await;

    let gate = gate_for(&semantic, &statistical);
    let (a, b, c) = tokio::join!(
        gate.validate_content("one"),
        gate.validate_content("two"),
        gate.validate_content("three"),
    );

    for verdict in [a, b, c] {
        assert_eq!(verdict, SafetyVerdict::clean());
    }
}
