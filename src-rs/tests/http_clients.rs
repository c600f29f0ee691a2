//! HTTP collaborators against a local mock server.

mod common;

use std::time::Duration;

use mockito::{Matcher, Server};
use secrecy::SecretString;
use serde_json::{json, Map, Value};

use common::QUERIES;
use stock_agent_rs::config::{CalcConfig, ModelConfig, SearchConfig};
use stock_agent_rs::llm::{CompletionRequest, GeminiAdapter, Message, OllamaAdapter, ProviderAdapter};
use stock_agent_rs::tools::{CalculationService, HttpCalcService, SearchProvider, SerpApiClient, TransportError};
use stock_agent_rs::{AgentConfig, ComparisonAgent, ComparisonRequest, SessionOutcome};

fn chat_request() -> CompletionRequest {
    CompletionRequest {
        messages: vec![Message::system("be brief"), Message::user("compare AAPL and MSFT")],
        tools: None,
        temperature: None,
        model: None,
        provider: None,
    }
}

fn payload(value: Value) -> Map<String, Value> {
    value.as_object().cloned().unwrap()
}

#[test]
fn serpapi_sends_engine_key_and_query() {
    let mut server = Server::new();
    let mock = server
        .mock("GET", "/search")
        .match_query(Matcher::AllOf(vec![
            Matcher::UrlEncoded("engine".into(), "google".into()),
            Matcher::UrlEncoded("q".into(), "AAPL current stock price".into()),
            Matcher::UrlEncoded("api_key".into(), "secret-key".into()),
            Matcher::UrlEncoded("num".into(), "10".into()),
        ]))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"organic_results": [{"snippet": "AAPL at $187.44"}]}"#)
        .create();

    let client = SerpApiClient::new(SearchConfig::new("secret-key").with_base_url(server.url())).unwrap();
    let body = client.search("AAPL current stock price").unwrap();

    mock.assert();
    assert_eq!(body["organic_results"][0]["snippet"], "AAPL at $187.44");
}

#[test]
fn serpapi_error_status_is_reported() {
    let mut server = Server::new();
    server
        .mock("GET", "/search")
        .match_query(Matcher::Any)
        .with_status(401)
        .with_body("Invalid API key")
        .create();

    let client = SerpApiClient::new(SearchConfig::new("bad").with_base_url(server.url())).unwrap();
    let err = client.search("anything").unwrap_err();
    assert_eq!(
        err,
        TransportError::Status {
            status: 401,
            body: "Invalid API key".to_string(),
        }
    );
}

#[test]
fn serpapi_non_json_body_is_a_decode_error() {
    let mut server = Server::new();
    server
        .mock("GET", "/search")
        .match_query(Matcher::Any)
        .with_status(200)
        .with_body("<html>captcha</html>")
        .create();

    let client = SerpApiClient::new(SearchConfig::new("k").with_base_url(server.url())).unwrap();
    assert!(matches!(client.search("q"), Err(TransportError::Decode(_))));
}

#[test]
fn unreachable_host_is_a_request_error() {
    let mut cfg = SearchConfig::new("k").with_base_url("http://127.0.0.1:9");
    cfg.timeout = Duration::from_secs(5);
    let client = SerpApiClient::new(cfg).unwrap();
    assert!(matches!(client.search("q"), Err(TransportError::Request(_))));
}

#[test]
fn calc_posts_json_to_the_endpoint() {
    let mut server = Server::new();
    let mock = server
        .mock("POST", "/price-return")
        .match_body(Matcher::PartialJson(json!({"initial_price": 100.0, "final_price": 120.0})))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"price_return": 20.0}"#)
        .create();

    let calc = HttpCalcService::new(&CalcConfig {
        base_url: format!("{}/", server.url()),
        ..CalcConfig::default()
    })
    .unwrap();
    let out = calc
        .call("price-return", &payload(json!({"initial_price": 100.0, "final_price": 120.0})))
        .unwrap();

    mock.assert();
    assert_eq!(out.get("price_return"), Some(&json!(20.0)));
}

#[test]
fn calc_rejects_non_object_bodies() {
    let mut server = Server::new();
    server.mock("POST", "/total-return").with_status(200).with_body("22.0").create();

    let calc = HttpCalcService::new(&CalcConfig {
        base_url: server.url(),
        ..CalcConfig::default()
    })
    .unwrap();
    let err = calc.call("total-return", &Map::new()).unwrap_err();
    assert!(matches!(err, TransportError::Decode(_)));
}

#[test]
fn calc_validation_error_keeps_the_body() {
    let mut server = Server::new();
    server
        .mock("POST", "/dividend-yield")
        .with_status(422)
        .with_body(r#"{"detail": "initial_price must not be zero"}"#)
        .create();

    let calc = HttpCalcService::new(&CalcConfig {
        base_url: server.url(),
        ..CalcConfig::default()
    })
    .unwrap();
    match calc.call("dividend-yield", &Map::new()).unwrap_err() {
        TransportError::Status { status, body } => {
            assert_eq!(status, 422);
            assert!(body.contains("must not be zero"));
        }
        other => panic!("unexpected error: {:?}", other),
    }
}

#[test]
fn ollama_round_trip() {
    let mut server = Server::new();
    let mock = server
        .mock("POST", "/api/chat")
        .match_body(Matcher::PartialJson(json!({"model": "llama3", "stream": false})))
        .with_status(200)
        .with_body(
            json!({"message": {"role": "assistant", "content": "", "tool_calls": [
                {"function": {"name": "search_stock_data", "arguments": {"query": ["AAPL current stock price"]}}}
            ]}})
            .to_string(),
        )
        .create();

    let cfg = ModelConfig {
        ollama_base_url: server.url(),
        ..ModelConfig::default()
    };
    let adapter = OllamaAdapter::new(&cfg, "llama3", 0.3).unwrap();
    let resp = adapter.complete(chat_request()).unwrap();

    mock.assert();
    assert_eq!(resp.tool_calls.len(), 1);
    assert_eq!(resp.tool_calls[0].name, "search_stock_data");
    assert_eq!(resp.tool_calls[0].arguments().unwrap()["query"][0], "AAPL current stock price");
}

#[test]
fn ollama_server_error_is_classified() {
    let mut server = Server::new();
    server.mock("POST", "/api/chat").with_status(503).with_body("loading model").create();

    let cfg = ModelConfig {
        ollama_base_url: server.url(),
        ..ModelConfig::default()
    };
    let err = OllamaAdapter::new(&cfg, "llama3", 0.3)
        .unwrap()
        .complete(chat_request())
        .unwrap_err();
    assert_eq!(err.code, "server_error");
    assert_eq!(err.message, "loading model");
}

#[test]
fn gemini_sends_key_header_and_reads_function_calls() {
    let mut server = Server::new();
    let mock = server
        .mock("POST", "/v1beta/models/gemini-1.5-flash:generateContent")
        .match_header("x-goog-api-key", "g-key")
        .match_body(Matcher::PartialJson(json!({
            "systemInstruction": {"parts": [{"text": "be brief"}]}
        })))
        .with_status(200)
        .with_body(
            json!({"candidates": [{"content": {"parts": [
                {"text": "Searching."},
                {"functionCall": {"name": "search_stock_data", "args": {"query": ["MSFT current stock price"]}}}
            ]}}]})
            .to_string(),
        )
        .create();

    let cfg = ModelConfig {
        gemini_base_url: server.url(),
        ..ModelConfig::default()
    };
    let adapter = GeminiAdapter::new(&cfg, SecretString::new("g-key".to_string()), "gemini-1.5-flash", 0.0).unwrap();
    let resp = adapter.complete(chat_request()).unwrap();

    mock.assert();
    assert_eq!(resp.content, "Searching.");
    assert_eq!(resp.tool_calls[0].name, "search_stock_data");
}

#[test]
fn gemini_quota_is_a_rate_limit() {
    let mut server = Server::new();
    server
        .mock("POST", Matcher::Any)
        .with_status(400)
        .with_body(r#"{"error": {"status": "RESOURCE_EXHAUSTED"}}"#)
        .create();

    let cfg = ModelConfig {
        gemini_base_url: server.url(),
        ..ModelConfig::default()
    };
    let err = GeminiAdapter::new(&cfg, SecretString::new("k".to_string()), "gemini-1.5-flash", 0.0)
        .unwrap()
        .complete(chat_request())
        .unwrap_err();
    assert_eq!(err.code, "rate_limit");
}

#[test]
fn full_session_over_http() {
    let mut model = Server::new();
    let mut search = Server::new();
    let mut calc = Server::new();

    model
        .mock("POST", "/api/chat")
        .with_status(200)
        .with_body(
            json!({"message": {"role": "assistant", "content": "", "tool_calls": [
                {"function": {"name": "search_stock_data", "arguments": {"query": QUERIES}}}
            ]}})
            .to_string(),
        )
        .create();

    let prices = [100.0, 120.0, 200.0, 210.0, 2.0, 3.0];
    for (query, price) in QUERIES.iter().zip(prices) {
        search
            .mock("GET", "/search")
            .match_query(Matcher::UrlEncoded("q".into(), query.to_string()))
            .with_status(200)
            .with_body(json!({"organic_results": [{"snippet": format!("{} was ${:.2}", query, price)}]}).to_string())
            .create();
    }

    let responses = [
        ("price-return", json!({"initial_price": 100.0}), json!({"price_return": 20.0})),
        ("dividend-yield", json!({"initial_price": 100.0}), json!({"dividend_yield": 2.0})),
        ("total-return", json!({"price_return": 20.0}), json!({"total_return": 22.0})),
        ("price-return", json!({"initial_price": 200.0}), json!({"price_return": 5.0})),
        ("dividend-yield", json!({"initial_price": 200.0}), json!({"dividend_yield": 1.5})),
        ("total-return", json!({"price_return": 5.0}), json!({"total_return": 6.5})),
    ];
    for (endpoint, matcher, body) in responses {
        calc.mock("POST", format!("/{}", endpoint).as_str())
            .match_body(Matcher::PartialJson(matcher))
            .with_status(200)
            .with_body(body.to_string())
            .create();
    }
    let compare = calc
        .mock("POST", "/compare")
        .match_body(Matcher::PartialJson(json!({"stock_a_name": "AAPL", "stock_b_return": 6.5})))
        .with_status(200)
        .with_body(json!({"summary": "AAPL outperformed MSFT by 15.50%."}).to_string())
        .expect(1)
        .create();

    let mut cfg = AgentConfig::new(SearchConfig::new("k").with_base_url(search.url()));
    cfg.enable_run_store = false;
    cfg.calc.base_url = calc.url();
    cfg.llm.ollama_base_url = model.url();

    let agent = ComparisonAgent::from_config("http-agent", cfg).unwrap();
    let outcome = agent.run(&ComparisonRequest::new("aapl", "msft")).unwrap();

    compare.assert();
    let SessionOutcome::Completed(report) = outcome else {
        panic!("expected completion, got {:?}", outcome);
    };
    assert_eq!(report.comparison.summary, "AAPL outperformed MSFT by 15.50%.");
    assert_eq!(report.comparison.winner.as_deref(), Some("AAPL"));
    assert!(common::close(report.comparison.margin, 15.5));
}
