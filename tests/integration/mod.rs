//! Integration tests for the Pokemon gateway.
//!
//! A `wiremock` server stands in for PokeAPI so upstream calls can be counted
//! and scripted.
//!
//! Run with: cargo test --test integration

use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use tower::ServiceExt;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, Request as MockRequest, Respond, ResponseTemplate};

use pokemon_gateway::api::{create_router, AppState};
use pokemon_gateway::config::Config;
use pokemon_gateway::lookup::PokemonClient;
use pokemon_gateway::GatewayError;

const BASE_PATH: &str = "/api/v2/pokemon";

/// Config pointing at the mock server with a short backoff.
fn test_config(server: &MockServer, backoff_ms: u64) -> Config {
    Config {
        upstream_base_url: format!("{}{}/", server.uri(), BASE_PATH),
        upstream_timeout_ms: 2_000,
        backoff_base_ms: backoff_ms,
        metrics_enabled: false,
        ..Config::default()
    }
}

fn pikachu_body() -> Value {
    json!({
        "id": 25,
        "name": "pikachu",
        "height": 4,
        "weight": 60,
        "types": [{ "slot": 1, "type": { "name": "electric", "url": "https://pokeapi.co/api/v2/type/13/" } }],
        "abilities": [
            { "ability": { "name": "static", "url": "https://pokeapi.co/api/v2/ability/9/" }, "is_hidden": false, "slot": 1 },
            { "ability": { "name": "lightning-rod", "url": "https://pokeapi.co/api/v2/ability/31/" }, "is_hidden": true, "slot": 3 }
        ]
    })
}

fn pikachu_normalized() -> Value {
    json!({
        "name": "pikachu",
        "type": "electric",
        "height": 4,
        "weight": 60,
        "first_ability": "static"
    })
}

async fn call(config: &Config, uri: &str) -> (StatusCode, Value) {
    let client = PokemonClient::new(config).unwrap();
    let app = create_router(AppState::new(client));

    let response = app
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();

    let status = response.status();
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, serde_json::from_slice(&body).unwrap())
}

/// Answers 503 for the first `failures` requests, then 200, noting when each
/// request arrived.
#[derive(Clone)]
struct FlakyUpstream {
    failures: usize,
    arrivals: Arc<Mutex<Vec<Instant>>>,
}

impl FlakyUpstream {
    fn new(failures: usize) -> Self {
        Self {
            failures,
            arrivals: Arc::new(Mutex::new(Vec::new())),
        }
    }

    fn gaps(&self) -> Vec<Duration> {
        let arrivals = self.arrivals.lock().unwrap();
        arrivals.windows(2).map(|w| w[1] - w[0]).collect()
    }
}

impl Respond for FlakyUpstream {
    fn respond(&self, _request: &MockRequest) -> ResponseTemplate {
        let mut arrivals = self.arrivals.lock().unwrap();
        arrivals.push(Instant::now());
        if arrivals.len() <= self.failures {
            ResponseTemplate::new(503)
        } else {
            ResponseTemplate::new(200).set_body_json(pikachu_body())
        }
    }
}

async fn upstream_calls(server: &MockServer) -> usize {
    server.received_requests().await.map(|r| r.len()).unwrap_or(0)
}

#[tokio::test]
async fn well_formed_upstream_is_normalized() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(format!("{}/pikachu", BASE_PATH)))
        .respond_with(ResponseTemplate::new(200).set_body_json(pikachu_body()))
        .expect(1)
        .mount(&server)
        .await;

    let (status, body) = call(&test_config(&server, 10), "/pokemon-info?name=pikachu").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, pikachu_normalized());
}

#[tokio::test]
async fn surrounding_whitespace_is_trimmed() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(format!("{}/pikachu", BASE_PATH)))
        .respond_with(ResponseTemplate::new(200).set_body_json(pikachu_body()))
        .expect(1)
        .mount(&server)
        .await;

    let (status, body) = call(&test_config(&server, 10), "/pokemon-info?name=%20pikachu%20").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["name"], "pikachu");
}

#[tokio::test]
async fn missing_or_empty_name_never_calls_upstream() {
    let server = MockServer::start().await;
    let config = test_config(&server, 10);

    for uri in ["/pokemon-info", "/pokemon-info?name=", "/pokemon-info?name=%20%20"] {
        let (status, body) = call(&config, uri).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "uri: {}", uri);
        assert_eq!(body, json!({ "error": "missing 'name' query parameter" }));
    }

    assert_eq!(upstream_calls(&server).await, 0);
}

#[tokio::test]
async fn disallowed_characters_never_call_upstream() {
    let server = MockServer::start().await;
    let config = test_config(&server, 10);

    for uri in [
        "/pokemon-info?name=Pikachu",
        "/pokemon-info?name=mr%20mime",
        "/pokemon-info?name=pika%2Fchu",
        "/pokemon-info?name=ho_oh",
    ] {
        let (status, body) = call(&config, uri).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "uri: {}", uri);
        assert_eq!(body, json!({ "error": "Invalid Pokémon name" }));
    }

    assert_eq!(upstream_calls(&server).await, 0);
}

#[tokio::test]
async fn upstream_404_is_not_retried() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(404).set_body_string("Not Found"))
        .expect(1)
        .mount(&server)
        .await;

    let (status, body) = call(&test_config(&server, 10), "/pokemon-info?name=missingno").await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body, json!({ "error": "Pokemon not found" }));
    assert_eq!(upstream_calls(&server).await, 1);
}

#[tokio::test]
async fn two_503s_then_200_succeeds_after_backoff() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(2)
        .with_priority(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(pikachu_body()))
        .with_priority(2)
        .mount(&server)
        .await;

    let backoff_ms = 50;
    let start = Instant::now();
    let (status, body) = call(&test_config(&server, backoff_ms), "/pokemon-info?name=pikachu").await;
    let elapsed = start.elapsed();

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, pikachu_normalized());
    assert_eq!(upstream_calls(&server).await, 3);
    // 1x backoff before attempt 2, 2x before attempt 3.
    assert!(
        elapsed >= Duration::from_millis(backoff_ms * 3),
        "elapsed {:?} shorter than cumulative backoff",
        elapsed
    );
}

#[tokio::test]
async fn default_backoff_waits_half_then_one_second() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(500))
        .up_to_n_times(2)
        .with_priority(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(pikachu_body()))
        .with_priority(2)
        .mount(&server)
        .await;

    let config = test_config(&server, 500);
    let start = Instant::now();
    let (status, _) = call(&config, "/pokemon-info?name=pikachu").await;
    let elapsed = start.elapsed();

    assert_eq!(status, StatusCode::OK);
    assert!(elapsed >= Duration::from_millis(1_500), "elapsed {:?}", elapsed);
    assert!(elapsed < Duration::from_secs(5), "elapsed {:?}", elapsed);
}

#[tokio::test]
async fn backoff_grows_by_one_unit_per_attempt() {
    let server = MockServer::start().await;
    let upstream = FlakyUpstream::new(2);
    Mock::given(method("GET"))
        .respond_with(upstream.clone())
        .expect(3)
        .mount(&server)
        .await;

    let backoff = Duration::from_millis(500);
    let (status, body) = call(&test_config(&server, 500), "/pokemon-info?name=pikachu").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, pikachu_normalized());

    let gaps = upstream.gaps();
    assert_eq!(gaps.len(), 2, "gaps: {:?}", gaps);
    assert!(gaps[0] >= backoff, "first gap {:?}", gaps[0]);
    assert!(gaps[0] < backoff * 2, "first gap {:?}", gaps[0]);
    assert!(gaps[1] >= backoff * 2, "second gap {:?}", gaps[1]);
    assert!(gaps[1] < backoff * 3, "second gap {:?}", gaps[1]);
    assert!(gaps[1] > gaps[0]);
}

#[tokio::test]
async fn three_503s_report_upstream_unavailable() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(503))
        .expect(3)
        .mount(&server)
        .await;

    let (status, body) = call(&test_config(&server, 10), "/pokemon-info?name=pikachu").await;

    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(body, json!({ "error": "upstream service unavailable" }));
    assert_eq!(upstream_calls(&server).await, 3);
}

#[tokio::test]
async fn other_statuses_are_terminal_upstream_errors() {
    for code in [301u16, 401, 403, 429] {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(code))
            .mount(&server)
            .await;

        let (status, body) = call(&test_config(&server, 10), "/pokemon-info?name=pikachu").await;

        assert_eq!(status, StatusCode::BAD_GATEWAY, "upstream status {}", code);
        assert_eq!(body, json!({ "error": "upstream error" }));
        assert_eq!(upstream_calls(&server).await, 1, "upstream status {}", code);
    }
}

#[tokio::test]
async fn missing_lists_give_null_fields() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({ "name": "ditto", "height": 3, "weight": 40 })),
        )
        .mount(&server)
        .await;

    let (status, body) = call(&test_config(&server, 10), "/pokemon-info?name=ditto").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body,
        json!({
            "name": "ditto",
            "type": null,
            "height": 3,
            "weight": 40,
            "first_ability": null
        })
    );
}

#[tokio::test]
async fn broken_abilities_give_unexpected_data() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "name": "pikachu",
            "abilities": ["static"]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let (status, body) = call(&test_config(&server, 10), "/pokemon-info?name=pikachu").await;

    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(body, json!({ "error": "upstream returned unexpected data" }));
}

#[tokio::test]
async fn non_json_body_gives_unexpected_data() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>maintenance</html>"))
        .mount(&server)
        .await;

    let (status, body) = call(&test_config(&server, 10), "/pokemon-info?name=pikachu").await;

    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(body, json!({ "error": "upstream returned unexpected data" }));
}

#[tokio::test]
async fn slow_upstream_times_out_and_is_retried() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(pikachu_body())
                .set_delay(Duration::from_millis(500)),
        )
        .mount(&server)
        .await;

    let config = Config {
        upstream_timeout_ms: 100,
        ..test_config(&server, 10)
    };
    let (status, body) = call(&config, "/pokemon-info?name=pikachu").await;

    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(body, json!({ "error": "upstream service unavailable" }));
    assert_eq!(upstream_calls(&server).await, 3);
}

#[tokio::test]
async fn unreachable_upstream_is_unavailable() {
    // Grab a free port, then release it so nothing is listening.
    let port = std::net::TcpListener::bind("127.0.0.1:0")
        .unwrap()
        .local_addr()
        .unwrap()
        .port();
    let config = Config {
        upstream_base_url: format!("http://127.0.0.1:{}{}/", port, BASE_PATH),
        backoff_base_ms: 10,
        ..Config::default()
    };

    let client = PokemonClient::new(&config).unwrap();
    let err = client.lookup(Some("pikachu")).await.unwrap_err();

    match err {
        GatewayError::UpstreamUnavailable { attempts, .. } => assert_eq!(attempts, 3),
        other => panic!("expected UpstreamUnavailable, got {:?}", other),
    }
}

#[tokio::test]
async fn numeric_names_pass_by_default_and_fail_when_rejected() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(format!("{}/25", BASE_PATH)))
        .respond_with(ResponseTemplate::new(200).set_body_json(pikachu_body()))
        .expect(1)
        .mount(&server)
        .await;

    let (status, _) = call(&test_config(&server, 10), "/pokemon-info?name=25").await;
    assert_eq!(status, StatusCode::OK);

    let strict = Config {
        reject_numeric_names: true,
        ..test_config(&server, 10)
    };
    let (status, body) = call(&strict, "/pokemon-info?name=25").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, json!({ "error": "Invalid Pokémon name" }));
}

#[tokio::test]
async fn health_does_not_touch_upstream() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let (status, body) = call(&test_config(&server, 10), "/health").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "status": "ok" }));
    assert_eq!(upstream_calls(&server).await, 0);
}
