//! Tests for the HTTP service client against an in-process mock service.

use std::collections::HashMap;
use std::error::Error as _;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{Value, json};

use codebreaker::{ClientConfig, CodebreakerService, ErrorKind, Game, Guess, HttpCodebreakerService};

const SECRET: &str = "AB";

/// Counts requests that reached the mock and how many overlapped.
#[derive(Debug, Default)]
struct MockState {
    hits: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl MockState {
    fn hit(&self) {
        self.hits.fetch_add(1, Ordering::SeqCst);
    }

    fn hits(&self) -> usize {
        self.hits.load(Ordering::SeqCst)
    }
}

fn game_json(id: &str, pool: &str, length: u64) -> Value {
    json!({
        "id": id,
        "pool": pool,
        "length": length,
        "solved": false,
        "created": "2026-02-10T14:03:00-07:00",
        "guesses": []
    })
}

fn score(secret: &str, text: &str) -> (usize, usize) {
    let exact = secret.chars().zip(text.chars()).filter(|(a, b)| a == b).count();
    let mut counts: HashMap<char, usize> = HashMap::new();
    for c in secret.chars() {
        *counts.entry(c).or_insert(0) += 1;
    }
    let mut common = 0;
    for c in text.chars() {
        if let Some(n) = counts.get_mut(&c) {
            if *n > 0 {
                *n -= 1;
                common += 1;
            }
        }
    }
    (exact, common - exact)
}

async fn start_game(State(state): State<Arc<MockState>>, Json(body): Json<Value>) -> Response {
    state.hit();
    let pool = body["pool"].as_str().unwrap_or_default().to_string();
    let length = body["length"].as_u64().unwrap_or_default();
    let mut seen = std::collections::HashSet::new();
    if !pool.chars().all(|c| seen.insert(c)) {
        return (StatusCode::BAD_REQUEST, "pool has duplicates").into_response();
    }
    (StatusCode::CREATED, Json(game_json("g-1", &pool, length))).into_response()
}

async fn get_game(State(state): State<Arc<MockState>>, Path(game_id): Path<String>) -> Response {
    state.hit();
    match game_id.as_str() {
        "missing" => StatusCode::NOT_FOUND.into_response(),
        "garbage" => (StatusCode::OK, "not json").into_response(),
        id => Json(game_json(id, "ABCDE", 2)).into_response(),
    }
}

async fn delete_game(State(state): State<Arc<MockState>>, Path(game_id): Path<String>) -> Response {
    state.hit();
    match game_id.as_str() {
        "missing" => StatusCode::NOT_FOUND.into_response(),
        _ => StatusCode::NO_CONTENT.into_response(),
    }
}

async fn submit_guess(
    State(state): State<Arc<MockState>>,
    Path(game_id): Path<String>,
    Json(body): Json<Value>,
) -> Response {
    state.hit();
    let now = state.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
    state.max_in_flight.fetch_max(now, Ordering::SeqCst);
    tokio::time::sleep(Duration::from_millis(40)).await;
    state.in_flight.fetch_sub(1, Ordering::SeqCst);

    let text = body["text"].as_str().unwrap_or_default().to_string();
    match game_id.as_str() {
        "solved" => (StatusCode::CONFLICT, "game already solved").into_response(),
        "broken" => StatusCode::INTERNAL_SERVER_ERROR.into_response(),
        "missing" => StatusCode::NOT_FOUND.into_response(),
        _ => {
            let (exact, near) = score(SECRET, &text);
            let guess = json!({
                "id": format!("q-{}", state.hits()),
                "text": text,
                "exactMatches": exact,
                "nearMatches": near,
                "solution": exact == SECRET.len(),
                "created": "2026-02-10T14:04:00Z"
            });
            (StatusCode::CREATED, Json(guess)).into_response()
        }
    }
}

async fn get_guess(
    State(state): State<Arc<MockState>>,
    Path((game_id, guess_id)): Path<(String, String)>,
) -> Response {
    state.hit();
    match (game_id.as_str(), guess_id.as_str()) {
        (_, "teapot") => StatusCode::IM_A_TEAPOT.into_response(),
        ("missing", _) | (_, "missing") => StatusCode::NOT_FOUND.into_response(),
        (_, id) => Json(json!({
            "id": id,
            "text": "BA",
            "exactMatches": 0,
            "nearMatches": 2,
            "solution": false
        }))
        .into_response(),
    }
}

/// Serves the mock on an ephemeral port; returns the service root URL.
async fn spawn_mock() -> (String, Arc<MockState>) {
    let state = Arc::new(MockState::default());
    let app = Router::new()
        .route("/codebreaker/games", post(start_game))
        .route("/codebreaker/games/{game_id}", get(get_game).delete(delete_game))
        .route("/codebreaker/games/{game_id}/guesses", post(submit_guess))
        .route("/codebreaker/games/{game_id}/guesses/{guess_id}", get(get_guess))
        .with_state(Arc::clone(&state));

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind mock service");
    let addr = listener.local_addr().expect("No local address");
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("Mock service failed");
    });
    (format!("http://{}/codebreaker", addr), state)
}

fn client(base_url: &str) -> HttpCodebreakerService {
    HttpCodebreakerService::new(&ClientConfig::new(base_url)).expect("Failed to build client")
}

fn started_game(id: &str) -> Game {
    Game::draft("ABCDE", 2).with_id(id).with_solved(false)
}

#[tokio::test]
async fn test_start_game_resolves_with_service_game() {
    let (url, state) = spawn_mock().await;
    let service = client(&url);

    let game = service
        .start_game(&Game::draft("ABCDE", 2))
        .await
        .expect("start_game failed");

    assert_eq!(game.id(), Some("g-1"));
    assert_eq!(game.pool(), "ABCDE");
    assert_eq!(*game.length(), 2);
    assert_eq!(game.solved(), Some(false));
    assert!(game.guesses().is_empty());
    assert!(game.created().is_some());
    assert_eq!(state.hits(), 1);
}

#[tokio::test]
async fn test_invalid_game_rejected_without_network_call() {
    let (url, state) = spawn_mock().await;
    let service = client(&url);

    for draft in [
        Game::draft("ABCDE", 0),
        Game::draft("ABCDE", 21),
        Game::draft("AB\0", 2),
        Game::draft("A\u{FFFF}", 2),
        Game::draft("A\u{0378}", 1),
    ] {
        let error = service.start_game(&draft).await.expect_err("should reject");
        assert_eq!(error.kind(), ErrorKind::InvalidPayload);
    }
    assert_eq!(state.hits(), 0);
}

#[tokio::test]
async fn test_server_bad_request_maps_to_invalid_payload() {
    let (url, state) = spawn_mock().await;
    let service = client(&url);

    let error = service
        .start_game(&Game::draft("AAB", 2))
        .await
        .expect_err("server should reject");
    assert_eq!(error.kind(), ErrorKind::InvalidPayload);
    assert_eq!(error.status(), Some(400));
    assert_eq!(state.hits(), 1);
}

#[tokio::test]
async fn test_invalid_guess_rejected_without_network_call() {
    let (url, state) = spawn_mock().await;
    let service = client(&url);
    let game = started_game("g-1");

    for text in ["ABC", "A", "AZ"] {
        let error = service
            .submit_guess(&game, &Guess::draft(text))
            .await
            .expect_err("should reject");
        assert_eq!(error.kind(), ErrorKind::InvalidPayload);
    }
    assert_eq!(state.hits(), 0);
}

#[tokio::test]
async fn test_guess_against_unstarted_game_rejected_locally() {
    let (url, state) = spawn_mock().await;
    let service = client(&url);

    let error = service
        .submit_guess(&Game::draft("ABCDE", 2), &Guess::draft("AB"))
        .await
        .expect_err("draft game has no id");
    assert_eq!(error.kind(), ErrorKind::InvalidPayload);
    assert_eq!(state.hits(), 0);
}

#[tokio::test]
async fn test_submit_guess_resolves_with_scores() {
    let (url, _state) = spawn_mock().await;
    let service = client(&url);
    let game = started_game("g-1");

    let miss = service
        .submit_guess(&game, &Guess::draft("BA"))
        .await
        .expect("submit failed");
    assert_eq!(miss.exact_matches(), Some(0));
    assert_eq!(miss.near_matches(), Some(2));
    assert!(!miss.is_solution());

    let hit = service
        .submit_guess(&game, &Guess::draft("AB"))
        .await
        .expect("submit failed");
    assert_eq!(hit.exact_matches(), Some(2));
    assert_eq!(hit.near_matches(), Some(0));
    assert!(hit.is_solution());
    assert!(hit.id().is_some());
}

#[tokio::test]
async fn test_conflict_maps_to_game_solved() {
    let (url, _state) = spawn_mock().await;
    let service = client(&url);

    let error = service
        .submit_guess(&started_game("solved"), &Guess::draft("AB"))
        .await
        .expect_err("should conflict");
    assert_eq!(error.kind(), ErrorKind::GameSolved);
    assert_eq!(error.status(), Some(409));
}

#[tokio::test]
async fn test_not_found_maps_to_resource_not_found() {
    let (url, _state) = spawn_mock().await;
    let service = client(&url);

    let error = service.get_game("missing").await.expect_err("missing game");
    assert_eq!(error.kind(), ErrorKind::ResourceNotFound);

    let error = service.delete_game("missing").await.expect_err("missing game");
    assert_eq!(error.kind(), ErrorKind::ResourceNotFound);

    let error = service
        .get_guess("g-1", "missing")
        .await
        .expect_err("missing guess");
    assert_eq!(error.kind(), ErrorKind::ResourceNotFound);
}

#[tokio::test]
async fn test_server_fault_and_unrecognized_status_map_to_unknown_service() {
    let (url, _state) = spawn_mock().await;
    let service = client(&url);

    let error = service
        .submit_guess(&started_game("broken"), &Guess::draft("AB"))
        .await
        .expect_err("server fault");
    assert_eq!(error.kind(), ErrorKind::UnknownService);
    assert_eq!(error.status(), Some(500));

    let error = service
        .get_guess("g-1", "teapot")
        .await
        .expect_err("unrecognized status");
    assert_eq!(error.kind(), ErrorKind::UnknownService);
    assert_eq!(error.status(), Some(418));
}

#[tokio::test]
async fn test_undecodable_body_maps_to_unknown_service() {
    let (url, _state) = spawn_mock().await;
    let service = client(&url);

    let error = service.get_game("garbage").await.expect_err("bad body");
    assert_eq!(error.kind(), ErrorKind::UnknownService);
    assert!(error.source().is_some());
}

#[tokio::test]
async fn test_get_and_delete_game_succeed() {
    let (url, state) = spawn_mock().await;
    let service = client(&url);

    let game = service.get_game("g-7").await.expect("get failed");
    assert_eq!(game.id(), Some("g-7"));
    service.delete_game("g-7").await.expect("delete failed");

    let guess = service.get_guess("g-7", "q-3").await.expect("get guess failed");
    assert_eq!(guess.id(), Some("q-3"));
    assert_eq!(guess.near_matches(), Some(2));
    assert_eq!(state.hits(), 3);
}

#[tokio::test]
async fn test_transport_failure_rejects_with_unknown_service() {
    // Reserve a port, then close it so connections are refused.
    let listener = std::net::TcpListener::bind("127.0.0.1:0").expect("bind");
    let addr = listener.local_addr().expect("addr");
    drop(listener);

    let service = client(&format!("http://{}/codebreaker", addr));
    let outcome = tokio::time::timeout(Duration::from_secs(10), service.get_game("g-1"))
        .await
        .expect("transport failure must complete the operation");

    let error = outcome.expect_err("connection refused");
    assert_eq!(error.kind(), ErrorKind::UnknownService);
    assert_eq!(error.status(), None);
    assert!(error.source().is_some());
}

#[tokio::test]
async fn test_shutdown_is_idempotent_and_blocks_new_operations() {
    let (url, state) = spawn_mock().await;
    let service = client(&url);

    service.shutdown();
    service.shutdown();
    assert!(service.is_shut_down());

    let error = service.get_game("g-1").await.expect_err("shut down");
    assert_eq!(error.kind(), ErrorKind::UnknownService);
    let error = service
        .start_game(&Game::draft("ABCDE", 2))
        .await
        .expect_err("shut down");
    assert_eq!(error.kind(), ErrorKind::UnknownService);
    assert_eq!(state.hits(), 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_guesses_for_one_game_are_sent_one_at_a_time() {
    let (url, state) = spawn_mock().await;
    let service = Arc::new(client(&url));
    let game = started_game("g-1");

    let mut tasks = Vec::new();
    for text in ["BA", "AC", "CA", "DE", "AB"] {
        let service = Arc::clone(&service);
        let game = game.clone();
        tasks.push(tokio::spawn(async move {
            service.submit_guess(&game, &Guess::draft(text)).await
        }));
    }
    for task in tasks {
        task.await.expect("task panicked").expect("submit failed");
    }

    assert_eq!(state.hits(), 5);
    assert_eq!(state.max_in_flight.load(Ordering::SeqCst), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_construction_inside_runtime_fails_or_drops_cleanly() {
    let rejected = [
        ClientConfig::new("ftp://localhost/codebreaker"),
        ClientConfig::new("http://localhost").with_worker_threads(0),
    ];
    for config in rejected {
        assert!(HttpCodebreakerService::new(&config).is_err());
    }

    let config = ClientConfig::new("http://localhost:8080/codebreaker").with_connect_timeout_secs(1);
    let service = HttpCodebreakerService::new(&config).expect("Failed to build client");
    drop(service);
}
