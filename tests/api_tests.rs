mod common;

use std::net::SocketAddr;

use axum::body::Body;
use axum::extract::ConnectInfo;
use axum::http::{Request, StatusCode};
use serde_json::json;
use tower::ServiceExt;

use common::{build_test_app, get, post_empty, post_json, seed_position, send, test_config, OWNER};

fn position_body(position_id: &str) -> serde_json::Value {
    json!({
        "position_id": position_id,
        "owner_address": OWNER,
        "collateral_symbol": "eth",
        "collateral_amount": "10.5",
        "debt_symbol": "usdc",
        "debt_amount": "25000.0",
    })
}

// ---------------------------------------------------------------------------
// Health & metrics
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_health_check() {
    let (app, _) = build_test_app(test_config());

    let (status, json) = send(&app, get("/health")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "healthy");
}

#[tokio::test]
async fn test_metrics_endpoint() {
    let (app, _) = build_test_app(test_config());

    let resp = app.oneshot(get("/metrics")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let content_type = resp.headers().get("content-type").unwrap().to_str().unwrap();
    assert!(content_type.starts_with("text/plain"));
}

#[tokio::test]
async fn test_request_id_is_returned() {
    let (app, _) = build_test_app(test_config());

    let resp = app.oneshot(get("/health")).await.unwrap();
    assert!(resp.headers().contains_key("x-request-id"));
}

// ---------------------------------------------------------------------------
// Positions
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_create_position_normalises() {
    let (app, _) = build_test_app(test_config());

    let (status, json) = send(&app, post_json("/api/positions", position_body("  pos_001 "))).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(json["success"], true);
    assert_eq!(json["data"]["position_id"], "pos_001");
    assert_eq!(json["data"]["collateral_symbol"], "ETH");
    assert_eq!(json["data"]["debt_symbol"], "USDC");
    assert_eq!(json["data"]["collateral_amount"], "10.5");

    let (status, json) = send(&app, get("/api/positions/pos_001")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["data"]["owner_address"], OWNER);
}

#[tokio::test]
async fn test_duplicate_position_conflicts() {
    let (app, store) = build_test_app(test_config());

    let (status, _) = send(&app, post_json("/api/positions", position_body("dup"))).await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, json) = send(&app, post_json("/api/positions", position_body("dup"))).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(json["success"], false);
    assert_eq!(json["kind"], "conflict");

    use cdp_liquidator::store::PositionStore;
    assert_eq!(store.count().await.unwrap(), 1);
}

#[tokio::test]
async fn test_create_position_validation() {
    let (app, _) = build_test_app(test_config());

    let mut blank = position_body("x");
    blank["position_id"] = json!("   ");
    let mut bad_owner = position_body("x");
    bad_owner["owner_address"] = json!("0x1234");
    let mut zero_debt = position_body("x");
    zero_debt["debt_amount"] = json!("0");
    let mut bad_amount = position_body("x");
    bad_amount["collateral_amount"] = json!("ten");
    let mut empty_symbol = position_body("x");
    empty_symbol["debt_symbol"] = json!(" ");

    for body in [blank, bad_owner, zero_debt, bad_amount, empty_symbol] {
        let (status, json) = send(&app, post_json("/api/positions", body)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["kind"], "bad_request");
    }
}

#[tokio::test]
async fn test_list_positions_pagination() {
    let (app, store) = build_test_app(test_config());
    for i in 0..12 {
        seed_position(&store, &format!("p{i}"), ("ETH", "1"), ("USDC", "100")).await;
    }

    let (status, json) = send(&app, get("/api/positions")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["data"].as_array().unwrap().len(), 10);

    let (_, json) = send(&app, get("/api/positions?limit=5&offset=10")).await;
    let page = json["data"].as_array().unwrap();
    assert_eq!(page.len(), 2);
    assert_eq!(page[0]["position_id"], "p10");

    let (status, _) = send(&app, get("/api/positions?limit=101")).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    let (status, _) = send(&app, get("/api/positions?offset=-1")).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn test_get_missing_position() {
    let (app, _) = build_test_app(test_config());

    let (status, json) = send(&app, get("/api/positions/nope")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json["kind"], "not_found");
}

// ---------------------------------------------------------------------------
// Liquidation
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_simulate_undercollateralised() {
    let (app, store) = build_test_app(test_config());
    seed_position(&store, "risky", ("ETH", "1.0"), ("USDC", "5000")).await;

    let (status, json) = send(&app, get("/api/liquidation/simulate/risky")).await;
    assert_eq!(status, StatusCode::OK);
    let hf = json["data"]["health_factor"].as_f64().unwrap();
    assert!((hf - 0.51).abs() < 1e-9);
    assert_eq!(json["data"]["eligible"], true);
    assert_eq!(json["data"]["estimated_profit_usd"], 0.0);
}

#[tokio::test]
async fn test_simulate_error_kinds() {
    let (app, store) = build_test_app(test_config());
    seed_position(&store, "doge", ("DOGE", "10"), ("USDC", "1")).await;
    seed_position(&store, "garbled", ("ETH", "1e"), ("USDC", "1")).await;

    let (status, json) = send(&app, get("/api/liquidation/simulate/ghost")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json["kind"], "position_not_found");

    let (status, json) = send(&app, get("/api/liquidation/simulate/doge")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["kind"], "price_unavailable");

    let (status, json) = send(&app, get("/api/liquidation/simulate/garbled")).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(json["kind"], "invalid_amount");

    let (status, json) = send(&app, get("/api/liquidation/simulate/%20%20")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["kind"], "invalid_input");
}

#[tokio::test]
async fn test_execute_not_eligible_is_noop() {
    let (app, store) = build_test_app(test_config());
    seed_position(&store, "safe", ("ETH", "100.0"), ("USDC", "1000.0")).await;

    let body = json!({ "position_id": "safe", "max_slippage_bps": 100 });
    let (status, json) = send(&app, post_json("/api/liquidation/execute", body)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["data"]["tx_hash"], "");
    assert_eq!(json["data"]["realized_profit_usd"], 0.0);
}

#[tokio::test]
async fn test_execute_eligible_settles() {
    let (app, store) = build_test_app(test_config());
    seed_position(&store, "risky", ("ETH", "1"), ("USDC", "2800")).await;

    let body = json!({ "position_id": "risky", "max_slippage_bps": 50 });
    let (status, json) = send(&app, post_json("/api/liquidation/execute", body.clone())).await;
    assert_eq!(status, StatusCode::OK);
    let tx_hash = json["data"]["tx_hash"].as_str().unwrap().to_string();
    assert!(tx_hash.starts_with("0x"));
    assert_eq!(tx_hash.len(), 66);
    let profit = json["data"]["realized_profit_usd"].as_f64().unwrap();
    assert!((profit - 200.0).abs() < 1e-9);

    // settlement reference is deterministic
    let (_, again) = send(&app, post_json("/api/liquidation/execute", body)).await;
    assert_eq!(again["data"]["tx_hash"], tx_hash.as_str());
}

#[tokio::test]
async fn test_execute_slippage_validation() {
    let (app, _) = build_test_app(test_config());

    // range is checked before lookup, so an unknown id still yields 400
    for bps in [-1, 10_001] {
        let body = json!({ "position_id": "ghost", "max_slippage_bps": bps });
        let (status, json) = send(&app, post_json("/api/liquidation/execute", body)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["kind"], "invalid_input");
    }

    let body = json!({ "position_id": "ghost", "max_slippage_bps": 1.5 });
    let (status, json) = send(&app, post_json("/api/liquidation/execute", body)).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(json["success"], false);

    let body = json!({ "position_id": "ghost", "max_slippage_bps": 100 });
    let (status, json) = send(&app, post_json("/api/liquidation/execute", body)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json["kind"], "position_not_found");
}

// ---------------------------------------------------------------------------
// Analytics
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_snapshot_and_list() {
    let (app, store) = build_test_app(test_config());
    seed_position(&store, "a", ("ETH", "1"), ("USDC", "5000")).await;
    seed_position(&store, "b", ("ETH", "10"), ("USDC", "1000")).await;

    let (status, first) = send(&app, post_empty("/api/analytics/snapshot/a")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(first["data"]["eligible"], true);

    let (_, second) = send(&app, post_empty("/api/analytics/snapshot/b")).await;
    assert_eq!(second["data"]["eligible"], false);

    let (status, json) = send(&app, get("/api/analytics/snapshots")).await;
    assert_eq!(status, StatusCode::OK);
    let snaps = json["data"].as_array().unwrap();
    assert_eq!(snaps.len(), 2);
    assert_eq!(snaps[0]["position_id"], "b");
    assert_eq!(snaps[1]["position_id"], "a");
    assert_eq!(store.snapshot_count(), 2);
}

#[tokio::test]
async fn test_snapshot_missing_position_writes_nothing() {
    let (app, store) = build_test_app(test_config());

    let (status, json) = send(&app, post_empty("/api/analytics/snapshot/ghost")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json["kind"], "position_not_found");
    assert_eq!(store.snapshot_count(), 0);
}

#[tokio::test]
async fn test_snapshot_list_bounds() {
    let (app, _) = build_test_app(test_config());

    let (status, _) = send(&app, get("/api/analytics/snapshots?limit=0")).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    let (status, _) = send(&app, get("/api/analytics/snapshots?limit=201")).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    let (status, _) = send(&app, get("/api/analytics/snapshots?limit=200")).await;
    assert_eq!(status, StatusCode::OK);
}

// ---------------------------------------------------------------------------
// Batch
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_batch_positions_partial_failure() {
    let (app, _) = build_test_app(test_config());

    let mut bad = position_body("bad");
    bad["owner_address"] = json!("nope");
    let body = json!({
        "positions": [position_body("b1"), bad, position_body("b1"), position_body("b2")]
    });

    let (status, json) = send(&app, post_json("/api/batch/positions", body)).await;
    assert_eq!(status, StatusCode::OK);
    let data = &json["data"];
    assert_eq!(data["created_count"], 2);
    assert_eq!(data["error_count"], 2);
    assert_eq!(data["errors"][0]["index"], 1);
    assert_eq!(data["errors"][0]["position_id"], "bad");
    assert_eq!(data["errors"][1]["index"], 2);
}

#[tokio::test]
async fn test_batch_size_limits() {
    let (app, _) = build_test_app(test_config());

    let ids: Vec<String> = (0..51).map(|i| format!("p{i}")).collect();
    let (status, _) = send(&app, post_json("/api/batch/simulate", json!({ "position_ids": ids }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(&app, post_json("/api/batch/simulate", json!({ "position_ids": [] }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let liquidations: Vec<_> = (0..21)
        .map(|i| json!({ "position_id": format!("p{i}"), "max_slippage_bps": 100 }))
        .collect();
    let (status, _) = send(
        &app,
        post_json("/api/batch/execute", json!({ "liquidations": liquidations })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let positions: Vec<_> = (0..101).map(|i| position_body(&format!("p{i}"))).collect();
    let (status, _) = send(&app, post_json("/api/batch/positions", json!({ "positions": positions }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_batch_simulate_and_execute() {
    let (app, store) = build_test_app(test_config());
    seed_position(&store, "risky", ("ETH", "1"), ("USDC", "2800")).await;
    seed_position(&store, "safe", ("ETH", "100"), ("USDC", "1000")).await;

    let body = json!({ "position_ids": ["risky", "ghost", "safe"] });
    let (status, json) = send(&app, post_json("/api/batch/simulate", body)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["data"]["simulated_count"], 2);
    assert_eq!(json["data"]["error_count"], 1);
    assert_eq!(json["data"]["errors"][0]["index"], 1);
    assert_eq!(json["data"]["errors"][0]["position_id"], "ghost");

    let body = json!({
        "liquidations": [
            { "position_id": "risky", "max_slippage_bps": 100 },
            { "position_id": "safe", "max_slippage_bps": 100 },
            { "position_id": "risky2", "max_slippage_bps": 20000 },
        ]
    });
    let (status, json) = send(&app, post_json("/api/batch/execute", body)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["data"]["executed_count"], 2);
    assert_eq!(json["data"]["error_count"], 1);
    let results = json["data"]["results"].as_array().unwrap();
    assert_eq!(results[0]["tx_hash"].as_str().unwrap().len(), 66);
    assert_eq!(results[1]["tx_hash"], "");
}

// ---------------------------------------------------------------------------
// Risk metrics
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_system_metrics_status() {
    let (app, store) = build_test_app(test_config());

    let (status, json) = send(&app, get("/api/metrics/system")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["data"]["total_positions"], 0);
    assert_eq!(json["data"]["status"], "healthy");

    seed_position(&store, "risky", ("ETH", "1"), ("USDC", "5000")).await;
    seed_position(&store, "safe", ("ETH", "100"), ("USDC", "1000")).await;

    let (_, json) = send(&app, get("/api/metrics/system")).await;
    assert_eq!(json["data"]["total_positions"], 2);
    assert_eq!(json["data"]["liquidatable_positions"], 1);
    assert_eq!(json["data"]["status"], "critical");
}

#[tokio::test]
async fn test_position_metrics_distribution() {
    let (app, store) = build_test_app(test_config());
    seed_position(&store, "crit", ("ETH", "1"), ("USDC", "5000")).await;
    seed_position(&store, "warn", ("ETH", "1"), ("USDC", "2000")).await;
    seed_position(&store, "safe", ("ETH", "100"), ("USDC", "1000")).await;
    seed_position(&store, "unpriced", ("DOGE", "1"), ("USDC", "1000")).await;

    let (status, json) = send(&app, get("/api/metrics/positions")).await;
    assert_eq!(status, StatusCode::OK);
    let data = &json["data"];
    assert_eq!(data["evaluated_positions"], 3);
    assert_eq!(data["skipped"], 1);
    assert_eq!(data["health_distribution"]["safe"], 1);
    assert_eq!(data["health_distribution"]["warning"], 1);
    assert_eq!(data["health_distribution"]["critical"], 1);
    assert_eq!(data["critical_positions"][0]["position_id"], "crit");

    let (status, _) = send(&app, get("/api/metrics/positions?limit=1001")).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
}

// ---------------------------------------------------------------------------
// Monitor & events
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_monitor_lifecycle() {
    let (app, _) = build_test_app(test_config());

    let (status, json) = send(&app, post_empty("/api/monitor/start")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["data"]["status"], "started");

    let (status, json) = send(&app, post_empty("/api/monitor/start")).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(json["kind"], "conflict");

    let (_, json) = send(&app, get("/api/monitor/status")).await;
    assert_eq!(json["data"]["running"], true);

    let (status, json) = send(&app, post_empty("/api/monitor/stop")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["data"]["status"], "stopped");

    // stopping twice is fine
    let (status, _) = send(&app, post_empty("/api/monitor/stop")).await;
    assert_eq!(status, StatusCode::OK);

    let (_, json) = send(&app, get("/api/monitor/status")).await;
    assert_eq!(json["data"]["running"], false);
}

#[tokio::test]
async fn test_index_and_list_events() {
    let (app, _) = build_test_app(test_config());

    let (status, json) = send(&app, post_empty("/api/events/index?from_block=10&to_block=12")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["data"]["indexed"], 3);

    let (status, json) = send(&app, get("/api/events?limit=2")).await;
    assert_eq!(status, StatusCode::OK);
    let events = json["data"].as_array().unwrap();
    assert_eq!(events.len(), 2);
    assert_eq!(events[0]["block_number"], 12);

    let (status, json) = send(&app, post_empty("/api/events/index?from_block=5&to_block=4")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["success"], false);

    let (status, _) = send(&app, get("/api/events?limit=501")).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
}

// ---------------------------------------------------------------------------
// Auth & rate limiting
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_bearer_auth() {
    let mut config = test_config();
    config.api_token = Some("secret".into());
    let (app, _) = build_test_app(config);

    let (status, json) = send(&app, get("/api/positions")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(json["kind"], "unauthorized");

    let wrong = Request::builder()
        .uri("/api/positions")
        .header("authorization", "Bearer nope")
        .body(Body::empty())
        .unwrap();
    let (status, _) = send(&app, wrong).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let right = Request::builder()
        .uri("/api/positions")
        .header("authorization", "Bearer secret")
        .body(Body::empty())
        .unwrap();
    let (status, _) = send(&app, right).await;
    assert_eq!(status, StatusCode::OK);

    // health stays public
    let (status, _) = send(&app, get("/health")).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_rate_limit_per_client() {
    let mut config = test_config();
    config.rate_limit_per_minute = 2;
    config.trust_proxy_headers = true;
    let (app, _) = build_test_app(config);

    let from = |ip: &'static str| {
        Request::builder()
            .uri("/api/positions")
            .header("x-forwarded-for", ip)
            .body(Body::empty())
            .unwrap()
    };

    let resp = app.clone().oneshot(from("1.1.1.1")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(resp.headers()["x-ratelimit-limit"], "2");
    assert_eq!(resp.headers()["x-ratelimit-remaining"], "1");

    let resp = app.clone().oneshot(from("1.1.1.1")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let resp = app.clone().oneshot(from("1.1.1.1")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(resp.headers()["retry-after"], "60");
    assert_eq!(resp.headers()["x-ratelimit-remaining"], "0");

    // a different client has its own budget
    let resp = app.clone().oneshot(from("2.2.2.2")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    // health is exempt
    for _ in 0..5 {
        let req = Request::builder()
            .uri("/health")
            .header("x-forwarded-for", "1.1.1.1")
            .body(Body::empty())
            .unwrap();
        let resp = app.clone().oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
    }
}

fn from_peer(peer: &str, forwarded_for: Option<&'static str>) -> Request<Body> {
    let mut builder = Request::builder().uri("/api/positions");
    if let Some(ip) = forwarded_for {
        builder = builder.header("x-forwarded-for", ip);
    }
    let mut req = builder.body(Body::empty()).unwrap();
    let addr: SocketAddr = peer.parse().unwrap();
    req.extensions_mut().insert(ConnectInfo(addr));
    req
}

#[tokio::test]
async fn test_rate_limit_keys_on_peer_address() {
    let mut config = test_config();
    config.rate_limit_per_minute = 2;
    let (app, _) = build_test_app(config);

    for _ in 0..2 {
        let resp = app.clone().oneshot(from_peer("198.51.100.1:40000", None)).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
    }
    let resp = app.clone().oneshot(from_peer("198.51.100.1:40001", None)).await.unwrap();
    assert_eq!(resp.status(), StatusCode::TOO_MANY_REQUESTS);

    // a second header-less peer has its own budget
    let resp = app.clone().oneshot(from_peer("198.51.100.2:40000", None)).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(resp.headers()["x-ratelimit-remaining"], "1");

    // rotating untrusted proxy headers does not reset the budget
    for ip in ["7.7.7.7", "8.8.8.8"] {
        let resp = app
            .clone()
            .oneshot(from_peer("198.51.100.1:40002", Some(ip)))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::TOO_MANY_REQUESTS);
    }
}
