//! Integration tests for `/api/v1/player` and `/api/v1/admin`.

mod common;

use axum::http::StatusCode;
use common::{body_json, delete, get, place_bid, put};
use sqlx::PgPool;

async fn seed(app: &axum::Router) {
    for (amount, song) in [(2, "a"), (2, "a"), (5, "b"), (5, "b")] {
        place_bid(app.clone(), amount, song).await;
    }
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn play_returns_the_winning_group(pool: PgPool) {
    let app = common::build_test_app(pool);
    seed(&app).await;

    let response = put(app.clone(), "/api/v1/player/play").await;
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    let rows = json["data"].as_array().unwrap();
    assert_eq!(rows.len(), 2);
    for row in rows {
        assert_eq!(row["song_id"], "b");
        assert_eq!(row["song_status"], 1);
    }

    let ranking = body_json(get(app, "/api/v1/bids/ranking").await).await;
    assert_eq!(ranking["data"].as_array().unwrap().len(), 1);
    assert_eq!(ranking["data"][0]["song_id"], "a");
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn play_with_empty_queue_returns_empty_data(pool: PgPool) {
    let app = common::build_test_app(pool);

    let response = put(app, "/api/v1/player/play").await;

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["data"], serde_json::json!([]));
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn play_twice_without_finalize_conflicts(pool: PgPool) {
    let app = common::build_test_app(pool);
    seed(&app).await;
    put(app.clone(), "/api/v1/player/play").await;

    let response = put(app, "/api/v1/player/play").await;

    assert_eq!(response.status(), StatusCode::CONFLICT);
    let json = body_json(response).await;
    assert_eq!(json["code"], "CONFLICT");
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn finalize_returns_played_group_then_nothing(pool: PgPool) {
    let app = common::build_test_app(pool);
    seed(&app).await;
    put(app.clone(), "/api/v1/player/play").await;

    let response = put(app.clone(), "/api/v1/player/finalize").await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    let rows = json["data"].as_array().unwrap();
    assert_eq!(rows.len(), 2);
    assert!(rows.iter().all(|r| r["song_id"] == "b" && r["song_status"] == 2));

    let again = body_json(put(app.clone(), "/api/v1/player/finalize").await).await;
    assert_eq!(again["data"], serde_json::json!([]));

    // With "b" finalized the next play picks "a".
    let next = body_json(put(app, "/api/v1/player/play").await).await;
    assert_eq!(next["data"][0]["song_id"], "a");
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn admin_reset_clears_the_ledger(pool: PgPool) {
    let app = common::build_test_app(pool);
    seed(&app).await;

    let response = delete(app.clone(), "/api/v1/admin/bids").await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let json = body_json(get(app, "/api/v1/bids").await).await;
    assert!(json["data"].as_array().unwrap().is_empty());
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn admin_reset_is_not_mounted_by_default(pool: PgPool) {
    let mut config = common::test_config();
    config.enable_admin_reset = false;
    let app = common::build_app_with_config(pool, config);
    seed(&app).await;

    let response = delete(app.clone(), "/api/v1/admin/bids").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let json = body_json(get(app, "/api/v1/bids").await).await;
    assert_eq!(json["data"].as_array().unwrap().len(), 4);
}
