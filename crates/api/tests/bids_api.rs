//! Integration tests for `/api/v1/bids`.

mod common;

use axum::http::StatusCode;
use common::{body_json, get, place_bid, post_json, put};
use serde_json::json;
use sqlx::PgPool;

#[sqlx::test(migrations = "../../db/migrations")]
async fn posted_bid_is_listed_as_queued(pool: PgPool) {
    let app = common::build_test_app(pool);

    let bid_id = place_bid(app.clone(), 3, "spotify:track:6ADzlFXHPk846zUCEOM2C1").await;
    assert!(uuid::Uuid::parse_str(&bid_id).is_ok());

    let json = body_json(get(app, "/api/v1/bids").await).await;
    let rows = json["data"].as_array().unwrap();
    assert_eq!(rows.len(), 1);

    let row = &rows[0];
    assert_eq!(row["bid_id"], bid_id.as_str());
    assert_eq!(row["song_id"], "spotify:track:6ADzlFXHPk846zUCEOM2C1");
    assert_eq!(row["bid_amount"], 3);
    assert_eq!(row["song_status"], 0);
    assert!(row["created_at"].is_string());
    assert_eq!(row["created_at"], row["updated_at"]);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn legacy_field_names_are_accepted(pool: PgPool) {
    let app = common::build_test_app(pool);

    let response = post_json(
        app,
        "/api/v1/bids",
        json!({ "BidAmount": 1, "SongId": "some-song-id" }),
    )
    .await;

    assert_eq!(response.status(), StatusCode::CREATED);
    let json = body_json(response).await;
    assert!(json["data"]["bid_id"].is_string());
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn non_positive_amount_is_rejected(pool: PgPool) {
    let app = common::build_test_app(pool);

    let response = post_json(
        app.clone(),
        "/api/v1/bids",
        json!({ "bid_amount": 0, "song_id": "song-a" }),
    )
    .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_json(response).await;
    assert_eq!(json["code"], "VALIDATION_ERROR");

    let listed = body_json(get(app, "/api/v1/bids").await).await;
    assert!(listed["data"].as_array().unwrap().is_empty());
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn empty_song_id_is_rejected(pool: PgPool) {
    let app = common::build_test_app(pool);

    let response = post_json(
        app,
        "/api/v1/bids",
        json!({ "bid_amount": 4, "song_id": "" }),
    )
    .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn malformed_body_is_a_client_error(pool: PgPool) {
    let app = common::build_test_app(pool);

    let response = post_json(app, "/api/v1/bids", json!({ "song_id": "song-a" })).await;

    assert!(response.status().is_client_error());
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn ranking_sums_queued_bids(pool: PgPool) {
    let app = common::build_test_app(pool);
    for (amount, song) in [(2, "a"), (2, "a"), (5, "b"), (5, "b")] {
        place_bid(app.clone(), amount, song).await;
    }

    let response = get(app, "/api/v1/bids/ranking").await;
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    assert_eq!(
        json["data"],
        json!([
            { "song_id": "b", "total_bid_amount": 10 },
            { "song_id": "a", "total_bid_amount": 4 },
        ])
    );
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn list_filters_by_status(pool: PgPool) {
    let app = common::build_test_app(pool);
    for (amount, song) in [(2, "a"), (5, "b")] {
        place_bid(app.clone(), amount, song).await;
    }
    put(app.clone(), "/api/v1/player/play").await;

    let json = body_json(get(app.clone(), "/api/v1/bids?status=1").await).await;
    let rows = json["data"].as_array().unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["song_id"], "b");

    let response = get(app, "/api/v1/bids?status=7").await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}
