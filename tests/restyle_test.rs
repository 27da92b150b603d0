//! Integration tests for AI restyle over HTTP.

mod common;

use std::time::Duration;

use bf_core::events::LiveUpdate;
use bf_core::BrandingSpec;
use bf_restyle::ModelReply;
use bytes::Bytes;
use common::{image_bytes, png_data_url, TestHarness};
use serde_json::json;

fn loading(secs: f64) -> ModelReply {
    ModelReply::Loading {
        estimated_secs: secs,
    }
}

fn styled_image() -> ModelReply {
    ModelReply::Image(Bytes::from(image_bytes(
        256,
        256,
        [30, 160, 90],
        image::ImageFormat::Jpeg,
    )))
}

#[tokio::test]
async fn restyle_waits_for_loading_model() {
    let h = TestHarness::start_with(vec![loading(5.0), loading(5.0), styled_image()], |_| {}).await;
    let event_id = h.create_event("AI Night", BrandingSpec::default()).await;

    let resp = h
        .post_json(
            &format!("/api/events/{event_id}/restyle"),
            json!({ "frame": png_data_url(300, 200, [120, 120, 120]), "style": "anime" }),
        )
        .await;
    assert_eq!(resp.status(), 201);
    let artifact: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(artifact["kind"], "ai");

    assert_eq!(h.model.calls(), 3);
    assert_eq!(
        h.clock.sleeps(),
        vec![Duration::from_secs(5), Duration::from_secs(5)]
    );

    let waits: Vec<u32> = h
        .ctx
        .event_bus
        .recent_for(event_id, 50)
        .into_iter()
        .filter_map(|e| match e.update {
            LiveUpdate::RestyleWaiting { attempt, .. } => Some(attempt),
            _ => None,
        })
        .collect();
    assert_eq!(waits.len(), 2);

    let bytes = reqwest::get(artifact["public_url"].as_str().unwrap())
        .await
        .unwrap()
        .bytes()
        .await
        .unwrap();
    let img = image::load_from_memory(&bytes).unwrap();
    assert_eq!(img.width().max(img.height()), h.ctx.config.restyle.output_size);
}

#[tokio::test]
async fn always_loading_is_unavailable_after_ceiling() {
    let replies = (0..10).map(|_| loading(20.0)).collect();
    let h = TestHarness::start_with(replies, |_| {}).await;
    let event_id = h.create_event("Cold Start", BrandingSpec::default()).await;

    let resp = h
        .post_json(
            &format!("/api/events/{event_id}/restyle"),
            json!({ "frame": png_data_url(64, 64, [0, 0, 0]), "style": "random" }),
        )
        .await;
    assert_eq!(resp.status(), 503);
    let body: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(body["code"], "upstream_unavailable");
    assert_eq!(body["retryable"], true);

    let ceiling = h.ctx.config.restyle.max_attempts;
    assert_eq!(h.model.calls(), ceiling);
    assert_eq!(h.clock.sleeps().len() as u32, ceiling - 1);

    let artifacts: Vec<serde_json::Value> =
        reqwest::get(h.url(&format!("/api/events/{event_id}/artifacts")))
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
    assert!(artifacts.is_empty());
}

#[tokio::test]
async fn configured_ceiling_is_honoured() {
    let replies = (0..10).map(|_| loading(1.0)).collect();
    let h = TestHarness::start_with(replies, |c| c.restyle.max_attempts = 5).await;
    let event_id = h.create_event("Five Tries", BrandingSpec::default()).await;

    let resp = h
        .post_json(
            &format!("/api/events/{event_id}/restyle"),
            json!({ "frame": png_data_url(64, 64, [0, 0, 0]), "style": "anime" }),
        )
        .await;
    assert_eq!(resp.status(), 503);
    assert_eq!(h.model.calls(), 5);
}

#[tokio::test]
async fn hard_failure_is_bad_gateway() {
    let h = TestHarness::start().await;
    let event_id = h.create_event("Broken Model", BrandingSpec::default()).await;

    let resp = h
        .post_json(
            &format!("/api/events/{event_id}/restyle"),
            json!({ "frame": png_data_url(64, 64, [0, 0, 0]), "style": "anime" }),
        )
        .await;
    assert_eq!(resp.status(), 502);
    let body: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(body["code"], "upstream_error");
}

#[tokio::test]
async fn style_is_validated_before_calling_model() {
    let h = TestHarness::start_with(vec![styled_image()], |_| {}).await;
    let event_id = h.create_event("Styles", BrandingSpec::default()).await;

    for body in [
        json!({ "frame": png_data_url(64, 64, [0, 0, 0]), "style": "cubism-deluxe" }),
        json!({ "frame": png_data_url(64, 64, [0, 0, 0]) }),
    ] {
        let resp = h
            .post_json(&format!("/api/events/{event_id}/restyle"), body)
            .await;
        assert_eq!(resp.status(), 400);
    }
    assert_eq!(h.model.calls(), 0);
}
