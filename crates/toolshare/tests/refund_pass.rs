use std::sync::Arc;
use std::time::Duration;

use httpmock::prelude::*;
use httpmock::Method::PATCH;
use serde_json::json;
use toolshare::refunds::{
    PassReport, PostgrestJobStore, RefundOutcome, RefundProcessor, StripeGateway,
};

fn processor(server: &MockServer) -> RefundProcessor<PostgrestJobStore, StripeGateway> {
    let store = PostgrestJobStore::new(server.base_url(), "service-role", Duration::from_secs(5))
        .expect("store client builds");
    let gateway = StripeGateway::new("sk_test_live", server.base_url(), Duration::from_secs(5))
        .expect("gateway client builds");
    RefundProcessor::new(Arc::new(store), Arc::new(gateway))
}

fn pending_row(id: &str, payment_intent: &str, amount: Option<f64>) -> serde_json::Value {
    json!({
        "id": id,
        "payment_intent_id": payment_intent,
        "amount": amount,
        "status": "pending",
        "error_message": null,
        "processed_at": null
    })
}

#[tokio::test]
async fn pass_isolates_gateway_failure_and_settles_every_job() {
    let server = MockServer::start_async().await;

    let fetch = server
        .mock_async(|when, then| {
            when.method(GET)
                .path("/rest/v1/refund_jobs")
                .query_param("status", "eq.pending")
                .query_param("limit", "10");
            then.status(200).json_body(json!([
                pending_row("j1", "pi_1", Some(10.0)),
                pending_row("j2", "pi_2", Some(4.5)),
                pending_row("j3", "pi_3", None),
            ]));
        })
        .await;

    let refund_one = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/v1/refunds")
                .header("idempotency-key", "refund-job-j1")
                .body_contains("payment_intent=pi_1")
                .body_contains("amount=1000");
            then.status(200).json_body(json!({ "id": "re_a", "status": "succeeded" }));
        })
        .await;
    let refund_two = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/v1/refunds")
                .body_contains("payment_intent=pi_2");
            then.status(400).json_body(json!({
                "error": { "message": "Charge has already been refunded." }
            }));
        })
        .await;
    let refund_three = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/v1/refunds")
                .header("idempotency-key", "refund-job-j3")
                .body("payment_intent=pi_3");
            then.status(200).json_body(json!({ "id": "re_c", "status": "pending" }));
        })
        .await;

    let settle_one = server
        .mock_async(|when, then| {
            when.method(PATCH)
                .path("/rest/v1/refund_jobs")
                .query_param("id", "eq.j1")
                .query_param("status", "eq.pending")
                .body_contains("\"status\":\"processed\"");
            then.status(200).json_body(json!([{ "id": "j1" }]));
        })
        .await;
    let settle_two = server
        .mock_async(|when, then| {
            when.method(PATCH)
                .path("/rest/v1/refund_jobs")
                .query_param("id", "eq.j2")
                .body_contains("\"status\":\"failed\"")
                .body_contains("Charge has already been refunded.");
            then.status(200).json_body(json!([{ "id": "j2" }]));
        })
        .await;
    let settle_three = server
        .mock_async(|when, then| {
            when.method(PATCH)
                .path("/rest/v1/refund_jobs")
                .query_param("id", "eq.j3")
                .body_contains("\"status\":\"processed\"");
            then.status(200).json_body(json!([{ "id": "j3" }]));
        })
        .await;

    let report = processor(&server).run_pass().await.expect("pass runs");

    let outcomes = report.outcomes();
    assert_eq!(outcomes.len(), 3);
    assert_eq!(report.succeeded(), 2);
    assert!(matches!(
        &outcomes[0],
        RefundOutcome::Success { refund_id, .. } if refund_id == "re_a"
    ));
    assert!(matches!(
        &outcomes[1],
        RefundOutcome::Failed { error, .. } if error == "Charge has already been refunded."
    ));
    assert!(matches!(
        &outcomes[2],
        RefundOutcome::Success { refund_id, .. } if refund_id == "re_c"
    ));

    fetch.assert_async().await;
    refund_one.assert_async().await;
    refund_two.assert_async().await;
    refund_three.assert_async().await;
    settle_one.assert_async().await;
    settle_two.assert_async().await;
    settle_three.assert_async().await;
}

#[tokio::test]
async fn settled_queue_makes_no_gateway_calls() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/rest/v1/refund_jobs");
            then.status(200).json_body(json!([]));
        })
        .await;
    let refunds = server
        .mock_async(|when, then| {
            when.method(POST).path("/v1/refunds");
            then.status(200).json_body(json!({ "id": "re_never" }));
        })
        .await;

    let report = processor(&server).run_pass().await.expect("pass runs");

    assert_eq!(report, PassReport::NoPending);
    assert_eq!(refunds.hits_async().await, 0);
}

#[tokio::test]
async fn unreachable_store_fails_the_pass_without_refunds() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/rest/v1/refund_jobs");
            then.status(500).body("boom");
        })
        .await;
    let refunds = server
        .mock_async(|when, then| {
            when.method(POST).path("/v1/refunds");
            then.status(200).json_body(json!({ "id": "re_never" }));
        })
        .await;

    let err = processor(&server).run_pass().await.expect_err("fetch fails");

    assert!(err.to_string().contains("failed to fetch pending refunds"));
    assert_eq!(refunds.hits_async().await, 0);
}
