use crate::helpers::TestApp;

fn delivery_event(event: &str, sender_email: &str) -> serde_json::Value {
    serde_json::json!({
        "event": event,
        "email": "recipient@test.com",
        "message-id": "<202403@smtp-relay.mailin.fr>",
        "sender_email": sender_email,
    })
}

fn billing_event(event_name: &str, user_email: &str, product_name: &str) -> serde_json::Value {
    serde_json::json!({
        "meta": { "event_name": event_name },
        "data": {
            "attributes": {
                "user_email": user_email,
                "first_order_item": { "product_name": product_name }
            }
        }
    })
}

#[tokio::test]
async fn delivered_event_increments_the_delivered_counter() {
    let test_app = TestApp::spawn_app().await;

    test_app.create_account("Sender", "sender@test.com").await;

    let response = test_app
        .post_delivery_event(delivery_event("delivered", "sender@test.com"))
        .await;

    assert_eq!(200, response.status().as_u16());

    let snapshot = test_app.account_snapshot("sender@test.com").await;

    assert_eq!(snapshot.delivered_count, 1);
    assert_eq!(snapshot.opened_count, 0);
    assert_eq!(snapshot.clicked_count, 0);
}

#[tokio::test]
async fn unique_opened_event_increments_the_opened_counter() {
    let test_app = TestApp::spawn_app().await;

    test_app.create_account("Sender", "sender@test.com").await;

    test_app
        .post_delivery_event(delivery_event("unique_opened", "sender@test.com"))
        .await;

    let snapshot = test_app.account_snapshot("sender@test.com").await;

    assert_eq!(snapshot.opened_count, 1);
    assert_eq!(snapshot.delivered_count, 0);
}

#[tokio::test]
async fn click_event_increments_the_clicked_counter() {
    let test_app = TestApp::spawn_app().await;

    test_app.create_account("Sender", "sender@test.com").await;

    test_app
        .post_delivery_event(delivery_event("click", "sender@test.com"))
        .await;

    let snapshot = test_app.account_snapshot("sender@test.com").await;

    assert_eq!(snapshot.clicked_count, 1);
}

// The provider does not guarantee idempotent delivery and exposes no event id
// to dedup on; a re-delivered event counts again.
#[tokio::test]
async fn redelivered_events_count_again() {
    let test_app = TestApp::spawn_app().await;

    test_app.create_account("Sender", "sender@test.com").await;

    test_app
        .post_delivery_event(delivery_event("delivered", "sender@test.com"))
        .await;
    test_app
        .post_delivery_event(delivery_event("delivered", "sender@test.com"))
        .await;

    let snapshot = test_app.account_snapshot("sender@test.com").await;

    assert_eq!(snapshot.delivered_count, 2);
}

#[tokio::test]
async fn delivery_event_for_an_unknown_sender_returns_404() {
    let test_app = TestApp::spawn_app().await;

    let response = test_app
        .post_delivery_event(delivery_event("delivered", "ghost@test.com"))
        .await;

    assert_eq!(404, response.status().as_u16());
}

#[tokio::test]
async fn malformed_delivery_payloads_are_rejected() {
    let test_app = TestApp::spawn_app().await;

    let test_cases = vec![
        (
            serde_json::json!({ "event": "delivered", "email": "r@test.com" }),
            "missing sender_email and message-id",
        ),
        (
            serde_json::json!({
                "event": "bounced",
                "email": "r@test.com",
                "message-id": "m1",
                "sender_email": "s@test.com"
            }),
            "unknown event type",
        ),
    ];

    for (invalid_body, error_message) in test_cases {
        let response = test_app.post_delivery_event(invalid_body).await;

        assert_eq!(
            400,
            response.status().as_u16(),
            "The API did not fail with 400 status when payload was {}",
            error_message
        );
    }
}

#[tokio::test]
async fn premium_purchase_moves_the_account_to_the_premium_tier() {
    let test_app = TestApp::spawn_app().await;

    test_app.create_account("Buyer", "buyer@test.com").await;

    let response = test_app
        .post_billing_event(billing_event("order_created", "buyer@test.com", "premium plan"))
        .await;

    assert_eq!(200, response.status().as_u16());

    let snapshot = test_app.account_snapshot("buyer@test.com").await;

    assert_eq!(snapshot.tier, "premium");
    assert_eq!(snapshot.send_limit, test_app.config.quota.premium_limit);
}

#[tokio::test]
async fn non_premium_purchase_maps_to_the_basic_tier() {
    let test_app = TestApp::spawn_app().await;

    test_app.create_account("Buyer", "buyer@test.com").await;

    let response = test_app
        .post_billing_event(billing_event("order_created", "buyer@test.com", "basic plan"))
        .await;

    assert_eq!(200, response.status().as_u16());

    let snapshot = test_app.account_snapshot("buyer@test.com").await;

    assert_eq!(snapshot.tier, "basic");
    assert_eq!(snapshot.send_limit, test_app.config.quota.basic_limit);
}

#[tokio::test]
async fn downgrade_clamps_sent_count_to_the_new_limit() {
    let test_app = TestApp::spawn_app().await;

    test_app.create_account("Buyer", "buyer@test.com").await;
    test_app
        .set_account_usage("buyer@test.com", "premium", 1000, 50)
        .await;

    test_app
        .post_billing_event(billing_event("order_created", "buyer@test.com", "basic plan"))
        .await;

    let snapshot = test_app.account_snapshot("buyer@test.com").await;

    assert_eq!(snapshot.send_limit, test_app.config.quota.basic_limit);
    // never left above the new limit
    assert_eq!(snapshot.sent_count, test_app.config.quota.basic_limit);
}

#[tokio::test]
async fn upgrade_never_creates_an_account() {
    let test_app = TestApp::spawn_app().await;

    let response = test_app
        .post_billing_event(billing_event("order_created", "ghost@test.com", "premium plan"))
        .await;

    assert_eq!(404, response.status().as_u16());
    assert!(!test_app.account_exists("ghost@test.com").await);
}

#[tokio::test]
async fn unsupported_billing_events_are_rejected() {
    let test_app = TestApp::spawn_app().await;

    test_app.create_account("Buyer", "buyer@test.com").await;

    let response = test_app
        .post_billing_event(billing_event("order_refunded", "buyer@test.com", "premium plan"))
        .await;

    assert_eq!(400, response.status().as_u16());

    let snapshot = test_app.account_snapshot("buyer@test.com").await;

    assert_eq!(snapshot.tier, "free");
}

#[tokio::test]
async fn malformed_billing_payloads_are_rejected() {
    let test_app = TestApp::spawn_app().await;

    let response = test_app
        .post_billing_event(serde_json::json!({ "meta": { "event_name": "order_created" } }))
        .await;

    assert_eq!(400, response.status().as_u16());
}
