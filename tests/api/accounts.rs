use crate::helpers::TestApp;

#[tokio::test]
async fn create_account_returns_201_and_starts_on_the_free_tier() {
    let test_app = TestApp::spawn_app().await;

    let response = test_app
        .post_account(serde_json::json!({ "name": "Frank", "email": "frank@test.com" }))
        .await;

    assert_eq!(201, response.status().as_u16());

    let snapshot = test_app.account_snapshot("frank@test.com").await;

    assert_eq!(snapshot.tier, "free");
    assert_eq!(snapshot.send_limit, test_app.config.quota.free_limit);
    assert_eq!(snapshot.sent_count, 0);
    assert!(snapshot.subscribed);
}

#[tokio::test]
async fn create_account_returns_409_for_a_duplicate_email() {
    let test_app = TestApp::spawn_app().await;

    test_app.create_account("Frank", "frank@test.com").await;

    let response = test_app
        .post_account(serde_json::json!({ "name": "Also Frank", "email": "frank@test.com" }))
        .await;

    assert_eq!(409, response.status().as_u16());
}

#[tokio::test]
async fn create_account_returns_400_when_body_is_invalid() {
    let test_app = TestApp::spawn_app().await;

    // This is a common practice and it is called table-driven tests. In this case, it simulates different kind of possible request bodies
    // where API should return 400.
    let test_cases = vec![
        (
            serde_json::json!({ "name": "Frank" }),
            "missing email parameter",
        ),
        (
            serde_json::json!({ "email": "frank@test.com" }),
            "missing name parameter",
        ),
        (
            serde_json::json!({ "name": "", "email": "frank@test.com" }),
            "name cannot be empty",
        ),
        (
            serde_json::json!({ "name": "Frank", "email": "not-an-email" }),
            "email is not valid",
        ),
    ];

    for (invalid_body, error_message) in test_cases {
        let response = test_app.post_account(invalid_body).await;

        assert_eq!(
            400,
            response.status().as_u16(),
            "The API did not fail with 400 status when payload was {}",
            error_message
        );
    }
}

#[tokio::test]
async fn stats_endpoint_returns_the_account_counters() {
    let test_app = TestApp::spawn_app().await;

    test_app.create_account("Frank", "frank@test.com").await;
    test_app.get_track_open("frank@test.com").await;

    let response = test_app.get_stats("frank@test.com").await;

    assert_eq!(200, response.status().as_u16());

    let body: serde_json::Value = response.json().await.expect("Stats body was not JSON.");

    assert_eq!(body["email"], "frank@test.com");
    assert_eq!(body["tier"], "free");
    assert_eq!(body["sent_count"], 0);
    assert_eq!(body["opened_count"], 1);
    assert_eq!(body["subscribed"], true);
}

#[tokio::test]
async fn stats_endpoint_returns_404_for_an_unknown_account() {
    let test_app = TestApp::spawn_app().await;

    let response = test_app.get_stats("ghost@test.com").await;

    assert_eq!(404, response.status().as_u16());
}

#[tokio::test]
async fn unsubscribe_flips_the_subscribed_flag() {
    let test_app = TestApp::spawn_app().await;

    test_app.create_account("Frank", "frank@test.com").await;

    let response = test_app.get_unsubscribe("frank@test.com").await;

    assert_eq!(200, response.status().as_u16());

    let snapshot = test_app.account_snapshot("frank@test.com").await;

    assert!(!snapshot.subscribed);
}

#[tokio::test]
async fn unsubscribe_returns_404_for_an_unknown_account() {
    let test_app = TestApp::spawn_app().await;

    let response = test_app.get_unsubscribe("ghost@test.com").await;

    assert_eq!(404, response.status().as_u16());
}

#[tokio::test]
async fn unsubscribe_returns_400_for_an_invalid_address() {
    let test_app = TestApp::spawn_app().await;

    let response = test_app.get_unsubscribe("not-an-email").await;

    assert_eq!(400, response.status().as_u16());
}
