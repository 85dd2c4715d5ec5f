use reqwest::Response;
use sqlx::{migrate, postgres::PgRow, Connection, Executor, PgConnection, PgPool, Row};
use uuid::Uuid;
use wiremock::MockServer;

use email_campaigns::{
    config::{get_configuration, DatabaseSettings, Settings},
    startup::{get_connection_db_pool, Application},
};

pub struct TestApp {
    pub config: Settings,
    pub address: String,
    pub db_pool: PgPool,
    pub email_server: MockServer,
}

#[derive(Debug)]
pub struct AccountSnapshot {
    pub tier: String,
    pub send_limit: i32,
    pub sent_count: i32,
    pub delivered_count: i32,
    pub opened_count: i32,
    pub clicked_count: i32,
    pub subscribed: bool,
}

impl TestApp {
    pub async fn spawn_app() -> TestApp {
        let mut config = get_configuration().expect("Missing configuration file.");
        let db_test_name = format!("db_{}", Uuid::new_v4().to_string().replace('-', "_"));
        let email_server = MockServer::start().await;

        // We are using port 0 as way to define a different port per each test. Port 0 is a special case that operating systems
        // take into account: when port is 0, the OS will search for the first available port
        config.set_app_port(0);
        config.set_email_client_base_url(email_server.uri());

        let db_pool = configure_db(&mut config.database, db_test_name.clone()).await;

        let application = Application::build(config.clone())
            .await
            .expect("Failed to build application.");

        let address = format!("http://127.0.0.1:{}", application.get_port());

        tokio::spawn(application.run_until_stop());

        TestApp {
            address,
            config: config.clone(),
            db_pool,
            email_server,
        }
    }

    pub async fn post_account(&self, body: serde_json::Value) -> Response {
        let client = reqwest::Client::new();
        let url = format!("{}/accounts", self.address);

        client
            .post(&url)
            .json(&body)
            .send()
            .await
            .expect("Failed to execute request.")
    }

    pub async fn post_campaign(&self, body: serde_json::Value) -> Response {
        let client = reqwest::Client::new();
        let url = format!("{}/campaigns", self.address);

        client
            .post(&url)
            .json(&body)
            .send()
            .await
            .expect("Failed to execute request.")
    }

    pub async fn post_delivery_event(&self, body: serde_json::Value) -> Response {
        let client = reqwest::Client::new();
        let url = format!("{}/webhooks/delivery", self.address);

        client
            .post(&url)
            .json(&body)
            .send()
            .await
            .expect("Failed to execute request.")
    }

    pub async fn post_billing_event(&self, body: serde_json::Value) -> Response {
        let client = reqwest::Client::new();
        let url = format!("{}/webhooks/billing", self.address);

        client
            .post(&url)
            .json(&body)
            .send()
            .await
            .expect("Failed to execute request.")
    }

    pub async fn get_track_open(&self, email: &str) -> Response {
        let client = reqwest::Client::new();
        let url = format!("{}/track-open", self.address);

        client
            .get(&url)
            .query(&[("email", email)])
            .send()
            .await
            .expect("Failed to execute request.")
    }

    /// Click tracking responds with a redirect, so this client must not follow it.
    pub async fn get_track_click(&self, email: &str, destination: &str) -> Response {
        let client = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .expect("Failed to build client.");
        let url = format!("{}/track-click", self.address);

        client
            .get(&url)
            .query(&[("email", email), ("url", destination)])
            .send()
            .await
            .expect("Failed to execute request.")
    }

    pub async fn get_stats(&self, email: &str) -> Response {
        let client = reqwest::Client::new();
        let url = format!("{}/accounts/{}/stats", self.address, email);

        client
            .get(&url)
            .send()
            .await
            .expect("Failed to execute request.")
    }

    pub async fn get_unsubscribe(&self, email: &str) -> Response {
        let client = reqwest::Client::new();
        let url = format!("{}/unsubscribe", self.address);

        client
            .get(&url)
            .query(&[("email", email)])
            .send()
            .await
            .expect("Failed to execute request.")
    }

    pub async fn create_account(&self, name: &str, email: &str) {
        let response = self
            .post_account(serde_json::json!({ "name": name, "email": email }))
            .await;

        assert_eq!(201, response.status().as_u16());
    }

    /// Puts an account into a specific quota state for scenario tests.
    pub async fn set_account_usage(
        &self,
        email: &str,
        tier: &str,
        send_limit: i32,
        sent_count: i32,
    ) {
        sqlx::query(
            "UPDATE accounts SET tier = $2, send_limit = $3, sent_count = $4 WHERE email = $1",
        )
        .bind(email)
        .bind(tier)
        .bind(send_limit)
        .bind(sent_count)
        .execute(&self.db_pool)
        .await
        .expect("Failed to set account usage.");
    }

    pub async fn account_snapshot(&self, email: &str) -> AccountSnapshot {
        sqlx::query(
            r#"
            SELECT tier, send_limit, sent_count, delivered_count, opened_count, clicked_count, subscribed
            FROM accounts
            WHERE email = $1
            "#,
        )
        .bind(email)
        .map(|row: PgRow| AccountSnapshot {
            tier: row.get("tier"),
            send_limit: row.get("send_limit"),
            sent_count: row.get("sent_count"),
            delivered_count: row.get("delivered_count"),
            opened_count: row.get("opened_count"),
            clicked_count: row.get("clicked_count"),
            subscribed: row.get("subscribed"),
        })
        .fetch_one(&self.db_pool)
        .await
        .expect("Query to fetch account failed.")
    }

    pub async fn account_exists(&self, email: &str) -> bool {
        sqlx::query("SELECT id FROM accounts WHERE email = $1")
            .bind(email)
            .fetch_optional(&self.db_pool)
            .await
            .expect("Query to fetch account failed.")
            .is_some()
    }

    pub async fn send_record_statuses(&self, recipient_email: &str) -> Vec<String> {
        sqlx::query("SELECT status FROM send_records WHERE recipient_email = $1 ORDER BY created_at")
            .bind(recipient_email)
            .map(|row: PgRow| row.get("status"))
            .fetch_all(&self.db_pool)
            .await
            .expect("Query to fetch send records failed.")
    }

    /// The htmlContent of every email the provider stub received, in order.
    pub async fn sent_html_bodies(&self) -> Vec<String> {
        self.email_server
            .received_requests()
            .await
            .unwrap()
            .iter()
            .map(|request| {
                let body: serde_json::Value =
                    serde_json::from_slice(&request.body).expect("Provider body was not JSON.");

                body["htmlContent"]
                    .as_str()
                    .expect("Provider body had no htmlContent.")
                    .to_string()
            })
            .collect()
    }
}

pub fn extract_links(html: &str) -> Vec<String> {
    linkify::LinkFinder::new()
        .links(html)
        .map(|link| link.as_str().to_string())
        .collect()
}

async fn configure_db(db_config: &mut DatabaseSettings, db_test_name: String) -> PgPool {
    // Create database
    let mut connection = PgConnection::connect_with(&db_config.get_db_options())
        .await
        .expect("Failed to connect to Postgres.");

    connection
        .execute(&*format!(r#"CREATE DATABASE "{}";"#, db_test_name))
        .await
        .expect("Failed to create database.");

    connection
        .close()
        .await
        .expect("Failed to close connection.");

    // Execute migrations
    db_config.set_name(db_test_name.clone());

    let db_pool = get_connection_db_pool(db_config);

    migrate!("./migrations")
        .run(&db_pool)
        .await
        .expect("Failed to run migrations.");

    println!("Database {} created!!", db_test_name);

    db_pool
}
