#![allow(dead_code)]

use std::sync::Arc;

use axum::Router;
use serde_json::{json, Value};
use testcontainers::runners::AsyncRunner;
use testcontainers::ContainerAsync;
use testcontainers_modules::minio::MinIO;
use testcontainers_modules::mongo::Mongo;

use catharsis::app::{build_router, AppState};
use catharsis::config::{AppConfig, AuthConfig, DatabaseConfig, ServerConfig, StorageConfig};
use catharsis::storage::client::{S3StorageClient, StorageClient};

pub const BUCKET: &str = "catharsis-test";

/// Holds running containers and provides the Axum router for integration tests.
///
/// Containers are kept alive for as long as this struct lives. When dropped,
/// containers are stopped and cleaned up automatically.
pub struct TestEnv {
    _mongo: ContainerAsync<Mongo>,
    _minio: ContainerAsync<MinIO>,
    pub router: Router,
    pub state: AppState,
    pub db: mongodb::Database,
    pub storage_url: String,
}

fn test_config(mongo_uri: &str, minio_endpoint: &str) -> AppConfig {
    AppConfig {
        server: ServerConfig {
            host: "127.0.0.1".into(),
            port: 0,
            frontend_url: "http://localhost:3000".into(),
            admin_url: "http://localhost:5001".into(),
        },
        database: DatabaseConfig {
            uri: mongo_uri.into(),
            name: format!("catharsis_test_{}", uuid::Uuid::new_v4().simple()),
        },
        auth: AuthConfig {
            jwt_secret: "integration-secret".into(),
            token_ttl_hours: 24,
        },
        storage: StorageConfig {
            bucket: BUCKET.into(),
            region: "us-east-1".into(),
            endpoint: Some(minio_endpoint.into()),
            public_url: Some(format!("{minio_endpoint}/{BUCKET}")),
        },
    }
}

impl TestEnv {
    /// Spin up MongoDB and MinIO and build the full router over them.
    pub async fn start() -> Self {
        // Start containers concurrently
        let (mongo_container, minio_container) =
            tokio::join!(Mongo::default().start(), MinIO::default().start());
        let mongo_container = mongo_container.expect("Failed to start MongoDB container");
        let minio_container = minio_container.expect("Failed to start MinIO container");

        // --- MongoDB ---
        let mongo_port = mongo_container
            .get_host_port_ipv4(27017)
            .await
            .expect("Failed to get MongoDB port");
        let mongo_uri = format!("mongodb://127.0.0.1:{}", mongo_port);

        // --- MinIO (S3) ---
        let minio_port = minio_container
            .get_host_port_ipv4(9000)
            .await
            .expect("Failed to get MinIO port");
        let minio_endpoint = format!("http://127.0.0.1:{}", minio_port);

        let config = test_config(&mongo_uri, &minio_endpoint);

        let mongo_client = mongodb::Client::with_uri_str(&mongo_uri)
            .await
            .expect("Failed to connect to MongoDB");
        let db = mongo_client.database(&config.database.name);

        // Set env vars for AWS SDK to pick up MinIO credentials
        unsafe {
            std::env::set_var("AWS_ACCESS_KEY_ID", "minioadmin");
            std::env::set_var("AWS_SECRET_ACCESS_KEY", "minioadmin");
        }

        let s3_config = aws_config::defaults(aws_config::BehaviorVersion::latest())
            .endpoint_url(&minio_endpoint)
            .region(aws_config::Region::new("us-east-1"))
            .load()
            .await;
        let s3_client = aws_sdk_s3::Client::from_conf(
            aws_sdk_s3::config::Builder::from(&s3_config)
                .force_path_style(true)
                .build(),
        );
        let _ = s3_client.create_bucket().bucket(BUCKET).send().await;

        let storage_url = config.storage.public_base_url();
        let storage: Arc<dyn StorageClient> = Arc::new(S3StorageClient::new(
            s3_client,
            BUCKET.to_string(),
            storage_url.clone(),
        ));

        let state = AppState::from_parts(&db, storage, &config)
            .await
            .expect("Failed to build application state");
        let router = build_router(state.clone(), &config);

        Self {
            _mongo: mongo_container,
            _minio: minio_container,
            router,
            state,
            db,
            storage_url,
        }
    }

    /// Build an `axum_test::TestServer` from this environment's router.
    pub fn server(&self) -> axum_test::TestServer {
        axum_test::TestServer::builder()
            .expect_success_by_default()
            .build(self.router.clone())
    }

    /// Build a `TestServer` that does NOT expect success by default (for error tests).
    pub fn server_permissive(&self) -> axum_test::TestServer {
        axum_test::TestServer::builder()
            .build(self.router.clone())
    }

    /// Helper: create the first admin and log in as it.
    pub async fn admin_token(&self, server: &axum_test::TestServer) -> String {
        server
            .post("/api/auth/setup")
            .json(&json!({
                "username": "director",
                "password": "catharsis!",
                "name": "원장"
            }))
            .await;

        let response = server
            .post("/api/auth/login")
            .json(&json!({ "username": "director", "password": "catharsis!" }))
            .await;
        let body: Value = response.json();
        body["data"]["token"]
            .as_str()
            .expect("login returns a token")
            .to_string()
    }

    /// Helper: create a record through an admin endpoint and return its id.
    pub async fn create(
        &self,
        server: &axum_test::TestServer,
        token: &str,
        kind: &str,
        body: Value,
    ) -> String {
        let response = server
            .post(&format!("/api/admin/{kind}"))
            .authorization_bearer(token)
            .json(&body)
            .await;
        response.assert_status(axum::http::StatusCode::CREATED);
        let body: Value = response.json();
        body["data"]["_id"]
            .as_str()
            .expect("created record has an id")
            .to_string()
    }
}

/// A minimal notice body.
pub fn notice(title: &str) -> Value {
    json!({ "title": title, "content": format!("{title} 본문") })
}
