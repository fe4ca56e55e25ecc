#![allow(dead_code)]

use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use reqwest::{Method, StatusCode};
use serde_json::{json, Value};
use uuid::Uuid;

use bootcamp_api::config::AppConfig;
use bootcamp_api::database::models::GeoLocation;
use bootcamp_api::database::{Collection, MemoryStore, RecordStore};
use bootcamp_api::server::{self, AppState};
use bootcamp_api::services::geocoder::StaticGeocoder;

/// Addresses the test geocoder knows about.
pub const BOSTON: &str = "233 Bay State Rd Boston MA 02215";
pub const CAMBRIDGE: &str = "77 Massachusetts Ave Cambridge MA 02139";
pub const PROVIDENCE: &str = "Providence RI 02903";
pub const BOSTON_ZIP: &str = "02118";

/// One in-process server on its own port with its own empty store.
pub struct TestServer {
    pub base_url: String,
    pub store: Arc<dyn RecordStore>,
    client: reqwest::Client,
}

impl TestServer {
    pub async fn spawn() -> Result<Self> {
        let port = portpicker::pick_unused_port().context("failed to pick free port")?;
        let base_url = format!("http://127.0.0.1:{}", port);

        let store: Arc<dyn RecordStore> = Arc::new(MemoryStore::new());
        let geocoder = StaticGeocoder::new()
            .with(BOSTON, GeoLocation::point(-71.1, 42.35))
            .with(CAMBRIDGE, GeoLocation::point(-71.12, 42.375))
            .with(PROVIDENCE, GeoLocation::point(-71.41, 41.82))
            .with(BOSTON_ZIP, GeoLocation::point(-71.07, 42.34));
        let state = AppState::new(AppConfig::development(), store.clone(), Arc::new(geocoder));

        let listener = tokio::net::TcpListener::bind(("127.0.0.1", port))
            .await
            .context("failed to bind test listener")?;
        tokio::spawn(server::run(listener, state));

        let server = Self {
            base_url,
            store,
            client: reqwest::Client::new(),
        };
        server.wait_ready(Duration::from_secs(5)).await?;
        Ok(server)
    }

    async fn wait_ready(&self, timeout: Duration) -> Result<()> {
        let deadline = Instant::now() + timeout;
        while Instant::now() < deadline {
            if let Ok(resp) = self.client.get(format!("{}/health", self.base_url)).send().await {
                if resp.status() == StatusCode::OK {
                    return Ok(());
                }
            }
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
        anyhow::bail!("server did not become ready on {} within {:?}", self.base_url, timeout)
    }

    /// Send a request under `/api/v1` and return the status with the parsed body.
    pub async fn call(&self, method: Method, path: &str, token: Option<&str>, body: Option<Value>) -> Result<(StatusCode, Value)> {
        let mut request = self.client.request(method, format!("{}/api/v1{}", self.base_url, path));
        if let Some(token) = token {
            request = request.bearer_auth(token);
        }
        if let Some(body) = body {
            request = request.json(&body);
        }
        let response = request.send().await?;
        let status = response.status();
        let payload = response.json::<Value>().await.unwrap_or(Value::Null);
        Ok((status, payload))
    }

    pub async fn get(&self, path: &str) -> Result<(StatusCode, Value)> {
        self.call(Method::GET, path, None, None).await
    }

    pub async fn post(&self, path: &str, token: &str, body: Value) -> Result<(StatusCode, Value)> {
        self.call(Method::POST, path, Some(token), Some(body)).await
    }

    pub async fn put(&self, path: &str, token: &str, body: Value) -> Result<(StatusCode, Value)> {
        self.call(Method::PUT, path, Some(token), Some(body)).await
    }

    pub async fn delete(&self, path: &str, token: &str) -> Result<(StatusCode, Value)> {
        self.call(Method::DELETE, path, Some(token), None).await
    }

    /// Register an account and return its token.
    pub async fn register(&self, name: &str, role: &str) -> Result<String> {
        let email = format!("{}@devcamper.test", name.to_lowercase().replace(' ', "."));
        let (status, body) = self
            .call(
                Method::POST,
                "/auth/register",
                None,
                Some(json!({"name": name, "email": email, "password": "123456", "role": role})),
            )
            .await?;
        anyhow::ensure!(status == StatusCode::CREATED, "register failed: {} {}", status, body);
        body["token"]
            .as_str()
            .map(str::to_string)
            .context("register response without token")
    }

    /// Register a user and promote it to admin directly in the store.
    pub async fn admin(&self, name: &str) -> Result<String> {
        let token = self.register(name, "user").await?;
        let (_, me) = self.call(Method::GET, "/auth/me", Some(&token), None).await?;
        let id = id_of(&me["data"])?;
        let changes = json!({"role": "admin"}).as_object().cloned().context("object")?;
        self.store.update_by_id(Collection::Users, id, changes).await?;
        Ok(token)
    }

    /// Create a bootcamp as `token` and return its id.
    pub async fn bootcamp(&self, token: &str, name: &str, address: &str) -> Result<Uuid> {
        let (status, body) = self
            .post(
                "/bootcamps",
                token,
                json!({
                    "name": name,
                    "description": format!("{} teaches full stack development", name),
                    "address": address,
                    "careers": ["Web Development", "UI/UX"],
                    "housing": true
                }),
            )
            .await?;
        anyhow::ensure!(status == StatusCode::CREATED, "bootcamp create failed: {} {}", status, body);
        id_of(&body["data"])
    }
}

pub fn id_of(record: &Value) -> Result<Uuid> {
    let raw = record["id"].as_str().context("record without id")?;
    Ok(Uuid::parse_str(raw)?)
}
