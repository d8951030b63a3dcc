use std::sync::Arc;

use axum::{body::Body, http::Request, response::Response, Router};
use backend::{
    document_storage::{memory::InMemoryBlobStore, DocumentStorage},
    jwt::{JwtManager, PortalClaims, UserRole},
    server,
    types::Environment,
};
use http::{header::AUTHORIZATION, StatusCode};
use http_body_util::BodyExt;
use portal_storage::{store::memory::InMemoryStore, Catalog, CatalogTables};
use serde_json::{json, Value};
use tower::ServiceExt;
use uuid::Uuid;

pub const TEST_JWT_SECRET: &[u8] = b"integration-test-secret-of-32-bytes!";

/// Setup test environment variables with all the required configuration
pub fn setup_test_env() {
    dotenvy::from_path(".env.example").ok();

    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .try_init()
        .ok();
}

/// Router wired to in-memory stores, plus helpers to call it
pub struct TestSetup {
    pub router: Router,
    pub store: Arc<InMemoryStore>,
    pub blobs: Arc<InMemoryBlobStore>,
    pub jwt_manager: Arc<JwtManager>,
}

impl TestSetup {
    pub fn new() -> Self {
        setup_test_env();

        let store = Arc::new(InMemoryStore::new());
        let blobs = Arc::new(InMemoryBlobStore::new());
        let jwt_manager = Arc::new(JwtManager::new(TEST_JWT_SECRET));

        let catalog = Arc::new(Catalog::new(
            store.clone(),
            CatalogTables::with_prefix("test"),
        ));
        let documents = Arc::new(DocumentStorage::new(blobs.clone()));

        let router = server::router(
            Environment::Development,
            catalog,
            documents,
            jwt_manager.clone(),
        );

        Self {
            router,
            store,
            blobs,
            jwt_manager,
        }
    }

    pub fn admin_token(&self) -> String {
        self.token(UserRole::Admin, &[])
    }

    pub fn specialist_token(&self, industries: &[&str]) -> String {
        self.token(UserRole::Specialist, industries)
    }

    fn token(&self, role: UserRole, industries: &[&str]) -> String {
        let user_id = Uuid::new_v4().to_string();
        let claims = PortalClaims::new(
            user_id.clone(),
            format!("{user_id}@example.com"),
            role,
            industries.iter().map(ToString::to_string).collect(),
        );
        self.jwt_manager.issue_token(&claims).unwrap()
    }

    pub async fn send(
        &self,
        method: &str,
        route: &str,
        token: Option<&str>,
        payload: Option<Value>,
    ) -> Result<Response, Box<dyn std::error::Error>> {
        let mut builder = Request::builder().uri(route).method(method);
        if let Some(token) = token {
            builder = builder.header(AUTHORIZATION, format!("Bearer {token}"));
        }

        let body = match payload {
            Some(payload) => {
                builder = builder.header("Content-Type", "application/json");
                Body::from(payload.to_string())
            }
            None => Body::empty(),
        };

        let response = self.router.clone().oneshot(builder.body(body)?).await?;
        Ok(response)
    }

    pub async fn send_get_request(
        &self,
        route: &str,
    ) -> Result<Response, Box<dyn std::error::Error>> {
        self.send("GET", route, None, None).await
    }

    /// Sends a request that must succeed with `expected` and returns the JSON body
    pub async fn expect_json(
        &self,
        method: &str,
        route: &str,
        token: Option<&str>,
        payload: Option<Value>,
        expected: StatusCode,
    ) -> Value {
        let response = self.send(method, route, token, payload).await.unwrap();
        let status = response.status();
        let body = parse_response_body(response).await;
        assert_eq!(status, expected, "{method} {route} returned {body}");
        body
    }

    /// Creates an industry as admin and returns its ID
    pub async fn create_industry(&self, name: &str) -> String {
        let body = self
            .expect_json(
                "POST",
                "/v1/industries",
                Some(&self.admin_token()),
                Some(json!({ "name": name })),
                StatusCode::CREATED,
            )
            .await;
        body["id"].as_str().unwrap().to_string()
    }

    /// Creates an industry, sub-industry, use case and solution and maps them
    pub async fn seed_tree(&self) -> SeededTree {
        let admin = self.admin_token();
        let industry_id = self.create_industry("Retail").await;

        let sub_industry = self
            .expect_json(
                "POST",
                &format!("/v1/industries/{industry_id}/sub-industries"),
                Some(&admin),
                Some(json!({ "name": "Grocery" })),
                StatusCode::CREATED,
            )
            .await;
        let sub_industry_id = sub_industry["id"].as_str().unwrap().to_string();

        let use_case = self
            .expect_json(
                "POST",
                &format!("/v1/sub-industries/{sub_industry_id}/use-cases"),
                Some(&admin),
                Some(json!({ "name": "Shelf monitoring" })),
                StatusCode::CREATED,
            )
            .await;
        let use_case_id = use_case["id"].as_str().unwrap().to_string();

        let solution = self
            .expect_json(
                "POST",
                "/v1/solutions",
                Some(&admin),
                Some(json!({ "name": "ShelfCam", "vendor": "Acme" })),
                StatusCode::CREATED,
            )
            .await;
        let solution_id = solution["id"].as_str().unwrap().to_string();

        self.expect_json(
            "PUT",
            &format!("/v1/use-cases/{use_case_id}/solutions/{solution_id}"),
            Some(&admin),
            Some(json!({ "notes": "camera based" })),
            StatusCode::CREATED,
        )
        .await;

        SeededTree {
            industry_id,
            sub_industry_id,
            use_case_id,
            solution_id,
        }
    }
}

/// IDs of a fully linked catalog branch
pub struct SeededTree {
    pub industry_id: String,
    pub sub_industry_id: String,
    pub use_case_id: String,
    pub solution_id: String,
}

/// Parse response body to JSON, `Null` for empty bodies
pub async fn parse_response_body(response: Response) -> Value {
    let body = response.into_body().collect().await.unwrap().to_bytes();
    if body.is_empty() {
        return Value::Null;
    }
    serde_json::from_slice(&body).unwrap()
}
