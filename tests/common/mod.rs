//! Common test utilities for E2E tests

#![allow(dead_code)]

use anvil_auth::{AppState, auth::SessionClaims, config};
use tokio::net::TcpListener;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const WEBAPP_URL: &str = "https://app.anvil.test";
pub const SESSION_SECRET: &str = "test-session-secret-key-at-least-32-bytes";
pub const ACCESS_TOKEN: &str = "gho_test_access_token";
const BEARER_ACCESS_TOKEN: &str = "Bearer gho_test_access_token";
pub const STATE_COOKIE: &str = "anvil_oauth_state";

/// Test server instance
///
/// Runs the real router on an ephemeral port with GitHub replaced by a mock.
pub struct TestServer {
    pub addr: String,
    pub state: AppState,
    pub github: MockServer,
    /// Client that never follows redirects
    pub client: reqwest::Client,
}

impl TestServer {
    /// Create a new test server with notifications disabled
    pub async fn new() -> Self {
        Self::start(|_| {}).await
    }

    /// Create a new test server that sends signup notifications to `endpoint`
    pub async fn with_notification_endpoint(endpoint: String) -> Self {
        Self::start(|config| config.notification.endpoint = Some(endpoint)).await
    }

    /// Create a new test server published under `prefix` by a proxy that
    /// strips it, so the router still answers at the root
    pub async fn behind_path_prefix(prefix: &str) -> Self {
        Self::start(|config| {
            config.server.public_url = format!("{}{prefix}", config.server.public_url);
        })
        .await
    }

    async fn start(configure: impl FnOnce(&mut config::AppConfig)) -> Self {
        anvil_auth::metrics::init_metrics();

        let github = MockServer::start().await;

        // Bind first so the public URL is known
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let addr_str = format!("http://{}", addr);

        let mut config = config::AppConfig {
            server: config::ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 0,
                public_url: addr_str.clone(),
            },
            webapp: config::WebappConfig {
                url: WEBAPP_URL.to_string(),
            },
            auth: config::AuthConfig {
                session_secret: SESSION_SECRET.to_string(),
                session_max_age: 2_592_000,
                state_max_age: 600,
                github: config::GitHubOAuthConfig {
                    client_id: "test-client-id".to_string(),
                    client_secret: "test-client-secret".to_string(),
                    authorize_url: "https://github.com/login/oauth/authorize".to_string(),
                    token_url: format!("{}/login/oauth/access_token", github.uri()),
                    api_url: github.uri(),
                    user_agent: "Anvil".to_string(),
                    request_timeout_seconds: 5,
                },
            },
            notification: config::NotificationConfig::default(),
            logging: config::LoggingConfig {
                level: "info".to_string(),
                format: "pretty".to_string(),
            },
        };
        configure(&mut config);

        let state = AppState::new(config).unwrap();

        let client = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .timeout(std::time::Duration::from_secs(10))
            .build()
            .unwrap();

        let app = anvil_auth::build_router(state.clone());

        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            addr: addr_str,
            state,
            github,
            client,
        }
    }

    /// Get base URL for API requests
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.addr, path)
    }

    /// Start a login and return the issued state with its cookie pair
    pub async fn begin_login(&self) -> (String, String) {
        let response = self
            .client
            .get(self.url("/auth/github"))
            .send()
            .await
            .unwrap();
        assert!(response.status().is_redirection());

        let location = url::Url::parse(&location(&response)).unwrap();
        let state = location
            .query_pairs()
            .find(|(key, _)| key == "state")
            .map(|(_, value)| value.into_owned())
            .expect("state parameter");

        (state, state_cookie_pair(&response).expect("state cookie"))
    }

    /// Call the OAuth callback with the given query and optional cookie pair
    pub async fn callback(&self, query: &str, cookie: Option<&str>) -> reqwest::Response {
        let mut request = self
            .client
            .get(self.url(&format!("/auth/github/callback{}", query)));
        if let Some(cookie) = cookie {
            request = request.header("Cookie", cookie);
        }
        request.send().await.unwrap()
    }

    /// Run a full login with a valid state and return the callback response
    pub async fn login_with_code(&self, code: &str) -> reqwest::Response {
        let (state, cookie) = self.begin_login().await;
        self.callback(&format!("?code={code}&state={state}"), Some(&cookie))
            .await
    }

    /// Mock the token endpoint answering `body` for any code
    pub async fn mount_token_response(&self, body: serde_json::Value) {
        Mock::given(method("POST"))
            .and(path("/login/oauth/access_token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(body))
            .mount(&self.github)
            .await;
    }

    /// Mock a successful token exchange
    pub async fn mount_token_exchange(&self) {
        self.mount_token_response(serde_json::json!({
            "access_token": ACCESS_TOKEN,
            "token_type": "bearer",
            "scope": "read:user,user:email"
        }))
        .await;
    }

    /// Mock GET /user
    pub async fn mount_user(&self, user: serde_json::Value) {
        Mock::given(method("GET"))
            .and(path("/user"))
            .and(header("authorization", BEARER_ACCESS_TOKEN))
            .and(header("user-agent", "Anvil"))
            .respond_with(ResponseTemplate::new(200).set_body_json(user))
            .mount(&self.github)
            .await;
    }

    /// Mock GET /user/emails
    pub async fn mount_emails(&self, response: ResponseTemplate) {
        Mock::given(method("GET"))
            .and(path("/user/emails"))
            .and(header("authorization", BEARER_ACCESS_TOKEN))
            .respond_with(response)
            .mount(&self.github)
            .await;
    }

    /// Mock a whole successful GitHub login
    pub async fn mount_github_login(&self, emails: serde_json::Value) {
        self.mount_token_exchange().await;
        self.mount_user(octocat()).await;
        self.mount_emails(ResponseTemplate::new(200).set_body_json(emails))
            .await;
    }

    /// Sign claims with the server's secret
    pub fn create_token(&self, claims: &SessionClaims) -> String {
        anvil_auth::auth::create_session_token(claims, &self.state.config.auth.session_secret)
            .expect("Failed to create test token")
    }
}

/// GitHub profile used by most tests
pub fn octocat() -> serde_json::Value {
    serde_json::json!({
        "login": "octocat",
        "id": 583231,
        "avatar_url": "https://avatars.githubusercontent.com/u/583231?v=4",
        "name": null,
        "email": "octocat@public.example.com"
    })
}

/// Claims for a test user valid for one day
pub fn test_claims() -> SessionClaims {
    let now = chrono::Utc::now().timestamp();
    SessionClaims {
        sub: "12345".to_string(),
        login: "testuser".to_string(),
        name: "Test User".to_string(),
        email: Some("test@example.com".to_string()),
        avatar: "https://example.com/avatar.png".to_string(),
        github_token: "gho_secret".to_string(),
        iat: now,
        exp: now + 86_400,
    }
}

/// Location header of a redirect
pub fn location(response: &reqwest::Response) -> String {
    response
        .headers()
        .get("location")
        .and_then(|v| v.to_str().ok())
        .expect("location header")
        .to_string()
}

/// `name=value` of the state cookie set by a response, if any
pub fn state_cookie_pair(response: &reqwest::Response) -> Option<String> {
    response
        .headers()
        .get_all("set-cookie")
        .iter()
        .filter_map(|v| v.to_str().ok())
        .find(|v| v.starts_with(&format!("{STATE_COOKIE}=")))
        .and_then(|v| v.split(';').next())
        .map(str::to_string)
}

/// Session token carried in a success redirect's fragment
pub fn token_from_location(location: &str) -> String {
    let prefix = format!("{WEBAPP_URL}/auth/callback#token=");
    location
        .strip_prefix(&prefix)
        .unwrap_or_else(|| panic!("unexpected success location: {location}"))
        .to_string()
}
