#![allow(dead_code)]

use std::net::TcpListener;
use std::sync::Arc;

use serde_json::{json, Value};
use tokenauth::configuration::{
    ApplicationSettings, DatabaseSettings, JwtSettings, SecuritySettings, Settings,
};
use tokenauth::startup::run;
use tokenauth::store::InMemoryUserStore;

pub const ADMIN_USERNAME: &str = "root";

pub struct TestApp {
    pub address: String,
    pub client: reqwest::Client,
}

pub fn test_settings(port: u16) -> Settings {
    Settings {
        database: DatabaseSettings {
            username: "postgres".to_string(),
            password: "password".to_string(),
            port: 5432,
            host: "localhost".to_string(),
            database_name: "unused".to_string(),
        },
        application: ApplicationSettings {
            host: "127.0.0.1".to_string(),
            port,
        },
        jwt: JwtSettings {
            access_secret: "access-secret-key-at-least-32-characters".to_string(),
            refresh_secret: "refresh-secret-key-at-least-32-characters".to_string(),
            access_token_expiry: 900,
            refresh_token_expiry: 604800,
            issuer: "test".to_string(),
        },
        security: SecuritySettings {
            bcrypt_cost: 4,
            admin_usernames: vec![ADMIN_USERNAME.to_string()],
            secure_cookies: false,
        },
    }
}

pub async fn spawn_app() -> TestApp {
    let listener = TcpListener::bind("127.0.0.1:0").expect("Failed to bind random port");
    let port = listener.local_addr().unwrap().port();
    let address = format!("http://127.0.0.1:{}", port);

    let store = Arc::new(InMemoryUserStore::new());
    let server = run(listener, store, test_settings(port)).expect("Failed to bind address");
    let _ = tokio::spawn(server);

    TestApp {
        address,
        client: reqwest::Client::new(),
    }
}

impl TestApp {
    pub async fn post_register(&self, username: &str, email: &str, password: &str) -> reqwest::Response {
        self.client
            .post(&format!("{}/auth/register", &self.address))
            .json(&json!({ "username": username, "email": email, "password": password }))
            .send()
            .await
            .expect("Failed to execute request.")
    }

    pub async fn post_login(&self, username: &str, password: &str) -> reqwest::Response {
        self.client
            .post(&format!("{}/auth/login", &self.address))
            .json(&json!({ "username": username, "password": password }))
            .send()
            .await
            .expect("Failed to execute request.")
    }

    pub async fn post_refresh(&self, refresh_token: Option<&str>) -> reqwest::Response {
        let mut request = self
            .client
            .post(&format!("{}/auth/refresh_token", &self.address));
        if let Some(token) = refresh_token {
            request = request.header("Cookie", format!("refresh_token={}", token));
        }
        request.send().await.expect("Failed to execute request.")
    }

    pub async fn post_revoke(&self, user_id: &str, access_token: Option<&str>) -> reqwest::Response {
        let mut request = self
            .client
            .post(&format!("{}/auth/revoke/{}", &self.address, user_id));
        if let Some(token) = access_token {
            request = request.bearer_auth(token);
        }
        request.send().await.expect("Failed to execute request.")
    }

    pub async fn get_me(&self, authorization: Option<&str>) -> reqwest::Response {
        let mut request = self.client.get(&format!("{}/auth/me", &self.address));
        if let Some(value) = authorization {
            request = request.header("Authorization", value);
        }
        request.send().await.expect("Failed to execute request.")
    }

    /// Register then log in. Returns (user id, access token, refresh token).
    pub async fn login_new_user(&self, username: &str, password: &str) -> (String, String, String) {
        let response = self
            .post_register(username, &format!("{}@example.com", username), password)
            .await;
        assert_eq!(201, response.status().as_u16());

        let response = self.post_login(username, password).await;
        assert_eq!(200, response.status().as_u16());

        let refresh_token = refresh_cookie(&response).expect("Login did not set refresh cookie");
        let body: Value = response.json().await.expect("Failed to parse response");
        (
            body["user"]["id"].as_str().unwrap().to_string(),
            body["access_token"].as_str().unwrap().to_string(),
            refresh_token,
        )
    }
}

/// The raw `Set-Cookie` header for the refresh token, if any
pub fn refresh_set_cookie(response: &reqwest::Response) -> Option<String> {
    response
        .headers()
        .get_all("set-cookie")
        .iter()
        .filter_map(|value| value.to_str().ok())
        .find(|value| value.starts_with("refresh_token="))
        .map(|value| value.to_string())
}

/// The refresh token value set by a response
pub fn refresh_cookie(response: &reqwest::Response) -> Option<String> {
    refresh_set_cookie(response).map(|header| {
        header["refresh_token=".len()..]
            .split(';')
            .next()
            .unwrap_or_default()
            .to_string()
    })
}
