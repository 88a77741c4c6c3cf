//! 后端 REST API 的 HTTP 客户端
//!
//! 所有业务 API（会话、消息）共用同一个 `ApiClient`。登录成功后通过
//! [`ApiClient::set_auth_token`] 写入 token，之后每个请求都会带上
//! `Authorization: Bearer <token>`，直到 token 被清除。

use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;

use percent_encoding::{utf8_percent_encode, AsciiSet, CONTROLS};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;

use crate::im::error::Result;
use crate::im::serialization::generate_operation_id;
use crate::im::types::handle_http_response;

/// 路径段中需要转义的字符（含 `/` `?` `#` `%`）
const PATH_SEGMENT: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'/')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'`')
    .add(b'{')
    .add(b'}');

/// 把 ID 等外部输入编码成单个 URL 路径段
pub(crate) fn path_segment(segment: &str) -> String {
    utf8_percent_encode(segment, PATH_SEGMENT).to_string()
}

#[derive(Clone)]
pub struct ApiClient {
    client: reqwest::Client,
    api_base_url: String,
    token: Arc<RwLock<Option<String>>>,
}

impl ApiClient {
    /// 创建新的 API 客户端
    pub fn new(api_base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = reqwest::ClientBuilder::new().timeout(timeout).build()?;
        Ok(Self::with_client(client, api_base_url))
    }

    /// 使用外部构造好的 `reqwest::Client`
    pub fn with_client(client: reqwest::Client, api_base_url: impl Into<String>) -> Self {
        Self {
            client,
            api_base_url: api_base_url.into().trim_end_matches('/').to_string(),
            token: Arc::new(RwLock::new(None)),
        }
    }

    pub fn api_base_url(&self) -> &str {
        &self.api_base_url
    }

    /// 设置（或清除）后续请求携带的认证 token
    pub fn set_auth_token(&self, token: Option<String>) {
        let token = token.filter(|t| !t.is_empty());
        debug!(
            "[ApiClient] {} 认证 token",
            if token.is_some() { "设置" } else { "清除" }
        );
        *self.token.write().unwrap_or_else(PoisonError::into_inner) = token;
    }

    pub fn auth_token(&self) -> Option<String> {
        self.token
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn has_auth_token(&self) -> bool {
        self.token
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    fn request(&self, method: reqwest::Method, path: &str) -> reqwest::RequestBuilder {
        let operation_id = generate_operation_id();
        let url = format!("{}{}", self.api_base_url, path);
        debug!("[ApiClient]   {} {}, 操作ID: {}", method, url, operation_id);

        let mut builder = self
            .client
            .request(method, &url)
            .header("Accept", "application/json")
            .header("operationID", operation_id);
        if let Some(token) = self.auth_token() {
            builder = builder.bearer_auth(token);
        }
        builder
    }

    /// GET 请求并反序列化响应
    pub async fn get<T: DeserializeOwned>(&self, path: &str, operation_name: &str) -> Result<T> {
        let response = self.request(reqwest::Method::GET, path).send().await?;
        handle_http_response(response, operation_name).await
    }

    /// POST JSON 请求并反序列化响应
    pub async fn post<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
        operation_name: &str,
    ) -> Result<T> {
        let response = self
            .request(reqwest::Method::POST, path)
            .json(body)
            .send()
            .await?;
        handle_http_response(response, operation_name).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn path_segment_escapes_separators() {
        assert_eq!(path_segment("chat-1"), "chat-1");
        assert_eq!(path_segment("a/b?c#d"), "a%2Fb%3Fc%23d");
        assert_eq!(path_segment("50%"), "50%25");
    }

    #[tokio::test]
    async fn attaches_bearer_token_once_set() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/ping"))
            .and(header("authorization", "Bearer tok-1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"ok": true})))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/ping"))
            .respond_with(ResponseTemplate::new(401).set_body_json(serde_json::json!({"detail": "Auth required"})))
            .mount(&server)
            .await;

        let api = ApiClient::new(server.uri(), Duration::from_secs(5)).unwrap();
        let err = api
            .get::<serde_json::Value>("/ping", "ping")
            .await
            .unwrap_err();
        assert_eq!(err.status(), Some(401));
        assert_eq!(err.to_string(), "HTTP 错误 401: Auth required");

        api.set_auth_token(Some("tok-1".to_string()));
        let ok: serde_json::Value = api.get("/ping", "ping").await.unwrap();
        assert_eq!(ok["ok"], true);
    }

    #[test]
    fn empty_token_counts_as_cleared() {
        let api = ApiClient::with_client(reqwest::Client::new(), "http://localhost:8000/");
        assert_eq!(api.api_base_url(), "http://localhost:8000");
        api.set_auth_token(Some(String::new()));
        assert!(!api.has_auth_token());
        api.set_auth_token(Some("abc".into()));
        assert_eq!(api.auth_token().as_deref(), Some("abc"));
        api.set_auth_token(None);
        assert!(!api.has_auth_token());
    }
}
