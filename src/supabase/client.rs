use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Client, Method, StatusCode};
use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

use crate::config::SupabaseConfig;
use crate::supabase::query::{self, Query};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Error, Debug)]
pub enum SupabaseError {
    #[error("backend responded {status} {status_text}: {body}")]
    Status {
        status: u16,
        status_text: String,
        body: String,
    },
    #[error("backend request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("failed to decode backend response: {0}")]
    Decode(String),
    #[error("invalid header value for {0}")]
    InvalidHeader(&'static str),
    #[error("invalid backend path segment: {0}")]
    InvalidPath(String),
}

impl SupabaseError {
    pub fn status(&self) -> Option<u16> {
        match self {
            SupabaseError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Body of a backend response: JSON when the backend says so, raw text
/// otherwise. Lets CSV and empty bodies flow through the same path as rows.
#[derive(Debug, Clone)]
pub enum RestValue {
    Json(Value),
    Text(String),
}

impl RestValue {
    /// Flattens a response into a row list: arrays pass through, `null` and
    /// empty text become no rows, and a single object becomes one row.
    pub fn into_rows(self) -> Vec<Value> {
        match self {
            RestValue::Json(Value::Array(rows)) => rows,
            RestValue::Json(Value::Null) => Vec::new(),
            RestValue::Json(other) => vec![other],
            RestValue::Text(text) if text.trim().is_empty() => Vec::new(),
            RestValue::Text(text) => vec![Value::String(text)],
        }
    }

    pub fn into_json(self) -> Value {
        match self {
            RestValue::Json(v) => v,
            RestValue::Text(text) => Value::String(text),
        }
    }
}

/// Identity record returned by the hosted auth endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct AuthUser {
    pub id: String,
    #[serde(default)]
    pub email: Option<String>,
}

/// Thin wrapper over the hosted backend's REST, auth, and storage surfaces.
/// Holds the base URL and service key; every request carries the key both as
/// `apikey` and as a bearer header per the backend's dual-auth convention.
#[derive(Debug, Clone)]
pub struct SupabaseClient {
    client: Client,
    base_url: String,
    key: String,
}

impl SupabaseClient {
    pub fn new(config: &SupabaseConfig) -> Result<Self, SupabaseError> {
        let client = Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self {
            client,
            base_url: config.url.clone(),
            key: config.key.clone(),
        })
    }

    fn key_headers(&self) -> Result<HeaderMap, SupabaseError> {
        let mut headers = HeaderMap::new();
        let key = HeaderValue::from_str(&self.key)
            .map_err(|_| SupabaseError::InvalidHeader("apikey"))?;
        let bearer = HeaderValue::from_str(&format!("Bearer {}", self.key))
            .map_err(|_| SupabaseError::InvalidHeader("authorization"))?;
        headers.insert("apikey", key);
        headers.insert(AUTHORIZATION, bearer);
        Ok(headers)
    }

    /// Forwards a request to `/rest/v1/{table}`. GET requests default to
    /// `select=*` unless the query already selects columns; mutating requests
    /// with a body ask the backend to return the mutated rows so callers do
    /// not need a second read.
    pub async fn rest(
        &self,
        table: &str,
        method: Method,
        body: Option<&Value>,
        query: Option<&Query>,
    ) -> Result<RestValue, SupabaseError> {
        validate_identifier(table)?;

        let query_string = query::render(query, method == Method::GET);
        let url = format!("{}/rest/v1/{}{}", self.base_url, table, query_string);

        let mut request = self
            .client
            .request(method.clone(), &url)
            .headers(self.key_headers()?);
        if let Some(body) = body {
            request = request.json(body);
            if method != Method::GET {
                request = request.header("Prefer", "return=representation");
            }
        }

        let response = request.send().await?;
        self.decode_response(response).await
    }

    pub async fn select_all(
        &self,
        table: &str,
        query: Option<&Query>,
    ) -> Result<Vec<Value>, SupabaseError> {
        let value = self.rest(table, Method::GET, None, query).await?;
        Ok(value.into_rows())
    }

    pub async fn insert(&self, table: &str, row: &Value) -> Result<RestValue, SupabaseError> {
        self.rest(table, Method::POST, Some(row), None).await
    }

    /// Validates a hosted-auth bearer token against `/auth/v1/user`.
    pub async fn auth_user(&self, jwt: &str) -> Result<AuthUser, SupabaseError> {
        let url = format!("{}/auth/v1/user", self.base_url);
        let key = HeaderValue::from_str(&self.key)
            .map_err(|_| SupabaseError::InvalidHeader("apikey"))?;
        let bearer = HeaderValue::from_str(&format!("Bearer {jwt}"))
            .map_err(|_| SupabaseError::InvalidHeader("authorization"))?;

        let response = self
            .client
            .get(&url)
            .header("apikey", key)
            .header(AUTHORIZATION, bearer)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(status_error(status, response).await);
        }
        let user = response
            .json::<AuthUser>()
            .await
            .map_err(|e| SupabaseError::Decode(e.to_string()))?;
        Ok(user)
    }

    /// Uploads raw bytes to `/storage/v1/object/{bucket}/{path}` via PUT,
    /// overwriting any existing object at that path.
    pub async fn upload_object(
        &self,
        bucket: &str,
        path: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<(), SupabaseError> {
        validate_identifier(bucket)?;
        validate_object_path(path)?;

        let url = format!("{}/storage/v1/object/{}/{}", self.base_url, bucket, path);
        let content_type = HeaderValue::from_str(content_type)
            .map_err(|_| SupabaseError::InvalidHeader("content-type"))?;

        let response = self
            .client
            .put(&url)
            .headers(self.key_headers()?)
            .header(CONTENT_TYPE, content_type)
            .body(bytes)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(status_error(status, response).await);
        }
        Ok(())
    }

    /// Public read URL for an object; assumes the bucket allows public reads.
    pub fn public_object_url(&self, bucket: &str, path: &str) -> String {
        format!(
            "{}/storage/v1/object/public/{}/{}",
            self.base_url, bucket, path
        )
    }

    async fn decode_response(&self, response: reqwest::Response) -> Result<RestValue, SupabaseError> {
        let status = response.status();
        if !status.is_success() {
            return Err(status_error(status, response).await);
        }

        let is_json = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|ct| ct.contains("application/json"));

        if is_json {
            let value = response
                .json::<Value>()
                .await
                .map_err(|e| SupabaseError::Decode(e.to_string()))?;
            Ok(RestValue::Json(value))
        } else {
            let text = response.text().await.unwrap_or_default();
            Ok(RestValue::Text(text))
        }
    }
}

async fn status_error(status: StatusCode, response: reqwest::Response) -> SupabaseError {
    let body = response.text().await.unwrap_or_default();
    SupabaseError::Status {
        status: status.as_u16(),
        status_text: status.canonical_reason().unwrap_or("").to_string(),
        body,
    }
}

/// Table and bucket names are interpolated into URLs, so they are held to a
/// strict charset rather than percent-encoded.
fn validate_identifier(name: &str) -> Result<(), SupabaseError> {
    let ok = !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
    if ok {
        Ok(())
    } else {
        Err(SupabaseError::InvalidPath(name.to_string()))
    }
}

/// Object paths are `/`-separated segments of the same charset plus `.`;
/// dot segments and anything that would need percent-encoding are refused
/// rather than encoded.
fn validate_object_path(path: &str) -> Result<(), SupabaseError> {
    let ok = !path.is_empty()
        && !path.starts_with('/')
        && path.split('/').all(|seg| {
            !seg.is_empty()
                && seg != "."
                && seg != ".."
                && seg
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-' || c == '.')
        });
    if ok {
        Ok(())
    } else {
        Err(SupabaseError::InvalidPath(path.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_into_rows_shapes() {
        let rows = RestValue::Json(json!([{"id": 1}, {"id": 2}])).into_rows();
        assert_eq!(rows.len(), 2);

        assert!(RestValue::Json(Value::Null).into_rows().is_empty());
        assert!(RestValue::Text("  ".into()).into_rows().is_empty());

        let single = RestValue::Json(json!({"id": 7})).into_rows();
        assert_eq!(single, vec![json!({"id": 7})]);
    }

    #[test]
    fn test_identifier_validation() {
        assert!(validate_identifier("quotes").is_ok());
        assert!(validate_identifier("admin_users").is_ok());
        assert!(validate_identifier("site-assets").is_ok());
        assert!(validate_identifier("").is_err());
        assert!(validate_identifier("quotes?select=*").is_err());
        assert!(validate_identifier("a/b").is_err());
    }

    #[test]
    fn test_object_path_validation() {
        assert!(validate_object_path("uploads/brochure.pdf").is_ok());
        assert!(validate_object_path("a").is_ok());
        assert!(validate_object_path("").is_err());
        assert!(validate_object_path("/abs").is_err());
        assert!(validate_object_path("a//b").is_err());
        assert!(validate_object_path("a/../b").is_err());
        assert!(validate_object_path("a/./b").is_err());
        // characters that would re-address the object once interpolated
        assert!(validate_object_path("a?x=1").is_err());
        assert!(validate_object_path("a#frag").is_err());
        assert!(validate_object_path("dir/a b.pdf").is_err());
    }

    #[test]
    fn test_public_object_url() {
        let config = SupabaseConfig::new("https://demo.supabase.co", "service-key").unwrap();
        let client = SupabaseClient::new(&config).unwrap();
        assert_eq!(
            client.public_object_url("site-assets", "uploads/logo.png"),
            "https://demo.supabase.co/storage/v1/object/public/site-assets/uploads/logo.png"
        );
    }
}
