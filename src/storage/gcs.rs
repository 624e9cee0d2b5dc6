//! Google Cloud Storage backend over the JSON API

use async_trait::async_trait;
use percent_encoding::{NON_ALPHANUMERIC, utf8_percent_encode};
use serde::Deserialize;
use serde_json::json;
use std::sync::Mutex;
use std::time::{Duration, Instant};
use tracing::debug;

use super::{BadgeStorage, ObjectMeta, ObjectRef};
use crate::error::Result;

const DEFAULT_API_BASE: &str = "https://storage.googleapis.com";
const METADATA_TOKEN_URL: &str =
    "http://metadata.google.internal/computeMetadata/v1/instance/service-accounts/default/token";
/// Tokens are refreshed this long before their reported expiry.
const TOKEN_REFRESH_MARGIN: Duration = Duration::from_secs(60);

/// Storage client authenticating with a static token (`GOOGLE_ACCESS_TOKEN`)
/// or, when absent, the GCE metadata server. Metadata-server tokens are
/// cached until near expiry instead of fetched per call.
pub struct GcsStorage {
    http: reqwest::Client,
    api_base: String,
    token: TokenSource,
    token_cache: Mutex<Option<CachedToken>>,
}

enum TokenSource {
    Static(String),
    MetadataServer,
}

struct CachedToken {
    token: String,
    expires_at: Instant,
}

#[derive(Deserialize)]
struct GcsObject {
    #[serde(rename = "contentType")]
    content_type: Option<String>,
    #[serde(rename = "cacheControl")]
    cache_control: Option<String>,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: Option<u64>,
}

impl GcsStorage {
    /// Builds the client from the environment. `STORAGE_EMULATOR_HOST`
    /// overrides the API endpoint for local testing against an emulator.
    pub fn from_env() -> Self {
        let token = match std::env::var("GOOGLE_ACCESS_TOKEN") {
            Ok(token) if !token.is_empty() => TokenSource::Static(token),
            _ => TokenSource::MetadataServer,
        };
        let api_base =
            std::env::var("STORAGE_EMULATOR_HOST").unwrap_or_else(|_| DEFAULT_API_BASE.to_string());
        Self {
            http: reqwest::Client::new(),
            api_base,
            token,
            token_cache: Mutex::new(None),
        }
    }

    async fn access_token(&self) -> Result<String> {
        match &self.token {
            TokenSource::Static(token) => Ok(token.clone()),
            TokenSource::MetadataServer => {
                if let Some(token) = self.cached_token() {
                    return Ok(token);
                }
                let response = self
                    .http
                    .get(METADATA_TOKEN_URL)
                    .header("Metadata-Flavor", "Google")
                    .send()
                    .await?
                    .error_for_status()?;
                let token: TokenResponse = response.json().await?;
                let ttl = Duration::from_secs(token.expires_in.unwrap_or(0))
                    .saturating_sub(TOKEN_REFRESH_MARGIN);
                *self.token_cache.lock().unwrap() = Some(CachedToken {
                    token: token.access_token.clone(),
                    expires_at: Instant::now() + ttl,
                });
                Ok(token.access_token)
            }
        }
    }

    fn cached_token(&self) -> Option<String> {
        let cache = self.token_cache.lock().unwrap();
        cache
            .as_ref()
            .filter(|cached| cached.expires_at > Instant::now())
            .map(|cached| cached.token.clone())
    }

    fn object_url(&self, object: &ObjectRef) -> String {
        format!(
            "{}/storage/v1/b/{}/o/{}",
            self.api_base,
            object.bucket,
            encode(&object.name)
        )
    }
}

/// Object names are path segments in the JSON API and must be escaped.
fn encode(name: &str) -> String {
    utf8_percent_encode(name, NON_ALPHANUMERIC).to_string()
}

#[async_trait]
impl BadgeStorage for GcsStorage {
    async fn get(&self, object: &ObjectRef, project_id: &str) -> Result<Option<ObjectMeta>> {
        debug!("GET object metadata for '{}'", object);
        let response = self
            .http
            .get(self.object_url(object))
            .bearer_auth(self.access_token().await?)
            .header("x-goog-user-project", project_id)
            .send()
            .await?;
        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let found: GcsObject = response.error_for_status()?.json().await?;
        Ok(Some(ObjectMeta {
            content_type: found.content_type,
            cache_control: found.cache_control,
        }))
    }

    async fn copy(
        &self,
        source: &ObjectRef,
        target: &ObjectRef,
        meta: &ObjectMeta,
        project_id: &str,
    ) -> Result<()> {
        debug!("COPY '{}' to '{}'", source, target);
        let url = format!(
            "{}/storage/v1/b/{}/o/{}/copyTo/b/{}/o/{}",
            self.api_base,
            source.bucket,
            encode(&source.name),
            target.bucket,
            encode(&target.name)
        );
        // Destination metadata travels in the request body.
        let body = json!({
            "contentType": meta.content_type,
            "cacheControl": meta.cache_control,
        });
        self.http
            .post(url)
            .bearer_auth(self.access_token().await?)
            .header("x-goog-user-project", project_id)
            .json(&body)
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }

    async fn grant_public_read(&self, object: &ObjectRef, project_id: &str) -> Result<()> {
        debug!("GRANT public read on '{}'", object);
        let url = format!("{}/acl", self.object_url(object));
        let body = json!({ "entity": "allUsers", "role": "READER" });
        self.http
            .post(url)
            .bearer_auth(self.access_token().await?)
            .header("x-goog-user-project", project_id)
            .json(&body)
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }
}
