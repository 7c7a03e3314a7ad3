use std::time::Duration;

use chrono::Utc;

use super::S3Error;
use super::signing::{self, Credentials};
use super::types::{DEFAULT_MAX_KEYS, ListBucketResult, ObjectSummary};
use crate::sources::retry::{RetryPolicy, with_retry};

const CONNECT_TIMEOUT_CAP: Duration = Duration::from_secs(10);

/// Read-only, path-style S3 client.
#[derive(Clone)]
pub struct S3Client {
    client: reqwest::Client,
    credentials: Credentials,
    endpoint: String,
    region: String,
    bucket: String,
    retry: RetryPolicy,
}

impl S3Client {
    pub fn new(
        endpoint: &str,
        region: &str,
        bucket: &str,
        credentials: Credentials,
        timeout: Duration,
    ) -> Result<Self, S3Error> {
        reqwest::Url::parse(endpoint).map_err(|e| S3Error::InvalidEndpoint {
            endpoint: endpoint.to_string(),
            message: e.to_string(),
        })?;

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .connect_timeout(timeout.min(CONNECT_TIMEOUT_CAP))
            .build()
            .map_err(S3Error::Network)?;

        Ok(Self {
            client,
            credentials,
            endpoint: endpoint.trim_end_matches('/').to_string(),
            region: region.to_string(),
            bucket: bucket.to_string(),
            retry: RetryPolicy::default(),
        })
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn url(&self, key: Option<&str>, query: &[(&str, &str)]) -> Result<reqwest::Url, S3Error> {
        let mut raw = format!("{}/{}", self.endpoint, signing::uri_encode(&self.bucket));
        if let Some(key) = key {
            if signing::has_dot_segment(key) {
                return Err(S3Error::UnaddressableKey { key: key.to_string() });
            }
            raw.push('/');
            raw.push_str(&signing::encode_key(key));
        }
        if !query.is_empty() {
            raw.push('?');
            raw.push_str(&signing::canonical_query(query));
        }
        reqwest::Url::parse(&raw).map_err(|e| S3Error::InvalidEndpoint {
            endpoint: self.endpoint.clone(),
            message: e.to_string(),
        })
    }

    async fn get(&self, url: &reqwest::Url, key: Option<&str>) -> Result<Vec<u8>, S3Error> {
        let headers = signing::sign_request("GET", url, &self.credentials, &self.region, Utc::now())?;

        let mut request = self.client.get(url.clone());
        for (name, value) in headers {
            request = request.header(name, value);
        }

        let response = request.send().await?;
        let status = response.status();
        let body = response.bytes().await?;

        if status.is_success() {
            return Ok(body.to_vec());
        }

        Err(S3Error::from_response(
            status.as_u16(),
            &String::from_utf8_lossy(&body),
            &self.bucket,
            key,
        ))
    }

    /// Every object under `prefix`, following continuation tokens.
    pub async fn list_objects(&self, prefix: &str) -> Result<Vec<ObjectSummary>, S3Error> {
        let mut all_objects = Vec::new();
        let mut token: Option<String> = None;
        let max_keys = DEFAULT_MAX_KEYS.to_string();

        loop {
            let mut query: Vec<(&str, &str)> =
                vec![("list-type", "2"), ("max-keys", max_keys.as_str())];
            if !prefix.is_empty() {
                query.push(("prefix", prefix));
            }
            if let Some(t) = &token {
                query.push(("continuation-token", t.as_str()));
            }
            let url = self.url(None, &query)?;

            let this = self;
            let url_ref = &url;
            let body = with_retry(&self.retry, "ListObjectsV2", move || this.get(url_ref, None)).await?;

            let text = String::from_utf8_lossy(&body);
            let page: ListBucketResult =
                quick_xml::de::from_str(&text).map_err(|e| S3Error::InvalidResponse {
                    message: format!("Failed to parse ListObjectsV2 response: {}", e),
                })?;

            tracing::debug!(
                bucket = %self.bucket,
                count = page.contents.len(),
                truncated = page.is_truncated,
                "listed bucket page"
            );
            all_objects.extend(page.contents);

            match page.next_continuation_token.filter(|t| !t.is_empty()) {
                Some(next) if page.is_truncated => token = Some(next),
                _ => break,
            }
        }

        Ok(all_objects)
    }

    pub async fn get_object(&self, key: &str) -> Result<Vec<u8>, S3Error> {
        let url = self.url(Some(key), &[])?;
        let this = self;
        let url_ref = &url;
        with_retry(&self.retry, "GetObject", move || this.get(url_ref, Some(key))).await
    }
}

impl std::fmt::Debug for S3Client {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("S3Client")
            .field("endpoint", &self.endpoint)
            .field("region", &self.region)
            .field("bucket", &self.bucket)
            .field("credentials", &self.credentials)
            .finish()
    }
}
