//! Object storage collaborator.
//!
//! `ObjectStore` is the narrow interface the rest of the gallery talks to:
//! list the bucket, presign one key, or construct the public fallback URL.
//! `S3Client` implements it against any S3-compatible endpoint over plain
//! HTTP: ListObjectsV2 with pagination, and local SigV4 query presigning.

use crate::config::StorageConfig;
use crate::models::image::StorageObject;
use crate::services::sigv4::{self, PresignParams};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};
use url::Url;

/// HTTP client timeout for listing requests.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("storage bucket is not configured")]
    BucketNotConfigured,
    #[error("storage credentials are not configured")]
    CredentialsMissing,
    #[error("invalid storage endpoint `{0}`")]
    InvalidEndpoint(String),
    #[error(transparent)]
    Request(#[from] reqwest::Error),
    #[error("storage listing returned status {status}: {body}")]
    UpstreamStatus { status: u16, body: String },
    #[error("storage listing response malformed: {0}")]
    MalformedListing(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Narrow interface onto the object storage service. The store is an
/// external collaborator; nothing behind this trait is owned by the gallery.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// All objects in the bucket, optionally under a key prefix.
    async fn list_objects(&self, prefix: Option<&str>) -> StoreResult<Vec<StorageObject>>;

    /// A time-limited signed GET URL for one key.
    async fn presign_get(&self, key: &str) -> StoreResult<String>;

    /// Deterministic unsigned public URL for one key. Pure string
    /// computation; fails only when the bucket is unconfigured.
    fn public_url(&self, key: &str) -> StoreResult<String>;
}

/// Scheme, host, and path prefix a request is addressed to. Derived from the
/// endpoint configuration; `path_prefix` is empty for virtual-hosted style.
struct Target {
    scheme: String,
    host: String,
    path_prefix: String,
}

/// S3-compatible storage client.
pub struct S3Client {
    http: reqwest::Client,
    cfg: StorageConfig,
}

impl S3Client {
    pub fn new(cfg: StorageConfig) -> StoreResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        Ok(Self { http, cfg })
    }

    fn bucket(&self) -> StoreResult<&str> {
        self.cfg
            .bucket
            .as_deref()
            .ok_or(StoreError::BucketNotConfigured)
    }

    fn credentials(&self) -> Option<(&str, &str)> {
        match (
            self.cfg.access_key_id.as_deref(),
            self.cfg.secret_access_key.as_deref(),
        ) {
            (Some(id), Some(secret)) => Some((id, secret)),
            _ => None,
        }
    }

    /// Resolve the request target, honoring the custom endpoint unless the
    /// caller asked for the default regional one.
    fn target(&self, use_endpoint: bool) -> StoreResult<Target> {
        let bucket = self.bucket()?;

        if use_endpoint {
            if let Some(endpoint) = &self.cfg.endpoint {
                let url = Url::parse(endpoint)
                    .map_err(|_| StoreError::InvalidEndpoint(endpoint.clone()))?;
                let host = url
                    .host_str()
                    .ok_or_else(|| StoreError::InvalidEndpoint(endpoint.clone()))?;
                let host = match url.port() {
                    Some(port) => format!("{}:{}", host, port),
                    None => host.to_string(),
                };
                let base_path = url.path().trim_end_matches('/').to_string();

                return Ok(if self.cfg.force_path_style {
                    Target {
                        scheme: url.scheme().to_string(),
                        host,
                        path_prefix: format!("{}/{}", base_path, bucket),
                    }
                } else {
                    Target {
                        scheme: url.scheme().to_string(),
                        host: format!("{}.{}", bucket, host),
                        path_prefix: base_path,
                    }
                });
            }
        }

        Ok(Target {
            scheme: "https".into(),
            host: format!("{}.s3.{}.amazonaws.com", bucket, self.cfg.region),
            path_prefix: String::new(),
        })
    }

    /// Listing URL for the bucket root; presigned when credentials are
    /// available, plain otherwise so public-read buckets keep working.
    fn list_url(&self, target: &Target, query: &[(String, String)]) -> String {
        let path = if target.path_prefix.is_empty() {
            "/".to_string()
        } else {
            target.path_prefix.clone()
        };

        match self.credentials() {
            Some((access_key_id, secret_access_key)) => sigv4::presign_get(&PresignParams {
                scheme: &target.scheme,
                host: &target.host,
                path: &path,
                query,
                region: &self.cfg.region,
                access_key_id,
                secret_access_key,
                expires_secs: self.cfg.presign_expiration,
                now: Utc::now(),
            }),
            None => format!(
                "{}://{}{}?{}",
                target.scheme,
                target.host,
                path,
                sigv4::canonical_query(query)
            ),
        }
    }

    async fn list_objects_at(
        &self,
        prefix: Option<&str>,
        use_endpoint: bool,
    ) -> StoreResult<Vec<StorageObject>> {
        let target = self.target(use_endpoint)?;
        let mut all = Vec::new();
        let mut continuation: Option<String> = None;

        loop {
            let mut query: Vec<(String, String)> = vec![("list-type".into(), "2".into())];
            if let Some(prefix) = prefix {
                if !prefix.is_empty() {
                    query.push(("prefix".into(), prefix.to_string()));
                }
            }
            if let Some(token) = &continuation {
                query.push(("continuation-token".into(), token.clone()));
            }

            let url = self.list_url(&target, &query);
            debug!(prefix = ?prefix, continuation = ?continuation, "listing bucket");

            let response = self.http.get(&url).send().await?;
            let status = response.status();
            let body = response.text().await?;
            if !status.is_success() {
                return Err(StoreError::UpstreamStatus {
                    status: status.as_u16(),
                    body,
                });
            }

            let page = parse_list_page(&body)?;
            all.extend(page.objects);
            match page.next_token {
                Some(token) => continuation = Some(token),
                None => break,
            }
        }

        debug!(count = all.len(), "listed objects");
        Ok(all)
    }

    fn presign_get_at(&self, key: &str, use_endpoint: bool) -> StoreResult<String> {
        let (access_key_id, secret_access_key) =
            self.credentials().ok_or(StoreError::CredentialsMissing)?;
        let target = self.target(use_endpoint)?;
        let path = format!("{}/{}", target.path_prefix, encode_key(key));

        Ok(sigv4::presign_get(&PresignParams {
            scheme: &target.scheme,
            host: &target.host,
            path: &path,
            query: &[],
            region: &self.cfg.region,
            access_key_id,
            secret_access_key,
            expires_secs: self.cfg.presign_expiration,
            now: Utc::now(),
        }))
    }
}

#[async_trait]
impl ObjectStore for S3Client {
    async fn list_objects(&self, prefix: Option<&str>) -> StoreResult<Vec<StorageObject>> {
        match self.list_objects_at(prefix, true).await {
            Err(StoreError::Request(err))
                if self.cfg.endpoint.is_some() && is_dns_error(&err) =>
            {
                warn!("storage endpoint not resolvable, retrying with default regional endpoint");
                self.list_objects_at(prefix, false).await
            }
            other => other,
        }
    }

    async fn presign_get(&self, key: &str) -> StoreResult<String> {
        match self.presign_get_at(key, true) {
            Err(StoreError::InvalidEndpoint(endpoint)) => {
                warn!(
                    endpoint,
                    "storage endpoint unusable for presigning, retrying with default regional endpoint"
                );
                self.presign_get_at(key, false)
            }
            other => other,
        }
    }

    fn public_url(&self, key: &str) -> StoreResult<String> {
        let bucket = self.bucket()?;
        let encoded = encode_key(key);
        Ok(match &self.cfg.endpoint {
            Some(endpoint) => format!("{}/{}", endpoint.trim_end_matches('/'), encoded),
            None => format!(
                "https://{}.s3.{}.amazonaws.com/{}",
                bucket, self.cfg.region, encoded
            ),
        })
    }
}

/// URI-encode an object key, keeping path separators intact.
pub fn encode_key(key: &str) -> String {
    urlencoding::encode(key).replace("%2F", "/")
}

/// True when a transport error bottoms out in name resolution.
fn is_dns_error(err: &reqwest::Error) -> bool {
    let mut source = std::error::Error::source(err);
    while let Some(inner) = source {
        let text = inner.to_string();
        if text.contains("dns error") || text.contains("failed to lookup address") {
            return true;
        }
        source = inner.source();
    }
    false
}

struct ListPage {
    objects: Vec<StorageObject>,
    next_token: Option<String>,
}

/// Extract one page of a ListBucketResult document.
///
/// The listing schema is flat (no nested `Contents` or repeated scalar tags
/// inside an entry), so a linear tag scan is sufficient.
fn parse_list_page(xml: &str) -> StoreResult<ListPage> {
    if !xml.contains("<ListBucketResult") {
        return Err(StoreError::MalformedListing(
            "missing ListBucketResult element".into(),
        ));
    }

    let mut objects = Vec::new();
    let mut rest = xml;
    while let Some((block, after)) = next_block(rest, "Contents") {
        let key = tag_value(block, "Key")
            .map(xml_unescape)
            .ok_or_else(|| StoreError::MalformedListing("Contents entry without Key".into()))?;
        let last_modified = tag_value(block, "LastModified")
            .and_then(|value| DateTime::parse_from_rfc3339(value).ok())
            .map(|value| value.with_timezone(&Utc));
        let size = tag_value(block, "Size")
            .and_then(|value| value.parse().ok())
            .unwrap_or(0);

        objects.push(StorageObject {
            key,
            last_modified,
            size,
        });
        rest = after;
    }

    let truncated = tag_value(xml, "IsTruncated") == Some("true");
    let next_token = if truncated {
        tag_value(xml, "NextContinuationToken").map(xml_unescape)
    } else {
        None
    };

    Ok(ListPage {
        objects,
        next_token,
    })
}

fn next_block<'a>(xml: &'a str, tag: &str) -> Option<(&'a str, &'a str)> {
    let open = format!("<{}>", tag);
    let close = format!("</{}>", tag);
    let start = xml.find(&open)? + open.len();
    let end = start + xml[start..].find(&close)?;
    Some((&xml[start..end], &xml[end + close.len()..]))
}

fn tag_value<'a>(xml: &'a str, tag: &str) -> Option<&'a str> {
    next_block(xml, tag).map(|(value, _)| value)
}

fn xml_unescape(value: &str) -> String {
    value
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&amp;", "&")
}
