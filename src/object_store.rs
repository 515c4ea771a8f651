//! Object store client for fetching the raw corpus.
//!
//! Thin retry/logging wrapper over plain HTTP GETs against S3 (virtual-host
//! addressing) or an S3-compatible gateway (path-style addressing via
//! `--endpoint`). Requests are signed with AWS Signature V4 when credentials
//! were found in the environment; without credentials the request goes out
//! unsigned, which is sufficient for public buckets.
//!
//! Transient failures (connection errors, 5xx) are retried with exponential
//! backoff; missing objects and denied access fail immediately.

use std::time::Duration;

use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use sha2::{Digest, Sha256};
use tracing::{debug, info, warn};

use crate::config::{AwsCredentials, PipelineConfig};
use crate::error::{PipelineError, Result};

type HmacSha256 = Hmac<Sha256>;

/// SHA-256 of an empty payload; GETs never carry a body.
const EMPTY_PAYLOAD_SHA256: &str =
    "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855";

const MAX_RETRIES: u32 = 3;

/// The fetched corpus: an opaque text blob plus its source locator.
///
/// Immutable once fetched; owned solely by the pipeline orchestrator for
/// the duration of a run.
#[derive(Debug, Clone)]
pub struct RawCorpus {
    pub bucket: String,
    pub key: String,
    pub text: String,
}

/// Object store HTTP client.
pub struct ObjectStoreClient {
    client: reqwest::Client,
    region: String,
    endpoint: Option<String>,
    credentials: Option<AwsCredentials>,
}

impl ObjectStoreClient {
    pub fn new(config: &PipelineConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| PipelineError::Config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            region: config.region.clone(),
            endpoint: config.endpoint.as_ref().map(|e| e.trim_end_matches('/').to_string()),
            credentials: config.credentials.clone(),
        })
    }

    /// Fetch an object and decode it as text.
    pub async fn fetch(&self, bucket: &str, key: &str) -> Result<RawCorpus> {
        let (url, host, canonical_uri) = self.request_target(bucket, key)?;
        info!(url = %url, "Fetching corpus from object store");

        let mut backoff = Duration::from_millis(500);
        let mut last_error = None;

        for attempt in 0..MAX_RETRIES {
            match self.try_fetch(&url, &host, &canonical_uri).await {
                Ok(bytes) => {
                    let text = decode_text(&bytes)?;
                    info!(bytes = bytes.len(), chars = text.len(), "Corpus fetched");
                    return Ok(RawCorpus {
                        bucket: bucket.to_string(),
                        key: key.to_string(),
                        text,
                    });
                }
                Err(e) if is_transient(&e) && attempt < MAX_RETRIES - 1 => {
                    warn!(attempt = attempt + 1, error = %e, "Transient fetch failure, retrying");
                    tokio::time::sleep(backoff).await;
                    backoff *= 2;
                    last_error = Some(e);
                }
                Err(e) => return Err(e),
            }
        }

        Err(last_error
            .unwrap_or_else(|| PipelineError::Transport("fetch retries exhausted".to_string())))
    }

    async fn try_fetch(&self, url: &str, host: &str, canonical_uri: &str) -> Result<Vec<u8>> {
        let mut request = self
            .client
            .get(url)
            .header("x-amz-content-sha256", EMPTY_PAYLOAD_SHA256);

        if let Some(creds) = &self.credentials {
            let (authorization, amz_date) =
                sign_get_request(creds, &self.region, host, canonical_uri, Utc::now());
            request = request.header("x-amz-date", amz_date).header("Authorization", authorization);
            if let Some(token) = &creds.session_token {
                request = request.header("x-amz-security-token", token);
            }
        }

        let response = request.send().await?;
        let status = response.status();
        debug!(status = %status, "Object store response");

        if status == reqwest::StatusCode::NOT_FOUND {
            Err(PipelineError::Transport(format!("object not found: {}", url)))
        } else if status == reqwest::StatusCode::FORBIDDEN {
            Err(PipelineError::Transport(format!(
                "access denied: {} (check AWS credentials)",
                url
            )))
        } else if status.is_server_error() {
            Err(PipelineError::Transport(format!(
                "object store returned {}",
                status
            )))
        } else if !status.is_success() {
            Err(PipelineError::Transport(format!(
                "unexpected status {} from object store",
                status
            )))
        } else {
            Ok(response.bytes().await?.to_vec())
        }
    }

    /// Full URL, host header value and canonical URI for a locator.
    fn request_target(&self, bucket: &str, key: &str) -> Result<(String, String, String)> {
        match &self.endpoint {
            Some(endpoint) => {
                let parsed = url::Url::parse(endpoint).map_err(|e| {
                    PipelineError::Config(format!("Invalid endpoint '{}': {}", endpoint, e))
                })?;
                let host = parsed
                    .host_str()
                    .ok_or_else(|| {
                        PipelineError::Config(format!("Endpoint '{}' has no host", endpoint))
                    })?
                    .to_string();
                let host = match parsed.port() {
                    Some(port) => format!("{}:{}", host, port),
                    None => host,
                };
                let canonical_uri =
                    format!("/{}/{}", uri_encode(bucket, false), uri_encode(key, false));
                Ok((format!("{}{}", endpoint, canonical_uri), host, canonical_uri))
            }
            None => {
                let host = format!("{}.s3.{}.amazonaws.com", bucket, self.region);
                let canonical_uri = format!("/{}", uri_encode(key, false));
                Ok((format!("https://{}{}", host, canonical_uri), host, canonical_uri))
            }
        }
    }
}

fn is_transient(error: &PipelineError) -> bool {
    match error {
        PipelineError::Network(e) => e.is_timeout() || e.is_connect() || e.is_request(),
        PipelineError::Transport(msg) => msg.starts_with("object store returned"),
        _ => false,
    }
}

/// Decode the object body as text: UTF-8 first, Latin-1 fallback.
fn decode_text(bytes: &[u8]) -> Result<String> {
    if bytes.is_empty() {
        return Err(PipelineError::Decode("object body is empty".to_string()));
    }
    if bytes.contains(&0) {
        return Err(PipelineError::Decode(
            "object body is not text (contains NUL bytes)".to_string(),
        ));
    }
    match std::str::from_utf8(bytes) {
        Ok(text) => Ok(text.to_string()),
        Err(_) => {
            warn!("Corpus is not valid UTF-8, decoding as Latin-1");
            Ok(bytes.iter().map(|&b| b as char).collect())
        }
    }
}

/// Build the AWS Signature V4 `Authorization` header for a bodyless GET.
///
/// Returns the header value and the `x-amz-date` timestamp that was signed.
fn sign_get_request(
    creds: &AwsCredentials,
    region: &str,
    host: &str,
    canonical_uri: &str,
    now: DateTime<Utc>,
) -> (String, String) {
    let amz_date = now.format("%Y%m%dT%H%M%SZ").to_string();
    let date = now.format("%Y%m%d").to_string();
    let scope = format!("{}/{}/s3/aws4_request", date, region);

    let mut header_pairs = vec![
        ("host", host.to_string()),
        ("x-amz-content-sha256", EMPTY_PAYLOAD_SHA256.to_string()),
        ("x-amz-date", amz_date.clone()),
    ];
    if let Some(token) = &creds.session_token {
        header_pairs.push(("x-amz-security-token", token.clone()));
    }

    let canonical_headers: String = header_pairs
        .iter()
        .map(|(name, value)| format!("{}:{}\n", name, value))
        .collect();
    let signed_headers: String = header_pairs
        .iter()
        .map(|(name, _)| *name)
        .collect::<Vec<_>>()
        .join(";");

    let canonical_request = format!(
        "GET\n{}\n\n{}\n{}\n{}",
        canonical_uri, canonical_headers, signed_headers, EMPTY_PAYLOAD_SHA256
    );

    let string_to_sign = format!(
        "AWS4-HMAC-SHA256\n{}\n{}\n{}",
        amz_date,
        scope,
        hex::encode(Sha256::digest(canonical_request.as_bytes()))
    );

    let date_key = hmac_sha256(format!("AWS4{}", creds.secret_access_key).as_bytes(), date.as_bytes());
    let region_key = hmac_sha256(&date_key, region.as_bytes());
    let service_key = hmac_sha256(&region_key, b"s3");
    let signing_key = hmac_sha256(&service_key, b"aws4_request");
    let signature = hex::encode(hmac_sha256(&signing_key, string_to_sign.as_bytes()));

    let authorization = format!(
        "AWS4-HMAC-SHA256 Credential={}/{}, SignedHeaders={}, Signature={}",
        creds.access_key_id, scope, signed_headers, signature
    );
    (authorization, amz_date)
}

fn hmac_sha256(key: &[u8], data: &[u8]) -> Vec<u8> {
    let mut mac =
        <HmacSha256 as Mac>::new_from_slice(key).expect("HMAC accepts any key length");
    mac.update(data);
    mac.finalize().into_bytes().to_vec()
}

/// URI-encode per AWS rules: unreserved characters pass through, everything
/// else becomes percent-encoded UTF-8 bytes. Slashes are preserved in object
/// keys.
fn uri_encode(input: &str, encode_slash: bool) -> String {
    let mut out = String::with_capacity(input.len());
    for byte in input.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'.' | b'_' | b'~' => {
                out.push(byte as char)
            }
            b'/' if !encode_slash => out.push('/'),
            _ => out.push_str(&format!("%{:02X}", byte)),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn test_credentials() -> AwsCredentials {
        AwsCredentials {
            access_key_id: "AKIDEXAMPLE".to_string(),
            secret_access_key: "wJalrXUtnFEMI/K7MDENG+bPxRfiCYEXAMPLEKEY".to_string(),
            session_token: None,
        }
    }

    #[test]
    fn test_uri_encode() {
        assert_eq!(uri_encode("simple.txt", false), "simple.txt");
        assert_eq!(
            uri_encode("abstract-artificial-set (1).txt", false),
            "abstract-artificial-set%20%281%29.txt"
        );
        assert_eq!(uri_encode("a/b/c.txt", false), "a/b/c.txt");
        assert_eq!(uri_encode("a/b", true), "a%2Fb");
    }

    #[test]
    fn test_decode_text_utf8() {
        assert_eq!(decode_text(b"hello").expect("decode"), "hello");
    }

    #[test]
    fn test_decode_text_latin1_fallback() {
        // 0xE9 is 'é' in Latin-1 but invalid as a lone UTF-8 byte
        let decoded = decode_text(&[b'c', b'a', b'f', 0xE9]).expect("decode");
        assert_eq!(decoded, "café");
    }

    #[test]
    fn test_decode_text_rejects_empty_and_binary() {
        assert!(matches!(decode_text(b""), Err(PipelineError::Decode(_))));
        assert!(matches!(
            decode_text(&[1, 0, 2]),
            Err(PipelineError::Decode(_))
        ));
    }

    #[test]
    fn test_signature_shape_and_determinism() {
        let now = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).single().expect("valid time");
        let creds = test_credentials();
        let (auth_a, amz_date) = sign_get_request(
            &creds,
            "us-east-1",
            "research-gap.s3.us-east-1.amazonaws.com",
            "/abstracts.txt",
            now,
        );
        let (auth_b, _) = sign_get_request(
            &creds,
            "us-east-1",
            "research-gap.s3.us-east-1.amazonaws.com",
            "/abstracts.txt",
            now,
        );

        assert_eq!(amz_date, "20240501T120000Z");
        assert_eq!(auth_a, auth_b);
        assert!(auth_a.starts_with(
            "AWS4-HMAC-SHA256 Credential=AKIDEXAMPLE/20240501/us-east-1/s3/aws4_request"
        ));
        assert!(auth_a.contains("SignedHeaders=host;x-amz-content-sha256;x-amz-date"));
        let signature = auth_a.rsplit('=').next().expect("signature part");
        assert_eq!(signature.len(), 64);
        assert!(signature.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_session_token_is_signed() {
        let now = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).single().expect("valid time");
        let mut creds = test_credentials();
        creds.session_token = Some("FwoGZXIvYXdzEJr".to_string());
        let (auth, _) = sign_get_request(&creds, "us-east-1", "h.example.com", "/k", now);
        assert!(auth.contains("x-amz-security-token"));
    }

    #[test]
    fn test_request_target_virtual_host_style() {
        let config = PipelineConfig::new("research-gap", "abstract set.txt");
        let client = ObjectStoreClient::new(&config).expect("client");
        let (url, host, uri) = client
            .request_target("research-gap", "abstract set.txt")
            .expect("target");
        assert_eq!(host, "research-gap.s3.us-east-1.amazonaws.com");
        assert_eq!(uri, "/abstract%20set.txt");
        assert_eq!(
            url,
            "https://research-gap.s3.us-east-1.amazonaws.com/abstract%20set.txt"
        );
    }

    #[test]
    fn test_request_target_path_style_with_endpoint() {
        let mut config = PipelineConfig::new("research-gap", "abstracts.txt");
        config.endpoint = Some("http://localhost:9000".to_string());
        let client = ObjectStoreClient::new(&config).expect("client");
        let (url, host, uri) = client
            .request_target("research-gap", "abstracts.txt")
            .expect("target");
        assert_eq!(host, "localhost:9000");
        assert_eq!(uri, "/research-gap/abstracts.txt");
        assert_eq!(url, "http://localhost:9000/research-gap/abstracts.txt");
    }
}
