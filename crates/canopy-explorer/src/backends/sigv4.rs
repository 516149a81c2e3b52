//! AWS Signature Version 4 for S3-compatible requests.

use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use sha2::{Digest, Sha256};
use url::Url;

use crate::error::BackendError;

type HmacSha256 = Hmac<Sha256>;

pub(crate) const REGION: &str = "us-east-1";
const SERVICE: &str = "s3";
const ALGORITHM: &str = "AWS4-HMAC-SHA256";
const SIGNED_HEADERS: &str = "host;x-amz-content-sha256;x-amz-date";

/// SHA-256 of an empty payload.
pub(crate) const EMPTY_PAYLOAD_SHA256: &str =
    "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855";

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Credentials {
    pub access_key: String,
    pub secret_key: String,
}

/// RFC 3986 encoding with the unreserved set S3 expects.
pub(crate) fn uri_encode(input: &str, encode_slash: bool) -> String {
    let mut out = String::with_capacity(input.len());
    for byte in input.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                out.push(byte as char)
            }
            b'/' if !encode_slash => out.push('/'),
            _ => out.push_str(&format!("%{byte:02X}")),
        }
    }
    out
}

fn hmac(key: &[u8], data: &[u8]) -> Result<Vec<u8>, BackendError> {
    let mut mac =
        HmacSha256::new_from_slice(key).map_err(|err| BackendError::Request(err.to_string()))?;
    mac.update(data);
    Ok(mac.finalize().into_bytes().to_vec())
}

pub(crate) fn signing_key(
    secret_key: &str,
    date: &str,
    region: &str,
    service: &str,
) -> Result<Vec<u8>, BackendError> {
    let date_key = hmac(format!("AWS4{secret_key}").as_bytes(), date.as_bytes())?;
    let region_key = hmac(&date_key, region.as_bytes())?;
    let service_key = hmac(&region_key, service.as_bytes())?;
    hmac(&service_key, b"aws4_request")
}

fn host_header(url: &Url) -> Result<String, BackendError> {
    let host = url
        .host_str()
        .ok_or_else(|| BackendError::Request(format!("{url} has no host")))?;
    Ok(match url.port() {
        Some(port) => format!("{host}:{port}"),
        None => host.to_owned(),
    })
}

fn canonical_query(url: &Url) -> String {
    let mut pairs: Vec<(String, String)> = url
        .query_pairs()
        .map(|(k, v)| (uri_encode(&k, true), uri_encode(&v, true)))
        .collect();
    pairs.sort();
    pairs
        .into_iter()
        .map(|(k, v)| format!("{k}={v}"))
        .collect::<Vec<_>>()
        .join("&")
}

pub(crate) fn canonical_request(
    method: &str,
    url: &Url,
    amz_date: &str,
) -> Result<String, BackendError> {
    Ok(format!(
        "{method}\n{path}\n{query}\nhost:{host}\nx-amz-content-sha256:{payload}\nx-amz-date:{amz_date}\n\n{SIGNED_HEADERS}\n{payload}",
        path = url.path(),
        query = canonical_query(url),
        host = host_header(url)?,
        payload = EMPTY_PAYLOAD_SHA256,
    ))
}

/// Headers to attach to a body-less request. `url` must already carry S3-encoded path
/// segments. The `host` header is signed but left for the HTTP client to send.
pub(crate) fn sign(
    method: &str,
    url: &Url,
    credentials: &Credentials,
    now: DateTime<Utc>,
) -> Result<Vec<(&'static str, String)>, BackendError> {
    let amz_date = now.format("%Y%m%dT%H%M%SZ").to_string();
    let date = now.format("%Y%m%d").to_string();
    let scope = format!("{date}/{REGION}/{SERVICE}/aws4_request");

    let request = canonical_request(method, url, &amz_date)?;
    let string_to_sign = format!(
        "{ALGORITHM}\n{amz_date}\n{scope}\n{}",
        hex::encode(Sha256::digest(request.as_bytes()))
    );
    let key = signing_key(&credentials.secret_key, &date, REGION, SERVICE)?;
    let signature = hex::encode(hmac(&key, string_to_sign.as_bytes())?);

    Ok(vec![
        ("x-amz-date", amz_date),
        ("x-amz-content-sha256", EMPTY_PAYLOAD_SHA256.to_owned()),
        (
            "authorization",
            format!(
                "{ALGORITHM} Credential={}/{scope}, SignedHeaders={SIGNED_HEADERS}, Signature={signature}",
                credentials.access_key
            ),
        ),
    ])
}
