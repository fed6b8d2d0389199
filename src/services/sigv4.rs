//! SigV4 query presigning for S3-style GET requests.
//!
//! Signing is a local computation over the request shape: no network I/O
//! happens here. The produced URL carries the full `X-Amz-*` query auth so
//! any HTTP client can fetch the object until the expiry passes.

use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use sha2::{Digest, Sha256};

type HmacSha256 = Hmac<Sha256>;

const ALGORITHM: &str = "AWS4-HMAC-SHA256";
const SERVICE: &str = "s3";

/// Inputs for presigning one GET request.
pub struct PresignParams<'a> {
    pub scheme: &'a str,
    /// Host, including a non-default port when present.
    pub host: &'a str,
    /// URI-encoded absolute path, leading slash included.
    pub path: &'a str,
    /// Additional query parameters, decoded.
    pub query: &'a [(String, String)],
    pub region: &'a str,
    pub access_key_id: &'a str,
    pub secret_access_key: &'a str,
    pub expires_secs: u64,
    pub now: DateTime<Utc>,
}

/// Produce a presigned GET URL. Pure function of its inputs; the same
/// parameters always yield the same URL.
pub fn presign_get(p: &PresignParams<'_>) -> String {
    let amz_date = p.now.format("%Y%m%dT%H%M%SZ").to_string();
    let datestamp = p.now.format("%Y%m%d").to_string();
    let scope = format!("{}/{}/{}/aws4_request", datestamp, p.region, SERVICE);
    let credential = format!("{}/{}", p.access_key_id, scope);

    let mut query: Vec<(String, String)> = p.query.to_vec();
    query.push(("X-Amz-Algorithm".into(), ALGORITHM.into()));
    query.push(("X-Amz-Credential".into(), credential));
    query.push(("X-Amz-Date".into(), amz_date.clone()));
    query.push(("X-Amz-Expires".into(), p.expires_secs.to_string()));
    query.push(("X-Amz-SignedHeaders".into(), "host".into()));

    let canonical_query = canonical_query(&query);
    let canonical_request = format!(
        "GET\n{}\n{}\nhost:{}\n\nhost\nUNSIGNED-PAYLOAD",
        p.path, canonical_query, p.host
    );
    let string_to_sign = format!(
        "{}\n{}\n{}\n{}",
        ALGORITHM,
        amz_date,
        scope,
        hex::encode(Sha256::digest(canonical_request.as_bytes()))
    );

    let date_key = hmac(
        format!("AWS4{}", p.secret_access_key).as_bytes(),
        datestamp.as_bytes(),
    );
    let region_key = hmac(&date_key, p.region.as_bytes());
    let service_key = hmac(&region_key, SERVICE.as_bytes());
    let signing_key = hmac(&service_key, b"aws4_request");
    let signature = hex::encode(hmac(&signing_key, string_to_sign.as_bytes()));

    format!(
        "{}://{}{}?{}&X-Amz-Signature={}",
        p.scheme, p.host, p.path, canonical_query, signature
    )
}

/// Canonical query string: pairs URI-encoded and sorted by encoded key,
/// then encoded value. Also used for unsigned listing requests so signed
/// and unsigned URLs share one encoding path.
pub fn canonical_query(pairs: &[(String, String)]) -> String {
    let mut encoded: Vec<(String, String)> = pairs
        .iter()
        .map(|(k, v)| {
            (
                urlencoding::encode(k).into_owned(),
                urlencoding::encode(v).into_owned(),
            )
        })
        .collect();
    encoded.sort();
    encoded
        .iter()
        .map(|(k, v)| format!("{}={}", k, v))
        .collect::<Vec<_>>()
        .join("&")
}

fn hmac(key: &[u8], data: &[u8]) -> Vec<u8> {
    let mut mac = HmacSha256::new_from_slice(key).expect("HMAC accepts keys of any length");
    mac.update(data);
    mac.finalize().into_bytes().to_vec()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn params<'a>(query: &'a [(String, String)]) -> PresignParams<'a> {
        PresignParams {
            scheme: "https",
            host: "photos.s3.us-east-1.amazonaws.com",
            path: "/landscape/outdoor/a.jpg",
            query,
            region: "us-east-1",
            access_key_id: "AKIDEXAMPLE",
            secret_access_key: "secret",
            expires_secs: 900,
            now: Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap(),
        }
    }

    #[test]
    fn presigned_url_carries_query_auth() {
        let url = presign_get(&params(&[]));
        assert!(url.starts_with("https://photos.s3.us-east-1.amazonaws.com/landscape/outdoor/a.jpg?"));
        assert!(url.contains("X-Amz-Algorithm=AWS4-HMAC-SHA256"));
        assert!(url.contains("X-Amz-Credential=AKIDEXAMPLE%2F20240501%2Fus-east-1%2Fs3%2Faws4_request"));
        assert!(url.contains("X-Amz-Date=20240501T120000Z"));
        assert!(url.contains("X-Amz-Expires=900"));
        assert!(url.contains("X-Amz-SignedHeaders=host"));

        let signature = url
            .rsplit_once("X-Amz-Signature=")
            .map(|(_, sig)| sig)
            .unwrap();
        assert_eq!(signature.len(), 64);
        assert!(signature.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn presigning_is_deterministic() {
        let first = presign_get(&params(&[]));
        let second = presign_get(&params(&[]));
        assert_eq!(first, second);
    }

    #[test]
    fn different_secrets_produce_different_signatures() {
        let signed = presign_get(&params(&[]));
        let mut other = params(&[]);
        other.secret_access_key = "other-secret";
        assert_ne!(signed, presign_get(&other));
    }

    #[test]
    fn canonical_query_sorts_and_encodes() {
        let pairs = vec![
            ("prefix".to_string(), "landscape/".to_string()),
            ("list-type".to_string(), "2".to_string()),
        ];
        assert_eq!(
            canonical_query(&pairs),
            "list-type=2&prefix=landscape%2F"
        );
    }
}
