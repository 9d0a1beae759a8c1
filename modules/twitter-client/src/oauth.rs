//! OAuth1 (RFC 5849) request signing with HMAC-SHA1.
//!
//! Every v1.1 request carries an `Authorization: OAuth ...` header signed
//! over the method, base URL, and the full parameter set (query plus oauth
//! protocol parameters), percent-encoded per RFC 3986.

use std::time::{SystemTime, UNIX_EPOCH};

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use hmac::{Hmac, Mac};
use rand::{distr::Alphanumeric, Rng};
use sha1::Sha1;

type HmacSha1 = Hmac<Sha1>;

/// A key/secret pair: consumer credentials or a user token.
#[derive(Debug, Clone)]
pub struct Keypair {
    pub key: String,
    pub secret: String,
}

impl Keypair {
    pub fn new(key: impl Into<String>, secret: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            secret: secret.into(),
        }
    }
}

/// Build the `Authorization` header value for one request.
///
/// `query` are the request's query parameters (they participate in the
/// signature but stay in the URL); `extra_oauth` are additional oauth
/// protocol parameters such as `oauth_callback` or `oauth_verifier`.
pub fn authorization_header(
    method: &str,
    base_url: &str,
    query: &[(&str, &str)],
    consumer: &Keypair,
    token: Option<&Keypair>,
    extra_oauth: &[(&str, &str)],
) -> String {
    let nonce: String = rand::rng()
        .sample_iter(&Alphanumeric)
        .take(32)
        .map(char::from)
        .collect();
    let timestamp = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
        .to_string();
    header_with(
        method, base_url, query, consumer, token, extra_oauth, &nonce, &timestamp,
    )
}

fn header_with(
    method: &str,
    base_url: &str,
    query: &[(&str, &str)],
    consumer: &Keypair,
    token: Option<&Keypair>,
    extra_oauth: &[(&str, &str)],
    nonce: &str,
    timestamp: &str,
) -> String {
    let mut oauth_params: Vec<(String, String)> = vec![
        ("oauth_consumer_key".into(), consumer.key.clone()),
        ("oauth_nonce".into(), nonce.into()),
        ("oauth_signature_method".into(), "HMAC-SHA1".into()),
        ("oauth_timestamp".into(), timestamp.into()),
        ("oauth_version".into(), "1.0".into()),
    ];
    if let Some(token) = token {
        oauth_params.push(("oauth_token".into(), token.key.clone()));
    }
    for (k, v) in extra_oauth {
        oauth_params.push(((*k).into(), (*v).into()));
    }

    let mut all_params: Vec<(String, String)> = oauth_params.clone();
    all_params.extend(query.iter().map(|(k, v)| ((*k).into(), (*v).into())));

    let base = signature_base(method, base_url, &all_params);
    let token_secret = token.map(|t| t.secret.as_str()).unwrap_or("");
    let signature = sign(&base, &consumer.secret, token_secret);

    oauth_params.push(("oauth_signature".into(), signature));
    oauth_params.sort();
    let fields: Vec<String> = oauth_params
        .iter()
        .map(|(k, v)| format!("{}=\"{}\"", pct(k), pct(v)))
        .collect();
    format!("OAuth {}", fields.join(", "))
}

/// RFC 5849 §3.4.1 signature base string: method, base URL, and the sorted
/// percent-encoded parameter list, each component percent-encoded again.
fn signature_base(method: &str, base_url: &str, params: &[(String, String)]) -> String {
    let mut encoded: Vec<(String, String)> =
        params.iter().map(|(k, v)| (pct(k), pct(v))).collect();
    encoded.sort();
    let joined: Vec<String> = encoded.iter().map(|(k, v)| format!("{k}={v}")).collect();
    format!(
        "{}&{}&{}",
        method.to_uppercase(),
        pct(base_url),
        pct(&joined.join("&"))
    )
}

fn sign(base: &str, consumer_secret: &str, token_secret: &str) -> String {
    let key = format!("{}&{}", pct(consumer_secret), pct(token_secret));
    let mut mac =
        HmacSha1::new_from_slice(key.as_bytes()).expect("HMAC accepts keys of any length");
    mac.update(base.as_bytes());
    BASE64.encode(mac.finalize().into_bytes())
}

/// RFC 3986 percent encoding (unreserved characters pass through).
fn pct(s: &str) -> String {
    urlencoding::encode(s).into_owned()
}
