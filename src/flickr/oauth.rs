//! OAuth 1.0a request signing (HMAC-SHA1), the flavor Flickr requires.
//!
//! Only the signing primitive lives here; the interactive token-exchange
//! dance is out of scope and tokens are supplied ready-made.

use base64::Engine;
use hmac::{Hmac, Mac};
use sha1::Sha1;

type HmacSha1 = Hmac<Sha1>;

/// RFC 3986 percent-encoding with the unreserved set `A-Za-z0-9-._~`,
/// which is exactly what OAuth 1.0a mandates for the base string.
pub(crate) fn rfc3986(s: &str) -> String {
    urlencoding::encode(s).into_owned()
}

/// Construct the OAuth signature base string:
/// `METHOD&enc(url)&enc(sorted-joined-params)`.
///
/// `params` must not yet contain `oauth_signature`.
pub(crate) fn signature_base_string(
    http_method: &str,
    url: &str,
    params: &[(String, String)],
) -> String {
    let mut encoded: Vec<(String, String)> = params
        .iter()
        .map(|(k, v)| (rfc3986(k), rfc3986(v)))
        .collect();
    encoded.sort();

    let joined = encoded
        .iter()
        .map(|(k, v)| format!("{k}={v}"))
        .collect::<Vec<_>>()
        .join("&");

    format!(
        "{}&{}&{}",
        http_method.to_ascii_uppercase(),
        rfc3986(url),
        rfc3986(&joined)
    )
}

/// HMAC-SHA1 over the base string, keyed with
/// `enc(consumer_secret)&enc(token_secret)`, base64-encoded.
pub(crate) fn sign(base_string: &str, consumer_secret: &str, token_secret: &str) -> String {
    let key = format!("{}&{}", rfc3986(consumer_secret), rfc3986(token_secret));
    let mut mac =
        HmacSha1::new_from_slice(key.as_bytes()).expect("HMAC accepts keys of any length");
    mac.update(base_string.as_bytes());
    base64::engine::general_purpose::STANDARD.encode(mac.finalize().into_bytes())
}

/// Append `oauth_signature` for a GET request with the given params.
pub(crate) fn sign_get(
    url: &str,
    params: &mut Vec<(String, String)>,
    consumer_secret: &str,
    token_secret: &str,
) {
    let base = signature_base_string("GET", url, params);
    let signature = sign(&base, consumer_secret, token_secret);
    params.push(("oauth_signature".into(), signature));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rfc3986_leaves_unreserved_untouched() {
        assert_eq!(rfc3986("AZaz09-._~"), "AZaz09-._~");
    }

    #[test]
    fn rfc3986_encodes_reserved() {
        assert_eq!(rfc3986("a b&c=d"), "a%20b%26c%3Dd");
        assert_eq!(rfc3986("http://x/"), "http%3A%2F%2Fx%2F");
    }

    #[test]
    fn base_string_sorts_params() {
        let params = vec![
            ("b".to_string(), "2".to_string()),
            ("a".to_string(), "1".to_string()),
        ];
        let base = signature_base_string("get", "https://api.example.com/rest/", &params);
        assert_eq!(
            base,
            "GET&https%3A%2F%2Fapi.example.com%2Frest%2F&a%3D1%26b%3D2"
        );
    }

    #[test]
    fn base_string_double_encodes_param_values() {
        let params = vec![("q".to_string(), "a b".to_string())];
        let base = signature_base_string("GET", "https://x/", &params);
        // "a b" -> "a%20b" in the param string -> "a%2520b" in the base string
        assert!(base.ends_with("q%3Da%2520b"));
    }

    #[test]
    fn signature_is_base64_and_deterministic() {
        let s1 = sign("base", "consumer", "token");
        let s2 = sign("base", "consumer", "token");
        assert_eq!(s1, s2);
        // HMAC-SHA1 is 20 bytes -> 28 base64 chars with padding
        assert_eq!(s1.len(), 28);
        assert!(base64::engine::general_purpose::STANDARD
            .decode(&s1)
            .is_ok());
    }

    #[test]
    fn different_keys_give_different_signatures() {
        assert_ne!(sign("base", "a", "t"), sign("base", "b", "t"));
        assert_ne!(sign("base", "a", "t"), sign("base", "a", "u"));
    }

    #[test]
    fn sign_get_appends_signature_param() {
        let mut params = vec![("method".to_string(), "flickr.test.login".to_string())];
        sign_get("https://x/", &mut params, "cs", "ts");
        assert_eq!(params.last().unwrap().0, "oauth_signature");
    }
}
