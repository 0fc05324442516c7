//! Playlist retrieval and signed manifest URLs.
//!
//! The boundary with the platform side: callers hand this module a manifest
//! URI (optionally signed with an opaque authorization pair obtained
//! elsewhere) and get playlist text back. Nothing here knows how the
//! authorization values were produced.

use std::collections::HashMap;
use std::time::Duration;

use url::Url;

use crate::retry::FragmentError;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(15);

/// Opaque authorization pair supplied by an external collaborator.
#[derive(Debug, Clone)]
pub struct AccessToken {
    pub signature: String,
    pub value: String,
}

/// Appends the authorization pair to a manifest endpoint as query
/// parameters. Existing query parameters are preserved.
pub fn signed_manifest_url(endpoint: &Url, token: &AccessToken) -> Url {
    let mut url = endpoint.clone();
    url.query_pairs_mut()
        .append_pair("nauthsig", &token.signature)
        .append_pair("nauth", &token.value);
    url
}

/// Fetches playlist text over HTTP. Success only on a 2xx status with a
/// non-empty body; errors use the same classification as fragment fetches so
/// the caller can apply the shared retry policy.
pub fn fetch_playlist(
    url: &Url,
    custom_headers: &HashMap<String, String>,
    timeout: Option<Duration>,
) -> Result<String, FragmentError> {
    let mut body: Vec<u8> = Vec::new();

    let mut easy = curl::easy::Easy::new();
    easy.url(url.as_str()).map_err(FragmentError::Curl)?;
    easy.follow_location(true).map_err(FragmentError::Curl)?;
    easy.connect_timeout(CONNECT_TIMEOUT)
        .map_err(FragmentError::Curl)?;
    if let Some(t) = timeout {
        easy.timeout(t).map_err(FragmentError::Curl)?;
    }

    let mut list = curl::easy::List::new();
    for (k, v) in custom_headers {
        list.append(&format!("{}: {}", k.trim(), v.trim()))
            .map_err(FragmentError::Curl)?;
    }
    if !custom_headers.is_empty() {
        easy.http_headers(list).map_err(FragmentError::Curl)?;
    }

    {
        let mut transfer = easy.transfer();
        transfer
            .write_function(|data| {
                body.extend_from_slice(data);
                Ok(data.len())
            })
            .map_err(FragmentError::Curl)?;
        transfer.perform().map_err(FragmentError::Curl)?;
    }

    let code = easy.response_code().map_err(FragmentError::Curl)? as u32;
    if !(200..300).contains(&code) {
        return Err(FragmentError::Http(code));
    }
    if body.is_empty() {
        return Err(FragmentError::EmptyBody);
    }

    Ok(String::from_utf8_lossy(&body).into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signed_url_carries_both_parameters() {
        let endpoint = Url::parse("https://usher.example.com/vod/12345.m3u8").unwrap();
        let token = AccessToken {
            signature: "sig-abc".to_string(),
            value: "tok-xyz".to_string(),
        };
        let url = signed_manifest_url(&endpoint, &token);
        let pairs: Vec<(String, String)> = url
            .query_pairs()
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();
        assert!(pairs.contains(&("nauthsig".to_string(), "sig-abc".to_string())));
        assert!(pairs.contains(&("nauth".to_string(), "tok-xyz".to_string())));
    }

    #[test]
    fn signed_url_preserves_existing_query() {
        let endpoint =
            Url::parse("https://usher.example.com/vod/12345.m3u8?allow_source=true").unwrap();
        let token = AccessToken {
            signature: "s".to_string(),
            value: "v".to_string(),
        };
        let url = signed_manifest_url(&endpoint, &token);
        assert!(url
            .query_pairs()
            .any(|(k, v)| k == "allow_source" && v == "true"));
        assert!(url.query_pairs().any(|(k, _)| k == "nauthsig"));
    }

    #[test]
    fn token_values_are_percent_encoded() {
        let endpoint = Url::parse("https://usher.example.com/vod/1.m3u8").unwrap();
        let token = AccessToken {
            signature: "a b&c".to_string(),
            value: "{\"json\":true}".to_string(),
        };
        let url = signed_manifest_url(&endpoint, &token);
        let decoded: Vec<(String, String)> = url
            .query_pairs()
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();
        assert!(decoded.contains(&("nauthsig".to_string(), "a b&c".to_string())));
        assert!(decoded.contains(&("nauth".to_string(), "{\"json\":true}".to_string())));
    }
}
