//! URL construction for routing-service requests
//!
//! Encodes query parameters deterministically and joins them onto the
//! provider's origin and the endpoint path.

use url::form_urlencoded;
use crate::types::QueryParams;

/// Query parameter name carrying the API key
pub const API_KEY_PARAM: &str = "api_key";

/// Builder for the request URLs of one provider
#[derive(Debug, Clone)]
pub struct RequestBuilder {
    base_url: String,
}

impl RequestBuilder {
    /// Create a builder for `base_url`; a trailing slash is dropped
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// The origin every path is appended to
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Build `base_url + path [+ "?" + query]`
    ///
    /// `api_key`, when given, is appended after the (sorted) parameters.
    pub fn build_url(&self, path: &str, params: &QueryParams, api_key: Option<&str>) -> String {
        let query = encode_query(params, api_key);
        let mut url = String::with_capacity(self.base_url.len() + path.len() + query.len() + 1);
        url.push_str(&self.base_url);
        if !path.is_empty() && !path.starts_with('/') {
            url.push('/');
        }
        url.push_str(path);
        if !query.is_empty() {
            url.push('?');
            url.push_str(&query);
        }
        url
    }
}

/// Encode `params` as `application/x-www-form-urlencoded`
///
/// Mappings are sorted by key first, so two mappings holding the same pairs
/// always encode to the same string.
pub fn encode_query(params: &QueryParams, api_key: Option<&str>) -> String {
    let mut serializer = form_urlencoded::Serializer::new(String::new());
    for (key, value) in params.encoding_pairs() {
        serializer.append_pair(key, &value);
    }
    if let Some(key) = api_key {
        serializer.append_pair(API_KEY_PARAM, key);
    }
    serializer.finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::collections::HashMap;

    #[test]
    fn test_build_url_with_key() {
        let builder = RequestBuilder::new("https://api.openrouteservice.org/");
        let params = QueryParams::new()
            .with("start", vec![8.681495, 49.41461])
            .with("end", vec![8.687872, 49.420318]);

        let url = builder.build_url("/v2/directions/driving-car", &params, Some("abc"));
        assert_eq!(
            url,
            "https://api.openrouteservice.org/v2/directions/driving-car\
             ?end=8.687872%2C49.420318&start=8.681495%2C49.41461&api_key=abc"
        );
    }

    #[test]
    fn test_build_url_without_params_or_key() {
        let builder = RequestBuilder::new("http://localhost:8082/ors");
        let url = builder.build_url("/v2/isochrones/foot-walking", &QueryParams::new(), None);
        assert_eq!(url, "http://localhost:8082/ors/v2/isochrones/foot-walking");
    }

    #[test]
    fn test_key_only_query() {
        let query = encode_query(&QueryParams::new(), Some("k e y"));
        assert_eq!(query, "api_key=k+e+y");
    }

    #[test]
    fn test_api_key_follows_sorted_params() {
        let params: QueryParams = [("zeta", "1"), ("alpha", "2")].into_iter().collect();
        assert_eq!(encode_query(&params, Some("k")), "alpha=2&zeta=1&api_key=k");
    }

    #[test]
    fn test_ordered_params_keep_order() {
        let params = QueryParams::ordered([("zeta", "1"), ("alpha", "2")]);
        assert_eq!(encode_query(&params, None), "zeta=1&alpha=2");
    }

    proptest! {
        #[test]
        fn prop_encoding_ignores_insertion_order(
            entries in proptest::collection::hash_map("[a-z_]{1,8}", "[ -~]{0,12}", 0..12)
        ) {
            let pairs: Vec<(String, String)> = entries.into_iter().collect();
            let forward: QueryParams = pairs.iter().cloned().collect();
            let backward: QueryParams = pairs.iter().rev().cloned().collect();
            let from_map: QueryParams = pairs.iter().cloned().collect::<HashMap<_, _>>().into();

            let expected = encode_query(&forward, Some("key"));
            prop_assert_eq!(&expected, &encode_query(&backward, Some("key")));
            prop_assert_eq!(&expected, &encode_query(&from_map, Some("key")));
        }
    }
}
