//! JSON-over-HTTP data provider.

use std::time::Duration;

use serde_json::Value;
use url::Url;

use crate::data::{DataProvider, FetchFuture};
use crate::store::Rejection;

/// Fetches resources as `GET {base_url}/{resource}?{query}` and decodes JSON.
///
/// Object queries become query-string pairs; scalar members are rendered
/// without quotes, nested members as compact JSON.
#[derive(Debug, Clone)]
pub struct HttpDataProvider {
    client: reqwest::Client,
    base_url: Url,
}

impl HttpDataProvider {
    /// Build a provider for `base_url` with a per-request timeout.
    pub fn new(base_url: Url, timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { client, base_url })
    }

    fn resource_url(&self, resource: &str) -> Result<Url, url::ParseError> {
        // Url::join drops the last base segment unless it ends in '/'.
        let mut base = self.base_url.clone();
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        base.join(resource.trim_start_matches('/'))
    }
}

fn query_pairs(query: &Value) -> Vec<(String, String)> {
    match query {
        Value::Object(map) => map
            .iter()
            .filter(|(_, v)| !v.is_null())
            .map(|(k, v)| {
                let rendered = match v {
                    Value::String(s) => s.clone(),
                    other => other.to_string(),
                };
                (k.clone(), rendered)
            })
            .collect(),
        _ => Vec::new(),
    }
}

impl DataProvider for HttpDataProvider {
    fn fetch(&self, resource: &str, query: &Value) -> FetchFuture {
        let client = self.client.clone();
        let url = self.resource_url(resource);
        let pairs = query_pairs(query);

        Box::pin(async move {
            let url = url.map_err(Rejection::error)?;
            tracing::debug!(url = %url, "Fetching resource");

            let response = client
                .get(url)
                .query(&pairs)
                .send()
                .await
                .map_err(Rejection::error)?
                .error_for_status()
                .map_err(Rejection::error)?;

            response.json::<Value>().await.map_err(Rejection::error)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_resource_url_keeps_base_path() {
        let provider = HttpDataProvider::new(
            Url::parse("http://api.local/v1").unwrap(),
            Duration::from_secs(1),
        )
        .unwrap();

        assert_eq!(
            provider.resource_url("/posts/3").unwrap().as_str(),
            "http://api.local/v1/posts/3"
        );
    }

    #[test]
    fn test_query_pairs_flatten_object() {
        let pairs = query_pairs(&json!({"page": 2, "tag": "rust", "skip": null}));
        assert_eq!(
            pairs,
            vec![("page".to_string(), "2".to_string()), ("tag".to_string(), "rust".to_string())]
        );
        assert!(query_pairs(&json!("scalar")).is_empty());
    }
}
