use async_trait::async_trait;
use tracing::{debug, info};

use super::client::HttpClient;
use crate::error::TransportError;

/// Query parameter that carries the API key.
pub const API_KEY_PARAM: &str = "key";

/// Sends one API operation and returns the raw response body.
///
/// `operation` is the API command (e.g. `getstops`) and `params` its query
/// parameters, API key included. Implementations own any timeout or
/// cancellation policy; callers do not retry.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn fetch(
        &self,
        operation: &str,
        params: &[(&str, String)],
    ) -> Result<String, TransportError>;
}

/// [`Transport`] issuing `GET {base_url}{operation}?{params}` over an
/// [`HttpClient`].
pub struct HttpTransport<C> {
    client: C,
    base_url: String,
}

impl<C: HttpClient> HttpTransport<C> {
    pub fn new(client: C, base_url: impl Into<String>) -> Self {
        Self { client, base_url: base_url.into() }
    }

    fn url(
        &self,
        operation: &str,
        params: &[(&str, String)],
    ) -> Result<reqwest::Url, TransportError> {
        let raw = format!("{}{operation}", self.base_url);
        let mut url = raw.parse::<reqwest::Url>().map_err(|e| TransportError::InvalidUrl {
            url: raw.clone(),
            reason: format!("{e}"),
        })?;
        {
            let mut query = url.query_pairs_mut();
            for (name, value) in params {
                query.append_pair(name, value);
            }
        }
        Ok(url)
    }
}

#[async_trait]
impl<C: HttpClient> Transport for HttpTransport<C> {
    async fn fetch(
        &self,
        operation: &str,
        params: &[(&str, String)],
    ) -> Result<String, TransportError> {
        let url = self.url(operation, params)?;
        debug!(url = %redacted(&url), "Generated URL");

        let started = std::time::Instant::now();
        let req = reqwest::Request::new(reqwest::Method::GET, url);
        let resp = self.client.execute(req).await?;
        info!(
            operation,
            elapsed_ms = started.elapsed().as_millis(),
            status = resp.status().as_u16(),
            "API response received"
        );

        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let body = resp.text().await.unwrap_or_default();
            return Err(TransportError::Status { status, body });
        }
        Ok(resp.text().await?)
    }
}

/// Copy of `url` with the API key masked, for logging.
fn redacted(url: &reqwest::Url) -> reqwest::Url {
    let mut masked = url.clone();
    let pairs: Vec<(String, String)> = url
        .query_pairs()
        .map(|(k, v)| {
            let v = if k == API_KEY_PARAM { "***".into() } else { v.into_owned() };
            (k.into_owned(), v)
        })
        .collect();
    masked.query_pairs_mut().clear().extend_pairs(pairs);
    masked
}

#[cfg(test)]
mod tests {
    use super::*;

    struct NoClient;

    #[async_trait]
    impl HttpClient for NoClient {
        async fn execute(&self, _req: reqwest::Request) -> reqwest::Result<reqwest::Response> {
            unreachable!("url tests never send")
        }
    }

    #[test]
    fn test_url_joins_operation_and_params() {
        let transport =
            HttpTransport::new(NoClient, "http://www.ctabustracker.com/bustime/api/v1/");
        let params = [
            (API_KEY_PARAM, "secret".to_string()),
            ("rt", "54B".to_string()),
            ("dir", "North Bound".to_string()),
        ];
        let url = transport.url("getstops", &params).unwrap();
        assert_eq!(
            url.as_str(),
            "http://www.ctabustracker.com/bustime/api/v1/getstops?key=secret&rt=54B&dir=North+Bound"
        );
    }

    #[test]
    fn test_redacted_masks_key_only() {
        let transport = HttpTransport::new(NoClient, "http://example.test/v1/");
        let params = [(API_KEY_PARAM, "secret".to_string()), ("stpid", "1,2".to_string())];
        let url = transport.url("getpredictions", &params).unwrap();
        assert_eq!(
            redacted(&url).as_str(),
            "http://example.test/v1/getpredictions?key=***&stpid=1%2C2"
        );
    }

    #[test]
    fn test_invalid_base_url() {
        let transport = HttpTransport::new(NoClient, "not a url/");
        assert!(matches!(transport.url("gettime", &[]), Err(TransportError::InvalidUrl { .. })));
    }
}
