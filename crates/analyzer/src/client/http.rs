//! reqwest 기반 [`UpstreamClient`] 구현

use std::time::Duration;

use reqwest::{Client, Response};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use tracing::debug;
use url::Url;

use super::{RegistryMeta, UpstreamClient, VulnQuery};
use crate::config::AnalyzerConfig;
use crate::error::AnalyzerError;
use crate::vuln::Advisory;

/// HTTP upstream 클라이언트
///
/// 세 base URL은 항상 `/`로 끝나도록 정규화되어 상대 경로 결합이 안전합니다.
#[derive(Debug, Clone)]
pub struct HttpUpstreamClient {
    http: Client,
    registry_url: Url,
    downloads_url: Url,
    vuln_api_url: Url,
    ecosystem: String,
}

#[derive(Deserialize)]
struct DownloadsBody {
    downloads: u64,
}

#[derive(Deserialize)]
struct VulnsBody {
    #[serde(default)]
    vulns: Option<Vec<Advisory>>,
}

#[derive(Deserialize)]
struct BatchBody {
    #[serde(default)]
    results: Vec<VulnsBody>,
}

impl HttpUpstreamClient {
    /// 설정으로부터 클라이언트를 생성합니다.
    ///
    /// # Errors
    ///
    /// URL이 잘못되었거나 HTTP 클라이언트를 만들 수 없으면 `AnalyzerError::Config`
    pub fn new(config: &AnalyzerConfig) -> Result<Self, AnalyzerError> {
        let http = Client::builder()
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .user_agent(concat!("depscope/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| AnalyzerError::Config {
                field: "http_client".to_owned(),
                reason: format!("failed to create HTTP client: {e}"),
            })?;

        Ok(Self {
            http,
            registry_url: base_url("registry_url", &config.registry_url)?,
            downloads_url: base_url("downloads_url", &config.downloads_url)?,
            vuln_api_url: base_url("vuln_api_url", &config.vuln_api_url)?,
            ecosystem: config.ecosystem.clone(),
        })
    }

    pub(crate) fn latest_url(&self, name: &str) -> Result<Url, AnalyzerError> {
        join(&self.registry_url, &format!("{}/latest", encode_name(name)))
    }

    pub(crate) fn downloads_endpoint(&self, name: &str) -> Result<Url, AnalyzerError> {
        join(&self.downloads_url, &encode_name(name))
    }

    pub(crate) fn query_url(&self) -> Result<Url, AnalyzerError> {
        join(&self.vuln_api_url, "query")
    }

    pub(crate) fn batch_url(&self) -> Result<Url, AnalyzerError> {
        join(&self.vuln_api_url, "querybatch")
    }

    fn query_body(&self, name: &str, version: &str) -> Value {
        json!({
            "package": {"name": name, "ecosystem": self.ecosystem},
            "version": version,
        })
    }

    async fn get_json<T: DeserializeOwned>(&self, url: Url) -> Result<T, AnalyzerError> {
        debug!(url = %url, "GET");
        let response = self.http.get(url.clone()).send().await?;
        decode(check_status(response, &url)?).await
    }

    async fn post_json<T: DeserializeOwned>(
        &self,
        url: Url,
        body: &Value,
    ) -> Result<T, AnalyzerError> {
        debug!(url = %url, "POST");
        let response = self.http.post(url.clone()).json(body).send().await?;
        decode(check_status(response, &url)?).await
    }
}

impl UpstreamClient for HttpUpstreamClient {
    async fn fetch_latest(&self, name: &str) -> Result<RegistryMeta, AnalyzerError> {
        let url = self.latest_url(name)?;
        let body: Value = self.get_json(url).await?;
        RegistryMeta::from_value(&body).ok_or_else(|| AnalyzerError::PartialResponse {
            target: name.to_owned(),
            reason: "registry response has no version".to_owned(),
        })
    }

    async fn fetch_weekly_downloads(&self, name: &str) -> Result<u64, AnalyzerError> {
        let url = self.downloads_endpoint(name)?;
        let body: DownloadsBody = self.get_json(url).await?;
        Ok(body.downloads)
    }

    async fn query_vulnerabilities(
        &self,
        name: &str,
        version: &str,
    ) -> Result<Vec<Advisory>, AnalyzerError> {
        let url = self.query_url()?;
        let body: VulnsBody = self.post_json(url, &self.query_body(name, version)).await?;
        Ok(body.vulns.unwrap_or_default())
    }

    async fn query_vulnerabilities_batch(
        &self,
        queries: &[VulnQuery],
    ) -> Result<Vec<Vec<Advisory>>, AnalyzerError> {
        let url = self.batch_url()?;
        let request = json!({
            "queries": queries
                .iter()
                .map(|q| self.query_body(&q.name, &q.version))
                .collect::<Vec<_>>(),
        });
        let body: BatchBody = self.post_json(url.clone(), &request).await?;

        if body.results.len() != queries.len() {
            return Err(AnalyzerError::PartialResponse {
                target: url.to_string(),
                reason: format!(
                    "expected {} results, got {}",
                    queries.len(),
                    body.results.len()
                ),
            });
        }

        Ok(body
            .results
            .into_iter()
            .map(|r| r.vulns.unwrap_or_default())
            .collect())
    }
}

/// scoped 패키지의 `/`를 `%2F`로 인코딩합니다.
pub(crate) fn encode_name(name: &str) -> String {
    if name.starts_with('@') {
        name.replacen('/', "%2F", 1)
    } else {
        name.to_owned()
    }
}

fn base_url(field: &str, raw: &str) -> Result<Url, AnalyzerError> {
    let mut normalized = raw.trim().to_owned();
    if !normalized.ends_with('/') {
        normalized.push('/');
    }
    Url::parse(&normalized).map_err(|e| AnalyzerError::Config {
        field: field.to_owned(),
        reason: format!("invalid url '{raw}': {e}"),
    })
}

fn join(base: &Url, path: &str) -> Result<Url, AnalyzerError> {
    base.join(path).map_err(|e| AnalyzerError::Network {
        target: path.to_owned(),
        reason: format!("failed to build url: {e}"),
    })
}

fn check_status(response: Response, url: &Url) -> Result<Response, AnalyzerError> {
    let status = response.status();
    if status.is_success() {
        Ok(response)
    } else {
        Err(AnalyzerError::Network {
            target: url.to_string(),
            reason: format!("upstream returned status {status}"),
        })
    }
}

async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, AnalyzerError> {
    let target = response.url().to_string();
    let bytes = response.bytes().await?;
    serde_json::from_slice(&bytes).map_err(|e| AnalyzerError::PartialResponse {
        target,
        reason: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> HttpUpstreamClient {
        HttpUpstreamClient::new(&AnalyzerConfig::default()).unwrap()
    }

    #[test]
    fn scoped_names_are_encoded() {
        assert_eq!(encode_name("@types/node"), "@types%2Fnode");
        assert_eq!(encode_name("lodash"), "lodash");
    }

    #[test]
    fn latest_url_uses_registry_base() {
        let url = client().latest_url("@babel/core").unwrap();
        assert_eq!(url.as_str(), "https://registry.npmjs.org/@babel%2Fcore/latest");
    }

    #[test]
    fn downloads_url_appends_name() {
        let url = client().downloads_endpoint("react").unwrap();
        assert_eq!(
            url.as_str(),
            "https://api.npmjs.org/downloads/point/last-week/react"
        );
    }

    #[test]
    fn vuln_endpoints_are_relative_to_api_base() {
        let c = client();
        assert_eq!(c.query_url().unwrap().as_str(), "https://api.osv.dev/v1/query");
        assert_eq!(
            c.batch_url().unwrap().as_str(),
            "https://api.osv.dev/v1/querybatch"
        );
    }

    #[test]
    fn base_url_without_trailing_slash_is_normalized() {
        let url = base_url("vuln_api_url", "http://localhost:8080/v1").unwrap();
        assert_eq!(url.join("query").unwrap().as_str(), "http://localhost:8080/v1/query");
    }

    #[test]
    fn invalid_base_url_is_config_error() {
        let err = base_url("registry_url", "not a url").unwrap_err();
        assert!(matches!(err, AnalyzerError::Config { .. }));
    }

    #[test]
    fn query_body_shape() {
        let body = client().query_body("lodash", "4.17.20");
        assert_eq!(body["package"]["name"], "lodash");
        assert_eq!(body["package"]["ecosystem"], "npm");
        assert_eq!(body["version"], "4.17.20");
    }

    #[test]
    fn vulns_body_tolerates_missing_field() {
        let body: VulnsBody = serde_json::from_str("{}").unwrap();
        assert!(body.vulns.is_none());
        let batch: BatchBody =
            serde_json::from_str(r#"{"results":[{},{"vulns":[{"id":"GHSA-1"}]}]}"#).unwrap();
        assert_eq!(batch.results.len(), 2);
        assert_eq!(batch.results[1].vulns.as_ref().unwrap()[0].id, "GHSA-1");
    }
}
