//! Baidu link-submission push.

use async_trait::async_trait;
use reqwest::Client;
use reqwest::header::CONTENT_TYPE;
use tracing::{debug, info};

use tagdir_directory::{HookError, SearchNotifier};

use crate::error::PublishError;

/// Pushes tag URLs to the Baidu submission API.
///
/// New URLs go to `{endpoint}/urls`, changed ones to `{endpoint}/update`.
/// Both take a plain-text body of newline separated URLs.
#[derive(Clone)]
pub struct BaiduPush {
    client: Client,
    endpoint: String,
    site: String,
    token: String,
}

impl BaiduPush {
    pub fn new(endpoint: impl Into<String>, site: impl Into<String>, token: impl Into<String>) -> Self {
        Self::with_client(Client::new(), endpoint, site, token)
    }

    pub fn with_client(
        client: Client,
        endpoint: impl Into<String>,
        site: impl Into<String>,
        token: impl Into<String>,
    ) -> Self {
        Self {
            client,
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
            site: site.into(),
            token: token.into(),
        }
    }

    async fn push(&self, action: &str, url: &str) -> Result<String, PublishError> {
        let endpoint = format!("{}/{}", self.endpoint, action);
        debug!(%endpoint, url, "pushing url");

        let response = self
            .client
            .post(&endpoint)
            .query(&[("site", self.site.as_str()), ("token", self.token.as_str())])
            .header(CONTENT_TYPE, "text/plain")
            .body(url.to_string())
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(PublishError::Rejected {
                status: status.as_u16(),
                body,
            });
        }
        Ok(body)
    }
}

#[async_trait]
impl SearchNotifier for BaiduPush {
    async fn notify_created(&self, url: &str) -> Result<(), HookError> {
        let body = self.push("urls", url).await?;
        info!(url, response = %body, "search push accepted");
        Ok(())
    }

    async fn notify_updated(&self, url: &str) -> Result<(), HookError> {
        let body = self.push("update", url).await?;
        info!(url, response = %body, "search update accepted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_string, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn push_for(server: &MockServer) -> BaiduPush {
        BaiduPush::new(server.uri(), "https://example.com", "secret")
    }

    #[tokio::test]
    async fn test_created_url_goes_to_urls_endpoint() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/urls"))
            .and(query_param("site", "https://example.com"))
            .and(query_param("token", "secret"))
            .and(header("content-type", "text/plain"))
            .and(body_string("https://example.com/tag/rust"))
            .respond_with(ResponseTemplate::new(200).set_body_string(r#"{"success":1}"#))
            .expect(1)
            .mount(&server)
            .await;

        push_for(&server)
            .notify_created("https://example.com/tag/rust")
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_updated_url_goes_to_update_endpoint() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/update"))
            .respond_with(ResponseTemplate::new(200).set_body_string(r#"{"success":1}"#))
            .expect(1)
            .mount(&server)
            .await;

        push_for(&server)
            .notify_updated("https://example.com/tag/rust")
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_non_success_status_is_rejected() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/urls"))
            .respond_with(ResponseTemplate::new(400).set_body_string("token is not valid"))
            .mount(&server)
            .await;

        let err = push_for(&server)
            .push("urls", "https://example.com/tag/rust")
            .await
            .unwrap_err();
        match err {
            PublishError::Rejected { status, body } => {
                assert_eq!(status, 400);
                assert_eq!(body, "token is not valid");
            }
            other => panic!("expected rejection, got {other:?}"),
        }
    }
}
