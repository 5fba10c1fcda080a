use super::{CloudAppError, CloudAppResult, CloudAppService};
use async_trait::async_trait;
use modeploy_core::{CloudAppInstanceInfo, CloudAppType};
use reqwest::{Client, Response, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

#[derive(Debug, Serialize)]
struct SubmitBody<'a> {
    #[serde(rename = "type")]
    app_type: CloudAppType,
    args: &'a [String],
}

#[derive(Debug, Deserialize)]
struct SubmitReply {
    application_id: String,
}

/// Cluster application service reached over its REST endpoint
pub struct HttpCloudAppService {
    client: Client,
    base_url: String,
}

impl HttpCloudAppService {
    pub fn new(base_url: impl Into<String>, request_timeout: Duration) -> CloudAppResult<Self> {
        let client = Client::builder()
            .timeout(request_timeout)
            .build()
            .map_err(|e| CloudAppError::Unavailable(format!("failed to build http client: {e}")))?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }
}

fn transport_error(context: &str, err: reqwest::Error) -> CloudAppError {
    CloudAppError::Unavailable(format!("{context}: {err}"))
}

async fn check_status(context: &str, response: Response) -> CloudAppResult<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    let message = if body.is_empty() {
        format!("{context}: {status}")
    } else {
        format!("{context}: {status}: {body}")
    };

    Err(classify_status(status, message))
}

fn classify_status(status: StatusCode, message: String) -> CloudAppError {
    match status {
        StatusCode::CONFLICT => CloudAppError::AlreadyExists(message),
        StatusCode::NOT_FOUND => CloudAppError::NotFound(message),
        StatusCode::TOO_MANY_REQUESTS | StatusCode::REQUEST_TIMEOUT => {
            CloudAppError::Unavailable(message)
        }
        s if s.is_server_error() => CloudAppError::Unavailable(message),
        _ => CloudAppError::Rejected(message),
    }
}

#[async_trait]
impl CloudAppService for HttpCloudAppService {
    async fn push_application(
        &self,
        app_name: &str,
        app_type: CloudAppType,
    ) -> CloudAppResult<()> {
        let url = self.url(&format!("/applications/{app_name}"));
        debug!(%url, %app_type, "Pushing application");

        let response = self
            .client
            .put(&url)
            .query(&[("type", app_type.as_str())])
            .send()
            .await
            .map_err(|e| transport_error("push application", e))?;
        check_status("push application", response).await?;
        Ok(())
    }

    async fn submit_application(
        &self,
        app_name: &str,
        app_type: CloudAppType,
        args: Vec<String>,
    ) -> CloudAppResult<String> {
        let url = self.url(&format!("/applications/{app_name}/submissions"));
        debug!(%url, %app_type, args = args.len(), "Submitting application");

        let response = self
            .client
            .post(&url)
            .json(&SubmitBody {
                app_type,
                args: &args,
            })
            .send()
            .await
            .map_err(|e| transport_error("submit application", e))?;
        let reply: SubmitReply = check_status("submit application", response)
            .await?
            .json()
            .await
            .map_err(|e| CloudAppError::Rejected(format!("unreadable submit reply: {e}")))?;
        Ok(reply.application_id)
    }

    async fn get_instances(&self) -> CloudAppResult<Vec<CloudAppInstanceInfo>> {
        let response = self
            .client
            .get(self.url("/instances"))
            .send()
            .await
            .map_err(|e| transport_error("list instances", e))?;
        check_status("list instances", response)
            .await?
            .json()
            .await
            .map_err(|e| CloudAppError::Rejected(format!("unreadable instance list: {e}")))
    }

    async fn kill_application(&self, application_id: &str) -> CloudAppResult<()> {
        let url = self.url(&format!("/instances/{application_id}"));
        debug!(%url, "Killing application");

        let response = self
            .client
            .delete(&url)
            .send()
            .await
            .map_err(|e| transport_error("kill application", e))?;
        check_status("kill application", response).await?;
        Ok(())
    }
}
