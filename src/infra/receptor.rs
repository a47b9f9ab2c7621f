use anyhow::{anyhow, Context, Error};
use async_trait::async_trait;
use log::debug;
use reqwest::{Client, RequestBuilder, Response, StatusCode, Url};
use serde::{de::DeserializeOwned, Deserialize};

use crate::{
    config::ReceptorConfig,
    domain::{
        model::{ActualLrp, DesiredLrp, DesiredLrpUpdateRequest},
        port::{SchedulerClient, SchedulerError},
    },
};

const UNAUTHORIZED: &str = "Unauthorized";
const UNKNOWN_ERROR: &str = "UnknownError";

#[derive(Debug, Deserialize)]
struct ReceptorErrorBody {
    name: String,
    #[serde(default)]
    message: String,
}

/// [`SchedulerClient`] talking to a receptor over its REST API.
#[derive(Clone, Debug)]
pub struct ReceptorClient {
    client: Client,
    base_url: Url,
    credentials: Option<(String, String)>,
}

/// Moves any `user:password@` userinfo out of `url`.
fn take_credentials(url: &mut Url) -> Option<(String, String)> {
    let credentials = if url.username().is_empty() {
        None
    } else {
        Some((
            url.username().to_string(),
            url.password().unwrap_or_default().to_string(),
        ))
    };
    // Only cannot-be-a-base URLs refuse userinfo changes, and those carry none.
    let _ = url.set_username("").and_then(|_| url.set_password(None));
    credentials
}

/// `target` without its userinfo, safe to print.
pub fn redacted_target(target: &str) -> String {
    match Url::parse(target) {
        Ok(mut url) => {
            take_credentials(&mut url);
            url.as_str().trim_end_matches('/').to_string()
        }
        Err(_) => match target.rsplit_once('@') {
            Some((_, host)) => format!("***@{}", host),
            None => target.to_string(),
        },
    }
}

impl ReceptorClient {
    /// `target` may carry `user:password@` userinfo; it is moved into basic
    /// auth credentials and stripped from the base URL.
    pub fn new(target: &str) -> Result<Self, Error> {
        let mut url = Url::parse(target)
            .context(format!("Invalid receptor target {}", redacted_target(target)))?;
        if url.cannot_be_a_base() {
            return Err(anyhow!(
                "Invalid receptor target {}",
                redacted_target(target)
            ));
        }
        let credentials = take_credentials(&mut url);

        Ok(Self {
            client: Client::new(),
            base_url: url,
            credentials,
        })
    }

    /// Credentials in the URL win over the configured ones.
    pub fn from_config(config: &ReceptorConfig) -> Result<Self, Error> {
        let mut client = Self::new(&config.url)?;
        if client.credentials.is_none() {
            if let Some(username) = &config.username {
                client.credentials = Some((
                    username.clone(),
                    config.password.clone().unwrap_or_default(),
                ));
            }
        }
        Ok(client)
    }

    /// `/v1/{segments..}` under the base URL, each segment percent-encoded.
    fn url(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().push("v1").extend(segments);
        }
        url
    }

    fn with_auth(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.credentials {
            Some((username, password)) => request.basic_auth(username, Some(password)),
            None => request,
        }
    }

    async fn send(&self, request: RequestBuilder) -> Result<Response, SchedulerError> {
        let response = self
            .with_auth(request)
            .send()
            .await
            .map_err(|e| SchedulerError::Transport(e.into()))?;
        if response.status().is_success() {
            return Ok(response);
        }
        Err(classify_failure(response).await)
    }

    async fn get<T: DeserializeOwned>(&self, segments: &[&str]) -> Result<T, SchedulerError> {
        let url = self.url(segments);
        debug!("GET {}", url);
        let response = self.send(self.client.get(url)).await?;
        let body = response
            .bytes()
            .await
            .map_err(|e| SchedulerError::Transport(e.into()))?;
        serde_json::from_slice(&body).map_err(|e| SchedulerError::InvalidResponse(e.to_string()))
    }
}

async fn classify_failure(response: Response) -> SchedulerError {
    let status = response.status();
    let body = response.json::<ReceptorErrorBody>().await.ok();
    match body {
        _ if status == StatusCode::UNAUTHORIZED => SchedulerError::Unauthorized,
        Some(body) if body.name == UNAUTHORIZED => SchedulerError::Unauthorized,
        Some(body) => SchedulerError::Api {
            kind: body.name,
            message: body.message,
        },
        None => SchedulerError::Api {
            kind: UNKNOWN_ERROR.to_string(),
            message: format!("receptor answered {}", status),
        },
    }
}

#[async_trait]
impl SchedulerClient for ReceptorClient {
    async fn desired_lrps(&self) -> Result<Vec<DesiredLrp>, SchedulerError> {
        self.get(&["desired_lrps"]).await
    }

    async fn create_desired_lrp(&self, desired_lrp: &DesiredLrp) -> Result<(), SchedulerError> {
        let url = self.url(&["desired_lrps"]);
        debug!("POST {} for {}", url, desired_lrp.process_guid);
        self.send(self.client.post(url).json(desired_lrp)).await?;
        Ok(())
    }

    async fn update_desired_lrp(
        &self,
        process_guid: &str,
        update: &DesiredLrpUpdateRequest,
    ) -> Result<(), SchedulerError> {
        let url = self.url(&["desired_lrps", process_guid]);
        debug!("PUT {}", url);
        self.send(self.client.put(url).json(update)).await?;
        Ok(())
    }

    async fn delete_desired_lrp(&self, process_guid: &str) -> Result<(), SchedulerError> {
        let url = self.url(&["desired_lrps", process_guid]);
        debug!("DELETE {}", url);
        self.send(self.client.delete(url)).await?;
        Ok(())
    }

    async fn actual_lrps(&self) -> Result<Vec<ActualLrp>, SchedulerError> {
        self.get(&["actual_lrps"]).await
    }

    async fn actual_lrps_by_process_guid(
        &self,
        process_guid: &str,
    ) -> Result<Vec<ActualLrp>, SchedulerError> {
        self.get(&["actual_lrps", process_guid]).await
    }
}
