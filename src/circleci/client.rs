use async_trait::async_trait;
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use serde::Deserialize;

use crate::circleci::types::{Build, BuildOutputLine, Job, Page, Pipeline, WorkflowRef};
use crate::circleci::{LegacyBuildApi, PipelineApi};
use crate::config::CircleCiConfig;
use crate::error::{AppError, Result};

const TOKEN_PARAM: &str = "circle-token";
const PAGE_TOKEN_PARAM: &str = "page-token";
const MAX_PAGES: usize = 50;

/// Client for both CircleCI API generations.
pub struct CircleCiClient {
    client: Client,
    token: String,
    api_base_url: String,
    legacy_api_base_url: String,
    vcs_slug: String,
}

#[derive(Debug, Deserialize)]
struct ApiMessage {
    #[serde(default)]
    message: Option<String>,
}

impl CircleCiClient {
    pub fn new(config: &CircleCiConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.request_timeout())
            .build()?;

        Ok(Self {
            client,
            token: config.token.clone(),
            api_base_url: config.api_base_url.trim_end_matches('/').to_string(),
            legacy_api_base_url: config.legacy_api_base_url.trim_end_matches('/').to_string(),
            vcs_slug: config.vcs_slug.clone(),
        })
    }

    fn project_slug(&self, owner: &str, repo: &str) -> String {
        format!(
            "{}/{}/{}",
            self.vcs_slug,
            urlencoding::encode(owner),
            urlencoding::encode(repo)
        )
    }

    async fn get_json<T: DeserializeOwned>(&self, url: &str, query: &[(&str, &str)]) -> Result<T> {
        tracing::debug!(url = %url, "CircleCI request");

        let response = self
            .client
            .get(url)
            .query(&[(TOKEN_PARAM, self.token.as_str())])
            .query(query)
            .header("accept", "application/json")
            .send()
            .await?;

        let response = check_status(response).await?;
        Ok(response.json::<T>().await?)
    }

    /// Follow `next_page_token` until the listing is exhausted.
    async fn get_all_pages<T: DeserializeOwned>(&self, url: &str) -> Result<Vec<T>> {
        let mut items = Vec::new();
        let mut page_token: Option<String> = None;

        for _ in 0..MAX_PAGES {
            let page: Page<T> = match page_token.as_deref() {
                Some(token) => self.get_json(url, &[(PAGE_TOKEN_PARAM, token)]).await?,
                None => self.get_json(url, &[]).await?,
            };
            items.extend(page.items);

            match page.next_page_token.filter(|t| !t.is_empty()) {
                Some(next) => page_token = Some(next),
                None => return Ok(items),
            }
        }

        tracing::warn!(url = %url, pages = MAX_PAGES, "Stopped following CircleCI pagination");
        Ok(items)
    }
}

/// Map a non-2xx response to `CircleCiApi`, reading the optional `message` field.
async fn check_status(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    let message = if body.trim().is_empty() {
        status.canonical_reason().unwrap_or("no response body").to_string()
    } else {
        match serde_json::from_str::<ApiMessage>(&body) {
            Ok(ApiMessage { message: Some(m) }) => m,
            Ok(ApiMessage { message: None }) => body,
            Err(e) => format!("unable to parse API response: {e}"),
        }
    };

    Err(AppError::CircleCiApi {
        status: status.as_u16(),
        message,
    })
}

#[async_trait]
impl PipelineApi for CircleCiClient {
    async fn list_project_pipelines(&self, owner: &str, repo: &str) -> Result<Vec<Pipeline>> {
        let url = format!(
            "{}/project/{}/pipeline",
            self.api_base_url,
            self.project_slug(owner, repo)
        );
        let page: Page<Pipeline> = self.get_json(&url, &[]).await?;
        Ok(page.items)
    }

    async fn get_pipeline(&self, pipeline_id: &str) -> Result<Pipeline> {
        let id = urlencoding::encode(pipeline_id);
        let url = format!("{}/pipeline/{id}", self.api_base_url);
        let mut pipeline: Pipeline = self.get_json(&url, &[]).await?;

        if pipeline.workflows.is_empty() {
            let url = format!("{}/pipeline/{id}/workflow", self.api_base_url);
            pipeline.workflows = self.get_all_pages::<WorkflowRef>(&url).await?;
        }

        Ok(pipeline)
    }

    async fn get_workflow_jobs(&self, workflow_id: &str) -> Result<Vec<Job>> {
        let url = format!(
            "{}/workflow/{}/job",
            self.api_base_url,
            urlencoding::encode(workflow_id)
        );
        self.get_all_pages(&url).await
    }
}

#[async_trait]
impl LegacyBuildApi for CircleCiClient {
    async fn get_build(&self, owner: &str, repo: &str, build_num: u64) -> Result<Build> {
        let url = format!(
            "{}/project/{}/{build_num}",
            self.legacy_api_base_url,
            self.project_slug(owner, repo)
        );
        self.get_json(&url, &[]).await
    }

    async fn get_action_output(&self, output_url: &str) -> Result<Vec<BuildOutputLine>> {
        let response = self.client.get(output_url).send().await?;
        let response = check_status(response).await?;
        Ok(response.json::<Vec<BuildOutputLine>>().await?)
    }
}
