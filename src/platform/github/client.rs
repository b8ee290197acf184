use async_trait::async_trait;
use jsonwebtoken::EncodingKey;
use octocrab::Octocrab;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;

use crate::config::GitHubConfig;
use crate::error::{AppError, Result};
use crate::platform::types::RepoRef;
use crate::platform::Platform;

use super::auth::{generate_app_jwt, load_private_key};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

pub struct GitHubPlatform {
    app_id: u64,
    api_base_url: Option<String>,
    private_key: EncodingKey,
    /// Cache of installation tokens: installation_id -> (token, expiry)
    token_cache: Arc<RwLock<HashMap<u64, (String, chrono::DateTime<chrono::Utc>)>>>,
}

impl GitHubPlatform {
    pub async fn new(config: &GitHubConfig) -> Result<Self> {
        // Validate the private key exists
        if !config.private_key_path.exists() {
            return Err(AppError::Config(format!(
                "GitHub App private key not found at: {}",
                config.private_key_path.display()
            )));
        }

        let private_key = load_private_key(&config.private_key_path)?;

        Ok(Self {
            app_id: config.app_id,
            api_base_url: config.api_base_url.clone(),
            private_key,
            token_cache: Arc::new(RwLock::new(HashMap::new())),
        })
    }

    fn client_with_token(&self, token: String) -> Result<Octocrab> {
        let mut builder = Octocrab::builder()
            .personal_token(token)
            .set_connect_timeout(Some(REQUEST_TIMEOUT))
            .set_read_timeout(Some(REQUEST_TIMEOUT));

        if let Some(base) = &self.api_base_url {
            builder = builder
                .base_uri(base.as_str())
                .map_err(|e| AppError::Config(format!("Invalid GitHub API base URL {base}: {e}")))?;
        }

        builder
            .build()
            .map_err(|e| AppError::GitHubApi(format!("Failed to build octocrab client: {e}")))
    }

    /// Installation token, cached until five minutes before expiry.
    async fn get_access_token(&self, installation_id: u64) -> Result<String> {
        // Check cache
        {
            let cache = self.token_cache.read().await;
            if let Some((token, expiry)) = cache.get(&installation_id) {
                if *expiry > chrono::Utc::now() + chrono::Duration::minutes(5) {
                    return Ok(token.clone());
                }
            }
        }

        // Generate new token
        let jwt = generate_app_jwt(self.app_id, &self.private_key)?;
        let client = self.client_with_token(jwt)?;

        let url = format!("/app/installations/{installation_id}/access_tokens");
        let response: serde_json::Value = client
            .post(&url, None::<&()>)
            .await
            .map_err(|e| AppError::GitHubApi(format!("Failed to create installation token: {e}")))?;

        let token = response["token"]
            .as_str()
            .ok_or_else(|| AppError::GitHubApi("No token in response".to_string()))?
            .to_string();

        let expires_at = response["expires_at"]
            .as_str()
            .and_then(|s| chrono::DateTime::parse_from_rfc3339(s).ok())
            .map(|dt| dt.with_timezone(&chrono::Utc))
            .unwrap_or_else(|| chrono::Utc::now() + chrono::Duration::hours(1));

        // Cache the token
        let mut cache = self.token_cache.write().await;
        cache.insert(installation_id, (token.clone(), expires_at));

        Ok(token)
    }

    /// Get an octocrab instance authenticated as an installation.
    async fn installation_client(&self, installation_id: u64) -> Result<Octocrab> {
        let token = self.get_access_token(installation_id).await?;
        self.client_with_token(token)
    }
}

#[async_trait]
impl Platform for GitHubPlatform {
    async fn file_exists(
        &self,
        installation_id: u64,
        repo: &RepoRef,
        path: &str,
        git_ref: &str,
    ) -> Result<bool> {
        let client = self.installation_client(installation_id).await?;

        let result = client
            .repos(&repo.owner, &repo.name)
            .get_content()
            .path(path)
            .r#ref(git_ref)
            .send()
            .await;

        match result {
            Ok(_) => Ok(true),
            Err(octocrab::Error::GitHub { source, .. }) if source.status_code.as_u16() == 404 => {
                Ok(false)
            }
            Err(e) => Err(AppError::GitHubApi(format!(
                "Failed to check {path} in {repo}@{git_ref}: {e}"
            ))),
        }
    }

    async fn post_comment(
        &self,
        installation_id: u64,
        repo: &RepoRef,
        issue_number: u64,
        body: &str,
    ) -> Result<()> {
        let client = self.installation_client(installation_id).await?;

        client
            .issues(&repo.owner, &repo.name)
            .create_comment(issue_number, body)
            .await?;

        Ok(())
    }
}
