//! OpenAI-compatible chat completion client

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::types::Role;

const PUBLIC_COMPLETIONS_URL: &str = "https://api.openai.com/v1/chat/completions";
const DEFAULT_AZURE_API_VERSION: &str = "2024-02-01";

/// One message in a completion prompt
#[derive(Debug, Clone, Serialize)]
pub struct PromptMessage {
    pub role: Role,
    pub content: String,
}

/// Chat completion backend invoked by the assistant service
#[async_trait]
pub trait ChatClient: Send + Sync {
    /// Run a chat completion over the prompt and return the reply text
    async fn complete(&self, deployment: &str, messages: &[PromptMessage]) -> Result<String>;
}

enum Endpoint {
    Azure {
        endpoint: String,
        key: String,
        api_version: String,
    },
    Public {
        key: String,
        organization: Option<String>,
    },
}

/// Client for Azure OpenAI deployments or the public OpenAI API
pub struct OpenAiClient {
    http: reqwest::Client,
    endpoint: Endpoint,
}

impl OpenAiClient {
    /// Build a client from environment variables.
    ///
    /// An Azure connection (AZURE_OPENAI_ENDPOINT + AZURE_OPENAI_KEY) is
    /// preferred; otherwise OPENAI_API_KEY selects the public API, with
    /// OPENAI_ORGANIZATION_ID attached when set. OPENAI_API_VERSION overrides
    /// the Azure API version.
    pub fn from_env() -> Result<Self> {
        let endpoint = if let Ok(azure_endpoint) = std::env::var("AZURE_OPENAI_ENDPOINT") {
            let key = std::env::var("AZURE_OPENAI_KEY").map_err(|_| {
                Error::Config(
                    "AZURE_OPENAI_ENDPOINT is set but AZURE_OPENAI_KEY is missing".into(),
                )
            })?;
            Endpoint::Azure {
                endpoint: azure_endpoint,
                key,
                api_version: std::env::var("OPENAI_API_VERSION")
                    .unwrap_or_else(|_| DEFAULT_AZURE_API_VERSION.to_string()),
            }
        } else if let Ok(key) = std::env::var("OPENAI_API_KEY") {
            Endpoint::Public {
                key,
                organization: std::env::var("OPENAI_ORGANIZATION_ID").ok(),
            }
        } else {
            return Err(Error::Config(
                "Must set OPENAI_API_KEY or AZURE_OPENAI_ENDPOINT and AZURE_OPENAI_KEY".into(),
            ));
        };

        Ok(Self {
            http: reqwest::Client::new(),
            endpoint,
        })
    }
}

#[derive(Debug, Serialize)]
struct CompletionRequest<'a> {
    /// Only sent to the public API; Azure selects the model by deployment path
    #[serde(skip_serializing_if = "Option::is_none")]
    model: Option<&'a str>,
    messages: &'a [PromptMessage],
}

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    choices: Vec<CompletionChoice>,
}

#[derive(Debug, Deserialize)]
struct CompletionChoice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

#[async_trait]
impl ChatClient for OpenAiClient {
    async fn complete(&self, deployment: &str, messages: &[PromptMessage]) -> Result<String> {
        let (request, body) = match &self.endpoint {
            Endpoint::Azure {
                endpoint,
                key,
                api_version,
            } => {
                let url = format!(
                    "{}/openai/deployments/{}/chat/completions?api-version={}",
                    endpoint.trim_end_matches('/'),
                    deployment,
                    api_version
                );
                (
                    self.http.post(url).header("api-key", key),
                    CompletionRequest {
                        model: None,
                        messages,
                    },
                )
            }
            Endpoint::Public { key, organization } => {
                let mut request = self.http.post(PUBLIC_COMPLETIONS_URL).bearer_auth(key);
                if let Some(org) = organization {
                    request = request.header("OpenAI-Organization", org);
                }
                (
                    request,
                    CompletionRequest {
                        model: Some(deployment),
                        messages,
                    },
                )
            }
        };

        let response = request.json(&body).send().await?;

        if !response.status().is_success() {
            let status = response.status();
            let detail = response.text().await.unwrap_or_default();
            return Err(Error::Model(format!(
                "Completion request failed with {}: {}",
                status, detail
            )));
        }

        let completion: CompletionResponse = response.json().await?;

        completion
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| Error::Model("Completion response contained no choices".into()))
    }
}
