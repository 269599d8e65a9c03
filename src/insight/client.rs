//! LLM-backed reasoning provider

use super::{InsightError, InsightResult, ReasoningOutput, ReasoningProvider};
use crate::config::{LLMProvider, ReasoningConfig};
use crate::packaging::AnonymizedPayload;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

const DEFAULT_SYSTEM_PROMPT: &str = "You review talent calibration statistics for rating bias. \
Reply with a single JSON object: {\"summary\": string, \"issues\": [{\"title\": string, \
\"description\": string, \"priority\": \"low\"|\"medium\"|\"high\", \"affected_count\": number}]}.";

pub struct LlmReasoningClient {
    client: Client,
    config: ReasoningConfig,
    api_base_url: String,
}

impl LlmReasoningClient {
    pub fn new(config: &ReasoningConfig) -> InsightResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs.max(1)))
            .build()
            .map_err(|e| InsightError::Config(e.to_string()))?;

        let api_base_url = config.api_base_url.clone().unwrap_or_else(|| match config.provider {
            LLMProvider::OpenAI => "https://api.openai.com/v1".to_string(),
            LLMProvider::Ollama => "http://localhost:11434".to_string(),
            LLMProvider::Anthropic => "https://api.anthropic.com/v1".to_string(),
        });

        Ok(Self {
            client,
            config: config.clone(),
            api_base_url: api_base_url.trim_end_matches('/').to_string(),
        })
    }

    fn system_prompt(&self) -> String {
        self.config
            .system_prompt
            .clone()
            .unwrap_or_else(|| DEFAULT_SYSTEM_PROMPT.to_string())
    }

    fn api_key(&self) -> InsightResult<&str> {
        self.config
            .api_key
            .as_deref()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| InsightError::Config(format!("{:?} requires an API key", self.config.provider)))
    }

    async fn complete(&self, prompt: &str) -> InsightResult<String> {
        match self.config.provider {
            LLMProvider::OpenAI => self.openai_chat(prompt).await,
            LLMProvider::Ollama => self.ollama_chat(prompt).await,
            LLMProvider::Anthropic => self.anthropic_chat(prompt).await,
        }
    }

    async fn openai_chat(&self, prompt: &str) -> InsightResult<String> {
        #[derive(Serialize)]
        struct Message {
            role: String,
            content: String,
        }

        #[derive(Serialize)]
        struct Request<'a> {
            model: &'a str,
            messages: Vec<Message>,
            temperature: f32,
        }

        #[derive(Deserialize)]
        struct Response {
            choices: Vec<Choice>,
        }

        #[derive(Deserialize)]
        struct Choice {
            message: MessageContent,
        }

        #[derive(Deserialize)]
        struct MessageContent {
            content: String,
        }

        let api_key = self.api_key()?;
        let url = format!("{}/chat/completions", self.api_base_url);
        let resp = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", api_key))
            .json(&Request {
                model: &self.config.model,
                messages: vec![
                    Message {
                        role: "system".to_string(),
                        content: self.system_prompt(),
                    },
                    Message {
                        role: "user".to_string(),
                        content: prompt.to_string(),
                    },
                ],
                temperature: 0.0,
            })
            .send()
            .await
            .map_err(|e| InsightError::Network(e.to_string()))?;

        if !resp.status().is_success() {
            return Err(InsightError::Api(format!("OpenAI error: {}", resp.status())));
        }

        let result: Response = resp
            .json()
            .await
            .map_err(|e| InsightError::Serialization(e.to_string()))?;
        Ok(result
            .choices
            .first()
            .map(|c| c.message.content.clone())
            .unwrap_or_default())
    }

    async fn ollama_chat(&self, prompt: &str) -> InsightResult<String> {
        #[derive(Serialize)]
        struct Request<'a> {
            model: &'a str,
            prompt: String,
            system: String,
            stream: bool,
            format: &'static str,
        }

        #[derive(Deserialize)]
        struct Response {
            response: String,
        }

        let url = format!("{}/api/generate", self.api_base_url);
        let resp = self
            .client
            .post(&url)
            .json(&Request {
                model: &self.config.model,
                prompt: prompt.to_string(),
                system: self.system_prompt(),
                stream: false,
                format: "json",
            })
            .send()
            .await
            .map_err(|e| InsightError::Network(e.to_string()))?;

        if !resp.status().is_success() {
            return Err(InsightError::Api(format!("Ollama error: {}", resp.status())));
        }

        let result: Response = resp
            .json()
            .await
            .map_err(|e| InsightError::Serialization(e.to_string()))?;
        Ok(result.response)
    }

    async fn anthropic_chat(&self, prompt: &str) -> InsightResult<String> {
        #[derive(Serialize)]
        struct Message {
            role: &'static str,
            content: String,
        }

        #[derive(Serialize)]
        struct Request<'a> {
            model: &'a str,
            max_tokens: u32,
            system: String,
            messages: Vec<Message>,
        }

        #[derive(Deserialize)]
        struct Response {
            content: Vec<ContentBlock>,
        }

        #[derive(Deserialize)]
        struct ContentBlock {
            #[serde(default)]
            text: String,
        }

        let api_key = self.api_key()?;
        let url = format!("{}/messages", self.api_base_url);
        let resp = self
            .client
            .post(&url)
            .header("x-api-key", api_key)
            .header("anthropic-version", "2023-06-01")
            .json(&Request {
                model: &self.config.model,
                max_tokens: 2048,
                system: self.system_prompt(),
                messages: vec![Message {
                    role: "user",
                    content: prompt.to_string(),
                }],
            })
            .send()
            .await
            .map_err(|e| InsightError::Network(e.to_string()))?;

        if !resp.status().is_success() {
            let text = resp.text().await.unwrap_or_default();
            return Err(InsightError::Api(format!("Anthropic error: {}", text)));
        }

        let result: Response = resp
            .json()
            .await
            .map_err(|e| InsightError::Serialization(e.to_string()))?;
        Ok(result.content.into_iter().map(|b| b.text).collect::<Vec<_>>().join(""))
    }
}

#[async_trait]
impl ReasoningProvider for LlmReasoningClient {
    fn name(&self) -> &str {
        match self.config.provider {
            LLMProvider::OpenAI => "openai",
            LLMProvider::Ollama => "ollama",
            LLMProvider::Anthropic => "anthropic",
        }
    }

    /// Hosted providers only need a key. Ollama is checked over the network.
    async fn is_available(&self) -> bool {
        if !self.config.enabled {
            return false;
        }
        match self.config.provider {
            LLMProvider::OpenAI | LLMProvider::Anthropic => self.api_key().is_ok(),
            LLMProvider::Ollama => {
                let url = format!("{}/api/tags", self.api_base_url);
                match self.client.get(&url).send().await {
                    Ok(resp) => resp.status().is_success(),
                    Err(e) => {
                        debug!(error = %e, "Ollama availability check failed");
                        false
                    }
                }
            }
        }
    }

    async fn analyze(&self, payload: &AnonymizedPayload) -> InsightResult<ReasoningOutput> {
        let body = serde_json::to_string_pretty(payload)
            .map_err(|e| InsightError::Serialization(e.to_string()))?;
        let prompt = format!("Calibration data:\n{}", body);
        let reply = self.complete(&prompt).await?;
        Ok(parse_reply(&reply))
    }
}

/// Parse the JSON object in a reply. Models often wrap it in prose or code
/// fences; anything unparseable becomes a summary with no issues.
pub fn parse_reply(reply: &str) -> ReasoningOutput {
    let object = match (reply.find('{'), reply.rfind('}')) {
        (Some(start), Some(end)) if start < end => &reply[start..=end],
        _ => "",
    };
    serde_json::from_str(object).unwrap_or_else(|_| ReasoningOutput {
        summary: reply.trim().to_string(),
        issues: Vec::new(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::insight::InsightPriority;

    #[test]
    fn test_parse_fenced_reply() {
        let reply = "Here you go:\n```json\n{\"summary\": \"Tenure skew\", \"issues\": [{\"title\": \"New hires rated low\", \"priority\": \"high\"}]}\n```";
        let output = parse_reply(reply);
        assert_eq!(output.summary, "Tenure skew");
        assert_eq!(output.issues.len(), 1);
        assert_eq!(output.issues[0].priority, Some(InsightPriority::High));
    }

    #[test]
    fn test_parse_plain_text_reply() {
        let output = parse_reply("  No notable patterns.  ");
        assert_eq!(output.summary, "No notable patterns.");
        assert!(output.issues.is_empty());
    }

    #[tokio::test]
    async fn test_disabled_client_is_unavailable() {
        let config = ReasoningConfig::default();
        let client = LlmReasoningClient::new(&config).unwrap();
        assert_eq!(client.name(), "ollama");
        assert!(!client.is_available().await);
    }

    #[tokio::test]
    async fn test_hosted_provider_needs_key() {
        let config = ReasoningConfig {
            enabled: true,
            provider: LLMProvider::OpenAI,
            model: "gpt-4o".to_string(),
            ..ReasoningConfig::default()
        };
        let client = LlmReasoningClient::new(&config).unwrap();
        assert!(!client.is_available().await);

        let keyed = LlmReasoningClient::new(&ReasoningConfig {
            api_key: Some("sk-test".to_string()),
            ..config
        })
        .unwrap();
        assert!(keyed.is_available().await);
    }
}
