//! [`TextGenerator`] backed by an Ollama server's chat endpoint.

use std::time::Duration;

use oxicoach_training::text::{ChatMessage, TextGenerationError, TextGenerator};
use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, clap::Args)]
pub struct OllamaArg {
    /// Base URL of an Ollama server; course notes are generated only when set
    #[arg(long = "ollama-url")]
    pub base_url: Option<String>,
    /// Model used for generation
    #[arg(long = "ollama-model", default_value = "qwen2.5:7b-instruct")]
    pub model: String,
    /// Request timeout in seconds
    #[arg(long = "ollama-timeout", default_value_t = 120)]
    pub timeout_secs: u64,
}

pub struct OllamaGenerator {
    client: Client,
    url: String,
    model: String,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    options: ChatOptions,
    stream: bool,
}

#[derive(Serialize)]
struct ChatOptions {
    temperature: f32,
}

#[derive(Deserialize)]
struct ChatResponse {
    message: ChatMessage,
}

impl OllamaGenerator {
    /// `None` when no server is configured.
    pub fn from_arg(arg: &OllamaArg) -> Result<Option<Self>, TextGenerationError> {
        let Some(base_url) = &arg.base_url else {
            return Ok(None);
        };
        let client = Client::builder()
            .timeout(Duration::from_secs(arg.timeout_secs))
            .build()
            .map_err(|e| TextGenerationError::Unavailable {
                reason: e.to_string(),
            })?;
        Ok(Some(Self {
            client,
            url: format!("{}/api/chat", base_url.trim_end_matches('/')),
            model: arg.model.clone(),
        }))
    }
}

impl TextGenerator for OllamaGenerator {
    fn generate(
        &mut self,
        messages: &[ChatMessage],
        temperature: f32,
    ) -> Result<String, TextGenerationError> {
        let unavailable = |e: reqwest::Error| TextGenerationError::Unavailable {
            reason: e.to_string(),
        };
        let request = ChatRequest {
            model: &self.model,
            messages,
            options: ChatOptions { temperature },
            stream: false,
        };
        let response: ChatResponse = self
            .client
            .post(&self.url)
            .json(&request)
            .send()
            .map_err(unavailable)?
            .error_for_status()
            .map_err(unavailable)?
            .json()
            .map_err(|e| TextGenerationError::InvalidReply {
                reply: e.to_string(),
            })?;
        Ok(response.message.content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_shape() {
        let messages = [ChatMessage::system("You are a coach."), ChatMessage::user("Explain IQP")];
        let request = ChatRequest {
            model: "m",
            messages: &messages,
            options: ChatOptions { temperature: 0.25 },
            stream: false,
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["messages"][0]["role"], "system");
        assert_eq!(json["messages"][1]["content"], "Explain IQP");
        assert_eq!(json["options"]["temperature"], 0.25);
        assert_eq!(json["stream"], false);
    }

    #[test]
    fn test_no_url_means_no_generator() {
        let arg = OllamaArg {
            base_url: None,
            model: "m".to_owned(),
            timeout_secs: 1,
        };
        assert!(OllamaGenerator::from_arg(&arg).unwrap().is_none());
    }

    #[test]
    fn test_reply_parsing() {
        let reply: ChatResponse = serde_json::from_str(
            r#"{"model":"m","message":{"role":"assistant","content":"Use the d-file."},"done":true}"#,
        )
        .unwrap();
        assert_eq!(reply.message.content, "Use the d-file.");
    }
}
