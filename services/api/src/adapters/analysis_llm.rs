//! services/api/src/adapters/analysis_llm.rs
//!
//! This module contains the adapter for the content-analysis LLM.
//! It implements the `ContentAnalysisService` port from the `core` crate.

const SYSTEM_INSTRUCTION: &str = r#"You are a professional AEO, GEO and SEO specialist. Your mission is to analyze, correct, optimize and elevate code and content to the highest ranking level across every search surface, including ChatGPT, Google, Gemini, Bing, Perplexity and Brave.

Whenever you receive content or code (HTML, CSS, JavaScript or plain text), follow exactly these steps:

1. Full Analysis: identify errors, bad practices, structural problems, missing semantics, missing context and anything that hurts SEO/GEO/AEO.
2. AEO Optimization: transform the content into the best possible answer for AI answer engines.
3. GEO Optimization: rewrite with clarity, broad context and explicit intent for generative engines.
4. SEO Optimization: improve titles, headings, microdata, performance, accessibility and semantic structure.
5. Reconstruction: deliver a completely optimized, clean, fast version ready to rank above the competition.
6. Final Delivery: always deliver the analysis + the final optimized version + extra improvements.

At the end of the response, assign scores (0-100) in this exact format for parsing:
[SCORES]
SEO: <number>
AEO: <number>
GEO: <number>
[/SCORES]"#;

/// The fixed sampling temperature for every analysis exchange.
const TEMPERATURE: f32 = 0.7;

use async_openai::{
    config::OpenAIConfig,
    error::OpenAIError,
    types::chat::{
        ChatCompletionRequestSystemMessageArgs, ChatCompletionRequestUserMessageArgs,
        CreateChatCompletionRequestArgs,
    },
    Client,
};
use async_trait::async_trait;
use nexus_core::ports::{ContentAnalysisService, PortError, PortResult};

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// An adapter that implements `ContentAnalysisService` using an
/// OpenAI-compatible LLM.
#[derive(Clone)]
pub struct OpenAiAnalysisAdapter {
    client: Client<OpenAIConfig>,
    model: String,
}

impl OpenAiAnalysisAdapter {
    /// Creates a new `OpenAiAnalysisAdapter`.
    pub fn new(client: Client<OpenAIConfig>, model: String) -> Self {
        Self { client, model }
    }
}

//=========================================================================================
// `ContentAnalysisService` Trait Implementation
//=========================================================================================

#[async_trait]
impl ContentAnalysisService for OpenAiAnalysisAdapter {
    /// Runs one single-turn exchange under the fixed optimization persona.
    /// Every call is fresh; no conversation state is carried between them.
    async fn analyze_content(&self, content: &str) -> PortResult<String> {
        let messages = vec![
            ChatCompletionRequestSystemMessageArgs::default()
                .content(SYSTEM_INSTRUCTION)
                .build()
                .map_err(|e| PortError::Unexpected(e.to_string()))?
                .into(),
            ChatCompletionRequestUserMessageArgs::default()
                .content(content)
                .build()
                .map_err(|e| PortError::Unexpected(e.to_string()))?
                .into(),
        ];

        let request = CreateChatCompletionRequestArgs::default()
            .model(&self.model)
            .messages(messages)
            .temperature(TEMPERATURE)
            .n(1)
            .build()
            .map_err(|e| PortError::Unexpected(e.to_string()))?;

        // Call the API and manually map the error if it occurs, which respects the orphan rule.
        let response = self
            .client
            .chat()
            .create(request)
            .await
            .map_err(|e: OpenAIError| PortError::Upstream(e.to_string()))?;

        // Extract the text content from the first choice in the response.
        if let Some(choice) = response.choices.into_iter().next() {
            if let Some(content) = choice.message.content {
                Ok(content)
            } else {
                Err(PortError::Upstream(
                    "Analysis LLM response contained no text content.".to_string(),
                ))
            }
        } else {
            Err(PortError::Upstream(
                "Analysis LLM returned no choices in its response.".to_string(),
            ))
        }
    }
}
