//! The `pesquisa` agent: answers general questions with a nested,
//! tool-less inference call.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::debug;

use crate::inference::InferenceProvider;
use crate::tools::args::required_str;
use crate::tools::{ToolGroup, ToolHandler};
use crate::types::InferenceRequest;

pub const GROUP: &str = "pesquisa";

const RESEARCH_PROMPT: &str =
    "Você é um assistente de pesquisa. Responda em português, de forma objetiva e concisa.";

pub struct AnswerQuestionTool {
    provider: Arc<dyn InferenceProvider>,
    model: String,
    max_tokens: u32,
}

impl AnswerQuestionTool {
    pub fn new(provider: Arc<dyn InferenceProvider>, model: impl Into<String>, max_tokens: u32) -> Self {
        Self {
            provider,
            model: model.into(),
            max_tokens,
        }
    }
}

#[async_trait]
impl ToolHandler for AnswerQuestionTool {
    async fn call(&self, input: &Value) -> Result<String, String> {
        let question = required_str(input, "question")?.trim();
        let request = InferenceRequest::single_prompt(
            self.model.clone(),
            self.max_tokens,
            Some(RESEARCH_PROMPT.into()),
            question,
        );
        debug!(model = %self.model, "research request");

        let response = self
            .provider
            .infer(request)
            .await
            .map_err(|e| format!("Falha ao consultar o modelo: {e}"))?;
        let answer = response.text();
        if answer.trim().is_empty() {
            return Err("O modelo não retornou uma resposta.".into());
        }
        Ok(answer)
    }
}

pub fn group(provider: Arc<dyn InferenceProvider>, model: &str, max_tokens: u32) -> ToolGroup {
    ToolGroup::new(GROUP, "Pesquisa: responde perguntas gerais.").add(
        "answer_question",
        json!({
            "name": "answer_question",
            "description": "Answer a general-knowledge question that none of the other tools cover.",
            "input_schema": {
                "type": "object",
                "properties": {
                    "question": {"type": "string", "description": "The question, in full"}
                },
                "required": ["question"]
            }
        }),
        AnswerQuestionTool::new(provider, model, max_tokens),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::InferenceError;
    use crate::types::{ContentBlock, InferenceResponse, StopReason, Usage};
    use std::sync::Mutex;

    /// Replies with a fixed text and remembers the last request.
    struct Oracle {
        reply: Result<String, ()>,
        seen: Mutex<Option<InferenceRequest>>,
    }

    #[async_trait]
    impl InferenceProvider for Oracle {
        async fn infer(&self, request: InferenceRequest) -> Result<InferenceResponse, InferenceError> {
            *self.seen.lock().unwrap() = Some(request);
            match &self.reply {
                Ok(text) => Ok(InferenceResponse {
                    stop_reason: StopReason::EndTurn,
                    content: vec![ContentBlock::Text(text.clone())],
                    usage: Usage::default(),
                }),
                Err(()) => Err(InferenceError::ApiError {
                    status: 500,
                    body: "boom".into(),
                }),
            }
        }
    }

    fn oracle(reply: Result<&str, ()>) -> Arc<Oracle> {
        Arc::new(Oracle {
            reply: reply.map(String::from),
            seen: Mutex::new(None),
        })
    }

    #[tokio::test]
    async fn forwards_question_without_tools() {
        let provider = oracle(Ok("Brasília."));
        let tool = AnswerQuestionTool::new(provider.clone(), "gpt-4o-mini", 256);
        let out = tool
            .call(&json!({"question": "Qual é a capital do Brasil?"}))
            .await
            .unwrap();
        assert_eq!(out, "Brasília.");

        let seen = provider.seen.lock().unwrap().take().unwrap();
        assert_eq!(seen.model, "gpt-4o-mini");
        assert_eq!(seen.max_tokens, 256);
        assert!(seen.tools.is_empty());
        assert_eq!(seen.messages[0]["content"], "Qual é a capital do Brasil?");
    }

    #[tokio::test]
    async fn provider_failure_is_a_tool_error() {
        let tool = AnswerQuestionTool::new(oracle(Err(())), "m", 10);
        let err = tool.call(&json!({"question": "?"})).await.unwrap_err();
        assert!(err.starts_with("Falha ao consultar o modelo"));
    }

    #[tokio::test]
    async fn empty_answer_and_blank_question() {
        let tool = AnswerQuestionTool::new(oracle(Ok("  ")), "m", 10);
        assert_eq!(
            tool.call(&json!({"question": "oi"})).await.unwrap_err(),
            "O modelo não retornou uma resposta."
        );
        assert_eq!(
            tool.call(&json!({})).await.unwrap_err(),
            "O campo 'question' é obrigatório."
        );
    }
}
