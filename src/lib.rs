pub mod agents;
pub mod clock;
pub mod config;
pub mod context;
pub mod decorator;
pub mod error;
pub mod events;
pub mod finance;
pub mod inference;
pub mod session;
pub mod store;
pub mod tools;
pub mod types;

use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

pub use agents::{system_prompt, Services};
pub use clock::{Clock, FixedClock, SystemClock};
pub use config::AssistantConfig;
pub use context::{ContextManager, ConversationContext};
pub use decorator::{BudgetAlertDecorator, Decoration, DecoratorError, ToolDecorator};
pub use error::{AgentError, ConfigError, FinanceError, InferenceError, LedgerError};
pub use events::AgentEvent;
pub use finance::{FinanceService, Money, Period};
pub use inference::{InferenceProvider, OpenAiProvider};
pub use session::{NoSessionManager, SessionManager, SessionState, SqliteSessionManager};
pub use store::Ledger;
pub use tools::{ToolGroup, ToolHandler, ToolPipeline, ToolRegistry};
pub use types::{ContentBlock, InferenceRequest, InferenceResponse, StopReason, Usage};

/// Agent configuration.
pub struct AgentConfig {
    pub model: String,
    pub max_tokens: u32,
    pub max_turns: usize,
    pub session_id: Option<String>,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            model: config::DEFAULT_MODEL.into(),
            max_tokens: 1024,
            max_turns: 10,
            session_id: None,
        }
    }
}

/// Result of an agent invocation.
#[derive(Debug)]
pub struct AgentResult {
    pub text: String,
    pub turns: usize,
    pub usage: Usage,
}

/// The orchestrator: sends the conversation to the model, runs the tools it
/// asks for and loops until a final answer.
pub struct Agent {
    provider: Box<dyn InferenceProvider>,
    context: Box<dyn ContextManager>,
    session: Box<dyn SessionManager>,
    tools: ToolPipeline,
    config: AgentConfig,
    /// When the current session was first saved.
    session_created: Option<chrono::DateTime<chrono::Utc>>,
}

impl Agent {
    pub fn new(
        provider: impl InferenceProvider + 'static,
        context: impl ContextManager + 'static,
        tools: ToolPipeline,
        config: AgentConfig,
    ) -> Self {
        Self {
            provider: Box::new(provider),
            context: Box::new(context),
            session: Box::new(NoSessionManager),
            tools,
            config,
            session_created: None,
        }
    }

    pub fn with_session(mut self, session: impl SessionManager + 'static) -> Self {
        self.session = Box::new(session);
        self
    }

    pub fn tools(&self) -> &ToolPipeline {
        &self.tools
    }

    /// Simple invocation. Runs until the model stops or max turns is reached.
    pub async fn invoke(&mut self, prompt: &str) -> Result<AgentResult, AgentError> {
        self.context.add_prompt(prompt);
        self.run_loop(0, None, None).await
    }

    /// Invocation with cancellation support.
    pub async fn invoke_with_cancel(
        &mut self,
        prompt: &str,
        cancel: CancellationToken,
    ) -> Result<AgentResult, AgentError> {
        self.context.add_prompt(prompt);
        self.run_loop(0, Some(cancel), None).await
    }

    /// Invocation with streaming events.
    pub async fn invoke_streaming(
        &mut self,
        prompt: &str,
        tx: tokio::sync::mpsc::Sender<AgentEvent>,
    ) -> Result<AgentResult, AgentError> {
        self.context.add_prompt(prompt);
        self.run_loop(0, None, Some(tx)).await
    }

    /// Load a saved conversation into the context without running anything.
    /// Returns false when the session does not exist yet.
    pub async fn restore_session(&mut self, session_id: &str) -> Result<bool, AgentError> {
        self.config.session_id = Some(session_id.to_string());
        match self.session.load(session_id).await? {
            Some(state) => {
                self.context.restore(&state.context_snapshot)?;
                self.session_created = Some(state.created_at);
                info!(session = session_id, turn = state.turn, "session restored");
                Ok(true)
            }
            None => {
                self.session_created = None;
                Ok(false)
            }
        }
    }

    /// Continue a run that stopped before a final answer (max turns, crash)
    /// with a fresh budget of `max_turns`. `None` when there is no such
    /// session or it already finished; in the latter case the conversation
    /// is still restored.
    pub async fn resume(&mut self, session_id: &str) -> Result<Option<AgentResult>, AgentError> {
        let Some(state) = self.session.load(session_id).await? else {
            return Ok(None);
        };
        self.context.restore(&state.context_snapshot)?;
        self.config.session_id = Some(session_id.to_string());
        self.session_created = Some(state.created_at);
        if state.finished {
            return Ok(None);
        }
        let result = self.run_loop(state.turn + 1, None, None).await?;
        Ok(Some(result))
    }

    async fn checkpoint(&mut self, turn: usize, finished: bool) -> Result<(), AgentError> {
        let Some(ref sid) = self.config.session_id else {
            return Ok(());
        };
        let now = chrono::Utc::now();
        let state = SessionState {
            turn,
            finished,
            context_snapshot: self.context.snapshot(),
            created_at: *self.session_created.get_or_insert(now),
            updated_at: now,
        };
        self.session.checkpoint(sid, &state).await
    }

    /// Runs up to `max_turns` turns. `turn_offset` only shifts the turn
    /// numbers reported in events and checkpoints.
    async fn run_loop(
        &mut self,
        turn_offset: usize,
        cancel: Option<CancellationToken>,
        tx: Option<tokio::sync::mpsc::Sender<AgentEvent>>,
    ) -> Result<AgentResult, AgentError> {
        let mut total_usage = Usage::default();
        let mut final_text = String::new();

        for step in 0..self.config.max_turns {
            let turn = turn_offset + step;
            if let Some(ref cancel) = cancel {
                if cancel.is_cancelled() {
                    info!(turn, "agent cancelled");
                    return Err(AgentError::Cancelled);
                }
            }

            if let Some(ref tx) = tx {
                let _ = tx.send(AgentEvent::TurnStart { turn }).await;
            }

            info!(turn, "agent turn");

            let request = self.context.build_request();
            let response = if let Some(ref cancel) = cancel {
                tokio::select! {
                    result = self.provider.infer(request) => result?,
                    _ = cancel.cancelled() => {
                        info!(turn, "agent cancelled during inference");
                        return Err(AgentError::Cancelled);
                    }
                }
            } else {
                self.provider.infer(request).await?
            };

            total_usage.accumulate(&response.usage);
            self.context.record_response(&response);

            for block in &response.content {
                if let ContentBlock::Text(text) = block {
                    final_text = text.clone();
                    if let Some(ref tx) = tx {
                        let _ = tx
                            .send(AgentEvent::Text {
                                content: text.clone(),
                            })
                            .await;
                    }
                }
            }

            match response.stop_reason {
                StopReason::EndTurn => {
                    self.checkpoint(turn, true).await?;
                    if let Some(ref tx) = tx {
                        let _ = tx.send(AgentEvent::Finished { turns: step + 1 }).await;
                    }
                    info!(turns = step + 1, "agent finished");
                    return Ok(AgentResult {
                        text: final_text,
                        turns: step + 1,
                        usage: total_usage,
                    });
                }
                StopReason::ToolUse => {
                    for block in &response.content {
                        if let ContentBlock::ToolUse { id, name, input } = block {
                            if let Some(ref tx) = tx {
                                let _ = tx
                                    .send(AgentEvent::ToolCall {
                                        name: name.clone(),
                                        input: input.clone(),
                                    })
                                    .await;
                            }

                            let result = self.tools.execute(name, input).await;
                            let (output, is_err) = match &result {
                                Ok(s) => (s.as_str(), false),
                                Err(s) => (s.as_str(), true),
                            };

                            if let Some(ref tx) = tx {
                                let _ = tx
                                    .send(AgentEvent::ToolResult {
                                        name: name.clone(),
                                        output: output.to_string(),
                                        is_error: is_err,
                                    })
                                    .await;
                            }

                            self.context.record_tool_result(id, name, output, is_err);
                        }
                    }
                }
                StopReason::MaxTokens => {
                    info!(turn, "response truncated, continuing");
                }
            }

            self.checkpoint(turn, false).await?;
        }

        warn!(
            max_turns = self.config.max_turns,
            "agent hit max turns limit"
        );
        if let Some(ref tx) = tx {
            let _ = tx
                .send(AgentEvent::Finished {
                    turns: self.config.max_turns,
                })
                .await;
        }
        Ok(AgentResult {
            text: final_text,
            turns: self.config.max_turns,
            usage: total_usage,
        })
    }
}
