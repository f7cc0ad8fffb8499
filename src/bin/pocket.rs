//! Personal assistant CLI.
//!
//! Usage:
//!   OPENAI_API_KEY=sk-... pocket
//!   pocket "Gastei 32,90 no almoço"
//!   pocket --session casa
//!   pocket --base-url http://localhost:11434 --model llama3.2
//!
//! Settings come from the environment (or `.env`); flags override them.
//! Ctrl-D or type "sair" / "exit" to leave.

use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use pocket_agent::{
    system_prompt, Agent, AgentConfig, AgentEvent, AssistantConfig, Clock, ConversationContext,
    Ledger, OpenAiProvider, Services, SqliteSessionManager, SystemClock,
};

#[derive(Parser)]
#[command(name = "pocket", about = "Personal assistant: finances, calendar and work")]
struct Cli {
    /// Prompt to run once. Starts an interactive session when omitted.
    prompt: Option<String>,

    /// Model to use
    #[arg(long)]
    model: Option<String>,

    /// OpenAI-compatible API base URL
    #[arg(long)]
    base_url: Option<String>,

    /// SQLite database file
    #[arg(long)]
    db: Option<PathBuf>,

    /// Replace the built-in system prompt
    #[arg(long, short = 's')]
    system: Option<String>,

    /// Max agent turns per message
    #[arg(long)]
    max_turns: Option<usize>,

    /// Max output tokens per turn
    #[arg(long)]
    max_tokens: Option<u32>,

    /// Messages of history kept in the context
    #[arg(long)]
    history_limit: Option<usize>,

    /// Save the conversation under this name and restore it on the next run
    #[arg(long)]
    session: Option<String>,
}

impl Cli {
    fn apply(&self, config: &mut AssistantConfig) {
        if let Some(ref model) = self.model {
            config.model = model.clone();
        }
        if let Some(ref url) = self.base_url {
            config.base_url = url.clone();
        }
        if let Some(ref db) = self.db {
            config.db_path = db.clone();
        }
        if let Some(n) = self.max_turns {
            config.max_turns = n;
        }
        if let Some(n) = self.max_tokens {
            config.max_tokens = n;
        }
        if let Some(n) = self.history_limit {
            config.history_limit = n;
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warn".into()),
        )
        .with_target(false)
        .init();

    let cli = Cli::parse();
    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("\x1b[1;31merror:\x1b[0m {e:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let mut config = AssistantConfig::from_env().context("failed to read configuration")?;
    cli.apply(&mut config);
    config.validate().context("invalid configuration")?;

    let mut provider = OpenAiProvider::new(&config.base_url);
    if let Some(ref key) = config.api_key {
        provider = provider.with_api_key(key);
    }
    let provider = Arc::new(provider);

    let ledger = Arc::new(
        Ledger::open(&config.db_path)
            .with_context(|| format!("failed to open database {}", config.db_path.display()))?,
    );
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);

    let services = Services {
        ledger: ledger.clone(),
        clock: clock.clone(),
        provider: provider.clone(),
        model: config.model.clone(),
        max_tokens: config.max_tokens,
    };
    let tools = services.pipeline();

    let system = cli
        .system
        .clone()
        .unwrap_or_else(|| system_prompt(clock.now()));
    let context = ConversationContext::new(&config.model, config.max_tokens)
        .with_system(system)
        .with_tools(tools.schemas())
        .with_history_limit(config.history_limit);

    let agent_config = AgentConfig {
        model: config.model.clone(),
        max_tokens: config.max_tokens,
        max_turns: config.max_turns,
        session_id: None,
    };

    let mut agent = Agent::new(provider, context, tools, agent_config)
        .with_session(SqliteSessionManager::new(ledger));
    if let Some(ref id) = cli.session {
        if agent
            .restore_session(id)
            .await
            .with_context(|| format!("failed to restore session '{id}'"))?
        {
            eprintln!("sessão '{id}' restaurada");
        }
    }

    if let Some(ref prompt) = cli.prompt {
        return ask(&mut agent, prompt).await;
    }

    eprintln!("pocket-agent");
    eprintln!("model: {}", config.model);
    eprintln!("db: {}", config.db_path.display());
    eprintln!("---");

    let stdin = io::stdin();
    let mut lines = stdin.lock().lines();

    loop {
        eprint!("\x1b[1;36mvocê>\x1b[0m ");
        io::stderr().flush().ok();

        let line = match lines.next() {
            Some(Ok(line)) => line,
            _ => break,
        };

        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        if matches!(trimmed, "sair" | "exit" | "quit" | "/q") {
            break;
        }

        if let Err(e) = ask(&mut agent, trimmed).await {
            eprintln!("\x1b[1;31merror:\x1b[0m {e:#}");
        }
    }

    eprintln!("até logo.");
    Ok(())
}

/// Run one prompt, printing events as they arrive.
async fn ask(agent: &mut Agent, prompt: &str) -> anyhow::Result<()> {
    let (tx, mut rx) = tokio::sync::mpsc::channel::<AgentEvent>(64);

    let printer = tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            match event {
                AgentEvent::Text { content } => {
                    eprint!("\x1b[1;32mpocket>\x1b[0m ");
                    println!("{content}");
                }
                AgentEvent::ToolCall { name, input } => {
                    eprintln!("\x1b[33m  [tool: {name}]\x1b[0m {input}");
                }
                AgentEvent::ToolResult {
                    name,
                    output,
                    is_error,
                } => {
                    let tag = if is_error { "error" } else { "result" };
                    eprintln!("\x1b[33m  [{tag}: {name}]\x1b[0m {}", truncate(&output, 200));
                }
                AgentEvent::Finished { turns } => {
                    if turns > 1 {
                        eprintln!("\x1b[2m  ({turns} turns)\x1b[0m");
                    }
                }
                AgentEvent::TurnStart { .. } => {}
            }
        }
    });

    let result = agent.invoke_streaming(prompt, tx).await;
    printer.await.ok();
    let result = result?;
    eprintln!(
        "\x1b[2m  [{}in / {}out tokens]\x1b[0m",
        result.usage.input_tokens, result.usage.output_tokens
    );
    Ok(())
}

/// Cut at a character boundary.
fn truncate(s: &str, max_chars: usize) -> String {
    match s.char_indices().nth(max_chars) {
        Some((idx, _)) => format!("{}...", &s[..idx]),
        None => s.to_string(),
    }
}
