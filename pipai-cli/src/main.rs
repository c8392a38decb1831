mod cli;
mod error;
mod expiry;

use cli::Cli;
use error::CliError;
use pipai_core::agent::{
    ConversationOrchestrator, OrchestratorOptions, TurnOutcome, TurnRequest, formatting_instructions,
};
use pipai_core::config::paths::{config_file, prompts_dir, servers_file};
use pipai_core::config::{AppConfig, PromptLibrary, config_dir, ensure_config_dirs, ensure_env_loaded};
use pipai_core::model::{CompletionError, OpenAiCompatibleClient};
use pipai_core::tooling::ToolProviderRegistry;
use pipai_session::ConversationStore;
use std::io::{self, IsTerminal, Read};
use std::path::Path;
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{debug, info};
use tracing_subscriber::{EnvFilter, fmt};

#[tokio::main]
async fn main() -> ExitCode {
    let verbose = std::env::args().any(|arg| arg == "--verbose" || arg == "-v");
    init_tracing(verbose);

    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            debug!(error = ?err, "pipai failed");
            eprintln!("error: {}", err.user_message());
            ExitCode::FAILURE
        }
    }
}

async fn run() -> Result<(), CliError> {
    let dir = config_dir();
    ensure_config_dirs(&dir)?;
    ensure_env_loaded(&dir);
    let app_config = AppConfig::load(&config_file(&dir))?;
    let mut library = PromptLibrary::discover(prompts_dir(&dir))?;

    let cli = cli::parse_with_prompts(&library);
    debug!(
        model = ?cli.model,
        conversation = cli.conversation,
        mcp = cli.uses_mcp(),
        prompts = ?cli.selected_prompts,
        "CLI arguments parsed"
    );

    if manage_prompts(&cli, &mut library)? {
        return Ok(());
    }

    let store = ConversationStore::in_dir(&dir);
    if cli.stop_conversation {
        store.stop()?;
        eprintln!("Conversation stopped.");
    }
    if cli.start_conversation {
        store.start()?;
        eprintln!("Started a new conversation.");
    }
    if cli.conversation && !store.is_active() {
        store.start()?;
        info!("No active conversation; started one");
    }

    let context = read_piped_input()?;
    let prompt = compose_prompt(&cli, &library);
    if prompt.is_empty() && context.is_none() {
        if cli.start_conversation || cli.stop_conversation {
            return Ok(());
        }
        return Err(CliError::Usage(
            "no prompt given; pass a prompt, a prompt template flag or piped input".to_string(),
        ));
    }

    let model = cli
        .model
        .clone()
        .or_else(|| app_config.default_llm.clone())
        .ok_or(CompletionError::MissingModel)?;

    let registry = if cli.uses_mcp() {
        let path = cli.mcp_config.clone().unwrap_or_else(|| servers_file(&dir));
        Some(load_registry(&path).await?)
    } else {
        None
    };

    let options = OrchestratorOptions {
        expiry_timeout: app_config.conversation_timeout(),
        formatting_instructions: formatting_instructions(app_config.markdown_formatting),
    };
    let mut orchestrator =
        ConversationOrchestrator::new(OpenAiCompatibleClient::from_config(&app_config), store)
            .with_options(options);
    if let Some(registry) = &registry {
        orchestrator = orchestrator.with_registry(Arc::clone(registry));
    }

    let use_history = orchestrator.store().is_active();
    let mut request = TurnRequest::new(model, prompt).with_history(use_history);
    if let Some(context) = context {
        request = request.with_context(context);
    }

    let expiry = expiry::handler_for(cli.on_expired);
    let outcome = orchestrator.run_turn(request, expiry.as_ref()).await;

    if let Some(registry) = &registry {
        registry.close_all().await;
    }

    match outcome? {
        TurnOutcome::Answered(answer) => {
            if let Some(step) = &answer.tool_step {
                info!(tool = %step.tool, success = step.success, "Tool step finished");
            }
            println!("{}", answer.response);
        }
        TurnOutcome::Aborted => {
            eprintln!("Conversation expired; nothing was sent. Use --stop-conversation or --on-expired.");
        }
    }
    Ok(())
}

/// Handles the prompt library flags. Returns `true` when one was used.
fn manage_prompts(cli: &Cli, library: &mut PromptLibrary) -> Result<bool, CliError> {
    if cli.list_prompts {
        if library.is_empty() {
            println!("No prompts found in {}", library.dir().display());
        }
        for template in library.templates() {
            println!("{}: {}", template.name, template.summary);
        }
        return Ok(true);
    }
    if let (Some(name), Some(text)) = (&cli.create_prompt, &cli.text) {
        let summary = cli
            .summary
            .clone()
            .unwrap_or_else(|| format!("Use the pre-defined '{name}' prompt"));
        let created = library.create(name, &summary, text)?;
        println!("Created prompt '{}' at {}", created.name, created.path.display());
        return Ok(true);
    }
    if let Some(name) = &cli.delete_prompt {
        library.delete(name)?;
        println!("Deleted prompt '{name}'");
        return Ok(true);
    }
    Ok(false)
}

/// Selected templates first, then the free-text prompt.
fn compose_prompt(cli: &Cli, library: &PromptLibrary) -> String {
    let templates = library.compose(cli.selected_prompts.iter().map(String::as_str));
    let text = cli.prompt_text();
    match templates {
        Some(templates) if text.is_empty() => templates,
        Some(templates) => format!("{templates}\n\n{text}"),
        None => text,
    }
}

fn read_piped_input() -> Result<Option<String>, CliError> {
    let stdin = io::stdin();
    if stdin.is_terminal() {
        return Ok(None);
    }
    let mut buffer = String::new();
    stdin.lock().read_to_string(&mut buffer).map_err(CliError::Stdin)?;
    let trimmed = buffer.trim();
    debug!(bytes = trimmed.len(), "Read piped input");
    Ok((!trimmed.is_empty()).then(|| trimmed.to_string()))
}

async fn load_registry(path: &Path) -> Result<Arc<ToolProviderRegistry>, CliError> {
    let registry = Arc::new(ToolProviderRegistry::new());
    registry.load_from_path(path).await?;
    info!(servers = ?registry.provider_names().await, "MCP servers ready");
    Ok(registry)
}

fn init_tracing(verbose: bool) {
    static INIT: std::sync::Once = std::sync::Once::new();
    INIT.call_once(|| {
        let fallback = if verbose { "debug" } else { "warn" };
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback));
        fmt()
            .with_env_filter(filter)
            .with_target(false)
            .with_level(true)
            .with_writer(io::stderr)
            .init();
    });
}
