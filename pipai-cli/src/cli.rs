use clap::{Arg, ArgAction, ArgMatches, CommandFactory, FromArgMatches, Parser, ValueEnum};
use pipai_core::config::PromptLibrary;
use std::path::PathBuf;
use tracing::warn;

const PROMPT_ARG_PREFIX: &str = "prompt:";

#[derive(Parser, Debug)]
#[command(
    name = "pipai",
    version,
    about = "Pipe command output into an LLM, with conversations, prompt templates and MCP tools"
)]
pub struct Cli {
    /// Model to query (defaults to `default_llm` from config.toml)
    #[arg(long)]
    pub model: Option<String>,
    /// Use the stored conversation, starting one when none is active
    #[arg(long)]
    pub conversation: bool,
    /// Discard any stored conversation and start a new one
    #[arg(long, conflicts_with = "stop_conversation")]
    pub start_conversation: bool,
    /// Discard the stored conversation
    #[arg(long)]
    pub stop_conversation: bool,
    /// Load MCP tool servers from the default server file
    #[arg(long)]
    pub mcp: bool,
    /// Load MCP tool servers from this file (implies --mcp)
    #[arg(long, value_name = "PATH")]
    pub mcp_config: Option<PathBuf>,
    /// What to do when the stored conversation has gone stale
    #[arg(long, value_enum, default_value_t = OnExpired::Ask)]
    pub on_expired: OnExpired,
    /// List the available prompt templates
    #[arg(long)]
    pub list_prompts: bool,
    /// Create a prompt template (needs --text)
    #[arg(long, value_name = "NAME", requires = "text")]
    pub create_prompt: Option<String>,
    /// Summary for --create-prompt
    #[arg(long, requires = "create_prompt")]
    pub summary: Option<String>,
    /// Prompt body for --create-prompt
    #[arg(long, requires = "create_prompt")]
    pub text: Option<String>,
    /// Delete a prompt template
    #[arg(long, value_name = "NAME")]
    pub delete_prompt: Option<String>,
    /// Debug logging on stderr
    #[arg(short, long)]
    pub verbose: bool,
    /// Prompt templates selected through their `--<name>` flags
    #[arg(skip)]
    pub selected_prompts: Vec<String>,
    /// Free-text prompt
    pub prompt: Vec<String>,
}

impl Cli {
    pub fn uses_mcp(&self) -> bool {
        self.mcp || self.mcp_config.is_some()
    }

    pub fn prompt_text(&self) -> String {
        self.prompt.join(" ").trim().to_string()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OnExpired {
    /// Ask on the terminal
    Ask,
    Continue,
    Stop,
    Abort,
}

/// The clap command with one boolean `--<name>` flag per prompt template.
pub fn command_with_prompts(library: &PromptLibrary) -> clap::Command {
    let mut command = Cli::command();
    let reserved: Vec<String> = command
        .get_arguments()
        .filter_map(|arg| arg.get_long().map(str::to_string))
        .chain(["help".to_string(), "version".to_string()])
        .collect();

    for template in library.templates() {
        if reserved.contains(&template.name) {
            warn!(prompt = %template.name, "Prompt name collides with a built-in flag; it has no flag of its own");
            continue;
        }
        command = command.arg(
            Arg::new(format!("{PROMPT_ARG_PREFIX}{}", template.name))
                .long(template.name.clone())
                .help(template.summary.clone())
                .help_heading("Prompt templates")
                .action(ArgAction::SetTrue),
        );
    }
    command
}

pub fn parse_with_prompts(library: &PromptLibrary) -> Cli {
    let matches = command_with_prompts(library).get_matches();
    from_matches(&matches, library).unwrap_or_else(|err| err.exit())
}

pub fn try_parse_from<I, T>(library: &PromptLibrary, args: I) -> Result<Cli, clap::Error>
where
    I: IntoIterator<Item = T>,
    T: Into<std::ffi::OsString> + Clone,
{
    let matches = command_with_prompts(library).try_get_matches_from(args)?;
    from_matches(&matches, library)
}

fn from_matches(matches: &ArgMatches, library: &PromptLibrary) -> Result<Cli, clap::Error> {
    let mut cli = Cli::from_arg_matches(matches)?;
    cli.selected_prompts = library
        .names()
        .filter(|name| {
            let id = format!("{PROMPT_ARG_PREFIX}{name}");
            matches
                .try_get_one::<bool>(&id)
                .ok()
                .flatten()
                .copied()
                .unwrap_or(false)
        })
        .map(str::to_string)
        .collect();
    Ok(cli)
}
