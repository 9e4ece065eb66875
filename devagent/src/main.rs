//! Prompt-to-project generator CLI.
//!
//! `devagent run` drives the planner, architect and coder against an
//! OpenAI-compatible endpoint and writes the generated project under the
//! configured output directory.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};

use devagent::core::budget::RecursionLimitError;
use devagent::exit_codes;
use devagent::io::config::{
    AppConfig, DEFAULT_CONFIG_PATH, load_config, load_dotenv, write_config,
};
use devagent::io::openai::OpenAiClient;
use devagent::io::project::{ARCHIVE_NAME, list_generated_files, write_zip};
use devagent::logging;
use devagent::pipeline::{PipelineConfig, PipelineEvent, run_pipeline};

#[derive(Parser)]
#[command(
    name = "devagent",
    version,
    about = "Generate a small software project from a natural-language prompt"
)]
struct Cli {
    /// Path to the TOML config.
    #[arg(long, global = true, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run planner, architect and coder for a prompt.
    Run {
        /// Project request, e.g. "Build a colourful modern todo app in html css and js".
        #[arg(conflicts_with = "prompt_file", required_unless_present = "prompt_file")]
        prompt: Option<String>,
        /// Read the prompt from a file instead.
        #[arg(long)]
        prompt_file: Option<PathBuf>,
    },
    /// List generated files.
    Files,
    /// Write the generated project as a zip archive.
    Archive {
        #[arg(long, default_value = ARCHIVE_NAME)]
        out: PathBuf,
    },
    /// Write a default config file.
    Init {
        /// Overwrite an existing config.
        #[arg(short, long)]
        force: bool,
    },
}

/// Failure carrying the exit code it maps to.
#[derive(Debug)]
struct Exit {
    code: i32,
    message: Option<String>,
}

fn main() {
    logging::init();
    let code = match run() {
        Ok(()) => exit_codes::OK,
        Err(exit) => {
            if let Some(message) = exit.message {
                eprintln!("{message}");
            }
            exit.code
        }
    };
    std::process::exit(code);
}

fn run() -> Result<(), Exit> {
    let cli = Cli::parse();
    match cli.command {
        Command::Init { force } => cmd_init(&cli.config, force).map_err(invalid),
        Command::Run {
            prompt,
            prompt_file,
        } => {
            let cfg = load_config(&cli.config).map_err(invalid)?;
            let prompt = read_prompt(prompt, prompt_file.as_deref()).map_err(invalid)?;
            cmd_run(&cfg, &prompt).map_err(|err| {
                let code = if err.downcast_ref::<RecursionLimitError>().is_some() {
                    exit_codes::LIMIT
                } else {
                    exit_codes::INVALID
                };
                Exit {
                    code,
                    message: Some(format!("{err:#}")),
                }
            })
        }
        Command::Files => {
            let cfg = load_config(&cli.config).map_err(invalid)?;
            cmd_files(&cfg)
        }
        Command::Archive { out } => {
            let cfg = load_config(&cli.config).map_err(invalid)?;
            cmd_archive(&cfg, &out)
        }
    }
}

fn invalid(err: anyhow::Error) -> Exit {
    Exit {
        code: exit_codes::INVALID,
        message: Some(format!("{err:#}")),
    }
}

fn no_files(cfg: &AppConfig) -> Exit {
    Exit {
        code: exit_codes::NO_FILES,
        message: Some(format!(
            "no generated files under {}",
            cfg.output_dir.display()
        )),
    }
}

fn cmd_init(path: &Path, force: bool) -> Result<()> {
    if !force && path.exists() {
        bail!("{} already exists (use --force to overwrite)", path.display());
    }
    write_config(path, &AppConfig::default())?;
    println!("{}", path.display());
    Ok(())
}

fn read_prompt(prompt: Option<String>, prompt_file: Option<&Path>) -> Result<String> {
    let prompt = match (prompt, prompt_file) {
        (Some(prompt), _) => prompt,
        (None, Some(path)) => {
            fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?
        }
        (None, None) => bail!("a prompt or --prompt-file is required"),
    };
    if prompt.trim().is_empty() {
        bail!("Please enter a prompt first!");
    }
    Ok(prompt)
}

fn cmd_run(cfg: &AppConfig, prompt: &str) -> Result<()> {
    load_dotenv();
    let client = OpenAiClient::from_config(&cfg.model)?;
    let config = PipelineConfig::from_app(cfg);

    let outcome = run_pipeline(&client, &config, prompt, |event| {
        if let Some(line) = progress_line(event) {
            eprintln!("{line}");
        }
    })?;

    for file in list_generated_files(&config.output_dir)? {
        println!("{}", file.path);
    }
    eprintln!(
        "✅ {} ({} steps)",
        outcome.plan.name, outcome.steps_executed
    );
    Ok(())
}

fn progress_line(event: &PipelineEvent) -> Option<String> {
    match event {
        PipelineEvent::StageStarted { stage } => Some(format!("==> {}", stage.as_str())),
        PipelineEvent::PlanReady { name, files } => {
            Some(format!("plan: {name} ({files} files)"))
        }
        PipelineEvent::TaskPlanReady { steps } => Some(format!("task plan: {steps} steps")),
        PipelineEvent::StepCompleted {
            index,
            total,
            filepath,
            ..
        } => Some(format!("[{}/{total}] {filepath}", index + 1)),
        PipelineEvent::StepStarted { .. } | PipelineEvent::Finished { .. } => None,
    }
}

fn cmd_files(cfg: &AppConfig) -> Result<(), Exit> {
    let files = list_generated_files(&cfg.output_dir).map_err(invalid)?;
    if files.is_empty() {
        return Err(no_files(cfg));
    }
    for file in files {
        println!("{}", file.path);
    }
    Ok(())
}

fn cmd_archive(cfg: &AppConfig, out: &Path) -> Result<(), Exit> {
    let files = list_generated_files(&cfg.output_dir).map_err(invalid)?;
    if files.is_empty() {
        return Err(no_files(cfg));
    }
    let written = write_zip(&cfg.output_dir, out).map_err(invalid)?;
    println!("{} ({written} files)", out.display());
    Ok(())
}
