use std::{
    fs::File,
    io::BufReader,
    path::{Path, PathBuf},
    sync::Arc,
};

use anyhow::Context as _;
use clap::{Parser, Subcommand};
use serde::de::DeserializeOwned;
use tracing_subscriber::EnvFilter;

use shotplan::{
    AddressPolicy, EditRequest, FfmpegRenderer, Mutation, Orchestrator, OrchestratorConfig,
    RenderInputs, RenderOptions, ShotPlan, SidecarCaptionManager,
};

#[derive(Parser, Debug)]
#[command(name = "shotplan", version)]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Validate a shot plan JSON file.
    Validate(PlanArgs),
    /// Print the render jobs derived from a plan, with their fingerprint.
    Jobs(PlanArgs),
    /// Apply one mutation to a plan and write the child plan.
    Mutate(MutateArgs),
    /// Render, stitch and caption a plan (requires `ffmpeg` on PATH).
    Render(RenderArgs),
    /// Apply a web edit request (`{parentPlan, mutation, languages}`) and render the child.
    Edit(EditArgs),
}

#[derive(Parser, Debug)]
struct PlanArgs {
    /// Input shot plan JSON.
    #[arg(long = "in")]
    in_path: PathBuf,
}

#[derive(Parser, Debug)]
struct MutateArgs {
    /// Parent shot plan JSON.
    #[arg(long = "in")]
    in_path: PathBuf,

    /// Mutation JSON, e.g. `{"type":"hook_rewrite","sceneId":"s1","text":"..."}`.
    #[arg(long)]
    mutation: PathBuf,

    /// Output path for the child plan. Prints to stdout when omitted.
    #[arg(long)]
    out: Option<PathBuf>,

    /// Fail when the mutation addresses a scene or shot that does not exist.
    #[arg(long)]
    strict: bool,
}

#[derive(Parser, Debug)]
struct RuntimeArgs {
    /// Orchestrator config JSON. Defaults apply when omitted.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Maximum scene renders in flight.
    #[arg(long)]
    concurrency: Option<usize>,
}

#[derive(Parser, Debug)]
struct RenderArgs {
    /// Input shot plan JSON.
    #[arg(long = "in")]
    in_path: PathBuf,

    #[command(flatten)]
    runtime: RuntimeArgs,

    /// Caption languages (comma separated). Falls back to scene hints.
    #[arg(long, value_delimiter = ',')]
    languages: Vec<String>,

    /// Caption text for scenes without a caption prompt.
    #[arg(long)]
    caption_prompt: Option<String>,
}

#[derive(Parser, Debug)]
struct EditArgs {
    /// Edit request JSON.
    #[arg(long = "in")]
    in_path: PathBuf,

    #[command(flatten)]
    runtime: RuntimeArgs,

    #[arg(long)]
    strict: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.cmd {
        Command::Validate(args) => cmd_validate(args),
        Command::Jobs(args) => cmd_jobs(args),
        Command::Mutate(args) => cmd_mutate(args),
        Command::Render(args) => cmd_render(args).await,
        Command::Edit(args) => cmd_edit(args).await,
    }
}

fn read_json<T: DeserializeOwned>(path: &Path, what: &str) -> anyhow::Result<T> {
    let f = File::open(path).with_context(|| format!("open {what} '{}'", path.display()))?;
    let r = BufReader::new(f);
    serde_json::from_reader(r).with_context(|| format!("parse {what} JSON '{}'", path.display()))
}

fn print_json<T: serde::Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn policy(strict: bool) -> AddressPolicy {
    if strict {
        AddressPolicy::Strict
    } else {
        AddressPolicy::Lenient
    }
}

fn cmd_validate(args: PlanArgs) -> anyhow::Result<()> {
    let plan: ShotPlan = read_json(&args.in_path, "shot plan")?;
    plan.validate()?;
    shotplan::derive_jobs(&plan)?;
    eprintln!(
        "ok: plan '{}' with {} scene(s), ~{:.2}s",
        plan.id,
        plan.scenes.len(),
        plan.estimated_duration()
    );
    Ok(())
}

fn cmd_jobs(args: PlanArgs) -> anyhow::Result<()> {
    let plan: ShotPlan = read_json(&args.in_path, "shot plan")?;
    plan.validate()?;
    let jobs = shotplan::derive_jobs(&plan)?;
    print_json(&serde_json::json!({
        "planId": plan.id,
        "fingerprint": shotplan::fingerprint_jobs(&jobs).to_string(),
        "jobs": jobs,
    }))
}

fn cmd_mutate(args: MutateArgs) -> anyhow::Result<()> {
    let parent: ShotPlan = read_json(&args.in_path, "shot plan")?;
    let mutation: Mutation = read_json(&args.mutation, "mutation")?;

    let entry_id = uuid::Uuid::new_v4().to_string();
    let child = shotplan::derive_child_plan(
        &parent,
        &mutation,
        &entry_id,
        chrono::Utc::now(),
        policy(args.strict),
    )?;

    match args.out {
        Some(out) => {
            if let Some(parent) = out.parent()
                && parent != Path::new("")
            {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("create output dir '{}'", parent.display()))?;
            }
            let json = serde_json::to_string_pretty(&child)?;
            std::fs::write(&out, json)
                .with_context(|| format!("write child plan '{}'", out.display()))?;
            eprintln!("wrote {} ({})", out.display(), child.id);
            Ok(())
        }
        None => print_json(&child),
    }
}

fn load_config(runtime: &RuntimeArgs) -> anyhow::Result<OrchestratorConfig> {
    let cfg = match &runtime.config {
        Some(path) => OrchestratorConfig::from_json_file(path)?,
        None => OrchestratorConfig::default(),
    };
    let mut cfg = cfg.apply_env_overrides()?;
    if let Some(n) = runtime.concurrency {
        cfg.concurrency = n;
    }
    cfg.validate()?;
    Ok(cfg)
}

fn build_orchestrator(cfg: &OrchestratorConfig) -> anyhow::Result<Orchestrator> {
    let renderer = FfmpegRenderer::new(cfg.ffmpeg.clone())?;
    let captions = SidecarCaptionManager::new(cfg.captions.clone());
    Ok(Orchestrator::with_config(
        Arc::new(renderer),
        Arc::new(captions),
        cfg,
    )?)
}

async fn cmd_render(args: RenderArgs) -> anyhow::Result<()> {
    let plan: ShotPlan = read_json(&args.in_path, "shot plan")?;
    let cfg = load_config(&args.runtime)?;
    let orchestrator = build_orchestrator(&cfg)?;

    let options = RenderOptions {
        languages: (!args.languages.is_empty()).then_some(args.languages),
        caption_prompt: args.caption_prompt,
    };
    let outcome = orchestrator
        .render(&RenderInputs { plan }, &options)
        .await?;
    eprintln!("wrote {}", outcome.stitched_path.display());
    print_json(&outcome)
}

async fn cmd_edit(args: EditArgs) -> anyhow::Result<()> {
    let request: EditRequest = read_json(&args.in_path, "edit request")?;
    let cfg = load_config(&args.runtime)?;
    let orchestrator = build_orchestrator(&cfg)?;

    let strict = args.strict || cfg.address_policy == AddressPolicy::Strict;
    let outcome = shotplan::process_edit(&orchestrator, request, policy(strict)).await?;
    eprintln!(
        "wrote {} ({})",
        outcome.result.stitched_path.display(),
        outcome.child.id
    );
    print_json(&outcome)
}
