use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use sandpad_core::host_js::{run_javascript, ExecutionContext, OutputSink, RunLimits, StdinLines};
use sandpad_core::loader::{HttpFetcher, RuntimeLoader};
use sandpad_core::seed::{seed_files, SeedRequest};
use sandpad_core::store::save_preset_file;
use sandpad_core::{Config, FileStore, FrameHost, SandboxHost};
use sandpad_preview::registry::{lookup, presets};
use sandpad_preview::{
    resolve_preset, synthesize, CapturedLine, LanguagePreset, ProjectFile, ProjectKey, Stream,
    SynthOptions,
};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "sandpad", version, about = "Build and run sandboxed code previews")]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Config file (default: ./sandpad.yaml, then the platform config dir).
    #[arg(long, value_name = "PATH", global = true)]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Command {
    /// List the language presets.
    Presets,

    /// Write the preview document for a project directory.
    Render {
        /// Preset id, e.g. `web`, `react`, `python`.
        preset: String,
        /// Directory holding the preset's files. Missing files use the starters.
        dir: PathBuf,
        /// Output file (default: stdout).
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,
        /// Standard input for the C harness.
        #[arg(long, value_name = "FILE")]
        stdin: Option<PathBuf>,
        /// Wrap the document in a host page with the sandboxed iframe.
        #[arg(long)]
        host_page: bool,
        /// Append a cache-busting parameter to runtime script URLs.
        #[arg(long)]
        cache_bust: bool,
    },

    /// Run a JavaScript file on the host and print its console output.
    RunJs {
        file: PathBuf,
        /// Lines returned by successive `prompt()` calls.
        #[arg(long, value_name = "FILE")]
        stdin: Option<PathBuf>,
    },

    /// Check that the runtime scripts of a preset can be fetched.
    Fetch {
        preset: String,
    },

    /// Save files into the project store.
    Save {
        preset: String,
        subject: String,
        section: String,
        /// Files named like the preset's files, e.g. `web/index.html`.
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },

    /// Write a project's files from the store into a directory. Unsaved
    /// projects continue from an earlier section, then from the starters.
    Restore {
        preset: String,
        subject: String,
        section: String,
        dir: PathBuf,
        /// Section ids of the subject in course order, comma separated.
        #[arg(long, value_delimiter = ',')]
        sections: Vec<String>,
    },
}

/// Streams console lines to the terminal as they arrive.
struct TerminalSink;

impl OutputSink for TerminalSink {
    fn line(&mut self, line: &CapturedLine) {
        match line.stream {
            Stream::Error | Stream::Warn | Stream::Stderr => eprintln!("{}", line.text),
            _ => println!("{}", line.text),
        }
    }
}

fn init_logging() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("sandpad=info,sandpad_core=info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn read_optional(path: Option<&Path>) -> Result<Option<String>> {
    path.map(|p| std::fs::read_to_string(p).with_context(|| format!("reading {}", p.display())))
        .transpose()
}

/// The preset's files from `dir`, falling back to each starter body.
fn project_files(preset: &LanguagePreset, dir: &Path) -> Result<Vec<ProjectFile>> {
    preset
        .files
        .iter()
        .map(|spec| {
            let path = dir.join(spec.name);
            let content = if path.is_file() {
                std::fs::read_to_string(&path).with_context(|| format!("reading {}", path.display()))?
            } else {
                tracing::debug!("{} not found, using starter", path.display());
                spec.starter.to_string()
            };
            Ok(ProjectFile::new(spec.name, spec.language, content))
        })
        .collect()
}

fn list_presets() {
    for preset in presets() {
        println!(
            "{:<14} {:<22} {:<11} {:<8} sandbox=\"{}\"",
            preset.id,
            preset.label,
            preset.harness.as_str(),
            if preset.hot_reload { "live" } else { "manual" },
            sandpad_preview::SandboxPolicy::for_surface(preset.surface).attribute()
        );
    }
}

fn render(
    config: &Config,
    preset_id: &str,
    dir: &Path,
    output: Option<&Path>,
    stdin: Option<&Path>,
    host_page: bool,
    cache_bust: bool,
) -> Result<()> {
    let preset = resolve_preset(preset_id);
    if preset.is_plain() && preset.id != preset_id {
        tracing::warn!("Unknown preset '{}', rendering as plain text", preset_id);
    }
    let files = project_files(preset, dir)?;
    let cache_bust = if cache_bust {
        let now = SystemTime::now().duration_since(UNIX_EPOCH);
        Some(now.map(|d| d.as_secs()).unwrap_or_default())
    } else {
        None
    };
    let options = SynthOptions {
        run_id: Some(uuid::Uuid::new_v4().to_string()),
        cache_bust,
        stdin: read_optional(stdin)?,
        cdn: config.cdn.clone(),
    };
    let doc = synthesize(preset, &files, &options);
    let html = if host_page {
        let mut host = FrameHost::new(preset.surface);
        host.render(&doc);
        host.host_page(preset.label)
    } else {
        doc.html
    };

    match output {
        Some(path) => {
            std::fs::write(path, html).with_context(|| format!("writing {}", path.display()))?;
            tracing::info!("Wrote {} preview to {}", preset.id, path.display());
        }
        None => print!("{}", html),
    }
    Ok(())
}

fn run_js(config: &Config, file: &Path, stdin: Option<&Path>) -> Result<bool> {
    let code = std::fs::read_to_string(file).with_context(|| format!("reading {}", file.display()))?;
    let stdin = read_optional(stdin)?.map(|s| StdinLines::from_text(&s)).unwrap_or_default();
    let exec = ExecutionContext::new(TerminalSink).with_stdin(stdin);
    let result = run_javascript(
        &code,
        exec,
        RunLimits {
            loop_iteration_limit: config.runtime.loop_iteration_limit,
        },
    );
    if let Some(value) = &result.value {
        println!("{}", value);
    }
    eprintln!("{}", result.status_line());
    Ok(result.is_success())
}

async fn fetch(config: &Config, preset_id: &str) -> Result<()> {
    let preset = lookup(preset_id)?;
    let loader = RuntimeLoader::new(Arc::new(HttpFetcher::new()), config.cdn.clone());
    loader
        .ensure_loaded(preset.harness)
        .await
        .with_context(|| format!("loading runtime for {}", preset.id))?;
    println!("{} runtime reachable", preset.harness.as_str());
    Ok(())
}

fn save(config: &Config, key: &ProjectKey, files: &[PathBuf]) -> Result<()> {
    let store = FileStore::from_config(&config.storage);
    for path in files {
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .with_context(|| format!("{} has no file name", path.display()))?;
        let content =
            std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
        let language = save_preset_file(&store, key, name, &content)?;
        tracing::info!("Saved {} ({})", name, language.as_str());
    }
    tracing::debug!("Store at {}", store.root().display());
    Ok(())
}

fn restore(config: &Config, key: &ProjectKey, dir: &Path, sections: &[String]) -> Result<()> {
    let preset = lookup(&key.preset_id)?;
    let store = FileStore::from_config(&config.storage);
    let seeded = seed_files(
        &store,
        &SeedRequest {
            key,
            preset,
            section_order: sections,
            starter_overrides: &HashMap::new(),
        },
    );
    std::fs::create_dir_all(dir).with_context(|| format!("creating {}", dir.display()))?;
    for file in &seeded.files {
        let path = dir.join(&file.name);
        std::fs::write(&path, &file.content)
            .with_context(|| format!("writing {}", path.display()))?;
    }
    tracing::info!(
        "Restored {} files into {} ({:?})",
        seeded.files.len(),
        dir.display(),
        seeded.source
    );
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    init_logging();
    let cli = Cli::parse();
    let config_path = cli.config.clone().unwrap_or_else(Config::default_path);
    let config = Config::load(&config_path)?;

    match cli.command {
        Command::Presets => list_presets(),
        Command::Render {
            preset,
            dir,
            output,
            stdin,
            host_page,
            cache_bust,
        } => {
            if !dir.is_dir() {
                bail!("{} is not a directory", dir.display());
            }
            render(
                &config,
                &preset,
                &dir,
                output.as_deref(),
                stdin.as_deref(),
                host_page,
                cache_bust,
            )?;
        }
        Command::RunJs { file, stdin } => {
            if !run_js(&config, &file, stdin.as_deref())? {
                std::process::exit(1);
            }
        }
        Command::Fetch { preset } => fetch(&config, &preset).await?,
        Command::Save {
            preset,
            subject,
            section,
            files,
        } => save(&config, &ProjectKey::new(subject, section, preset), &files)?,
        Command::Restore {
            preset,
            subject,
            section,
            dir,
            sections,
        } => restore(&config, &ProjectKey::new(subject, section, preset), &dir, &sections)?,
    }
    Ok(())
}
