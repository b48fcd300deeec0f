#![allow(clippy::uninlined_format_args)]

use anyhow::{anyhow, Context, Result};
use clap::{CommandFactory, Parser, Subcommand, ValueEnum};
use clap_complete::{generate, Shell};
use indicatif::{ProgressBar, ProgressStyle};
use log::{debug, error, info, warn, Level, LevelFilter, Log, Metadata, Record, SetLoggerError};
use std::collections::HashMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use gamestringer::app_config::{Config, LogLevel, TranslationProvider};
use gamestringer::database::{DatabaseConnection, Repository};
use gamestringer::formats::{parse_file, serialize_file, ParsedFile};
use gamestringer::memory::tmx::{export_tmx, parse_tmx};
use gamestringer::memory::{MemoryKey, TranslationMemory};
use gamestringer::providers::ProviderRegistry;
use gamestringer::session::SnapshotStore;
use gamestringer::translation::{
    estimate, recommend, BackoffPolicy, BatchControl, BatchHooks, BatchOrchestrator, ContentFeatures,
    EstimateOptions, JobStatus,
};
use gamestringer::validation::QualityChecker;
use gamestringer::{InMemoryTranslationMemory, SqliteTranslationMemory};

/// CLI wrapper for TranslationProvider to implement ValueEnum
#[derive(Debug, Clone, Copy, ValueEnum)]
enum CliTranslationProvider {
    #[value(name = "openai")]
    OpenAI,
    Anthropic,
    Gemini,
    #[value(name = "deepseek")]
    DeepSeek,
    Mistral,
    #[value(name = "openrouter")]
    OpenRouter,
    #[value(name = "deepl")]
    DeepL,
    Google,
}

impl From<CliTranslationProvider> for TranslationProvider {
    fn from(cli_provider: CliTranslationProvider) -> Self {
        match cli_provider {
            CliTranslationProvider::OpenAI => TranslationProvider::OpenAI,
            CliTranslationProvider::Anthropic => TranslationProvider::Anthropic,
            CliTranslationProvider::Gemini => TranslationProvider::Gemini,
            CliTranslationProvider::DeepSeek => TranslationProvider::DeepSeek,
            CliTranslationProvider::Mistral => TranslationProvider::Mistral,
            CliTranslationProvider::OpenRouter => TranslationProvider::OpenRouter,
            CliTranslationProvider::DeepL => TranslationProvider::DeepL,
            CliTranslationProvider::Google => TranslationProvider::Google,
        }
    }
}

/// CLI wrapper for LogLevel to implement ValueEnum
#[derive(Debug, Clone, Copy, ValueEnum)]
enum CliLogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<CliLogLevel> for LogLevel {
    fn from(cli_level: CliLogLevel) -> Self {
        match cli_level {
            CliLogLevel::Error => LogLevel::Error,
            CliLogLevel::Warn => LogLevel::Warn,
            CliLogLevel::Info => LogLevel::Info,
            CliLogLevel::Debug => LogLevel::Debug,
            CliLogLevel::Trace => LogLevel::Trace,
        }
    }
}

/// Language and provider overrides shared by several commands
#[derive(clap::Args, Debug, Clone)]
struct LanguageArgs {
    /// Source language code (e.g., 'en', 'ja')
    #[arg(short, long)]
    source_language: Option<String>,

    /// Target language code (e.g., 'it', 'de')
    #[arg(short, long)]
    target_language: Option<String>,

    /// Translation provider to use
    #[arg(short, long, value_enum)]
    provider: Option<CliTranslationProvider>,
}

#[derive(clap::Args, Debug)]
struct TranslateArgs {
    /// String file to translate
    #[arg(value_name = "INPUT_FILE")]
    input: PathBuf,

    /// Output file (default: <input stem>.<target language>.<extension>)
    #[arg(short, long)]
    output: Option<PathBuf>,

    #[command(flatten)]
    languages: LanguageArgs,

    /// API key for the provider, overriding the config file
    #[arg(long, env = "GAMESTRINGER_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// Model name to use for LLM providers
    #[arg(short, long)]
    model: Option<String>,

    /// Game identifier stored with new memory entries
    #[arg(long)]
    game_id: Option<String>,

    /// Game context sent to the provider and used to scope memory entries
    #[arg(long)]
    context: Option<String>,

    /// Continue from the latest snapshot for this language pair and provider
    #[arg(long)]
    resume: bool,

    /// Skip the translation memory
    #[arg(long)]
    no_memory: bool,

    /// Skip quality checks
    #[arg(long)]
    no_quality: bool,

    /// Force overwrite of an existing output file
    #[arg(short, long)]
    force_overwrite: bool,
}

#[derive(clap::Args, Debug)]
struct EstimateArgs {
    /// String file to estimate
    #[arg(value_name = "INPUT_FILE")]
    input: PathBuf,

    #[command(flatten)]
    languages: LanguageArgs,

    /// Expected share of strings served from memory (0.0 to 1.0); measured when omitted
    #[arg(long)]
    tm_hit_rate: Option<f64>,
}

#[derive(Subcommand, Debug)]
enum MemoryCommand {
    /// Show translation memory statistics
    Stats,

    /// Export the entries of a language pair as TMX
    Export {
        /// TMX file to write
        #[arg(short, long)]
        output: PathBuf,

        #[command(flatten)]
        languages: LanguageArgs,
    },

    /// Import a TMX file; existing entries are kept
    Import {
        /// TMX file to read
        #[arg(value_name = "TMX_FILE")]
        input: PathBuf,

        #[command(flatten)]
        languages: LanguageArgs,
    },

    /// Mark an entry as verified so later runs never overwrite it
    Verify {
        /// Source text of the entry
        source_text: String,

        /// Game context of the entry
        #[arg(long)]
        context: Option<String>,

        /// Remove the verified flag instead
        #[arg(long)]
        unset: bool,

        #[command(flatten)]
        languages: LanguageArgs,
    },
}

#[derive(Subcommand, Debug)]
enum SnapshotCommand {
    /// List saved snapshots, newest first
    List,

    /// Print a snapshot as JSON
    Show {
        /// Snapshot ID
        id: String,
    },

    /// Delete a snapshot
    Delete {
        /// Snapshot ID
        id: String,
    },
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Translate a string file
    Translate(TranslateArgs),

    /// Estimate cost and time, and recommend a provider
    Estimate(EstimateArgs),

    /// Inspect and maintain the translation memory
    #[command(subcommand)]
    Memory(MemoryCommand),

    /// Manage snapshots of interrupted batches
    #[command(subcommand)]
    Snapshots(SnapshotCommand),

    /// Generate shell completions for gamestringer
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

/// gamestringer - batch translation for video game text
#[derive(Parser, Debug)]
#[command(name = "gamestringer")]
#[command(version)]
#[command(about = "Batch translation engine for video game text")]
#[command(long_about = "gamestringer translates game string tables with LLM and machine translation providers,
backed by a shared translation memory and quality checks.

EXAMPLES:
    gamestringer translate lang/en.json -t it          # Translate to Italian
    gamestringer translate en.json -t ja -p gemini     # Use a specific provider
    gamestringer translate en.json -t it --resume      # Continue an interrupted run
    gamestringer estimate en.json -t de                # Cost estimate and recommendation
    gamestringer memory export -t it -o it.tmx         # Export the memory as TMX
    gamestringer snapshots list                        # Show interrupted runs
    gamestringer completions bash > gamestringer.bash  # Generate bash completions

CONFIGURATION:
    Configuration is stored in conf.json by default. You can specify a different
    config file with --config-path. If the config file doesn't exist, a default one
    will be created automatically.")]
struct CommandLineOptions {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file path
    #[arg(short, long, default_value = "conf.json", global = true)]
    config_path: PathBuf,

    /// Set logging level
    #[arg(short, long, value_enum, global = true)]
    log_level: Option<CliLogLevel>,
}

/// Colored, timestamped logger writing to stderr
///
/// Filtering follows `log::max_level`, which is raised or lowered once the
/// config and CLI flags are known.
struct CustomLogger;

impl CustomLogger {
    fn init(level: LevelFilter) -> Result<(), SetLoggerError> {
        log::set_boxed_logger(Box::new(CustomLogger))?;
        log::set_max_level(level);
        Ok(())
    }

    fn style_for_level(level: Level) -> (&'static str, &'static str) {
        match level {
            Level::Error => ("\x1B[1;31m", "ERROR"),
            Level::Warn => ("\x1B[1;33m", "WARN "),
            Level::Info => ("\x1B[1;32m", "INFO "),
            Level::Debug => ("\x1B[1;36m", "DEBUG"),
            Level::Trace => ("\x1B[1;35m", "TRACE"),
        }
    }
}

impl Log for CustomLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let now = chrono::Local::now().format("%H:%M:%S.%3f");
        let (color, label) = Self::style_for_level(record.level());
        let _ = writeln!(std::io::stderr(), "{}{} {} {}\x1B[0m", color, now, label, record.args());
    }

    fn flush(&self) {
        let _ = std::io::stderr().flush();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    CustomLogger::init(LevelFilter::Info)?;

    let cli = CommandLineOptions::parse();
    if let Some(level) = cli.log_level {
        log::set_max_level(LogLevel::from(level).to_level_filter());
    }

    if let Commands::Completions { shell } = cli.command {
        let mut cmd = CommandLineOptions::command();
        generate(shell, &mut cmd, "gamestringer", &mut std::io::stdout());
        return Ok(());
    }

    let config = load_or_create_config(&cli.config_path)?;
    if cli.log_level.is_none() {
        log::set_max_level(config.log_level.to_level_filter());
    }

    match cli.command {
        Commands::Translate(args) => run_translate(config, args).await,
        Commands::Estimate(args) => run_estimate(config, args).await,
        Commands::Memory(command) => run_memory(config, command).await,
        Commands::Snapshots(command) => run_snapshots(config, command).await,
        Commands::Completions { .. } => Ok(()),
    }
}

/// Load the config, writing the defaults when the file is missing
fn load_or_create_config(path: &Path) -> Result<Config> {
    if path.exists() {
        return Config::from_file(path);
    }

    warn!("Config file not found at '{}', creating default config.", path.display());
    let config = Config::default();
    config
        .save(path)
        .with_context(|| format!("Failed to write default config to file: {}", path.display()))?;
    Ok(config)
}

fn apply_language_args(config: &mut Config, languages: &LanguageArgs) {
    if let Some(source) = &languages.source_language {
        config.source_language = source.clone();
    }
    if let Some(target) = &languages.target_language {
        config.target_language = target.clone();
    }
    if let Some(provider) = languages.provider {
        config.translation.provider = provider.into();
    }
}

fn open_repository(config: &Config) -> Result<Repository> {
    match &config.memory.database_path {
        Some(path) => Ok(Repository::new(DatabaseConnection::new(path)?)),
        None => Repository::new_default(),
    }
}

fn open_memory(config: &Config, repo: &Repository) -> Arc<dyn TranslationMemory> {
    if config.memory.enabled {
        Arc::new(SqliteTranslationMemory::new(repo.clone()))
    } else {
        warn!("Persistent translation memory disabled, using a process-local memory");
        Arc::new(InMemoryTranslationMemory::new())
    }
}

async fn read_string_file(path: &Path) -> Result<(String, ParsedFile)> {
    let raw = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read input file: {}", path.display()))?;
    let filename = path.file_name().and_then(|n| n.to_str()).unwrap_or_default();
    let parsed = parse_file(&raw, filename)?;
    info!("Parsed {} strings from {} ({})", parsed.strings.len(), path.display(), parsed.format);
    Ok((raw, parsed))
}

fn default_output_path(input: &Path, target_language: &str) -> PathBuf {
    let stem = input.file_stem().map(|s| s.to_string_lossy()).unwrap_or_default();
    let extension = input.extension().map(|e| e.to_string_lossy()).unwrap_or_default();
    input.with_file_name(format!("{}.{}.{}", stem, target_language, extension))
}

fn progress_bar(total: usize) -> ProgressBar {
    let bar = ProgressBar::new(total as u64);
    let style = ProgressStyle::default_bar()
        .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} strings ({percent}%) {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_bar());
    bar.set_style(style.progress_chars("█▓▒░"));
    bar
}

async fn run_translate(mut config: Config, args: TranslateArgs) -> Result<()> {
    apply_language_args(&mut config, &args.languages);
    let provider = config.translation.provider;
    if let Some(key) = &args.api_key {
        config.translation.provider_config_mut(provider).api_key = key.clone();
    }
    if let Some(model) = &args.model {
        config.translation.provider_config_mut(provider).model = model.clone();
    }
    config.validate().context("Configuration validation failed")?;

    let output = args
        .output
        .clone()
        .unwrap_or_else(|| default_output_path(&args.input, &config.target_language));
    if output.exists() && !args.force_overwrite {
        return Err(anyhow!(
            "Output file already exists: {}. Use -f to force overwrite.",
            output.display()
        ));
    }

    let (raw, parsed) = read_string_file(&args.input).await?;

    let repo = open_repository(&config)?;
    let store = SnapshotStore::new(repo.clone());
    let orchestrator = BatchOrchestrator::new(ProviderRegistry::from_config(&config.translation))
        .with_memory(open_memory(&config, &repo))
        .with_snapshot_store(store.clone())
        .with_quality_checker(QualityChecker::with_config(config.quality.clone()))
        .with_backoff(BackoffPolicy::from(&config.backoff));

    let mut translations: HashMap<String, String> = HashMap::new();
    let units = if args.resume {
        match store
            .resume_state(&config.source_language, &config.target_language, provider)
            .await?
        {
            Some(snapshot) => {
                let pending = snapshot.pending_units(&parsed.strings);
                info!(
                    "Resuming from snapshot {}: {} of {} strings already translated",
                    snapshot.id,
                    parsed.strings.len() - pending.len(),
                    parsed.strings.len()
                );
                translations.extend(snapshot.translations());
                pending
            }
            None => {
                warn!("No snapshot to resume for {} -> {}, starting over", config.source_language, config.target_language);
                parsed.strings.clone()
            }
        }
    } else {
        parsed.strings.clone()
    };

    let mut options = config.batch_options();
    options.use_translation_memory &= !args.no_memory;
    options.run_quality_checks &= !args.no_quality;
    options.game_id = args.game_id.clone();
    options.game_context = args.context.clone();

    let bar = progress_bar(units.len());
    let control = BatchControl::new();
    let hooks = {
        let bar = bar.clone();
        BatchHooks::new().with_control(control.clone()).on_progress(move |progress| {
            bar.set_position(progress.processed() as u64);
            if let Some(message) = &progress.status_message {
                bar.set_message(message.clone());
            } else if progress.from_memory > 0 {
                bar.set_message(format!("{} from memory", progress.from_memory));
            }
        })
    };

    let interrupt = {
        let control = control.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("Interrupted, finishing in-flight requests and saving a snapshot");
                control.cancel();
            }
        })
    };

    let job = orchestrator.translate_batch(&units, options, hooks).await;
    interrupt.abort();
    bar.finish_and_clear();
    let job = job?;

    translations.extend(job.translations());
    let content = serialize_file(parsed.format, &raw, &translations)?;
    tokio::fs::write(&output, content)
        .await
        .with_context(|| format!("Failed to write output file: {}", output.display()))?;

    for issue in job.results.quality_issues.iter().take(20) {
        warn!("Quality [{}] '{}': {}", issue.kind, issue.source_text, issue.issues.join("; "));
    }
    if job.results.quality_issues.len() > 20 {
        warn!("... and {} more quality issues", job.results.quality_issues.len() - 20);
    }
    for item in job.items.iter().filter(|item| item.error.is_some()) {
        error!("Failed '{}': {}", item.key, item.error.as_deref().unwrap_or_default());
    }

    let results = &job.results;
    info!(
        "{}: {} translated ({} from memory), {} failed, {} skipped, cost ${:.4}{}",
        job.status,
        results.translated_items,
        results.from_memory_items,
        results.failed_items,
        results.skipped_items,
        results.estimated_cost,
        results
            .average_quality_score
            .map(|score| format!(", quality {:.1}", score))
            .unwrap_or_default()
    );
    info!("Success: {}", output.display());

    match job.status {
        JobStatus::Completed if results.failed_items == 0 => {
            match store
                .delete_for(&config.source_language, &config.target_language, provider)
                .await
            {
                Ok(0) => {}
                Ok(count) => debug!("Removed {} finished snapshots", count),
                Err(e) => warn!("Failed to remove snapshots of job {}: {}", job.id, e),
            }
        }
        JobStatus::Cancelled => info!("Snapshot saved, run again with --resume to continue"),
        _ => {}
    }

    Ok(())
}

async fn run_estimate(mut config: Config, args: EstimateArgs) -> Result<()> {
    apply_language_args(&mut config, &args.languages);
    let (_, parsed) = read_string_file(&args.input).await?;
    let texts: Vec<&str> = parsed.strings.iter().map(|unit| unit.source_text.as_str()).collect();

    let tm_hit_rate = match args.tm_hit_rate {
        Some(rate) => rate.clamp(0.0, 1.0),
        None => measure_hit_rate(&config, &texts).await?,
    };

    let options = EstimateOptions {
        provider: config.translation.provider,
        use_translation_memory: config.batch.use_translation_memory,
        tm_hit_rate,
        parallel_batches: config.batch.parallel_batches,
    };
    let cost = estimate(&texts, &options);
    let recommendation = recommend(&ContentFeatures::from_strings(&texts, &config.target_language));

    println!("Strings:            {}", texts.len());
    println!("Provider:           {}", options.provider.display_name());
    println!("Memory hit rate:    {:.0}%", tm_hit_rate * 100.0);
    println!("Memory hits:        {}", cost.breakdown.estimated_tm_hits);
    println!("API calls:          {}", cost.breakdown.estimated_api_calls);
    println!("Estimated cost:     ${:.4}", cost.estimated_cost);
    println!("Estimated time:     {:.0}s", cost.estimated_time.as_secs_f64());
    println!(
        "Recommended:        {} ({})",
        recommendation.provider.display_name(),
        recommendation.reason
    );
    Ok(())
}

/// Share of strings already present in the persistent memory
async fn measure_hit_rate(config: &Config, texts: &[&str]) -> Result<f64> {
    if texts.is_empty() || !config.memory.enabled {
        return Ok(0.0);
    }
    let memory = SqliteTranslationMemory::new(open_repository(config)?);
    let mut hits = 0usize;
    for text in texts {
        if memory
            .lookup_text(text, &config.source_language, &config.target_language, None)
            .await?
            .is_some()
        {
            hits += 1;
        }
    }
    Ok(hits as f64 / texts.len() as f64)
}

async fn run_memory(mut config: Config, command: MemoryCommand) -> Result<()> {
    let repo = open_repository(&config)?;

    match command {
        MemoryCommand::Stats => {
            let database = repo.connection().stats()?;
            let location = repo.connection().path().display().to_string();
            let stats = SqliteTranslationMemory::new(repo).stats().await?;
            println!("{}", stats);
            println!("{} ({})", database, location);
        }
        MemoryCommand::Export { output, languages } => {
            apply_language_args(&mut config, &languages);
            let memory = SqliteTranslationMemory::new(repo);
            let entries = memory.entries(&config.source_language, &config.target_language).await?;
            let tmx = export_tmx(&entries, &config.source_language, &config.target_language);
            tokio::fs::write(&output, tmx)
                .await
                .with_context(|| format!("Failed to write TMX file: {}", output.display()))?;
            info!("Exported {} entries to {}", entries.len(), output.display());
        }
        MemoryCommand::Import { input, languages } => {
            apply_language_args(&mut config, &languages);
            let content = tokio::fs::read_to_string(&input)
                .await
                .with_context(|| format!("Failed to read TMX file: {}", input.display()))?;
            let entries = parse_tmx(&content, &config.source_language, &config.target_language)?;
            let found = entries.len();
            let added = SqliteTranslationMemory::new(repo).import(entries).await?;
            info!("Imported {} of {} entries from {}", added, found, input.display());
        }
        MemoryCommand::Verify {
            source_text,
            context,
            unset,
            languages,
        } => {
            apply_language_args(&mut config, &languages);
            let key = MemoryKey::new(
                &source_text,
                &config.source_language,
                &config.target_language,
                context.as_deref(),
            );
            if SqliteTranslationMemory::new(repo).set_verified(&key, !unset).await? {
                info!("Entry {}", if unset { "unverified" } else { "verified" });
            } else {
                warn!("No memory entry for '{}'", source_text);
            }
        }
    }

    Ok(())
}

async fn run_snapshots(config: Config, command: SnapshotCommand) -> Result<()> {
    let store = SnapshotStore::new(open_repository(&config)?);

    match command {
        SnapshotCommand::List => {
            let records = store.list().await?;
            if records.is_empty() {
                info!("No snapshots");
            }
            for record in records {
                println!(
                    "{}  {}  {} -> {}  {}  {}/{}",
                    record.id,
                    record.created_at,
                    record.source_language,
                    record.target_language,
                    record.provider,
                    record.completed,
                    record.total
                );
            }
        }
        SnapshotCommand::Show { id } => match store.get(&id).await? {
            Some(snapshot) => println!("{}", snapshot.to_json()?),
            None => warn!("Snapshot {} not found", id),
        },
        SnapshotCommand::Delete { id } => {
            if store.delete(&id).await? {
                info!("Deleted snapshot {}", id);
            }
        }
    }

    Ok(())
}
