//! Configuration layer: typed settings with layered precedence (file → env → CLI).

use std::{
    num::{NonZeroU32, NonZeroUsize},
    path::PathBuf,
    str::FromStr,
    time::Duration,
};

use clap::{Args, Parser, Subcommand, ValueEnum, ValueHint, builder::BoolishValueParser};
use config::{Config, Environment, File};
use serde::Deserialize;
use thiserror::Error;
use tracing::level_filters::LevelFilter;

use crate::application::render::DEFAULT_TAG_LINK_BASE;
use crate::cache::{DEFAULT_NEW_TAGS_COUNT, IconTagBound};
use crate::domain::{tags::DEFAULT_MAX_TITLE_LENGTH, types::TagCollection};

const DEFAULT_CONFIG_BASENAME: &str = "config/default";
const LOCAL_CONFIG_BASENAME: &str = "tagcache";
const DEFAULT_SCHEDULER_CADENCE_SECS: u64 = 300;
const DEFAULT_DB_MAX_CONNECTIONS: u32 = 4;

/// Command-line arguments for the tagcache binary.
#[derive(Debug, Parser)]
#[command(name = "tagcache", version, about = "Tag cache loader")]
pub struct CliArgs {
    /// Optional path to a configuration file.
    #[arg(long = "config-file", env = "TAGCACHE_CONFIG_FILE", value_name = "PATH")]
    pub config_file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand, Clone)]
pub enum Command {
    /// Warm the cache, then reload it on the scheduler cadence until interrupted.
    Run(RunArgs),
    /// Run the loaders once and print their reports as JSON.
    Reload(ReloadArgs),
}

#[derive(Debug, Args, Default, Clone)]
pub struct RunArgs {
    #[command(flatten)]
    pub overrides: CacheOverrides,

    /// Serve tags from a JSON seed file instead of the database.
    #[arg(long = "in-memory", value_name = "PATH", value_hint = ValueHint::FilePath)]
    pub in_memory: Option<PathBuf>,
}

#[derive(Debug, Args, Default, Clone)]
pub struct ReloadArgs {
    #[command(flatten)]
    pub overrides: CacheOverrides,

    /// Serve tags from a JSON seed file instead of the database.
    #[arg(long = "in-memory", value_name = "PATH", value_hint = ValueHint::FilePath)]
    pub in_memory: Option<PathBuf>,

    /// Reload only the given collection; repeat to select several.
    #[arg(long = "only", value_enum, value_name = "COLLECTION")]
    pub only: Vec<CollectionArg>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum CollectionArg {
    New,
    Icon,
    All,
}

impl From<CollectionArg> for TagCollection {
    fn from(value: CollectionArg) -> Self {
        match value {
            CollectionArg::New => TagCollection::New,
            CollectionArg::Icon => TagCollection::Icon,
            CollectionArg::All => TagCollection::All,
        }
    }
}

#[derive(Debug, Args, Default, Clone)]
pub struct CacheOverrides {
    /// Override the base log level (trace|debug|info|warn|error).
    #[arg(long = "log-level", value_name = "LEVEL")]
    pub log_level: Option<String>,

    /// Toggle JSON logging.
    #[arg(
        long = "log-json",
        value_name = "BOOL",
        value_parser = BoolishValueParser::new()
    )]
    pub log_json: Option<bool>,

    /// Override the database connection URL.
    #[arg(long = "database-url", value_name = "URL")]
    pub database_url: Option<String>,

    /// Override the database pool size.
    #[arg(long = "database-max-connections", value_name = "COUNT")]
    pub database_max_connections: Option<u32>,

    /// Override how many new tags are published.
    #[arg(long = "tags-new-count", value_name = "COUNT")]
    pub new_tags_count: Option<u32>,

    /// Override the icon tag boundary rule (legacy|inclusive).
    #[arg(long = "tags-icon-bound", value_name = "RULE")]
    pub icon_tag_bound: Option<String>,

    /// Override the maximum length of non-whitelisted titles.
    #[arg(long = "tags-max-title-length", value_name = "CHARS")]
    pub max_title_length: Option<u64>,

    /// Override the reload cadence.
    #[arg(long = "scheduler-cadence-seconds", value_name = "SECONDS")]
    pub scheduler_cadence_seconds: Option<u64>,

    /// Override the URL prefix used when linking `#Title#` references.
    #[arg(long = "render-link-base", value_name = "PREFIX")]
    pub render_link_base: Option<String>,
}

/// Fully-resolved settings after precedence resolution and validation.
#[derive(Debug, Clone)]
pub struct Settings {
    pub logging: LoggingSettings,
    pub database: DatabaseSettings,
    pub tags: TagSettings,
    pub scheduler: SchedulerSettings,
    pub render: RenderSettings,
}

#[derive(Debug, Clone)]
pub struct LoggingSettings {
    pub level: LevelFilter,
    pub format: LogFormat,
}

#[derive(Debug, Clone, Copy)]
pub enum LogFormat {
    Json,
    Compact,
}

#[derive(Debug, Clone)]
pub struct DatabaseSettings {
    pub url: Option<String>,
    pub max_connections: NonZeroU32,
}

#[derive(Debug, Clone)]
pub struct TagSettings {
    pub new_tags_count: NonZeroU32,
    pub icon_tag_bound: IconTagBound,
    pub title_whitelist: Vec<String>,
    pub max_title_length: NonZeroUsize,
}

#[derive(Debug, Clone)]
pub struct SchedulerSettings {
    pub cadence: Duration,
}

#[derive(Debug, Clone)]
pub struct RenderSettings {
    pub link_base: String,
}

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to build configuration: {0}")]
    Build(#[from] config::ConfigError),
    #[error("invalid configuration for `{key}`: {reason}")]
    Invalid { key: &'static str, reason: String },
}

impl LoadError {
    fn invalid(key: &'static str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            key,
            reason: reason.into(),
        }
    }
}

/// Load settings using the configured precedence (file → environment → CLI).
pub fn load(cli: &CliArgs) -> Result<Settings, LoadError> {
    let mut builder = Config::builder()
        .add_source(File::with_name(DEFAULT_CONFIG_BASENAME).required(false))
        .add_source(File::with_name(LOCAL_CONFIG_BASENAME).required(false));

    if let Some(path) = cli.config_file.as_ref() {
        builder = builder.add_source(File::from(path.as_path()).required(true));
    }

    builder = builder.add_source(
        Environment::with_prefix("TAGCACHE")
            .separator("__")
            .list_separator(",")
            .with_list_parse_key("tags.title_whitelist")
            .try_parsing(true),
    );

    let mut raw: RawSettings = builder.build()?.try_deserialize()?;

    match cli.command.as_ref() {
        Some(Command::Run(args)) => raw.apply_overrides(&args.overrides),
        Some(Command::Reload(args)) => raw.apply_overrides(&args.overrides),
        None => raw.apply_overrides(&CacheOverrides::default()),
    }

    Settings::from_raw(raw)
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawSettings {
    logging: RawLoggingSettings,
    database: RawDatabaseSettings,
    tags: RawTagSettings,
    scheduler: RawSchedulerSettings,
    render: RawRenderSettings,
}

impl RawSettings {
    fn apply_overrides(&mut self, overrides: &CacheOverrides) {
        if let Some(level) = overrides.log_level.as_ref() {
            self.logging.level = Some(level.clone());
        }
        if let Some(json) = overrides.log_json {
            self.logging.json = Some(json);
        }
        if let Some(url) = overrides.database_url.as_ref() {
            self.database.url = Some(url.clone());
        }
        if let Some(max) = overrides.database_max_connections {
            self.database.max_connections = Some(max);
        }
        if let Some(count) = overrides.new_tags_count {
            self.tags.new_tags_count = Some(count);
        }
        if let Some(bound) = overrides.icon_tag_bound.as_ref() {
            self.tags.icon_tag_bound = Some(bound.clone());
        }
        if let Some(length) = overrides.max_title_length {
            self.tags.max_title_length = Some(length);
        }
        if let Some(cadence) = overrides.scheduler_cadence_seconds {
            self.scheduler.cadence_seconds = Some(cadence);
        }
        if let Some(base) = overrides.render_link_base.as_ref() {
            self.render.link_base = Some(base.clone());
        }
    }
}

impl Settings {
    fn from_raw(raw: RawSettings) -> Result<Self, LoadError> {
        let RawSettings {
            logging,
            database,
            tags,
            scheduler,
            render,
        } = raw;

        Ok(Self {
            logging: build_logging_settings(logging)?,
            database: build_database_settings(database)?,
            tags: build_tag_settings(tags)?,
            scheduler: build_scheduler_settings(scheduler)?,
            render: build_render_settings(render)?,
        })
    }
}

fn build_logging_settings(logging: RawLoggingSettings) -> Result<LoggingSettings, LoadError> {
    let level = match logging.level {
        Some(level) => LevelFilter::from_str(level.as_str()).map_err(|err| {
            LoadError::invalid("logging.level", format!("failed to parse: {err}"))
        })?,
        None => LevelFilter::INFO,
    };

    let format = if logging.json.unwrap_or(false) {
        LogFormat::Json
    } else {
        LogFormat::Compact
    };

    Ok(LoggingSettings { level, format })
}

fn build_database_settings(database: RawDatabaseSettings) -> Result<DatabaseSettings, LoadError> {
    let url = database.url.and_then(|value| {
        let trimmed = value.trim();
        (!trimmed.is_empty()).then(|| trimmed.to_string())
    });

    let max_value = database
        .max_connections
        .unwrap_or(DEFAULT_DB_MAX_CONNECTIONS);
    let max_connections = non_zero_u32(max_value.into(), "database.max_connections")?;

    Ok(DatabaseSettings {
        url,
        max_connections,
    })
}

fn build_tag_settings(tags: RawTagSettings) -> Result<TagSettings, LoadError> {
    let new_tags_count = non_zero_u32(
        tags.new_tags_count.unwrap_or(DEFAULT_NEW_TAGS_COUNT).into(),
        "tags.new_tags_count",
    )?;

    let icon_tag_bound = match tags.icon_tag_bound {
        Some(value) => IconTagBound::from_str(&value)
            .map_err(|reason| LoadError::invalid("tags.icon_tag_bound", reason))?,
        None => IconTagBound::default(),
    };

    let title_whitelist: Vec<String> = tags
        .title_whitelist
        .into_iter()
        .map(|title| title.trim().to_string())
        .filter(|title| !title.is_empty())
        .collect();

    let max_title_length_value = tags
        .max_title_length
        .unwrap_or(DEFAULT_MAX_TITLE_LENGTH as u64);
    let max_title_length = usize::try_from(max_title_length_value)
        .ok()
        .and_then(NonZeroUsize::new)
        .ok_or_else(|| {
            LoadError::invalid(
                "tags.max_title_length",
                "must be greater than zero and fit in usize",
            )
        })?;

    Ok(TagSettings {
        new_tags_count,
        icon_tag_bound,
        title_whitelist,
        max_title_length,
    })
}

fn build_scheduler_settings(
    scheduler: RawSchedulerSettings,
) -> Result<SchedulerSettings, LoadError> {
    let cadence_seconds = scheduler
        .cadence_seconds
        .unwrap_or(DEFAULT_SCHEDULER_CADENCE_SECS);
    if cadence_seconds == 0 {
        return Err(LoadError::invalid(
            "scheduler.cadence_seconds",
            "must be greater than zero",
        ));
    }

    Ok(SchedulerSettings {
        cadence: Duration::from_secs(cadence_seconds),
    })
}

fn build_render_settings(render: RawRenderSettings) -> Result<RenderSettings, LoadError> {
    let link_base = render
        .link_base
        .unwrap_or_else(|| DEFAULT_TAG_LINK_BASE.to_string());
    if link_base.trim().is_empty() {
        return Err(LoadError::invalid(
            "render.link_base",
            "prefix must not be empty",
        ));
    }

    Ok(RenderSettings { link_base })
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawLoggingSettings {
    level: Option<String>,
    json: Option<bool>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawDatabaseSettings {
    url: Option<String>,
    max_connections: Option<u32>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawTagSettings {
    new_tags_count: Option<u32>,
    icon_tag_bound: Option<String>,
    title_whitelist: Vec<String>,
    max_title_length: Option<u64>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawSchedulerSettings {
    cadence_seconds: Option<u64>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawRenderSettings {
    link_base: Option<String>,
}

fn non_zero_u32(value: u64, key: &'static str) -> Result<NonZeroU32, LoadError> {
    if value == 0 {
        return Err(LoadError::invalid(key, "must be greater than zero"));
    }
    let value_u32: u32 = value
        .try_into()
        .map_err(|_| LoadError::invalid(key, "value exceeds supported range for u32"))?;
    NonZeroU32::new(value_u32).ok_or_else(|| LoadError::invalid(key, "must be greater than zero"))
}

/// Resolve configuration using the supplied CLI arguments, returning both for downstream use.
pub fn load_with_cli() -> Result<(CliArgs, Settings), LoadError> {
    let args = CliArgs::parse();
    let settings = load(&args)?;
    Ok((args, settings))
}
