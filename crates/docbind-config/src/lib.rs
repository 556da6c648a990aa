//! Job configuration for docbind.
//!
//! Parses `docbind.toml` configuration files with serde and provides
//! auto-discovery of config files in parent directories.
//!
//! CLI settings can be applied during load via [`CliSettings`].
//!
//! ## Environment Variable Expansion
//!
//! String configuration values support environment variable expansion:
//!
//! - `${VAR}` - expands to the value of VAR, errors if unset
//! - `${VAR:-default}` - expands to VAR if set, otherwise uses default
//!
//! Expanded fields:
//! - `job.url`
//! - `job.out`
//! - `defaults.dist_dir`
//!
//! `~` in `job.out` and `defaults.dist_dir` expands to the home directory;
//! remaining relative paths are anchored at the config file's directory.

mod expand;

use serde::Deserialize;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

/// Configuration filename to search for.
const CONFIG_FILENAME: &str = "docbind.toml";

const DEFAULT_BATCH_SIZE: usize = 20;
const DEFAULT_PAPER_WIDTH: f64 = 15.0;
const DEFAULT_INDEX_TITLE: &str = "Overview";
const DEFAULT_DOCS_BASE: &str = "/docs";
const DEFAULT_DIST_DIR: &str = "dist";

/// Output mode of a crawl job.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputMode {
    /// One merged, bookmarked PDF.
    #[default]
    Pdf,
    /// A Markdown tree with localized images and rewritten links.
    #[serde(alias = "md")]
    Markdown,
}

impl fmt::Display for OutputMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Pdf => "pdf",
            Self::Markdown => "md",
        })
    }
}

/// A mode name that is neither `pdf` nor `md`.
#[derive(Debug, thiserror::Error)]
#[error("unknown mode {0:?}, expected pdf or md")]
pub struct UnknownMode(String);

impl FromStr for OutputMode {
    type Err = UnknownMode;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "pdf" => Ok(Self::Pdf),
            "md" | "markdown" => Ok(Self::Markdown),
            _ => Err(UnknownMode(s.to_owned())),
        }
    }
}

/// CLI settings that override configuration file values.
///
/// All fields are optional. Only non-None values override the loaded config.
#[derive(Debug, Default)]
pub struct CliSettings {
    /// Override output mode for every job.
    pub mode: Option<OutputMode>,
    /// Override merge batch size for every job.
    pub batch_size: Option<usize>,
    /// Override the final-document page cap for every job.
    pub max_pages: Option<u32>,
    /// Override the menu operation delay for every job, in milliseconds.
    pub op_delay_ms: Option<u64>,
    /// Override the directory finished outputs are moved into.
    pub dist_dir: Option<PathBuf>,
}

/// Application configuration.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Job-independent defaults.
    defaults: DefaultsRaw,
    /// Crawl jobs as written in TOML.
    #[serde(rename = "job")]
    jobs: Vec<JobRaw>,

    /// Resolved job configurations (set after loading).
    #[serde(skip)]
    pub jobs_resolved: Vec<JobConfig>,
    /// Path to the config file (set after loading).
    #[serde(skip)]
    pub config_path: Option<PathBuf>,
}

/// Raw `[defaults]` section as parsed from TOML.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct DefaultsRaw {
    mode: Option<OutputMode>,
    batch_size: Option<usize>,
    paper_width: Option<f64>,
    max_pages: Option<u32>,
    op_delay_ms: Option<u64>,
    dist_dir: Option<String>,
}

/// Raw `[[job]]` table as parsed from TOML.
#[derive(Debug, Deserialize)]
struct JobRaw {
    name: String,
    url: String,
    out: String,
    site: String,
    #[serde(default)]
    mode: Option<OutputMode>,
    #[serde(default)]
    include_index: bool,
    #[serde(default)]
    index_title: Option<String>,
    #[serde(default)]
    docs_base: Option<String>,
    #[serde(default)]
    batch_size: Option<usize>,
    #[serde(default)]
    paper_width: Option<f64>,
    #[serde(default)]
    max_pages: Option<u32>,
    #[serde(default)]
    op_delay_ms: Option<u64>,
}

/// One crawl job with defaults and overrides folded in.
#[derive(Debug, Clone)]
pub struct JobConfig {
    /// Job name, unique within the config file.
    pub name: String,
    /// Index page URL the traversal starts from.
    pub url: String,
    /// Output base path; derived names append `.pdf`, `-md`, `-html`,
    /// `-static` to it.
    pub out: PathBuf,
    /// Site layout name, resolved against the known profiles at job start.
    pub site: String,
    /// Output mode.
    pub mode: OutputMode,
    /// Render the index page itself as the first artifact.
    pub include_index: bool,
    /// Bookmark and file title for the index artifact.
    pub index_title: String,
    /// Prefix rewritten Markdown links are published under.
    pub docs_base: String,
    /// Number of artifacts merged per batch.
    pub batch_size: usize,
    /// PDF paper width in inches.
    pub paper_width: f64,
    /// Page cap per delivered PDF; `None` delivers one document.
    pub max_pages: Option<u32>,
    /// Menu operation delay; `None` uses the site profile's default.
    pub op_delay: Option<Duration>,
    /// Directory finished outputs are moved into.
    pub dist_dir: PathBuf,
}

impl JobConfig {
    /// Build a one-off job from command-line values with stock defaults.
    #[must_use]
    pub fn ad_hoc(url: &str, out: &Path, site: &str) -> Self {
        let name = out.file_stem().map_or_else(
            || "crawl".to_owned(),
            |stem| stem.to_string_lossy().into_owned(),
        );
        Self {
            name,
            url: url.to_owned(),
            out: out.to_path_buf(),
            site: site.to_owned(),
            mode: OutputMode::default(),
            include_index: false,
            index_title: DEFAULT_INDEX_TITLE.to_owned(),
            docs_base: DEFAULT_DOCS_BASE.to_owned(),
            batch_size: DEFAULT_BATCH_SIZE,
            paper_width: DEFAULT_PAPER_WIDTH,
            max_pages: None,
            op_delay: None,
            dist_dir: PathBuf::from(DEFAULT_DIST_DIR),
        }
    }

    /// Validate that all fields are properly set.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Validation` if any field is empty or out of
    /// range.
    pub fn validate(&self) -> Result<(), ConfigError> {
        require_non_empty(&self.name, "job.name")?;
        let field = |suffix: &str| format!("job.{}.{suffix}", self.name);
        require_non_empty(&self.url, &field("url"))?;
        require_http_url(&self.url, &field("url"))?;
        require_non_empty(&self.site, &field("site"))?;
        if self.out.as_os_str().is_empty() {
            return Err(ConfigError::Validation(format!(
                "{} cannot be empty",
                field("out")
            )));
        }
        // One file plus the previous batch is not a merge
        if self.batch_size < 2 {
            return Err(ConfigError::Validation(format!(
                "{} must be at least 2",
                field("batch_size")
            )));
        }
        if !self.paper_width.is_finite() || self.paper_width <= 0.0 {
            return Err(ConfigError::Validation(format!(
                "{} must be a positive number of inches",
                field("paper_width")
            )));
        }
        if self.max_pages == Some(0) {
            return Err(ConfigError::Validation(format!(
                "{} cannot be 0",
                field("max_pages")
            )));
        }
        Ok(())
    }
}

/// Configuration error.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// File not found.
    #[error("Configuration file not found: {}", .0.display())]
    NotFound(PathBuf),
    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// TOML parsing error.
    #[error("TOML parse error: {0}")]
    Parse(#[from] toml::de::Error),
    /// Validation error.
    #[error("Configuration error: {0}")]
    Validation(String),
    /// Environment variable error during expansion.
    #[error("Environment variable error in {field}: {message}")]
    EnvVar {
        /// Config field path (e.g., "`job.handbook.url`").
        field: String,
        /// Error message (e.g., "${`WIKI_HOST`} not set").
        message: String,
    },
}

/// Require a string field to be non-empty.
fn require_non_empty(value: &str, field: &str) -> Result<(), ConfigError> {
    if value.is_empty() {
        return Err(ConfigError::Validation(format!("{field} cannot be empty")));
    }
    Ok(())
}

/// Require a URL field to use http:// or https:// scheme.
fn require_http_url(url: &str, field: &str) -> Result<(), ConfigError> {
    if !url.starts_with("http://") && !url.starts_with("https://") {
        return Err(ConfigError::Validation(format!(
            "{field} must start with http:// or https://"
        )));
    }
    Ok(())
}

/// Expand `~` and anchor relative paths at the config file's directory.
fn resolve_path(config_dir: &Path, raw: &str) -> PathBuf {
    let expanded = shellexpand::tilde(raw);
    config_dir.join(expanded.as_ref())
}

impl Config {
    /// Load configuration from file with optional CLI settings.
    ///
    /// If `config_path` is provided, loads from that file.
    /// Otherwise, searches for `docbind.toml` in current directory and
    /// parents, falling back to an empty configuration.
    ///
    /// CLI settings are applied after loading and resolution, allowing CLI
    /// arguments to take precedence over config file values.
    ///
    /// # Errors
    ///
    /// Returns error if explicit `config_path` doesn't exist or parsing
    /// fails.
    pub fn load(
        config_path: Option<&Path>,
        cli_settings: Option<&CliSettings>,
    ) -> Result<Self, ConfigError> {
        let mut config = if let Some(path) = config_path {
            if !path.exists() {
                return Err(ConfigError::NotFound(path.to_path_buf()));
            }
            Self::load_from_file(path)?
        } else if let Some(discovered) = Self::discover_config() {
            Self::load_from_file(&discovered)?
        } else {
            Self::default()
        };

        if let Some(settings) = cli_settings {
            config.apply_cli_settings(settings);
        }

        Ok(config)
    }

    /// Find a resolved job by name.
    #[must_use]
    pub fn job(&self, name: &str) -> Option<&JobConfig> {
        self.jobs_resolved.iter().find(|job| job.name == name)
    }

    /// Apply CLI settings to every resolved job.
    fn apply_cli_settings(&mut self, settings: &CliSettings) {
        for job in &mut self.jobs_resolved {
            if let Some(mode) = settings.mode {
                job.mode = mode;
            }
            if let Some(batch_size) = settings.batch_size {
                job.batch_size = batch_size;
            }
            if let Some(max_pages) = settings.max_pages {
                job.max_pages = Some(max_pages);
            }
            if let Some(op_delay_ms) = settings.op_delay_ms {
                job.op_delay = Some(Duration::from_millis(op_delay_ms));
            }
            if let Some(dist_dir) = &settings.dist_dir {
                job.dist_dir.clone_from(dist_dir);
            }
        }
    }

    /// Search for config file in current directory and parents.
    fn discover_config() -> Option<PathBuf> {
        let mut current = std::env::current_dir().ok()?;
        loop {
            let candidate = current.join(CONFIG_FILENAME);
            if candidate.exists() {
                return Some(candidate);
            }
            if !current.pop() {
                return None;
            }
        }
    }

    /// Load configuration from a specific file.
    fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config_dir = path.parent().unwrap_or(Path::new("."));
        let mut config = Self::parse(&content, config_dir)?;
        config.config_path = Some(path.to_path_buf());
        Ok(config)
    }

    /// Parse configuration text, expanding variables and resolving jobs
    /// against `config_dir`.
    fn parse(content: &str, config_dir: &Path) -> Result<Self, ConfigError> {
        let mut config: Self = toml::from_str(content)?;
        config.resolve(config_dir)?;
        config.validate()?;
        Ok(config)
    }

    /// Fold defaults into each raw job and resolve paths.
    fn resolve(&mut self, config_dir: &Path) -> Result<(), ConfigError> {
        let dist_raw = match &self.defaults.dist_dir {
            Some(dir) => expand::expand_env(dir, "defaults.dist_dir")?,
            None => DEFAULT_DIST_DIR.to_owned(),
        };
        let dist_dir = resolve_path(config_dir, &dist_raw);

        let mut resolved = Vec::with_capacity(self.jobs.len());
        for job in &self.jobs {
            let field = |suffix: &str| format!("job.{}.{suffix}", job.name);
            let url = expand::expand_env(&job.url, &field("url"))?;
            let out_raw = expand::expand_env(&job.out, &field("out"))?;
            resolved.push(JobConfig {
                name: job.name.clone(),
                url,
                out: resolve_path(config_dir, &out_raw),
                site: job.site.clone(),
                mode: job.mode.or(self.defaults.mode).unwrap_or_default(),
                include_index: job.include_index,
                index_title: job
                    .index_title
                    .clone()
                    .unwrap_or_else(|| DEFAULT_INDEX_TITLE.to_owned()),
                docs_base: job
                    .docs_base
                    .clone()
                    .unwrap_or_else(|| DEFAULT_DOCS_BASE.to_owned()),
                batch_size: job
                    .batch_size
                    .or(self.defaults.batch_size)
                    .unwrap_or(DEFAULT_BATCH_SIZE),
                paper_width: job
                    .paper_width
                    .or(self.defaults.paper_width)
                    .unwrap_or(DEFAULT_PAPER_WIDTH),
                max_pages: job.max_pages.or(self.defaults.max_pages),
                op_delay: job
                    .op_delay_ms
                    .or(self.defaults.op_delay_ms)
                    .map(Duration::from_millis),
                dist_dir: dist_dir.clone(),
            });
        }
        self.jobs_resolved = resolved;
        Ok(())
    }

    /// Validate configuration values.
    ///
    /// Checks every resolved job and rejects duplicate job names. Called
    /// automatically after loading from file.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Validation` if any validation fails.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (i, job) in self.jobs_resolved.iter().enumerate() {
            job.validate()?;
            if self.jobs_resolved[..i].iter().any(|other| other.name == job.name) {
                return Err(ConfigError::Validation(format!(
                    "duplicate job name {:?}",
                    job.name
                )));
            }
        }
        Ok(())
    }
}
