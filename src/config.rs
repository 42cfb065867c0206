use color_eyre::eyre::{Context, Result, eyre};
use serde::{Deserialize, Serialize};
use std::{
    env, fs, io,
    path::{Path, PathBuf},
    sync::{OnceLock, RwLock},
};

/// Globally accessible application configuration values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default = "default_question_source_kind")]
    pub question_source: QuestionSourceKind,
    #[serde(default = "default_backend_url_value")]
    pub backend_url: String,
    #[serde(default = "default_openai_model_kind")]
    pub openai_model: OpenAiModelKind,
    #[serde(default)]
    pub openai_api_key: String,
    #[serde(default = "default_request_timeout_value")]
    pub request_timeout_secs: u64,
}

impl AppConfig {
    fn normalize(&mut self) {
        let trimmed = self.backend_url.trim().trim_end_matches('/');
        self.backend_url = if trimmed.is_empty() {
            DEFAULT_BACKEND_URL.to_string()
        } else {
            trimmed.to_string()
        };
        if self.request_timeout_secs == 0 {
            self.request_timeout_secs = DEFAULT_REQUEST_TIMEOUT_SECS;
        } else if self.request_timeout_secs < MIN_REQUEST_TIMEOUT_SECS {
            self.request_timeout_secs = MIN_REQUEST_TIMEOUT_SECS;
        }
        self.openai_api_key = self.openai_api_key.trim().to_string();
    }

    /// Key from the config file, falling back to `OPENAI_API_KEY` from the environment.
    pub fn resolved_openai_key(&self) -> Option<String> {
        if !self.openai_api_key.is_empty() {
            return Some(self.openai_api_key.clone());
        }
        env::var("OPENAI_API_KEY")
            .ok()
            .map(|key| key.trim().to_string())
            .filter(|key| !key.is_empty())
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            question_source: default_question_source_kind(),
            backend_url: default_backend_url_value(),
            openai_model: default_openai_model_kind(),
            openai_api_key: String::new(),
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
        }
    }
}

const DEFAULT_BACKEND_URL: &str = "http://localhost:8000";
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 240;
const MIN_REQUEST_TIMEOUT_SECS: u64 = 5;
const TIMEOUT_STEP_SECS: i64 = 5;
const fn default_question_source_kind() -> QuestionSourceKind {
    QuestionSourceKind::Backend
}
const fn default_openai_model_kind() -> OpenAiModelKind {
    OpenAiModelKind::Gpt5Mini
}
fn default_backend_url_value() -> String {
    DEFAULT_BACKEND_URL.to_string()
}
const fn default_request_timeout_value() -> u64 {
    DEFAULT_REQUEST_TIMEOUT_SECS
}

const CONFIG_FILE_PATH: &str = "config/quiz_config.toml";

static APP_CONFIG: OnceLock<RwLock<AppConfig>> = OnceLock::new();

fn config_lock() -> &'static RwLock<AppConfig> {
    APP_CONFIG.get_or_init(|| RwLock::new(AppConfig::default()))
}

/// Attempt to load configuration from disk. If loading fails, the in-memory config will be reset to defaults
/// and the error will be returned for the caller to surface if desired.
pub fn initialize() -> Result<()> {
    match load_config_from_path(&config_file_path()) {
        Ok(config) => {
            let lock = config_lock();
            *lock.write().expect("config lock poisoned") = config;
            Ok(())
        }
        Err(err) => {
            let lock = config_lock();
            *lock.write().expect("config lock poisoned") = AppConfig::default();
            Err(err)
        }
    }
}

/// Retrieve a clone of the current configuration.
pub fn current() -> AppConfig {
    config_lock().read().expect("config lock poisoned").clone()
}

/// Apply the provided mutation to the in-memory configuration and persist the result to disk.
pub fn update<F>(mutator: F) -> Result<AppConfig>
where
    F: FnOnce(&mut AppConfig),
{
    let lock = config_lock();
    let mut config = lock.write().expect("config lock poisoned");
    mutator(&mut config);
    config.normalize();
    save_config_to_path(&config_file_path(), &config)?;
    Ok(config.clone())
}

/// Path of the configuration file used for persistence, relative to the working directory.
pub fn config_file_path() -> PathBuf {
    PathBuf::from(CONFIG_FILE_PATH)
}

pub(crate) fn load_config_from_path(path: &Path) -> Result<AppConfig> {
    match fs::read_to_string(path) {
        Ok(contents) => {
            let mut config: AppConfig = toml::from_str(&contents)
                .wrap_err_with(|| format!("failed to parse configuration at {}", path.display()))?;
            config.normalize();
            Ok(config)
        }
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(AppConfig::default()),
        Err(err) => Err(eyre!(format!(
            "failed to read configuration at {}: {}",
            path.display(),
            err
        ))),
    }
}

pub(crate) fn save_config_to_path(path: &Path, config: &AppConfig) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).wrap_err_with(|| {
            format!(
                "failed to create configuration directory {}",
                parent.display()
            )
        })?;
    }
    let serialized =
        toml::to_string_pretty(config).wrap_err("failed to serialize configuration to TOML")?;
    fs::write(path, serialized)
        .wrap_err_with(|| format!("failed to write configuration to {}", path.display()))
}

/// Where questions come from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuestionSourceKind {
    /// The NPTE question service's `/api/ask` endpoint.
    Backend,
    /// Direct generation through the OpenAI chat completions API.
    OpenAi,
}

impl QuestionSourceKind {
    pub fn label(self) -> &'static str {
        match self {
            Self::Backend => "Question service",
            Self::OpenAi => "OpenAI (direct)",
        }
    }

    pub fn next(self) -> Self {
        match self {
            Self::Backend => Self::OpenAi,
            Self::OpenAi => Self::Backend,
        }
    }

    pub fn previous(self) -> Self {
        self.next()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ConfigField {
    QuestionSource,
    OpenAiModel,
    RequestTimeout,
    OpenAiKey,
}

#[derive(Debug, Clone)]
pub struct ConfigForm {
    pub(crate) question_source: QuestionSourceKind,
    pub(crate) backend_url: String,
    pub(crate) openai_model: OpenAiModelKind,
    pub(crate) request_timeout_secs: u64,
    pub(crate) openai_api_key: String,
    editing_openai_key: bool,
    openai_key_buffer: String,
    field: ConfigField,
    pub(crate) dirty: bool,
    pub(crate) status: Option<String>,
}

impl ConfigForm {
    pub(crate) fn from_config(config: AppConfig) -> Self {
        Self {
            question_source: config.question_source,
            backend_url: config.backend_url,
            openai_model: config.openai_model,
            request_timeout_secs: config.request_timeout_secs,
            openai_api_key: config.openai_api_key,
            editing_openai_key: false,
            openai_key_buffer: String::new(),
            field: ConfigField::QuestionSource,
            dirty: false,
            status: None,
        }
    }

    pub(crate) fn selected_index(&self) -> usize {
        self.field.index()
    }

    pub(crate) fn select_next(&mut self) {
        self.field = self.field.next();
    }

    pub(crate) fn select_previous(&mut self) {
        self.field = self.field.previous();
    }

    pub(crate) fn adjust_current(&mut self, delta: isize) {
        if delta == 0 {
            return;
        }

        match self.field {
            ConfigField::QuestionSource => {
                self.question_source = if delta > 0 {
                    self.question_source.next()
                } else {
                    self.question_source.previous()
                };
                self.mark_dirty();
            }
            ConfigField::OpenAiModel => {
                self.openai_model = if delta > 0 {
                    self.openai_model.next()
                } else {
                    self.openai_model.previous()
                };
                self.mark_dirty();
            }
            ConfigField::RequestTimeout => {
                let current = self.request_timeout_secs as i64;
                let updated = (current + delta as i64 * TIMEOUT_STEP_SECS)
                    .max(MIN_REQUEST_TIMEOUT_SECS as i64) as u64;
                if updated != self.request_timeout_secs {
                    self.request_timeout_secs = updated;
                    self.mark_dirty();
                }
            }
            ConfigField::OpenAiKey => {}
        }
    }

    /// Copy the form values onto a configuration about to be saved.
    pub(crate) fn write_into(&self, config: &mut AppConfig) {
        config.question_source = self.question_source;
        config.openai_model = self.openai_model;
        config.request_timeout_secs = self.request_timeout_secs;
        config.openai_api_key = self.openai_api_key.clone();
    }

    pub(crate) fn apply_saved(&mut self, config: AppConfig) {
        self.question_source = config.question_source;
        self.backend_url = config.backend_url;
        self.openai_model = config.openai_model;
        self.request_timeout_secs = config.request_timeout_secs;
        self.openai_api_key = config.openai_api_key;
        self.editing_openai_key = false;
        self.openai_key_buffer.clear();
        self.dirty = false;
        self.status = None;
    }

    pub(crate) fn set_status<S: Into<String>>(&mut self, status: S) {
        self.status = Some(status.into());
    }

    pub(crate) fn is_openai_key_selected(&self) -> bool {
        matches!(self.field, ConfigField::OpenAiKey)
    }

    pub(crate) fn is_editing_openai_key(&self) -> bool {
        self.editing_openai_key
    }

    pub(crate) fn start_editing_openai_key(&mut self) {
        self.editing_openai_key = true;
        self.openai_key_buffer = self.openai_api_key.clone();
        self.status = Some("Editing OpenAI API key (Enter to save, Esc to cancel)".to_string());
    }

    pub(crate) fn cancel_openai_key_edit(&mut self) {
        self.editing_openai_key = false;
        self.openai_key_buffer.clear();
        self.status = Some("Cancelled OpenAI API key edit.".to_string());
    }

    pub(crate) fn apply_openai_key_edit(&mut self) {
        let new_value = self.openai_key_buffer.trim().to_string();
        if new_value != self.openai_api_key {
            self.openai_api_key = new_value;
            self.dirty = true;
            self.status = Some("Updated OpenAI API key.".to_string());
        } else {
            self.status = Some("OpenAI API key unchanged.".to_string());
        }
        self.editing_openai_key = false;
        self.openai_key_buffer.clear();
    }

    pub(crate) fn backspace_openai_key(&mut self) {
        self.openai_key_buffer.pop();
        self.status = Some("Editing OpenAI API key...".to_string());
    }

    pub(crate) fn push_openai_key_char(&mut self, ch: char) {
        self.openai_key_buffer.push(ch);
        self.status = Some("Editing OpenAI API key...".to_string());
    }

    pub(crate) fn masked_openai_key(&self) -> String {
        mask_secret(&self.openai_api_key)
    }

    pub(crate) fn masked_openai_key_buffer(&self) -> String {
        mask_secret(&self.openai_key_buffer)
    }

    fn mark_dirty(&mut self) {
        self.dirty = true;
        self.status = None;
    }
}

fn mask_secret(value: &str) -> String {
    if value.is_empty() {
        return "<not set>".to_string();
    }
    let len = value.chars().count();
    if len <= 4 {
        "****".to_string()
    } else {
        let suffix: String = value.chars().skip(len - 4).collect();
        format!("{}{}", "*".repeat(len - 4), suffix)
    }
}

impl ConfigField {
    fn index(self) -> usize {
        match self {
            Self::QuestionSource => 0,
            Self::OpenAiModel => 1,
            Self::RequestTimeout => 2,
            Self::OpenAiKey => 3,
        }
    }

    fn next(self) -> Self {
        match self {
            Self::QuestionSource => Self::OpenAiModel,
            Self::OpenAiModel => Self::RequestTimeout,
            Self::RequestTimeout => Self::OpenAiKey,
            Self::OpenAiKey => Self::QuestionSource,
        }
    }

    fn previous(self) -> Self {
        match self {
            Self::QuestionSource => Self::OpenAiKey,
            Self::OpenAiModel => Self::QuestionSource,
            Self::RequestTimeout => Self::OpenAiModel,
            Self::OpenAiKey => Self::RequestTimeout,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OpenAiModelKind {
    Gpt5Mini,
    Gpt5,
}

impl OpenAiModelKind {
    pub fn as_model_name(self) -> &'static str {
        match self {
            Self::Gpt5Mini => "gpt-5-mini",
            Self::Gpt5 => "gpt-5",
        }
    }

    pub fn label(self) -> &'static str {
        self.as_model_name()
    }

    pub fn next(self) -> Self {
        match self {
            Self::Gpt5Mini => Self::Gpt5,
            Self::Gpt5 => Self::Gpt5Mini,
        }
    }

    pub fn previous(self) -> Self {
        self.next()
    }
}
