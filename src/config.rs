use anyhow::{Context, Result};
use serde::Deserialize;
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::SyncError;

#[derive(Debug, Deserialize, Default)]
pub struct AppConfig {
    /// Seconds between runs.
    pub interval: Option<u64>,
    #[serde(default)]
    pub trello: TrelloConfig,
    #[serde(default)]
    pub todoist: TodoistConfig,
    #[serde(default)]
    pub health: HealthConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TrelloConfig {
    #[serde(default)]
    pub api_key: String,
    #[serde(default)]
    pub token: String,
    /// Intake board: id, short link or name.
    #[serde(default)]
    pub backlog_board: String,
    #[serde(default)]
    pub goals_board: String,
    #[serde(default = "default_excluded_lists")]
    pub excluded_lists: Vec<String>,
}

impl Default for TrelloConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            token: String::new(),
            backlog_board: String::new(),
            goals_board: String::new(),
            excluded_lists: default_excluded_lists(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct TodoistConfig {
    #[serde(default)]
    pub token: String,
    /// Name of the task list new tasks go to.
    #[serde(default)]
    pub project: String,
    #[serde(default = "default_priority")]
    pub priority: u8,
    /// Empty for no due date.
    #[serde(default = "default_due_string")]
    pub due_string: String,
    pub assignee_id: Option<String>,
    /// Off: open tasks only, and no tasks are created for unmatched items.
    #[serde(default = "default_true")]
    pub include_completed: bool,
    #[serde(default = "default_completed_window_days")]
    pub completed_window_days: u32,
    #[serde(default = "default_plan_prompt")]
    pub plan_prompt: String,
    /// Match items to tasks by exact content instead of substring.
    #[serde(default)]
    pub strict_match: bool,
}

impl Default for TodoistConfig {
    fn default() -> Self {
        Self {
            token: String::new(),
            project: String::new(),
            priority: default_priority(),
            due_string: default_due_string(),
            assignee_id: None,
            include_completed: true,
            completed_window_days: default_completed_window_days(),
            plan_prompt: default_plan_prompt(),
            strict_match: false,
        }
    }
}

impl TodoistConfig {
    pub fn due(&self) -> Option<String> {
        let due = self.due_string.trim();
        (!due.is_empty()).then(|| due.to_string())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct HealthConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_bind")]
    pub bind: String,
}

impl Default for HealthConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            bind: default_bind(),
        }
    }
}

fn default_excluded_lists() -> Vec<String> {
    vec!["Ideas".into(), "Needs research".into()]
}

fn default_priority() -> u8 {
    4
}

fn default_due_string() -> String {
    "today".into()
}

fn default_true() -> bool {
    true
}

fn default_completed_window_days() -> u32 {
    30
}

fn default_plan_prompt() -> String {
    "Plan the next goal on the goals board".into()
}

fn default_bind() -> String {
    "0.0.0.0:8086".into()
}

/// Validated configuration, immutable for the life of the process.
#[derive(Debug, Clone)]
pub struct Settings {
    pub interval: Duration,
    pub trello: TrelloConfig,
    pub todoist: TodoistConfig,
    pub health: HealthConfig,
}

impl AppConfig {
    /// Let environment variables stand in for secrets kept out of the file.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let overrides: [(&str, &mut String); 3] = [
            ("TRELLO_API_KEY", &mut self.trello.api_key),
            ("TRELLO_TOKEN", &mut self.trello.token),
            ("TODOIST_TOKEN", &mut self.todoist.token),
        ];
        for (var, field) in overrides {
            if let Some(value) = lookup(var).filter(|v| !v.trim().is_empty()) {
                *field = value;
            }
        }
    }

    pub fn validate(self) -> Result<Settings, SyncError> {
        let interval = match self.interval {
            Some(secs) if secs > 0 => Duration::from_secs(secs),
            _ => return Err(SyncError::ConfigMissing("interval".into())),
        };

        let required = [
            ("trello.api_key", &self.trello.api_key),
            ("trello.token", &self.trello.token),
            ("trello.backlog_board", &self.trello.backlog_board),
            ("trello.goals_board", &self.trello.goals_board),
            ("todoist.token", &self.todoist.token),
            ("todoist.project", &self.todoist.project),
        ];
        if let Some((key, _)) = required.iter().find(|(_, v)| v.trim().is_empty()) {
            return Err(SyncError::ConfigMissing((*key).to_string()));
        }

        Ok(Settings {
            interval,
            trello: self.trello,
            todoist: self.todoist,
            health: self.health,
        })
    }
}

impl fmt::Display for Settings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "interval:       {}s", self.interval.as_secs())?;
        writeln!(f, "backlog board:  {}", self.trello.backlog_board)?;
        writeln!(f, "goals board:    {}", self.trello.goals_board)?;
        writeln!(f, "excluded lists: {}", self.trello.excluded_lists.join(", "))?;
        writeln!(f, "task project:   {}", self.todoist.project)?;
        writeln!(f, "task priority:  {}", self.todoist.priority)?;
        writeln!(
            f,
            "task due:       {}",
            self.todoist.due().unwrap_or_else(|| "none".into())
        )?;
        if self.health.enabled {
            write!(f, "health:         {}", self.health.bind)
        } else {
            write!(f, "health:         disabled")
        }
    }
}

fn config_path() -> PathBuf {
    if let Ok(path) = std::env::var("CONFIG_PATH") {
        return PathBuf::from(path);
    }
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("groomer")
        .join("config.toml")
}

pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    if !path.exists() {
        return Ok(AppConfig::default());
    }
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config from {}", path.display()))?;
    let config: AppConfig = toml::from_str(&contents)
        .with_context(|| format!("Failed to parse {}", path.display()))?;
    Ok(config)
}

/// Load the config file, apply environment overrides and validate.
pub fn load_settings() -> Result<Settings> {
    let path = config_path();
    let mut config = load_config_from(&path)?;
    config.apply_env(|var| std::env::var(var).ok());
    let settings = config
        .validate()
        .with_context(|| format!("Invalid configuration ({})", path.display()))?;
    Ok(settings)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    const FULL: &str = r#"
interval = 300

[trello]
api_key = "key"
token = "tok"
backlog_board = "Backlog"
goals_board = "Goals"

[todoist]
token = "todo-token"
project = "Work"
"#;

    fn write_config(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn full_config_validates_with_defaults() {
        let file = write_config(FULL);
        let settings = load_config_from(file.path()).unwrap().validate().unwrap();

        assert_eq!(settings.interval, Duration::from_secs(300));
        assert_eq!(settings.trello.excluded_lists, ["Ideas", "Needs research"]);
        assert_eq!(settings.todoist.priority, 4);
        assert_eq!(settings.todoist.due(), Some("today".to_string()));
        assert!(settings.todoist.include_completed);
        assert!(!settings.todoist.strict_match);
        assert!(settings.health.enabled);
        assert_eq!(settings.health.bind, "0.0.0.0:8086");
    }

    #[test]
    fn missing_file_yields_empty_config() {
        let dir = tempfile::tempdir().unwrap();
        let config = load_config_from(&dir.path().join("absent.toml")).unwrap();
        assert!(config.interval.is_none());
    }

    #[test]
    fn missing_interval_is_reported() {
        let file = write_config(&FULL.replace("interval = 300", ""));
        let err = load_config_from(file.path()).unwrap().validate().unwrap_err();
        assert!(matches!(err, SyncError::ConfigMissing(ref k) if k == "interval"));
    }

    #[test]
    fn zero_interval_is_rejected() {
        let file = write_config(&FULL.replace("interval = 300", "interval = 0"));
        let err = load_config_from(file.path()).unwrap().validate().unwrap_err();
        assert!(matches!(err, SyncError::ConfigMissing(ref k) if k == "interval"));
    }

    #[test]
    fn missing_secret_names_the_key() {
        let file = write_config(&FULL.replace("token = \"todo-token\"", ""));
        let err = load_config_from(file.path()).unwrap().validate().unwrap_err();
        assert_eq!(err.to_string(), "missing configuration value: todoist.token");
    }

    #[test]
    fn env_overrides_fill_secrets() {
        let file = write_config(
            &FULL
                .replace("api_key = \"key\"", "")
                .replace("token = \"todo-token\"", ""),
        );
        let env: HashMap<&str, &str> = [
            ("TRELLO_API_KEY", "env-key"),
            ("TODOIST_TOKEN", "env-todo"),
            ("TRELLO_TOKEN", "  "),
        ]
        .into_iter()
        .collect();

        let mut config = load_config_from(file.path()).unwrap();
        config.apply_env(|var| env.get(var).map(|v| v.to_string()));
        let settings = config.validate().unwrap();

        assert_eq!(settings.trello.api_key, "env-key");
        assert_eq!(settings.todoist.token, "env-todo");
        // blank override does not clobber the file value
        assert_eq!(settings.trello.token, "tok");
    }

    #[test]
    fn empty_due_string_means_no_due_date() {
        let file = write_config(&format!("{FULL}due_string = \"\"\n"));
        let settings = load_config_from(file.path()).unwrap().validate().unwrap();
        assert_eq!(settings.todoist.due(), None);
    }

    #[test]
    fn summary_omits_secrets() {
        let file = write_config(FULL);
        let settings = load_config_from(file.path()).unwrap().validate().unwrap();
        let summary = settings.to_string();
        assert!(summary.contains("goals board:    Goals"));
        assert!(!summary.contains("todo-token"));
        assert!(!summary.contains("tok\n"));
    }

    #[test]
    fn malformed_toml_is_an_error() {
        let file = write_config("interval = [");
        assert!(load_config_from(file.path()).is_err());
    }
}
