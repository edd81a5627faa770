//! Configuration loaded from config.toml

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Which diff field keys reply threading for change notifications.
///
/// Historical variants of the checker disagreed on this, so it is
/// configuration rather than behaviour.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum ThreadingKey {
    /// Thread while successive diffs share a reference snapshot (default).
    #[default]
    ReferenceTimestamp,
    /// Thread while the notified baseline is unchanged.
    NotifiedBaseline,
}

/// Core checker settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CheckerConfig {
    /// Where the run state is persisted between checks.
    pub state_path: PathBuf,

    /// Where fetched documents and converted spreadsheets are saved.
    pub artifact_dir: PathBuf,

    /// Consecutive-failure counts that trigger an escalation alert.
    pub escalation_thresholds: Vec<u32>,

    /// Minutes between checks in watch mode.
    pub interval_minutes: u64,

    /// Which diff field keys reply threading.
    pub threading_key: ThreadingKey,
}

impl Default for CheckerConfig {
    fn default() -> Self {
        Self {
            state_path: PathBuf::from("ledgerd/state.yaml"),
            artifact_dir: PathBuf::from("ledgerd/artifacts"),
            escalation_thresholds: vec![3, 8, 15],
            interval_minutes: 30,
            threading_key: ThreadingKey::default(),
        }
    }
}

/// Where the ledger document comes from.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceConfig {
    /// Document endpoint; a GET with basic auth returns the PDF.
    pub url: String,
    pub username: String,
    pub password: String,

    /// Human name for the document, used in artifact filenames.
    pub ledger_name: String,
}

/// The PDF-to-spreadsheet conversion service.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ConverterConfig {
    /// Multipart upload endpoint; returns a job id.
    pub upload_url: String,

    /// Status endpoint polled with the job id until a download path appears.
    pub status_url: String,

    /// Base joined with the reported download path.
    pub download_base_url: String,

    /// Seconds between status polls.
    pub poll_interval_secs: u64,

    /// Hard ceiling on the whole poll loop.
    pub ceiling_secs: u64,
}

impl Default for ConverterConfig {
    fn default() -> Self {
        Self {
            upload_url: String::new(),
            status_url: String::new(),
            download_base_url: String::new(),
            poll_interval_secs: 2,
            ceiling_secs: 120,
        }
    }
}

/// The spreadsheet host that uploads the conversion and runs the diff.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SheetsConfig {
    /// Upload-and-diff endpoint.
    pub diff_url: String,

    /// Sheet administration endpoint (delete/hide).
    pub admin_url: String,

    /// Base URL for linking to a sheet from the report, if the host has one.
    pub sheet_url_base: Option<String>,

    /// The reference sheet the ledger is diffed against.
    pub reference_sheet_id: String,
    pub reference_sheet_name: String,

    /// Bearer token for the host.
    pub auth_token: String,

    /// Deadline on the diff call; the remote computation can be slow.
    pub deadline_secs: u64,
}

impl Default for SheetsConfig {
    fn default() -> Self {
        Self {
            diff_url: String::new(),
            admin_url: String::new(),
            sheet_url_base: None,
            reference_sheet_id: String::new(),
            reference_sheet_name: String::new(),
            auth_token: String::new(),
            deadline_secs: 600,
        }
    }
}

/// SMTP settings for outgoing reports and alerts.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmailConfig {
    pub smtp_host: String,
    pub smtp_port: u16,
    pub username: String,
    pub password: String,

    /// RFC 5322 mailboxes, e.g. "Ledgerd <ledgerd@example.org>".
    pub from: String,
    pub to: String,
}

impl Default for EmailConfig {
    fn default() -> Self {
        Self {
            smtp_host: String::new(),
            smtp_port: 465,
            username: String::new(),
            password: String::new(),
            from: String::new(),
            to: String::new(),
        }
    }
}

/// Ledgerd configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub checker: CheckerConfig,
    pub source: SourceConfig,
    pub converter: ConverterConfig,
    pub sheets: SheetsConfig,
    pub email: EmailConfig,
}

impl Config {
    /// Load config from a TOML file.
    ///
    /// Unlike the run state, a missing or unreadable config is fatal: there
    /// is nothing sensible to monitor without credentials and endpoints.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            anyhow::bail!("config file not found: {}", path.display());
        }

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        let config: Config = toml::from_str(&content)
            .with_context(|| format!("failed to parse {}", path.display()))?;
        Ok(config)
    }

    /// Save config to a TOML file.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self).context("failed to serialize config")?;
        std::fs::write(path, content)
            .with_context(|| format!("failed to write {}", path.display()))?;
        Ok(())
    }
}
