//! HTTP adapters for the document source, converter, and diff service

use super::SnapshotSource;
use crate::error::{CheckError, CheckResult};
use crate::models::{
    Config, ConverterConfig, DiffOutcome, LedgerArtifacts, LedgerDiff, SheetsConfig, SourceConfig,
};
use chrono::Utc;
use reqwest::blocking::{multipart, Client, Response};
use serde::Deserialize;
use std::fs;
use std::path::PathBuf;
use std::thread;
use std::time::Duration;

const XLSX_MIME: &str = "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";

/// The production snapshot source: a document endpoint, a PDF-to-spreadsheet
/// conversion service, and the spreadsheet host that runs the diff.
///
/// All calls are blocking; the run is the unit of suspension.
pub struct HttpSnapshotSource {
    client: Client,
    source: SourceConfig,
    converter: ConverterConfig,
    sheets: SheetsConfig,
    artifact_dir: PathBuf,
}

#[derive(Debug, Deserialize)]
struct ConvertUpload {
    #[serde(alias = "jobId")]
    job_id: Option<String>,
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ConvertStatus {
    #[serde(alias = "downloadPath")]
    download_path: Option<String>,
}

#[derive(Debug, Deserialize)]
struct DiffResponse {
    result: Option<serde_json::Value>,
    error: Option<serde_json::Value>,
}

impl HttpSnapshotSource {
    pub fn new(config: &Config) -> CheckResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(60))
            .build()?;
        Ok(Self {
            client,
            source: config.source.clone(),
            converter: config.converter.clone(),
            sheets: config.sheets.clone(),
            artifact_dir: config.checker.artifact_dir.clone(),
        })
    }

    /// Upload the PDF to the conversion service and poll until the
    /// spreadsheet is ready, within the configured ceiling.
    fn convert(&self, pdf: &[u8]) -> CheckResult<Vec<u8>> {
        tracing::info!("uploading the document to the conversion service");
        let part = multipart::Part::bytes(pdf.to_vec())
            .file_name("ledger.pdf")
            .mime_str("application/pdf")?;
        let form = multipart::Form::new().part("file", part);
        let response = error_for_status(
            self.client
                .post(&self.converter.upload_url)
                .multipart(form)
                .send()?,
        )?;

        let upload: ConvertUpload = response.json()?;
        if let Some(error) = upload.error {
            return Err(CheckError::ConversionRejected(error));
        }
        let job_id = upload
            .job_id
            .ok_or_else(|| CheckError::ConversionRejected("no job id in upload response".into()))?;

        // Bounded-retry wait, not an unbounded poll.
        let interval = self.converter.poll_interval_secs.max(1);
        let ceiling = self.converter.ceiling_secs;
        let mut waited = 0u64;
        loop {
            let response = error_for_status(
                self.client
                    .get(&self.converter.status_url)
                    .query(&[("id", job_id.as_str())])
                    .send()?,
            )?;
            let status: ConvertStatus = response.json()?;

            if let Some(path) = status.download_path.filter(|p| !p.is_empty()) {
                let url = format!("{}{}", self.converter.download_base_url, path);
                tracing::info!("conversion finished after {}s; downloading", waited);
                let response = error_for_status(self.client.get(&url).send()?)?;
                return Ok(response.bytes()?.to_vec());
            }

            if waited >= ceiling {
                return Err(CheckError::ConversionTimeout(ceiling));
            }
            thread::sleep(Duration::from_secs(interval));
            waited += interval;
        }
    }

    fn sheet_action(&self, action: &str, sheet_id: &str) -> CheckResult<()> {
        let response = self
            .client
            .post(&self.sheets.admin_url)
            .bearer_auth(&self.sheets.auth_token)
            .json(&serde_json::json!({ "action": action, "sheetId": sheet_id }))
            .send()?;
        error_for_status(response)?;
        Ok(())
    }
}

impl SnapshotSource for HttpSnapshotSource {
    fn fetch(&self) -> CheckResult<LedgerArtifacts> {
        tracing::info!("fetching the ledger document from {}", self.source.url);
        let response = self
            .client
            .get(&self.source.url)
            .basic_auth(&self.source.username, Some(&self.source.password))
            .send()?;
        let response = error_for_status(response)?;
        let bytes = response.bytes()?.to_vec();

        let fetched_at = Utc::now();
        let filename = format!(
            "{} {}.pdf",
            self.source.ledger_name,
            fetched_at.format("%Y-%m-%d at %H.%M.%S")
        );
        fs::create_dir_all(&self.artifact_dir)?;
        let pdf_path = self.artifact_dir.join(&filename);
        fs::write(&pdf_path, &bytes)?;
        tracing::info!("saved {} ({} bytes)", pdf_path.display(), bytes.len());

        Ok(LedgerArtifacts {
            pdf_path,
            filename,
            fetched_at,
        })
    }

    fn diff(&self, artifacts: &LedgerArtifacts) -> CheckResult<DiffOutcome> {
        let pdf = fs::read(&artifacts.pdf_path)?;
        let spreadsheet = self.convert(&pdf)?;
        fs::write(artifacts.spreadsheet_path(), &spreadsheet)?;

        tracing::info!("uploading the spreadsheet and running the remote diff");
        let part = multipart::Part::bytes(spreadsheet)
            .file_name(artifacts.filename.replace(".pdf", ".xlsx"))
            .mime_str(XLSX_MIME)?;
        let form = multipart::Form::new()
            .part("spreadsheet", part)
            .text("referenceSheetId", self.sheets.reference_sheet_id.clone())
            .text(
                "referenceSheetName",
                self.sheets.reference_sheet_name.clone(),
            );
        let response = error_for_status(
            self.client
                .post(&self.sheets.diff_url)
                .bearer_auth(&self.sheets.auth_token)
                // The remote diff can be a slow computation; this call gets
                // its own, much larger deadline.
                .timeout(Duration::from_secs(self.sheets.deadline_secs))
                .multipart(form)
                .send()?,
        )?;

        let payload: DiffResponse = response.json()?;
        if let Some(error) = payload.error {
            return Err(CheckError::RemoteDiff(error.to_string()));
        }

        match payload.result {
            None => Err(CheckError::RemoteDiff(
                "diff response had neither result nor error".into(),
            )),
            Some(serde_json::Value::Bool(false)) => Ok(DiffOutcome::NoDifference),
            Some(serde_json::Value::String(s)) if s.eq_ignore_ascii_case("false") => {
                Ok(DiffOutcome::NoDifference)
            }
            // The payload arrives either inline or as a JSON string.
            Some(serde_json::Value::String(s)) => {
                let diff: LedgerDiff = serde_json::from_str(&s)
                    .map_err(|e| CheckError::RemoteDiff(format!("unparseable diff payload: {}", e)))?;
                Ok(DiffOutcome::Changes(diff))
            }
            Some(value) => {
                let diff: LedgerDiff = serde_json::from_value(value)
                    .map_err(|e| CheckError::RemoteDiff(format!("unparseable diff payload: {}", e)))?;
                Ok(DiffOutcome::Changes(diff))
            }
        }
    }

    fn discard(&self, artifacts: &LedgerArtifacts, sheet_id: Option<&str>) -> CheckResult<()> {
        if artifacts.pdf_path.exists() {
            fs::remove_file(&artifacts.pdf_path)?;
        }
        let xlsx = artifacts.spreadsheet_path();
        if xlsx.exists() {
            fs::remove_file(&xlsx)?;
        }
        if let Some(sheet_id) = sheet_id {
            self.sheet_action("delete", sheet_id)?;
        }
        tracing::info!("discarded re-fetched artifacts");
        Ok(())
    }

    fn hide_sheet(&self, sheet_id: &str) -> CheckResult<()> {
        self.sheet_action("hide", sheet_id)
    }
}

fn error_for_status(response: Response) -> CheckResult<Response> {
    let status = response.status();
    if status.is_success() {
        Ok(response)
    } else {
        Err(CheckError::Transport(format!(
            "{} returned {}",
            response.url(),
            status
        )))
    }
}
