//! Export packaging
//!
//! Renders export bodies and their storage keys. Uploading is left to the
//! caller; a package is a key, a content type, bytes and a digest.

use crate::error::{ExportError, ValidationError};
use crate::legal::LintedArtifact;
use crate::types::IncidentId;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use sha2::{Digest, Sha256};
use std::str::FromStr;

/// Key prefix for every export
pub const EXPORT_PREFIX: &str = "exports/";

/// CSV body used when no rows are supplied
pub const SAMPLE_CSV: &str = "id,title\n1,Sample";

/// Export format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportType {
    /// PDF document
    Pdf,
    /// Comma-separated rows
    Csv,
    /// MDX document
    Mdx,
    /// Zip archive
    Zip,
}

impl ExportType {
    /// File extension, without the dot
    #[inline]
    #[must_use]
    pub fn extension(&self) -> &'static str {
        match self {
            ExportType::Pdf => "pdf",
            ExportType::Csv => "csv",
            ExportType::Mdx => "mdx",
            ExportType::Zip => "zip",
        }
    }

    /// MIME type
    #[inline]
    #[must_use]
    pub fn content_type(&self) -> &'static str {
        match self {
            ExportType::Pdf => "application/pdf",
            ExportType::Csv => "text/csv",
            ExportType::Mdx => "text/mdx",
            ExportType::Zip => "application/zip",
        }
    }

    fn default_body(&self) -> &'static str {
        match self {
            ExportType::Pdf => "PDF EXPORT",
            ExportType::Csv => SAMPLE_CSV,
            ExportType::Mdx => "# Export",
            ExportType::Zip => "ZIP EXPORT",
        }
    }
}

impl FromStr for ExportType {
    type Err = ExportError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pdf" => Ok(ExportType::Pdf),
            "csv" => Ok(ExportType::Csv),
            "mdx" => Ok(ExportType::Mdx),
            "zip" => Ok(ExportType::Zip),
            _ => Err(ExportError::UnsupportedType(s.to_string())),
        }
    }
}

/// Export request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportRequest {
    /// Output format
    pub export_type: ExportType,
    /// Target file name, extension optional
    pub filename: String,
    /// Raw body for pdf, mdx and zip
    #[serde(default)]
    pub content: Option<String>,
    /// Rows for csv
    #[serde(default)]
    pub rows: Vec<Map<String, Value>>,
}

/// Rendered export, ready for upload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportPackage {
    /// Storage key under `exports/`
    pub key: String,
    /// MIME type
    pub content_type: String,
    /// Rendered body
    pub body: Vec<u8>,
    /// Hex SHA-256 of `body`
    pub sha256: String,
}

/// Render an export request
///
/// # Errors
/// `ExportError::Validation` if the filename is blank.
pub fn build_export(request: &ExportRequest) -> Result<ExportPackage, ExportError> {
    let filename = request.filename.trim();
    if filename.is_empty() {
        return Err(ValidationError::EmptyField("filename").into());
    }

    let ext = request.export_type.extension();
    let mut key = format!("{EXPORT_PREFIX}{filename}");
    if !key.ends_with(&format!(".{ext}")) {
        key.push('.');
        key.push_str(ext);
    }

    let body = match request.export_type {
        ExportType::Csv => render_csv(&request.rows),
        other => request
            .content
            .clone()
            .unwrap_or_else(|| other.default_body().to_string()),
    }
    .into_bytes();

    let sha256 = hex::encode(Sha256::digest(&body));
    tracing::debug!(key = %key, bytes = body.len(), "export rendered");

    Ok(ExportPackage {
        key,
        content_type: request.export_type.content_type().to_string(),
        body,
        sha256,
    })
}

fn render_csv(rows: &[Map<String, Value>]) -> String {
    let Some(first) = rows.first() else {
        return SAMPLE_CSV.to_string();
    };

    let mut lines = Vec::with_capacity(rows.len() + 1);
    lines.push(first.keys().cloned().collect::<Vec<_>>().join(","));
    for row in rows {
        let cells: Vec<String> = row
            .values()
            .map(|v| match v {
                Value::String(s) => s.clone(),
                Value::Null => String::new(),
                other => other.to_string(),
            })
            .collect();
        lines.push(cells.join(","));
    }
    lines.join("\n")
}

/// Bundle linted artifacts into a single mdx export
///
/// # Errors
/// Propagates [`build_export`] errors.
pub fn package_artifacts(
    incident_id: &IncidentId,
    artifacts: &[LintedArtifact],
) -> Result<ExportPackage, ExportError> {
    let mut doc = format!("# Incident {incident_id}\n");
    for linted in artifacts {
        let a = &linted.artifact;
        doc.push_str(&format!(
            "\n## {}\n\n- id: `{}`\n- type: {}\n- approval required: {}\n- redlines: {} ({} high)\n\n",
            a.title,
            a.content_id,
            a.content_type,
            a.approval_required,
            linted.lint.summary.total,
            linted.lint.summary.by_severity.high,
        ));
        doc.push_str(a.content.trim_end());
        doc.push('\n');
    }

    build_export(&ExportRequest {
        export_type: ExportType::Mdx,
        filename: format!("{incident_id}-communications"),
        content: Some(doc),
        rows: Vec::new(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn request(export_type: ExportType, filename: &str) -> ExportRequest {
        ExportRequest {
            export_type,
            filename: filename.to_string(),
            content: None,
            rows: Vec::new(),
        }
    }

    #[test]
    fn extension_appended_once() {
        let pkg = build_export(&request(ExportType::Pdf, "report")).unwrap();
        assert_eq!(pkg.key, "exports/report.pdf");
        assert_eq!(pkg.content_type, "application/pdf");
        assert_eq!(pkg.body, b"PDF EXPORT");

        let pkg = build_export(&request(ExportType::Pdf, "report.pdf")).unwrap();
        assert_eq!(pkg.key, "exports/report.pdf");
    }

    #[test]
    fn csv_without_rows_uses_sample() {
        let pkg = build_export(&request(ExportType::Csv, "tasks")).unwrap();
        assert_eq!(pkg.key, "exports/tasks.csv");
        assert_eq!(String::from_utf8(pkg.body).unwrap(), SAMPLE_CSV);
    }

    #[test]
    fn csv_header_from_first_row() {
        let mut req = request(ExportType::Csv, "tasks.csv");
        for row in [json!({"id": 1, "title": "Draft"}), json!({"id": 2, "title": "Review"})] {
            if let Value::Object(map) = row {
                req.rows.push(map);
            }
        }
        let pkg = build_export(&req).unwrap();
        assert_eq!(String::from_utf8(pkg.body).unwrap(), "id,title\n1,Draft\n2,Review");
    }

    #[test]
    fn defaults_per_type() {
        let mdx = build_export(&request(ExportType::Mdx, "notes")).unwrap();
        assert_eq!(mdx.body, b"# Export");
        assert_eq!(mdx.content_type, "text/mdx");
        let zip = build_export(&request(ExportType::Zip, "bundle")).unwrap();
        assert_eq!(zip.body, b"ZIP EXPORT");
    }

    #[test]
    fn digest_covers_body() {
        let mut req = request(ExportType::Mdx, "a");
        req.content = Some("hello".to_string());
        let pkg = build_export(&req).unwrap();
        assert_eq!(
            pkg.sha256,
            "2cf24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824"
        );
    }

    #[test]
    fn blank_filename_rejected() {
        let err = build_export(&request(ExportType::Pdf, "  ")).unwrap_err();
        assert_eq!(err, ExportError::Validation(ValidationError::EmptyField("filename")));
    }

    #[test]
    fn package_renders_one_section_per_artifact() {
        use crate::content::{ContentRequest, ContentType, Synthesizer};
        use crate::legal::LegalLinter;
        use crate::types::{FactMap, Severity};

        let now = chrono::Utc::now();
        let synth = Synthesizer::new();
        let linter = LegalLinter::new();
        let linted: Vec<_> = [ContentType::HoldingStatement, ContentType::InternalMemo]
            .into_iter()
            .map(|t| {
                let request = ContentRequest::new("inc-5", t, Severity::High, FactMap::new());
                linter.lint_artifact(synth.synthesize(&request, now).unwrap(), now)
            })
            .collect();

        let pkg = package_artifacts(&IncidentId::new("inc-5"), &linted).unwrap();
        let body = String::from_utf8(pkg.body).unwrap();

        assert_eq!(pkg.key, "exports/inc-5-communications.mdx");
        assert!(body.starts_with("# Incident inc-5\n\n## "));
        assert_eq!(body.matches("\n## ").count(), 2);
        for l in &linted {
            let header = format!("- id: `{}`\n- type: {}\n", l.artifact.content_id, l.artifact.content_type);
            assert!(body.contains(&header));
            assert!(body.contains(&format!("{}\n", l.artifact.content.trim_end())));
        }
    }

    #[test]
    fn export_type_parse() {
        assert_eq!("CSV".parse::<ExportType>().unwrap(), ExportType::Csv);
        assert!(matches!("docx".parse::<ExportType>(), Err(ExportError::UnsupportedType(_))));
    }
}
