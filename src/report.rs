//! Per-transaction fraud reports
//!
//! The default renderer writes `report_{id}.pdf` with `genpdf`. Fonts are
//! embedded, so a TrueType family must be found on disk; the plain-text
//! renderer covers hosts without one.

use crate::types::record::TransactionRecord;
use crate::types::transaction::format_amount;
use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use genpdf::elements::{Break, Paragraph};
use genpdf::fonts::{self, FontData, FontFamily};
use genpdf::style::{Color, Style};
use genpdf::{Alignment, Document, Element, SimplePageDecorator};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

const TITLE: &str = "Fraud Detection Report";

const EXPLANATION: &str = "This transaction was flagged based on patterns including high \
transaction amount, location mismatch, or unusual merchant category compared to historical \
profile.";

/// Font directories searched after the configured one
const FONT_DIRS: &[&str] = &[
    "./fonts",
    "/usr/share/fonts/liberation",
    "/usr/share/fonts/truetype/liberation",
    "/usr/share/fonts/truetype/dejavu",
    "/usr/share/fonts/TTF",
    "/System/Library/Fonts/Supplemental",
    "/Library/Fonts",
];

/// Report collaborator: renders a document for a stored record
#[async_trait]
pub trait ReportRenderer: Send + Sync {
    /// Render the report and return where it was written
    async fn render(&self, record: &TransactionRecord) -> Result<PathBuf>;
}

/// Everything a report shows, independent of the output format
#[derive(Debug, Clone, PartialEq)]
pub struct ReportContent {
    pub id: u64,
    pub generated_at: String,
    /// Transaction details in display order
    pub details: Vec<(&'static str, String)>,
    pub is_fraud: bool,
    pub risk_level: String,
    pub risk_score: String,
    pub action_taken: String,
}

impl ReportContent {
    pub fn from_record(record: &TransactionRecord, generated_at: DateTime<Utc>) -> Self {
        let tx = &record.transaction;
        let date = tx
            .trans_date_trans_time
            .clone()
            .unwrap_or_else(|| record.timestamp.format("%Y-%m-%d %H:%M:%S").to_string());

        Self {
            id: record.id,
            generated_at: generated_at.format("%Y-%m-%d %H:%M:%S").to_string(),
            details: vec![
                ("Date/Time", date),
                ("Merchant", tx.merchant.clone()),
                ("Amount", format_amount(tx.amt)),
                ("Category", tx.category.clone()),
                ("City Population", tx.city_pop.to_string()),
                ("Job", tx.job.clone()),
                ("Distance", format!("{:.6}", record.dist)),
            ],
            is_fraud: record.result.is_fraud,
            risk_level: record.result.risk_level.to_string(),
            risk_score: format!("{:.2}%", record.result.risk_score * 100.0),
            action_taken: record.result.action_taken.to_string(),
        }
    }

    pub fn assessment(&self) -> &'static str {
        if self.is_fraud {
            "FRAUD DETECTED"
        } else {
            "SAFE / LOW RISK"
        }
    }
}

/// Plain-text report body for a record
pub fn render_text(record: &TransactionRecord, generated_at: DateTime<Utc>) -> String {
    let content = ReportContent::from_record(record, generated_at);

    let mut out = String::new();
    out.push_str(TITLE);
    out.push('\n');
    out.push_str(&"=".repeat(TITLE.len()));
    out.push_str("\n\n");
    out.push_str(&format!("Transaction Report ID: {}\n", content.id));
    out.push_str(&format!("Date Generated: {}\n\n", content.generated_at));

    for (label, value) in &content.details {
        out.push_str(&format!("{}: {}\n", label, value));
    }
    out.push('\n');

    out.push_str(&format!("Assessment: {}\n", content.assessment()));
    out.push_str(&format!("Risk Level: {}\n", content.risk_level));
    out.push_str(&format!("Risk Score: {}\n", content.risk_score));
    out.push_str(&format!("Action Taken: {}\n\n", content.action_taken));

    out.push_str("Explanation:\n");
    out.push_str(EXPLANATION);
    out.push('\n');
    out
}

/// Render a record to PDF bytes
pub fn render_pdf(
    record: &TransactionRecord,
    generated_at: DateTime<Utc>,
    font_family: FontFamily<FontData>,
) -> Result<Vec<u8>> {
    let content = ReportContent::from_record(record, generated_at);

    let mut doc = Document::new(font_family);
    doc.set_title(format!("{} - Transaction {}", TITLE, content.id));
    doc.set_minimal_conformance();
    doc.set_line_spacing(1.25);

    let mut decorator = SimplePageDecorator::new();
    decorator.set_margins(15);
    doc.set_page_decorator(decorator);

    doc.push(
        Paragraph::new(TITLE)
            .aligned(Alignment::Center)
            .styled(Style::new().bold().with_font_size(15)),
    );
    doc.push(Break::new(1.5));

    let heading = Style::new().bold().with_font_size(12);
    doc.push(Paragraph::new(format!("Transaction Report ID: {}", content.id)).styled(heading));
    doc.push(Paragraph::new(format!("Date Generated: {}", content.generated_at)).styled(heading));
    doc.push(Break::new(0.5));

    let body = Style::new().with_font_size(12);
    for (label, value) in &content.details {
        doc.push(Paragraph::new(format!("{}: {}", label, value)).styled(body));
    }
    doc.push(Break::new(0.5));

    let status_color = if content.is_fraud {
        Color::Rgb(255, 0, 0)
    } else {
        Color::Rgb(0, 128, 0)
    };
    doc.push(
        Paragraph::new(format!("Assessment: {}", content.assessment()))
            .styled(Style::new().bold().with_font_size(14).with_color(status_color)),
    );
    doc.push(Paragraph::new(format!("Risk Level: {}", content.risk_level)).styled(body));
    doc.push(Paragraph::new(format!("Risk Score: {}", content.risk_score)).styled(body));
    doc.push(Paragraph::new(format!("Action Taken: {}", content.action_taken)).styled(body));
    doc.push(Break::new(1.0));

    doc.push(Paragraph::new("Explanation:").styled(heading));
    doc.push(Paragraph::new(EXPLANATION).styled(body));

    let mut buffer = Vec::new();
    doc.render(&mut buffer)
        .map_err(|e| anyhow!("PDF render failed: {}", e))?;
    Ok(buffer)
}

/// Find a TrueType family, trying `preferred` first.
///
/// Liberation Sans is loaded through `genpdf`'s naming scheme; DejaVu Sans
/// ships differently named files and is assembled by hand.
pub fn load_font_family(preferred: Option<&Path>) -> Result<FontFamily<FontData>> {
    let dirs: Vec<PathBuf> = preferred
        .map(Path::to_path_buf)
        .into_iter()
        .chain(FONT_DIRS.iter().map(PathBuf::from))
        .filter(|dir| dir.exists())
        .collect();

    dirs.iter()
        .find_map(|dir| {
            let family = fonts::from_files(dir, "LiberationSans", None)
                .ok()
                .or_else(|| dejavu_family(dir));
            if family.is_some() {
                debug!(dir = %dir.display(), "Report fonts loaded");
            }
            family
        })
        .ok_or_else(|| {
            anyhow!(
                "No usable fonts found (LiberationSans or DejaVuSans). Searched: {:?}",
                dirs
            )
        })
}

fn dejavu_family(dir: &Path) -> Option<FontFamily<FontData>> {
    let load = |file: &str| FontData::load(dir.join(file), None).ok();

    let regular = load("DejaVuSans.ttf")?;
    let bold = load("DejaVuSans-Bold.ttf").unwrap_or_else(|| regular.clone());
    let italic = load("DejaVuSans-Oblique.ttf").unwrap_or_else(|| regular.clone());
    let bold_italic = load("DejaVuSans-BoldOblique.ttf").unwrap_or_else(|| bold.clone());

    Some(FontFamily {
        regular,
        bold,
        italic,
        bold_italic,
    })
}

/// Writes PDF reports named `report_{id}.pdf`
pub struct PdfReportRenderer {
    dir: PathBuf,
    font_family: FontFamily<FontData>,
}

impl PdfReportRenderer {
    /// Fails when no font family can be found
    pub fn new(dir: impl Into<PathBuf>, font_dir: Option<&Path>) -> Result<Self> {
        Ok(Self {
            dir: dir.into(),
            font_family: load_font_family(font_dir)?,
        })
    }
}

#[async_trait]
impl ReportRenderer for PdfReportRenderer {
    async fn render(&self, record: &TransactionRecord) -> Result<PathBuf> {
        tokio::fs::create_dir_all(&self.dir)
            .await
            .with_context(|| format!("Failed to create report directory {}", self.dir.display()))?;

        let path = self.dir.join(format!("report_{}.pdf", record.id));

        // Layout is CPU-bound
        let owned = record.clone();
        let font_family = self.font_family.clone();
        let bytes = tokio::task::spawn_blocking(move || {
            render_pdf(&owned, Utc::now(), font_family)
        })
        .await
        .context("PDF render task failed")??;

        tokio::fs::write(&path, &bytes)
            .await
            .with_context(|| format!("Failed to write report {}", path.display()))?;

        info!(
            transaction_id = record.id,
            path = %path.display(),
            size_bytes = bytes.len(),
            "Report generated"
        );
        Ok(path)
    }
}

/// Writes plain-text reports named `report_{id}.txt`
pub struct TextReportRenderer {
    dir: PathBuf,
}

impl TextReportRenderer {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

#[async_trait]
impl ReportRenderer for TextReportRenderer {
    async fn render(&self, record: &TransactionRecord) -> Result<PathBuf> {
        tokio::fs::create_dir_all(&self.dir)
            .await
            .with_context(|| format!("Failed to create report directory {}", self.dir.display()))?;

        let path = self.dir.join(format!("report_{}.txt", record.id));
        let body = render_text(record, Utc::now());

        tokio::fs::write(&path, body)
            .await
            .with_context(|| format!("Failed to write report {}", path.display()))?;

        info!(transaction_id = record.id, path = %path.display(), "Report generated");
        Ok(path)
    }
}
