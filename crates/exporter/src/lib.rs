use extractor::{PromoRecord, COLUMNS};
use std::path::Path;
use thiserror::Error;

const PREVIEW_CELL_WIDTH: usize = 24;

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("Failed to export data: {0}")]
    ExportFailed(String),
    #[error("Invalid format: {0}")]
    InvalidFormat(String),
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Json,
    Csv,
}

impl ExportFormat {
    pub fn from_extension<P: AsRef<Path>>(path: P) -> Option<Self> {
        match path.as_ref().extension()?.to_str()?.to_lowercase().as_str() {
            "csv" => Some(Self::Csv),
            "json" => Some(Self::Json),
            _ => None,
        }
    }
}

/// Explicit format wins; otherwise infer from the file extension.
pub fn resolve_format<P: AsRef<Path>>(
    path: P,
    explicit: Option<ExportFormat>,
) -> Result<ExportFormat, ExportError> {
    if let Some(format) = explicit {
        return Ok(format);
    }
    ExportFormat::from_extension(&path).ok_or_else(|| {
        ExportError::InvalidFormat(format!(
            "cannot infer export format from {}",
            path.as_ref().display()
        ))
    })
}

pub struct Exporter;

impl Exporter {
    pub fn new() -> Self {
        Self
    }

    pub fn export_to_json<P: AsRef<Path>>(
        &self,
        records: &[PromoRecord],
        path: P,
    ) -> Result<(), ExportError> {
        let json = serde_json::to_string_pretty(records)
            .map_err(|e| ExportError::ExportFailed(e.to_string()))?;
        std::fs::write(path, json)?;
        Ok(())
    }

    pub fn export_to_csv<P: AsRef<Path>>(
        &self,
        records: &[PromoRecord],
        path: P,
    ) -> Result<(), ExportError> {
        let mut wtr = csv::Writer::from_path(path)?;

        wtr.write_record(COLUMNS)?;

        for record in records {
            wtr.write_record(csv_row(record))?;
        }

        wtr.flush()?;
        Ok(())
    }

    pub fn export<P: AsRef<Path>>(
        &self,
        records: &[PromoRecord],
        path: P,
        format: ExportFormat,
    ) -> Result<(), ExportError> {
        match format {
            ExportFormat::Json => self.export_to_json(records, path),
            ExportFormat::Csv => self.export_to_csv(records, path),
        }
    }
}

impl Default for Exporter {
    fn default() -> Self {
        Self::new()
    }
}

/// One CSV/preview row in column order. Sequence fields are joined with
/// "; ", absent fields become empty cells.
pub fn csv_row(record: &PromoRecord) -> Vec<String> {
    vec![
        record.link.clone(),
        opt(&record.titulo),
        opt(&record.foto),
        opt(&record.subtitulo),
        opt(&record.comercios),
        join_seq(&record.store_names),
        join_seq(&record.store_addresses),
        opt(&record.vigencia),
        join_seq(&record.bancos),
        opt(&record.tope_reintegro),
        opt(&record.tiempo_acreditacion),
        join_seq(&record.dias),
        opt(&record.canal),
    ]
}

/// First `limit` rows as an aligned text table, long cells truncated.
pub fn render_preview(records: &[PromoRecord], limit: usize) -> String {
    let rows: Vec<Vec<String>> = records.iter().take(limit).map(csv_row).collect();

    let mut widths: Vec<usize> = COLUMNS.iter().map(|c| c.len()).collect();
    for row in &rows {
        for (i, cell) in row.iter().enumerate() {
            widths[i] = widths[i].max(cell.chars().count().min(PREVIEW_CELL_WIDTH));
        }
    }

    let header: Vec<String> = COLUMNS.iter().map(|c| c.to_string()).collect();
    let mut out = format_row(&header, &widths);
    for row in &rows {
        out.push_str(&format_row(row, &widths));
    }
    out
}

fn format_row(cells: &[String], widths: &[usize]) -> String {
    let mut line = String::new();
    for (i, cell) in cells.iter().enumerate() {
        if i > 0 {
            line.push_str("  ");
        }
        line.push_str(&pad_truncate(cell, widths[i]));
    }
    line.push('\n');
    line
}

fn pad_truncate(cell: &str, width: usize) -> String {
    let count = cell.chars().count();
    if count > width {
        let mut s: String = cell.chars().take(width.saturating_sub(3)).collect();
        s.push_str("...");
        s
    } else {
        let mut s = cell.to_string();
        s.extend(std::iter::repeat(' ').take(width - count));
        s
    }
}

fn opt(value: &Option<String>) -> String {
    value.clone().unwrap_or_default()
}

fn join_seq(seq: &Option<Vec<String>>) -> String {
    seq.as_ref().map(|v| v.join("; ")).unwrap_or_default()
}
