use std::io::{Cursor, Read};
use std::path::Path;

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use quick_xml::events::Event;
use quick_xml::Reader;
use tracing::debug;

use super::ExtractedContent;
use crate::error::{DoctextError, Result};
use crate::models::DocumentType;

const NOT_AVAILABLE: &str = "N/A";

/// Dublin Core fields from `docProps/core.xml` that end up in the output.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CoreProperties {
    pub title: Option<String>,
    pub creator: Option<String>,
    /// Raw W3CDTF timestamp, e.g. `2024-01-01T10:00:00Z`.
    pub created: Option<String>,
}

impl CoreProperties {
    /// Creation date as `YYYY-MM-DD`, if the timestamp parses.
    pub fn created_date(&self) -> Option<String> {
        let raw = self.created.as_deref()?.trim();
        if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
            return Some(dt.format("%Y-%m-%d").to_string());
        }
        if let Ok(dt) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S") {
            return Some(dt.format("%Y-%m-%d").to_string());
        }
        raw.get(..10)
            .and_then(|d| NaiveDate::parse_from_str(d, "%Y-%m-%d").ok())
            .map(|d| d.format("%Y-%m-%d").to_string())
    }
}

pub struct DocxExtractor;

impl DocxExtractor {
    pub fn extract_file(path: &Path, include_metadata: bool) -> Result<ExtractedContent> {
        let bytes = std::fs::read(path)
            .map_err(|e| DoctextError::Open(format!("{}: {e}", path.display())))?;
        Self::extract(&bytes, include_metadata)
    }

    pub fn extract(bytes: &[u8], include_metadata: bool) -> Result<ExtractedContent> {
        let docx = docx_rs::read_docx(bytes)
            .map_err(|e| DoctextError::Open(format!("DOCX parse error: {e}")))?;

        let mut lines: Vec<String> = Vec::new();
        let mut title = None;

        if include_metadata {
            let props = Self::core_properties(bytes).unwrap_or_else(|e| {
                debug!("Ignoring unreadable core properties: {}", e);
                CoreProperties::default()
            });
            lines.push("### Document Metadata ###".to_string());
            lines.push(format!(
                "Title: {}",
                props.title.as_deref().unwrap_or(NOT_AVAILABLE)
            ));
            lines.push(format!(
                "Author: {}",
                props.creator.as_deref().unwrap_or(NOT_AVAILABLE)
            ));
            lines.push(format!(
                "Created: {}",
                props.created_date().as_deref().unwrap_or(NOT_AVAILABLE)
            ));
            lines.push(String::new());
            title = props.title;
        }

        lines.push("### Document Body ###".to_string());
        let mut tables = Vec::new();
        for child in &docx.document.children {
            match child {
                docx_rs::DocumentChild::Paragraph(paragraph) => {
                    let text = Self::paragraph_text(paragraph);
                    let text = text.trim();
                    if !text.is_empty() {
                        lines.push(text.to_string());
                    }
                }
                docx_rs::DocumentChild::Table(table) => tables.push(table),
                _ => {}
            }
        }

        if !tables.is_empty() {
            lines.push("\n### Tables ###".to_string());
            for (i, table) in tables.iter().enumerate() {
                lines.push(format!("[Table {}]", i + 1));
                for row in Self::table_rows(table) {
                    if row.iter().any(|cell| !cell.is_empty()) {
                        lines.push(row.join("\t"));
                    }
                }
                lines.push(String::new());
            }
        }

        debug!(tables = tables.len(), "DOCX parsed");

        let text = lines.join("\n").trim().to_string();
        let mut content = ExtractedContent::new(text, DocumentType::Docx);
        content.title = title;
        Ok(content)
    }

    /// Reads `docProps/core.xml`; a package without one yields empty properties.
    pub fn core_properties(bytes: &[u8]) -> Result<CoreProperties> {
        let mut archive = zip::ZipArchive::new(Cursor::new(bytes))
            .map_err(|e| DoctextError::Open(format!("DOCX is not a zip package: {e}")))?;

        let mut xml = String::new();
        match archive.by_name("docProps/core.xml") {
            Ok(mut file) => {
                file.read_to_string(&mut xml)?;
            }
            Err(_) => return Ok(CoreProperties::default()),
        }

        Ok(Self::parse_core_xml(&xml))
    }

    fn parse_core_xml(xml: &str) -> CoreProperties {
        // Entity references split text events; each field is trimmed once at its end tag
        let mut reader = Reader::from_str(xml);

        let mut props = CoreProperties::default();
        let mut current: Option<Vec<u8>> = None;
        let mut value = String::new();
        let mut buf = Vec::new();

        loop {
            match reader.read_event_into(&mut buf) {
                Ok(Event::Start(e)) => {
                    current = Some(e.local_name().as_ref().to_vec());
                    value.clear();
                }
                Ok(Event::Text(e)) => {
                    if current.is_some() {
                        if let Ok(text) = std::str::from_utf8(e.as_ref()) {
                            value.push_str(text);
                        }
                    }
                }
                Ok(Event::GeneralRef(e)) => {
                    if current.is_some() {
                        match e.resolve_char_ref() {
                            Ok(Some(ch)) => value.push(ch),
                            _ => value.push_str(match &*e as &[u8] {
                                b"amp" => "&",
                                b"lt" => "<",
                                b"gt" => ">",
                                b"quot" => "\"",
                                b"apos" => "'",
                                _ => "",
                            }),
                        }
                    }
                }
                Ok(Event::End(_)) => {
                    let field = value.trim().to_string();
                    let slot = match current.take().as_deref() {
                        Some(b"title") => Some(&mut props.title),
                        Some(b"creator") => Some(&mut props.creator),
                        Some(b"created") => Some(&mut props.created),
                        _ => None,
                    };
                    if let Some(slot) = slot {
                        if !field.is_empty() {
                            *slot = Some(field);
                        }
                    }
                    value.clear();
                }
                Ok(Event::Eof) => break,
                Err(e) => {
                    debug!("Malformed core.xml: {}", e);
                    break;
                }
                _ => {}
            }
            buf.clear();
        }

        props
    }

    fn paragraph_text(paragraph: &docx_rs::Paragraph) -> String {
        let mut content = String::new();
        for child in &paragraph.children {
            Self::push_paragraph_child(&mut content, child);
        }
        content
    }

    fn push_paragraph_child(content: &mut String, child: &docx_rs::ParagraphChild) {
        match child {
            docx_rs::ParagraphChild::Run(run) => {
                for run_child in &run.children {
                    match run_child {
                        docx_rs::RunChild::Text(text) => content.push_str(&text.text),
                        docx_rs::RunChild::Tab(_) => content.push('\t'),
                        docx_rs::RunChild::Break(_) => content.push('\n'),
                        _ => {}
                    }
                }
            }
            docx_rs::ParagraphChild::Hyperlink(link) => {
                for inner in &link.children {
                    Self::push_paragraph_child(content, inner);
                }
            }
            _ => {}
        }
    }

    /// Cell texts per row; a cell's paragraphs are newline-joined, then trimmed.
    fn table_rows(table: &docx_rs::Table) -> Vec<Vec<String>> {
        table
            .rows
            .iter()
            .map(|table_child| {
                let docx_rs::TableChild::TableRow(row) = table_child;
                row.cells
                    .iter()
                    .map(|row_child| {
                        let docx_rs::TableRowChild::TableCell(cell) = row_child;
                        let paragraphs: Vec<String> = cell
                            .children
                            .iter()
                            .filter_map(|c| match c {
                                docx_rs::TableCellContent::Paragraph(p) => {
                                    Some(Self::paragraph_text(p))
                                }
                                _ => None,
                            })
                            .collect();
                        paragraphs.join("\n").trim().to_string()
                    })
                    .collect()
            })
            .collect()
    }
}
