//! Document format conversion.
//!
//! Six one-way conversions between DOCX, XLSX, PPTX and PDF. None of them
//! preserve layout: each output is a best-effort rendition and carries a
//! `fidelity_note` saying what was lost.

pub mod ooxml;
pub mod pdf;
pub mod pptx;
pub mod render;
pub mod xlsx;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;

use crate::csv_json::escape_field;
use crate::history::{self, HistoryEntry};
use crate::storage::{Storage, StorageError};
use pdf::{PdfEngine, PdfiumEngine};

/// Default upload limit; uploads above the limit are rejected before any parsing
pub const MAX_FILE_SIZE: usize = 25 * 1024 * 1024;

#[derive(Debug, Error)]
pub enum ConvertError {
    #[error("conversion not implemented: {0}")]
    NotImplemented(String),

    #[error("file is too large ({size} bytes, limit is {limit} bytes)")]
    FileTooLarge { size: usize, limit: usize },

    #[error("{file_name} is not a supported input; expected {expected}")]
    UnsupportedInput { file_name: String, expected: String },

    #[error("nothing to convert: {0}")]
    EmptyInput(String),

    #[error("invalid archive: {0}")]
    Archive(String),

    #[error("invalid XML: {0}")]
    Xml(String),

    #[error("spreadsheet error: {0}")]
    Spreadsheet(String),

    #[error("PDF error: {0}")]
    Pdf(String),

    #[error("render error: {0}")]
    Render(String),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ConversionKind {
    DocxToPdf,
    PdfToDocx,
    XlsxToPdf,
    PdfToXlsx,
    PptxToPdf,
    PdfToPptx,
}

/// What a converter page offers and which uploads it takes
#[derive(Debug, Clone, Copy, Serialize)]
pub struct ConversionOption {
    pub label: &'static str,
    pub source_format: &'static str,
    pub target_format: &'static str,
    pub accepted: &'static [&'static str],
}

const PDF_ACCEPTED: &[&str] = &[".pdf", "application/pdf"];

impl ConversionKind {
    pub const ALL: [ConversionKind; 6] = [
        ConversionKind::DocxToPdf,
        ConversionKind::PdfToDocx,
        ConversionKind::XlsxToPdf,
        ConversionKind::PdfToXlsx,
        ConversionKind::PptxToPdf,
        ConversionKind::PdfToPptx,
    ];

    /// Route key, also used as the tool id and history scope
    pub fn key(&self) -> &'static str {
        match self {
            ConversionKind::DocxToPdf => "docx-to-pdf",
            ConversionKind::PdfToDocx => "pdf-to-docx",
            ConversionKind::XlsxToPdf => "xlsx-to-pdf",
            ConversionKind::PdfToXlsx => "pdf-to-xlsx",
            ConversionKind::PptxToPdf => "pptx-to-pdf",
            ConversionKind::PdfToPptx => "pdf-to-pptx",
        }
    }

    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.key() == key)
    }

    pub fn option(&self) -> ConversionOption {
        match self {
            ConversionKind::DocxToPdf => ConversionOption {
                label: "Word to PDF",
                source_format: "DOCX",
                target_format: "PDF",
                accepted: &[
                    ".docx",
                    "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
                ],
            },
            ConversionKind::PdfToDocx => ConversionOption {
                label: "PDF to Word",
                source_format: "PDF",
                target_format: "TXT",
                accepted: PDF_ACCEPTED,
            },
            ConversionKind::XlsxToPdf => ConversionOption {
                label: "Excel to PDF",
                source_format: "XLSX",
                target_format: "PDF",
                accepted: &[
                    ".xlsx",
                    "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
                ],
            },
            ConversionKind::PdfToXlsx => ConversionOption {
                label: "PDF to Excel",
                source_format: "PDF",
                target_format: "XLSX",
                accepted: PDF_ACCEPTED,
            },
            ConversionKind::PptxToPdf => ConversionOption {
                label: "PowerPoint to PDF",
                source_format: "PPTX",
                target_format: "PDF",
                accepted: &[
                    ".pptx",
                    "application/vnd.openxmlformats-officedocument.presentationml.presentation",
                ],
            },
            ConversionKind::PdfToPptx => ConversionOption {
                label: "PDF to PowerPoint",
                source_format: "PDF",
                target_format: "PPTX",
                accepted: PDF_ACCEPTED,
            },
        }
    }

    pub fn fidelity_note(&self) -> &'static str {
        match self {
            ConversionKind::DocxToPdf => {
                "Text only: paragraphs are reflowed in a fixed-width font; images, tables and styling are not carried over."
            }
            ConversionKind::PdfToDocx => {
                "Delivered as plain text with one section per page; layout, fonts and images are not carried over."
            }
            ConversionKind::XlsxToPdf => {
                "Only the first worksheet is rendered, as a fixed-width table of cell values; formulas, formatting and charts are not carried over."
            }
            ConversionKind::PdfToXlsx => {
                "One row per page with one cell per line of text; table structure is not detected."
            }
            ConversionKind::PptxToPdf => {
                "Slide text only; layouts, images and animations are not carried over."
            }
            ConversionKind::PdfToPptx => {
                "Each slide holds a picture of one page; the text is not editable."
            }
        }
    }
}

impl fmt::Display for ConversionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

#[derive(Debug, Clone)]
pub struct InputFile {
    pub name: String,
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

impl InputFile {
    pub fn new(name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            content_type: None,
            bytes,
        }
    }

    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    fn extension(&self) -> Option<String> {
        Path::new(&self.name)
            .extension()
            .map(|ext| format!(".{}", ext.to_string_lossy().to_lowercase()))
    }

    fn stem(&self) -> String {
        Path::new(&self.name)
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .filter(|stem| !stem.is_empty())
            .unwrap_or_else(|| "document".to_string())
    }

    fn is_accepted(&self, option: &ConversionOption) -> bool {
        let by_extension = self
            .extension()
            .is_some_and(|ext| option.accepted.contains(&ext.as_str()));
        let by_type = self
            .content_type
            .as_deref()
            .is_some_and(|mime| option.accepted.contains(&mime));
        by_extension || by_type
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ConvertedFile {
    pub file_name: String,
    pub content_type: &'static str,
    #[serde(skip)]
    pub bytes: Vec<u8>,
    pub fidelity_note: &'static str,
    /// Text rendition shown next to the download, when there is one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text_preview: Option<String>,
}

const PDF_MIME: &str = "application/pdf";
const TEXT_MIME: &str = "text/plain; charset=utf-8";
const XLSX_MIME: &str = "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";
const PPTX_MIME: &str = "application/vnd.openxmlformats-officedocument.presentationml.presentation";

/// Runs conversions; the PDF library sits behind [`PdfEngine`]
#[derive(Clone)]
pub struct Converter {
    engine: Arc<dyn PdfEngine>,
    max_file_size: usize,
}

impl Default for Converter {
    fn default() -> Self {
        Self::new(PdfiumEngine::default())
    }
}

impl Converter {
    pub fn new(engine: impl PdfEngine + 'static) -> Self {
        Self {
            engine: Arc::new(engine),
            max_file_size: MAX_FILE_SIZE,
        }
    }

    pub fn with_max_file_size(mut self, limit: usize) -> Self {
        self.max_file_size = limit;
        self
    }

    pub fn max_file_size(&self) -> usize {
        self.max_file_size
    }

    /// Convert by route key; unknown keys are an explicit error
    pub fn dispatch(&self, key: &str, file: &InputFile) -> Result<ConvertedFile, ConvertError> {
        let kind = ConversionKind::from_key(key)
            .ok_or_else(|| ConvertError::NotImplemented(key.to_string()))?;
        self.convert(kind, file)
    }

    pub fn convert(&self, kind: ConversionKind, file: &InputFile) -> Result<ConvertedFile, ConvertError> {
        if file.bytes.len() > self.max_file_size {
            return Err(ConvertError::FileTooLarge {
                size: file.bytes.len(),
                limit: self.max_file_size,
            });
        }
        let option = kind.option();
        if !file.is_accepted(&option) {
            return Err(ConvertError::UnsupportedInput {
                file_name: file.name.clone(),
                expected: option.accepted.join(", "),
            });
        }
        if file.bytes.is_empty() {
            return Err(ConvertError::EmptyInput(format!("{} is empty", file.name)));
        }

        log::info!("converting {} ({} bytes) with {kind}", file.name, file.bytes.len());
        let stem = file.stem();
        let (extension, content_type, bytes, text_preview) = match kind {
            ConversionKind::DocxToPdf => {
                let paragraphs = ooxml::docx_paragraphs(&file.bytes)?;
                let pdf = render::text_pdf(&stem, None, &paragraphs)?;
                ("pdf", PDF_MIME, pdf, None)
            }
            ConversionKind::PdfToDocx => {
                let text = self.pdf_to_text(&file.bytes)?;
                ("txt", TEXT_MIME, text.into_bytes(), None)
            }
            ConversionKind::XlsxToPdf => {
                let rows = xlsx::read_first_sheet(&file.bytes)?;
                if rows.is_empty() {
                    return Err(ConvertError::EmptyInput("the first worksheet is empty".to_string()));
                }
                ("pdf", PDF_MIME, render::table_pdf(&stem, &rows)?, None)
            }
            ConversionKind::PdfToXlsx => {
                let rows = self.pdf_to_rows(&file.bytes)?;
                let csv = rows
                    .iter()
                    .map(|row| row.iter().map(|item| escape_field(item)).collect::<Vec<_>>().join(","))
                    .collect::<Vec<_>>()
                    .join("\n");
                ("xlsx", XLSX_MIME, xlsx::write_rows(&rows)?, Some(csv))
            }
            ConversionKind::PptxToPdf => {
                let (heading, lines) = pptx_outline(&file.bytes);
                ("pdf", PDF_MIME, render::text_pdf(&stem, Some(heading.as_str()), &lines)?, None)
            }
            ConversionKind::PdfToPptx => {
                let pages = self.engine.render_pages(&file.bytes)?;
                ("pptx", PPTX_MIME, pptx::build_pptx(&pages)?, None)
            }
        };

        Ok(ConvertedFile {
            file_name: format!("{stem}.{extension}"),
            content_type,
            bytes,
            fidelity_note: kind.fidelity_note(),
            text_preview,
        })
    }

    fn pdf_to_text(&self, pdf: &[u8]) -> Result<String, ConvertError> {
        let pages = self.engine.page_texts(pdf)?;
        if pages.is_empty() {
            return Err(ConvertError::EmptyInput("the PDF has no pages".to_string()));
        }
        Ok(pages
            .iter()
            .enumerate()
            .map(|(i, text)| format!("--- Page {} ---\n{}\n", i + 1, text.trim_end()))
            .collect::<Vec<_>>()
            .join("\n"))
    }

    // One row per page, one item per non-blank line
    fn pdf_to_rows(&self, pdf: &[u8]) -> Result<Vec<Vec<String>>, ConvertError> {
        let pages = self.engine.page_texts(pdf)?;
        if pages.is_empty() {
            return Err(ConvertError::EmptyInput("the PDF has no pages".to_string()));
        }
        Ok(pages
            .iter()
            .map(|text| {
                text.lines()
                    .map(str::trim)
                    .filter(|line| !line.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .collect())
    }

    /// Run a conversion and append its outcome to the tool's history.
    ///
    /// A failure to write history is logged and does not change the result.
    pub fn convert_and_record(
        &self,
        storage: &mut Storage,
        key: &str,
        file: &InputFile,
    ) -> Result<ConvertedFile, ConvertError> {
        let result = self.dispatch(key, file);
        if let Some(kind) = ConversionKind::from_key(key) {
            record_outcome(storage, kind, &file.name, &result);
        }
        result
    }
}

/// Slide text laid out as "Slide N" sections, or a placeholder page when the
/// presentation cannot be read
fn pptx_outline(bytes: &[u8]) -> (String, Vec<String>) {
    match ooxml::pptx_slide_texts(bytes) {
        Ok(slides) if !slides.is_empty() => {
            let mut lines = Vec::new();
            for (i, paragraphs) in slides.iter().enumerate() {
                lines.push(format!("Slide {}", i + 1));
                lines.extend(paragraphs.iter().cloned());
                lines.push(String::new());
            }
            ("Presentation text".to_string(), lines)
        }
        Ok(_) => {
            log::warn!("presentation has no slides, producing placeholder PDF");
            placeholder("The presentation does not contain any slides.")
        }
        Err(e) => {
            log::warn!("could not read presentation text: {e}");
            placeholder(&format!("The presentation text could not be extracted ({e})."))
        }
    }
}

fn placeholder(reason: &str) -> (String, Vec<String>) {
    (
        "Presentation could not be converted".to_string(),
        vec![
            reason.to_string(),
            String::new(),
            "Try saving the file again as .pptx and uploading it once more.".to_string(),
        ],
    )
}

/// History entry for a finished conversion
pub fn history_entry(
    kind: ConversionKind,
    file_name: &str,
    result: &Result<ConvertedFile, ConvertError>,
) -> HistoryEntry {
    let option = kind.option();
    match result {
        Ok(_) => HistoryEntry::success(file_name, option.source_format, option.target_format),
        Err(e) => HistoryEntry::error(
            file_name,
            option.source_format,
            option.target_format,
            &e.to_string(),
        ),
    }
}

pub fn record_outcome(
    storage: &mut Storage,
    kind: ConversionKind,
    file_name: &str,
    result: &Result<ConvertedFile, ConvertError>,
) {
    if let Err(e) = result {
        log::error!("{kind} conversion of {file_name} failed: {e}");
    }
    let entry = history_entry(kind, file_name, result);
    if let Err(e) = history::record(storage, kind.key(), entry) {
        log::warn!("could not record {kind} history: {e}");
    }
}
