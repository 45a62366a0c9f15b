//! Reading PDFs: page text and page rasterization.
//!
//! `PdfiumEngine` binds the PDFium shared library on every call; a bound
//! `Pdfium` handle never leaves the thread that created it.

use image::{GenericImageView, ImageOutputFormat};
use pdfium_render::prelude::*;
use std::io::Cursor;

use super::ConvertError;

pub const DEFAULT_RENDER_DPI: u32 = 150;

/// Largest width or height of a rasterized page
const MAX_DIMENSION_PX: u32 = 4096;

const POINTS_PER_INCH: f32 = 72.0;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedPage {
    pub png: Vec<u8>,
    pub width: u32,
    pub height: u32,
}

/// The operations the converters need from a PDF library
pub trait PdfEngine: Send + Sync {
    /// Plain text of every page, in page order
    fn page_texts(&self, pdf: &[u8]) -> Result<Vec<String>, ConvertError>;

    /// Every page as a PNG image, in page order
    fn render_pages(&self, pdf: &[u8]) -> Result<Vec<RenderedPage>, ConvertError>;
}

pub struct PdfiumEngine {
    dpi: u32,
}

impl Default for PdfiumEngine {
    fn default() -> Self {
        Self::new(DEFAULT_RENDER_DPI)
    }
}

impl PdfiumEngine {
    pub fn new(dpi: u32) -> Self {
        Self { dpi: dpi.max(1) }
    }
}

/// Bind PDFium from `PDFIUM_DYNAMIC_LIB_PATH`, next to the executable, or
/// the system library path, in that order
fn load_pdfium() -> Result<Pdfium, ConvertError> {
    if let Ok(path) = std::env::var("PDFIUM_DYNAMIC_LIB_PATH") {
        log::debug!("loading PDFium from {path}");
        let bindings = Pdfium::bind_to_library(&path)
            .map_err(|e| ConvertError::Pdf(format!("failed to load PDFium from {path}: {e}")))?;
        return Ok(Pdfium::new(bindings));
    }

    if let Some(dir) = std::env::current_exe().ok().and_then(|exe| exe.parent().map(|p| p.to_path_buf())) {
        let lib_path = Pdfium::pdfium_platform_library_name_at_path(dir.to_string_lossy().as_ref());
        if let Ok(bindings) = Pdfium::bind_to_library(&lib_path) {
            return Ok(Pdfium::new(bindings));
        }
    }

    let bindings = Pdfium::bind_to_system_library().map_err(|e| {
        ConvertError::Pdf(format!(
            "PDFium library not found; set PDFIUM_DYNAMIC_LIB_PATH or install PDFium: {e}"
        ))
    })?;
    Ok(Pdfium::new(bindings))
}

fn map_load_error(e: PdfiumError) -> ConvertError {
    let message = e.to_string();
    let lower = message.to_lowercase();
    if lower.contains("password") || lower.contains("encrypt") {
        ConvertError::Pdf("the PDF is password protected".to_string())
    } else {
        ConvertError::Pdf(format!("failed to load PDF: {message}"))
    }
}

/// Pixel size for a page, capped at [`MAX_DIMENSION_PX`] with the aspect
/// ratio kept
fn render_dimensions(width_points: f32, height_points: f32, dpi: u32) -> (u32, u32) {
    let scale = dpi as f32 / POINTS_PER_INCH;
    let raw_w = (width_points * scale).max(1.0);
    let raw_h = (height_points * scale).max(1.0);

    let largest = raw_w.max(raw_h);
    if largest > MAX_DIMENSION_PX as f32 {
        let ratio = MAX_DIMENSION_PX as f32 / largest;
        (
            ((raw_w * ratio) as u32).clamp(1, MAX_DIMENSION_PX),
            ((raw_h * ratio) as u32).clamp(1, MAX_DIMENSION_PX),
        )
    } else {
        (raw_w as u32, raw_h as u32)
    }
}

impl PdfEngine for PdfiumEngine {
    fn page_texts(&self, pdf: &[u8]) -> Result<Vec<String>, ConvertError> {
        let pdfium = load_pdfium()?;
        let document = pdfium
            .load_pdf_from_byte_slice(pdf, None)
            .map_err(map_load_error)?;

        let mut texts = Vec::new();
        for (index, page) in document.pages().iter().enumerate() {
            let text = page
                .text()
                .map_err(|e| ConvertError::Pdf(format!("page {}: text extraction failed: {e}", index + 1)))?;
            texts.push(text.all());
        }
        Ok(texts)
    }

    fn render_pages(&self, pdf: &[u8]) -> Result<Vec<RenderedPage>, ConvertError> {
        let pdfium = load_pdfium()?;
        let document = pdfium
            .load_pdf_from_byte_slice(pdf, None)
            .map_err(map_load_error)?;

        let mut rendered = Vec::new();
        for (index, page) in document.pages().iter().enumerate() {
            let (target_w, target_h) = render_dimensions(page.width().value, page.height().value, self.dpi);
            let config = PdfRenderConfig::new()
                .set_target_width(target_w as i32)
                .set_maximum_height(target_h as i32);

            let bitmap = page
                .render_with_config(&config)
                .map_err(|e| ConvertError::Pdf(format!("page {}: rendering failed: {e}", index + 1)))?;
            let image = bitmap.as_image();
            let (width, height) = image.dimensions();

            let mut cursor = Cursor::new(Vec::new());
            image
                .write_to(&mut cursor, ImageOutputFormat::Png)
                .map_err(|e| ConvertError::Render(format!("PNG encoding failed: {e}")))?;

            log::debug!("rendered PDF page {} at {width}x{height}", index + 1);
            rendered.push(RenderedPage {
                png: cursor.into_inner(),
                width,
                height,
            });
        }
        Ok(rendered)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn a4_at_150_dpi() {
        let (w, h) = render_dimensions(595.0, 842.0, 150);
        assert!((1230..1245).contains(&w), "width {w}");
        assert!((1750..1760).contains(&h), "height {h}");
    }

    #[test]
    fn oversized_pages_are_capped() {
        let (w, h) = render_dimensions(5000.0, 7000.0, 150);
        assert!(h <= MAX_DIMENSION_PX && h >= MAX_DIMENSION_PX - 1, "height {h}");
        assert!(w < h);
    }
}
