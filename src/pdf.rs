//! PDF text extraction via PDFium (pdfium-render).
//!
//! The PDFium shared library is bound at call time: from `paths.pdfium_dir` when configured,
//! otherwise from the system library path.

use std::path::{Path, PathBuf};

use pdfium_render::prelude::*;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PdfError {
  #[error("failed to load PDFium: {0}")]
  LoadFailed(String),
  #[error("failed to open PDF: {0}")]
  OpenFailed(String),
  #[error("page error: {0}")]
  PageError(String),
}

/// Raw text source for package generation.
pub trait TextExtractor: Send + Sync {
  /// Text of every page, concatenated in page order.
  fn extract_text_from_bytes(&self, bytes: &[u8]) -> Result<String, PdfError>;

  fn extract_text(&self, path: &Path) -> Result<String, PdfError> {
    let bytes = std::fs::read(path).map_err(|e| PdfError::OpenFailed(format!("{}: {e}", path.display())))?;
    self.extract_text_from_bytes(&bytes)
  }
}

#[derive(Clone, Debug, Default)]
pub struct PdfExtractor {
  pdfium_dir: Option<PathBuf>,
}

impl PdfExtractor {
  pub fn new(pdfium_dir: Option<PathBuf>) -> Self {
    Self { pdfium_dir }
  }

  fn bind(&self) -> Result<Pdfium, PdfError> {
    let bindings = match &self.pdfium_dir {
      Some(dir) => Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path(dir)),
      None => Pdfium::bind_to_system_library(),
    }
    .map_err(|e| PdfError::LoadFailed(e.to_string()))?;
    Ok(Pdfium::new(bindings))
  }
}

impl TextExtractor for PdfExtractor {
  fn extract_text_from_bytes(&self, bytes: &[u8]) -> Result<String, PdfError> {
    let pdfium = self.bind()?;
    let document = pdfium
      .load_pdf_from_byte_slice(bytes, None)
      .map_err(|e| PdfError::OpenFailed(e.to_string()))?;

    let mut text = String::new();
    for page in document.pages().iter() {
      let page_text = page.text().map_err(|e| PdfError::PageError(e.to_string()))?;
      text.push_str(&page_text.all());
    }
    Ok(text)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  struct Pages(Vec<&'static str>);

  impl TextExtractor for Pages {
    fn extract_text_from_bytes(&self, _bytes: &[u8]) -> Result<String, PdfError> {
      Ok(self.0.concat())
    }
  }

  #[test]
  fn extract_text_reads_the_file_first() {
    let dir = tempfile::TempDir::new().unwrap();
    let path = dir.path().join("doc.pdf");
    std::fs::write(&path, b"%PDF-1.4").unwrap();
    let ex = Pages(vec!["page one\n", "page two\n"]);
    assert_eq!(ex.extract_text(&path).unwrap(), "page one\npage two\n");
    assert!(matches!(ex.extract_text(&dir.path().join("missing.pdf")), Err(PdfError::OpenFailed(_))));
  }
}
