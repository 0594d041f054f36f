// pdfium-render wrapper: page -> DynamicImage (in-memory only)

use std::path::PathBuf;

use image::DynamicImage;
use pdfium_render::prelude::*;

use super::PageRenderer;

/// Resolves the path to the pdfium shared library.
///
/// Search order:
/// 1. `PDFIUM_DYNAMIC_LIB_PATH` environment variable
/// 2. `vendor/pdfium/lib/` relative to the project root (for development)
fn resolve_pdfium_lib_path() -> crate::error::Result<PathBuf> {
    if let Ok(path) = std::env::var("PDFIUM_DYNAMIC_LIB_PATH") {
        let p = PathBuf::from(&path);
        if p.exists() {
            return Ok(p);
        }
        return Err(crate::error::PdfPressError::render(format!(
            "PDFIUM_DYNAMIC_LIB_PATH is set to '{}' but the path does not exist",
            path
        )));
    }

    if let Ok(manifest_dir) = std::env::var("CARGO_MANIFEST_DIR") {
        let vendor_path = PathBuf::from(&manifest_dir).join("vendor/pdfium/lib");
        if vendor_path.exists() {
            return Ok(vendor_path);
        }
    }

    Err(crate::error::PdfPressError::render(
        "pdfium library not found: set PDFIUM_DYNAMIC_LIB_PATH or place libpdfium.so in vendor/pdfium/lib/",
    ))
}

/// Renders pages with a dynamically loaded pdfium.
///
/// The library location is resolved once; the pdfium bindings, document and
/// page are created per call and dropped before `render` returns.
#[derive(Debug, Clone)]
pub struct PdfiumRenderer {
    lib_path: PathBuf,
}

impl PdfiumRenderer {
    /// Locates the pdfium library. Fails when it cannot be found.
    pub fn new() -> crate::error::Result<Self> {
        Ok(Self {
            lib_path: resolve_pdfium_lib_path()?,
        })
    }

    fn bind(&self) -> crate::error::Result<Pdfium> {
        let lib_path_str = self.lib_path.to_str().ok_or_else(|| {
            crate::error::PdfPressError::render("pdfium library path contains non-UTF-8 characters")
        })?;
        let bindings =
            Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path(lib_path_str))
                .map_err(|e| crate::error::PdfPressError::render(e.to_string()))?;
        Ok(Pdfium::new(bindings))
    }
}

impl PageRenderer for PdfiumRenderer {
    /// # Errors
    /// Returns `PdfPressError::RenderError` if `dpi` is zero, pdfium cannot be bound, the PDF
    /// cannot be opened, the page index is out of range or rendering fails.
    fn render(&self, pdf: &[u8], page_index: u32, dpi: u32) -> crate::error::Result<DynamicImage> {
        if dpi == 0 {
            return Err(crate::error::PdfPressError::render("dpi must be positive"));
        }
        let pdfium = self.bind()?;

        let document = pdfium
            .load_pdf_from_byte_slice(pdf, None)
            .map_err(|e| crate::error::PdfPressError::render(e.to_string()))?;

        let page_index_u16 = u16::try_from(page_index)
            .map_err(|_| crate::error::PdfPressError::render("page index exceeds u16 range"))?;

        let page = document
            .pages()
            .get(page_index_u16)
            .map_err(|e| crate::error::PdfPressError::render(e.to_string()))?;

        // 1 point = 1/72 inch
        let width_px = (page.width().value * dpi as f32 / 72.0).round().max(1.0) as i32;
        let height_px = (page.height().value * dpi as f32 / 72.0).round().max(1.0) as i32;

        let config = PdfRenderConfig::new()
            .set_target_width(width_px)
            .set_target_height(height_px);

        let bitmap = page
            .render_with_config(&config)
            .map_err(|e| crate::error::PdfPressError::render(e.to_string()))?;

        Ok(bitmap.as_image())
    }
}
