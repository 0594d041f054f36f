use thiserror::Error;

#[derive(Debug, Error)]
pub enum PdfPressError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("PDF read error: {0}")]
    PdfReadError(String),

    #[error("PDF write error: {0}")]
    PdfWriteError(String),

    #[error("Content stream error: {0}")]
    ContentStreamError(String),

    #[error("Render error: {0}")]
    RenderError(String),

    #[error("JPEG encode error: {0}")]
    JpegEncodeError(String),

    #[error("Image decode error: {0}")]
    ImageDecodeError(String),

    #[error("Encrypted PDF: {0}")]
    EncryptedError(String),

    #[error("Cache error: {0}")]
    CacheError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

/// Generates factory methods for [`PdfPressError`] variants that wrap a `String`.
macro_rules! error_constructors {
    ($(
        $(#[doc = $doc:expr])*
        $method:ident => $variant:ident
    ),* $(,)?) => {
        impl PdfPressError {
            $(
                $(#[doc = $doc])*
                pub fn $method(msg: impl Into<String>) -> Self {
                    Self::$variant(msg.into())
                }
            )*
        }
    };
}

error_constructors! {
    /// Create a configuration error.
    config => ConfigError,
    /// Create a PDF read error.
    pdf_read => PdfReadError,
    /// Create a PDF write error.
    pdf_write => PdfWriteError,
    /// Create a content stream error.
    content_stream => ContentStreamError,
    /// Create a render error.
    render => RenderError,
    /// Create a JPEG encode error.
    jpeg_encode => JpegEncodeError,
    /// Create an image decode error.
    image_decode => ImageDecodeError,
    /// Create an encrypted-document error.
    encrypted => EncryptedError,
    /// Create a cache error.
    cache => CacheError,
}

impl From<lopdf::Error> for PdfPressError {
    fn from(e: lopdf::Error) -> Self {
        Self::PdfReadError(e.to_string())
    }
}

impl From<serde_json::Error> for PdfPressError {
    fn from(e: serde_json::Error) -> Self {
        Self::CacheError(e.to_string())
    }
}

impl From<serde_yml::Error> for PdfPressError {
    fn from(e: serde_yml::Error) -> Self {
        Self::ConfigError(e.to_string())
    }
}

#[cfg(feature = "pdfium")]
impl From<pdfium_render::prelude::PdfiumError> for PdfPressError {
    fn from(e: pdfium_render::prelude::PdfiumError) -> Self {
        Self::RenderError(e.to_string())
    }
}

impl From<image::ImageError> for PdfPressError {
    fn from(e: image::ImageError) -> Self {
        Self::ImageDecodeError(e.to_string())
    }
}

impl From<jpeg_encoder::EncodingError> for PdfPressError {
    fn from(e: jpeg_encoder::EncodingError) -> Self {
        Self::JpegEncodeError(e.to_string())
    }
}

impl PdfPressError {
    /// Short machine-friendly label used in skip notes and logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::ConfigError(_) => "config",
            Self::PdfReadError(_) => "pdf_read",
            Self::PdfWriteError(_) => "pdf_write",
            Self::ContentStreamError(_) => "content_stream",
            Self::RenderError(_) => "render",
            Self::JpegEncodeError(_) => "jpeg_encode",
            Self::ImageDecodeError(_) => "image_decode",
            Self::EncryptedError(_) => "encrypted",
            Self::CacheError(_) => "cache",
            Self::IoError(_) => "io",
        }
    }
}

pub type Result<T> = std::result::Result<T, PdfPressError>;
