//! Document Conversion Abstraction
//!
//! Rasterizing a PDF happens outside the core: pdf.js in the browser, or any
//! renderer a native host wants to plug in. The core only needs an ordered
//! list of page images and a chance to report progress between pages, so the
//! contract is split in two steps:
//!
//! 1. [`DocumentConverter::open`] parses the bytes and reports the page count.
//! 2. [`RenderedDocument::render_page`] produces one page at a time, in order.
//!
//! A document the converter cannot read fails with
//! [`BridgeError::InvalidDocument`](crate::error::BridgeError::InvalidDocument)
//! carrying a human-readable reason.

use bytes::Bytes;

use crate::error::Result;
use crate::platform::{PlatformSend, PlatformSendSync};

/// One rendered page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageImage {
    /// Encoding of `data`, e.g. `image/png`
    pub mime_type: String,
    /// Encoded image bytes
    pub data: Bytes,
}

impl PageImage {
    pub fn new(mime_type: impl Into<String>, data: impl Into<Bytes>) -> Self {
        Self {
            mime_type: mime_type.into(),
            data: data.into(),
        }
    }

    pub fn png(data: impl Into<Bytes>) -> Self {
        Self::new("image/png", data)
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// Entry point of the conversion collaborator.
#[cfg_attr(target_arch = "wasm32", async_trait::async_trait(?Send))]
#[cfg_attr(not(target_arch = "wasm32"), async_trait::async_trait)]
pub trait DocumentConverter: PlatformSendSync {
    /// Parse a raw document and prepare it for rendering.
    ///
    /// # Errors
    ///
    /// `InvalidDocument` when the bytes are corrupt or in an unsupported
    /// format; any other variant when the converter itself is unavailable.
    async fn open(&self, document: Bytes) -> Result<Box<dyn RenderedDocument>>;
}

/// A parsed document ready to be rendered page by page.
#[cfg_attr(target_arch = "wasm32", async_trait::async_trait(?Send))]
#[cfg_attr(not(target_arch = "wasm32"), async_trait::async_trait)]
pub trait RenderedDocument: PlatformSend {
    /// Number of pages in the document.
    fn page_count(&self) -> usize;

    /// Render the page at zero-based `index`.
    async fn render_page(&mut self, index: usize) -> Result<PageImage>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_image_helpers() {
        let page = PageImage::png(vec![1u8, 2, 3]);
        assert_eq!(page.mime_type, "image/png");
        assert_eq!(page.len(), 3);
        assert!(!page.is_empty());
    }
}
