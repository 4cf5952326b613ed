pub mod archive;
pub mod extraction;
pub mod pdf;

pub use archive::UploadArchive;
pub use extraction::{ExtractionError, InvoiceExtractor};
pub use pdf::{FixedTextExtractor, PdfReadError, PdfTextExtractor, TextExtractor};
