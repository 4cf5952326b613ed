pub mod extractor_client;
pub mod validation;

pub use extractor_client::{ExtractorClient, UpstreamError};
pub use validation::{InvoiceValidator, ValidationError};
