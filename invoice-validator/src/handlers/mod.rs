pub mod health;
pub mod validate;

pub use health::{health_check, metrics_endpoint, readiness_check, root};
pub use validate::{validate_invoice, validate_invoice_function};
