pub mod extract;
pub mod health;

pub use extract::extract_invoice;
pub use health::{health_check, metrics_endpoint, readiness_check, root};
