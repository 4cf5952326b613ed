pub mod validation;

pub use validation::{
    FieldComparison, InvoiceInputError, LineItemAnalysis, MatchStatus, UserInvoice,
    ValidationReport,
};
