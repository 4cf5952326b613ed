//! invoice-validator: compares user invoice data with what the extractor
//! reads from the uploaded PDF.

pub mod config;
pub mod handlers;
pub mod models;
pub mod services;
pub mod startup;
