//! Terminal output

pub mod reporter;
pub mod table;

pub use reporter::ConsoleReporter;
