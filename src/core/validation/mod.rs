//! Input validation
//!
//! Checks run before any write reaches the store, plus the date parsing
//! shared by the listing and search paths.

pub mod dates;
pub mod opening_hours;

pub use dates::{parse_date, parse_optional_date};
pub use opening_hours::validate_opening_hours;
