//! Request parameter validation helpers.

use crate::domain::ports::{Page, PageError};
use crate::domain::{Error, PumpName};

/// Parse a path segment into a validated pump name.
pub fn parse_pump_name(raw: &str) -> Result<PumpName, Error> {
    PumpName::new(raw)
        .map_err(|err| Error::invalid_request(format!("invalid pump name '{raw}': {err}")))
}

/// Build a pagination window from query parameters.
pub fn parse_page(skip: Option<i64>, limit: Option<i64>) -> Result<Page, Error> {
    Page::new(skip, limit).map_err(|err| match err {
        PageError::NegativeSkip | PageError::NonPositiveLimit => {
            Error::invalid_request(err.to_string())
        }
    })
}
