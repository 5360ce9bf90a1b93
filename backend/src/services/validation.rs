//! Input checks shared by the tracking and log services.

use crate::db::repository::{ErrorContext, RepositoryError, RepositoryResult};
use crate::models::{DayWindow, EventType, LicensePlate};

pub fn require_plate(raw: Option<&str>, operation: &str) -> RepositoryResult<LicensePlate> {
    raw.and_then(LicensePlate::parse).ok_or_else(|| {
        RepositoryError::validation_with_context(
            "licensePlate is required",
            ErrorContext::new(operation).with_entity("licensePlate"),
        )
    })
}

/// Non-blank string, trimmed.
pub fn require_text(raw: Option<&str>, field: &str, operation: &str) -> RepositoryResult<String> {
    raw.map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
        .ok_or_else(|| {
            RepositoryError::validation_with_context(
                format!("{} is required", field),
                ErrorContext::new(operation).with_entity(field),
            )
        })
}

/// Blank optional strings are treated as absent.
pub fn optional_text(raw: Option<&str>) -> Option<String> {
    raw.map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
}

pub fn check_confidence(
    value: Option<f64>,
    field: &str,
    operation: &str,
) -> RepositoryResult<Option<f64>> {
    match value {
        Some(v) if !(0.0..=1.0).contains(&v) => Err(RepositoryError::validation_with_context(
            format!("{} must be between 0 and 1", field),
            ErrorContext::new(operation)
                .with_entity(field)
                .with_details(format!("got {}", v)),
        )),
        other => Ok(other),
    }
}

pub fn parse_event_type(raw: &str, operation: &str) -> RepositoryResult<EventType> {
    EventType::parse(raw).ok_or_else(|| {
        RepositoryError::validation_with_context(
            format!("eventType must be 'entry' or 'exit', got '{}'", raw),
            ErrorContext::new(operation).with_entity("eventType"),
        )
    })
}

/// A day whose bounds overflow the calendar is a bad request, not a crash.
pub fn require_window(
    window: Option<DayWindow>,
    field: &str,
    operation: &str,
) -> RepositoryResult<DayWindow> {
    window.ok_or_else(|| {
        RepositoryError::validation_with_context(
            format!("{} is outside the supported date range", field),
            ErrorContext::new(operation).with_entity(field),
        )
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_confidence_bounds_are_inclusive() {
        assert_eq!(check_confidence(Some(0.0), "confidence", "t").unwrap(), Some(0.0));
        assert_eq!(check_confidence(Some(1.0), "confidence", "t").unwrap(), Some(1.0));
        assert_eq!(check_confidence(None, "confidence", "t").unwrap(), None);
        assert!(check_confidence(Some(1.01), "confidence", "t").is_err());
        assert!(check_confidence(Some(-0.1), "confidence", "t").is_err());
        assert!(check_confidence(Some(f64::NAN), "confidence", "t").is_err());
    }

    #[test]
    fn test_blank_text_is_missing() {
        assert!(require_text(Some("   "), "cameraId", "t").is_err());
        assert_eq!(require_text(Some(" CAM01 "), "cameraId", "t").unwrap(), "CAM01");
        assert_eq!(optional_text(Some("")), None);
    }

    #[test]
    fn test_missing_window_is_validation_error() {
        let err = require_window(None, "date", "history_for_day").unwrap_err();
        assert!(matches!(err, RepositoryError::ValidationError { .. }));
        assert_eq!(err.context().entity.as_deref(), Some("date"));
    }

    #[test]
    fn test_require_plate_normalizes() {
        assert_eq!(require_plate(Some(" 30a-12345"), "t").unwrap().as_str(), "30A-12345");
        assert!(matches!(
            require_plate(None, "t"),
            Err(RepositoryError::ValidationError { .. })
        ));
    }
}
