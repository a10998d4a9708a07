//! Repository utilities.

use diesel::result::DatabaseErrorInformation;

/// Simple error info wrapper for database errors.
#[derive(Debug)]
pub struct DbErrorInfo(pub String);

impl DatabaseErrorInformation for DbErrorInfo {
    fn message(&self) -> &str {
        &self.0
    }
    fn details(&self) -> Option<&str> {
        None
    }
    fn hint(&self) -> Option<&str> {
        None
    }
    fn table_name(&self) -> Option<&str> {
        None
    }
    fn column_name(&self) -> Option<&str> {
        None
    }
    fn constraint_name(&self) -> Option<&str> {
        None
    }
    fn statement_position(&self) -> Option<i32> {
        None
    }
}

/// Convert any displayable error to a diesel error with proper message.
pub fn to_diesel_error(e: impl std::fmt::Display) -> diesel::result::Error {
    diesel::result::Error::DatabaseError(
        diesel::result::DatabaseErrorKind::Unknown,
        Box::new(DbErrorInfo(e.to_string())),
    )
}

/// Convert an unsigned model value to an SQLite INTEGER column.
pub fn to_sql_int(value: u32) -> Result<i32, diesel::result::Error> {
    i32::try_from(value).map_err(|_| to_diesel_error(format!("value {} out of range", value)))
}

/// Convert an SQLite INTEGER column back to an unsigned model value.
///
/// Negative values never get written by this crate; they clamp to zero.
pub fn from_sql_int(value: i32) -> u32 {
    u32::try_from(value).unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_to_diesel_error_keeps_message() {
        let err = to_diesel_error("connection refused");
        assert!(err.to_string().contains("connection refused"));
    }

    #[test]
    fn test_sql_int_conversions() {
        assert_eq!(to_sql_int(42).unwrap(), 42);
        assert!(to_sql_int(u32::MAX).is_err());
        assert_eq!(from_sql_int(-3), 0);
        assert_eq!(from_sql_int(7), 7);
    }
}
