use crate::error::AppError;
use diesel::result::{DatabaseErrorKind, Error as DieselError};

/// Utility for converting database errors to structured AppError variants.
///
/// The only unique constraint in the schema is the trigger primary key, so a
/// unique violation always means a job id collision.
pub struct DatabaseErrorConverter;

impl DatabaseErrorConverter {
    /// Converts a Diesel error to an appropriate AppError variant.
    ///
    /// # Arguments
    /// * `error` - The Diesel error to convert
    /// * `operation` - Description of the database operation that failed
    pub fn convert_diesel_error(error: DieselError, operation: &str) -> AppError {
        match error {
            DieselError::DatabaseError(kind, info) => {
                Self::convert_database_error(kind, info.as_ref(), operation)
            }
            DieselError::NotFound => AppError::NotFound {
                entity: "resource".to_string(),
                field: "id".to_string(),
                value: "unknown".to_string(),
            },
            other => AppError::Database {
                operation: operation.to_string(),
                source: anyhow::Error::from(other),
            },
        }
    }

    fn convert_database_error(
        kind: DatabaseErrorKind,
        info: &(dyn diesel::result::DatabaseErrorInformation + Send + Sync),
        operation: &str,
    ) -> AppError {
        let message = info.message();

        match kind {
            DatabaseErrorKind::UniqueViolation => AppError::Duplicate {
                entity: info.table_name().unwrap_or("scheduled_triggers").to_string(),
                field: info.column_name().unwrap_or("job_id").to_string(),
                value: info.constraint_name().unwrap_or("primary key").to_string(),
            },
            DatabaseErrorKind::NotNullViolation => AppError::Validation {
                field: info.column_name().unwrap_or("unknown").to_string(),
                reason: format!("Field is required: {}", message),
            },
            DatabaseErrorKind::ClosedConnection => AppError::ConnectionPool {
                source: anyhow::Error::msg(message.to_string()),
            },
            _ => AppError::Database {
                operation: operation.to_string(),
                source: anyhow::Error::msg(format!("Database error: {}", message)),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Mock database error information for testing
    struct MockDatabaseErrorInfo {
        message: String,
        constraint_name: Option<String>,
    }

    impl diesel::result::DatabaseErrorInformation for MockDatabaseErrorInfo {
        fn message(&self) -> &str {
            &self.message
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
            self.constraint_name.as_deref()
        }

        fn statement_position(&self) -> Option<i32> {
            None
        }
    }

    fn db_error(kind: DatabaseErrorKind, message: &str, constraint: Option<&str>) -> DieselError {
        DieselError::DatabaseError(
            kind,
            Box::new(MockDatabaseErrorInfo {
                message: message.to_string(),
                constraint_name: constraint.map(str::to_string),
            }),
        )
    }

    #[test]
    fn test_convert_not_found_error() {
        let result = DatabaseErrorConverter::convert_diesel_error(DieselError::NotFound, "find trigger");
        assert!(matches!(result, AppError::NotFound { entity, .. } if entity == "resource"));
    }

    #[test]
    fn test_convert_unique_violation() {
        let error = db_error(
            DatabaseErrorKind::UniqueViolation,
            "duplicate key value violates unique constraint \"scheduled_triggers_pkey\"",
            Some("scheduled_triggers_pkey"),
        );
        let result = DatabaseErrorConverter::convert_diesel_error(error, "insert trigger");
        match result {
            AppError::Duplicate { entity, field, value } => {
                assert_eq!(entity, "scheduled_triggers");
                assert_eq!(field, "job_id");
                assert_eq!(value, "scheduled_triggers_pkey");
            }
            other => panic!("Expected Duplicate error, got {other:?}"),
        }
    }

    #[test]
    fn test_convert_other_database_error_keeps_operation() {
        let error = db_error(DatabaseErrorKind::SerializationFailure, "could not serialize", None);
        let result = DatabaseErrorConverter::convert_diesel_error(error, "claim due triggers");
        assert!(
            matches!(result, AppError::Database { operation, .. } if operation == "claim due triggers")
        );
    }
}
