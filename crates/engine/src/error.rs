//! Engine error taxonomy.

use thiserror::Error;

use domain::DomainError;
use store::StoreError;

/// Errors surfaced by the coordination services.
///
/// Validation errors are local and terminal for the call. Remote I/O
/// errors abort the in-flight operation and are surfaced without automatic
/// retry; retrying is a caller decision.
#[derive(Debug, Error)]
pub enum CoordinationError {
    #[error("Invalid invite code")]
    InvalidInviteCode,

    #[error("Invite code has expired")]
    InviteExpired,

    #[error("Already a member of this group")]
    AlreadyMember,

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Remote store error: {0}")]
    RemoteIo(String),
}

impl From<StoreError> for CoordinationError {
    fn from(err: StoreError) -> Self {
        CoordinationError::RemoteIo(err.to_string())
    }
}

impl From<DomainError> for CoordinationError {
    fn from(err: DomainError) -> Self {
        // Malformed stored documents fail closed as validation errors.
        CoordinationError::Validation(err.to_string())
    }
}

impl From<validator::ValidationErrors> for CoordinationError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let details: Vec<String> = errors
            .field_errors()
            .iter()
            .flat_map(|(field, errors)| {
                errors.iter().map(move |e| {
                    format!(
                        "{}: {}",
                        field,
                        e.message.clone().unwrap_or_default()
                    )
                })
            })
            .collect();

        let message = if details.len() == 1 {
            details[0].clone()
        } else {
            details.join(", ")
        };

        CoordinationError::Validation(message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        assert_eq!(
            format!("{}", CoordinationError::InvalidInviteCode),
            "Invalid invite code"
        );
        assert_eq!(
            format!("{}", CoordinationError::InviteExpired),
            "Invite code has expired"
        );
        assert_eq!(
            format!("{}", CoordinationError::AlreadyMember),
            "Already a member of this group"
        );
        assert_eq!(
            format!("{}", CoordinationError::NotFound("member x".to_string())),
            "Not found: member x"
        );
    }

    #[test]
    fn test_from_store_error() {
        let error: CoordinationError = StoreError::Backend("offline".to_string()).into();
        assert!(matches!(error, CoordinationError::RemoteIo(_)));
    }

    #[test]
    fn test_from_domain_error() {
        let error: CoordinationError =
            DomainError::Malformed("missing field `role`".to_string()).into();
        match error {
            CoordinationError::Validation(msg) => assert!(msg.contains("role")),
            other => panic!("Expected Validation error, got {:?}", other),
        }
    }

    #[test]
    fn test_from_validation_errors() {
        use validator::Validate;

        #[derive(Validate)]
        struct Probe {
            #[validate(length(min = 1, message = "Name cannot be empty"))]
            name: String,
        }

        let probe = Probe {
            name: String::new(),
        };
        let error: CoordinationError = probe.validate().unwrap_err().into();
        match error {
            CoordinationError::Validation(msg) => assert!(msg.contains("Name cannot be empty")),
            other => panic!("Expected Validation error, got {:?}", other),
        }
    }
}
