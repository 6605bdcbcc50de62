use thiserror::Error;

use crate::domain::interaction::InteractionStatus;

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum DomainError {
    #[error("invalid interaction transition from {from:?} to {to:?}")]
    InvalidInteractionTransition { from: InteractionStatus, to: InteractionStatus },
    #[error("domain invariant violation: {0}")]
    InvariantViolation(String),
}

#[cfg(test)]
mod tests {
    use super::DomainError;
    use crate::domain::interaction::InteractionStatus;

    #[test]
    fn transition_errors_name_both_states() {
        let error = DomainError::InvalidInteractionTransition {
            from: InteractionStatus::Completed,
            to: InteractionStatus::Processing,
        };

        let rendered = error.to_string();
        assert!(rendered.contains("Completed"));
        assert!(rendered.contains("Processing"));
    }

    #[test]
    fn invariant_violations_render_their_detail() {
        let error = DomainError::InvariantViolation("completed without response".to_owned());
        assert!(error.to_string().contains("completed without response"));
    }
}
