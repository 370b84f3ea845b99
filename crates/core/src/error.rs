//! Error taxonomy for relay calls.
//!
//! Every failure is synchronous and atomic: the state machine restores its
//! pre-call snapshot before returning any of these.

use podrelay_types::{Amount, PayloadError, PodId};
use thiserror::Error;

/// Broad class of a [`RelayError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Wrong caller role.
    Authorization,
    /// The call conflicts with current state.
    StateConflict,
    /// Amounts or balances do not add up.
    Economic,
    /// Too early, wrong slot, or fee manipulation.
    Timing,
    /// Not enough gas supplied.
    Resource,
    /// Bytes could not be decoded.
    Malformed,
}

/// Errors returned by relay calls.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RelayError {
    // ═══════════════════════════════════════════════════════════════════════
    // Authorization
    // ═══════════════════════════════════════════════════════════════════════
    #[error("admin only call")]
    AdminOnlyCall,

    #[error("messaging only call")]
    MessagingOnlyCall,

    #[error("bridge only call")]
    BridgeOnlyCall,

    #[error("sender not authorized")]
    SenderNotAuthorized,

    // ═══════════════════════════════════════════════════════════════════════
    // State conflicts
    // ═══════════════════════════════════════════════════════════════════════
    #[error("operator is bonded")]
    OperatorIsBonded,

    #[error("operator not bonded")]
    OperatorNotBonded,

    #[error("operator has active job")]
    OperatorHasActiveJob,

    #[error("already initialized")]
    AlreadyInitialized,

    #[error("invalid job")]
    InvalidJob,

    #[error("job already exists")]
    JobAlreadyExists,

    #[error("failed job does not exist")]
    JobNotFailed,

    #[error("pod does not exist: {0}")]
    PodDoesNotExist(PodId),

    #[error("index out of range: offset {offset}, length {len}")]
    InvalidRange { offset: usize, len: usize },

    #[error("too many operators in {0}")]
    TooManyOperators(PodId),

    // ═══════════════════════════════════════════════════════════════════════
    // Economic
    // ═══════════════════════════════════════════════════════════════════════
    #[error("bond amount too small: required {required}, offered {offered}")]
    BondAmountTooSmall { required: Amount, offered: Amount },

    #[error("insufficient balance: available {available}, required {required}")]
    InsufficientBalance { available: Amount, required: Amount },

    #[error("amount overflow")]
    AmountOverflow,

    // ═══════════════════════════════════════════════════════════════════════
    // Timing
    // ═══════════════════════════════════════════════════════════════════════
    #[error("operator has time")]
    OperatorHasTime,

    #[error("invalid fallback")]
    InvalidFallback,

    #[error("gas spike detected")]
    GasSpikeDetected,

    // ═══════════════════════════════════════════════════════════════════════
    // Resource
    // ═══════════════════════════════════════════════════════════════════════
    #[error("not enough gas left: required more than {required}, remaining {remaining}")]
    NotEnoughGasLeft { required: u64, remaining: u64 },

    #[error("out of gas: limit {limit}")]
    OutOfGas { limit: u64 },

    // ═══════════════════════════════════════════════════════════════════════
    // Malformed input
    // ═══════════════════════════════════════════════════════════════════════
    #[error("invalid payload: {0}")]
    Payload(#[from] PayloadError),
}

impl RelayError {
    /// Classify this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            RelayError::AdminOnlyCall
            | RelayError::MessagingOnlyCall
            | RelayError::BridgeOnlyCall
            | RelayError::SenderNotAuthorized => ErrorKind::Authorization,

            RelayError::OperatorIsBonded
            | RelayError::OperatorNotBonded
            | RelayError::OperatorHasActiveJob
            | RelayError::AlreadyInitialized
            | RelayError::InvalidJob
            | RelayError::JobAlreadyExists
            | RelayError::JobNotFailed
            | RelayError::PodDoesNotExist(_)
            | RelayError::InvalidRange { .. }
            | RelayError::TooManyOperators(_) => ErrorKind::StateConflict,

            RelayError::BondAmountTooSmall { .. }
            | RelayError::InsufficientBalance { .. }
            | RelayError::AmountOverflow => ErrorKind::Economic,

            RelayError::OperatorHasTime
            | RelayError::InvalidFallback
            | RelayError::GasSpikeDetected => ErrorKind::Timing,

            RelayError::NotEnoughGasLeft { .. } | RelayError::OutOfGas { .. } => {
                ErrorKind::Resource
            }

            RelayError::Payload(_) => ErrorKind::Malformed,
        }
    }

    /// Short fixed reason, without the detail fields.
    ///
    /// Used as a stable key when counting rejections.
    pub fn reason(&self) -> &'static str {
        match self {
            RelayError::AdminOnlyCall => "admin only call",
            RelayError::MessagingOnlyCall => "messaging only call",
            RelayError::BridgeOnlyCall => "bridge only call",
            RelayError::SenderNotAuthorized => "sender not authorized",
            RelayError::OperatorIsBonded => "operator is bonded",
            RelayError::OperatorNotBonded => "operator not bonded",
            RelayError::OperatorHasActiveJob => "operator has active job",
            RelayError::AlreadyInitialized => "already initialized",
            RelayError::InvalidJob => "invalid job",
            RelayError::JobAlreadyExists => "job already exists",
            RelayError::JobNotFailed => "failed job does not exist",
            RelayError::PodDoesNotExist(_) => "pod does not exist",
            RelayError::InvalidRange { .. } => "index out of range",
            RelayError::TooManyOperators(_) => "too many operators",
            RelayError::BondAmountTooSmall { .. } => "bond amount too small",
            RelayError::InsufficientBalance { .. } => "insufficient balance",
            RelayError::AmountOverflow => "amount overflow",
            RelayError::OperatorHasTime => "operator has time",
            RelayError::InvalidFallback => "invalid fallback",
            RelayError::GasSpikeDetected => "gas spike detected",
            RelayError::NotEnoughGasLeft { .. } => "not enough gas left",
            RelayError::OutOfGas { .. } => "out of gas",
            RelayError::Payload(_) => "invalid payload",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kinds() {
        assert_eq!(RelayError::AdminOnlyCall.kind(), ErrorKind::Authorization);
        assert_eq!(RelayError::InvalidJob.kind(), ErrorKind::StateConflict);
        assert_eq!(RelayError::AmountOverflow.kind(), ErrorKind::Economic);
        assert_eq!(RelayError::GasSpikeDetected.kind(), ErrorKind::Timing);
        assert_eq!(
            RelayError::NotEnoughGasLeft {
                required: 10,
                remaining: 5
            }
            .kind(),
            ErrorKind::Resource
        );
        assert_eq!(
            RelayError::from(PayloadError::TooShort(3)).kind(),
            ErrorKind::Malformed
        );
    }

    #[test]
    fn test_reason_is_display_prefix() {
        let errors = [
            RelayError::OperatorHasTime,
            RelayError::BondAmountTooSmall {
                required: Amount(2),
                offered: Amount(1),
            },
            RelayError::PodDoesNotExist(PodId(3)),
            RelayError::NotEnoughGasLeft {
                required: 10,
                remaining: 5,
            },
        ];
        for error in errors {
            assert!(error.to_string().starts_with(error.reason()));
        }
    }
}
