//! Node and ledger response codes.
//!
//! The same code space is used for precheck verdicts (a node's immediate answer
//! to a submission or query) and for final receipt statuses.

use std::fmt;

macro_rules! statuses {
    ($($(#[$meta:meta])* $name:ident = $code:literal,)*) => {
        /// A response code returned by a node.
        #[derive(Clone, Copy, PartialEq, Eq, Hash)]
        pub enum Status {
            $($(#[$meta])* $name,)*
            /// A code this client does not know about.
            Unrecognized(i32),
        }

        impl Status {
            /// Map a wire code to a status.
            pub fn from_code(code: i32) -> Self {
                match code {
                    $($code => Status::$name,)*
                    other => Status::Unrecognized(other),
                }
            }

            /// The wire code of this status.
            pub fn code(&self) -> i32 {
                match self {
                    $(Status::$name => $code,)*
                    Status::Unrecognized(code) => *code,
                }
            }

            /// Upper snake case name as used in the protocol definitions.
            pub fn name(&self) -> &'static str {
                match self {
                    $(Status::$name => stringify!($name),)*
                    Status::Unrecognized(_) => "Unrecognized",
                }
            }
        }
    };
}

statuses! {
    /// The node accepted the request for consensus or answered the query.
    Ok = 0,
    /// The transaction failed basic validation.
    InvalidTransaction = 1,
    /// The payer account does not exist.
    PayerAccountNotFound = 2,
    /// The node account in the body does not match the node it was sent to.
    InvalidNodeAccount = 3,
    /// The validity window has passed.
    TransactionExpired = 4,
    /// The valid start is in the future.
    InvalidTransactionStart = 5,
    /// The validity duration is out of range.
    InvalidTransactionDuration = 6,
    /// A required signature is missing or invalid.
    InvalidSignature = 7,
    /// The memo is too long.
    MemoTooLong = 8,
    /// The offered fee does not cover the cost.
    InsufficientTxFee = 9,
    /// The payer cannot cover the fee.
    InsufficientPayerBalance = 10,
    /// A transaction with this id was already submitted.
    DuplicateTransaction = 11,
    /// The node is too busy to accept the request.
    Busy = 12,
    /// The requested operation is not supported.
    NotSupported = 13,
    /// The file id does not exist.
    InvalidFileId = 14,
    /// The account id does not exist.
    InvalidAccountId = 15,
    /// The transaction id is malformed.
    InvalidTransactionId = 17,
    /// No receipt is known for the transaction id yet.
    ReceiptNotFound = 18,
    /// No record is known for the transaction id yet.
    RecordNotFound = 19,
    /// The outcome is not known yet.
    Unknown = 21,
    /// The transaction reached consensus and succeeded.
    Success = 22,
    /// The transaction reached consensus and failed for an unspecified reason.
    FailInvalid = 23,
    /// The transaction reached consensus but the fee could not be charged.
    FailFee = 24,
    /// The transaction reached consensus but a balance was insufficient.
    FailBalance = 25,
    /// The node could not hand the transaction to the consensus platform.
    PlatformTransactionNotCreated = 49,
    /// The consensus platform is not active yet.
    PlatformNotActive = 161,
    /// The topic id does not exist.
    InvalidTopicId = 150,
    /// The chunk number is out of range.
    InvalidChunkNumber = 163,
    /// The chunk does not reference a valid initial transaction.
    InvalidChunkTransactionId = 164,
}

impl Status {
    /// Whether a precheck with this status is a node-local, transient condition.
    ///
    /// Retrying the same request on another node, or on this node after a delay,
    /// may succeed.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Status::Busy | Status::PlatformTransactionNotCreated | Status::PlatformNotActive
        )
    }

    /// Whether this status means a receipt or record is not available yet.
    pub fn is_pending(&self) -> bool {
        matches!(
            self,
            Status::Unknown | Status::ReceiptNotFound | Status::RecordNotFound
        )
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Status::Unrecognized(code) => write!(f, "Unrecognized({code})"),
            other => f.write_str(other.name()),
        }
    }
}

impl fmt::Debug for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

impl From<i32> for Status {
    fn from(code: i32) -> Self {
        Status::from_code(code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_code_roundtrip() {
        for code in [0, 7, 11, 12, 21, 22, 49, 161] {
            assert_eq!(Status::from_code(code).code(), code);
        }
        assert_eq!(Status::from_code(9999), Status::Unrecognized(9999));
        assert_eq!(Status::Unrecognized(9999).code(), 9999);
    }

    #[test]
    fn test_classification() {
        assert!(Status::Busy.is_transient());
        assert!(Status::PlatformNotActive.is_transient());
        assert!(!Status::InvalidSignature.is_transient());
        assert!(!Status::DuplicateTransaction.is_transient());

        assert!(Status::ReceiptNotFound.is_pending());
        assert!(!Status::Success.is_pending());
    }

    #[test]
    fn test_display() {
        assert_eq!(Status::Busy.to_string(), "Busy");
        assert_eq!(Status::Unrecognized(-1).to_string(), "Unrecognized(-1)");
    }
}
