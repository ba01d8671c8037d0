//! Ledger entity identifiers and transaction ids.

use rand::Rng;
use std::fmt;
use std::str::FromStr;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Errors produced when parsing identifiers and addresses from strings.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    /// Entity id was not of the form `shard.realm.num`.
    #[error("invalid entity id `{0}`: expected `shard.realm.num`")]
    InvalidEntityId(String),

    /// Transaction id was not of the form `account@seconds.nanos`.
    #[error("invalid transaction id `{0}`")]
    InvalidTransactionId(String),

    /// Node address was missing its host or port.
    #[error("invalid node address `{0}`: expected `host:port`")]
    InvalidAddress(String),
}

/// Defines a `shard.realm.num` entity id type.
macro_rules! entity_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
        pub struct $name {
            /// Shard number.
            pub shard: u64,
            /// Realm number within the shard.
            pub realm: u64,
            /// Entity number within the realm.
            pub num: u64,
        }

        impl $name {
            /// Create an id from its three components.
            pub const fn new(shard: u64, realm: u64, num: u64) -> Self {
                Self { shard, realm, num }
            }

            /// Shorthand for an id in shard 0, realm 0.
            pub const fn from_num(num: u64) -> Self {
                Self::new(0, 0, num)
            }

            /// The `(shard, realm)` partition this id lives in.
            pub const fn partition(&self) -> (u64, u64) {
                (self.shard, self.realm)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}.{}.{}", self.shard, self.realm, self.num)
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({})", stringify!($name), self)
            }
        }

        impl FromStr for $name {
            type Err = ParseError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let (shard, realm, num) = parse_entity_parts(s)
                    .ok_or_else(|| ParseError::InvalidEntityId(s.to_string()))?;
                Ok(Self::new(shard, realm, num))
            }
        }
    };
}

entity_id!(
    /// An account on the ledger. Consensus nodes are addressed by their account id.
    AccountId
);

entity_id!(
    /// A file stored on the ledger.
    FileId
);

entity_id!(
    /// A consensus topic.
    TopicId
);

fn parse_entity_parts(s: &str) -> Option<(u64, u64, u64)> {
    let mut parts = s.split('.');
    let shard = parts.next()?.parse().ok()?;
    let realm = parts.next()?.parse().ok()?;
    let num = parts.next()?.parse().ok()?;
    if parts.next().is_some() {
        return None;
    }
    Some((shard, realm, num))
}

/// Seconds and nanoseconds since the Unix epoch.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Timestamp {
    /// Whole seconds.
    pub seconds: i64,
    /// Nanoseconds within the second (`0..1_000_000_000`).
    pub nanos: u32,
}

impl Timestamp {
    const NANOS_PER_SECOND: u64 = 1_000_000_000;

    /// Create a timestamp, normalising `nanos` into the seconds field.
    pub fn new(seconds: i64, nanos: u32) -> Self {
        let carry = (nanos as u64 / Self::NANOS_PER_SECOND) as i64;
        Self {
            seconds: seconds + carry,
            nanos: (nanos as u64 % Self::NANOS_PER_SECOND) as u32,
        }
    }

    /// The current wall-clock time.
    pub fn now() -> Self {
        let since_epoch = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or(Duration::ZERO);
        Self::from_duration_since_epoch(since_epoch)
    }

    fn from_duration_since_epoch(d: Duration) -> Self {
        Self {
            seconds: d.as_secs() as i64,
            nanos: d.subsec_nanos(),
        }
    }

    /// This timestamp advanced by `nanos` nanoseconds.
    pub fn plus_nanos(self, nanos: u64) -> Self {
        let total = self.nanos as u64 + nanos;
        Self {
            seconds: self.seconds + (total / Self::NANOS_PER_SECOND) as i64,
            nanos: (total % Self::NANOS_PER_SECOND) as u32,
        }
    }

    /// This timestamp moved back by `d`.
    pub fn minus(self, d: Duration) -> Self {
        let total = self.seconds as i128 * Self::NANOS_PER_SECOND as i128 + self.nanos as i128
            - d.as_nanos() as i128;
        let per = Self::NANOS_PER_SECOND as i128;
        Self {
            seconds: total.div_euclid(per) as i64,
            nanos: total.rem_euclid(per) as u32,
        }
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{:09}", self.seconds, self.nanos)
    }
}

impl fmt::Debug for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

/// Identifies a transaction: the paying account plus the start of its validity window.
///
/// Chunked submissions share the payer and derive each chunk's valid start from
/// the first chunk's, so every chunk still has a distinct id.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TransactionId {
    /// The account paying for the transaction.
    pub account_id: AccountId,
    /// Start of the validity window.
    pub valid_start: Timestamp,
    /// Whether this id refers to a scheduled execution.
    pub scheduled: bool,
    /// Nonce for child transactions. `None` for user-submitted transactions.
    pub nonce: Option<i32>,
}

impl TransactionId {
    /// Lower bound of the random backdating applied by [`TransactionId::generate`].
    pub const MIN_BACKDATE: Duration = Duration::from_secs(5);

    /// Upper bound of the random backdating applied by [`TransactionId::generate`].
    pub const MAX_BACKDATE: Duration = Duration::from_secs(8);

    /// Create a transaction id with an explicit valid start.
    pub fn with_valid_start(account_id: AccountId, valid_start: Timestamp) -> Self {
        Self {
            account_id,
            valid_start,
            scheduled: false,
            nonce: None,
        }
    }

    /// Generate a fresh transaction id for `account_id`.
    ///
    /// The valid start is moved a random 5-8 seconds into the past so that
    /// moderate clock skew against the nodes does not make the transaction
    /// look like it starts in the future.
    pub fn generate(account_id: AccountId) -> Self {
        let backdate_ms = rand::thread_rng().gen_range(
            Self::MIN_BACKDATE.as_millis() as u64..Self::MAX_BACKDATE.as_millis() as u64,
        );
        let valid_start = Timestamp::now().minus(Duration::from_millis(backdate_ms));
        Self::with_valid_start(account_id, valid_start)
    }

    /// The id used for chunk `index` (zero-based) of a chunked submission.
    ///
    /// Chunk 0 is the base id itself.
    pub fn for_chunk(&self, index: usize) -> Self {
        Self {
            valid_start: self.valid_start.plus_nanos(index as u64),
            ..*self
        }
    }
}

impl fmt::Display for TransactionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.account_id, self.valid_start)?;
        if self.scheduled {
            write!(f, "?scheduled")?;
        }
        if let Some(nonce) = self.nonce {
            write!(f, "/{nonce}")?;
        }
        Ok(())
    }
}

impl fmt::Debug for TransactionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TransactionId({self})")
    }
}

impl FromStr for TransactionId {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ParseError::InvalidTransactionId(s.to_string());

        let (rest, nonce) = match s.rsplit_once('/') {
            Some((rest, nonce)) => (rest, Some(nonce.parse().map_err(|_| invalid())?)),
            None => (s, None),
        };
        let (rest, scheduled) = match rest.strip_suffix("?scheduled") {
            Some(rest) => (rest, true),
            None => (rest, false),
        };
        let (account, start) = rest.split_once('@').ok_or_else(invalid)?;
        let account_id: AccountId = account.parse().map_err(|_| invalid())?;
        let (seconds, nanos) = start.split_once('.').ok_or_else(invalid)?;
        let seconds: i64 = seconds.parse().map_err(|_| invalid())?;
        let nanos: u32 = nanos.parse().map_err(|_| invalid())?;
        if nanos >= 1_000_000_000 {
            return Err(invalid());
        }

        Ok(Self {
            account_id,
            valid_start: Timestamp { seconds, nanos },
            scheduled,
            nonce,
        })
    }
}
