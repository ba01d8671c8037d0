//! Conversions between wire messages and `ledgerlink-types`.

use crate::basic;
use ledgerlink_types as types;

/// Errors produced when a decoded message cannot be turned into a domain value.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProtoError {
    /// A field required by the client was absent.
    #[error("missing field `{0}`")]
    MissingField(&'static str),

    /// A field was present but out of range.
    #[error("invalid value for `{field}`: {reason}")]
    InvalidValue {
        /// Field name.
        field: &'static str,
        /// What was wrong with it.
        reason: String,
    },

    /// The bytes were not a valid encoding.
    #[error("decode failed: {0}")]
    Decode(#[from] prost::DecodeError),
}

fn non_negative(field: &'static str, value: i64) -> Result<u64, ProtoError> {
    u64::try_from(value).map_err(|_| ProtoError::InvalidValue {
        field,
        reason: format!("{value} is negative"),
    })
}

macro_rules! entity_conversions {
    ($domain:ident, $wire:ident, $num:ident) => {
        impl From<types::$domain> for basic::$wire {
            fn from(id: types::$domain) -> Self {
                Self {
                    shard_num: id.shard as i64,
                    realm_num: id.realm as i64,
                    $num: id.num as i64,
                }
            }
        }

        impl TryFrom<basic::$wire> for types::$domain {
            type Error = ProtoError;

            fn try_from(id: basic::$wire) -> Result<Self, Self::Error> {
                Ok(Self::new(
                    non_negative("shard_num", id.shard_num)?,
                    non_negative("realm_num", id.realm_num)?,
                    non_negative(stringify!($num), id.$num)?,
                ))
            }
        }
    };
}

entity_conversions!(AccountId, AccountId, account_num);
entity_conversions!(FileId, FileId, file_num);
entity_conversions!(TopicId, TopicId, topic_num);

impl From<types::Timestamp> for basic::Timestamp {
    fn from(ts: types::Timestamp) -> Self {
        Self {
            seconds: ts.seconds,
            nanos: ts.nanos as i32,
        }
    }
}

impl TryFrom<basic::Timestamp> for types::Timestamp {
    type Error = ProtoError;

    fn try_from(ts: basic::Timestamp) -> Result<Self, Self::Error> {
        let nanos = u32::try_from(ts.nanos)
            .ok()
            .filter(|n| *n < 1_000_000_000)
            .ok_or_else(|| ProtoError::InvalidValue {
                field: "nanos",
                reason: format!("{} out of range", ts.nanos),
            })?;
        Ok(types::Timestamp::new(ts.seconds, nanos))
    }
}

impl From<types::TransactionId> for basic::TransactionId {
    fn from(id: types::TransactionId) -> Self {
        Self {
            transaction_valid_start: Some(id.valid_start.into()),
            account_id: Some(id.account_id.into()),
            scheduled: id.scheduled,
            nonce: id.nonce.unwrap_or(0),
        }
    }
}

impl TryFrom<basic::TransactionId> for types::TransactionId {
    type Error = ProtoError;

    fn try_from(id: basic::TransactionId) -> Result<Self, Self::Error> {
        let account_id = id
            .account_id
            .ok_or(ProtoError::MissingField("transaction_id.account_id"))?
            .try_into()?;
        let valid_start = id
            .transaction_valid_start
            .ok_or(ProtoError::MissingField(
                "transaction_id.transaction_valid_start",
            ))?
            .try_into()?;
        Ok(types::TransactionId {
            account_id,
            valid_start,
            scheduled: id.scheduled,
            nonce: (id.nonce != 0).then_some(id.nonce),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Message, TransactionBody};

    #[test]
    fn test_transaction_id_roundtrip() {
        let id = types::TransactionId::with_valid_start(
            types::AccountId::new(0, 0, 1001),
            types::Timestamp::new(1_700_000_000, 42),
        );
        let wire: basic::TransactionId = id.into();
        assert_eq!(types::TransactionId::try_from(wire).unwrap(), id);
    }

    #[test]
    fn test_missing_account_is_reported() {
        let wire = basic::TransactionId {
            transaction_valid_start: Some(basic::Timestamp {
                seconds: 1,
                nanos: 0,
            }),
            ..Default::default()
        };
        assert_eq!(
            types::TransactionId::try_from(wire).unwrap_err(),
            ProtoError::MissingField("transaction_id.account_id")
        );
    }

    #[test]
    fn test_negative_entity_num_rejected() {
        let wire = basic::AccountId {
            shard_num: 0,
            realm_num: 0,
            account_num: -3,
        };
        assert!(matches!(
            types::AccountId::try_from(wire),
            Err(ProtoError::InvalidValue {
                field: "account_num",
                ..
            })
        ));
    }

    #[test]
    fn test_body_encoding_is_deterministic() {
        let body = TransactionBody {
            transaction_id: Some(
                types::TransactionId::with_valid_start(
                    types::AccountId::from_num(2),
                    types::Timestamp::new(5, 6),
                )
                .into(),
            ),
            node_account_id: Some(types::AccountId::from_num(3).into()),
            transaction_fee: 100,
            memo: "memo".into(),
            ..Default::default()
        };
        let bytes = body.encode_to_vec();
        let decoded = TransactionBody::decode(bytes.as_slice()).unwrap();
        assert_eq!(decoded, body);
        assert_eq!(decoded.encode_to_vec(), bytes);
    }
}
