//! Crypto transfers.

use super::super::{ChunkContext, Transaction, TransactionData};
use crate::TransactionError;
use ledgerlink_proto::{self as proto, services, transaction_body, ProtoError};
use ledgerlink_types::AccountId;

/// Balance adjustments between accounts, in tinybars.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransferData {
    transfers: Vec<(AccountId, i64)>,
}

/// Builder for a crypto transfer.
pub type TransferTransaction = Transaction<TransferData>;

impl TransferData {
    pub fn transfers(&self) -> &[(AccountId, i64)] {
        &self.transfers
    }

    /// Sum of all adjustments; zero for a balanced transfer.
    pub fn net_amount(&self) -> i64 {
        self.transfers.iter().map(|(_, amount)| amount).sum()
    }
}

impl Transaction<TransferData> {
    /// Add `amount` tinybars to `account` (negative to debit it).
    pub fn hbar_transfer(mut self, account: AccountId, amount: i64) -> Self {
        self.data_mut().transfers.push((account, amount));
        self
    }
}

impl TransactionData for TransferData {
    const NAME: &'static str = "crypto transfer";

    fn method_path(&self) -> &'static str {
        services::CRYPTO_TRANSFER
    }

    fn to_body_data(&self, _chunk: &ChunkContext<'_>) -> transaction_body::Data {
        let account_amounts = self
            .transfers
            .iter()
            .map(|(account, amount)| proto::AccountAmount {
                account_id: Some((*account).into()),
                amount: *amount,
            })
            .collect();
        transaction_body::Data::CryptoTransfer(proto::CryptoTransferTransactionBody {
            transfers: Some(proto::TransferList { account_amounts }),
        })
    }

    fn from_chunks(chunks: Vec<transaction_body::Data>) -> Result<Self, TransactionError> {
        let [transaction_body::Data::CryptoTransfer(body)] = <[_; 1]>::try_from(chunks)
            .map_err(|_| TransactionError::UnexpectedBody {
                expected: Self::NAME,
            })?
        else {
            return Err(TransactionError::UnexpectedBody {
                expected: Self::NAME,
            });
        };
        let transfers = body
            .transfers
            .unwrap_or_default()
            .account_amounts
            .into_iter()
            .map(|aa| {
                let account: AccountId = aa
                    .account_id
                    .ok_or(ProtoError::MissingField("account_amounts.account_id"))?
                    .try_into()?;
                Ok((account, aa.amount))
            })
            .collect::<Result<_, ProtoError>>()?;
        Ok(Self { transfers })
    }
}
