//! `CryptoTransfer`: moves hbar between accounts.

use crate::entity_id::AccountId;
use crate::hbar::Hbar;
use crate::services;
use crate::transaction::{to_proto_account_id, ChunkPiece, Transaction, TransactionData};

#[derive(Clone, Default)]
pub(crate) struct TransferTransactionData {
    pub(crate) transfers: Vec<(AccountId, Hbar)>,
}

impl TransferTransactionData {
    pub(crate) fn from_transfers(transfers: Vec<(AccountId, Hbar)>) -> Self {
        Self { transfers }
    }
}

impl TransactionData for TransferTransactionData {
    fn to_body_data(&self, _chunk: Option<ChunkPiece<'_>>) -> services::transaction_body::Data {
        let account_amounts = self
            .transfers
            .iter()
            .map(|(account_id, amount)| services::AccountAmount {
                account_id: Some(to_proto_account_id(account_id.clone())),
                amount: amount.to_tinybars(),
                is_approval: false,
            })
            .collect();
        services::transaction_body::Data::CryptoTransfer(services::CryptoTransferTransactionBody {
            transfers: Some(services::TransferList { account_amounts }),
        })
    }

    fn default_max_transaction_fee(&self) -> Hbar {
        Hbar::new(1)
    }

    fn method_path(&self) -> &'static str {
        "/proto.CryptoService/cryptoTransfer"
    }
}

/// A transfer of hbar between one or more accounts; amounts must net to
/// zero by the time the transaction is frozen (enforced by the network,
/// not this client).
pub type TransferTransaction = Transaction<TransferTransactionData>;

impl TransferTransaction {
    pub fn new() -> Self {
        Transaction::new(TransferTransactionData::default())
    }

    /// Append a transfer leg. Call once per account per transaction;
    /// positive credits the account, negative debits it.
    pub fn with_hbar_transfer(mut self, account_id: AccountId, amount: Hbar) -> Self {
        self.data_mut().transfers.push((account_id, amount));
        self
    }
}

impl Default for TransferTransaction {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transfers_accumulate_in_order() {
        let tx = TransferTransaction::new()
            .with_hbar_transfer(AccountId::new(0, 0, 1001), Hbar::new(1))
            .with_hbar_transfer(AccountId::new(0, 0, 1000), Hbar::new(-1));
        assert_eq!(tx.data().transfers.len(), 2);
    }
}
