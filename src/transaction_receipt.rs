//! The outcome of a transaction, as reported by `TransactionGetReceipt`.

use crate::error::Status;

/// A small, crate-local view of the handful of receipt statuses this
/// crate's engine branches on by name; anything else passes through as
/// its raw numeric [`Status`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReceiptStatus {
    Ok,
    Unknown,
    Other(Status),
}

impl From<i32> for ReceiptStatus {
    fn from(code: i32) -> Self {
        match code {
            crate::proto::services::response_code::OK => ReceiptStatus::Ok,
            0 => ReceiptStatus::Unknown,
            other => ReceiptStatus::Other(Status(other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Receipt {
    pub status: ReceiptStatus,
}
