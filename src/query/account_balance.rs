//! `CryptoGetAccountBalance`: a free query, also used as the engine's
//! single-node ping (spec §4.1, `ping`).

use std::time::Duration as StdDuration;

use async_trait::async_trait;
use tonic::transport::Channel;

use crate::client::Client;
use crate::entity_id::AccountId;
use crate::error::{Error, Result};
use crate::hbar::Hbar;
use crate::proto::grpc::unary_call;
use crate::query::{Query, QueryExecute};
use crate::services;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountBalance {
    pub account_id: AccountId,
    pub hbars: Hbar,
}

#[derive(Clone, Default)]
struct AccountBalanceData {
    account_id: Option<AccountId>,
}

#[async_trait]
impl QueryExecute for AccountBalanceData {
    type Output = AccountBalance;

    fn requires_payment(&self) -> bool {
        false
    }

    fn to_query(&self, header: services::QueryHeader) -> services::Query {
        let account_id = self.account_id.clone().map(|id| services::AccountId {
            shard_num: id.shard as i64,
            realm_num: id.realm as i64,
            account: Some(services::account_id::Account::AccountNum(id.num.unwrap_or_default() as i64)),
        });
        services::Query {
            query: Some(services::query::Query::CryptogetAccountBalance(services::CryptoGetAccountBalanceQuery {
                header: Some(header),
                account_id,
            })),
        }
    }

    async fn execute_grpc(
        &self,
        channel: Channel,
        query: services::Query,
    ) -> std::result::Result<tonic::Response<services::Response>, tonic::Status> {
        unary_call(channel, "/proto.CryptoService/cryptoGetBalance", query).await
    }

    fn response_header<'a>(&self, response: &'a services::Response) -> Option<&'a services::ResponseHeader> {
        match &response.response {
            Some(services::response::Response::CryptogetAccountBalance(r)) => r.header.as_ref(),
            _ => None,
        }
    }

    fn map_response(&self, response: services::Response) -> Result<Self::Output> {
        match response.response {
            Some(services::response::Response::CryptogetAccountBalance(r)) => {
                let account_id = self.account_id.clone().ok_or_else(|| Error::FromProtobuf("missing account id".into()))?;
                Ok(AccountBalance { account_id, hbars: Hbar::from_tinybars(r.balance as i64) })
            }
            _ => Err(Error::FromProtobuf("expected CryptogetAccountBalance response".into())),
        }
    }
}

/// Query for an account's hbar balance.
pub struct AccountBalanceQuery {
    inner: Query<AccountBalanceData>,
}

impl AccountBalanceQuery {
    pub fn new() -> Self {
        Self { inner: Query::new(AccountBalanceData::default()) }
    }

    pub fn with_account_id(mut self, account_id: AccountId) -> Self {
        self.inner.data.account_id = Some(account_id);
        self
    }

    pub fn with_node_account_ids(mut self, ids: Vec<AccountId>) -> Self {
        self.inner = self.inner.with_node_account_ids(ids);
        self
    }

    pub async fn execute(&self, client: &Client, timeout: Option<StdDuration>) -> Result<AccountBalance> {
        self.inner.execute(client, timeout).await
    }
}

impl Default for AccountBalanceQuery {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_sets_account_id() {
        let query = AccountBalanceQuery::new().with_account_id(AccountId::new(0, 0, 1001));
        assert_eq!(query.inner.data.account_id, Some(AccountId::new(0, 0, 1001)));
    }
}
