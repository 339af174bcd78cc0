use prost::Message;
use shardpay_core::proto::escrow::SignedEscrowContract;

use crate::error::SettlementError;
use crate::traits::RenterSession;
use crate::types::AggregatedContracts;

/// Collects every shard's signed escrow contract into one ordered list.
pub struct ContractAggregator;

impl ContractAggregator {
    /// Decode the escrow contract of each shard in `shard_hashes` and sum
    /// the shards' guard prices.
    ///
    /// All-or-nothing: the first failing shard aborts the whole aggregation
    /// and no partial list is returned.
    pub async fn aggregate(
        session: &dyn RenterSession,
        shard_hashes: &[String],
    ) -> Result<AggregatedContracts, SettlementError> {
        let mut contracts = Vec::with_capacity(shard_hashes.len());
        let mut total_price: i64 = 0;

        for (index, hash) in shard_hashes.iter().enumerate() {
            let lookup_err = |source| SettlementError::ShardLookup {
                index,
                hash: hash.clone(),
                source,
            };

            let shard = session.shard(hash, index).await.map_err(lookup_err)?;
            let pair = shard.contracts().map_err(lookup_err)?;

            let contract = SignedEscrowContract::decode(pair.signed_escrow_contract.as_slice())
                .map_err(|source| SettlementError::Decode { index, source })?;

            total_price = total_price
                .checked_add(pair.guard.amount)
                .ok_or(SettlementError::AmountOverflow { index })?;
            contracts.push(contract);
        }

        tracing::debug!(
            session_id = %session.session_id(),
            shards = contracts.len(),
            total_price,
            "escrow contracts aggregated"
        );

        Ok(AggregatedContracts {
            contracts,
            total_price,
        })
    }
}
