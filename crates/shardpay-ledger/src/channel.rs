use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use shardpay_core::proto::ledger::{Account, ChannelId, ChannelState};

use crate::error::LedgerError;
use crate::messages::new_channel_state;

/// Latest accepted sequence number per channel.
///
/// A state for channel C is only acceptable when its sequence is strictly
/// greater than the last one accepted for C. Thread-safe: uses `DashMap`.
#[derive(Debug, Default)]
pub struct ChannelStateTracker {
    latest: DashMap<i64, i64>,
}

impl ChannelStateTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Latest accepted sequence for `channel_id`, if any.
    pub fn latest(&self, channel_id: i64) -> Option<i64> {
        self.latest.get(&channel_id).map(|s| *s)
    }

    /// Check `state` against the latest accepted sequence without recording it.
    pub fn check(&self, state: &ChannelState) -> Result<(), LedgerError> {
        let channel_id = channel_id_of(state)?;
        let accepted = self.latest(channel_id).unwrap_or(0);
        if state.sequence <= accepted {
            return Err(LedgerError::StaleSequence {
                channel_id,
                sequence: state.sequence,
                accepted,
            });
        }
        Ok(())
    }

    /// Record `state` as accepted. Fails if the sequence is not strictly
    /// greater than the latest accepted one.
    pub fn accept(&self, state: &ChannelState) -> Result<(), LedgerError> {
        let channel_id = channel_id_of(state)?;
        let stale = |accepted: i64| LedgerError::StaleSequence {
            channel_id,
            sequence: state.sequence,
            accepted,
        };

        match self.latest.entry(channel_id) {
            Entry::Occupied(mut entry) => {
                if state.sequence <= *entry.get() {
                    return Err(stale(*entry.get()));
                }
                entry.insert(state.sequence);
            }
            Entry::Vacant(entry) => {
                if state.sequence <= 0 {
                    return Err(stale(0));
                }
                entry.insert(state.sequence);
            }
        }

        tracing::debug!(channel_id, sequence = state.sequence, "channel state accepted");
        Ok(())
    }

    /// Build the next state for a channel: latest accepted sequence + 1,
    /// or 1 for a channel with no accepted state.
    pub fn next_state(&self, id: ChannelId, from: Account, to: Account) -> ChannelState {
        let sequence = self.latest(id.id).map_or(1, |s| s + 1);
        new_channel_state(id, sequence, from, to)
    }

    /// Forget a channel once it is closed for good.
    pub fn forget(&self, channel_id: i64) -> Option<i64> {
        self.latest.remove(&channel_id).map(|(_, seq)| seq)
    }
}

fn channel_id_of(state: &ChannelState) -> Result<i64, LedgerError> {
    state
        .channel_id()
        .ok_or_else(|| LedgerError::Malformed("channel state has no channel id".into()))
}
