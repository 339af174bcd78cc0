//! Pure constructors for ledger messages. No I/O.

use std::sync::atomic::{AtomicI64, Ordering};

use shardpay_core::proto::ledger::{
    Account, ChannelCommit, ChannelId, ChannelState, SignedChannelState,
};
use shardpay_crypto::PublicKey;

static LAST_PAYER_ID: AtomicI64 = AtomicI64::new(0);

/// Build an account record for `address`.
pub fn new_account(address: &PublicKey, balance: i64) -> Account {
    Account {
        address: Some(address.to_proto()),
        balance,
    }
}

/// Build a channel commit from `payer` to `receiver`.
///
/// `payer_id` is a uniqueness nonce: wall-clock nanoseconds, bumped past the
/// last value issued by this process. Uniqueness does not hold across
/// processes committing for the same payer at the same instant.
pub fn new_channel_commit(payer: &PublicKey, receiver: &PublicKey, amount: i64) -> ChannelCommit {
    ChannelCommit {
        payer: Some(payer.to_proto()),
        receiver: Some(receiver.to_proto()),
        amount,
        payer_id: next_payer_id(),
    }
}

pub fn new_channel_state(id: ChannelId, sequence: i64, from: Account, to: Account) -> ChannelState {
    ChannelState {
        id: Some(id),
        sequence,
        from: Some(from),
        to: Some(to),
    }
}

pub fn new_signed_channel_state(
    state: ChannelState,
    from_signature: Vec<u8>,
    to_signature: Vec<u8>,
) -> SignedChannelState {
    SignedChannelState {
        channel: Some(state),
        from_signature,
        to_signature,
    }
}

fn next_payer_id() -> i64 {
    let now = chrono::Utc::now().timestamp_nanos_opt().unwrap_or_default();
    let previous = LAST_PAYER_ID
        .fetch_update(Ordering::AcqRel, Ordering::Acquire, |last| {
            Some(now.max(last.saturating_add(1)))
        })
        .unwrap_or(now);
    now.max(previous.saturating_add(1))
}
