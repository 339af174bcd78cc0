//! Integration test: account and channel lifecycle against an in-memory
//! ledger authority.

use std::sync::atomic::Ordering;
use std::sync::Arc;

use shardpay_core::proto::ledger::ChannelId;
use shardpay_core::CallContext;
use shardpay_crypto::{verify_message, KeyPair, PublicKey};
use shardpay_integration_tests::MockLedgerAuthority;
use shardpay_ledger::{
    new_account, new_signed_channel_state, sign_channel_state, ChannelStateTracker, LedgerClient,
    LedgerError, Party,
};

fn client(authority: &Arc<MockLedgerAuthority>) -> LedgerClient {
    LedgerClient::new(authority.clone())
}

// =========================================================================
// Accounts
// =========================================================================

#[tokio::test]
async fn test_create_then_import_same_account() {
    let authority = Arc::new(MockLedgerAuthority::new());
    let ledger = client(&authority);
    let ctx = CallContext::background();

    let (keypair, created) = ledger.create_account(&ctx).await.unwrap();
    let imported = ledger
        .import_account(&ctx, &keypair.public_key())
        .await
        .unwrap();

    assert_eq!(created, imported);
    let address = PublicKey::from_proto(imported.address.as_ref().unwrap()).unwrap();
    assert_eq!(address, keypair.public_key());
}

// =========================================================================
// Channel lifecycle
// =========================================================================

#[tokio::test]
async fn test_open_and_close_channel() {
    let authority = Arc::new(MockLedgerAuthority::new());
    let ledger = client(&authority);
    let ctx = CallContext::background();

    let payer = KeyPair::generate();
    let receiver = KeyPair::generate();

    let id = ledger
        .open_channel(&ctx, &payer, &receiver.public_key(), 100)
        .await
        .unwrap();
    let commit = authority.channel(id.id).expect("channel registered");
    let payload = commit.channel.as_ref().unwrap();
    assert_eq!(payload.amount, 100);
    assert!(verify_message(payload, &commit.signature, &payer.public_key()).is_ok());

    let state = ledger.next_channel_state(
        id,
        new_account(&payer.public_key(), 75),
        new_account(&receiver.public_key(), 25),
    );
    assert_eq!(state.sequence, 1);
    let signed = new_signed_channel_state(
        state.clone(),
        sign_channel_state(&state, &payer),
        sign_channel_state(&state, &receiver),
    );

    let closed = ledger.close_channel(&ctx, signed).await.unwrap();
    assert_eq!(closed.state.unwrap().channel, Some(state));
    assert_eq!(authority.closed_sequence(id.id), Some(1));
    assert_eq!(ledger.tracker().latest(id.id), Some(1));
}

#[tokio::test]
async fn test_commit_nonces_distinguish_identical_commits() {
    let authority = Arc::new(MockLedgerAuthority::new());
    let ledger = client(&authority);
    let ctx = CallContext::background();
    let payer = KeyPair::generate();
    let receiver = KeyPair::generate().public_key();

    let first = ledger.open_channel(&ctx, &payer, &receiver, 10).await.unwrap();
    let second = ledger.open_channel(&ctx, &payer, &receiver, 10).await.unwrap();

    assert_ne!(first, second);
    let a = authority.channel(first.id).unwrap().channel.unwrap();
    let b = authority.channel(second.id).unwrap().channel.unwrap();
    assert_ne!(a.payer_id, b.payer_id);
}

// =========================================================================
// Monotonic sequences
// =========================================================================

#[tokio::test]
async fn test_sequence_monotonicity_across_clients() {
    let authority = Arc::new(MockLedgerAuthority::new());
    let ctx = CallContext::background();
    let from = KeyPair::generate();
    let to = KeyPair::generate();
    let id = ChannelId { id: 42 };

    let sign = |sequence: i64| {
        let state = shardpay_ledger::new_channel_state(
            id,
            sequence,
            new_account(&from.public_key(), 100 - sequence),
            new_account(&to.public_key(), sequence),
        );
        new_signed_channel_state(
            state.clone(),
            sign_channel_state(&state, &from),
            sign_channel_state(&state, &to),
        )
    };

    // Accepted sequence N = 3.
    let first = client(&authority);
    first.close_channel(&ctx, sign(3)).await.unwrap();

    // A client without local history still gets N and below refused by
    // the authority.
    let fresh = client(&authority);
    for stale in [3, 2] {
        let result = fresh.close_channel(&ctx, sign(stale)).await;
        assert!(matches!(result, Err(LedgerError::Rejected { method: "CloseChannel", .. })));
    }

    // N + 1 is accepted.
    fresh.close_channel(&ctx, sign(4)).await.unwrap();
    assert_eq!(authority.closed_sequence(42), Some(4));
}

#[tokio::test]
async fn test_shared_tracker_refuses_stale_state_locally() {
    let authority = Arc::new(MockLedgerAuthority::new());
    let tracker = Arc::new(ChannelStateTracker::new());
    let a = LedgerClient::with_tracker(authority.clone(), tracker.clone());
    let b = LedgerClient::with_tracker(authority.clone(), tracker);
    let ctx = CallContext::background();
    let from = KeyPair::generate();
    let to = KeyPair::generate();

    let state = a.next_channel_state(
        ChannelId { id: 7 },
        new_account(&from.public_key(), 60),
        new_account(&to.public_key(), 40),
    );
    let signed = new_signed_channel_state(
        state.clone(),
        sign_channel_state(&state, &from),
        sign_channel_state(&state, &to),
    );
    a.close_channel(&ctx, signed.clone()).await.unwrap();

    let calls_before = authority.close_calls.load(Ordering::SeqCst);
    let replay = b.close_channel(&ctx, signed).await;
    assert!(matches!(replay, Err(LedgerError::StaleSequence { channel_id: 7, sequence: 1, accepted: 1 })));
    assert_eq!(authority.close_calls.load(Ordering::SeqCst), calls_before);
}

#[tokio::test]
async fn test_close_requires_both_signatures() {
    let authority = Arc::new(MockLedgerAuthority::new());
    let ledger = client(&authority);
    let from = KeyPair::generate();
    let to = KeyPair::generate();

    let state = ledger.next_channel_state(
        ChannelId { id: 9 },
        new_account(&from.public_key(), 50),
        new_account(&to.public_key(), 50),
    );
    let only_payer = new_signed_channel_state(state.clone(), sign_channel_state(&state, &from), Vec::new());

    let result = ledger
        .close_channel(&CallContext::background(), only_payer)
        .await;
    assert!(matches!(
        result,
        Err(LedgerError::InvalidSignature { channel_id: 9, party: Party::To })
    ));
    assert_eq!(authority.close_calls.load(Ordering::SeqCst), 0);
}
