//! Integration tests for sending and receiving encrypted messages

mod common;

use bchmsg::chain::WalletService;
use bchmsg::error::WalletError;
use bchmsg::messaging::{
    MessageReceiveOrchestrator, MessageSendOrchestrator, SendRequest, SendStage, SendState,
};
use bchmsg::payload::Payload;
use bchmsg::resilience::RetryPolicy;
use bchmsg::signal::{Signal, MESSAGE_MARKER};
use common::{bounded, context, ledger, CallLog, MemoryChain, MemoryRelay};
use serde_json::json;
use std::time::Duration;

type TestResult = Result<(), Box<dyn std::error::Error>>;

fn request(recipient: &MemoryChain, subject: &str, payload: Payload) -> SendRequest {
    SendRequest {
        recipient: recipient.address().to_string(),
        subject: subject.to_string(),
        payload,
    }
}

#[tokio::test]
async fn test_alice_sends_bob_hello_world() -> TestResult {
    bounded(async {
        let log = CallLog::default();
        let chain = ledger();
        let alice = MemoryChain::new(&chain, &log);
        let bob = MemoryChain::new(&chain, &log);
        let relay = MemoryRelay::new(&log);

        let mut sender = MessageSendOrchestrator::new(context(&alice, &relay));
        let sent = sender
            .send(&request(&bob, "test", Payload::raw("hello world")))
            .await?;
        assert_eq!(sent.txid.len(), 64);
        assert!(matches!(sender.state(), SendState::Done(_)));

        let receiver = MessageReceiveOrchestrator::new(context(&bob, &relay));
        let inbox = receiver.check().await?;
        assert_eq!(inbox.len(), 1);
        assert_eq!(inbox[0].sender, alice.address());
        assert_eq!(inbox[0].subject, "test");
        assert_eq!(inbox[0].signal_txid, sent.txid);
        assert_eq!(inbox[0].content_id, sent.content_id);

        let message = receiver.read_txid(&inbox[0].signal_txid).await?;
        assert_eq!(message.sender, alice.address());
        assert_eq!(message.subject, "test");
        assert_eq!(message.payload, Payload::raw("hello world"));
        Ok::<(), Box<dyn std::error::Error>>(())
    })
    .await
}

#[tokio::test]
async fn test_structured_payload_survives_the_trip() -> TestResult {
    bounded(async {
        let log = CallLog::default();
        let chain = ledger();
        let alice = MemoryChain::new(&chain, &log);
        let bob = MemoryChain::new(&chain, &log);
        let relay = MemoryRelay::new(&log);

        let payload = Payload::structured(
            "invoice attached",
            Some(json!({"amount": 42, "items": ["a", "b"]})),
        );
        let mut sender = MessageSendOrchestrator::new(context(&alice, &relay));
        let sent = sender.send(&request(&bob, "billing", payload.clone())).await?;

        let receiver = MessageReceiveOrchestrator::new(context(&bob, &relay));
        let message = receiver.read_txid(&sent.txid).await?;
        assert_eq!(message.payload, payload);
        assert_eq!(message.payload.display_text(), "invoice attached");
        Ok::<(), Box<dyn std::error::Error>>(())
    })
    .await
}

#[tokio::test]
async fn test_own_signals_are_not_listed() -> TestResult {
    bounded(async {
        let log = CallLog::default();
        let chain = ledger();
        let alice = MemoryChain::new(&chain, &log);
        let bob = MemoryChain::new(&chain, &log);
        let relay = MemoryRelay::new(&log);

        let mut sender = MessageSendOrchestrator::new(context(&alice, &relay));
        sender.send(&request(&bob, "to bob", Payload::raw("hi"))).await?;

        // the signal is in alice's history as its sender
        let alice_inbox = MessageReceiveOrchestrator::new(context(&alice, &relay))
            .check()
            .await?;
        assert!(alice_inbox.is_empty());

        let bob_inbox = MessageReceiveOrchestrator::new(context(&bob, &relay))
            .check()
            .await?;
        assert_eq!(bob_inbox.len(), 1);
        Ok::<(), Box<dyn std::error::Error>>(())
    })
    .await
}

#[tokio::test]
async fn test_unknown_content_id_is_message_not_found() -> TestResult {
    bounded(async {
        let log = CallLog::default();
        let chain = ledger();
        let alice = MemoryChain::new(&chain, &log);
        let bob = MemoryChain::new(&chain, &log);
        let relay = MemoryRelay::new(&log);
        relay.assign_id("evt123");

        let mut sender = MessageSendOrchestrator::new(context(&alice, &relay));
        let sent = sender.send(&request(&bob, "s", Payload::raw("payload"))).await?;
        assert_eq!(sent.content_id, "evt123");

        let signal = |content_id: &str| Signal {
            txid: sent.txid.clone(),
            marker: MESSAGE_MARKER.to_string(),
            subject: "s".to_string(),
            content_id: content_id.to_string(),
            sender: alice.address().to_string(),
            recipient: Some(bob.address().to_string()),
            height: None,
        };

        let receiver = MessageReceiveOrchestrator::new(context(&bob, &relay));
        let found = receiver.read(&signal("evt123")).await?;
        assert_eq!(found.payload.display_text(), "payload");

        let missing = receiver.read(&signal("evt999")).await;
        assert!(matches!(missing, Err(WalletError::MessageNotFound(_))));

        let state = relay.state.lock();
        assert_eq!(state.connects, 3);
        assert_eq!(state.connects, state.closes);
        Ok::<(), Box<dyn std::error::Error>>(())
    })
    .await
}

fn patient() -> RetryPolicy {
    RetryPolicy {
        attempts: 3,
        delay: Duration::from_millis(1),
    }
}

#[tokio::test]
async fn test_missing_content_is_fetched_once() -> TestResult {
    bounded(async {
        let log = CallLog::default();
        let chain = ledger();
        let alice = MemoryChain::new(&chain, &log);
        let bob = MemoryChain::new(&chain, &log);
        let relay = MemoryRelay::new(&log);

        let mut sender = MessageSendOrchestrator::new(context(&alice, &relay));
        let sent = sender.send(&request(&bob, "s", Payload::raw("x"))).await?;
        relay.state.lock().events.clear();

        let receiver = MessageReceiveOrchestrator::new(context(&bob, &relay).with_retry(patient()));
        let result = receiver.read_txid(&sent.txid).await;
        assert!(matches!(result, Err(WalletError::MessageNotFound(_))));
        assert_eq!(log.count("fetch"), 1);

        let state = relay.state.lock();
        assert_eq!(state.connects, state.closes);
        Ok::<(), Box<dyn std::error::Error>>(())
    })
    .await
}

#[tokio::test]
async fn test_relay_fetch_retried_after_outage() -> TestResult {
    bounded(async {
        let log = CallLog::default();
        let chain = ledger();
        let alice = MemoryChain::new(&chain, &log);
        let bob = MemoryChain::new(&chain, &log);
        let relay = MemoryRelay::new(&log);

        let mut sender = MessageSendOrchestrator::new(context(&alice, &relay));
        let sent = sender.send(&request(&bob, "s", Payload::raw("after the storm"))).await?;
        {
            let mut state = relay.state.lock();
            state.connect_outages = 1;
            state.fetch_outages = 1;
        }

        let receiver = MessageReceiveOrchestrator::new(context(&bob, &relay).with_retry(patient()));
        let message = receiver.read_txid(&sent.txid).await?;
        assert_eq!(message.payload, Payload::raw("after the storm"));
        assert_eq!(log.count("fetch"), 2);

        // publish, dropped fetch, successful fetch
        let state = relay.state.lock();
        assert_eq!(state.connects, 3);
        assert_eq!(state.connects, state.closes);
        Ok::<(), Box<dyn std::error::Error>>(())
    })
    .await
}

#[tokio::test]
async fn test_relay_fetch_gives_up_after_attempts() -> TestResult {
    bounded(async {
        let log = CallLog::default();
        let chain = ledger();
        let alice = MemoryChain::new(&chain, &log);
        let bob = MemoryChain::new(&chain, &log);
        let relay = MemoryRelay::new(&log);

        let mut sender = MessageSendOrchestrator::new(context(&alice, &relay));
        let sent = sender.send(&request(&bob, "s", Payload::raw("x"))).await?;
        relay.state.lock().fetch_outages = 10;

        let receiver = MessageReceiveOrchestrator::new(context(&bob, &relay).with_retry(patient()));
        let result = receiver.read_txid(&sent.txid).await;
        assert!(matches!(result, Err(WalletError::RelayUnreachable(_))));
        assert_eq!(log.count("fetch"), 3);

        let state = relay.state.lock();
        assert_eq!(state.connects, 4);
        assert_eq!(state.connects, state.closes);
        Ok::<(), Box<dyn std::error::Error>>(())
    })
    .await
}

#[tokio::test]
async fn test_ciphertext_published_before_signal() -> TestResult {
    bounded(async {
        let log = CallLog::default();
        let chain = ledger();
        let alice = MemoryChain::new(&chain, &log);
        let bob = MemoryChain::new(&chain, &log);
        let relay = MemoryRelay::new(&log);

        let mut sender = MessageSendOrchestrator::new(context(&alice, &relay));
        sender.send(&request(&bob, "order", Payload::raw("x"))).await?;

        let key = log.position("get_public_key").ok_or("no key lookup")?;
        let publish = log.position("publish").ok_or("no publish")?;
        let refresh = log.position("refresh_utxos").ok_or("no refresh")?;
        let broadcast = log.position("broadcast").ok_or("no broadcast")?;
        assert!(key < publish);
        assert!(publish < refresh);
        assert!(refresh < broadcast);

        assert_eq!(
            sender.transitions(),
            &[
                SendState::Validating,
                SendState::ResolvingKey,
                SendState::Encrypting,
                SendState::Publishing,
                SendState::Signaling,
                sender.state().clone(),
            ]
        );
        Ok::<(), Box<dyn std::error::Error>>(())
    })
    .await
}

#[tokio::test]
async fn test_rejected_publish_closes_relay_and_skips_signal() -> TestResult {
    bounded(async {
        let log = CallLog::default();
        let chain = ledger();
        let alice = MemoryChain::new(&chain, &log);
        let bob = MemoryChain::new(&chain, &log);
        let relay = MemoryRelay::new(&log);
        relay.state.lock().reject = true;

        let mut sender = MessageSendOrchestrator::new(context(&alice, &relay));
        let failure = sender
            .send(&request(&bob, "s", Payload::raw("x")))
            .await
            .expect_err("publish should be rejected");

        assert_eq!(failure.stage, SendStage::Publishing);
        assert!(failure.content_id.is_none());
        assert!(matches!(failure.error, WalletError::RelayRejected(_)));
        {
            let state = relay.state.lock();
            assert_eq!(state.connects, 1);
            assert_eq!(state.closes, 1);
        }
        assert_eq!(log.count("broadcast"), 0);
        assert!(matches!(
            sender.state(),
            SendState::Failed {
                at: SendStage::Publishing,
                ..
            }
        ));
        Ok::<(), Box<dyn std::error::Error>>(())
    })
    .await
}

#[tokio::test]
async fn test_unreachable_relay_fails_publishing() -> TestResult {
    bounded(async {
        let log = CallLog::default();
        let chain = ledger();
        let alice = MemoryChain::new(&chain, &log);
        let bob = MemoryChain::new(&chain, &log);
        let relay = MemoryRelay::new(&log);
        relay.state.lock().unreachable = true;

        let mut sender = MessageSendOrchestrator::new(context(&alice, &relay));
        let failure = sender
            .send(&request(&bob, "s", Payload::raw("x")))
            .await
            .expect_err("relay is down");
        assert_eq!(failure.stage, SendStage::Publishing);
        assert!(matches!(failure.error, WalletError::RelayUnreachable(_)));
        assert_eq!(log.count("broadcast"), 0);
        Ok::<(), Box<dyn std::error::Error>>(())
    })
    .await
}

#[tokio::test]
async fn test_broadcast_failure_reports_orphaned_content() -> TestResult {
    bounded(async {
        let log = CallLog::default();
        let chain = ledger();
        let alice = MemoryChain::new(&chain, &log);
        let bob = MemoryChain::new(&chain, &log);
        let relay = MemoryRelay::new(&log);
        relay.assign_id("evt-orphan");
        chain.lock().fail_broadcast = true;

        let mut sender = MessageSendOrchestrator::new(context(&alice, &relay));
        let failure = sender
            .send(&request(&bob, "s", Payload::raw("x")))
            .await
            .expect_err("broadcast should fail");

        assert_eq!(failure.stage, SendStage::Signaling);
        assert_eq!(failure.content_id.as_deref(), Some("evt-orphan"));
        assert!(matches!(failure.error, WalletError::BroadcastRejected(_)));
        // broadcasting is never retried
        assert_eq!(log.count("broadcast"), 1);
        assert!(relay.state.lock().events.contains_key("evt-orphan"));
        Ok::<(), Box<dyn std::error::Error>>(())
    })
    .await
}

#[tokio::test]
async fn test_wrong_recipient_cannot_decrypt() -> TestResult {
    bounded(async {
        let log = CallLog::default();
        let chain = ledger();
        let alice = MemoryChain::new(&chain, &log);
        let bob = MemoryChain::new(&chain, &log);
        let carol = MemoryChain::new(&chain, &log);
        let relay = MemoryRelay::new(&log);

        let mut sender = MessageSendOrchestrator::new(context(&alice, &relay));
        let sent = sender.send(&request(&bob, "private", Payload::raw("for bob"))).await?;

        let eavesdropper = MessageReceiveOrchestrator::new(context(&carol, &relay));
        let result = eavesdropper.read_txid(&sent.txid).await;
        assert!(matches!(result, Err(WalletError::DecryptionFailed(_))));
        Ok::<(), Box<dyn std::error::Error>>(())
    })
    .await
}

#[tokio::test]
async fn test_recipient_without_history() -> TestResult {
    bounded(async {
        let log = CallLog::default();
        let chain = ledger();
        let alice = MemoryChain::new(&chain, &log);
        let fresh = MemoryChain::without_history(&chain, &log);
        let relay = MemoryRelay::new(&log);

        let mut sender = MessageSendOrchestrator::new(context(&alice, &relay));
        let failure = sender
            .send(&request(&fresh, "s", Payload::raw("x")))
            .await
            .expect_err("no public key on chain");
        assert_eq!(failure.stage, SendStage::ResolvingKey);
        assert!(matches!(failure.error, WalletError::AddressHasNoHistory(_)));
        assert_eq!(log.count("publish"), 0);
        Ok::<(), Box<dyn std::error::Error>>(())
    })
    .await
}

#[tokio::test]
async fn test_key_lookup_retried_on_outage() -> TestResult {
    bounded(async {
        let log = CallLog::default();
        let chain = ledger();
        let alice = MemoryChain::new(&chain, &log);
        let bob = MemoryChain::new(&chain, &log);
        let relay = MemoryRelay::new(&log);
        chain.lock().pubkey_outages = 2;

        let retry = RetryPolicy {
            attempts: 3,
            delay: Duration::from_millis(1),
        };
        let mut sender = MessageSendOrchestrator::new(context(&alice, &relay).with_retry(retry));
        sender.send(&request(&bob, "s", Payload::raw("x"))).await?;
        assert_eq!(log.count("get_public_key"), 3);
        assert_eq!(log.count("broadcast"), 1);
        Ok::<(), Box<dyn std::error::Error>>(())
    })
    .await
}

#[tokio::test]
async fn test_invalid_requests_fail_before_any_call() -> TestResult {
    bounded(async {
        let log = CallLog::default();
        let chain = ledger();
        let alice = MemoryChain::new(&chain, &log);
        let bob = MemoryChain::new(&chain, &log);
        let relay = MemoryRelay::new(&log);
        let mut sender = MessageSendOrchestrator::new(context(&alice, &relay));

        let long_subject = "s".repeat(300);
        let failure = sender
            .send(&request(&bob, &long_subject, Payload::raw("x")))
            .await
            .expect_err("subject too long");
        assert!(matches!(failure.error, WalletError::EncodingTooLarge { .. }));
        assert_eq!(failure.stage, SendStage::Validating);
        assert_eq!(sender.transitions().len(), 2);
        assert_eq!(sender.transitions()[0], SendState::Validating);
        assert!(matches!(
            sender.state(),
            SendState::Failed {
                at: SendStage::Validating,
                ..
            }
        ));

        let bad_address = SendRequest {
            recipient: "bitcoincash:notanaddress".to_string(),
            subject: "s".to_string(),
            payload: Payload::raw("x"),
        };
        let failure = sender.send(&bad_address).await.expect_err("bad address");
        assert!(matches!(failure.error, WalletError::Validation(_)));

        assert!(log.calls().is_empty());
        Ok::<(), Box<dyn std::error::Error>>(())
    })
    .await
}

#[tokio::test]
async fn test_check_lists_most_recent_first() -> TestResult {
    bounded(async {
        let log = CallLog::default();
        let chain = ledger();
        let alice = MemoryChain::new(&chain, &log);
        let bob = MemoryChain::new(&chain, &log);
        let relay = MemoryRelay::new(&log);

        let mut sender = MessageSendOrchestrator::new(context(&alice, &relay));
        let first = sender.send(&request(&bob, "first", Payload::raw("1"))).await?;
        let second = sender.send(&request(&bob, "second", Payload::raw("2"))).await?;
        let third = sender.send(&request(&bob, "third", Payload::raw("3"))).await?;
        chain.lock().confirm(&first.txid, 100);
        chain.lock().confirm(&third.txid, 101);

        let inbox = MessageReceiveOrchestrator::new(context(&bob, &relay))
            .check()
            .await?;
        let subjects: Vec<&str> = inbox.iter().map(|r| r.subject.as_str()).collect();
        assert_eq!(subjects, vec!["second", "third", "first"]);
        assert_eq!(inbox[0].signal_txid, second.txid);
        Ok::<(), Box<dyn std::error::Error>>(())
    })
    .await
}

#[tokio::test]
async fn test_read_txid_without_signal() -> TestResult {
    bounded(async {
        let log = CallLog::default();
        let chain = ledger();
        let bob = MemoryChain::new(&chain, &log);
        let relay = MemoryRelay::new(&log);

        // plain payment with no data output
        let txid = bob
            .build_and_broadcast(&[bchmsg::chain::TxOutput {
                value: 1_000,
                script: bchmsg::chain::script::p2pkh(&[7u8; 20]),
            }])
            .await?;

        let receiver = MessageReceiveOrchestrator::new(context(&bob, &relay));
        assert!(matches!(
            receiver.read_txid(&txid).await,
            Err(WalletError::MessageNotFound(_))
        ));
        assert!(matches!(
            receiver.read_txid("not-a-txid").await,
            Err(WalletError::Validation(_))
        ));
        Ok::<(), Box<dyn std::error::Error>>(())
    })
    .await
}
