use std::time::Duration;

use super::*;
use crate::identity::cookie::CookieIdentity;
use crate::identity::{AuthEvent, AuthEvents};
use crate::services::accounts::AccountStore;
use crate::services::session::session_key;
use crate::state::test_helpers::{FakeIdentity, MemoryAccounts, actor};

const WAIT: Duration = Duration::from_secs(2);

async fn next_state(rx: &mut watch::Receiver<ActorIdentity>) -> ActorIdentity {
    tokio::time::timeout(WAIT, rx.changed()).await.unwrap().unwrap();
    rx.borrow_and_update().clone()
}

#[test]
fn identity_constructors() {
    assert_eq!(ActorIdentity::resolving(), ActorIdentity { actor_id: None, is_resolving: true });
    assert!(!ActorIdentity::resolving().is_signed_in());
    assert!(!ActorIdentity::resolved(None).is_signed_in());
    assert!(ActorIdentity::resolved(Some(actor("a"))).is_signed_in());
}

#[tokio::test]
async fn starts_resolving() {
    let provider = FakeIdentity::new(Some(actor("a")));
    provider.valve.hold();
    let tracker = SessionTracker::activate(provider.clone());
    assert_eq!(tracker.snapshot(), ActorIdentity::resolving());
}

#[tokio::test]
async fn fetch_answer_resolves() {
    let provider = FakeIdentity::new(Some(actor("a")));
    let tracker = SessionTracker::activate(provider.clone());
    let state = tokio::time::timeout(WAIT, tracker.resolved()).await.unwrap();
    assert_eq!(state, ActorIdentity::resolved(Some(actor("a"))));
    assert_eq!(provider.fetch_count(), 1);
}

#[tokio::test]
async fn signed_out_fetch_resolves_to_none() {
    let provider = FakeIdentity::new(None);
    let tracker = SessionTracker::activate(provider);
    let state = tokio::time::timeout(WAIT, tracker.resolved()).await.unwrap();
    assert_eq!(state, ActorIdentity::resolved(None));
}

#[tokio::test]
async fn failed_fetch_reads_as_signed_out() {
    let provider = FakeIdentity::new(Some(actor("a")));
    provider.fail_fetches();
    let tracker = SessionTracker::activate(provider);
    let state = tokio::time::timeout(WAIT, tracker.resolved()).await.unwrap();
    assert_eq!(state, ActorIdentity::resolved(None));
}

#[tokio::test]
async fn push_before_fetch_resolves_on_push() {
    let provider = FakeIdentity::new(None);
    provider.valve.hold();
    let tracker = SessionTracker::activate(provider.clone());
    let mut rx = tracker.watch();

    provider.sign_in(actor("a"));
    assert_eq!(next_state(&mut rx).await, ActorIdentity::resolved(Some(actor("a"))));

    // The late fetch reads the same actor; nothing new is published.
    provider.valve.release();
    tokio::time::sleep(Duration::from_millis(20)).await;
    assert_eq!(tracker.snapshot(), ActorIdentity::resolved(Some(actor("a"))));
}

#[tokio::test]
async fn push_after_fetch_overrides_actor() {
    let provider = FakeIdentity::new(Some(actor("a")));
    let tracker = SessionTracker::activate(provider.clone());
    let mut rx = tracker.watch();
    assert_eq!(next_state(&mut rx).await, ActorIdentity::resolved(Some(actor("a"))));

    provider.sign_in(actor("b"));
    assert_eq!(next_state(&mut rx).await, ActorIdentity::resolved(Some(actor("b"))));

    provider.sign_out();
    assert_eq!(next_state(&mut rx).await, ActorIdentity::resolved(None));
}

#[tokio::test]
async fn token_refresh_keeps_actor() {
    let provider = FakeIdentity::new(Some(actor("a")));
    let tracker = SessionTracker::activate(provider.clone());
    tokio::time::timeout(WAIT, tracker.resolved()).await.unwrap();

    provider.emit(AuthEvent::TokenRefreshed(actor("a")));
    tokio::time::sleep(Duration::from_millis(20)).await;
    assert_eq!(tracker.snapshot(), ActorIdentity::resolved(Some(actor("a"))));
}

#[tokio::test]
async fn resolving_never_reverts() {
    let provider = FakeIdentity::new(None);
    let tracker = SessionTracker::activate(provider.clone());
    let mut rx = tracker.watch();
    tokio::time::timeout(WAIT, tracker.resolved()).await.unwrap();
    rx.borrow_and_update();

    provider.sign_in(actor("a"));
    provider.sign_out();
    provider.sign_in(actor("b"));
    for _ in 0..3 {
        let state = next_state(&mut rx).await;
        assert!(!state.is_resolving);
        if state.actor_id == Some(actor("b")) {
            break;
        }
    }
}

#[tokio::test]
async fn drop_cancels_tracking() {
    let provider = FakeIdentity::new(Some(actor("a")));
    provider.valve.hold();
    let tracker = SessionTracker::activate(provider.clone());
    let mut rx = tracker.watch();
    drop(tracker);

    // The aborted task drops its sender without ever publishing.
    let closed = tokio::time::timeout(WAIT, rx.changed()).await.unwrap();
    assert!(closed.is_err());
    assert!(rx.borrow().is_resolving);

    provider.valve.release();
    provider.sign_in(actor("b"));
    tokio::time::sleep(Duration::from_millis(20)).await;
    assert_eq!(*rx.borrow(), ActorIdentity::resolving());
}

#[tokio::test]
async fn lagged_subscriber_refetches_and_sees_sign_out() {
    let accounts = MemoryAccounts::new();
    let ana = accounts.add_user("ana@example.org", "secret1");
    let token = accounts.open_session(&ana);
    let events = AuthEvents::new();
    let provider = Arc::new(CookieIdentity::new(accounts.clone(), Some(token.clone()), events.clone()));

    let tracker = SessionTracker::activate(provider);
    let state = tokio::time::timeout(WAIT, tracker.resolved()).await.unwrap();
    assert_eq!(state.actor_id, Some(ana));

    // The sign-out is buried under more traffic than the bus holds before
    // the tracker gets to run again.
    accounts.sign_out(&token).await.unwrap();
    events.publish(Some(&session_key(&token)), AuthEvent::SignedOut);
    for i in 0..300 {
        events.publish(Some(&session_key(&format!("other-{i}"))), AuthEvent::SignedIn(actor("b")));
    }

    let mut rx = tracker.watch();
    let state = tokio::time::timeout(WAIT, rx.wait_for(|state| state.actor_id.is_none()))
        .await
        .unwrap()
        .unwrap()
        .clone();
    assert_eq!(state, ActorIdentity::resolved(None));
}
