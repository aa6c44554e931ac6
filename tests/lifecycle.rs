//! Connection lifecycle: connect, loss, backoff, permanent fallback,
//! explicit disconnect and manual reconnect.

mod common;

use std::time::Duration;

use tokio::time;
use tokio_test::{assert_err, assert_ok};

use hotel_realtime::{
    ConnectionState, ConnectionStatus, Error, EventKind, Quality, RealtimeEvent, TopicId,
};

use common::{MockTransport, client_with, quiet_options, record, settle};

fn ms(millis: u64) -> Duration {
    Duration::from_millis(millis)
}

fn statuses(events: &[RealtimeEvent]) -> Vec<ConnectionStatus> {
    events
        .iter()
        .filter_map(|event| match event {
            RealtimeEvent::ConnectionStatus(status) => Some(status.clone()),
            _ => None,
        })
        .collect()
}

// ============================================================================
// Connect
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_connect_marks_connected() {
    common::init_tracing();
    let transport = MockTransport::new();
    let client = client_with(&transport, quiet_options());
    let events = record(&client, &[EventKind::ConnectionStatus]);

    assert_ok!(client.connect("hotel-1").await);

    let status = client.status();
    assert!(status.is_connected);
    assert_eq!(status.channel_id.as_ref().map(|id| id.as_str()), Some("mock-1"));
    assert_eq!(status.tenant_id.as_ref().map(|id| id.as_str()), Some("hotel-1"));
    assert_eq!(status.quality, Quality::Good);
    assert_eq!(status.reconnect_attempts, 0);
    assert!(!status.fallback_active);
    assert!(status.last_connected_at.is_some());
    assert_eq!(status.state, ConnectionState::Connected);

    let peer = transport.take_peer();
    assert_eq!(peer.tenant_id.as_str(), "hotel-1");

    assert!(matches!(
        statuses(&events.lock()).as_slice(),
        [ConnectionStatus::Connected { .. }]
    ));
}

#[tokio::test(start_paused = true)]
async fn test_connect_is_idempotent() {
    let transport = MockTransport::new();
    let client = client_with(&transport, quiet_options());

    assert_ok!(client.connect("hotel-1").await);
    assert_ok!(client.connect("hotel-1").await);

    assert_eq!(transport.open_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_connect_to_other_tenant_replaces_channel() {
    let transport = MockTransport::new();
    let client = client_with(&transport, quiet_options());

    assert_ok!(client.connect("hotel-1").await);
    let first = transport.take_peer();
    assert!(assert_ok!(client.subscribe_to_topic("inst-of-hotel-1", true).await));
    first.confirm("inst-of-hotel-1");
    settle().await;

    assert_ok!(client.connect("hotel-2").await);
    settle().await;

    assert_eq!(transport.open_count(), 2);
    assert!(first.is_closed());

    let status = client.status();
    assert_eq!(status.tenant_id.as_ref().map(|id| id.as_str()), Some("hotel-2"));
    assert!(status.subscribed_topics.is_empty());

    // Topics of the previous tenant are not carried over
    let mut second = transport.take_peer();
    assert_eq!(second.tenant_id.as_str(), "hotel-2");
    assert!(second.drain_subscriptions().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_tenant_switch_raises_fallback_until_new_channel_opens() {
    let transport = MockTransport::new();
    let client = client_with(&transport, quiet_options());

    assert_ok!(client.connect("hotel-1").await);
    let first = transport.take_peer();
    let events = record(
        &client,
        &[EventKind::ConnectionStatus, EventKind::FallbackMode],
    );

    transport.set_open_delay(Duration::from_secs(5));
    let switching = {
        let client = client.clone();
        tokio::spawn(async move { client.connect("hotel-2").await })
    };
    time::sleep(Duration::from_secs(1)).await;

    assert!(first.is_closed());
    let status = client.status();
    assert!(!status.is_connected);
    assert!(status.fallback_active);
    assert!(!status.fallback_permanent);
    assert_eq!(status.quality, Quality::Failed);
    assert_eq!(status.state, ConnectionState::Connecting);

    assert_ok!(switching.await.expect("join"));

    let status = client.status();
    assert!(status.is_connected);
    assert!(!status.fallback_active);
    assert_eq!(status.quality, Quality::Good);

    let events = events.lock();
    assert!(matches!(
        events.as_slice(),
        [
            RealtimeEvent::FallbackMode(raised),
            RealtimeEvent::ConnectionStatus(ConnectionStatus::Disconnected { reason }),
            RealtimeEvent::ConnectionStatus(ConnectionStatus::Connected { .. }),
            RealtimeEvent::FallbackMode(cleared),
        ] if raised.enabled
            && !raised.permanent
            && raised.reason == "tenant switch"
            && reason == "tenant switch"
            && !cleared.enabled
    ));
}

#[tokio::test(start_paused = true)]
async fn test_failed_first_connect_errors_and_falls_back() {
    let transport = MockTransport::new();
    transport.set_failing(true);
    let client = client_with(&transport, quiet_options());

    let err = assert_err!(client.connect("hotel-1").await);
    assert!(err.is_connection_error());

    let status = client.status();
    assert!(!status.is_connected);
    assert!(status.fallback_active);
    assert_eq!(status.quality, Quality::Failed);
    assert_eq!(status.state, ConnectionState::Reconnecting { attempt: 1 });
}

#[tokio::test(start_paused = true)]
async fn test_connect_timeout() {
    let transport = MockTransport::new();
    transport.set_open_delay(Duration::from_secs(60));
    let options = quiet_options().with_connect_timeout(Duration::from_secs(2));
    let client = client_with(&transport, options);

    let err = assert_err!(client.connect("hotel-1").await);
    assert!(matches!(err, Error::ConnectionTimeout { timeout_ms: 2000 }));
    assert!(err.is_timeout());
}

// ============================================================================
// Loss and Reconnection
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_transport_loss_falls_back_then_recovers() {
    let transport = MockTransport::new();
    let client = client_with(&transport, quiet_options());
    let events = record(
        &client,
        &[EventKind::ConnectionStatus, EventKind::FallbackMode],
    );

    assert_ok!(client.connect("hotel-1").await);
    transport.take_peer().close("ping timeout");
    settle().await;

    let status = client.status();
    assert!(!status.is_connected);
    assert!(status.channel_id.is_none());
    assert!(status.fallback_active);

    time::sleep(ms(1001)).await;
    settle().await;

    let status = client.status();
    assert!(status.is_connected);
    assert!(!status.fallback_active);
    assert_eq!(status.reconnect_attempts, 0);
    assert_eq!(transport.open_count(), 2);

    let events = events.lock();
    assert_eq!(
        statuses(&events)[1..],
        [
            ConnectionStatus::Disconnected {
                reason: "ping timeout".to_string()
            },
            ConnectionStatus::Reconnecting {
                attempt: 1,
                max_attempts: 5
            },
            ConnectionStatus::Connected {
                channel_id: "mock-2".into()
            },
        ]
    );

    let fallback: Vec<(bool, bool)> = events
        .iter()
        .filter_map(|event| match event {
            RealtimeEvent::FallbackMode(notice) => Some((notice.enabled, notice.permanent)),
            _ => None,
        })
        .collect();
    assert_eq!(fallback, vec![(true, false), (false, false)]);
}

#[tokio::test(start_paused = true)]
async fn test_stream_end_counts_as_loss() {
    let transport = MockTransport::new();
    let client = client_with(&transport, quiet_options());

    assert_ok!(client.connect("hotel-1").await);
    drop(transport.take_peer());
    settle().await;

    let status = client.status();
    assert!(!status.is_connected);
    assert_eq!(status.state, ConnectionState::Reconnecting { attempt: 1 });
}

#[tokio::test(start_paused = true)]
async fn test_backoff_delays_between_attempts() {
    let transport = MockTransport::new();
    transport.set_failing(true);
    let client = client_with(&transport, quiet_options());

    assert_err!(client.connect("hotel-1").await);
    time::sleep(Duration::from_secs(120)).await;

    let opens = transport.open_times();
    let gaps: Vec<u128> = opens
        .windows(2)
        .map(|pair| (pair[1] - pair[0]).as_millis())
        .collect();

    assert_eq!(gaps, vec![1000, 2000, 4000, 8000, 16000]);
}

#[tokio::test(start_paused = true)]
async fn test_exhausted_attempts_enter_permanent_fallback() {
    let transport = MockTransport::new();
    let client = client_with(&transport, quiet_options());

    assert_ok!(client.connect("hotel-1").await);

    // Capture the attempt counter at the moment permanent fallback fires
    let observed = std::sync::Arc::new(parking_lot::Mutex::new(Vec::new()));
    {
        let observed = std::sync::Arc::clone(&observed);
        let watcher = client.clone();
        client.add_event_listener(EventKind::FallbackMode, move |event| {
            if let RealtimeEvent::FallbackMode(notice) = event
                && notice.permanent
            {
                observed.lock().push(watcher.status().reconnect_attempts);
            }
        });
    }
    let events = record(&client, &[EventKind::ConnectionStatus]);

    transport.set_failing(true);
    transport.take_peer().close("server restart");
    time::sleep(Duration::from_secs(120)).await;

    assert_eq!(*observed.lock(), vec![5]);

    let status = client.status();
    assert_eq!(status.reconnect_attempts, 5);
    assert!(status.fallback_active);
    assert!(status.fallback_permanent);
    assert_eq!(status.state, ConnectionState::FailedPermanent);
    assert_eq!(transport.open_count(), 1 + 5);

    assert_eq!(
        statuses(&events.lock()).last(),
        Some(&ConnectionStatus::Failed { attempts: 5 })
    );

    // No further automatic attempts
    time::sleep(Duration::from_secs(3600)).await;
    assert_eq!(transport.open_count(), 1 + 5);
}

#[tokio::test(start_paused = true)]
async fn test_reconnect_attempts_are_sequential() {
    let transport = MockTransport::new();
    transport.set_failing(true);
    transport.set_open_delay(Duration::from_secs(10));
    let client = client_with(&transport, quiet_options());

    assert_err!(client.connect("hotel-1").await);

    // Attempt 1 starts at +1s and is still in flight at +5s
    time::sleep(Duration::from_secs(5)).await;
    assert_eq!(transport.open_count(), 2);
    assert_eq!(
        client.status().state,
        ConnectionState::Reconnecting { attempt: 1 }
    );

    // Attempt 1 fails at +21s; attempt 2 is not opened before +23s
    time::sleep(Duration::from_secs(7)).await;
    assert_eq!(transport.open_count(), 2);
    assert_eq!(
        client.status().state,
        ConnectionState::Reconnecting { attempt: 2 }
    );
}

// ============================================================================
// Disconnect
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_disconnect_cancels_pending_timer() -> anyhow::Result<()> {
    let transport = MockTransport::new();
    let client = client_with(&transport, quiet_options());

    client.connect("hotel-1").await?;
    assert!(client.subscribe_to_topic("inst-1", false).await?);

    transport.take_peer().close("network change");
    settle().await;
    assert_eq!(
        client.status().state,
        ConnectionState::Reconnecting { attempt: 1 }
    );

    client.disconnect();
    time::sleep(Duration::from_secs(600)).await;

    assert_eq!(transport.open_count(), 1);

    let status = client.status();
    assert!(status.subscribed_topics.is_empty());
    assert!(!status.is_connected);
    assert_eq!(status.state, ConnectionState::Disconnected);

    // Registry is empty: a fresh session replays nothing
    client.connect("hotel-1").await?;
    assert!(transport.take_peer().drain_subscriptions().is_empty());
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_disconnect_notifies_then_clears_listeners() {
    let transport = MockTransport::new();
    let client = client_with(&transport, quiet_options());
    let events = record(
        &client,
        &[EventKind::ConnectionStatus, EventKind::FallbackMode],
    );

    assert_ok!(client.connect("hotel-1").await);
    let peer = transport.take_peer();

    client.disconnect();
    settle().await;

    assert!(peer.is_closed());
    assert!(client.status().fallback_active);

    let seen = events.lock().len();
    assert!(matches!(
        statuses(&events.lock()).last(),
        Some(ConnectionStatus::Disconnected { reason }) if reason == "client disconnect"
    ));

    // Listeners are gone after disconnect
    assert_ok!(client.connect("hotel-1").await);
    assert_eq!(events.lock().len(), seen);
}

#[tokio::test(start_paused = true)]
async fn test_disconnect_wins_over_inflight_connect() {
    let transport = MockTransport::new();
    transport.set_open_delay(ms(500));
    let client = client_with(&transport, quiet_options());

    let connecting = {
        let client = client.clone();
        tokio::spawn(async move { client.connect("hotel-1").await })
    };
    settle().await;
    assert_eq!(transport.open_count(), 1);

    client.disconnect();

    let result = connecting.await.expect("join");
    assert!(matches!(result, Err(Error::ConnectionAborted)));

    settle().await;
    let status = client.status();
    assert!(!status.is_connected);
    assert!(status.channel_id.is_none());

    time::sleep(Duration::from_secs(60)).await;
    assert_eq!(transport.open_count(), 1);
}

// ============================================================================
// Manual Reconnect
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_manual_reconnect_leaves_permanent_fallback() {
    let transport = MockTransport::new();
    let options = quiet_options().with_max_attempts(2);
    let client = client_with(&transport, options);

    assert_ok!(client.connect("hotel-1").await);
    assert!(assert_ok!(client.subscribe_to_topic("inst-1", false).await));

    transport.set_failing(true);
    transport.take_peer().close("backend down");
    time::sleep(Duration::from_secs(60)).await;

    let status = client.status();
    assert!(status.fallback_permanent);
    assert_eq!(status.reconnect_attempts, 2);

    transport.set_failing(false);
    assert_ok!(client.reconnect().await);

    let status = client.status();
    assert!(status.is_connected);
    assert_eq!(status.reconnect_attempts, 0);
    assert!(!status.fallback_permanent);
    assert!(!status.fallback_active);

    // Subscriptions survive the permanent failure
    assert_eq!(
        transport.take_peer().drain_subscriptions(),
        vec![TopicId::from("inst-1")]
    );
}

#[tokio::test(start_paused = true)]
async fn test_manual_reconnect_raises_fallback_while_reopening() {
    let transport = MockTransport::new();
    let client = client_with(&transport, quiet_options());

    assert_ok!(client.connect("hotel-1").await);
    assert!(assert_ok!(client.subscribe_to_topic("inst-1", false).await));
    let first = transport.take_peer();
    first.confirm("inst-1");
    settle().await;

    let events = record(
        &client,
        &[EventKind::ConnectionStatus, EventKind::FallbackMode],
    );

    transport.set_open_delay(Duration::from_secs(10));
    let reconnecting = {
        let client = client.clone();
        tokio::spawn(async move { client.reconnect().await })
    };
    time::sleep(Duration::from_secs(1)).await;

    assert!(first.is_closed());
    let status = client.status();
    assert!(!status.is_connected);
    assert!(status.channel_id.is_none());
    assert!(status.fallback_active);
    assert!(!status.fallback_permanent);
    assert_eq!(status.quality, Quality::Failed);
    assert_eq!(status.state, ConnectionState::Connecting);

    assert_ok!(reconnecting.await.expect("join"));

    let status = client.status();
    assert!(status.is_connected);
    assert!(!status.fallback_active);
    assert_eq!(status.quality, Quality::Good);

    // Same tenant: subscriptions are replayed
    assert_eq!(
        transport.take_peer().drain_subscriptions(),
        vec![TopicId::from("inst-1")]
    );

    let events = events.lock();
    assert!(matches!(
        events.as_slice(),
        [
            RealtimeEvent::FallbackMode(raised),
            RealtimeEvent::ConnectionStatus(ConnectionStatus::Disconnected { reason }),
            RealtimeEvent::ConnectionStatus(ConnectionStatus::Connected { .. }),
            RealtimeEvent::FallbackMode(cleared),
        ] if raised.enabled
            && !raised.permanent
            && raised.reason == "manual reconnect"
            && reason == "manual reconnect"
            && !cleared.enabled
    ));
}

#[tokio::test(start_paused = true)]
async fn test_manual_reconnect_resets_even_when_it_fails() {
    let transport = MockTransport::new();
    let options = quiet_options().with_max_attempts(1);
    let client = client_with(&transport, options);

    transport.set_failing(true);
    assert_err!(client.connect("hotel-1").await);
    time::sleep(Duration::from_secs(10)).await;
    assert!(client.status().fallback_permanent);

    assert_err!(client.reconnect().await);

    let status = client.status();
    assert!(!status.fallback_permanent);
    assert_eq!(status.reconnect_attempts, 1);
    assert_eq!(status.state, ConnectionState::Reconnecting { attempt: 1 });
}
