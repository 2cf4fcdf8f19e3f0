mod common;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use adsprims_client::{ClientConfig, ClientEvent};
use adsprims_frame::{AdsState, ADS_READ_STATE};
use common::{read_state_ok, response, result_only};
use tokio::sync::broadcast;

fn drain(events: &mut broadcast::Receiver<ClientEvent>) -> Vec<ClientEvent> {
    let mut seen = Vec::new();
    while let Ok(event) = events.try_recv() {
        seen.push(event);
    }
    seen
}

async fn next_event(events: &mut broadcast::Receiver<ClientEvent>) -> ClientEvent {
    tokio::time::timeout(Duration::from_secs(2), events.recv())
        .await
        .expect("no event within 2s")
        .expect("event channel closed")
}

#[tokio::test]
async fn monitor_reports_state_changes() {
    let mut runtime_polls = 0u32;
    let (client, _device) = common::start(common::config(), move |request| {
        let payload = match (request.header.command, request.header.target.port) {
            (ADS_READ_STATE, 10000) => read_state_ok(AdsState::Run.code(), 0),
            (ADS_READ_STATE, _) => {
                runtime_polls += 1;
                let state = if runtime_polls < 3 {
                    AdsState::Stop
                } else {
                    AdsState::Run
                };
                read_state_ok(state.code(), 0)
            }
            _ => result_only(0x701),
        };
        vec![response(request, 0, &payload)]
    })
    .await;
    let mut events = client.events();
    client.start_monitor(Duration::from_millis(20));

    let mut transitions = Vec::new();
    loop {
        match next_event(&mut events).await {
            ClientEvent::RuntimeStateChanged {
                port,
                previous,
                current,
            } => {
                assert_eq!(port, 851);
                transitions.push((previous, current));
                if current == AdsState::Run {
                    break;
                }
            }
            ClientEvent::SystemStateChanged { current, .. } => {
                assert_eq!(current, AdsState::Run)
            }
            other => panic!("unexpected event {other:?}"),
        }
    }
    assert_eq!(
        transitions,
        vec![(None, AdsState::Stop), (Some(AdsState::Stop), AdsState::Run)]
    );

    let states = client.system_state();
    assert_eq!(states.system, Some(AdsState::Run));
    assert_eq!(states.runtime, Some(AdsState::Run));
    client.stop_monitor();
}

#[tokio::test]
async fn unreachable_port_leaves_state_unknown() {
    let (client, _device) = common::start(common::config(), |request| {
        match request.header.target.port {
            10000 => vec![response(request, 0, &read_state_ok(AdsState::Config.code(), 0))],
            _ => vec![response(request, 0x6, &[])],
        }
    })
    .await;
    let mut events = client.events();
    client.start_monitor(Duration::from_millis(20));

    assert_eq!(
        next_event(&mut events).await,
        ClientEvent::SystemStateChanged {
            previous: None,
            current: AdsState::Config
        }
    );
    tokio::time::sleep(Duration::from_millis(60)).await;
    assert_eq!(client.system_state().runtime, None);
    assert!(events.try_recv().is_err());
    client.stop_monitor();
}

#[tokio::test]
async fn monitor_stops_on_timeout_and_reports_loss() {
    let config = ClientConfig {
        request_timeout: Duration::from_millis(50),
        ..common::config()
    };
    let (client, _device) = common::start(config, |_| Vec::new()).await;
    let mut events = client.events();
    client.start_monitor(Duration::from_millis(10));
    match next_event(&mut events).await {
        ClientEvent::ConnectionLost { reason } => assert!(reason.contains("timed out"), "{reason}"),
        other => panic!("unexpected event {other:?}"),
    }
}

#[tokio::test]
async fn replaced_loop_timing_out_leaves_new_loop_running() {
    let config = ClientConfig {
        request_timeout: Duration::from_millis(100),
        ..common::config()
    };
    let polls = Arc::new(AtomicUsize::new(0));
    let counter = polls.clone();
    let (client, mut device) = common::start(config, move |request| {
        // The very first poll never gets an answer.
        if counter.fetch_add(1, Ordering::SeqCst) == 0 {
            return Vec::new();
        }
        vec![response(request, 0, &read_state_ok(AdsState::Run.code(), 0))]
    })
    .await;
    let mut events = client.events();

    client.start_monitor(Duration::from_millis(20));
    device.next_request().await;
    client.start_monitor(Duration::from_millis(20));

    // The first loop's request has timed out by now.
    tokio::time::sleep(Duration::from_millis(250)).await;
    let mid = polls.load(Ordering::SeqCst);
    tokio::time::sleep(Duration::from_millis(150)).await;
    assert!(
        polls.load(Ordering::SeqCst) > mid,
        "replacement loop stopped polling"
    );

    let lost: Vec<_> = drain(&mut events)
        .into_iter()
        .filter(|event| matches!(event, ClientEvent::ConnectionLost { .. }))
        .collect();
    assert!(lost.is_empty(), "{lost:?}");
    assert_eq!(client.system_state().system, Some(AdsState::Run));
    client.stop_monitor();
}

#[tokio::test]
async fn poll_in_flight_at_stop_publishes_nothing() {
    let (client, mut device) = common::start(common::config(), |_| Vec::new()).await;
    let mut events = client.events();

    client.start_monitor(Duration::from_millis(20));
    let system = device.next_request().await;
    assert_eq!(system.header.target.port, 10000);
    client.stop_monitor();

    device.push(response(&system, 0, &read_state_ok(AdsState::Run.code(), 0)));
    let runtime = device.next_request().await;
    device.push(response(&runtime, 0, &read_state_ok(AdsState::Run.code(), 0)));

    tokio::time::sleep(Duration::from_millis(60)).await;
    assert_eq!(client.system_state().system, None);
    assert_eq!(client.system_state().runtime, None);
    assert!(drain(&mut events).is_empty());
}
