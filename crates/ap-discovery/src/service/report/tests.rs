use std::net::SocketAddr;
use std::time::Duration;

use ap_wire::messages::{ReportRequest, ReportResponse};
use ap_wire::AddressRecord;

use super::*;
use crate::adapters::{RecordingEventSink, RecordingTransport};
use crate::domain::{
    EventOutcome, EventSource, ReportConfig, ServerCategory, ServerEndpoint, ServerSetUpdate,
};
use crate::ports::{ServerSetListener, TimerDriven};
use crate::test_utils::{deliver, ManualTimeSource};

type Client = ReportServerClient<RecordingTransport, RecordingEventSink>;

fn addr(text: &str) -> SocketAddr {
    text.parse().unwrap()
}

fn client() -> (Client, RecordingEventSink, ManualTimeSource) {
    let clock = ManualTimeSource::new(1_000);
    let sink = RecordingEventSink::new();
    let client = ReportServerClient::new(
        ReportConfig::for_testing(),
        ReportLookup {
            key: "app".into(),
            sid: "session".into(),
            ..Default::default()
        },
        RecordingTransport::new(),
        sink.clone(),
        clock.boxed(),
    )
    .unwrap();
    (client, sink, clock)
}

fn add_server(client: &mut Client, server: SocketAddr) {
    client.on_server_set(&ServerSetUpdate::Servers {
        category: ServerCategory::Default,
        servers: vec![ServerEndpoint::from_addr(server)],
    });
}

fn last_request(client: &Client) -> ReportRequest {
    let packets = client.transport().sent_packets();
    packets
        .last()
        .map(|(_, packet)| packet.decode_body::<ReportRequest>().unwrap())
        .unwrap()
}

// =============================================================================
// TEST GROUP 1: Lookup Cadence
// =============================================================================

#[test]
fn test_no_candidate_degrades_silently() {
    let (mut client, sink, _) = client();
    client.start();

    assert!(client.is_running());
    assert!(sink.is_empty());
    assert_eq!(client.transport().sent_count(), 0);
}

#[test]
fn test_success_updates_report_servers() {
    let ap = addr("192.0.2.10:8000");
    let (mut client, sink, clock) = client();
    add_server(&mut client, ap);
    client.start();

    let request = last_request(&client);
    assert_eq!(request.key, "app");
    assert_eq!(request.flags, crate::domain::ServiceFlags::REPORT.bits());

    clock.advance_millis(40);
    deliver(
        &mut client,
        ap,
        &ReportResponse {
            opid: request.opid,
            code: 0,
            addresses: vec![AddressRecord::from_socket_addr(addr("198.51.100.7:6080"), "")],
            ..Default::default()
        },
    );

    assert_eq!(client.report_servers().len(), 1);
    assert_eq!(client.report_servers()[0].addr, addr("198.51.100.7:6080"));
    let event = sink.last().unwrap();
    assert_eq!(event.source, EventSource::ReportClient);
    assert_eq!(event.outcome, EventOutcome::Succeeded);
    assert_eq!(event.elapsed, Duration::from_millis(40));
    assert!(client.transport().open_connections().is_empty());
    assert!(!client.selector().is_inuse(&ap));
}

#[test]
fn test_next_lookup_on_interval() {
    let ap = addr("192.0.2.10:8000");
    let (mut client, _, clock) = client();
    add_server(&mut client, ap);
    client.start();
    let first = last_request(&client);
    deliver(
        &mut client,
        ap,
        &ReportResponse {
            opid: first.opid,
            ..Default::default()
        },
    );

    clock.advance_millis(999);
    client.on_tick();
    assert_eq!(client.transport().sent_count(), 1);

    clock.advance_millis(1);
    client.on_tick();
    assert_eq!(client.transport().sent_count(), 2);
}

// =============================================================================
// TEST GROUP 2: Failures Feed Backoff
// =============================================================================

#[test]
fn test_rejection_backs_off_without_event() {
    let ap = addr("192.0.2.10:8000");
    let (mut client, sink, _) = client();
    add_server(&mut client, ap);
    client.start();
    let request = last_request(&client);

    deliver(
        &mut client,
        ap,
        &ReportResponse {
            opid: request.opid,
            code: ap_wire::status::TOKEN_EXPIRED,
            ..Default::default()
        },
    );

    assert!(sink.is_empty());
    assert!(client.report_servers().is_empty());
    assert_eq!(client.selector().entry(&ap).unwrap().backoff_ms, 100);
}

#[test]
fn test_silent_server_times_out() {
    let ap = addr("192.0.2.10:8000");
    let (mut client, sink, clock) = client();
    add_server(&mut client, ap);
    client.start();

    clock.advance_millis(1_000);
    client.on_tick();

    assert!(sink.is_empty());
    let entry = client.selector().entry(&ap).unwrap();
    assert_eq!(entry.backoff_ms, 100);
    assert!(!client.selector().is_inuse(&ap));
    // Still cooling down, so the new round found no candidate.
    assert_eq!(client.transport().sent_count(), 1);
}

#[test]
fn test_stale_response_dropped() {
    let ap = addr("192.0.2.10:8000");
    let (mut client, sink, _) = client();
    add_server(&mut client, ap);
    client.start();
    let request = last_request(&client);

    deliver(
        &mut client,
        ap,
        &ReportResponse {
            opid: request.opid.wrapping_add(1),
            ..Default::default()
        },
    );

    assert!(sink.is_empty());
    assert!(client.selector().is_inuse(&ap));
}

#[test]
fn test_stop_closes_lanes() {
    let ap = addr("192.0.2.10:8000");
    let (mut client, _, _) = client();
    add_server(&mut client, ap);
    client.start();

    client.stop();

    assert!(!client.is_running());
    assert!(client.transport().open_connections().is_empty());
    assert!(!client.selector().is_inuse(&ap));
    assert!(client.next_deadline().is_none());
}
