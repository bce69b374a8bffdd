//! # Failover Flows
//!
//! How discovery recovers when access points misbehave:
//!
//! 1. **Timeout failover**: a silent server times out and the retry loop
//!    moves the request to the next server
//! 2. **Backoff growth**: a server that keeps rejecting is cooled down with
//!    a doubling, capped backoff and recovers on the first success
//! 3. **Encryption switch**: the server set re-resolves for the encrypted
//!    categories and requests move to crypto UDP and TLS

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::net::{IpAddr, SocketAddr};
    use std::rc::Rc;

    use ap_discovery::adapters::{RecordingEventSink, RecordingTransport, StaticDnsResolver};
    use ap_discovery::test_utils::{deliver, ManualTimeSource};
    use ap_discovery::{
        ChannelJoinRequest, DiscoveryApi, DiscoveryRequest, EncryptionPolicy, EventOutcome,
        OrchestratorConfig, RequestOrchestrator, ServerCategory, ServerSetConfig,
        ServerSetManager, TimerDriven, TransportKind, TransportPolicy,
    };
    use ap_wire::messages::{JoinChannelRequest, JoinChannelResponse};
    use ap_wire::status;

    type Orchestrator = RequestOrchestrator<RecordingTransport, RecordingEventSink>;

    // =============================================================================
    // TEST FIXTURES
    // =============================================================================

    struct Fixture {
        orchestrator: Rc<RefCell<Orchestrator>>,
        servers: ServerSetManager<StaticDnsResolver>,
        sink: RecordingEventSink,
        clock: ManualTimeSource,
    }

    fn addr(text: &str) -> SocketAddr {
        text.parse().unwrap()
    }

    fn ip(text: &str) -> IpAddr {
        text.parse().unwrap()
    }

    fn fixture(config: ServerSetConfig, resolver: StaticDnsResolver) -> Fixture {
        let clock = ManualTimeSource::new(0);
        let sink = RecordingEventSink::new();
        let orchestrator = Rc::new(RefCell::new(
            RequestOrchestrator::new(
                OrchestratorConfig::for_testing(),
                RecordingTransport::new(),
                sink.clone(),
                clock.boxed(),
            )
            .unwrap(),
        ));
        let mut servers = ServerSetManager::new(config, resolver, clock.boxed()).unwrap();
        servers.register(&orchestrator);
        Fixture {
            orchestrator,
            servers,
            sink,
            clock,
        }
    }

    /// Two static access points on port 8000.
    fn static_fixture() -> Fixture {
        let config = ServerSetConfig::for_testing()
            .with_static_ips(vec![ip("192.0.2.1"), ip("192.0.2.2")])
            .with_static_ports(vec![8000]);
        let mut fixture = fixture(config, StaticDnsResolver::new());
        fixture.servers.bootstrap();
        fixture
    }

    fn join() -> DiscoveryRequest {
        DiscoveryRequest::ChannelJoin(ChannelJoinRequest {
            key: "app".into(),
            channel: "room".into(),
            ..Default::default()
        })
    }

    fn reply(fixture: &Fixture, source: SocketAddr, code: u32) {
        deliver(
            &mut *fixture.orchestrator.borrow_mut(),
            source,
            &JoinChannelResponse {
                code,
                channel: "room".into(),
                cid: 5,
                ..Default::default()
            },
        );
    }

    // =============================================================================
    // INTEGRATION TESTS: TIMEOUT FAILOVER
    // =============================================================================

    #[test]
    fn test_silent_server_fails_over_to_next() {
        let fixture = static_fixture();
        let first = addr("192.0.2.1:8000");
        let second = addr("192.0.2.2:8000");

        let id = fixture.orchestrator.borrow_mut().submit(join()).unwrap();
        assert!(fixture.orchestrator.borrow().selector().is_inuse(&first));

        fixture.clock.advance_millis(600);
        fixture.orchestrator.borrow_mut().on_tick();
        {
            let orchestrator = fixture.orchestrator.borrow();
            assert!(orchestrator.selector().is_inuse(&second));
            assert!(!orchestrator.selector().is_inuse(&first));
            let retried = orchestrator.transport().sent_packets();
            let (connection, packet) = retried.last().unwrap();
            assert_eq!(orchestrator.transport().server_of(*connection), Some(second));
            assert!(packet.decode_body::<JoinChannelRequest>().is_ok());
        }

        reply(&fixture, second, status::OK);

        let events = fixture.sink.events();
        let outcomes: Vec<(EventOutcome, Option<SocketAddr>)> = events
            .iter()
            .map(|event| (event.outcome, event.server))
            .collect();
        assert_eq!(
            outcomes,
            vec![
                (EventOutcome::TimedOut, Some(first)),
                (EventOutcome::Succeeded, Some(second)),
            ]
        );
        assert!(events.iter().all(|event| event.request_id == Some(id)));
        assert_eq!(fixture.orchestrator.borrow().pending_count(), 0);
    }

    // =============================================================================
    // INTEGRATION TESTS: BACKOFF GROWTH
    // =============================================================================

    #[test]
    fn test_rejecting_server_backs_off_and_recovers() {
        let config = ServerSetConfig::for_testing()
            .with_static_ips(vec![ip("192.0.2.1")])
            .with_static_ports(vec![8000]);
        let mut fixture = fixture(config, StaticDnsResolver::new());
        fixture.servers.bootstrap();
        let server = addr("192.0.2.1:8000");

        fixture.orchestrator.borrow_mut().submit(join()).unwrap();

        let mut backoffs = Vec::new();
        for _ in 0..5 {
            reply(&fixture, server, status::INVALID_CHANNEL_NAME);
            let backoff = fixture
                .orchestrator
                .borrow()
                .selector()
                .entry(&server)
                .unwrap()
                .backoff_ms;
            backoffs.push(backoff);

            fixture.clock.advance_millis(backoff);
            fixture.orchestrator.borrow_mut().on_tick();
            assert!(fixture.orchestrator.borrow().selector().is_inuse(&server));
        }
        assert_eq!(backoffs, vec![100, 200, 400, 800, 800]);

        reply(&fixture, server, status::OK);

        assert_eq!(fixture.sink.last().unwrap().outcome, EventOutcome::Succeeded);
        let orchestrator = fixture.orchestrator.borrow();
        assert_eq!(orchestrator.selector().entry(&server).unwrap().backoff_ms, 0);
        assert_eq!(orchestrator.pending_count(), 0);
    }

    // =============================================================================
    // INTEGRATION TESTS: ENCRYPTION SWITCH
    // =============================================================================

    #[test]
    fn test_encryption_switch_moves_to_crypto_and_tls() {
        let config = ServerSetConfig::for_testing()
            .with_domains(ServerCategory::Default, vec!["ap.example.net".into()])
            .with_domains(ServerCategory::HighSecurityCrypto, vec!["crypto.example.net".into()])
            .with_domains(ServerCategory::TcpTls, vec!["tls.example.net".into()]);
        let resolver = StaticDnsResolver::new()
            .with_records("ap.example.net", vec![ip("192.0.2.1")])
            .with_records("crypto.example.net", vec![ip("198.51.100.1")])
            .with_records("tls.example.net", vec![ip("203.0.113.1")]);
        let mut fixture = fixture(config, resolver);

        fixture.servers.bootstrap();
        assert_eq!(fixture.servers.pending_queries(), 1);
        complete_dns(&mut fixture.servers);

        fixture.servers.set_encryption_policy(EncryptionPolicy::Preferred);
        fixture
            .orchestrator
            .borrow_mut()
            .set_transport_policy(TransportPolicy::encrypted());
        assert_eq!(fixture.servers.pending_queries(), 2);
        complete_dns(&mut fixture.servers);
        assert!(fixture.servers.is_resolved(ServerCategory::HighSecurityCrypto));
        assert!(fixture.servers.is_resolved(ServerCategory::TcpTls));

        fixture.orchestrator.borrow_mut().submit(join()).unwrap();

        let orchestrator = fixture.orchestrator.borrow();
        let opened: Vec<(SocketAddr, TransportKind)> = orchestrator
            .transport()
            .connections()
            .iter()
            .map(|connection| (connection.server, connection.kind))
            .collect();
        assert_eq!(
            opened,
            vec![
                (addr("198.51.100.1:8443"), TransportKind::Udp),
                (addr("203.0.113.1:443"), TransportKind::Tls),
            ]
        );
        assert!(!orchestrator.selector().contains(&addr("192.0.2.1:8000")));
    }

    fn complete_dns(manager: &mut ServerSetManager<StaticDnsResolver>) {
        for (query, result) in manager.resolver_mut().take_completed() {
            manager.on_dns_resolved(query, result);
        }
    }
}
