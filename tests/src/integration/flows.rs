//! # Server Set → Component Flows
//!
//! One `ServerSetManager` resolves access points and pushes them to every
//! registered listener. These tests check that each consumer (orchestrator,
//! proxy selector, report client) picks the pushed servers up and completes
//! a lookup against them.
//!
//! ## Flow Tested:
//!
//! 1. **DNS → Orchestrator**: resolved servers become join candidates
//! 2. **Network change → Orchestrator**: reset, NAT64 re-resolution, v6 selection
//! 3. **DNS → Proxy selector**: proxy lookup runs against pushed servers
//! 4. **DNS → Report client**: periodic report lookup runs against pushed servers

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::net::{IpAddr, SocketAddr};
    use std::rc::Rc;

    use ap_discovery::adapters::{RecordingEventSink, RecordingTransport, StaticDnsResolver};
    use ap_discovery::test_utils::{deliver, ManualTimeSource};
    use ap_discovery::{
        ChannelJoinRequest, DiscoveryApi, DiscoveryRequest, EventOutcome, EventPayload,
        EventSource, IpFamily, NetworkState, OrchestratorConfig, ProxyAddressRequest, ProxyChoice,
        ProxyConfig, ProxyServerSelector, ReportConfig, ReportLookup, ReportServerClient,
        RequestOrchestrator, ServerCategory, ServerSetConfig, ServerSetManager,
    };
    use ap_wire::messages::{
        JoinChannelRequest, JoinChannelResponse, ProxyRequest, ProxyResponse, ReportRequest,
        ReportResponse,
    };
    use ap_wire::AddressRecord;

    type Orchestrator = RequestOrchestrator<RecordingTransport, RecordingEventSink>;

    // =============================================================================
    // TEST FIXTURES
    // =============================================================================

    const DOMAIN: &str = "ap.example.net";

    fn ip(text: &str) -> IpAddr {
        text.parse().unwrap()
    }

    fn addr(text: &str) -> SocketAddr {
        text.parse().unwrap()
    }

    fn server_set(clock: &ManualTimeSource) -> ServerSetManager<StaticDnsResolver> {
        let config = ServerSetConfig::for_testing()
            .with_domains(ServerCategory::Default, vec![DOMAIN.into()])
            .with_default_ports(ServerCategory::Default, vec![8000]);
        let resolver =
            StaticDnsResolver::new().with_records(DOMAIN, vec![ip("192.0.2.1"), ip("192.0.2.2")]);
        ServerSetManager::new(config, resolver, clock.boxed()).unwrap()
    }

    fn orchestrator(clock: &ManualTimeSource, sink: &RecordingEventSink) -> Rc<RefCell<Orchestrator>> {
        Rc::new(RefCell::new(
            RequestOrchestrator::new(
                OrchestratorConfig::for_testing(),
                RecordingTransport::new(),
                sink.clone(),
                clock.boxed(),
            )
            .unwrap(),
        ))
    }

    /// Answer every DNS query the manager has issued.
    fn complete_dns(manager: &mut ServerSetManager<StaticDnsResolver>) {
        for (query, result) in manager.resolver_mut().take_completed() {
            manager.on_dns_resolved(query, result);
        }
    }

    fn join(channel: &str) -> DiscoveryRequest {
        DiscoveryRequest::ChannelJoin(ChannelJoinRequest {
            key: "app".into(),
            channel: channel.into(),
            uid: 7,
            ..Default::default()
        })
    }

    // =============================================================================
    // INTEGRATION TESTS: SERVER SET → ORCHESTRATOR
    // =============================================================================

    #[test]
    fn test_resolved_servers_serve_channel_join() {
        let clock = ManualTimeSource::new(0);
        let sink = RecordingEventSink::new();
        let orchestrator = orchestrator(&clock, &sink);
        let mut servers = server_set(&clock);
        servers.register(&orchestrator);

        servers.bootstrap();
        complete_dns(&mut servers);
        assert_eq!(orchestrator.borrow().selector().len(), 2);

        let id = orchestrator.borrow_mut().submit(join("room")).unwrap();
        let (connection, packet) = orchestrator.borrow().transport().sent_packets()[0].clone();
        let request = packet.decode_body::<JoinChannelRequest>().unwrap();
        let target = orchestrator.borrow().transport().server_of(connection).unwrap();
        assert_eq!(target, addr("192.0.2.1:8000"));
        assert_eq!(request.uid, 7);

        clock.advance_millis(25);
        deliver(
            &mut *orchestrator.borrow_mut(),
            target,
            &JoinChannelResponse {
                opid: request.opid,
                channel: "room".into(),
                cid: 99,
                uid: 7,
                addresses: vec![AddressRecord::from_socket_addr(addr("203.0.113.4:4001"), "tk")],
                ..Default::default()
            },
        );

        let event = sink.last().unwrap();
        assert_eq!(event.request_id, Some(id));
        assert_eq!(event.outcome, EventOutcome::Succeeded);
        assert_eq!(event.addresses[0].addr, addr("203.0.113.4:4001"));
        assert!(matches!(event.payload, EventPayload::Channel { cid: 99, .. }));
        assert_eq!(orchestrator.borrow().pending_count(), 0);
    }

    #[test]
    fn test_network_change_moves_selection_to_nat64() {
        let clock = ManualTimeSource::new(0);
        let sink = RecordingEventSink::new();
        let orchestrator = orchestrator(&clock, &sink);
        let mut servers = server_set(&clock);
        servers.register(&orchestrator);
        servers.bootstrap();
        complete_dns(&mut servers);

        let network = NetworkState::ipv6_only(None);
        orchestrator
            .borrow_mut()
            .set_ip_stack_mode(network.stack_mode());
        servers.on_network_changed(network);
        // The reset dropped the IPv4 servers before re-resolution.
        assert!(orchestrator.borrow().selector().is_empty());
        complete_dns(&mut servers);

        let nat64 = addr("[64:ff9b::c000:201]:8000");
        {
            let orchestrator = orchestrator.borrow();
            let entry = orchestrator.selector().entry(&nat64).unwrap();
            assert_eq!(entry.family, IpFamily::V6Nat64);
            assert_eq!(orchestrator.selector().len(), 2);
        }

        orchestrator.borrow_mut().submit(join("room")).unwrap();
        assert!(orchestrator.borrow().selector().is_inuse(&nat64));
    }

    // =============================================================================
    // INTEGRATION TESTS: SERVER SET → PROXY SELECTOR
    // =============================================================================

    #[test]
    fn test_proxy_lookup_through_resolved_servers() {
        let clock = ManualTimeSource::new(0);
        let sink = RecordingEventSink::new();
        let proxy = Rc::new(RefCell::new(
            ProxyServerSelector::new(
                ProxyConfig::for_testing(),
                ProxyAddressRequest {
                    key: "app".into(),
                    channel: "room".into(),
                    ..Default::default()
                },
                RecordingTransport::new(),
                sink.clone(),
                clock.boxed(),
            )
            .unwrap(),
        ));
        let mut servers = server_set(&clock);
        servers.register(&proxy);
        servers.bootstrap();
        complete_dns(&mut servers);

        assert!(proxy.borrow_mut().select_next().is_err());
        let (_, packet) = proxy.borrow_mut().transport_mut().sent_packets()[0].clone();
        let opid = packet.decode_body::<ProxyRequest>().unwrap().opid;

        deliver(
            &mut *proxy.borrow_mut(),
            addr("192.0.2.1:8000"),
            &ProxyResponse {
                opid,
                addresses: vec![AddressRecord::from_socket_addr(addr("198.51.100.3:443"), "p")],
                ..Default::default()
            },
        );

        assert_eq!(sink.last().unwrap().source, EventSource::ProxySelector);
        let choice = proxy.borrow_mut().select_next();
        match choice {
            Ok(ProxyChoice::Discovered(resolved)) => {
                assert_eq!(resolved.addr, addr("198.51.100.3:443"));
                assert_eq!(resolved.ticket, "p");
            }
            other => panic!("unexpected {other:?}"),
        };
    }

    // =============================================================================
    // INTEGRATION TESTS: SERVER SET → REPORT CLIENT
    // =============================================================================

    #[test]
    fn test_report_lookup_through_resolved_servers() {
        let clock = ManualTimeSource::new(0);
        let sink = RecordingEventSink::new();
        let report = Rc::new(RefCell::new(
            ReportServerClient::new(
                ReportConfig::for_testing(),
                ReportLookup {
                    key: "app".into(),
                    sid: "s-1".into(),
                    ..Default::default()
                },
                RecordingTransport::new(),
                sink.clone(),
                clock.boxed(),
            )
            .unwrap(),
        ));
        let mut servers = server_set(&clock);
        servers.register(&report);
        servers.bootstrap();
        complete_dns(&mut servers);

        report.borrow_mut().start();
        let (_, packet) = report.borrow().transport().sent_packets()[0].clone();
        let request = packet.decode_body::<ReportRequest>().unwrap();
        assert_eq!(request.sid, "s-1");

        deliver(
            &mut *report.borrow_mut(),
            addr("192.0.2.1:8000"),
            &ReportResponse {
                opid: request.opid,
                addresses: vec![AddressRecord::from_socket_addr(addr("198.51.100.8:6080"), "")],
                ..Default::default()
            },
        );

        assert_eq!(sink.last().unwrap().source, EventSource::ReportClient);
        assert_eq!(report.borrow().report_servers()[0].addr, addr("198.51.100.8:6080"));
        assert!(report.borrow().is_running());
    }

    #[test]
    fn test_dropped_listener_stops_receiving() {
        let clock = ManualTimeSource::new(0);
        let sink = RecordingEventSink::new();
        let mut servers = server_set(&clock);
        {
            let orchestrator = orchestrator(&clock, &sink);
            servers.register(&orchestrator);
            assert_eq!(servers.listener_count(), 1);
        }

        servers.bootstrap();
        complete_dns(&mut servers);

        assert_eq!(servers.listener_count(), 0);
        assert!(servers.is_resolved(ServerCategory::Default));
    }
}
