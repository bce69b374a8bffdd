//! # Selector and Orchestrator Benchmarks
//!
//! Selection must stay cheap as the pool grows: the orchestrator calls it
//! once per category and family on every submit and every retry tick.
//!
//! Conditions:
//! - Pools of 16 to 1024 servers, most of them backing off
//! - Mixed intents so in-use reuse and fresh selection both run
//! - A full submit → response cycle with a recording transport

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::time::Duration;

use ap_discovery::adapters::{RecordingEventSink, RecordingTransport};
use ap_discovery::test_utils::{deliver, ManualTimeSource};
use ap_discovery::{
    ChannelJoinRequest, DiscoveryApi, DiscoveryRequest, ErrorCode, IpFamily, OrchestratorConfig,
    RequestOrchestrator, SelectorConfig, ServerCategory, ServerEndpoint, ServerSelector,
    ServerSetListener, ServerSetUpdate, ServiceFlags, Timestamp,
};
use ap_wire::messages::JoinChannelResponse;
use criterion::{black_box, BenchmarkId, Criterion, Throughput};
use rand::seq::SliceRandom;

fn endpoints(count: usize) -> Vec<ServerEndpoint> {
    (0..count)
        .map(|index| {
            let ip = Ipv4Addr::new(10, 0, (index / 256) as u8, (index % 256) as u8);
            ServerEndpoint::from_addr(SocketAddr::new(IpAddr::V4(ip), 8000))
        })
        .collect()
}

fn loaded_selector(count: usize) -> ServerSelector {
    let mut selector = ServerSelector::new(SelectorConfig::default());
    selector.update(&endpoints(count), ServerCategory::Default);
    selector
}

pub fn bench_select_and_report(c: &mut Criterion) {
    let mut group = c.benchmark_group("selector/select_report");
    group.measurement_time(Duration::from_secs(5));

    for count in [16usize, 128, 1024] {
        group.throughput(Throughput::Elements(1));
        group.bench_with_input(BenchmarkId::new("select_success", count), &count, |b, &count| {
            let mut selector = loaded_selector(count);
            let now = Timestamp::from_millis(0);
            b.iter(|| {
                let server = selector
                    .select(IpFamily::V4, ServiceFlags::CHANNEL_JOIN, ServerCategory::Default, now)
                    .unwrap();
                selector.report_success(server, ServiceFlags::CHANNEL_JOIN);
                black_box(server)
            })
        });

        group.bench_with_input(BenchmarkId::new("select_failure", count), &count, |b, &count| {
            let mut selector = loaded_selector(count);
            let mut now = Timestamp::from_millis(0);
            b.iter(|| {
                // Jump past the longest backoff so the pool never drains.
                now = now.add_millis(60_000);
                let server = selector
                    .select(IpFamily::V4, ServiceFlags::CHANNEL_JOIN, ServerCategory::Default, now)
                    .unwrap();
                selector.report_failure(
                    server,
                    ServiceFlags::CHANNEL_JOIN,
                    ErrorCode::ResponseTimeout,
                    now,
                );
                black_box(server)
            })
        });
    }

    group.finish();
}

pub fn bench_backoff_heavy_pool(c: &mut Criterion) {
    let mut group = c.benchmark_group("selector/backoff_scan");
    group.measurement_time(Duration::from_secs(5));

    // Every server but the last few is cooling down, so selection scans
    // most of the idle queue before it finds a candidate.
    for count in [128usize, 1024] {
        group.bench_with_input(BenchmarkId::from_parameter(count), &count, |b, &count| {
            let mut selector = loaded_selector(count);
            let now = Timestamp::from_millis(0);
            for _ in 0..count - 4 {
                let server = selector
                    .select(IpFamily::V4, ServiceFlags::CHANNEL_JOIN, ServerCategory::Default, now)
                    .unwrap();
                selector.report_failure(server, ServiceFlags::CHANNEL_JOIN, ErrorCode::ResponseTimeout, now);
            }
            b.iter(|| {
                let server = selector
                    .select(IpFamily::V4, ServiceFlags::PROXY, ServerCategory::Default, now)
                    .unwrap();
                selector.release(server, ServiceFlags::PROXY);
                black_box(server)
            })
        });
    }

    group.finish();
}

pub fn bench_mixed_intents(c: &mut Criterion) {
    let mut group = c.benchmark_group("selector/mixed_intents");

    let intents = [
        ServiceFlags::CHANNEL_JOIN,
        ServiceFlags::CONFIG,
        ServiceFlags::PROXY,
        ServiceFlags::WORKER,
        ServiceFlags::LASTMILE,
        ServiceFlags::ACCOUNT,
    ];
    group.bench_function("reuse_or_select_128", |b| {
        let mut selector = loaded_selector(128);
        let mut rng = rand::thread_rng();
        let now = Timestamp::from_millis(0);
        b.iter(|| {
            let flags = *intents.choose(&mut rng).unwrap();
            if let Some(server) = selector.select(IpFamily::V4, flags, ServerCategory::Default, now) {
                selector.release(server, flags);
            }
        })
    });

    group.finish();
}

pub fn bench_orchestrator_cycle(c: &mut Criterion) {
    let mut group = c.benchmark_group("orchestrator/cycle");

    group.bench_function("submit_answer_join", |b| {
        let clock = ManualTimeSource::new(0);
        let mut orchestrator = RequestOrchestrator::new(
            OrchestratorConfig::for_testing(),
            RecordingTransport::new(),
            RecordingEventSink::new(),
            clock.boxed(),
        )
        .unwrap();
        orchestrator.on_server_set(&ServerSetUpdate::Servers {
            category: ServerCategory::Default,
            servers: endpoints(8),
        });
        let answer = JoinChannelResponse {
            channel: "room".into(),
            cid: 1,
            ..Default::default()
        };
        b.iter(|| {
            let request = DiscoveryRequest::ChannelJoin(ChannelJoinRequest {
                key: "app".into(),
                channel: "room".into(),
                ..Default::default()
            });
            orchestrator.submit(request).unwrap();
            let connection = orchestrator.transport().sent().last().unwrap().0;
            let source = orchestrator.transport().server_of(connection).unwrap();
            deliver(&mut orchestrator, source, &answer);
            orchestrator.transport_mut().take_sent();
            orchestrator.sink().take();
        })
    });

    group.finish();
}

pub fn register_benchmarks(c: &mut Criterion) {
    bench_select_and_report(c);
    bench_backoff_heavy_pool(c);
    bench_mixed_intents(c);
    bench_orchestrator_cycle(c);
}
