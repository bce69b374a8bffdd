//! # Wire Codec Benchmarks
//!
//! Every response goes through framing, header parsing and a body decode
//! on the worker thread, so the codec sits on the response path.
//!
//! Conditions:
//! - Join responses carrying 1 to 64 gateway addresses
//! - Detail maps filled to every key
//! - Unified envelopes nesting several sub-responses

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::time::Duration;

use ap_wire::messages::{
    JoinChannelRequest, JoinChannelResponse, NestedBody, UnifiedResponse, WorkerResponse,
};
use ap_wire::uri::nested;
use ap_wire::{AddressRecord, DetailMap, Packet};
use criterion::{black_box, BenchmarkId, Criterion, Throughput};
use rand::Rng;

fn addresses(count: usize) -> Vec<AddressRecord> {
    let mut rng = rand::thread_rng();
    (0..count)
        .map(|_| {
            let ip = Ipv4Addr::from(rng.gen::<u32>());
            AddressRecord::from_socket_addr(SocketAddr::new(IpAddr::V4(ip), rng.gen()), "ticket-0123456789")
        })
        .collect()
}

fn full_detail() -> DetailMap {
    (0..=u8::MAX).map(|key| (key, format!("value-{key}"))).collect()
}

pub fn bench_join_response(c: &mut Criterion) {
    let mut group = c.benchmark_group("wire/join_response");
    group.measurement_time(Duration::from_secs(5));

    for count in [1usize, 8, 64] {
        let response = JoinChannelResponse {
            opid: 42,
            channel: "room".into(),
            cid: 7,
            uid: 9,
            addresses: addresses(count),
            ..Default::default()
        };
        let frame = Packet::from_message(&response).to_bytes();
        group.throughput(Throughput::Bytes(frame.len() as u64));

        group.bench_with_input(BenchmarkId::new("encode", count), &response, |b, response| {
            b.iter(|| black_box(Packet::from_message(response).to_bytes()))
        });
        group.bench_with_input(BenchmarkId::new("parse_decode", count), &frame, |b, frame| {
            b.iter(|| {
                let packet = Packet::parse(frame).unwrap();
                black_box(packet.decode_body::<JoinChannelResponse>().unwrap())
            })
        });
    }

    group.finish();
}

pub fn bench_detail_heavy_request(c: &mut Criterion) {
    let mut group = c.benchmark_group("wire/detail_map");

    let request = JoinChannelRequest {
        opid: 1,
        key: "app-key".into(),
        channel: "room".into(),
        sid: "session".into(),
        detail: full_detail(),
        ..Default::default()
    };
    let frame = Packet::from_message(&request).to_bytes();

    group.bench_function("encode_full_detail", |b| {
        b.iter(|| black_box(Packet::from_message(&request).to_bytes()))
    });
    group.bench_function("decode_full_detail", |b| {
        b.iter(|| {
            let packet = Packet::parse(&frame).unwrap();
            black_box(packet.decode_body::<JoinChannelRequest>().unwrap())
        })
    });

    group.finish();
}

pub fn bench_unified_envelope(c: &mut Criterion) {
    let mut group = c.benchmark_group("wire/unified");

    let join = JoinChannelResponse {
        channel: "room".into(),
        addresses: addresses(4),
        ..Default::default()
    };
    let worker = WorkerResponse {
        service_name: "recorder".into(),
        ..Default::default()
    };
    let envelope = UnifiedResponse {
        opid: 3,
        services: vec![
            NestedBody::wrap(nested::JOIN_CHANNEL_RES, &join),
            NestedBody::wrap(nested::WORKER_RES, &worker),
        ],
        ..Default::default()
    };
    let frame = Packet::from_message(&envelope).to_bytes();

    group.bench_function("decode_and_unwrap", |b| {
        b.iter(|| {
            let packet = Packet::parse(&frame).unwrap();
            let envelope = packet.decode_body::<UnifiedResponse>().unwrap();
            for service in &envelope.services {
                match service.uri {
                    nested::JOIN_CHANNEL_RES => {
                        black_box(service.unwrap_as::<JoinChannelResponse>().unwrap());
                    }
                    nested::WORKER_RES => {
                        black_box(service.unwrap_as::<WorkerResponse>().unwrap());
                    }
                    _ => {}
                }
            }
        })
    });

    group.finish();
}

pub fn register_benchmarks(c: &mut Criterion) {
    bench_join_response(c);
    bench_detail_heavy_request(c);
    bench_unified_envelope(c);
}
