use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};
use wire::{encode_packet, verify_packet, Identity, Limits, PacketHeader, SharedKey};

const NOW: i32 = 1_700_000_000;

fn packet_benches(c: &mut Criterion) {
    let key = SharedKey::derive("benchmark secret");
    let sender: Identity = "2001:db8::2".parse().unwrap();
    let mut payload = vec![0u8; 1280];
    payload[0] = 0x60;
    let header = PacketHeader::forward(sender, NOW);
    let bytes = encode_packet(&header, &key, &payload);

    let mut group = c.benchmark_group("packet");
    group.throughput(Throughput::Bytes(payload.len() as u64));
    group.bench_function("encode_forward_1280", |b| {
        b.iter(|| encode_packet(black_box(&header), &key, black_box(&payload)));
    });
    group.bench_function("verify_forward_1280", |b| {
        b.iter(|| {
            verify_packet(black_box(&bytes), &key, &[sender], NOW, &Limits::default()).is_ok()
        });
    });
    group.finish();
}

criterion_group!(benches, packet_benches);
criterion_main!(benches);
