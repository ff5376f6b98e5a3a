use criterion::{criterion_group, criterion_main};

mod uplink;

criterion_group!(
    benches,
    uplink::bench_reading_to_json,
    uplink::bench_encode_request,
    uplink::bench_read_head,
    uplink::bench_post_in_memory
);
criterion_main!(benches);
