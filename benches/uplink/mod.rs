use criterion::{BatchSize, Criterion, Throughput};
use rand::Rng;
use std::hint::black_box;
use std::net::SocketAddr;
use telenode::diagnostics::Discard;
use telenode::network::error::Error;
use telenode::network::http::{Request, read_head};
use telenode::network::{Candidates, Close, Connect, Connection, Read, Resolve, Secure, Verify, Write};
use telenode::telemetry::Reading;
use telenode::uplink::Uplink;

const RESPONSE: &[u8] = b"HTTP/1.1 200 OK\r\n\
Server: nginx\r\n\
Date: Thu, 07 Mar 2024 12:05:09 GMT\r\n\
Content-Type: application/json\r\n\
Content-Length: 0\r\n\
Connection: keep-alive\r\n\
\r\n";

/// Replays [`RESPONSE`] and discards everything written.
struct Replay {
    pos: usize,
}

impl Read for Replay {
    type Error = Error;

    fn read(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error> {
        let n = buf.len().min(RESPONSE.len() - self.pos);
        buf[..n].copy_from_slice(&RESPONSE[self.pos..self.pos + n]);
        self.pos += n;
        Ok(n)
    }
}

impl Write for Replay {
    type Error = Error;

    fn write(&mut self, buf: &[u8]) -> Result<usize, Self::Error> {
        Ok(buf.len())
    }

    fn flush(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }
}

impl Close for Replay {
    type Error = Error;

    fn close(self) -> Result<(), Self::Error> {
        Ok(())
    }
}

impl Connection for Replay {}

struct Loopback;

impl Resolve for Loopback {
    type Error = Error;

    fn resolve(&mut self, _host: &str, port: u16) -> Result<Candidates, Self::Error> {
        let mut candidates = Candidates::new();
        candidates
            .push(SocketAddr::from(([127, 0, 0, 1], port)))
            .map_err(|_| Error::InvalidAddress)?;
        Ok(candidates)
    }
}

impl Connect for Loopback {
    type Connection = Replay;
    type Error = Error;

    fn connect(&mut self, _remote: SocketAddr) -> Result<Self::Connection, Self::Error> {
        Ok(Replay { pos: 0 })
    }
}

impl Secure<Replay> for Loopback {
    type Connection = Replay;
    type Error = Error;

    fn secure(
        &mut self,
        transport: Replay,
        _server_name: &str,
        _verify: Verify,
    ) -> Result<Self::Connection, Self::Error> {
        Ok(transport)
    }
}

fn random_reading() -> Reading {
    let mut rng = rand::thread_rng();
    let mut reading = Reading::new();
    reading
        .insert("Temperatur", rng.gen_range(-20.0f32..40.0))
        .unwrap();
    reading
        .insert("Luftfeuchte", rng.gen_range(0i32..100))
        .unwrap();
    reading
        .insert("Luftdruck", rng.gen_range(950.0f32..1050.0))
        .unwrap();
    reading
}

pub fn bench_reading_to_json(c: &mut Criterion) {
    c.bench_function("reading_to_json", |b| {
        b.iter_batched(
            random_reading,
            |reading| black_box(reading.to_json().unwrap()),
            BatchSize::SmallInput,
        )
    });
}

pub fn bench_encode_request(c: &mut Criterion) {
    let body = random_reading().to_json().unwrap();
    let mut group = c.benchmark_group("encode_request");
    group.throughput(Throughput::Bytes(body.len() as u64));
    group.bench_function("post", |b| {
        b.iter(|| {
            let request = Request {
                host: black_box("demo.thingsboard.io"),
                path: black_box("api/v1/A1B2C3D4/telemetry"),
                body: black_box(body.as_bytes()),
            };
            black_box(request.encode().unwrap())
        })
    });
    group.finish();
}

pub fn bench_read_head(c: &mut Criterion) {
    let mut group = c.benchmark_group("read_head");
    group.throughput(Throughput::Bytes(RESPONSE.len() as u64));
    group.bench_function("typical_response", |b| {
        b.iter(|| {
            let mut conn = Replay { pos: 0 };
            black_box(read_head(&mut conn).unwrap())
        })
    });
    group.finish();
}

pub fn bench_post_in_memory(c: &mut Criterion) {
    let mut uplink = Uplink::new(Loopback, Loopback, Loopback);
    c.bench_function("post_in_memory", |b| {
        b.iter_batched(
            random_reading,
            |reading| {
                let outcome = uplink.post(
                    "https://demo.thingsboard.io/api/v1/A1B2C3D4/telemetry",
                    &reading,
                    &mut Discard,
                );
                assert_eq!(outcome.status_code(), 200);
            },
            BatchSize::SmallInput,
        )
    });
}
