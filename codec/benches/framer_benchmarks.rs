//
// Copyright 2017-2026 Hans W. Uhlig. All Rights Reserved.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//      http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//

//! Benchmarks for line framer performance

use bytes::BytesMut;
use cmdwire_codec::{LineFramer, TextEncoding, consts};
use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};
use tokio_util::codec::Decoder;

fn drain(framer: &mut LineFramer, buffer: &mut BytesMut) -> usize {
    let mut count = 0;
    while let Some(event) = framer.decode(buffer).unwrap() {
        black_box(event);
        count += 1;
    }
    count
}

// ============================================================================
// Decoding Benchmarks
// ============================================================================

fn bench_decode_lines(c: &mut Criterion) {
    let mut group = c.benchmark_group("decode_lines");

    for line_count in [1usize, 16, 256] {
        let input: Vec<u8> = (0..line_count)
            .flat_map(|i| format!("command number {}\r\n", i).into_bytes())
            .collect();
        group.throughput(Throughput::Bytes(input.len() as u64));
        group.bench_with_input(BenchmarkId::from_parameter(line_count), &input, |b, input| {
            let mut framer = LineFramer::new();
            b.iter(|| {
                let mut buffer = BytesMut::from(&input[..]);
                drain(&mut framer, &mut buffer)
            });
        });
    }

    group.finish();
}

fn bench_decode_negotiation(c: &mut Criterion) {
    let mut group = c.benchmark_group("decode_negotiation");

    let input: Vec<u8> = (0u8..64)
        .flat_map(|option| [consts::IAC, consts::DO, option])
        .collect();
    group.throughput(Throughput::Bytes(input.len() as u64));
    group.bench_function("do_requests", |b| {
        let mut framer = LineFramer::new();
        b.iter(|| {
            let mut buffer = BytesMut::from(&input[..]);
            drain(&mut framer, &mut buffer)
        });
    });

    group.finish();
}

// ============================================================================
// Encoding Benchmarks
// ============================================================================

fn bench_encode_text(c: &mut Criterion) {
    let mut group = c.benchmark_group("encode_text");
    let text = "launch notepad.exe --minimized ünïcödé";

    group.bench_function("utf8", |b| {
        b.iter(|| TextEncoding::Utf8.encode(black_box(text)));
    });
    group.bench_function("ascii", |b| {
        b.iter(|| TextEncoding::Ascii.encode(black_box(text)));
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_decode_lines,
    bench_decode_negotiation,
    bench_encode_text
);
criterion_main!(benches);
