use std::sync::Arc;
use std::time::Duration;

use ce_memory::{MemoryManager, PageFlags};
use ce_ppu::{PpuDecoder, PpuInterpreter, PpuThread};
use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};

const CODE_BASE: u32 = 0x1000_0000;

fn criterion_config() -> Criterion {
    Criterion::default()
        .warm_up_time(Duration::from_millis(500))
        .measurement_time(Duration::from_secs(2))
        .sample_size(50)
}

/// A loop body mixing integer, float and vector work, closed by `bdnz`
const LOOP_BODY: [u32; 8] = [
    0x7C63_2214, // add r3, r3, r4
    0x5465_103A, // rlwinm r5, r3, 2, 0, 29
    0x7CC6_2A78, // xor r6, r6, r5
    0xFC21_102A, // fadd f1, f1, f2
    0x1000_1080, // vadduwm v0, v0, v2
    0x7C07_2000, // cmpw r7, r4
    0x6000_0000, // nop
    0x4200_FFE4, // bdnz -28
];

fn bench_decode(c: &mut Criterion) {
    let mut group = c.benchmark_group("decode");
    group.throughput(Throughput::Elements(LOOP_BODY.len() as u64));
    group.bench_function("lookup", |b| {
        b.iter(|| {
            for &word in &LOOP_BODY {
                black_box(PpuDecoder::decode(black_box(word)));
            }
        });
    });
    group.finish();
}

fn bench_interpreter_loop(c: &mut Criterion) {
    const ITERATIONS: u64 = 10_000;

    let memory = MemoryManager::with_regions(&[(CODE_BASE, 0x1000, PageFlags::RWX)]).expect("bench memory");
    for (i, word) in LOOP_BODY.iter().enumerate() {
        memory.write_be32(CODE_BASE + 4 * i as u32, *word).expect("code write");
    }
    let interpreter = PpuInterpreter::new(Arc::clone(&memory));
    let mut thread = PpuThread::new(0);

    let mut group = c.benchmark_group("interpreter");
    group.throughput(Throughput::Elements(ITERATIONS * LOOP_BODY.len() as u64));
    group.bench_function("mixed_loop", |b| {
        b.iter(|| {
            thread.set_pc(CODE_BASE as u64);
            thread.regs.ctr = ITERATIONS;
            thread.start();
            let steps = interpreter
                .run(black_box(&mut thread), ITERATIONS * LOOP_BODY.len() as u64)
                .expect("bench run");
            black_box(steps);
            black_box(thread.gpr(6));
        });
    });
    group.finish();
}

criterion_group! {
    name = benches;
    config = criterion_config();
    targets = bench_decode, bench_interpreter_loop
}
criterion_main!(benches);
