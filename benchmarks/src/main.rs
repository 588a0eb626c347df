use std::{
    cmp,
    hint::black_box,
    time::{Duration, Instant},
};

use rand_core::{RngCore, SeedableRng};
use seekrand::{Backend, Key, Rand, SeqType};

fn main() {
    println!("label,min,p10,p50,p90,max,min_repeats,max_repeats");
    for bench in collect_benchmarks() {
        let label = bench.label.clone();
        let NanosPerOp {
            min,
            p10,
            p50,
            p90,
            max,
            min_repeats,
            max_repeats,
        } = run_benchmark(bench);
        println!(
            "{label},{min:.2},{p10:.2},{p50:.2},{p90:.2},{max:.2},{min_repeats},{max_repeats}"
        );
        assert!(min <= p10 && p10 <= p50 && p50 <= p90 && p90 <= max);
        assert!(min_repeats <= max_repeats);
    }
}

fn collect_benchmarks() -> Vec<Benchmark> {
    let backends = [
        Some(Backend::scalar()),
        Backend::x86_sse2(),
        Backend::x86_avx2(),
        Backend::aarch64_neon(),
        Backend::wasm32_simd128(),
    ];
    let mut benchmarks = Vec::new();
    for backend in backends.into_iter().flatten() {
        benchmarks.push(bench_refill(backend));
        benchmarks.push(bench_u64s(backend, 0));
    }
    benchmarks.extend([
        bench_u64s(Backend::detect_best(), 3),
        bench_u32s(),
        bench_next_u32_rand_chacha(),
        bench_next_u64_rand_chacha(),
        bench_range(),
    ]);

    // One refill is 256 bytes. Besides that, read sizes that leave a partial block behind
    // (16, 99) and a size that skips the buffer for most of its bytes (4096).
    let interesting_read_sizes = [16, 99, 256, 4096];
    for read_size in interesting_read_sizes {
        benchmarks.push(bench_bulk(vec![0; read_size]));
        benchmarks.push(bench_bulk_rand_chacha(vec![0; read_size]));
    }

    for (kind, size) in [
        (SeqType::Num, 9),
        (SeqType::Num, 1_000_000),
        (SeqType::Dist1, 4),
        (SeqType::Dist2, 8),
        (SeqType::Dist3, 8),
        (SeqType::Dist3, 16),
    ] {
        benchmarks.push(bench_seq(kind, size));
    }

    benchmarks
}

#[test]
fn test_benchmarks() {
    for mut bench in collect_benchmarks() {
        (bench.work)(1);
    }
}

const SAMPLES: usize = 100;
const MIN_DURATION: Duration = Duration::from_millis(3);
const MIN_REPEATS: u32 = 1_000;

struct Benchmark {
    label: String,
    work: Box<dyn FnMut(u32)>,
}

struct NanosPerOp {
    min: f64,
    p10: f64,
    p50: f64,
    p90: f64,
    max: f64,
    min_repeats: u32,
    max_repeats: u32,
}

fn run_benchmark(mut bench: Benchmark) -> NanosPerOp {
    let mut times = Vec::with_capacity(SAMPLES);
    let mut min_repeats = u32::MAX;
    let mut max_repeats = 0;
    for _ in 0..SAMPLES {
        let (dt, repeats) = one_sample(&mut bench);
        min_repeats = cmp::min(min_repeats, repeats);
        max_repeats = cmp::max(max_repeats, repeats);
        times.push((dt.as_nanos() as f64) / (repeats as f64));
    }
    times.sort_by(f64::total_cmp);
    let n = times.len();
    NanosPerOp {
        min: times[0],
        p10: times[n / 10],
        p50: times[n / 2],
        p90: times[(n * 9) / 10],
        max: times[n - 1],
        min_repeats,
        max_repeats,
    }
}

fn one_sample(bench: &mut Benchmark) -> (Duration, u32) {
    let mut repeats = MIN_REPEATS;
    loop {
        let t0 = Instant::now();
        (bench.work)(repeats);
        let dt = t0.elapsed();
        if dt >= MIN_DURATION {
            return (dt, repeats);
        }
        let Some(more) = repeats.checked_mul(2) else {
            eprintln!(
                "warning: benchmark {} did not reach min. duration after {} repeats",
                bench.label, repeats
            );
            return (dt, repeats);
        };
        repeats = more;
    }
}

const SEED: u64 = 0x6265_6e63_6873_6565;
const CHACHA_SEED: [u8; 32] = *b"thisisjustabenchthisisjustabench";

fn bench_refill(backend: Backend) -> Benchmark {
    let key = Key::expand(SEED, 0);
    let mut buf = [0; 256];
    let mut counter = 0u64;
    Benchmark {
        label: format!("refill/{}", backend.name()),
        work: Box::new(move |n| {
            for _ in 0..n {
                backend.refill_raw(&key, counter, &mut buf);
                counter = counter.wrapping_add(1);
                black_box(&mut buf);
            }
        }),
    }
}

fn bench_u64s(backend: Backend, skip_first_bytes: usize) -> Benchmark {
    let mut rng = Rand::with_backend(SEED, 0, backend);

    // A few skipped bytes make every eighth or so `rand_u64` straddle two blocks.
    let mut skip_buf = [0; 8];
    rng.rand_n(&mut skip_buf[..skip_first_bytes]);

    Benchmark {
        label: format!("u64/{}/skip{skip_first_bytes}b", backend.name()),
        work: Box::new(move |n| {
            for _ in 0..n {
                black_box(rng.rand_u64());
            }
        }),
    }
}

fn bench_u32s() -> Benchmark {
    let mut rng = Rand::new(SEED);
    Benchmark {
        label: "u32".to_string(),
        work: Box::new(move |n| {
            for _ in 0..n {
                black_box(rng.rand_u32());
            }
        }),
    }
}

fn bench_next_u32_rand_chacha() -> Benchmark {
    let mut rng = rand_chacha::ChaCha8Rng::from_seed(CHACHA_SEED);
    Benchmark {
        label: "u32/rand_chacha".to_string(),
        work: Box::new(move |n| {
            for _ in 0..n {
                black_box(rng.next_u32());
            }
        }),
    }
}

fn bench_next_u64_rand_chacha() -> Benchmark {
    let mut rng = rand_chacha::ChaCha8Rng::from_seed(CHACHA_SEED);
    Benchmark {
        label: "u64/rand_chacha".to_string(),
        work: Box::new(move |n| {
            for _ in 0..n {
                black_box(rng.next_u64());
            }
        }),
    }
}

fn bench_range() -> Benchmark {
    let mut rng = Rand::new(SEED);
    Benchmark {
        label: "range1000".to_string(),
        work: Box::new(move |n| {
            for _ in 0..n {
                black_box(rng.rand_range(black_box(1000)));
            }
        }),
    }
}

fn bench_bulk(mut dest: Vec<u8>) -> Benchmark {
    let label = format!("bulk{n}", n = dest.len());
    Benchmark {
        label,
        work: Box::new(move |n| {
            let mut rng = Rand::new(SEED);
            for _ in 0..n {
                rng.rand_n(&mut dest);
                black_box(&mut dest);
            }
        }),
    }
}

fn bench_bulk_rand_chacha(mut dest: Vec<u8>) -> Benchmark {
    let label = format!("bulk{n}/rand_chacha", n = dest.len());
    Benchmark {
        label,
        work: Box::new(move |n| {
            let mut rng = rand_chacha::ChaCha8Rng::from_seed(CHACHA_SEED);
            for _ in 0..n {
                rng.fill_bytes(&mut dest);
                black_box(&mut dest);
            }
        }),
    }
}

// Writes 64 elements per iteration, wrapping around short sequences.
fn bench_seq(kind: SeqType, size: u32) -> Benchmark {
    const BATCH: u64 = 64;
    let seq = Rand::new(SEED).get_seq(kind, size);
    let batch = BATCH.min(seq.len());
    let mut dest = vec![0; batch as usize * seq.elem_bytes()];
    let mut start = 0;
    Benchmark {
        label: format!("seq/{kind:?}/{size}"),
        work: Box::new(move |n| {
            for _ in 0..n {
                if start + batch > seq.len() {
                    start = 0;
                }
                if let Err(e) = seq.write(&mut dest, start, batch) {
                    panic!("benchmark write failed: {e}");
                }
                start += batch;
                black_box(&mut dest);
            }
        }),
    }
}
