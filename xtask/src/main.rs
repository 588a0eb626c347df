use xflags::xflags;
use xshell::{Shell, cmd};

xflags! {
    cmd xtask {
        /// Tests and lints seekrand across feature sets and targets.
        cmd testmatrix {
            /// Only the host, no cross or wasm targets.
            optional --host-only
        }
        /// Runs the benchmarks under wasmtime with simd128 enabled.
        cmd wasmbench {}
    }
}

fn main() -> xshell::Result<()> {
    match Xtask::from_env_or_exit().subcommand {
        XtaskCmd::Testmatrix(Testmatrix { host_only }) => test_matrix(host_only),
        XtaskCmd::Wasmbench(Wasmbench {}) => bench_in_wasmtime(),
    }
}

const WASM_RUNNER_KEY: &str = "CARGO_TARGET_WASM32_WASIP1_RUNNER";
const WASM_RUNNER_VAL: &str = "cargo bin wasmtime";

// Output is specified as little-endian, so a big-endian target is in the list even though no
// backend is specific to it.
const CROSS_TARGETS: [&str; 5] = [
    "aarch64-unknown-linux-gnu", // neon
    "i586-unknown-linux-gnu",    // x86 without static sse2, runtime detection only
    "i686-unknown-linux-gnu",    // 32-bit x86 intrinsics
    "s390x-unknown-linux-gnu",   // big endian, scalar only
    "x86_64-unknown-linux-gnu",  // sse2 and avx2
];

fn test_matrix(host_only: bool) -> xshell::Result<()> {
    let sh = Shell::new()?;

    cmd!(sh, "cargo hack test -p seekrand --feature-powerset").run()?;
    cmd!(
        sh,
        "cargo hack clippy -p seekrand --feature-powerset -- --deny warnings"
    )
    .run()?;
    // The benchmarks double as a smoke test of every backend and sequence kind.
    cmd!(sh, "cargo test -p benchmarks").run()?;

    if host_only {
        return Ok(());
    }

    for target in CROSS_TARGETS {
        cmd!(
            sh,
            "cargo clippy --target {target} -p seekrand --all-features -- --deny warnings"
        )
        .run()?;
        // Without `std` only statically enabled target features are used, with it the backends
        // are picked at runtime.
        for feat in ["--no-default-features", "--all-features"] {
            // Host RUSTFLAGS must not leak into the cross container.
            cmd!(
                sh,
                "cargo bin cross test --target {target} -p seekrand --all-targets {feat}"
            )
            .env("RUSTFLAGS", "")
            .run()?;
        }
    }

    // Can't run anything, but checks that nothing outside `std` feature gates needs std.
    cmd!(
        sh,
        "cargo clippy --target x86_64-unknown-none -p seekrand -- --deny warnings"
    )
    .run()?;

    for flags in ["", "-Ctarget-feature=+simd128"] {
        cmd!(sh, "cargo test --target wasm32-wasip1 -p seekrand")
            .env(WASM_RUNNER_KEY, WASM_RUNNER_VAL)
            .env("RUSTFLAGS", flags)
            .run()?;
        cmd!(
            sh,
            "cargo clippy --target wasm32-wasip1 -p seekrand -- --deny warnings"
        )
        .env("RUSTFLAGS", flags)
        .run()?;
    }
    Ok(())
}

fn bench_in_wasmtime() -> xshell::Result<()> {
    let sh = Shell::new()?;
    cmd!(
        sh,
        "cargo run --release --target wasm32-wasip1 -p benchmarks"
    )
    .env("RUSTFLAGS", "-Ctarget-feature=+simd128")
    .env(WASM_RUNNER_KEY, WASM_RUNNER_VAL)
    .run()?;
    Ok(())
}
