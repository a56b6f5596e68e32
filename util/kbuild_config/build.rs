use std::env;
use std::fs;
use std::path::Path;

/// Interrupts per second used when `KBUILD_TIMER_FREQ` is not set.
const DEFAULT_TIMER_FREQ: i64 = 100;

/// The 8254 cannot divide its input clock down below 19 Hz with a 16-bit
/// counter, and rates above 1000 Hz spend too much time in the handler.
const MIN_TIMER_FREQ: i64 = 19;
const MAX_TIMER_FREQ: i64 = 1000;

fn timer_freq() -> i64 {
    let Ok(raw) = env::var("KBUILD_TIMER_FREQ") else {
        return DEFAULT_TIMER_FREQ;
    };
    let freq: i64 = raw
        .trim()
        .parse()
        .unwrap_or_else(|_| panic!("KBUILD_TIMER_FREQ is not an integer: {raw:?}"));
    if freq < MIN_TIMER_FREQ {
        panic!("8254 timer requires KBUILD_TIMER_FREQ >= {MIN_TIMER_FREQ}, got {freq}");
    }
    if freq > MAX_TIMER_FREQ {
        panic!("KBUILD_TIMER_FREQ <= {MAX_TIMER_FREQ} recommended, got {freq}");
    }
    freq
}

fn main() {
    let out_dir = env::var("OUT_DIR").unwrap();
    let config_rs_path = Path::new(&out_dir).join("config.rs");

    let config = format!(
        "/// Timer interrupts per second.\n\
         pub const TIMER_FREQ: i64 = {};\n",
        timer_freq()
    );
    fs::write(&config_rs_path, config).expect("Failed to write config.rs to OUT_DIR");

    // Set environment variable for inclusion
    println!("cargo:rustc-env=CONFIG_RS_PATH={}", config_rs_path.display());
    println!("cargo:rerun-if-env-changed=KBUILD_TIMER_FREQ");
    println!("cargo:rerun-if-changed=build.rs");
}
