// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 KylinSoft Co., Ltd. <https://www.kylinos.cn/>
// See LICENSES for license details.

//! Build-time configuration of the tick clock.
//!
//! [`TIMER_FREQ`] is generated by `build.rs` from the `KBUILD_TIMER_FREQ`
//! environment variable (default `100`). An out-of-range value fails the
//! build; it never reaches a running kernel.
//!
//! ```bash
//! $ KBUILD_TIMER_FREQ=1000 cargo build
//! ```

#![no_std]

include!(env!("CONFIG_RS_PATH"));

const _: () = assert!(TIMER_FREQ >= 19, "8254 timer requires TIMER_FREQ >= 19");
const _: () = assert!(TIMER_FREQ <= 1000, "TIMER_FREQ <= 1000 recommended");

/// Input clock of the 8254 programmable interval timer, in Hz.
pub const PIT_INPUT_HZ: i64 = 1_193_180;

/// PIT mode/command register.
pub const PIT_CMD_PORT: u16 = 0x43;

/// PIT channel 0 data port.
pub const PIT_CH0_PORT: u16 = 0x40;

/// Control word: counter 0, LSB then MSB, mode 2 (rate generator), binary.
pub const PIT_MODE_RATE_GENERATOR: u8 = 0x34;

/// Interrupt vector the PIT is routed to.
pub const TIMER_IRQ_VECTOR: usize = 0x20;

/// PIT channel 0 reload value for [`TIMER_FREQ`], rounded to nearest.
pub const PIT_DIVISOR: u16 = ((PIT_INPUT_HZ + TIMER_FREQ / 2) / TIMER_FREQ) as u16;
