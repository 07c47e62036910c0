// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Latest-value hand-off between a sampling interrupt and a main loop.
//!
//! A timer interrupt publishes the newest sensor reading; the main loop
//! consumes whatever is newest when it gets around to it. Here both sides
//! run on one thread, interleaved the way a pre-empting handler would be.

use nestsafe::{DoubleBuffer, SlotArray};

#[derive(Clone, Copy, Default)]
struct Reading {
    sequence: u32,
    millivolts: u32,
}

static SLOTS: SlotArray<Reading, 2> = SlotArray::new(
    [
        Reading {
            sequence: 0,
            millivolts: 0,
        },
        Reading {
            sequence: 0,
            millivolts: 0,
        },
    ],
);
static LATEST: DoubleBuffer<'static, Reading> = DoubleBuffer::new(SLOTS.cells());

/// What the sampling interrupt would run.
fn sample_isr(sequence: u32) {
    if let Some(mut slot) = LATEST.write_acquire() {
        slot.sequence = sequence;
        slot.millivolts = 3300 + (sequence % 17);
        slot.commit();
    }
}

fn main() {
    env_logger::init();

    for sequence in 1..=5 {
        sample_isr(sequence);

        let reading = LATEST.read_acquire();
        println!(
            "main loop sees sample #{} = {} mV",
            reading.sequence, reading.millivolts
        );
    }

    // A reader in flight pins its value; the interrupt keeps publishing into
    // the other slot without disturbing it.
    let pinned = LATEST.read_acquire();
    let before = pinned.sequence;
    sample_isr(100);
    sample_isr(101);
    assert_eq!(pinned.sequence, before);
    drop(pinned);

    let fresh = LATEST.read_acquire();
    println!("after release, main loop sees sample #{}", fresh.sequence);
    assert_eq!(fresh.sequence, 101);
}
