// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Command queue fed by nested interrupt handlers.
//!
//! A low-priority handler acquires a slot and is pre-empted mid-write by a
//! higher-priority handler that acquires, fills and commits its own slot.
//! The inner commit stays invisible until the outer handler commits, which
//! drains both at once, so the consumer never observes a half-written
//! command.

use nestsafe::{Discipline, NestedQueue, SlotArray};

#[derive(Clone, Copy, Default)]
struct Command {
    opcode: u8,
    operand: u32,
}

static SLOTS: SlotArray<Command, 8> = SlotArray::new(
    [Command {
        opcode: 0,
        operand: 0,
    }; 8],
);
static COMMANDS: NestedQueue<'static, Command> =
    NestedQueue::new(SLOTS.as_slice(), Discipline::Nested, Discipline::Nested);

/// What the high-priority handler would run, pre-empting the outer one.
fn urgent_isr() {
    let mut grant = COMMANDS.write_acquire().expect("queue has room");
    grant.opcode = 2;
    grant.operand = 0xFFFF;
    grant.commit();
}

fn main() {
    env_logger::init();

    // Outer handler: acquires and starts filling its slot.
    let mut outer = COMMANDS.write_acquire().expect("queue has room");
    outer.opcode = 1;

    // Pre-emption: the urgent handler runs to completion. Its commit is
    // carried by the outer slot, so nothing is readable yet.
    urgent_isr();
    assert_eq!(COMMANDS.readable(), 0);

    // Outer handler resumes, finishes and commits; both become readable.
    outer.operand = 0x1234;
    outer.commit();
    assert_eq!(COMMANDS.readable(), 2);

    while let Some(command) = COMMANDS.read_acquire() {
        println!(
            "consumer: opcode={} operand={:#x}",
            command.opcode, command.operand
        );
        command.release();
    }
}
