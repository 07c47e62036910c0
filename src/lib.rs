// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! # nestsafe - nesting-safe containers for interrupt-driven systems
//!
//! Statically-allocated, lock-free container primitives for single-core
//! systems where any operation can be pre-empted at any instruction boundary
//! by a higher-priority interrupt handler calling back into the same
//! container, to arbitrary nesting depth.
//!
//! The design target is nesting safety, not SMP scalability: at every
//! pre-emption point the container state is consistent, a nested call runs
//! to completion against it, and the interrupted operation resumes and also
//! completes. No operation ever spins on another context making progress;
//! when a resource is held by an outer context, the inner call returns an
//! unavailable sentinel instead.
//!
//! ## Design Constraints
//!
//! - **No heap allocations** (caller-owned slot storage, `const`
//!   constructors for `static` placement)
//! - **No blocking, no retries against a stalled context**
//! - **`no_std` compatible** (the `std` feature only serves host testing)
//! - Lock-free single-word atomics are required and checked at build time
//!
//! ## Architecture
//!
//! ```text
//! +-----------------------------------------------+
//! |  Application / interrupt handlers             |
//! +-----------------------------------------------+
//!     v               v               v
//! +----------+  +-------------+  +----------+-----------+
//! | double   |  | nested ring |  | slot     | intrusive |
//! | buffer   |  | queue       |  | pool     | list      |
//! +----------+  +------+------+  +----------+-----------+
//!                      v
//!               +-------------+
//!               | MCAS engine |
//!               +-------------+
//!                      v
//!               +-------------+
//!               | slot storage|
//!               +-------------+
//! ```
//!
//! - [`Mcas`]: multi-word compare-and-swap with a cooperative helping
//!   journal; any context finishes any pre-empted operation.
//! - [`NestedQueue`]: bounded MPMC ring whose whole index state lives in one
//!   six-word [`Mcas`] cell, with nested or first-come orderings per side.
//! - [`DoubleBuffer`]: latest-value buffer, one writer, nested readers.
//! - [`SlotPool`]: fixed-capacity allocator over caller-owned slots.
//! - [`Slist`]: intrusive singly-linked list with per-node removal latches.
//!
//! ## Quick Start
//!
//! ```rust
//! use nestsafe::{DoubleBuffer, SlotArray};
//!
//! static SLOTS: SlotArray<u32, 2> = SlotArray::new([0; 2]);
//! static LATEST: DoubleBuffer<'static, u32> = DoubleBuffer::new(SLOTS.cells());
//!
//! // Main loop or interrupt handler, any nesting:
//! if let Some(mut slot) = LATEST.write_acquire() {
//!     *slot = 7;
//!     slot.commit();
//! }
//!
//! let value = LATEST.read_acquire();
//! assert_eq!(*value, 7);
//! ```
//!
//! ## Execution Model
//!
//! A single logical CPU with pre-emptive interrupts: a pre-empting context
//! always runs to completion before the pre-empted one resumes. This bounds
//! every retry loop by the interrupt nesting depth and is what lets journal
//! records live on the stack of the issuing context. Cross-CPU (true SMP)
//! use of [`Mcas`] and [`NestedQueue`] is outside the contract.

#![cfg_attr(not(feature = "std"), no_std)]
#![warn(missing_docs)]

#[cfg(not(target_has_atomic = "ptr"))]
compile_error!("nestsafe requires lock-free pointer-width atomics");

#[cfg(not(target_has_atomic = "8"))]
compile_error!("nestsafe requires lock-free byte-width atomics");

/// Latest-value double buffer (one writer, nested readers).
pub mod doublebuf;

/// Error types for nestsafe.
pub mod error;

/// Multi-word compare-and-swap with cooperative helping.
pub mod mcas;

/// Bounded ring queue with nesting-safe commit semantics.
pub mod ringqueue;

/// Intrusive singly-linked list with per-node removal latches.
pub mod slist;

/// Caller-owned slot storage shared by all primitives.
pub mod slot;

/// Fixed-capacity slot pool.
pub mod slotpool;

// Re-exports for convenience
pub use crate::doublebuf::{DoubleBuffer, ReadSlot, WriteSlot};
pub use crate::error::{Error, Result};
pub use crate::mcas::Mcas;
pub use crate::ringqueue::{Discipline, InFlight, NestedQueue, ReadGrant, WriteGrant};
pub use crate::slist::{Slist, SlistNode};
pub use crate::slot::{SlotArray, SlotCell};
pub use crate::slotpool::{PoolSlot, SlotPool};

/// Version of nestsafe
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
