// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Intrusive singly-linked list safe against pre-empting mutators.
//!
//! Nodes are embedded in caller structures and must have `'static` storage:
//! once linked, a node stays reachable until it is removed again, possibly
//! by a context that pre-empted the one that linked it.
//!
//! Each node carries a `deleting` flag that acts as a per-node removal
//! latch. Traversal skips latched nodes, and no context appends behind a
//! latched node, so the two-step unlink (predecessor link, then the victim's
//! own link) cannot race with an insertion into the gap.

use core::ptr;
use core::sync::atomic::{AtomicBool, AtomicPtr, Ordering};

use crate::error::{Error, Result};

/// A list node, embedded in a caller structure.
///
/// ```rust
/// use nestsafe::{Slist, SlistNode};
///
/// struct Timer {
///     node: SlistNode,
///     deadline: u32,
/// }
///
/// static TIMERS: Slist = Slist::new();
/// static TICK: Timer = Timer { node: SlistNode::new(), deadline: 10 };
///
/// TIMERS.push_front(&TICK.node);
/// assert!(TIMERS.first().is_some());
/// ```
pub struct SlistNode {
    /// Next node in the list, or null at the tail.
    next: AtomicPtr<SlistNode>,
    /// Removal latch; a latched node is skipped and never appended to.
    deleting: AtomicBool,
}

impl SlistNode {
    /// Build an unlinked node.
    pub const fn new() -> Self {
        Self {
            next: AtomicPtr::new(ptr::null_mut()),
            deleting: AtomicBool::new(false),
        }
    }

    /// The next live node, skipping nodes latched for removal.
    pub fn next(&self) -> Option<&'static SlistNode> {
        // SAFETY: linked nodes are 'static by the linking contract.
        unsafe { live_node(first_live(&self.next, ptr::null_mut())) }
    }

    /// Link `new` directly behind this node.
    ///
    /// Refuses with [`Error::NodeRetired`] when this node is latched for
    /// removal. A removal of this node racing the append shows up as the
    /// compare-exchange failing or as the append landing on the removed
    /// node, which is indistinguishable from the removal happening just
    /// before the append.
    pub fn append(&self, new: &'static SlistNode) -> Result<()> {
        if self.deleting.load(Ordering::SeqCst) {
            log::debug!("[slist] append refused: anchor is being removed");
            return Err(Error::NodeRetired);
        }
        new.deleting.store(false, Ordering::SeqCst);
        let new_ptr = new as *const SlistNode as *mut SlistNode;
        let mut next = self.next.load(Ordering::SeqCst);
        loop {
            new.next.store(next, Ordering::SeqCst);
            match self
                .next
                .compare_exchange(next, new_ptr, Ordering::SeqCst, Ordering::SeqCst)
            {
                Ok(_) => return Ok(()),
                Err(observed) => next = observed,
            }
        }
    }

    /// Unlink `victim`, which must be reachable from this node.
    ///
    /// Latches the victim, finds its predecessor, swings the predecessor's
    /// link past it, clears the victim's own link and releases the latch, so
    /// the node can be relinked afterwards. Returns the unlinked node.
    ///
    /// Returns [`Error::NodeRetired`] when this node is latched itself, and
    /// [`Error::NotFound`] when the victim is not reachable; in the latter
    /// case the latch is released again.
    pub fn delete_after(&self, victim: &'static SlistNode) -> Result<&'static SlistNode> {
        if self.deleting.load(Ordering::SeqCst) {
            log::debug!("[slist] delete refused: anchor is being removed");
            return Err(Error::NodeRetired);
        }
        victim.deleting.store(true, Ordering::SeqCst);
        let victim_ptr = victim as *const SlistNode as *mut SlistNode;

        let mut prev: &SlistNode = self;
        loop {
            if prev.next.load(Ordering::SeqCst) == victim_ptr {
                let after = victim.next.load(Ordering::SeqCst);
                if prev
                    .next
                    .compare_exchange(victim_ptr, after, Ordering::SeqCst, Ordering::SeqCst)
                    .is_err()
                {
                    // A pre-empting append slid in between; retry from the
                    // same predecessor.
                    continue;
                }
                // The latch keeps every other context off the victim's link.
                let unlink = victim.next.compare_exchange(
                    after,
                    ptr::null_mut(),
                    Ordering::SeqCst,
                    Ordering::SeqCst,
                );
                debug_assert!(unlink.is_ok(), "append behind a latched node");
                victim.deleting.store(false, Ordering::SeqCst);
                return Ok(victim);
            }
            let step = first_live(&prev.next, victim_ptr);
            if step.is_null() || step == victim_ptr {
                // Walked off the end, or onto a victim some other context
                // already unlinked. Release the latch and report.
                victim.deleting.store(false, Ordering::SeqCst);
                log::debug!("[slist] delete failed: node not reachable");
                return Err(Error::NotFound);
            }
            // SAFETY: step was observed linked an instant ago; linked nodes
            // are 'static by the linking contract.
            prev = unsafe { &*step };
        }
    }

    /// Whether the node is currently latched for removal.
    pub fn is_deleting(&self) -> bool {
        self.deleting.load(Ordering::SeqCst)
    }
}

impl Default for SlistNode {
    fn default() -> Self {
        Self::new()
    }
}

/// List head: the first node, or null when empty.
pub struct Slist {
    head: AtomicPtr<SlistNode>,
}

impl Slist {
    /// Build an empty list.
    pub const fn new() -> Self {
        Self {
            head: AtomicPtr::new(ptr::null_mut()),
        }
    }

    /// The first live node, skipping nodes latched for removal.
    pub fn first(&self) -> Option<&'static SlistNode> {
        // SAFETY: linked nodes are 'static by the linking contract.
        unsafe { live_node(first_live(&self.head, ptr::null_mut())) }
    }

    /// Link `node` at the front of the list.
    pub fn push_front(&self, node: &'static SlistNode) {
        node.deleting.store(false, Ordering::SeqCst);
        let node_ptr = node as *const SlistNode as *mut SlistNode;
        let mut first = self.head.load(Ordering::SeqCst);
        loop {
            node.next.store(first, Ordering::SeqCst);
            match self
                .head
                .compare_exchange(first, node_ptr, Ordering::SeqCst, Ordering::SeqCst)
            {
                Ok(_) => return,
                Err(observed) => first = observed,
            }
        }
    }
}

impl Default for Slist {
    fn default() -> Self {
        Self::new()
    }
}

/// Follow `link` and skip latched nodes, stopping at null or `limit`.
fn first_live(link: &AtomicPtr<SlistNode>, limit: *mut SlistNode) -> *mut SlistNode {
    let mut next = link.load(Ordering::SeqCst);
    while !next.is_null() && next != limit {
        // SAFETY: next was observed linked an instant ago; linked nodes are
        // 'static by the linking contract.
        let node = unsafe { &*next };
        if node.deleting.load(Ordering::SeqCst) {
            next = node.next.load(Ordering::SeqCst);
        } else {
            break;
        }
    }
    next
}

/// # Safety
///
/// `node` must be null or point at a node with `'static` storage.
unsafe fn live_node(node: *mut SlistNode) -> Option<&'static SlistNode> {
    if node.is_null() {
        None
    } else {
        Some(unsafe { &*node })
    }
}
