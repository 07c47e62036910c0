// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Error types for nestsafe.
//!
//! The hot-path operations report unavailability through in-band sentinels
//! (`Option::None`, silent no-ops); `Error` only appears where an operation
//! has a defined precondition that the caller violated.

use core::fmt;

/// Result type for nestsafe operations.
pub type Result<T> = core::result::Result<T, Error>;

/// Error type for nestsafe operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// A list operation was attempted through a node that is marked as being
    /// removed.
    NodeRetired,

    /// The node to remove is not reachable from the given starting node.
    NotFound,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::NodeRetired => write!(f, "node is being removed"),
            Error::NotFound => write!(f, "node not found in list"),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for Error {}
