// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! # param-buffer
//!
//! The two outputs of flattening a layer tree.
//!
//! # Key Components
//!
//! - [`ParameterBuffer`]: a fixed-length `f64` vector sized from the
//!   declared trainable parameter count.
//! - [`WriteCursor`]: the only way to write into the buffer: forward-only,
//!   bounds-checked, handing out each element range exactly once.
//! - [`RunningStatsQueue`]: FIFO of normalization running statistics,
//!   which are kept out of the buffer.
//!
//! # Ownership Model
//!
//! ```text
//! ParameterBuffer::zeroed(n)
//!       │  .cursor()          (&mut borrow for the whole traversal)
//!       ▼
//!   WriteCursor ──reserve(k)──► &mut [f64] view, filled in place
//!       │  (dropped)
//!       ▼
//! ParameterBuffer::into_vec() ──► graph construction
//! ```

mod buffer;
mod cursor;
mod error;
mod stats;

pub use buffer::ParameterBuffer;
pub use cursor::WriteCursor;
pub use error::BufferError;
pub use stats::{RunningStats, RunningStatsQueue};
