// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Assignment of queued running statistics to a constructed graph.
//!
//! The graph is walked depth-first in the same order the manifest was
//! flattened in. Each normalization layer takes the pair at the head of the
//! queue. Running out early, or finishing with pairs left over, means the
//! graph and the manifest disagree and the conversion fails.

use crate::graph::{LiveGraph, LiveLayer};
use crate::ConvertError;
use param_buffer::RunningStatsQueue;
use tensor_core::TensorLayout;

/// Hands running statistics to normalization layers in visitation order.
#[derive(Debug, Clone, Copy, Default)]
pub struct Distributor {
    layout: TensorLayout,
}

impl Distributor {
    pub fn new(layout: TensorLayout) -> Self {
        Self { layout }
    }

    /// Assigns every pair in `queue` and returns the number assigned.
    pub fn distribute(
        &self,
        graph: &mut LiveGraph,
        mut queue: RunningStatsQueue,
    ) -> Result<usize, ConvertError> {
        let assigned = self.assign(&mut graph.layers, &mut queue)?;
        if let Some(next) = queue.peek() {
            return Err(ConvertError::StatsQueueOverflow {
                remaining: queue.len(),
                next: next.layer.clone(),
            });
        }
        tracing::debug!("assigned {assigned} running-stats pairs");
        Ok(assigned)
    }

    fn assign(
        &self,
        layers: &mut [LiveLayer],
        queue: &mut RunningStatsQueue,
    ) -> Result<usize, ConvertError> {
        let mut assigned = 0;
        for layer in layers {
            match layer {
                LiveLayer::Container(c) => assigned += self.assign(&mut c.layers, queue)?,
                LiveLayer::NormalizationLeaf(n) => {
                    let stats = queue.pop().ok_or_else(|| ConvertError::StatsQueueUnderflow {
                        layer: n.name.clone(),
                    })?;
                    if stats.layer != n.name {
                        tracing::trace!("{} takes running stats read for {}", n.name, stats.layer);
                    }
                    let (mean_shape, var_shape) = stats.shapes();
                    tracing::trace!(
                        "{}: running mean {mean_shape} -> {}, running var {var_shape} -> {}",
                        n.name,
                        self.layout.target_shape(mean_shape),
                        self.layout.target_shape(var_shape),
                    );
                    n.running_mean = Some(self.layout.orient(stats.mean));
                    n.running_var = Some(self.layout.orient(stats.var));
                    assigned += 1;
                }
                LiveLayer::PlainLeaf(_) => {}
            }
        }
        Ok(assigned)
    }
}
