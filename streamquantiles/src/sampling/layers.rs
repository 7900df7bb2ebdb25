// Licensed to the Apache Software Foundation (ASF) under one
// or more contributor license agreements.  See the NOTICE file
// distributed with this work for additional information
// regarding copyright ownership.  The ASF licenses this file
// to you under the Apache License, Version 2.0 (the
// "License"); you may not use this file except in compliance
// with the License.  You may obtain a copy of the License at
//
//   http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing,
// software distributed under the License is distributed on an
// "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY
// KIND, either express or implied.  See the License for the
// specific language governing permissions and limitations
// under the License.

use std::collections::VecDeque;

use super::pool::Buffer;
use crate::common::QuantileItem;
use crate::error::Error;

type Layer<T> = VecDeque<Buffer<T>>;

/// Ring of weighted layers plus the stack of collapsible layers.
///
/// Buffers in layer `i` weigh twice as much as those in layer `i - 1`.
/// Within a layer buffers are kept oldest first. A layer is collapsible once
/// it holds two buffers; the most recently marked layer sits on top of the
/// stack.
#[derive(Debug, Clone)]
pub(super) struct LayerStack<T> {
    layers: VecDeque<Layer<T>>,
    collapsible: Vec<usize>,
}

impl<T: QuantileItem> LayerStack<T> {
    pub fn new(num_layers: usize) -> Self {
        Self {
            layers: (0..num_layers).map(|_| VecDeque::new()).collect(),
            collapsible: Vec::with_capacity(num_layers),
        }
    }

    pub fn num_layers(&self) -> usize {
        self.layers.len()
    }

    /// Appends a buffer to a layer, marking the layer collapsible when it
    /// reaches two buffers.
    pub fn push(&mut self, level: usize, buffer: Buffer<T>) -> Result<(), Error> {
        let Some(layer) = self.layers.get_mut(level) else {
            return Err(Error::invariant_violation("layer index out of range")
                .with_context("level", level)
                .with_context("num_layers", self.layers.len()));
        };
        layer.push_back(buffer);
        if layer.len() == 2 {
            self.collapsible.push(level);
        }
        Ok(())
    }

    pub fn mark_collapsible(&mut self, level: usize) {
        self.collapsible.push(level);
    }

    pub fn pop_collapsible(&mut self) -> Option<usize> {
        self.collapsible.pop()
    }

    /// Removes the two oldest buffers of a layer.
    pub fn take_oldest_pair(&mut self, level: usize) -> Option<(Buffer<T>, Buffer<T>)> {
        let layer = self.layers.get_mut(level)?;
        if layer.len() < 2 {
            return None;
        }
        let first = layer.pop_front()?;
        let second = layer.pop_front()?;
        Some((first, second))
    }

    pub fn layer_len(&self, level: usize) -> usize {
        self.layers.get(level).map_or(0, VecDeque::len)
    }

    pub fn is_top_empty(&self) -> bool {
        self.layers.back().is_none_or(VecDeque::is_empty)
    }

    /// Moves the empty bottom layer to the top, so every layer shifts down one
    /// weight class.
    pub fn rotate(&mut self) -> Result<(), Error> {
        if self.layers.front().is_some_and(|layer| !layer.is_empty()) {
            return Err(Error::invariant_violation(
                "the bottom layer must be empty before rotating",
            ));
        }
        if self.collapsible.contains(&0) {
            return Err(Error::invariant_violation(
                "an empty bottom layer is marked collapsible",
            ));
        }
        if let Some(bottom) = self.layers.pop_front() {
            self.layers.push_back(bottom);
        }
        for level in &mut self.collapsible {
            *level -= 1;
        }
        Ok(())
    }

    /// Returns the number of buffers held by all layers.
    pub fn num_buffers(&self) -> usize {
        self.layers.iter().map(VecDeque::len).sum()
    }

    /// Returns the number of items held by all layers.
    pub fn num_items(&self) -> usize {
        self.layers.iter().flatten().map(Buffer::len).sum()
    }

    /// Iterates every buffer with its layer index, bottom layer first.
    pub fn iter(&self) -> impl Iterator<Item = (usize, &Buffer<T>)> {
        self.layers
            .iter()
            .enumerate()
            .flat_map(|(level, layer)| layer.iter().map(move |buffer| (level, buffer)))
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (usize, &mut Buffer<T>)> {
        self.layers
            .iter_mut()
            .enumerate()
            .flat_map(|(level, layer)| layer.iter_mut().map(move |buffer| (level, buffer)))
    }
}
