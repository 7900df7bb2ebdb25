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

use crate::common::QuantileItem;

/// A fixed-capacity run of sampled items.
///
/// A buffer always has exactly one owner: the pool, the sketch (as the
/// active buffer) or one layer of the stack.
#[derive(Debug, Clone)]
pub(super) struct Buffer<T> {
    items: Vec<T>,
}

impl<T> Default for Buffer<T> {
    fn default() -> Self {
        Self { items: Vec::new() }
    }
}

impl<T: QuantileItem> Buffer<T> {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            items: Vec::with_capacity(capacity),
        }
    }

    pub fn push(&mut self, item: T) {
        self.items.push(item);
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn as_slice(&self) -> &[T] {
        &self.items
    }

    pub fn sort(&mut self) {
        self.items.sort_by(T::cmp);
    }

    fn clear(&mut self) {
        self.items.clear();
    }
}

/// Fixed set of buffers allocated up front and recycled for the whole run.
#[derive(Debug, Clone)]
pub(super) struct BufferPool<T> {
    free: Vec<Buffer<T>>,
    num_buffers: usize,
}

impl<T: QuantileItem> BufferPool<T> {
    pub fn new(num_buffers: usize, buffer_capacity: usize) -> Self {
        let free = (0..num_buffers)
            .map(|_| Buffer::with_capacity(buffer_capacity))
            .collect();
        Self { free, num_buffers }
    }

    /// Hands out a free buffer, or `None` if every buffer is in use.
    pub fn acquire(&mut self) -> Option<Buffer<T>> {
        let mut buffer = self.free.pop()?;
        buffer.clear();
        Some(buffer)
    }

    /// Hands out a free buffer only if another one stays in reserve.
    ///
    /// `None` means the stack must be collapsed: a collapse needs the
    /// reserved buffer as its merge target.
    pub fn acquire_spare(&mut self) -> Option<Buffer<T>> {
        if self.num_free() < 2 {
            return None;
        }
        self.acquire()
    }

    /// Returns a buffer to the pool.
    pub fn release(&mut self, buffer: Buffer<T>) {
        debug_assert!(
            self.free.len() < self.num_buffers,
            "released more buffers than the pool owns"
        );
        self.free.push(buffer);
    }

    pub fn num_free(&self) -> usize {
        self.free.len()
    }

    /// Returns the number of buffers handed out and not yet released.
    pub fn num_live(&self) -> usize {
        self.num_buffers - self.free.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_spare_keeps_one_in_reserve() {
        let mut pool = BufferPool::<i64>::new(3, 4);
        let a = pool.acquire_spare().unwrap();
        let b = pool.acquire_spare().unwrap();
        assert_eq!(pool.num_free(), 1);
        assert!(pool.acquire_spare().is_none());

        let c = pool.acquire().unwrap();
        assert!(pool.acquire().is_none());
        assert_eq!(pool.num_live(), 3);

        pool.release(a);
        pool.release(b);
        pool.release(c);
        assert_eq!(pool.num_live(), 0);
    }

    #[test]
    fn test_recycled_buffer_is_cleared() {
        let mut pool = BufferPool::<i64>::new(2, 4);
        let mut buffer = pool.acquire().unwrap();
        buffer.push(3);
        buffer.push(1);
        buffer.sort();
        assert_eq!(buffer.as_slice(), &[1, 3]);
        pool.release(buffer);

        let buffer = pool.acquire().unwrap();
        assert!(buffer.is_empty());
        assert!(buffer.items.capacity() >= 4);
    }
}
