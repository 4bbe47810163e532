// Copyright (C) 2026 Michael Wilson <mike@mdwn.dev>
//
// This program is free software: you can redistribute it and/or modify it under
// the terms of the GNU General Public License as published by the Free Software
// Foundation, version 3.
//
// This program is distributed in the hope that it will be useful, but WITHOUT
// ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS
// FOR A PARTICULAR PURPOSE. See the GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License along with
// this program. If not, see <https://www.gnu.org/licenses/>.
//
/// Single-owner circular buffer of mono samples sitting between the chunked
/// renderer and the device callback.
#[derive(Debug)]
pub struct SampleRing {
    buffer: Vec<f32>,
    read_pos: usize,
    len: usize,
}

impl SampleRing {
    pub fn new(capacity: usize) -> Self {
        Self {
            buffer: vec![0.0; capacity.max(1)],
            read_pos: 0,
            len: 0,
        }
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.buffer.len()
    }

    /// Number of samples available to read.
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Space available to write.
    #[inline]
    pub fn space(&self) -> usize {
        self.capacity() - self.len
    }

    /// Writes as many samples as fit. Returns the number written.
    pub fn write(&mut self, samples: &[f32]) -> usize {
        let to_write = samples.len().min(self.space());
        let capacity = self.capacity();
        let write_pos = (self.read_pos + self.len) % capacity;

        // Split at the wrap point.
        let first = to_write.min(capacity - write_pos);
        self.buffer[write_pos..write_pos + first].copy_from_slice(&samples[..first]);
        self.buffer[..to_write - first].copy_from_slice(&samples[first..to_write]);

        self.len += to_write;
        to_write
    }

    /// Reads up to `output.len()` samples. Returns the number read.
    pub fn read(&mut self, output: &mut [f32]) -> usize {
        let to_read = output.len().min(self.len);
        let capacity = self.capacity();

        let first = to_read.min(capacity - self.read_pos);
        output[..first].copy_from_slice(&self.buffer[self.read_pos..self.read_pos + first]);
        output[first..to_read].copy_from_slice(&self.buffer[..to_read - first]);

        self.read_pos = (self.read_pos + to_read) % capacity;
        self.len -= to_read;
        to_read
    }

    /// Reads a single sample.
    #[inline]
    pub fn pop(&mut self) -> Option<f32> {
        if self.len == 0 {
            return None;
        }
        let sample = self.buffer[self.read_pos];
        self.read_pos = (self.read_pos + 1) % self.capacity();
        self.len -= 1;
        Some(sample)
    }

    pub fn clear(&mut self) {
        self.read_pos = 0;
        self.len = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_read_wraps() {
        let mut ring = SampleRing::new(4);
        assert_eq!(ring.write(&[1.0, 2.0, 3.0]), 3);

        let mut out = [0.0; 2];
        assert_eq!(ring.read(&mut out), 2);
        assert_eq!(out, [1.0, 2.0]);

        // Wraps around the end of the backing buffer.
        assert_eq!(ring.write(&[4.0, 5.0, 6.0, 7.0]), 3);
        assert_eq!(ring.len(), 4);
        assert_eq!(ring.space(), 0);

        let mut out = [0.0; 5];
        assert_eq!(ring.read(&mut out), 4);
        assert_eq!(out, [3.0, 4.0, 5.0, 6.0, 0.0]);
        assert!(ring.is_empty());
    }

    #[test]
    fn test_pop_and_clear() {
        let mut ring = SampleRing::new(2);
        ring.write(&[0.5, 0.25]);
        assert_eq!(ring.pop(), Some(0.5));
        ring.write(&[0.125]);
        assert_eq!(ring.pop(), Some(0.25));
        assert_eq!(ring.pop(), Some(0.125));
        assert_eq!(ring.pop(), None);

        ring.write(&[1.0]);
        ring.clear();
        assert!(ring.is_empty());
        assert_eq!(ring.capacity(), 2);
    }
}
