use ndarray::Array1;
use rand::Rng;

use crate::error::{FlagforgeError, Result};

/// One step of experience.
#[derive(Clone, Debug, PartialEq)]
pub struct Transition {
    pub state: Array1<f32>,
    pub action: usize,
    pub reward: f32,
    pub next_state: Array1<f32>,
    pub terminal: bool,
}

impl Transition {
    pub fn new(state: Array1<f32>, action: usize, reward: f32, next_state: Array1<f32>, terminal: bool) -> Self {
        Transition { state, action, reward, next_state, terminal }
    }
}

/// Fixed-capacity ring buffer of transitions.
///
/// `write_pos` only ever grows; the slot written is `write_pos % capacity`, so
/// once full the oldest entry is overwritten. `fill` counts occupied slots and
/// bounds sampling until the buffer wraps.
#[derive(Clone, Debug)]
pub struct ReplayBuffer {
    buffer: Vec<Transition>,
    capacity: usize,
    write_pos: usize,
    fill: usize,
}

impl ReplayBuffer {
    /// Create an empty buffer. Use [`crate::builders::ReplayBufferBuilder`] for a
    /// validated construction; a zero capacity is bumped to one here.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        ReplayBuffer {
            buffer: Vec::with_capacity(capacity),
            capacity,
            write_pos: 0,
            fill: 0,
        }
    }

    pub fn push(&mut self, transition: Transition) {
        let slot = self.write_pos % self.capacity;
        if slot < self.buffer.len() {
            self.buffer[slot] = transition;
        } else {
            self.buffer.push(transition);
        }
        self.write_pos += 1;
        self.fill = (self.fill + 1).min(self.capacity);
    }

    /// Draw one transition uniformly from the filled range.
    pub fn sample_uniform<R: Rng + ?Sized>(&self, rng: &mut R) -> Result<&Transition> {
        let valid = self.fill.min(self.capacity);
        if valid == 0 {
            return Err(FlagforgeError::EmptyBuffer(
                "cannot sample before any transition is stored".to_string(),
            ));
        }
        Ok(&self.buffer[rng.gen_range(0..valid)])
    }

    /// Transition stored in `slot`, if that slot has been written.
    pub fn get(&self, slot: usize) -> Option<&Transition> {
        if slot < self.fill {
            self.buffer.get(slot)
        } else {
            None
        }
    }

    pub fn len(&self) -> usize {
        self.fill
    }

    pub fn is_empty(&self) -> bool {
        self.fill == 0
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Total number of pushes since creation or the last [`ReplayBuffer::clear`].
    pub fn total_pushed(&self) -> usize {
        self.write_pos
    }

    pub fn iter(&self) -> impl Iterator<Item = &Transition> {
        self.buffer.iter().take(self.fill)
    }

    pub fn clear(&mut self) {
        self.buffer.clear();
        self.write_pos = 0;
        self.fill = 0;
    }
}
