use crate::error::{FlagforgeError, Result};
use crate::replay_buffer::ReplayBuffer;

/// Builder for ReplayBuffer
pub struct ReplayBufferBuilder {
    capacity: Option<usize>,
}

impl ReplayBufferBuilder {
    pub fn new() -> Self {
        ReplayBufferBuilder { capacity: None }
    }

    pub fn capacity(mut self, capacity: usize) -> Self {
        self.capacity = Some(capacity);
        self
    }

    pub fn build(self) -> Result<ReplayBuffer> {
        match self.capacity {
            None => Err(FlagforgeError::invalid_parameter("capacity", "Capacity not specified")),
            Some(0) => Err(FlagforgeError::invalid_parameter("capacity", "Capacity must be greater than 0")),
            Some(capacity) => Ok(ReplayBuffer::new(capacity)),
        }
    }
}

impl Default for ReplayBufferBuilder {
    fn default() -> Self {
        Self::new()
    }
}
