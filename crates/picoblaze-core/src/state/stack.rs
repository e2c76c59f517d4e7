use crate::fault::SimulationError;

/// One saved return point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct Frame {
    /// Address of the `CALL`, or the interrupted instruction.
    pub address: u16,
    /// Pushed by interrupt servicing rather than a call.
    pub interrupt: bool,
}

/// Bounded hardware call stack.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct CallStack {
    frames: Vec<Frame>,
    capacity: u8,
}

impl CallStack {
    /// Creates an empty stack holding at most `capacity` frames.
    #[must_use]
    pub fn new(capacity: u8) -> Self {
        Self {
            frames: Vec::with_capacity(usize::from(capacity)),
            capacity,
        }
    }

    /// Pushes a frame.
    ///
    /// # Errors
    ///
    /// [`SimulationError::StackOverflow`] when every frame is in use.
    pub fn push(&mut self, frame: Frame) -> Result<(), SimulationError> {
        if self.frames.len() >= usize::from(self.capacity) {
            return Err(SimulationError::StackOverflow {
                depth: self.capacity,
            });
        }
        self.frames.push(frame);
        Ok(())
    }

    /// Pops the most recent frame.
    ///
    /// # Errors
    ///
    /// [`SimulationError::StackUnderflow`] when empty.
    pub fn pop(&mut self) -> Result<Frame, SimulationError> {
        self.frames.pop().ok_or(SimulationError::StackUnderflow)
    }

    /// Returns the most recent frame without removing it.
    ///
    /// # Errors
    ///
    /// [`SimulationError::StackUnderflow`] when empty.
    pub fn peek(&self) -> Result<Frame, SimulationError> {
        self.frames.last().copied().ok_or(SimulationError::StackUnderflow)
    }

    /// Drops every frame.
    pub fn clear(&mut self) {
        self.frames.clear();
    }

    /// Frames currently in use.
    #[must_use]
    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    /// Maximum number of frames.
    #[must_use]
    pub const fn capacity(&self) -> u8 {
        self.capacity
    }

    /// Whether no frame is in use.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// Frames from the bottom of the stack to the top.
    pub fn iter(&self) -> impl Iterator<Item = &Frame> + '_ {
        self.frames.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn call(address: u16) -> Frame {
        Frame {
            address,
            interrupt: false,
        }
    }

    #[test]
    fn capacity_pushes_succeed_and_the_next_overflows() {
        let mut stack = CallStack::new(4);
        for address in 0..4 {
            stack.push(call(address)).expect("within capacity");
        }
        assert_eq!(
            stack.push(call(4)),
            Err(SimulationError::StackOverflow { depth: 4 })
        );
        assert_eq!(stack.depth(), 4);
    }

    #[test]
    fn pop_and_peek_on_empty_underflow() {
        let mut stack = CallStack::new(2);
        assert_eq!(stack.pop(), Err(SimulationError::StackUnderflow));
        assert_eq!(stack.peek(), Err(SimulationError::StackUnderflow));
    }

    #[test]
    fn frames_come_back_last_in_first_out() {
        let mut stack = CallStack::new(3);
        stack.push(call(1)).expect("push");
        stack
            .push(Frame {
                address: 7,
                interrupt: true,
            })
            .expect("push");
        assert_eq!(stack.peek().map(|f| f.address), Ok(7));
        assert_eq!(
            stack.iter().map(|f| f.address).collect::<Vec<_>>(),
            vec![1, 7]
        );
        assert!(stack.pop().expect("pop").interrupt);
        assert_eq!(stack.pop(), Ok(call(1)));
        assert!(stack.is_empty());
    }
}
