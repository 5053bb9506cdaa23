use alloc::collections::VecDeque;
use alloc::vec::Vec;
use core::convert::Infallible;

use super::Output;

/// A loopback sink.
///
/// Queues every transmitted datagram until it is popped, so a test can
/// shuttle datagrams between two sockets, dropping or reordering them on
/// the way.
#[derive(Debug, Default)]
pub struct Loopback {
    queue: VecDeque<Vec<u8>>,
}

impl Loopback {
    /// Creates a loopback sink.
    pub fn new() -> Loopback {
        Loopback {
            queue: VecDeque::new(),
        }
    }

    /// Take the oldest datagram not yet popped.
    pub fn pop(&mut self) -> Option<Vec<u8>> {
        self.queue.pop_front()
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }
}

impl Output for Loopback {
    type Error = Infallible;

    fn output(&mut self, datagram: &[u8]) -> Result<(), Infallible> {
        self.queue.push_back(datagram.to_vec());
        Ok(())
    }
}
