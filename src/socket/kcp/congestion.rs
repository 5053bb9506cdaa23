use crate::config::{RECV_WINDOW_DEFAULT, SEND_WINDOW_DEFAULT};

pub(super) trait Controller {
    /// Returns the number of segments that may be in flight.
    fn window(&self) -> usize;

    /// Set the window advertised by the remote end.
    fn set_remote_window(&mut self, remote_window: usize);

    /// Set the local send window.
    fn set_send_window(&mut self, send_window: usize);
}

/// Flow control without congestion avoidance: the sender may keep as many
/// segments in flight as both its own send window and the peer's advertised
/// window allow.
#[derive(Debug)]
pub(super) struct WindowLimit {
    send_window: usize,
    remote_window: usize,
}

impl WindowLimit {
    pub fn new() -> Self {
        WindowLimit {
            send_window: SEND_WINDOW_DEFAULT as usize,
            remote_window: RECV_WINDOW_DEFAULT as usize,
        }
    }

    pub fn send_window(&self) -> usize {
        self.send_window
    }

    pub fn remote_window(&self) -> usize {
        self.remote_window
    }
}

impl Controller for WindowLimit {
    fn window(&self) -> usize {
        self.send_window.min(self.remote_window)
    }

    fn set_remote_window(&mut self, remote_window: usize) {
        self.remote_window = remote_window;
    }

    fn set_send_window(&mut self, send_window: usize) {
        self.send_window = send_window;
    }
}
