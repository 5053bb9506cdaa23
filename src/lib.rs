#![cfg_attr(not(test), no_std)]
#![deny(unsafe_code)]

//! The _kcp_ library is a reliable, ordered ARQ transport engine that runs on
//! top of any unreliable datagram carrier.
//!
//! The engine performs no I/O and reads no clock. The caller feeds received
//! datagrams in, drives time forward, and supplies a sink for outgoing
//! datagrams; in return, messages written on one end come out of the other
//! end whole, in order and exactly once, as long as datagrams eventually get
//! through.
//!
//! # Table of contents
//!
//! The library is organized as follows:
//!
//! * [socket](socket/index.html): the protocol state machine, with its send
//!   queue, retransmission buffer, reassembly buffer and receive queue.
//! * [wire](wire/index.html): the segment codec, a read/write view over raw
//!   octets plus a high-level representation.
//! * [storage](storage/index.html): the containers segments live in.
//! * [phy](phy/index.html): the output sink datagrams are handed to.
//! * [time](time/index.html): the wrapping millisecond clock.
//! * [config](config/index.html): protocol constants and defaults.
//!
//! # Example
//!
//! ```rust
//! use kcp::phy::Loopback;
//! use kcp::socket::kcp::Socket;
//! use kcp::time::Instant;
//!
//! let mut alice = Socket::new(0x11, Loopback::new());
//! let mut bob = Socket::new(0x11, Loopback::new());
//!
//! alice.send(b"hello").unwrap();
//! let mut buffer = [0; 16];
//! for millis in (0..1000).step_by(10) {
//!     let now = Instant::from_millis(millis);
//!     alice.update(now).unwrap();
//!     bob.update(now).unwrap();
//!     while let Some(datagram) = alice.output_mut().pop() {
//!         bob.input(&datagram).unwrap();
//!     }
//!     while let Some(datagram) = bob.output_mut().pop() {
//!         alice.input(&datagram).unwrap();
//!     }
//!     if let Ok(size) = bob.recv(&mut buffer) {
//!         assert_eq!(&buffer[..size], b"hello");
//!         break;
//!     }
//! }
//! ```
//!
//! # Logging
//!
//! Protocol events are logged through the [log](https://docs.rs/log) facade:
//! segment traffic and timer decisions at `trace`, dropped or rejected input
//! at `debug`.

extern crate alloc;

#[macro_use]
mod macros;

pub mod config;
pub mod phy;
pub mod socket;
pub mod storage;
pub mod time;
pub mod wire;

pub use self::socket::kcp::{
    InputError, MtuError, NoDelay, RecvError, SendError, Socket, State,
};
