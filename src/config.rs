//! Protocol constants.
//!
//! Runtime knobs (window sizes, MTU, flush interval, nodelay mode, fast resend)
//! start from these defaults and are changed through the setters on
//! [`Socket`](crate::socket::kcp::Socket).

/// Size of the fixed segment header, in octets.
pub const OVERHEAD: usize = 24;

/// Default maximum transmission unit, in octets.
pub const MTU_DEFAULT: usize = 1400;

/// Smallest MTU accepted by `set_mtu`.
pub const MTU_MIN: usize = 50;

/// Default send window, in segments.
pub const SEND_WINDOW_DEFAULT: u16 = 40;

/// Default receive window, in segments. Also the initial assumption about the
/// remote receive window.
pub const RECV_WINDOW_DEFAULT: u16 = 40;

/// Largest number of fragments a single message may be split into.
/// The fragment index is carried in one octet.
pub const FRAGMENT_MAX: usize = 255;

/// Minimum RTO in nodelay mode, in milliseconds.
pub const RTO_NODELAY_MIN: u32 = 30;

/// Minimum RTO in normal mode, in milliseconds.
pub const RTO_MIN: u32 = 100;

/// RTO used until the first RTT sample arrives, in milliseconds.
pub const RTO_DEFAULT: u32 = 200;

/// Upper bound of the RTO, in milliseconds.
pub const RTO_MAX: u32 = 60_000;

/// Default flush interval, in milliseconds.
pub const INTERVAL_DEFAULT: u32 = 100;

/// Flush interval bounds, in milliseconds.
pub const INTERVAL_MIN: u32 = 10;
pub const INTERVAL_MAX: u32 = 5_000;

/// A segment transmitted this many times marks the link as dead.
pub const DEAD_LINK: u32 = 10;

/// If the scheduled flush drifts this far from the clock, in either direction,
/// it is resynchronized to the clock.
pub const FLUSH_RESYNC: i32 = 10_000;
