/*! Time structures.

The `time` module contains structures used to represent both
absolute and relative time.

 - [Instant] is used to represent absolute time.
 - [Duration] is used to represent relative time.

The clock is supplied by the caller on every call that needs it, as a 32-bit
millisecond counter that is allowed to wrap around. Instants are therefore
ordered by the sign of their wrapping difference, never by magnitude.

[Instant]: struct.Instant.html
[Duration]: struct.Duration.html
*/

use core::{cmp, fmt, ops};

/// A representation of an absolute time value.
///
/// The `Instant` type is a wrapper around a `u32` value that
/// represents a number of milliseconds since an arbitrary moment
/// chosen by the caller, such as system startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Instant {
    millis: u32,
}

impl Instant {
    pub const ZERO: Instant = Instant::from_millis(0);

    /// Create a new `Instant` from a number of milliseconds.
    pub const fn from_millis(millis: u32) -> Instant {
        Instant { millis }
    }

    /// The total number of milliseconds, as carried in the timestamp field.
    pub const fn total_millis(&self) -> u32 {
        self.millis
    }

    /// Signed number of milliseconds from `earlier` to `self`.
    ///
    /// Negative when `earlier` is actually later than `self`.
    pub const fn millis_since(&self, earlier: Instant) -> i32 {
        self.millis.wrapping_sub(earlier.millis) as i32
    }
}

impl PartialOrd for Instant {
    fn partial_cmp(&self, other: &Instant) -> Option<cmp::Ordering> {
        Some(self.millis_since(*other).cmp(&0))
    }
}

impl fmt::Display for Instant {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}.{:0>3}s", self.millis / 1000, self.millis % 1000)
    }
}

impl ops::Add<Duration> for Instant {
    type Output = Instant;

    fn add(self, rhs: Duration) -> Instant {
        Instant::from_millis(self.millis.wrapping_add(rhs.millis))
    }
}

impl ops::AddAssign<Duration> for Instant {
    fn add_assign(&mut self, rhs: Duration) {
        self.millis = self.millis.wrapping_add(rhs.millis);
    }
}

/// A relative amount of time, in milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Duration {
    millis: u32,
}

impl Duration {
    pub const ZERO: Duration = Duration::from_millis(0);

    /// Create a new `Duration` from a number of milliseconds.
    pub const fn from_millis(millis: u32) -> Duration {
        Duration { millis }
    }

    /// The total number of milliseconds.
    pub const fn total_millis(&self) -> u32 {
        self.millis
    }
}

impl fmt::Display for Duration {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}.{:03}s", self.millis / 1000, self.millis % 1000)
    }
}

impl ops::Add<Duration> for Duration {
    type Output = Duration;

    fn add(self, rhs: Duration) -> Duration {
        Duration::from_millis(self.millis.saturating_add(rhs.millis))
    }
}

impl ops::AddAssign<Duration> for Duration {
    fn add_assign(&mut self, rhs: Duration) {
        self.millis = self.millis.saturating_add(rhs.millis);
    }
}

impl ops::Div<u32> for Duration {
    type Output = Duration;

    fn div(self, rhs: u32) -> Duration {
        Duration::from_millis(self.millis / rhs)
    }
}
