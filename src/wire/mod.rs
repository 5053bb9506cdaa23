/*! Low-level segment access and construction.

The `wire` module deals with the segment *representation*. It provides two levels
of functionality.

 * First, it provides functions to extract fields from sequences of octets,
   and to insert fields into sequences of octets. This happens in the
   [KcpPacket] structure.
 * Second, it provides a compact, high-level representation of segment data
   that can be parsed from and emitted into a sequence of octets.
   This happens through the [KcpRepr] structure.

[KcpPacket]: struct.KcpPacket.html
[KcpRepr]: struct.KcpRepr.html

The `Packet` structure guarantees that, if the `Packet::check_len()` method
returned `Ok(())`, then no accessor or setter method will panic.

Several segments may be concatenated in one datagram. A `Packet` only looks
at the first one: its buffer may extend past the end of the segment, and
[KcpRepr::buffer_len] tells where the next one starts.

When parsing untrusted input, it is *necessary* to use `Packet::new_checked()`
(or `Packet::check_len()`); so long as the buffer is not modified, no accessor
will fail. The `Repr::emit()` method never panics as long as the underlying
buffer is at least `Repr::buffer_len()` octets long.

# Examples

To emit a segment into an octet buffer, and then parse it back:

```rust
use kcp::wire::*;
use kcp::time::Instant;

let repr = KcpRepr {
    conv: 0x1122_3344,
    command: KcpCommand::Push,
    frg: 0,
    wnd: 32,
    timestamp: Instant::from_millis(1000),
    sn: SeqNumber(7),
    una: SeqNumber(3),
    payload: b"hello",
};
let mut buffer = vec![0; repr.buffer_len()];
{ // emission
    let mut packet = KcpPacket::new_unchecked(&mut buffer);
    repr.emit(&mut packet);
}
{ // parsing
    let packet = KcpPacket::new_checked(&buffer).expect("truncated segment");
    let parsed = KcpRepr::parse(&packet).expect("malformed segment");
    assert_eq!(repr, parsed);
}
```
*/

mod field {
    pub type Field = ::core::ops::Range<usize>;
    pub type Rest = ::core::ops::RangeFrom<usize>;
}

mod kcp;

use core::{cmp, fmt, ops};

pub use self::kcp::{
    conv_of, Command as KcpCommand, Packet as KcpPacket, Repr as KcpRepr,
    HEADER_LEN as KCP_HEADER_LEN,
};

/// Parsing a segment failed.
///
/// Either it is truncated, or it carries a command this engine does not know.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Error;

impl core::error::Error for Error {}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "wire::Error")
    }
}

pub type Result<T> = core::result::Result<T, Error>;

/// A segment sequence number.
///
/// Sequence numbers wrap around; two of them are compared by the sign of their
/// wrapping difference. A `SeqNumber` is therefore only `PartialOrd`, and the
/// ordering is meaningful as long as the numbers are less than 2^31 apart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct SeqNumber(pub u32);

impl SeqNumber {
    /// Signed distance from `other` to `self`.
    pub const fn diff(self, other: SeqNumber) -> i32 {
        self.0.wrapping_sub(other.0) as i32
    }
}

impl fmt::Display for SeqNumber {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl ops::Add<usize> for SeqNumber {
    type Output = SeqNumber;

    fn add(self, rhs: usize) -> SeqNumber {
        SeqNumber(self.0.wrapping_add(rhs as u32))
    }
}

impl ops::AddAssign<usize> for SeqNumber {
    fn add_assign(&mut self, rhs: usize) {
        *self = *self + rhs;
    }
}

impl cmp::PartialOrd for SeqNumber {
    fn partial_cmp(&self, other: &SeqNumber) -> Option<cmp::Ordering> {
        Some(self.diff(*other).cmp(&0))
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_seq_number_wraps() {
        let last = SeqNumber(u32::MAX);
        let first = last + 1;
        assert_eq!(first, SeqNumber(0));
        assert!(first > last);
        assert_eq!(first.diff(last), 1);
        assert_eq!(last.diff(first), -1);
        assert!(SeqNumber(5) < SeqNumber(6));
        assert_eq!(SeqNumber(5).diff(SeqNumber(6)), -1);
    }
}
