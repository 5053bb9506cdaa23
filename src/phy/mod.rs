/*! Access to the datagram carrier.

The `phy` module deals with the *output sink* a socket hands its datagrams
to. It provides a trait for transmitting datagrams, [Output](trait.Output.html),
and implementations of it:

  * any closure `FnMut(&[u8]) -> Result<(), E>`, for wiring a socket to a
    host UDP socket or a simulated link;
  * the [_loopback_](struct.Loopback.html), for zero dependency testing.

The sink is invoked synchronously from within the socket's flush and must
not call back into the same socket. Reception is not part of this trait:
the caller feeds datagrams into the socket with `Socket::input`.

# Examples

```rust
use kcp::phy::Output;

let mut sent = Vec::new();
let mut sink = |datagram: &[u8]| -> Result<(), ()> {
    sent.push(datagram.to_vec());
    Ok(())
};
sink.output(b"datagram").unwrap();
assert_eq!(sent, [b"datagram".to_vec()]);
```
*/

mod loopback;

pub use self::loopback::Loopback;

/// A sink for outbound datagrams.
///
/// Each call transmits one datagram no longer than the socket's MTU.
pub trait Output {
    type Error;

    /// Transmit a datagram.
    fn output(&mut self, datagram: &[u8]) -> Result<(), Self::Error>;
}

impl<F, E> Output for F
where
    F: FnMut(&[u8]) -> Result<(), E>,
{
    type Error = E;

    fn output(&mut self, datagram: &[u8]) -> Result<(), E> {
        self(datagram)
    }
}
