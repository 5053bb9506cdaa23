use alloc::vec::Vec;
use core::fmt;

use crate::time::{Duration, Instant};
use crate::wire::{KcpCommand, KcpRepr, SeqNumber};

/// One fragment of an application message, owned by exactly one queue.
///
/// The conversation id and the command are not stored: every queued segment
/// belongs to the socket's conversation and carries data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment {
    pub(crate) frg: u8,
    pub(crate) wnd: u16,
    pub(crate) ts: Instant,
    pub(crate) sn: SeqNumber,
    pub(crate) una: SeqNumber,
    /// When the segment is due for retransmission.
    pub(crate) resendts: Instant,
    /// Current retransmission timeout of this segment.
    pub(crate) rto: Duration,
    /// Number of times this segment was transmitted.
    pub(crate) xmit: u32,
    /// Number of acknowledgements for later segments received since it was last sent.
    pub(crate) fastack: u32,
    payload: Vec<u8>,
}

impl Segment {
    /// Create an outbound segment carrying a copy of `payload`.
    pub fn new(frg: u8, payload: &[u8]) -> Segment {
        Segment {
            frg,
            wnd: 0,
            ts: Instant::ZERO,
            sn: SeqNumber::default(),
            una: SeqNumber::default(),
            resendts: Instant::ZERO,
            rto: Duration::ZERO,
            xmit: 0,
            fastack: 0,
            payload: payload.to_vec(),
        }
    }

    /// Materialize an inbound segment from its wire representation.
    pub fn from_repr(repr: &KcpRepr) -> Segment {
        Segment {
            frg: repr.frg,
            wnd: repr.wnd,
            ts: repr.timestamp,
            sn: repr.sn,
            una: repr.una,
            ..Segment::new(repr.frg, repr.payload)
        }
    }

    /// Return the wire representation of this segment as a data segment.
    pub fn repr(&self, conv: u32) -> KcpRepr<'_> {
        KcpRepr {
            conv,
            command: KcpCommand::Push,
            frg: self.frg,
            wnd: self.wnd,
            timestamp: self.ts,
            sn: self.sn,
            una: self.una,
            payload: &self.payload,
        }
    }

    pub fn sn(&self) -> SeqNumber {
        self.sn
    }

    /// Fragment index; 0 marks the last fragment of a message.
    pub fn frg(&self) -> u8 {
        self.frg
    }

    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    pub fn len(&self) -> usize {
        self.payload.len()
    }

    pub fn is_empty(&self) -> bool {
        self.payload.is_empty()
    }
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "({} {})", self.sn, self.ts.total_millis() % 10_000)
    }
}
