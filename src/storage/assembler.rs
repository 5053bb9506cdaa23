use alloc::collections::VecDeque;
use core::fmt;

use super::Segment;
use crate::wire::SeqNumber;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DuplicateError;

impl fmt::Display for DuplicateError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "duplicate segment")
    }
}

impl core::error::Error for DuplicateError {}

/// A segment (re)assembler.
///
/// Holds out-of-order segments, sorted by ascending sequence number, with at
/// most one segment per sequence number. Segments leave from the front once
/// they become contiguous with the next expected sequence number.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Assembler {
    segments: VecDeque<Segment>,
}

impl fmt::Display for Assembler {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "[ ")?;
        for segment in self.segments.iter() {
            write!(f, "{} ", segment.sn)?;
        }
        write!(f, "]")?;
        Ok(())
    }
}

impl Assembler {
    /// Create a new, empty segment assembler.
    pub const fn new() -> Assembler {
        Assembler {
            segments: VecDeque::new(),
        }
    }

    /// Return the number of segments waiting for reassembly.
    pub fn len(&self) -> usize {
        self.segments.len()
    }

    /// Return whether the assembler contains no segment.
    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Segment> {
        self.segments.iter()
    }

    /// Insert a segment at the position that keeps the sequence numbers ascending,
    /// or return `Err(DuplicateError)` (dropping the segment) if its sequence
    /// number is already present.
    pub fn insert(&mut self, segment: Segment) -> Result<(), DuplicateError> {
        // New arrivals are usually the highest yet, so scan from the back.
        let mut at = self.segments.len();
        for (i, existing) in self.segments.iter().enumerate().rev() {
            if existing.sn == segment.sn {
                return Err(DuplicateError);
            }
            if segment.sn > existing.sn {
                break;
            }
            at = i;
        }

        self.segments.insert(at, segment);
        Ok(())
    }

    /// Remove the front segment if its sequence number is `next`.
    pub fn remove_front(&mut self, next: SeqNumber) -> Option<Segment> {
        if self.segments.front()?.sn == next {
            self.segments.pop_front()
        } else {
            None
        }
    }
}
