use alloc::vec::Vec;

use crate::time::Instant;
use crate::wire::SeqNumber;

/// Acknowledgements owed to the peer: the sequence number of each received
/// data segment, with the timestamp it carried so the peer can measure RTT.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct AckList {
    entries: Vec<(SeqNumber, Instant)>,
}

impl AckList {
    pub const fn new() -> AckList {
        AckList {
            entries: Vec::new(),
        }
    }

    pub fn push(&mut self, sn: SeqNumber, ts: Instant) {
        self.entries.push((sn, ts));
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &(SeqNumber, Instant)> {
        self.entries.iter()
    }

    /// Forget every entry, keeping the allocation for the next round.
    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_push_and_clear() {
        let mut acks = AckList::new();
        assert!(acks.is_empty());

        acks.push(SeqNumber(3), Instant::from_millis(30));
        acks.push(SeqNumber(1), Instant::from_millis(10));
        assert_eq!(acks.len(), 2);
        assert_eq!(
            acks.iter().copied().collect::<Vec<_>>(),
            [
                (SeqNumber(3), Instant::from_millis(30)),
                (SeqNumber(1), Instant::from_millis(10)),
            ]
        );

        acks.clear();
        assert!(acks.is_empty());
    }
}
