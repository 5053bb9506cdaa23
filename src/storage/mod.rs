/*! Specialized containers.

The `storage` module provides the containers a socket keeps its segments
in. Each segment is owned by exactly one container at a time; moving it
between queues moves the value.
*/

mod ack_list;
mod assembler;
mod segment;

pub use self::ack_list::AckList;
pub use self::assembler::{Assembler, DuplicateError};
pub use self::segment::Segment;
