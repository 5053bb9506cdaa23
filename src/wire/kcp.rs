use byteorder::{ByteOrder, LittleEndian};
use core::fmt;

use super::{Error, Result, SeqNumber};
use crate::time::Instant;

enum_with_unknown! {
    /// Segment command.
    pub enum Command(u8) {
        Push = 1,
        Ack = 2,
        None = 3
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            Command::Push => write!(f, "PUSH"),
            Command::Ack => write!(f, "ACK"),
            Command::None => write!(f, "NONE"),
            Command::Unknown(id) => write!(f, "0x{id:02x}"),
        }
    }
}

/// A read/write wrapper around a segment buffer.
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct Packet<T: AsRef<[u8]>> {
    buffer: T,
}

mod field {
    use crate::wire::field::*;

    pub const CONV: Field = 0..4;
    pub const CMD: usize = 4;
    pub const FRG: usize = 5;
    pub const WND: Field = 6..8;
    pub const TS: Field = 8..12;
    pub const SN: Field = 12..16;
    pub const UNA: Field = 16..20;
    pub const LEN: Field = 20..24;
    pub const PAYLOAD: Rest = LEN.end..;
}

/// Length of the segment header.
pub const HEADER_LEN: usize = field::PAYLOAD.start;

/// Read the conversation id of a raw datagram, without decoding the rest.
///
/// Useful to route an incoming datagram to the socket that owns the conversation.
pub fn conv_of(datagram: &[u8]) -> Result<u32> {
    if datagram.len() < field::CONV.end {
        return Err(Error);
    }
    Ok(LittleEndian::read_u32(&datagram[field::CONV]))
}

impl<T: AsRef<[u8]>> Packet<T> {
    /// Imbue a raw octet buffer with segment structure.
    pub const fn new_unchecked(buffer: T) -> Packet<T> {
        Packet { buffer }
    }

    /// Shorthand for a combination of [new_unchecked] and [check_len].
    ///
    /// [new_unchecked]: #method.new_unchecked
    /// [check_len]: #method.check_len
    pub fn new_checked(buffer: T) -> Result<Packet<T>> {
        let packet = Self::new_unchecked(buffer);
        packet.check_len()?;
        Ok(packet)
    }

    /// Ensure that no accessor method will panic if called.
    /// Returns `Err(Error)` if the buffer is shorter than the header, or
    /// shorter than the header plus the payload length it declares.
    ///
    /// The result of this check is invalidated by calling [set_payload_len].
    ///
    /// [set_payload_len]: #method.set_payload_len
    pub fn check_len(&self) -> Result<()> {
        let len = self.buffer.as_ref().len();
        if len < HEADER_LEN {
            Err(Error)
        } else if len - HEADER_LEN < self.payload_len() as usize {
            Err(Error)
        } else {
            Ok(())
        }
    }

    /// Consume the packet, returning the underlying buffer.
    pub fn into_inner(self) -> T {
        self.buffer
    }

    /// Return the conversation id field.
    #[inline]
    pub fn conv(&self) -> u32 {
        let data = self.buffer.as_ref();
        LittleEndian::read_u32(&data[field::CONV])
    }

    /// Return the command field.
    #[inline]
    pub fn command(&self) -> Command {
        let data = self.buffer.as_ref();
        Command::from(data[field::CMD])
    }

    /// Return the fragment index field.
    #[inline]
    pub fn frg(&self) -> u8 {
        let data = self.buffer.as_ref();
        data[field::FRG]
    }

    /// Return the advertised window field.
    #[inline]
    pub fn wnd(&self) -> u16 {
        let data = self.buffer.as_ref();
        LittleEndian::read_u16(&data[field::WND])
    }

    /// Return the timestamp field.
    #[inline]
    pub fn timestamp(&self) -> Instant {
        let data = self.buffer.as_ref();
        Instant::from_millis(LittleEndian::read_u32(&data[field::TS]))
    }

    /// Return the sequence number field.
    #[inline]
    pub fn sn(&self) -> SeqNumber {
        let data = self.buffer.as_ref();
        SeqNumber(LittleEndian::read_u32(&data[field::SN]))
    }

    /// Return the cumulative acknowledgement field.
    #[inline]
    pub fn una(&self) -> SeqNumber {
        let data = self.buffer.as_ref();
        SeqNumber(LittleEndian::read_u32(&data[field::UNA]))
    }

    /// Return the payload length field.
    #[inline]
    pub fn payload_len(&self) -> u32 {
        let data = self.buffer.as_ref();
        LittleEndian::read_u32(&data[field::LEN])
    }

    /// Return the length of this segment, header included.
    #[inline]
    pub fn segment_len(&self) -> usize {
        HEADER_LEN + self.payload_len() as usize
    }
}

impl<'a, T: AsRef<[u8]> + ?Sized> Packet<&'a T> {
    /// Return a pointer to the payload, without the octets of any following segment.
    #[inline]
    pub fn payload(&self) -> &'a [u8] {
        let len = self.payload_len() as usize;
        let data = self.buffer.as_ref();
        &data[field::PAYLOAD][..len]
    }
}

impl<T: AsRef<[u8]> + AsMut<[u8]>> Packet<T> {
    /// Set the conversation id field.
    #[inline]
    pub fn set_conv(&mut self, value: u32) {
        let data = self.buffer.as_mut();
        LittleEndian::write_u32(&mut data[field::CONV], value)
    }

    /// Set the command field.
    #[inline]
    pub fn set_command(&mut self, value: Command) {
        let data = self.buffer.as_mut();
        data[field::CMD] = value.into()
    }

    /// Set the fragment index field.
    #[inline]
    pub fn set_frg(&mut self, value: u8) {
        let data = self.buffer.as_mut();
        data[field::FRG] = value
    }

    /// Set the advertised window field.
    #[inline]
    pub fn set_wnd(&mut self, value: u16) {
        let data = self.buffer.as_mut();
        LittleEndian::write_u16(&mut data[field::WND], value)
    }

    /// Set the timestamp field.
    #[inline]
    pub fn set_timestamp(&mut self, value: Instant) {
        let data = self.buffer.as_mut();
        LittleEndian::write_u32(&mut data[field::TS], value.total_millis())
    }

    /// Set the sequence number field.
    #[inline]
    pub fn set_sn(&mut self, value: SeqNumber) {
        let data = self.buffer.as_mut();
        LittleEndian::write_u32(&mut data[field::SN], value.0)
    }

    /// Set the cumulative acknowledgement field.
    #[inline]
    pub fn set_una(&mut self, value: SeqNumber) {
        let data = self.buffer.as_mut();
        LittleEndian::write_u32(&mut data[field::UNA], value.0)
    }

    /// Set the payload length field.
    #[inline]
    pub fn set_payload_len(&mut self, value: u32) {
        let data = self.buffer.as_mut();
        LittleEndian::write_u32(&mut data[field::LEN], value)
    }

    /// Return a mutable pointer to the payload.
    #[inline]
    pub fn payload_mut(&mut self) -> &mut [u8] {
        let len = self.payload_len() as usize;
        let data = self.buffer.as_mut();
        &mut data[field::PAYLOAD][..len]
    }
}

impl<T: AsRef<[u8]> + ?Sized> fmt::Display for Packet<&T> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match Repr::parse(self) {
            Ok(repr) => write!(f, "{repr}"),
            Err(err) => write!(f, "KCP ({err})"),
        }
    }
}

/// A high-level representation of a segment header and payload.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub struct Repr<'a> {
    pub conv: u32,
    pub command: Command,
    pub frg: u8,
    pub wnd: u16,
    pub timestamp: Instant,
    pub sn: SeqNumber,
    pub una: SeqNumber,
    pub payload: &'a [u8],
}

impl<'a> Repr<'a> {
    /// Parse a segment and return a high-level representation.
    ///
    /// Fails if the buffer is truncated or the command is unknown.
    pub fn parse<T>(packet: &Packet<&'a T>) -> Result<Repr<'a>>
    where
        T: AsRef<[u8]> + ?Sized,
    {
        packet.check_len()?;

        let command = packet.command();
        if let Command::Unknown(_) = command {
            return Err(Error);
        }

        Ok(Repr {
            conv: packet.conv(),
            command,
            frg: packet.frg(),
            wnd: packet.wnd(),
            timestamp: packet.timestamp(),
            sn: packet.sn(),
            una: packet.una(),
            payload: packet.payload(),
        })
    }

    /// Return the length of a segment that will be emitted from this high-level representation.
    pub const fn buffer_len(&self) -> usize {
        HEADER_LEN + self.payload.len()
    }

    /// Emit a high-level representation into a segment buffer.
    pub fn emit<T>(&self, packet: &mut Packet<T>)
    where
        T: AsRef<[u8]> + AsMut<[u8]>,
    {
        packet.set_conv(self.conv);
        packet.set_command(self.command);
        packet.set_frg(self.frg);
        packet.set_wnd(self.wnd);
        packet.set_timestamp(self.timestamp);
        packet.set_sn(self.sn);
        packet.set_una(self.una);
        packet.set_payload_len(self.payload.len() as u32);
        packet.payload_mut().copy_from_slice(self.payload);
    }
}

impl fmt::Display for Repr<'_> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "KCP conv={:#x} cmd={} sn={} frg={} wnd={} una={} ts={} len={}",
            self.conv,
            self.command,
            self.sn,
            self.frg,
            self.wnd,
            self.una,
            self.timestamp.total_millis(),
            self.payload.len()
        )
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use alloc::vec;
    use rstest::rstest;

    static SEGMENT_BYTES: [u8; 28] = [
        0x44, 0x33, 0x22, 0x11, // conv
        0x01, // cmd
        0x02, // frg
        0x20, 0x00, // wnd
        0xe8, 0x03, 0x00, 0x00, // ts
        0x07, 0x00, 0x00, 0x00, // sn
        0x03, 0x00, 0x00, 0x00, // una
        0x04, 0x00, 0x00, 0x00, // len
        0xaa, 0x00, 0x00, 0xff, // payload
    ];

    static PAYLOAD_BYTES: [u8; 4] = [0xaa, 0x00, 0x00, 0xff];

    fn segment_repr() -> Repr<'static> {
        Repr {
            conv: 0x1122_3344,
            command: Command::Push,
            frg: 2,
            wnd: 32,
            timestamp: Instant::from_millis(1000),
            sn: SeqNumber(7),
            una: SeqNumber(3),
            payload: &PAYLOAD_BYTES,
        }
    }

    #[test]
    fn test_deconstruct() {
        let packet = Packet::new_unchecked(&SEGMENT_BYTES[..]);
        assert_eq!(packet.conv(), 0x1122_3344);
        assert_eq!(packet.command(), Command::Push);
        assert_eq!(packet.frg(), 2);
        assert_eq!(packet.wnd(), 32);
        assert_eq!(packet.timestamp(), Instant::from_millis(1000));
        assert_eq!(packet.sn(), SeqNumber(7));
        assert_eq!(packet.una(), SeqNumber(3));
        assert_eq!(packet.payload_len(), 4);
        assert_eq!(packet.segment_len(), 28);
        assert_eq!(packet.payload(), &PAYLOAD_BYTES[..]);
        assert_eq!(packet.check_len(), Ok(()));
    }

    #[test]
    fn test_construct() {
        let mut bytes = vec![0xa5; 28];
        let mut packet = Packet::new_unchecked(&mut bytes);
        packet.set_conv(0x1122_3344);
        packet.set_command(Command::Push);
        packet.set_frg(2);
        packet.set_wnd(32);
        packet.set_timestamp(Instant::from_millis(1000));
        packet.set_sn(SeqNumber(7));
        packet.set_una(SeqNumber(3));
        packet.set_payload_len(4);
        packet.payload_mut().copy_from_slice(&PAYLOAD_BYTES[..]);
        assert_eq!(&*packet.into_inner(), &SEGMENT_BYTES[..]);
    }

    #[test]
    fn test_parse() {
        let packet = Packet::new_checked(&SEGMENT_BYTES[..]).unwrap();
        let repr = Repr::parse(&packet).unwrap();
        assert_eq!(repr, segment_repr());
    }

    #[test]
    fn test_emit() {
        let repr = segment_repr();
        let mut bytes = vec![0xa5; repr.buffer_len()];
        let mut packet = Packet::new_unchecked(&mut bytes);
        repr.emit(&mut packet);
        assert_eq!(&*packet.into_inner(), &SEGMENT_BYTES[..]);
    }

    #[test]
    fn test_parse_ignores_trailing_segments() {
        let mut bytes = vec![];
        bytes.extend_from_slice(&SEGMENT_BYTES[..]);
        bytes.extend_from_slice(&SEGMENT_BYTES[..]);
        let packet = Packet::new_checked(&bytes[..]).unwrap();
        let repr = Repr::parse(&packet).unwrap();
        assert_eq!(repr.payload, &PAYLOAD_BYTES[..]);
        assert_eq!(repr.buffer_len(), SEGMENT_BYTES.len());
    }

    #[test]
    fn test_truncated_header() {
        assert_eq!(Packet::new_checked(&SEGMENT_BYTES[..23]), Err(Error));
    }

    #[test]
    fn test_truncated_payload() {
        assert_eq!(Packet::new_checked(&SEGMENT_BYTES[..27]), Err(Error));
    }

    #[rstest]
    #[case(0x00)]
    #[case(0x04)]
    #[case(0x51)]
    #[case(0xff)]
    fn test_unknown_command(#[case] command: u8) {
        let mut bytes = SEGMENT_BYTES;
        bytes[4] = command;
        let packet = Packet::new_checked(&bytes[..]).unwrap();
        assert_eq!(packet.command(), Command::Unknown(command));
        assert_eq!(Repr::parse(&packet), Err(Error));
    }

    #[rstest]
    #[case(1, Command::Push)]
    #[case(2, Command::Ack)]
    #[case(3, Command::None)]
    fn test_known_commands(#[case] raw: u8, #[case] command: Command) {
        assert_eq!(Command::from(raw), command);
        assert_eq!(u8::from(command), raw);
    }

    #[test]
    fn test_conv_of() {
        assert_eq!(conv_of(&SEGMENT_BYTES[..]), Ok(0x1122_3344));
        assert_eq!(conv_of(&SEGMENT_BYTES[..4]), Ok(0x1122_3344));
        assert_eq!(conv_of(&SEGMENT_BYTES[..3]), Err(Error));
    }

    #[test]
    fn test_display() {
        let packet = Packet::new_unchecked(&SEGMENT_BYTES[..]);
        assert_eq!(
            alloc::format!("{packet}"),
            "KCP conv=0x11223344 cmd=PUSH sn=7 frg=2 wnd=32 una=3 ts=1000 len=4"
        );
    }
}
