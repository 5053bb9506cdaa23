// Heads up! This engine is wire compatible with the classic KCP protocol:
// segment layout, window accounting and the RTO formula must stay as they are,
// or two peers built from different revisions stop understanding each other.

use alloc::collections::VecDeque;
use alloc::vec::Vec;
use core::fmt;

use crate::config::{
    DEAD_LINK, FLUSH_RESYNC, FRAGMENT_MAX, INTERVAL_DEFAULT, INTERVAL_MAX, INTERVAL_MIN,
    MTU_DEFAULT, MTU_MIN, OVERHEAD, RECV_WINDOW_DEFAULT, RTO_DEFAULT, RTO_MAX, RTO_MIN,
    RTO_NODELAY_MIN,
};
use crate::phy::Output;
use crate::storage::{AckList, Assembler, DuplicateError, Segment};
use crate::time::{Duration, Instant};
use crate::wire::{KcpCommand, KcpPacket, KcpRepr, SeqNumber, KCP_HEADER_LEN};

mod congestion;

use self::congestion::Controller;

macro_rules! kcp_trace {
    ($($arg:expr),*) => (net_log!(trace, $($arg),*));
}

/// Error returned by [`Socket::send`]
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum SendError {
    /// The message would need more than 255 fragments.
    TooLarge,
}

impl fmt::Display for SendError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            SendError::TooLarge => write!(f, "message too large"),
        }
    }
}

impl core::error::Error for SendError {}

/// Error returned by [`Socket::recv`] and [`Socket::peek`]
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum RecvError {
    /// No message is waiting.
    Empty,
    /// The next message is still missing fragments.
    Incomplete,
    /// The next message does not fit in the buffer.
    BufferTooSmall,
}

impl fmt::Display for RecvError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            RecvError::Empty => write!(f, "receive queue empty"),
            RecvError::Incomplete => write!(f, "message incomplete"),
            RecvError::BufferTooSmall => write!(f, "buffer too small"),
        }
    }
}

impl core::error::Error for RecvError {}

/// Error returned by [`Socket::input`]
///
/// Segments that precede the offending one in the same datagram have
/// already been processed when this is returned.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum InputError {
    /// The segment belongs to another conversation.
    ConvMismatch,
    /// The segment declares more payload than the datagram holds.
    Truncated,
    /// The segment carries an unknown command.
    UnknownCommand,
}

impl fmt::Display for InputError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            InputError::ConvMismatch => write!(f, "conversation mismatch"),
            InputError::Truncated => write!(f, "truncated segment"),
            InputError::UnknownCommand => write!(f, "unknown command"),
        }
    }
}

impl core::error::Error for InputError {}

/// Error returned by [`Socket::set_mtu`]
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum MtuError {
    TooSmall,
}

impl fmt::Display for MtuError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            MtuError::TooSmall => write!(f, "mtu too small"),
        }
    }
}

impl core::error::Error for MtuError {}

/// The state of a connection.
///
/// The engine has no handshake; a socket is active from creation. A dead
/// link is only a hint: the socket keeps retransmitting, and it is up to the
/// caller to give up on it.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum State {
    Active,
    /// Some segment was transmitted `DEAD_LINK` times without being acknowledged.
    DeadLink,
}

impl fmt::Display for State {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            State::Active => write!(f, "ACTIVE"),
            State::DeadLink => write!(f, "DEAD-LINK"),
        }
    }
}

/// A set of latency knobs, applied together with [`Socket::set_nodelay_config`].
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub struct NoDelay {
    /// Lower the RTO floor and back off by half an RTO per retransmission.
    pub nodelay: bool,
    /// Flush interval.
    pub interval: Duration,
    /// Fast resend threshold; 0 disables fast resend.
    pub resend: u32,
}

impl NoDelay {
    /// The defaults of a new socket.
    pub const NORMAL: NoDelay = NoDelay {
        nodelay: false,
        interval: Duration::from_millis(INTERVAL_DEFAULT),
        resend: 0,
    };

    /// Aggressive settings for latency sensitive traffic.
    pub const FAST: NoDelay = NoDelay {
        nodelay: true,
        interval: Duration::from_millis(INTERVAL_MIN),
        resend: 2,
    };
}

impl Default for NoDelay {
    fn default() -> Self {
        NoDelay::NORMAL
    }
}

#[derive(Debug, Clone, Copy)]
struct RttEstimator {
    /// true if we have made at least one rtt measurement.
    have_measurement: bool,
    /// Smoothed RTT
    srtt: u32,
    /// RTT variance.
    rttvar: u32,
    /// Retransmission Time-Out
    rto: u32,
    /// Floor of the retransmission timeout.
    min_rto: u32,
}

impl Default for RttEstimator {
    fn default() -> Self {
        Self {
            have_measurement: false,
            srtt: 0,   // ignored, will be overwritten on first measurement.
            rttvar: 0, // ignored, will be overwritten on first measurement.
            rto: RTO_DEFAULT,
            min_rto: RTO_MIN,
        }
    }
}

impl RttEstimator {
    fn retransmission_timeout(&self) -> Duration {
        Duration::from_millis(self.rto)
    }

    fn sample(&mut self, new_rtt: u32) {
        if self.have_measurement {
            let delta = self.srtt.abs_diff(new_rtt) as u64;
            self.rttvar = ((self.rttvar as u64 * 3 + delta) / 4) as u32;
            self.srtt = ((self.srtt as u64 * 7 + new_rtt as u64) / 8).max(1) as u32;
        } else {
            self.have_measurement = true;
            self.srtt = new_rtt;
            self.rttvar = new_rtt / 2;
        }

        let margin = (self.rttvar as u64 * 4).max(1);
        self.rto = (self.srtt as u64 + margin).clamp(self.min_rto as u64, RTO_MAX as u64) as u32;

        kcp_trace!(
            "rtte: sample={} srtt={} rttvar={} rto={}",
            new_rtt,
            self.srtt,
            self.rttvar,
            self.rto
        );
    }

    fn set_nodelay(&mut self, nodelay: bool) {
        self.min_rto = if nodelay { RTO_NODELAY_MIN } else { RTO_MIN };
    }
}

/// Coalesces segments into datagrams no longer than the MTU and hands each
/// datagram to the output sink.
///
/// The first sink error is kept; later datagrams are still handed over.
struct Emitter<'a, O: Output> {
    buffer: &'a mut Vec<u8>,
    output: &'a mut O,
    mtu: usize,
    error: Option<O::Error>,
}

impl<'a, O: Output> Emitter<'a, O> {
    fn new(buffer: &'a mut Vec<u8>, output: &'a mut O, mtu: usize) -> Self {
        buffer.clear();
        Emitter {
            buffer,
            output,
            mtu,
            error: None,
        }
    }

    fn emit(&mut self, repr: &KcpRepr) {
        let need = repr.buffer_len();
        if !self.buffer.is_empty() && self.buffer.len() + need > self.mtu {
            self.drain();
        }

        let start = self.buffer.len();
        self.buffer.resize(start + need, 0);
        let mut packet = KcpPacket::new_unchecked(&mut self.buffer[start..]);
        repr.emit(&mut packet);
    }

    fn drain(&mut self) {
        if self.buffer.is_empty() {
            return;
        }

        kcp_trace!("output {} octets", self.buffer.len());
        if let Err(err) = self.output.output(&self.buffer[..]) {
            net_debug!("output sink failed for {} octets", self.buffer.len());
            self.error.get_or_insert(err);
        }
        self.buffer.clear();
    }

    fn finish(mut self) -> Result<(), O::Error> {
        self.drain();
        match self.error.take() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

/// A KCP socket.
///
/// A socket turns a stream of messages into segments for an unreliable,
/// unordered datagram carrier, and turns the segments it is fed back into
/// the same messages, in order and without duplicates. It performs no I/O
/// of its own: datagrams leave through the [`Output`] sink given at creation,
/// arrive through [`input`](#method.input), and time only advances when the
/// caller says so through [`update`](#method.update).
#[derive(Debug)]
pub struct Socket<O: Output> {
    conv: u32,
    state: State,
    mtu: usize,

    /// Oldest unacknowledged sequence number.
    snd_una: SeqNumber,
    /// Next sequence number to assign.
    snd_nxt: SeqNumber,
    /// Next sequence number expected from the peer.
    rcv_nxt: SeqNumber,
    rcv_wnd: u16,
    rtte: RttEstimator,
    congestion_controller: congestion::WindowLimit,

    current: Instant,
    interval: Duration,
    ts_flush: Instant,
    updated: bool,
    nodelay: bool,
    fast_resend: u32,

    snd_queue: VecDeque<Segment>,
    snd_buf: VecDeque<Segment>,
    rcv_buf: Assembler,
    rcv_queue: VecDeque<Segment>,
    ack_list: AckList,

    buffer: Vec<u8>,
    output: O,
}

impl<O: Output> Socket<O> {
    /// Create a socket for conversation `conv`, sending datagrams into `output`.
    ///
    /// Both peers must use the same conversation id.
    pub fn new(conv: u32, output: O) -> Socket<O> {
        Socket {
            conv,
            state: State::Active,
            mtu: MTU_DEFAULT,
            snd_una: SeqNumber(0),
            snd_nxt: SeqNumber(0),
            rcv_nxt: SeqNumber(0),
            rcv_wnd: RECV_WINDOW_DEFAULT,
            rtte: RttEstimator::default(),
            congestion_controller: congestion::WindowLimit::new(),
            current: Instant::ZERO,
            interval: Duration::from_millis(INTERVAL_DEFAULT),
            ts_flush: Instant::from_millis(INTERVAL_DEFAULT),
            updated: false,
            nodelay: false,
            fast_resend: 0,
            snd_queue: VecDeque::new(),
            snd_buf: VecDeque::new(),
            rcv_buf: Assembler::new(),
            rcv_queue: VecDeque::new(),
            ack_list: AckList::new(),
            buffer: Vec::with_capacity(MTU_DEFAULT),
            output,
        }
    }

    /// Return the conversation id.
    pub fn conv(&self) -> u32 {
        self.conv
    }

    pub fn state(&self) -> State {
        self.state
    }

    /// Return whether some segment reached the dead link retransmission count.
    pub fn is_dead_link(&self) -> bool {
        self.state == State::DeadLink
    }

    /// Return the maximum datagram size handed to the output sink.
    pub fn mtu(&self) -> usize {
        self.mtu
    }

    /// Return the maximum payload carried by one segment.
    pub fn mss(&self) -> usize {
        self.mtu - OVERHEAD
    }

    /// Set the maximum datagram size.
    ///
    /// Segments already queued keep the size they were cut to.
    pub fn set_mtu(&mut self, mtu: usize) -> Result<(), MtuError> {
        if mtu < MTU_MIN || mtu < OVERHEAD {
            return Err(MtuError::TooSmall);
        }
        self.mtu = mtu;
        self.buffer.reserve(mtu);
        Ok(())
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Set the flush interval, clamped to 10..=5000 milliseconds.
    pub fn set_interval(&mut self, interval: Duration) {
        let millis = interval.total_millis().clamp(INTERVAL_MIN, INTERVAL_MAX);
        self.interval = Duration::from_millis(millis);
    }

    pub fn nodelay(&self) -> bool {
        self.nodelay
    }

    /// Return the fast resend threshold, or 0 if fast resend is disabled.
    pub fn fast_resend(&self) -> u32 {
        self.fast_resend
    }

    /// Adjust the latency knobs; `None` leaves a knob unchanged.
    ///
    /// Turning `nodelay` on lowers the RTO floor to 30 ms and halves the
    /// retransmission backoff step. The current RTO is not recomputed until
    /// the next RTT sample.
    pub fn set_nodelay(
        &mut self,
        nodelay: Option<bool>,
        interval: Option<Duration>,
        resend: Option<u32>,
    ) {
        if let Some(nodelay) = nodelay {
            self.nodelay = nodelay;
            self.rtte.set_nodelay(nodelay);
        }
        if let Some(interval) = interval {
            self.set_interval(interval);
        }
        if let Some(resend) = resend {
            self.fast_resend = resend;
        }
    }

    /// Apply every knob of a [`NoDelay`] preset.
    pub fn set_nodelay_config(&mut self, config: NoDelay) {
        self.set_nodelay(
            Some(config.nodelay),
            Some(config.interval),
            Some(config.resend),
        );
    }

    /// Return the send window, in segments.
    pub fn send_window(&self) -> u16 {
        self.congestion_controller.send_window() as u16
    }

    /// Return the receive window, in segments.
    pub fn recv_window(&self) -> u16 {
        self.rcv_wnd
    }

    /// Return the window last advertised by the peer.
    pub fn remote_window(&self) -> u16 {
        self.congestion_controller.remote_window() as u16
    }

    /// Set the send and receive windows, in segments; 0 leaves a window unchanged.
    pub fn set_window_size(&mut self, send_window: u16, recv_window: u16) {
        if send_window > 0 {
            self.congestion_controller
                .set_send_window(send_window as usize);
        }
        if recv_window > 0 {
            self.rcv_wnd = recv_window;
        }
    }

    /// Return the current retransmission timeout.
    pub fn rto(&self) -> Duration {
        self.rtte.retransmission_timeout()
    }

    /// Return the smoothed round trip time.
    pub fn srtt(&self) -> Duration {
        Duration::from_millis(self.rtte.srtt)
    }

    pub fn rttvar(&self) -> Duration {
        Duration::from_millis(self.rtte.rttvar)
    }

    /// Return the number of segments waiting to enter the send window.
    pub fn send_queue_len(&self) -> usize {
        self.snd_queue.len()
    }

    /// Return the number of segments in flight.
    pub fn send_buffer_len(&self) -> usize {
        self.snd_buf.len()
    }

    /// Return the number of out of order segments held for reassembly.
    pub fn recv_buffer_len(&self) -> usize {
        self.rcv_buf.len()
    }

    /// Return the number of in order segments ready to be read.
    pub fn recv_queue_len(&self) -> usize {
        self.rcv_queue.len()
    }

    /// Return the number of acknowledgements the next flush will send.
    pub fn ack_pending(&self) -> usize {
        self.ack_list.len()
    }

    /// Return the number of segments not yet acknowledged, queued or in flight.
    pub fn wait_send(&self) -> usize {
        self.snd_buf.len() + self.snd_queue.len()
    }

    pub fn output(&self) -> &O {
        &self.output
    }

    pub fn output_mut(&mut self) -> &mut O {
        &mut self.output
    }

    /// Consume the socket, dropping every queued segment and returning the output sink.
    pub fn into_output(self) -> O {
        self.output
    }

    fn set_state(&mut self, state: State) {
        if self.state != state {
            net_debug!("conv={:#x}: state={}=>{}", self.conv, self.state, state);
        }

        self.state = state;
    }

    /// Return the receive window left unused, as advertised to the peer.
    fn window_unused(&self) -> u16 {
        (self.rcv_wnd as usize).saturating_sub(self.rcv_queue.len()) as u16
    }

    /// Enqueue a message.
    ///
    /// The message is cut into segments of at most `mss()` octets; an empty
    /// message still takes one segment. Nothing is transmitted until the next
    /// flush.
    pub fn send(&mut self, data: &[u8]) -> Result<(), SendError> {
        let mss = self.mss();
        let count = data.len().div_ceil(mss).max(1);
        if count > FRAGMENT_MAX {
            net_debug!(
                "send: {} octets need {} fragments, more than {}",
                data.len(),
                count,
                FRAGMENT_MAX
            );
            return Err(SendError::TooLarge);
        }

        let mut chunks = data.chunks(mss);
        for frg in (0..count).rev() {
            let chunk = chunks.next().unwrap_or(&[]);
            self.snd_queue.push_back(Segment::new(frg as u8, chunk));
        }

        kcp_trace!(
            "send: queued {} octets in {} segments (now {})",
            data.len(),
            count,
            self.snd_queue.len()
        );
        Ok(())
    }

    /// Return the length of the next message, or `None` if there is no
    /// complete message to read.
    pub fn peek_size(&self) -> Option<usize> {
        let head = self.rcv_queue.front()?;
        if head.frg() == 0 {
            return Some(head.len());
        }

        if self.rcv_queue.len() < head.frg() as usize + 1 {
            return None;
        }

        let mut length = 0;
        for segment in self.rcv_queue.iter() {
            length += segment.len();
            if segment.frg() == 0 {
                break;
            }
        }
        Some(length)
    }

    fn recv_error_check(&self, capacity: usize) -> Result<usize, RecvError> {
        if self.rcv_queue.is_empty() {
            return Err(RecvError::Empty);
        }

        let size = self.peek_size().ok_or(RecvError::Incomplete)?;
        if size > capacity {
            return Err(RecvError::BufferTooSmall);
        }

        Ok(size)
    }

    /// Dequeue the next message into `data`, and return its length.
    pub fn recv(&mut self, data: &mut [u8]) -> Result<usize, RecvError> {
        let size = self.recv_error_check(data.len())?;

        let mut offset = 0;
        while let Some(segment) = self.rcv_queue.pop_front() {
            let end = offset + segment.len();
            data[offset..end].copy_from_slice(segment.payload());
            offset = end;
            kcp_trace!("recv sn={}", segment.sn());
            if segment.frg() == 0 {
                break;
            }
        }

        debug_assert_eq!(offset, size);
        Ok(size)
    }

    /// Copy the next message into `data` without dequeueing it, and return its length.
    ///
    /// This function otherwise behaves identically to [recv](#method.recv).
    pub fn peek(&mut self, data: &mut [u8]) -> Result<usize, RecvError> {
        let size = self.recv_error_check(data.len())?;

        let mut offset = 0;
        for segment in self.rcv_queue.iter() {
            let end = offset + segment.len();
            data[offset..end].copy_from_slice(segment.payload());
            offset = end;
            if segment.frg() == 0 {
                break;
            }
        }

        debug_assert_eq!(offset, size);
        Ok(size)
    }

    /// Feed a datagram received from the peer.
    ///
    /// Every complete segment in the datagram is processed in turn; trailing
    /// octets shorter than a segment header are ignored.
    pub fn input(&mut self, data: &[u8]) -> Result<(), InputError> {
        kcp_trace!("input {} octets", data.len());

        let mut data = data;
        while data.len() >= KCP_HEADER_LEN {
            let packet = KcpPacket::new_unchecked(data);
            if packet.conv() != self.conv {
                net_debug!(
                    "input: conv={:#x} does not match {:#x}",
                    packet.conv(),
                    self.conv
                );
                return Err(InputError::ConvMismatch);
            }
            if packet.check_len().is_err() {
                net_debug!(
                    "input: segment declares {} octets, {} left",
                    packet.payload_len(),
                    data.len() - KCP_HEADER_LEN
                );
                return Err(InputError::Truncated);
            }
            if let KcpCommand::Unknown(command) = packet.command() {
                net_debug!("input: unknown command {:#04x}", command);
                return Err(InputError::UnknownCommand);
            }

            let repr = KcpRepr::parse(&packet).map_err(|_| InputError::Truncated)?;
            data = &data[packet.segment_len()..];
            self.process(&repr);
        }

        Ok(())
    }

    fn process(&mut self, repr: &KcpRepr) {
        self.congestion_controller
            .set_remote_window(repr.wnd as usize);
        self.parse_una(repr.una);

        match repr.command {
            KcpCommand::Ack => {
                let rtt = self.current.millis_since(repr.timestamp);
                if rtt >= 0 {
                    self.rtte.sample(rtt as u32);
                }
                self.parse_ack(repr.sn);
                kcp_trace!(
                    "input ack: sn={} rtt={} rto={}",
                    repr.sn,
                    rtt,
                    self.rtte.rto
                );
            }
            KcpCommand::Push => {
                kcp_trace!("input push: sn={} ts={}", repr.sn, repr.timestamp);
                if repr.sn < self.rcv_nxt + self.rcv_wnd as usize {
                    self.ack_list.push(repr.sn, repr.timestamp);
                    if repr.sn >= self.rcv_nxt {
                        self.parse_data(Segment::from_repr(repr));
                    }
                } else {
                    net_debug!(
                        "input push: sn={} outside window {}+{}",
                        repr.sn,
                        self.rcv_nxt,
                        self.rcv_wnd
                    );
                }
            }
            KcpCommand::None | KcpCommand::Unknown(_) => {}
        }
    }

    /// Drop every in flight segment the peer acknowledged cumulatively.
    fn parse_una(&mut self, una: SeqNumber) {
        while let Some(segment) = self.snd_buf.front() {
            if segment.sn() < una {
                self.snd_buf.pop_front();
            } else {
                break;
            }
        }
        self.shrink_buf();
    }

    /// Drop the in flight segment the peer acknowledged selectively, and count
    /// the acknowledgement against every earlier segment still in flight.
    fn parse_ack(&mut self, sn: SeqNumber) {
        if sn < self.snd_una || sn >= self.snd_nxt {
            return;
        }

        let mut acked = None;
        for (index, segment) in self.snd_buf.iter_mut().enumerate() {
            if segment.sn == sn {
                acked = Some(index);
                break;
            }
            if segment.sn > sn {
                break;
            }
            segment.fastack = segment.fastack.saturating_add(1);
        }

        if let Some(index) = acked {
            self.snd_buf.remove(index);
        }
        self.shrink_buf();
    }

    fn shrink_buf(&mut self) {
        self.snd_una = match self.snd_buf.front() {
            Some(segment) => segment.sn(),
            None => self.snd_nxt,
        };
    }

    fn parse_data(&mut self, segment: Segment) {
        let sn = segment.sn();
        if let Err(DuplicateError) = self.rcv_buf.insert(segment) {
            net_debug!("input push: duplicate sn={}", sn);
        }

        while let Some(segment) = self.rcv_buf.remove_front(self.rcv_nxt) {
            self.rcv_queue.push_back(segment);
            self.rcv_nxt += 1;
        }
    }

    /// Transmit pending acknowledgements, then every segment that is new,
    /// due for retransmission, or due for fast resend.
    ///
    /// Does nothing until [update](#method.update) was called once. If the
    /// output sink fails, the flush still completes and the first error is
    /// returned; the affected segments are retransmitted on timeout.
    pub fn flush(&mut self) -> Result<(), O::Error> {
        if !self.updated {
            return Ok(());
        }

        let now = self.current;
        let wnd = self.window_unused();
        let una = self.rcv_nxt;
        let conv = self.conv;
        let mut emitter = Emitter::new(&mut self.buffer, &mut self.output, self.mtu);

        for &(sn, timestamp) in self.ack_list.iter() {
            emitter.emit(&KcpRepr {
                conv,
                command: KcpCommand::Ack,
                frg: 0,
                wnd,
                timestamp,
                sn,
                una,
                payload: &[],
            });
        }
        self.ack_list.clear();

        let rto = self.rtte.retransmission_timeout();
        let window = self.congestion_controller.window();
        while self.snd_nxt < self.snd_una + window {
            let Some(mut segment) = self.snd_queue.pop_front() else {
                break;
            };
            segment.wnd = wnd;
            segment.ts = now;
            segment.sn = self.snd_nxt;
            segment.una = una;
            segment.resendts = now;
            segment.rto = rto;
            segment.fastack = 0;
            segment.xmit = 0;
            self.snd_buf.push_back(segment);
            self.snd_nxt += 1;
        }

        let mut dead_link = false;
        for segment in self.snd_buf.iter_mut() {
            let due = if segment.xmit == 0 {
                segment.rto = rto;
                segment.resendts = now + segment.rto;
                true
            } else if now >= segment.resendts {
                segment.rto += if self.nodelay { rto / 2 } else { rto };
                segment.resendts = now + segment.rto;
                kcp_trace!("retransmit sn={} rto={}", segment.sn, segment.rto);
                true
            } else if self.fast_resend > 0 && segment.fastack >= self.fast_resend {
                segment.fastack = 0;
                segment.resendts = now + segment.rto;
                kcp_trace!("fast resend sn={}", segment.sn);
                true
            } else {
                false
            };

            if due {
                segment.xmit = segment.xmit.saturating_add(1);
                segment.ts = now;
                segment.wnd = wnd;
                segment.una = una;
                emitter.emit(&segment.repr(conv));
            }

            if segment.xmit >= DEAD_LINK {
                dead_link = true;
            }
        }

        let result = emitter.finish();
        if dead_link {
            self.set_state(State::DeadLink);
        }
        result
    }

    /// Advance the clock to `now`, and flush if a flush is due.
    ///
    /// Call this every [interval](#method.interval), or at the time
    /// returned by [check](#method.check).
    pub fn update(&mut self, now: Instant) -> Result<(), O::Error> {
        self.current = now;
        if !self.updated {
            self.updated = true;
            self.ts_flush = now;
        }

        let slap = now.millis_since(self.ts_flush);
        if !(-FLUSH_RESYNC..FLUSH_RESYNC).contains(&slap) {
            kcp_trace!("flush clock resync, {}ms off", slap);
            self.ts_flush = now;
        }

        if now >= self.ts_flush {
            self.ts_flush += self.interval;
            if now >= self.ts_flush {
                self.ts_flush = now + self.interval;
            }
            self.flush()?;
        }

        Ok(())
    }

    /// Return the time at which [update](#method.update) should be called
    /// next, which is never earlier than `now`.
    ///
    /// Returns `now` if the socket was never updated, if a flush is due, or if
    /// a segment is due for retransmission.
    pub fn check(&self, now: Instant) -> Instant {
        if !self.updated {
            return now;
        }

        let mut ts_flush = self.ts_flush;
        let slap = now.millis_since(ts_flush);
        if !(-FLUSH_RESYNC..FLUSH_RESYNC).contains(&slap) {
            ts_flush = now;
        }

        if now >= ts_flush {
            return now;
        }

        let tm_flush = ts_flush.millis_since(now);
        let mut tm_packet = i32::MAX;
        for segment in self.snd_buf.iter() {
            let diff = segment.resendts.millis_since(now);
            if diff <= 0 {
                return now;
            }
            tm_packet = tm_packet.min(diff);
        }

        let minimal = (tm_packet.min(tm_flush) as u32).min(self.interval.total_millis());
        now + Duration::from_millis(minimal)
    }
}

impl<O: Output> fmt::Display for Socket<O> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        fn queue<'a>(
            f: &mut fmt::Formatter,
            name: &str,
            segments: impl Iterator<Item = &'a Segment>,
        ) -> fmt::Result {
            write!(f, "{name}: [")?;
            for segment in segments {
                write!(f, " {segment}")?;
            }
            writeln!(f, " ]")
        }

        writeln!(
            f,
            "conv={:#x} state={} snd_una={} snd_nxt={} rcv_nxt={} rto={}",
            self.conv,
            self.state,
            self.snd_una,
            self.snd_nxt,
            self.rcv_nxt,
            self.rto()
        )?;
        queue(f, "snd_queue", self.snd_queue.iter())?;
        queue(f, "snd_buf", self.snd_buf.iter())?;
        queue(f, "rcv_buf", self.rcv_buf.iter())?;
        queue(f, "rcv_queue", self.rcv_queue.iter())
    }
}
