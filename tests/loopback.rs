use kcp::phy::Loopback;
use kcp::time::{Duration, Instant};
use kcp::wire::{KcpCommand, KcpPacket, KcpRepr};
use kcp::{NoDelay, SendError, Socket};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rstest::rstest;

const CONV: u32 = 0x1;

fn setup() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// One direction of a simulated datagram carrier, with loss, latency and
/// jitter. Jitter larger than the step reorders datagrams.
struct Link {
    rng: StdRng,
    loss: f64,
    latency: u32,
    jitter: u32,
    in_flight: Vec<(Instant, Vec<u8>)>,
}

impl Link {
    fn new(seed: u64, loss: f64, latency: u32, jitter: u32) -> Link {
        Link {
            rng: StdRng::seed_from_u64(seed),
            loss,
            latency,
            jitter,
            in_flight: Vec::new(),
        }
    }

    fn carry(&mut self, now: Instant, datagram: Vec<u8>) {
        if self.rng.gen_bool(self.loss) {
            return;
        }
        let jitter = if self.jitter > 0 {
            self.rng.gen_range(0..self.jitter)
        } else {
            0
        };
        let at = now + Duration::from_millis(self.latency + jitter);
        self.in_flight.push((at, datagram));
    }

    fn deliver(&mut self, now: Instant) -> Vec<Vec<u8>> {
        let mut due = Vec::new();
        let mut index = 0;
        while index < self.in_flight.len() {
            if self.in_flight[index].0 <= now {
                due.push(self.in_flight.swap_remove(index).1);
            } else {
                index += 1;
            }
        }
        due
    }
}

/// Two sockets wired back to back.
struct Pair {
    a: Socket<Loopback>,
    b: Socket<Loopback>,
    ab: Link,
    ba: Link,
    now: Instant,
    received: Vec<Vec<u8>>,
}

impl Pair {
    fn new(start: Instant, ab: Link, ba: Link) -> Pair {
        setup();
        Pair {
            a: Socket::new(CONV, Loopback::new()),
            b: Socket::new(CONV, Loopback::new()),
            ab,
            ba,
            now: start,
            received: Vec::new(),
        }
    }

    fn step(&mut self, millis: u32) {
        self.now += Duration::from_millis(millis);
        let now = self.now;

        self.a.update(now).unwrap();
        self.b.update(now).unwrap();
        while let Some(datagram) = self.a.output_mut().pop() {
            self.ab.carry(now, datagram);
        }
        while let Some(datagram) = self.b.output_mut().pop() {
            self.ba.carry(now, datagram);
        }
        for datagram in self.ab.deliver(now) {
            self.b.input(&datagram).unwrap();
        }
        for datagram in self.ba.deliver(now) {
            self.a.input(&datagram).unwrap();
        }

        let mut buffer = vec![0; 64 * 1024];
        while let Ok(size) = self.b.recv(&mut buffer) {
            self.received.push(buffer[..size].to_vec());
        }
    }

    /// Step until `count` messages arrived at `b`, or `limit` milliseconds passed.
    fn run(&mut self, count: usize, limit: u32) {
        let mut elapsed = 0;
        while self.received.len() < count && elapsed < limit {
            self.step(10);
            elapsed += 10;
        }
    }
}

fn messages(seed: u64, count: usize, max_len: usize) -> Vec<Vec<u8>> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..count)
        .map(|_| {
            let len = rng.gen_range(1..=max_len);
            (0..len).map(|_| rng.r#gen()).collect()
        })
        .collect()
}

#[rstest]
#[case::lossless(0.0, false)]
#[case::lossy(0.1, false)]
#[case::very_lossy(0.3, true)]
fn test_reliable_in_order(#[case] loss: f64, #[case] nodelay: bool) {
    let mut pair = Pair::new(
        Instant::ZERO,
        Link::new(1, loss, 20, 30),
        Link::new(2, loss, 20, 30),
    );
    if nodelay {
        pair.a.set_nodelay_config(NoDelay::FAST);
        pair.b.set_nodelay_config(NoDelay::FAST);
    }

    let sent = messages(3, 100, 4000);
    for message in sent.iter() {
        pair.a.send(message).unwrap();
    }

    pair.run(sent.len(), 600_000);
    assert_eq!(pair.received.len(), sent.len());
    assert!(pair.received == sent, "messages corrupted or reordered");

    pair.run(usize::MAX, 20_000);
    assert_eq!(pair.a.wait_send(), 0);
}

#[test]
fn test_window_bound() {
    let mut pair = Pair::new(
        Instant::ZERO,
        Link::new(4, 0.0, 20, 0),
        Link::new(5, 0.0, 20, 0),
    );
    pair.a.set_window_size(16, 0);
    for message in messages(6, 200, 3000).iter() {
        pair.a.send(message).unwrap();
    }

    while pair.received.len() < 200 {
        pair.step(10);
        let window = pair.a.send_window().min(pair.a.remote_window());
        assert!(pair.a.send_buffer_len() <= window as usize);
    }
}

#[test]
fn test_clock_wraparound() {
    let mut pair = Pair::new(
        Instant::from_millis(u32::MAX - 200),
        Link::new(7, 0.05, 15, 10),
        Link::new(8, 0.05, 15, 10),
    );
    let sent = messages(9, 100, 2000);
    for message in sent.iter() {
        pair.a.send(message).unwrap();
    }

    pair.run(sent.len(), 120_000);
    assert!(pair.received == sent);
    assert!(pair.now.total_millis() < u32::MAX - 200);
}

#[test]
fn test_large_payload() {
    setup();
    let mut a = Socket::new(CONV, Loopback::new());
    let mut b = Socket::new(CONV, Loopback::new());
    assert_eq!(a.mtu(), 1400);

    let payload: Vec<u8> = (0..5000u32).map(|i| (i * 7) as u8).collect();
    a.send(&payload).unwrap();
    assert_eq!(a.send_queue_len(), 4);

    a.update(Instant::ZERO).unwrap();
    while let Some(datagram) = a.output_mut().pop() {
        assert!(datagram.len() <= 1400);
        b.input(&datagram).unwrap();
    }

    let mut buffer = vec![0; 8192];
    assert_eq!(b.peek_size(), Some(5000));
    assert_eq!(b.recv(&mut buffer), Ok(5000));
    assert_eq!(&buffer[..5000], &payload[..]);

    assert_eq!(a.wait_send(), 4);
    b.update(Instant::ZERO).unwrap();
    while let Some(datagram) = b.output_mut().pop() {
        a.input(&datagram).unwrap();
    }
    assert_eq!(a.wait_send(), 0);
}

#[test]
fn test_many_small_then_too_large() {
    let mut pair = Pair::new(
        Instant::ZERO,
        Link::new(10, 0.0, 5, 0),
        Link::new(11, 0.0, 5, 0),
    );
    let sent: Vec<Vec<u8>> = (0..300u32)
        .map(|i| format!("msg-{i:06}").into_bytes())
        .collect();
    for message in sent.iter() {
        pair.a.send(message).unwrap();
    }
    assert_eq!(pair.a.send_queue_len(), 300);

    let too_large = vec![0; 256 * pair.a.mss()];
    assert_eq!(pair.a.send(&too_large), Err(SendError::TooLarge));
    assert_eq!(pair.a.send_queue_len(), 300);

    pair.run(sent.len(), 60_000);
    assert!(pair.received == sent);
}

/// Cut every datagram a socket produced into individually encoded segments.
fn split(datagrams: &[Vec<u8>]) -> Vec<Vec<u8>> {
    let mut segments = Vec::new();
    for datagram in datagrams {
        let mut data = &datagram[..];
        while !data.is_empty() {
            let packet = KcpPacket::new_checked(data).unwrap();
            let repr = KcpRepr::parse(&packet).unwrap();
            assert_eq!(repr.command, KcpCommand::Push);
            segments.push(data[..packet.segment_len()].to_vec());
            data = &data[packet.segment_len()..];
        }
    }
    segments
}

fn deliver_all(segments: &[Vec<u8>]) -> Vec<Vec<u8>> {
    let mut b = Socket::new(CONV, Loopback::new());
    for segment in segments {
        b.input(segment).unwrap();
    }
    let mut received = Vec::new();
    let mut buffer = vec![0; 8192];
    while let Ok(size) = b.recv(&mut buffer) {
        received.push(buffer[..size].to_vec());
    }
    received
}

#[rstest]
#[case::in_order(None)]
#[case::reversed(Some(0))]
#[case::shuffled(Some(12))]
#[case::shuffled_again(Some(13))]
fn test_reordering_tolerance(#[case] shuffle: Option<u64>) {
    setup();
    let mut a = Socket::new(CONV, Loopback::new());
    let sent = messages(14, 12, 3000);
    for message in sent.iter() {
        a.send(message).unwrap();
    }
    a.update(Instant::ZERO).unwrap();
    let mut datagrams = Vec::new();
    while let Some(datagram) = a.output_mut().pop() {
        datagrams.push(datagram);
    }

    let mut segments = split(&datagrams);
    assert!(segments.len() <= 40);
    match shuffle {
        None => {}
        Some(0) => segments.reverse(),
        Some(seed) => segments.shuffle(&mut StdRng::seed_from_u64(seed)),
    }
    assert!(deliver_all(&segments) == sent);
}

#[test]
fn test_duplicate_suppression() {
    setup();
    let mut a = Socket::new(CONV, Loopback::new());
    a.send(b"only once").unwrap();
    a.update(Instant::ZERO).unwrap();
    let datagram = a.output_mut().pop().unwrap();

    let received = deliver_all(&[datagram.clone(), datagram]);
    assert_eq!(received, [b"only once".to_vec()]);
}
