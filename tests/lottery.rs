// End-to-end lottery scheduling behavior, driven the way the dispatcher
// drives the subsystem: allocate processes, let the pool accumulate their
// tickets, draw against it, terminate, and watch the odds shift.
use lotos::process::manager::ProcessManager;
use lotos::process::pcb::{ProcessError, ProcessPriority, IDLE_PID};
use lotos::process::tickets::TicketPool;

fn booted() -> ProcessManager {
    let mut pm = ProcessManager::new();
    pm.init();
    pm
}

/// Deterministic stand-in for the kernel's random source.
struct XorShift64(u64);

impl XorShift64 {
    fn next(&mut self) -> u64 {
        let mut x = self.0;
        x ^= x << 13;
        x ^= x >> 7;
        x ^= x << 17;
        self.0 = x;
        x
    }
}

#[test]
fn worked_scenario_from_the_drawing_board() {
    let mut pm = booted();

    // register(A, priority=INODE) on an empty pool -> [A, A, A]
    let a = pm.allocate("a".into(), ProcessPriority::Inode).unwrap();
    assert_eq!(pm.ticket_count(), 3);
    assert!((0..3).all(|i| pm.ticket_at(i) == Some(a)));

    // register(B, priority=USER) -> [A, A, A, B*8]
    let b = pm.allocate("b".into(), ProcessPriority::User).unwrap();
    assert_eq!(pm.ticket_count(), 11);
    assert!((3..11).all(|i| pm.ticket_at(i) == Some(b)));

    // deregister(A) -> [B*8]
    pm.deregister_tickets(a).unwrap();
    assert_eq!(pm.ticket_count(), 8);
    assert!((0..8).all(|i| pm.ticket_at(i) == Some(b)));
    assert_eq!(pm.ticket_at(8), None);
}

#[test]
fn draw_frequency_converges_to_ticket_share() {
    let mut pm = booted();
    let a = pm.allocate("light".into(), ProcessPriority::Io).unwrap();
    let b = pm.allocate("heavy".into(), ProcessPriority::Signal).unwrap();
    assert_eq!(pm.ticket_count(), 8);

    let mut rng = XorShift64(0x9e37_79b9_7f4a_7c15);
    let draws = 100_000;
    let mut hits_a = 0u32;
    let mut hits_b = 0u32;
    for _ in 0..draws {
        // High bits of the generator state, like the dispatcher uses.
        let lot = (rng.next() >> 32) as usize;
        match pm.draw(lot) {
            Some(pid) if pid == a => hits_a += 1,
            Some(pid) if pid == b => hits_b += 1,
            other => panic!("draw returned unexpected {:?}", other),
        }
    }

    // B holds 7 of 8 tickets: expect 87.5% within a generous tolerance.
    let share_b = f64::from(hits_b) / f64::from(draws);
    assert!(
        (0.86..=0.89).contains(&share_b),
        "heavy process drawn {} of {} times (share {:.4})",
        hits_b,
        draws,
        share_b
    );
    assert_eq!(hits_a + hits_b, draws);
}

#[test]
fn empty_pool_draws_nothing_and_idle_carries_on() {
    let pm = booted();
    let mut rng = XorShift64(1);
    for _ in 0..64 {
        assert_eq!(pm.draw(rng.next() as usize), None);
    }
    assert_eq!(pm.current(), IDLE_PID);
}

#[test]
fn odds_shift_as_processes_come_and_go() {
    let mut pm = booted();
    let a = pm.allocate("a".into(), ProcessPriority::User).unwrap();
    let b = pm.allocate("b".into(), ProcessPriority::User).unwrap();

    // Equal weights: both appear among draws.
    let mut rng = XorShift64(7);
    let mut saw = [false, false];
    for _ in 0..1000 {
        match pm.draw((rng.next() >> 32) as usize) {
            Some(pid) if pid == a => saw[0] = true,
            Some(pid) if pid == b => saw[1] = true,
            _ => {}
        }
    }
    assert_eq!(saw, [true, true]);

    // After A leaves, every draw lands on B.
    pm.terminate(a).unwrap();
    for _ in 0..1000 {
        assert_eq!(pm.draw((rng.next() >> 32) as usize), Some(b));
    }
}

#[test]
fn registration_round_trip_leaves_no_trace() {
    let mut pool = TicketPool::new();
    pool.register(10, 4);
    pool.register(11, 8);
    let snapshot: Vec<_> = pool.as_slice().to_vec();

    pool.register(12, 6);
    pool.deregister(12).unwrap();

    assert_eq!(pool.as_slice(), snapshot.as_slice());
}

#[test]
fn raw_priorities_are_validated_at_the_boundary() {
    assert_eq!(ProcessPriority::from_raw(2), Ok(ProcessPriority::Inode));
    assert_eq!(
        ProcessPriority::from_raw(42),
        Err(ProcessError::InvalidPriority)
    );
}
