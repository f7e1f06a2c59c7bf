// Lottery Ticket Pool for the LotOS Microkernel
//
// A flat, fixed-capacity buffer holding one entry per lottery ticket. A
// process of weight `w` appears `w` times, so drawing a uniformly random
// index selects it with probability proportional to its weight. The pool is
// kept compact: live entries fill `[0, len)` with no holes, and each
// process's entries form a single contiguous run.
use super::pcb::{ProcessError, ProcessId, MAX_TICKETS_PER_PROCESS, PROC_MAX};

/// Capacity of the ticket pool: every slot live at the maximum weight.
pub const TICKET_MAX: usize = PROC_MAX * MAX_TICKETS_PER_PROCESS;

/// The draw space for lottery scheduling.
///
/// Invariants, upheld by every operation including error paths:
/// - entries `[0, len)` are `Some`, entries `[len, TICKET_MAX)` are `None`
/// - a registered process appears exactly as many times as it was granted
/// - all entries for one process are contiguous
pub struct TicketPool {
    slots: [Option<ProcessId>; TICKET_MAX],
    len: usize,
}

impl TicketPool {
    /// Create an empty pool.
    pub const fn new() -> Self {
        Self {
            slots: [None; TICKET_MAX],
            len: 0,
        }
    }

    /// Number of tickets currently in the pool.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub const fn capacity(&self) -> usize {
        TICKET_MAX
    }

    /// Ticket at `index`, or `None` past the end of the live region.
    /// This is the read path of the dispatcher's draw loop.
    pub fn get(&self, index: usize) -> Option<ProcessId> {
        if index < self.len {
            self.slots[index]
        } else {
            None
        }
    }

    /// The live region of the pool, in draw order.
    pub fn as_slice(&self) -> &[Option<ProcessId>] {
        &self.slots[..self.len]
    }

    /// How many tickets `pid` currently holds.
    pub fn count(&self, pid: ProcessId) -> usize {
        self.slots[..self.len]
            .iter()
            .filter(|slot| **slot == Some(pid))
            .count()
    }

    /// Append up to `requested` tickets for `pid` and return how many were
    /// actually granted.
    ///
    /// When the pool runs out of capacity mid-append the remaining tickets
    /// are silently dropped rather than failing the whole call: the process
    /// ends up under-weighted but schedulable. Callers detect truncation by
    /// comparing the returned count against `requested`.
    pub fn register(&mut self, pid: ProcessId, requested: usize) -> usize {
        let mut granted = 0;
        while granted < requested && self.len < TICKET_MAX {
            self.slots[self.len] = Some(pid);
            self.len += 1;
            granted += 1;
        }
        granted
    }

    /// Remove every ticket held by `pid`, closing the gap so the pool stays
    /// compact. Returns the number of tickets removed.
    ///
    /// The scan is bounded to the live region; a process with no tickets is
    /// reported as `TicketsNotFound` without touching the pool. The run
    /// length is measured rather than recomputed from the priority, so a
    /// registration that was truncated at capacity deregisters cleanly.
    pub fn deregister(&mut self, pid: ProcessId) -> Result<usize, ProcessError> {
        let start = self.slots[..self.len]
            .iter()
            .position(|slot| *slot == Some(pid))
            .ok_or(ProcessError::TicketsNotFound)?;

        let mut run = 1;
        while start + run < self.len && self.slots[start + run] == Some(pid) {
            run += 1;
        }

        // Shift the tail left over the vacated run, preserving order.
        for i in start..self.len - run {
            self.slots[i] = self.slots[i + run];
        }
        for i in self.len - run..self.len {
            self.slots[i] = None;
        }
        self.len -= run;

        Ok(run)
    }
}

impl Default for TicketPool {
    fn default() -> Self {
        Self::new()
    }
}
