// Process Control Block (PCB) for the LotOS Microkernel
use alloc::string::String;
use alloc::vec::Vec;
use x86_64::VirtAddr;

/// Process ID type
pub type ProcessId = u64;

/// Maximum number of live processes in the system
pub const PROC_MAX: usize = 64;

/// PID of the idle process, handcrafted at bootstrap in slot 0
pub const IDLE_PID: ProcessId = 0;

/// Scheduling quantum handed to a freshly dispatched process (timer ticks)
pub const PROC_QUANTUM: u64 = 50;

/// Default nice value
pub const NZERO: i8 = 20;

/// Ticket weight of the highest priority class (`ProcessPriority::User`)
pub const MAX_TICKETS_PER_PROCESS: usize = 8;

/// Process state enumeration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessState {
    Dead,    // Slot is free, descriptor is not valid
    Ready,   // Ready to run, waiting for the lottery
    Running, // Currently executing
    Blocked, // Waiting for I/O or event
}

/// Process priority classes, ordered low-to-high ticket weight.
///
/// The low classes name the kernel resource a process is sleeping on (I/O,
/// buffer cache, inode, ...); ordinary runnable user processes get the full
/// `User` weight. The class determines how many lottery tickets the process
/// holds while registered in the [`TicketPool`](super::tickets::TicketPool).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[repr(u8)]
pub enum ProcessPriority {
    Io = 0,
    Buffer = 1,
    Inode = 2,
    Superblock = 3,
    Region = 4,
    Tty = 5,
    Signal = 6,
    User = 7,
}

impl ProcessPriority {
    /// Number of lottery tickets a process of this class holds.
    pub fn tickets(self) -> usize {
        match self {
            ProcessPriority::Io => 1,
            ProcessPriority::Buffer => 2,
            ProcessPriority::Inode => 3,
            ProcessPriority::Superblock => 4,
            ProcessPriority::Region => 5,
            ProcessPriority::Tty => 6,
            ProcessPriority::Signal => 7,
            ProcessPriority::User => 8,
        }
    }

    /// Validate a raw priority value coming from outside the kernel core
    /// (syscall arguments, config). This is the only place an invalid
    /// priority can surface; once a `ProcessPriority` exists it is valid.
    pub fn from_raw(value: u8) -> Result<Self, ProcessError> {
        match value {
            0 => Ok(ProcessPriority::Io),
            1 => Ok(ProcessPriority::Buffer),
            2 => Ok(ProcessPriority::Inode),
            3 => Ok(ProcessPriority::Superblock),
            4 => Ok(ProcessPriority::Region),
            5 => Ok(ProcessPriority::Tty),
            6 => Ok(ProcessPriority::Signal),
            7 => Ok(ProcessPriority::User),
            _ => Err(ProcessError::InvalidPriority),
        }
    }
}

/// Opaque per-process state owned by other subsystems (memory manager,
/// VFS, signal delivery, tty layer). Carried in the PCB so a context switch
/// has one handle to everything, but never dereferenced by this core.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessPayload {
    pub page_table: Option<u64>,
    pub stack_pointer: VirtAddr,
    pub open_files: Vec<u64>,
    pub pending_signals: u64,
    pub tty: Option<u8>,
}

impl ProcessPayload {
    /// Payload with every field in its empty/unset state.
    pub fn empty() -> Self {
        Self {
            page_table: None,
            stack_pointer: VirtAddr::zero(),
            open_files: Vec::new(),
            pending_signals: 0,
            tty: None,
        }
    }
}

/// Process Control Block (PCB) - Core process management structure
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessControlBlock {
    pub pid: ProcessId,
    pub name: String,
    pub state: ProcessState,
    pub priority: ProcessPriority,
    pub quantum: u64,
    pub nice: i8,
    pub utime: u64,
    pub ktime: u64,
    /// Tickets actually granted at the last registration (0 when not
    /// registered). May be less than `priority.tickets()` if the pool was
    /// near capacity; deregistration trusts the pool's contiguous run, and
    /// this field keeps the accounting observable.
    pub tickets_granted: usize,
    pub payload: ProcessPayload,
}

impl ProcessControlBlock {
    /// Build a fresh descriptor in the `Ready` state, holding no tickets yet.
    pub fn new(pid: ProcessId, name: String, priority: ProcessPriority) -> Self {
        Self {
            pid,
            name,
            state: ProcessState::Ready,
            priority,
            quantum: PROC_QUANTUM,
            nice: NZERO,
            utime: 0,
            ktime: 0,
            tickets_granted: 0,
            payload: ProcessPayload::empty(),
        }
    }

    /// Handcraft the idle process descriptor.
    ///
    /// Called exactly once, from bootstrap. Idle gets the full `User` weight
    /// rather than a dedicated idle class, starts out `Running` with a full
    /// quantum and zeroed usage counters, and carries an empty payload.
    pub fn idle(pid: ProcessId) -> Self {
        Self {
            pid,
            name: String::from("idle"),
            state: ProcessState::Running,
            priority: ProcessPriority::User,
            quantum: PROC_QUANTUM,
            nice: NZERO,
            utime: 0,
            ktime: 0,
            tickets_granted: 0,
            payload: ProcessPayload::empty(),
        }
    }
}

/// Process management errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessError {
    /// Raw priority value outside the fixed class set
    InvalidPriority,
    /// No live descriptor for this PID
    ProcessNotFound,
    /// Deregistration requested for a process holding no tickets
    TicketsNotFound,
    /// A process may hold at most one run of tickets at a time
    AlreadyRegistered,
    /// Every descriptor slot is live
    TableFull,
    /// Operation not allowed on this process (e.g. terminating idle)
    PermissionDenied,
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::string::String;

    #[test]
    fn priority_weights_match_table() {
        let table = [
            (ProcessPriority::Io, 1),
            (ProcessPriority::Buffer, 2),
            (ProcessPriority::Inode, 3),
            (ProcessPriority::Superblock, 4),
            (ProcessPriority::Region, 5),
            (ProcessPriority::Tty, 6),
            (ProcessPriority::Signal, 7),
            (ProcessPriority::User, 8),
        ];
        for (priority, weight) in table {
            assert_eq!(priority.tickets(), weight);
        }
    }

    #[test]
    fn raw_priority_round_trips() {
        for raw in 0..8u8 {
            let priority = ProcessPriority::from_raw(raw).unwrap();
            assert_eq!(priority as u8, raw);
        }
    }

    #[test]
    fn raw_priority_out_of_range_is_rejected() {
        for raw in [8u8, 9, 100, u8::MAX] {
            assert_eq!(
                ProcessPriority::from_raw(raw),
                Err(ProcessError::InvalidPriority)
            );
        }
    }

    #[test]
    fn idle_descriptor_is_running_at_full_user_weight() {
        let idle = ProcessControlBlock::idle(IDLE_PID);
        assert_eq!(idle.pid, IDLE_PID);
        assert_eq!(idle.state, ProcessState::Running);
        assert_eq!(idle.priority, ProcessPriority::User);
        assert_eq!(idle.quantum, PROC_QUANTUM);
        assert_eq!(idle.nice, NZERO);
        assert_eq!(idle.utime, 0);
        assert_eq!(idle.ktime, 0);
        assert_eq!(idle.tickets_granted, 0);
        assert_eq!(idle.payload, ProcessPayload::empty());
    }

    #[test]
    fn new_descriptor_starts_ready_with_no_tickets() {
        let pcb = ProcessControlBlock::new(3, String::from("shell"), ProcessPriority::Tty);
        assert_eq!(pcb.state, ProcessState::Ready);
        assert_eq!(pcb.tickets_granted, 0);
        assert_eq!(pcb.priority.tickets(), 6);
    }
}
