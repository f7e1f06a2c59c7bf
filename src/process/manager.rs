// Process Manager for the LotOS Microkernel - owns the descriptor table and
// the ticket pool, and keeps the two in sync through the lifecycle hooks.
use alloc::string::String;
use alloc::vec::Vec;
use core::array;
use lazy_static::lazy_static;
use spin::Mutex;
use x86_64::instructions::interrupts;

use super::pcb::{
    ProcessControlBlock, ProcessError, ProcessId, ProcessPriority, ProcessState, IDLE_PID,
    PROC_MAX,
};
use super::tickets::TicketPool;

/// Process Manager - fixed-capacity descriptor table plus the lottery pool.
///
/// There is exactly one instance per kernel, constructed at bootstrap and
/// reached through [`PROCESS_MANAGER`]. All scheduling logic lives on the
/// instance itself so it can be driven directly in tests; the free functions
/// at the bottom of this file are the kernel-facing surface and wrap every
/// mutation in an interrupt-masked critical section.
pub struct ProcessManager {
    table: [Option<ProcessControlBlock>; PROC_MAX],
    pool: TicketPool,
    next_pid: ProcessId,
    nprocs: usize,
    current: ProcessId,
    initialized: bool,
}

impl ProcessManager {
    pub fn new() -> Self {
        Self {
            table: array::from_fn(|_| None),
            pool: TicketPool::new(),
            next_pid: 0,
            nprocs: 0,
            current: IDLE_PID,
            initialized: false,
        }
    }

    /// Bootstrap the process table.
    ///
    /// Clears every slot, handcrafts the idle process in slot 0 and resets
    /// the ticket pool to empty. Idle is deliberately *not* registered into
    /// the pool: the dispatcher falls back to it when the pool is empty, so
    /// it never competes in the lottery. Runs before interrupts are enabled;
    /// a repeated invocation is a logged no-op.
    pub fn init(&mut self) {
        if self.initialized {
            log::warn!("process manager already initialized, ignoring");
            return;
        }

        for slot in self.table.iter_mut() {
            *slot = None;
        }
        self.pool = TicketPool::new();
        self.next_pid = 0;
        self.nprocs = 0;

        let idle = ProcessControlBlock::idle(self.alloc_pid());
        self.current = idle.pid;
        self.table[0] = Some(idle);
        self.nprocs = 1;
        self.initialized = true;

        log::info!("process manager initialized with idle process (PID {})", IDLE_PID);
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    fn alloc_pid(&mut self) -> ProcessId {
        let pid = self.next_pid;
        self.next_pid += 1;
        pid
    }

    fn slot_of(&self, pid: ProcessId) -> Option<usize> {
        self.table
            .iter()
            .position(|slot| matches!(slot, Some(pcb) if pcb.pid == pid))
    }

    /// Live (non-Dead) descriptor for `pid`.
    pub fn get_process(&self, pid: ProcessId) -> Option<&ProcessControlBlock> {
        self.table
            .iter()
            .flatten()
            .find(|pcb| pcb.pid == pid && pcb.state != ProcessState::Dead)
    }

    fn get_process_mut(&mut self, pid: ProcessId) -> Option<&mut ProcessControlBlock> {
        self.table
            .iter_mut()
            .flatten()
            .find(|pcb| pcb.pid == pid && pcb.state != ProcessState::Dead)
    }

    /// Grant `pid` its priority's worth of lottery tickets.
    ///
    /// Returns the number of tickets actually granted, which is less than
    /// the priority weight when the pool runs out of capacity. Nothing is
    /// mutated on the error paths.
    pub fn register_tickets(&mut self, pid: ProcessId) -> Result<usize, ProcessError> {
        let requested = {
            let pcb = self.get_process(pid).ok_or(ProcessError::ProcessNotFound)?;
            if pcb.tickets_granted != 0 {
                return Err(ProcessError::AlreadyRegistered);
            }
            pcb.priority.tickets()
        };

        let granted = self.pool.register(pid, requested);
        if granted < requested {
            log::warn!(
                "ticket pool at capacity: PID {} granted {}/{} tickets",
                pid,
                granted,
                requested
            );
        }
        log::trace!("PID {} registered with {} tickets", pid, granted);

        if let Some(pcb) = self.get_process_mut(pid) {
            pcb.tickets_granted = granted;
        }
        Ok(granted)
    }

    /// Withdraw every ticket held by `pid`, compacting the pool.
    ///
    /// Must be called before a descriptor goes Dead or changes priority.
    /// A process with no tickets in the pool is `TicketsNotFound` and the
    /// pool is left untouched.
    pub fn deregister_tickets(&mut self, pid: ProcessId) -> Result<usize, ProcessError> {
        let removed = self.pool.deregister(pid)?;
        if let Some(pcb) = self.get_process_mut(pid) {
            pcb.tickets_granted = 0;
        }
        log::trace!("PID {} deregistered, {} tickets withdrawn", pid, removed);
        Ok(removed)
    }

    /// Allocate a descriptor slot and enter the new process into the
    /// lottery. This is the single seam process creation calls into.
    pub fn allocate(
        &mut self,
        name: String,
        priority: ProcessPriority,
    ) -> Result<ProcessId, ProcessError> {
        let slot = self
            .table
            .iter()
            .position(|slot| slot.is_none())
            .ok_or(ProcessError::TableFull)?;

        let pid = self.alloc_pid();
        log::info!("created process '{}' with PID {}", name, pid);
        self.table[slot] = Some(ProcessControlBlock::new(pid, name, priority));
        self.nprocs += 1;

        self.register_tickets(pid)?;
        Ok(pid)
    }

    /// Withdraw a process from the lottery and release its slot. This is
    /// the single seam process termination calls into.
    ///
    /// The idle slot is reserved and never released. A process that was
    /// never registered (or already deregistered) still terminates.
    pub fn terminate(&mut self, pid: ProcessId) -> Result<(), ProcessError> {
        if pid == IDLE_PID {
            return Err(ProcessError::PermissionDenied);
        }
        let slot = self.slot_of(pid).ok_or(ProcessError::ProcessNotFound)?;

        // A descriptor must never sit in the pool while Dead.
        let granted = self.table[slot]
            .as_ref()
            .map(|pcb| pcb.tickets_granted)
            .unwrap_or(0);
        if granted != 0 {
            self.pool.deregister(pid)?;
        }

        if let Some(pcb) = self.table[slot].as_mut() {
            pcb.state = ProcessState::Dead;
        }
        self.table[slot] = None;
        self.nprocs -= 1;

        if self.current == pid {
            self.current = IDLE_PID;
        }

        log::info!("terminated process PID {}", pid);
        Ok(())
    }

    /// Change a process's priority class, re-entering the lottery under the
    /// new weight. Returns the tickets granted at the new weight.
    pub fn set_priority(
        &mut self,
        pid: ProcessId,
        priority: ProcessPriority,
    ) -> Result<usize, ProcessError> {
        if self.get_process(pid).is_none() {
            return Err(ProcessError::ProcessNotFound);
        }

        let was_registered = self
            .get_process(pid)
            .map(|pcb| pcb.tickets_granted != 0)
            .unwrap_or(false);
        if was_registered {
            self.deregister_tickets(pid)?;
        }

        if let Some(pcb) = self.get_process_mut(pid) {
            pcb.priority = priority;
        }

        if was_registered {
            self.register_tickets(pid)
        } else {
            Ok(0)
        }
    }

    /// Map a raw random value onto the pool and read the winning ticket.
    ///
    /// `None` when the pool is empty - the dispatcher falls back to idle.
    /// This is a pure read; the dispatcher performs the actual switch.
    pub fn draw(&self, lot: usize) -> Option<ProcessId> {
        if self.pool.is_empty() {
            return None;
        }
        self.pool.get(lot % self.pool.len())
    }

    /// Record a dispatch decision made by the external scheduler loop.
    /// State bookkeeping only; no context is switched here.
    pub fn note_dispatch(&mut self, pid: ProcessId) -> Result<(), ProcessError> {
        if self.get_process(pid).is_none() {
            return Err(ProcessError::ProcessNotFound);
        }

        let previous = self.current;
        if previous != pid {
            if let Some(prev) = self.get_process_mut(previous) {
                if prev.state == ProcessState::Running {
                    prev.state = ProcessState::Ready;
                }
            }
        }
        if let Some(next) = self.get_process_mut(pid) {
            next.state = ProcessState::Running;
            next.quantum = super::pcb::PROC_QUANTUM;
        }
        self.current = pid;
        Ok(())
    }

    pub fn current(&self) -> ProcessId {
        self.current
    }

    /// Number of live descriptors, idle included.
    pub fn process_count(&self) -> usize {
        self.nprocs
    }

    /// Number of tickets currently in the pool.
    pub fn ticket_count(&self) -> usize {
        self.pool.len()
    }

    /// Ticket at `index` in the pool, for the dispatcher's read loop.
    pub fn ticket_at(&self, index: usize) -> Option<ProcessId> {
        self.pool.get(index)
    }

    /// List all live processes
    pub fn list_processes(&self) -> Vec<(ProcessId, String, ProcessState)> {
        self.table
            .iter()
            .flatten()
            .map(|pcb| (pcb.pid, pcb.name.clone(), pcb.state))
            .collect()
    }
}

impl Default for ProcessManager {
    fn default() -> Self {
        Self::new()
    }
}

lazy_static! {
    /// The kernel's single process manager instance.
    pub static ref PROCESS_MANAGER: Mutex<ProcessManager> = Mutex::new(ProcessManager::new());
}

// Kernel-facing API. Register/deregister shift the shared pool, and the
// timer interrupt must never observe a half-shifted pool or draw against a
// stale length, so every call below masks interrupts for its duration.

pub fn register_tickets(pid: ProcessId) -> Result<usize, ProcessError> {
    interrupts::without_interrupts(|| PROCESS_MANAGER.lock().register_tickets(pid))
}

pub fn deregister_tickets(pid: ProcessId) -> Result<usize, ProcessError> {
    interrupts::without_interrupts(|| PROCESS_MANAGER.lock().deregister_tickets(pid))
}

pub fn create_process(name: String, priority: ProcessPriority) -> Result<ProcessId, ProcessError> {
    interrupts::without_interrupts(|| PROCESS_MANAGER.lock().allocate(name, priority))
}

pub fn terminate_process(pid: ProcessId) -> Result<(), ProcessError> {
    interrupts::without_interrupts(|| PROCESS_MANAGER.lock().terminate(pid))
}

pub fn set_process_priority(
    pid: ProcessId,
    priority: ProcessPriority,
) -> Result<usize, ProcessError> {
    interrupts::without_interrupts(|| PROCESS_MANAGER.lock().set_priority(pid, priority))
}

pub fn draw_ticket(lot: usize) -> Option<ProcessId> {
    interrupts::without_interrupts(|| PROCESS_MANAGER.lock().draw(lot))
}

pub fn current_process() -> ProcessId {
    interrupts::without_interrupts(|| PROCESS_MANAGER.lock().current())
}

pub fn process_count() -> usize {
    interrupts::without_interrupts(|| PROCESS_MANAGER.lock().process_count())
}

pub fn ticket_count() -> usize {
    interrupts::without_interrupts(|| PROCESS_MANAGER.lock().ticket_count())
}
