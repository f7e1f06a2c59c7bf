// Process Management Core for the LotOS Microkernel
//
// LotOS hands the CPU out by lottery: every runnable process holds a number
// of tickets proportional to its priority class, and the dispatcher draws a
// random ticket to pick who runs next. This crate owns the process table and
// the ticket pool the draw is made from; the random source, the context
// switch and the memory manager live elsewhere in the kernel.
#![cfg_attr(not(test), no_std)]

extern crate alloc;

pub mod process;

pub use process::pcb::{
    ProcessControlBlock, ProcessError, ProcessId, ProcessPriority, ProcessState,
};
pub use process::tickets::TicketPool;

/// Initialize the process management subsystem.
///
/// Must be called exactly once at kernel start, while interrupts are still
/// disabled. Bootstraps the process table (handcrafting the idle entry) and
/// then enables interrupts: from this point on every mutation of the ticket
/// pool runs as an interrupt-masked critical section.
pub fn init() {
    process::manager::PROCESS_MANAGER.lock().init();
    x86_64::instructions::interrupts::enable();
}
