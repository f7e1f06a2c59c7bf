// Process Management Module for the LotOS Microkernel
pub mod manager;
pub mod pcb;
pub mod tickets;

// Re-export specific items to avoid conflicts
pub use manager::{
    create_process, current_process, deregister_tickets, draw_ticket, process_count,
    register_tickets, set_process_priority, terminate_process, ticket_count, ProcessManager,
    PROCESS_MANAGER,
};
pub use pcb::{
    ProcessControlBlock, ProcessError, ProcessId, ProcessPayload, ProcessPriority, ProcessState,
    IDLE_PID, MAX_TICKETS_PER_PROCESS, NZERO, PROC_MAX, PROC_QUANTUM,
};
pub use tickets::{TicketPool, TICKET_MAX};
