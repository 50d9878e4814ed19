//! Primitivas de espera que dependem do scheduler
//!
//! Construídas sobre `Scheduler::block_current` e `Scheduler::unpark`.
//! Ordem de lock: primitiva → thread → runqueue da CPU.

pub mod semaphore;
pub mod waitqueue;

pub use semaphore::Semaphore;
pub use waitqueue::WaitQueue;
