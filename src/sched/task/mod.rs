//! Threads: TCB, arena, listas intrusivas e ciclo de vida

pub mod accounting;
pub mod arena;
pub mod entity;
pub mod lifecycle;
pub mod list;
pub mod state;

pub use accounting::{Accounting, AccountingCounters};
pub use arena::{ThreadArena, ThreadHandle, ThreadInit};
pub use entity::{KernelStack, Thread, ThreadContext, ThreadFlags, ThreadName};
pub use lifecycle::Reaper;
pub use list::TaskList;
pub use state::ThreadState;
