//! # Synchronization Primitives
//!
//! Primitivas de sincronização de baixo nível usadas pelo scheduler.
//!
//! ## Hierarquia de Uso
//!
//! ```text
//! Spinlock      → Seções críticas curtas com dados, fora do caminho do dispatcher
//! IrqSpinlock   → Dados que o dispatcher também toca (runqueues, handoff, dead list)
//! RawSpinlock   → Lock que atravessa troca de contexto (lock por thread)
//! AtomicCounter → Contadores globais (threads prontas/rodando, reaped)
//! ```
//!
//! As primitivas que bloqueiam (Semaphore, WaitQueue) dependem do scheduler
//! e vivem em `sched::sync`.
//!
//! ## Ordem de Lock
//!
//! primitiva de espera → lock da thread → runqueue da CPU. Nunca o contrário.

/// Operações atômicas
pub mod atomic;

/// Spinlock (busy-wait, não dorme)
pub mod spinlock;

pub use atomic::AtomicCounter;
pub use spinlock::{IrqSpinlock, IrqSpinlockGuard, RawSpinlock, Spinlock, SpinlockGuard};
