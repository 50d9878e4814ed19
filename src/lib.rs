//! Forge Sched - núcleo de escalonamento do kernel Forge.
//!
//! Runqueues por prioridade com bitmap, estado por CPU, balanceamento na
//! criação, dispatcher preemptivo por quantum, idle thread por CPU e
//! reaper para liberar threads mortas fora do caminho crítico.
//!
//! O hardware entra por [`arch::Platform`]: o kernel implementa as
//! operações de CPU, troca de contexto e timer, e o scheduler não tem
//! nenhum assembly próprio.

#![cfg_attr(not(test), no_std)]

// Habilitar alocação dinâmica (arena, pilhas, wait queues)
extern crate alloc;

// --- Módulos de Baixo Nível (Hardware) ---
pub mod arch; // HAL (CPU, contexto, timer)

// --- Módulos Centrais ---
pub mod core; // Logging, Timers
pub mod klib; // Utilitários Internos (Bitmap, testes)
pub mod sync; // Primitivas de Sincronização (Spinlock)
pub mod sys; // Definições de Sistema (IDs, Erros)

// --- Subsistema ---
pub mod sched; // Scheduler e Threads

pub use crate::arch::Platform;
pub use crate::sched::{SchedParams, Scheduler};
pub use crate::sys::{SchedError, SchedResult};
