//! Traits do Hardware Abstraction Layer (HAL).
//! Interfaces públicas que o scheduler usa para falar com o hardware.

pub mod context;
pub mod cpu;
pub mod timer;

// Re-exportar para facilitar uso: `use crate::arch::traits::CpuOps;`
pub use context::ContextOps;
pub use cpu::CpuOps;
pub use timer::TimerOps;
