//! # Hardware Abstraction Layer (HAL)
//!
//! Única ponte entre o scheduler (lógica agnóstica) e o hardware.
//!
//! O scheduler não sabe em qual CPU está rodando nem como uma troca de
//! contexto é feita: ele recebe um `&'static dyn Platform` na criação e
//! passa por ele para tudo que é instrução privilegiada (CLI/STI, HLT, CR3,
//! salvar/restaurar registradores, programar o timer local).
//!
//! ## Fluxo
//! 1. O kernel implementa [`CpuOps`], [`ContextOps`] e [`TimerOps`] para a
//!    máquina real (x86_64: `cli`/`sti`, `hlt`, troca de `rsp`, LAPIC timer).
//! 2. Qualquer tipo que implemente os três é automaticamente um [`Platform`].
//! 3. Testes de host usam uma plataforma mock que só registra eventos.

pub mod traits;

pub use traits::context::{ContextOps, ThreadEntry, ThreadStart};
pub use traits::cpu::{CpuOps, IrqGuard};
pub use traits::timer::TimerOps;

/// Tudo que o scheduler exige da máquina.
pub trait Platform: CpuOps + ContextOps + TimerOps + Sync {}

impl<T: CpuOps + ContextOps + TimerOps + Sync> Platform for T {}
