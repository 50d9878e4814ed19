//! # Multitasking & Scheduler Subsystem
//!
//! Escalonador preemptivo por prioridades com runqueues por CPU, e o ciclo
//! de vida das threads de kernel (criação, bloqueio, morte e reaping).
//!
//! ## 🏗️ Arquitetura
//! - **task/**: TCB, arena de slots, listas intrusivas, reaper.
//! - **core/**: runqueue com bitmap, estado por CPU, balanceador,
//!   dispatcher (`reschedule`) e pós-switch, idle thread, política.
//! - **sync/**: WaitQueue e Semaphore construídos sobre block/unpark.
//!
//! ## Invariantes
//! - Uma thread está em no máximo uma fila (garantido pelo `ThreadHandle`).
//! - O dispatcher não aloca, não libera e não bloqueia com o lock da CPU.
//! - Só o reaper libera threads, sempre depois do pós-switch delas.
//!
//! ## Ordem de Lock
//! primitiva de espera → lock da thread → runqueue da CPU.

use spin::Once;

use crate::arch::Platform;

pub mod config;
pub mod core;
pub mod sync;
pub mod task;

#[cfg(feature = "self_test")]
pub mod test;

pub use self::core::{
    FeedbackPolicy, FixedPriority, LoadBalancer, Placement, PriorityPolicy, SchedParams, Scheduler,
};
pub use self::sync::{Semaphore, WaitQueue};
pub use self::task::{Thread, ThreadFlags, ThreadState};

/// Instância única do scheduler (vive até o fim do kernel)
static SCHEDULER: Once<Scheduler> = Once::new();

/// Cria o scheduler global. Falhar aqui é fatal: o kernel não roda sem.
///
/// Chamadas repetidas devolvem a instância existente.
pub fn init(platform: &'static dyn Platform, params: SchedParams) -> &'static Scheduler {
    if let Some(sched) = SCHEDULER.get() {
        crate::kwarn!("(Sched) init chamado mais de uma vez");
        return sched;
    }

    crate::kinfo!("(Sched) Inicializando scheduler...");
    let sched = SCHEDULER.call_once(|| match Scheduler::new(platform, params) {
        Ok(sched) => sched,
        Err(e) => {
            crate::kerror!("(Sched) Falha ao criar o scheduler: "; e.as_str());
            panic!("falha ao criar o scheduler");
        }
    });

    #[cfg(feature = "self_test")]
    test::run_sched_tests();

    sched
}

/// Scheduler global, se `init` já rodou
pub fn get() -> Option<&'static Scheduler> {
    SCHEDULER.get()
}
