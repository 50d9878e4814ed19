//! Interface do timer local (LAPIC timer no x86_64).

use crate::sys::types::CpuId;

pub trait TimerOps {
    /// Programa um disparo único daqui a `ticks` na CPU `cpu`, substituindo
    /// qualquer disparo pendente. Quando disparar, o handler de IRQ deve
    /// chamar [`Scheduler::timer_expired`](crate::sched::Scheduler::timer_expired).
    fn arm_oneshot(&self, cpu: CpuId, ticks: u64);

    /// Cancela o disparo pendente, se houver. Plataformas que não conseguem
    /// cancelar podem ignorar: um disparo tardio é descartado pelo scheduler.
    fn disarm(&self, _cpu: CpuId) {}
}
