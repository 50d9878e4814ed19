//! Interface Abstrata de CPU (HAL).
//! Define as operações de CPU que o scheduler usa.

use crate::sys::types::CpuId;

pub trait CpuOps {
    /// CPU lógica que está executando o chamador.
    fn current_cpu(&self) -> CpuId;

    /// Verifica se as interrupções estão habilitadas na CPU atual.
    fn interrupts_enabled(&self) -> bool;

    /// Desabilita interrupções na CPU atual (CLI).
    /// Crítico para seções atômicas no scheduler.
    fn disable_interrupts(&self);

    /// Habilita interrupções na CPU atual (STI).
    fn enable_interrupts(&self);

    /// Espera pelo próximo evento: habilita interrupções, para (HLT) e
    /// desabilita de novo antes de retornar. No x86_64 é `sti; hlt; cli`,
    /// sem janela entre `sti` e `hlt`.
    fn idle_wait(&self);

    /// Desabilita interrupções e retorna o estado anterior.
    fn save_and_disable(&self) -> bool {
        let was_enabled = self.interrupts_enabled();
        self.disable_interrupts();
        was_enabled
    }

    /// Restaura o estado salvo por [`save_and_disable`](Self::save_and_disable).
    fn restore(&self, was_enabled: bool) {
        if was_enabled {
            self.enable_interrupts();
        }
    }
}

/// Seção com interrupções desabilitadas; restaura o estado anterior no drop.
///
/// Base do [`IrqSpinlock`](crate::sync::IrqSpinlock); usado direto onde
/// a seção cobre mais de um lock (ex: lock da thread + runqueue).
pub struct IrqGuard<'a, C: CpuOps + ?Sized> {
    cpu: &'a C,
    was_enabled: bool,
}

impl<'a, C: CpuOps + ?Sized> IrqGuard<'a, C> {
    pub fn new(cpu: &'a C) -> Self {
        let was_enabled = cpu.save_and_disable();
        Self { cpu, was_enabled }
    }

    /// Estado das interrupções antes do guard
    pub fn was_enabled(&self) -> bool {
        self.was_enabled
    }
}

impl<C: CpuOps + ?Sized> Drop for IrqGuard<'_, C> {
    fn drop(&mut self) {
        self.cpu.restore(self.was_enabled);
    }
}
