//! Wait queues para bloqueio e sincronização
//!
//! Permite que threads durmam aguardando eventos e sejam acordadas
//! posteriormente.
//!
//! A fila guarda só TIDs. A posse da thread bloqueada fica com a própria
//! thread (vaga `parked`), então um TID que não resolve mais (thread morta
//! e reciclada) é simplesmente descartado no wake.

use alloc::collections::VecDeque;

use crate::sched::Scheduler;
use crate::sync::IrqSpinlock;
use crate::sys::types::Tid;
use crate::sys::{SchedError, SchedResult};

/// Fila FIFO de threads bloqueadas aguardando um evento.
pub struct WaitQueue {
    waiters: IrqSpinlock<VecDeque<Tid>>,
}

impl WaitQueue {
    /// Cria nova waitqueue vazia
    pub const fn new() -> Self {
        Self {
            waiters: IrqSpinlock::new(VecDeque::new()),
        }
    }

    /// Bloqueia a thread atual nesta fila até um `wake_*`.
    ///
    /// O espaço na fila é reservado antes de bloquear; sem memória a thread
    /// não dorme e recebe `OutOfMemory`.
    pub fn wait(&self, sched: &Scheduler) -> SchedResult<()> {
        let irq_state = sched.platform().save_and_disable();

        let mut waiters = self.waiters.lock(sched.platform());
        if waiters.try_reserve(1).is_err() {
            drop(waiters);
            sched.platform().restore(irq_state);
            return Err(SchedError::OutOfMemory);
        }

        let me = sched.current_thread();
        waiters.push_back(me.tid());

        // Ordem: fila → thread. Um waker que pegar o TID vai girar no lock
        // da thread até o pós-switch estacionar o handle.
        me.lock.acquire(sched.platform().current_cpu());
        drop(waiters);

        sched.block_current(irq_state);
        Ok(())
    }

    /// Acorda a thread mais antiga desta fila.
    ///
    /// Retorna true se acordou alguém.
    pub fn wake_one(&self, sched: &Scheduler) -> bool {
        let mut waiters = self.waiters.lock(sched.platform());

        while let Some(tid) = waiters.pop_front() {
            if sched.unpark(tid) {
                return true;
            }
            crate::kwarn!("(WaitQueue) TID obsoleto descartado:", tid.as_u32());
        }
        false
    }

    /// Acorda todas as threads desta fila.
    ///
    /// Retorna número de threads acordadas.
    pub fn wake_all(&self, sched: &Scheduler) -> usize {
        let mut waiters = self.waiters.lock(sched.platform());

        let mut count = 0;
        while let Some(tid) = waiters.pop_front() {
            if sched.unpark(tid) {
                count += 1;
            }
        }
        count
    }

    pub fn len(&self, sched: &Scheduler) -> usize {
        self.waiters.lock(sched.platform()).len()
    }

    pub fn is_empty(&self, sched: &Scheduler) -> bool {
        self.len(sched) == 0
    }
}

impl Default for WaitQueue {
    fn default() -> Self {
        Self::new()
    }
}
