//! Semáforo contador
//!
//! `up` com alguém esperando entrega a unidade direto para o primeiro da
//! fila (o contador não passa por 1), então um terceiro não consegue
//! "roubar" a unidade entre o wake e o dispatch do acordado.
//!
//! O semáforo do reaper recebe `up` do handler pós-switch, então todo
//! acesso ao estado interno é feito com IRQ desabilitada.

use alloc::collections::VecDeque;

use crate::sched::Scheduler;
use crate::sync::IrqSpinlock;
use crate::sys::types::Tid;
use crate::sys::{SchedError, SchedResult};

struct SemState {
    count: u64,
    waiters: VecDeque<Tid>,
}

/// Semáforo contador
pub struct Semaphore {
    inner: IrqSpinlock<SemState>,
}

impl Semaphore {
    pub const fn new(count: u64) -> Self {
        Self {
            inner: IrqSpinlock::new(SemState {
                count,
                waiters: VecDeque::new(),
            }),
        }
    }

    /// P: consome uma unidade, bloqueando a thread atual se não houver
    pub fn down(&self, sched: &Scheduler) -> SchedResult<()> {
        // IRQ fica desabilitada até o dispatcher, não só durante o lock
        let irq_state = sched.platform().save_and_disable();
        let mut inner = self.inner.lock(sched.platform());

        if inner.count > 0 {
            inner.count -= 1;
            drop(inner);
            sched.platform().restore(irq_state);
            return Ok(());
        }

        if inner.waiters.try_reserve(1).is_err() {
            drop(inner);
            sched.platform().restore(irq_state);
            return Err(SchedError::OutOfMemory);
        }

        let me = sched.current_thread();
        inner.waiters.push_back(me.tid());
        me.lock.acquire(sched.platform().current_cpu());
        drop(inner);

        // Ao voltar daqui a unidade já é nossa (entregue pelo `up`)
        sched.block_current(irq_state);
        Ok(())
    }

    /// Tenta consumir sem bloquear
    pub fn try_down(&self, sched: &Scheduler) -> bool {
        let mut inner = self.inner.lock(sched.platform());
        if inner.count > 0 {
            inner.count -= 1;
            true
        } else {
            false
        }
    }

    /// V: devolve uma unidade ou acorda o primeiro da fila
    pub fn up(&self, sched: &Scheduler) {
        let mut inner = self.inner.lock(sched.platform());

        while let Some(tid) = inner.waiters.pop_front() {
            if sched.unpark(tid) {
                return;
            }
            crate::kwarn!("(Semaphore) Waiter obsoleto descartado:", tid.as_u32());
        }
        inner.count += 1;
    }

    /// Unidades disponíveis
    pub fn count(&self, sched: &Scheduler) -> u64 {
        self.inner.lock(sched.platform()).count
    }

    /// Threads bloqueadas no semáforo
    pub fn waiters(&self, sched: &Scheduler) -> usize {
        self.inner.lock(sched.platform()).waiters.len()
    }
}
