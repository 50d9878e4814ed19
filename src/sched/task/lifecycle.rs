//! Cleanup de threads mortas (Reaper)
//!
//! O caminho do dispatcher nunca libera memória: uma thread que morre é só
//! movida para a lista de mortos pelo handler pós-switch (operação de
//! ponteiros, sem alocador). Quem libera a pilha e o slot é a thread
//! reaper, rodando como thread normal, preemptível e com interrupções
//! habilitadas.
//!
//! ```text
//! exit → DEAD → dispatcher → pós-switch → lista de mortos + up()
//!                                                │
//!                        reaper: down() → pop → release do slot
//! ```

use spin::Once;

use super::arena::{ThreadArena, ThreadHandle};
use super::entity::ThreadFlags;
use super::list::TaskList;
use crate::sched::config::PRIORITY_REAPER;
use crate::sched::sync::Semaphore;
use crate::sched::Scheduler;
use crate::arch::CpuOps;
use crate::sync::{AtomicCounter, IrqSpinlock};
use crate::sys::types::Tid;
use crate::sys::SchedResult;

/// Lista de mortos + contador de espera do reaper
pub struct Reaper {
    /// FIFO de threads mortas com lock próprio, independente das CPUs.
    /// O pós-switch empurra com IRQ desabilitada.
    dead: IrqSpinlock<TaskList>,
    /// Uma unidade por thread na lista
    pending: Semaphore,
    reaped: AtomicCounter,
    thread: Once<Tid>,
}

impl Reaper {
    pub const fn new() -> Self {
        Self {
            dead: IrqSpinlock::new(TaskList::new()),
            pending: Semaphore::new(0),
            reaped: AtomicCounter::new(0),
            thread: Once::new(),
        }
    }

    /// Entrega uma thread morta (só o pós-switch chama)
    pub(crate) fn push_dead<C: CpuOps + ?Sized>(
        &self,
        cpu: &C,
        arena: &ThreadArena,
        handle: ThreadHandle,
    ) {
        self.dead.lock(cpu).push_back(arena, handle);
    }

    fn pop_dead<C: CpuOps + ?Sized>(&self, cpu: &C, arena: &ThreadArena) -> Option<ThreadHandle> {
        self.dead.lock(cpu).pop_front(arena)
    }

    pub(crate) fn dead_contains<C: CpuOps + ?Sized>(
        &self,
        cpu: &C,
        arena: &ThreadArena,
        slot: u16,
    ) -> bool {
        self.dead.lock(cpu).contains(arena, slot)
    }

    pub(crate) fn dead_tids<C: CpuOps + ?Sized>(
        &self,
        cpu: &C,
        arena: &ThreadArena,
        out: &mut [Tid],
    ) -> usize {
        self.dead.lock(cpu).collect_tids(arena, out)
    }

    pub(crate) fn pending(&self) -> &Semaphore {
        &self.pending
    }

    pub fn pending_dead<C: CpuOps + ?Sized>(&self, cpu: &C) -> usize {
        self.dead.lock(cpu).len()
    }

    pub fn reaped_total(&self) -> u64 {
        self.reaped.get()
    }

    /// TID da thread reaper, se já foi criada
    pub fn thread(&self) -> Option<Tid> {
        self.thread.get().copied()
    }
}

impl Default for Reaper {
    fn default() -> Self {
        Self::new()
    }
}

/// Corpo da thread reaper
fn reaper_entry(sched: &'static Scheduler, _arg: usize) {
    crate::kinfo!("(Reaper) Thread reaper iniciada");
    loop {
        sched.reap_one();
    }
}

impl Scheduler {
    /// Cria a thread reaper. Só a primeira chamada cria; as outras
    /// retornam o TID existente.
    pub fn start_reaper(&'static self) -> SchedResult<Tid> {
        if let Some(tid) = self.reaper.thread() {
            crate::kwarn!("(Reaper) start_reaper chamado mais de uma vez");
            return Ok(tid);
        }

        let tid = self.spawn_flagged(
            "reaper",
            reaper_entry,
            0,
            PRIORITY_REAPER,
            None,
            ThreadFlags::KERNEL | ThreadFlags::REAPER,
        )?;
        self.reaper.thread.call_once(|| tid);

        crate::kinfo!("(Reaper) Reaper criado TID=", tid.as_u32());
        Ok(tid)
    }

    /// Uma iteração do reaper: espera uma morte e libera a thread.
    ///
    /// Bloqueia a thread atual se a lista estiver vazia. Retorna `true` se
    /// liberou alguma thread.
    pub fn reap_one(&self) -> bool {
        if let Err(e) = self.reaper.pending.down(self) {
            crate::kwarn!("(Reaper) down falhou: "; e.as_str());
            self.yield_now();
            return false;
        }
        self.reap_next()
    }

    /// Versão não-bloqueante de [`reap_one`](Self::reap_one)
    pub fn try_reap(&self) -> bool {
        self.reaper.pending.try_down(self) && self.reap_next()
    }

    /// Libera a primeira thread da lista de mortos.
    ///
    /// É a continuação de [`reap_one`](Self::reap_one) depois que a
    /// unidade do semáforo já é do chamador (consumida no `down` ou
    /// entregue direto pelo `up`).
    pub fn reap_next(&self) -> bool {
        match self.reaper.pop_dead(self.platform(), &self.arena) {
            Some(handle) => {
                self.free_thread(handle);
                true
            }
            None => {
                // Unidade sem thread correspondente: contabilidade quebrada
                // em algum lugar, mas não há o que liberar.
                crate::kwarn!("(Reaper) Semáforo acordou com lista vazia");
                false
            }
        }
    }

    /// Passo de liberação. Consome o handle: cada thread passa aqui uma vez.
    fn free_thread(&self, handle: ThreadHandle) {
        let thread = self.arena.get(&handle);
        let tid = thread.tid();
        crate::kdebug!("(Reaper) Liberando TID=", tid.as_u32());

        // `release` confere que a thread está DEAD e fora de listas
        let stack = self.arena.release(handle);
        drop(stack);

        self.reaper.reaped.inc();
    }

    pub fn pending_dead(&self) -> usize {
        self.reaper.pending_dead(self.platform())
    }

    pub fn reaped_total(&self) -> u64 {
        self.reaper.reaped_total()
    }
}
