//! Ferramentas de Debug para o Scheduler
//!
//! Tudo aqui pega os locks de uma CPU por vez: o retrato de várias CPUs
//! não é atômico, serve para diagnóstico e testes.

use super::cpu::RunState;
use super::scheduler::Scheduler;
use crate::sys::types::Tid;

/// Quantos TIDs por fila o dump imprime
const DUMP_LIMIT: usize = 64;

impl Scheduler {
    /// Em quantas listas (runqueues de todas as CPUs + lista de mortos) a
    /// thread aparece. Nunca deve passar de 1.
    pub fn membership_count(&self, tid: Tid) -> usize {
        if self.arena.lookup(tid).is_none() {
            return 0;
        }
        let slot = tid.slot();
        let platform = self.platform();

        let queued: usize = self
            .cpus
            .iter()
            .map(|cpu| cpu.run.lock(platform).occurrences(&self.arena, slot))
            .sum();
        queued + usize::from(self.reaper.dead_contains(platform, &self.arena, slot))
    }

    /// Confere todas as runqueues: bitmap × listas, encadeamento, estado
    /// READY no nível certo, atual/idle fora das filas e pertinência única.
    pub fn check_runqueues(&self) -> bool {
        for cpu in self.cpus.iter() {
            let rs = cpu.run.lock(self.platform());
            if !self.check_cpu(&rs) {
                crate::kerror!("(Sched) Runqueue inconsistente na CPU", cpu.id().as_u32());
                return false;
            }
        }

        for thread in self.arena.iter_live() {
            if self.membership_count(thread.tid()) > 1 {
                crate::kerror!("(Sched) Thread em mais de uma fila! TID=", thread.tid().as_u32());
                return false;
            }
        }
        true
    }

    fn check_cpu(&self, rs: &RunState) -> bool {
        if !rs.verify(&self.arena) {
            return false;
        }
        let not_queued = |slot: u16| rs.occurrences(&self.arena, slot) == 0;

        let current_ok = rs.current.as_ref().map_or(true, |h| not_queued(h.slot()));
        let idle_ok = rs.idle.as_ref().map_or(true, |h| not_queued(h.slot()));
        current_ok && idle_ok
    }

    /// Verificação pesada a cada enqueue/dequeue (feature `debug_sched`)
    #[cfg(feature = "debug_sched")]
    pub(crate) fn debug_verify(&self, rs: &RunState) {
        if !self.check_cpu(rs) {
            crate::kerror!("(Sched) debug_sched: runqueue corrompida");
            panic!("runqueue corrompida");
        }
    }

    /// Imprime o estado de todas as CPUs e da lista de mortos (nível TRACE)
    pub fn dump(&self) {
        crate::ktrace!("--- [TRACE] SCHEDULER: ESTADO COMPLETO ---");
        crate::ktrace!("  - nr_running=", self.nr_running());
        crate::ktrace!("  - threads vivas=", self.arena.live());

        let mut tids = [Tid::new(0); DUMP_LIMIT];
        for cpu in self.cpus.iter().filter(|c| c.is_online()) {
            crate::ktrace!("  - CPU", cpu.id().as_u32());
            crate::ktrace!("    total=", cpu.total());
            match cpu.current_tid() {
                Some(tid) => crate::ktrace!("    Running TID=", tid.as_u32()),
                None => crate::ktrace!("    Running: None"),
            }

            let n = {
                let rs = cpu.run.lock(self.platform());
                if let Some(idle) = rs.idle_tid {
                    crate::ktrace!("    Idle TID=", idle.as_u32());
                }
                rs.collect_tids(&self.arena, &mut tids)
            };
            crate::ktrace!("    READY count=", n);
            for tid in &tids[..n] {
                crate::ktrace!("    -> TID=", tid.as_u32());
            }
        }

        let n = self.reaper.dead_tids(self.platform(), &self.arena, &mut tids);
        crate::ktrace!("  - DEAD count=", self.pending_dead());
        for tid in &tids[..n] {
            crate::ktrace!("    -> TID=", tid.as_u32());
        }
        crate::ktrace!("  - Reaped=", self.reaped_total());
        crate::ktrace!("--- [TRACE] FIM DO DUMP ---");
    }
}
