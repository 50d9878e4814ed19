//! Fila de threads prontas
//!
//! Um vetor de `NR_PRIORITIES` FIFOs intrusivas mais um bitmap de níveis
//! não vazios. `pick_highest` é um `trailing_zeros` no bitmap seguido de
//! uma leitura da cabeça do nível: O(1), sem percorrer níveis vazios.
//!
//! Nível 0 é o mais urgente. Dentro do nível, ordem de chegada (round-robin
//! entre threads de mesma prioridade).

use crate::klib::PriorityBitmap;
use crate::sched::config::NR_PRIORITIES;
use crate::sched::task::{TaskList, ThreadArena, ThreadHandle, ThreadState};
use crate::sys::types::Tid;

/// Runqueue de prioridades
pub struct RunQueue {
    bitmap: PriorityBitmap,
    levels: [TaskList; NR_PRIORITIES],
    nr: usize,
}

impl RunQueue {
    pub const fn new() -> Self {
        const EMPTY: TaskList = TaskList::new();
        Self {
            bitmap: PriorityBitmap::new(),
            levels: [EMPTY; NR_PRIORITIES],
            nr: 0,
        }
    }

    /// Enfileira no fim do nível `thread.priority`. Consome o handle.
    pub fn enqueue(&mut self, arena: &ThreadArena, handle: ThreadHandle) {
        let thread = arena.get(&handle);
        let prio = thread.priority() as usize;

        if prio >= NR_PRIORITIES {
            crate::kerror!("(RunQueue) Prioridade fora do intervalo:", prio);
            panic!("prioridade inválida no enqueue");
        }

        crate::ktrace!("(RunQueue) enqueue TID=", thread.tid().as_u32());
        self.levels[prio].push_back(arena, handle);
        self.bitmap.set(prio);
        self.nr += 1;
    }

    /// Remove `tid` do seu nível e devolve a posse.
    ///
    /// A thread precisa estar nesta fila; builds de debug conferem.
    pub fn dequeue(&mut self, arena: &ThreadArena, tid: Tid) -> ThreadHandle {
        let slot = tid.slot();
        let prio = arena.slot(slot).priority() as usize;

        #[cfg(debug_assertions)]
        if prio >= NR_PRIORITIES || !self.levels[prio].contains(arena, slot) {
            crate::kerror!("(RunQueue) dequeue de thread ausente! TID=", tid.as_u32());
            panic!("dequeue de thread fora da runqueue");
        }

        let handle = self.levels[prio].unlink(arena, slot);
        if self.levels[prio].is_empty() {
            self.bitmap.clear(prio);
        }
        self.nr -= 1;
        handle
    }

    /// Thread na cabeça do nível mais urgente, sem remover
    pub fn pick_highest(&self, arena: &ThreadArena) -> Option<Tid> {
        let prio = self.bitmap.first_set()?;
        let slot = self.levels[prio].front()?;
        Some(arena.slot(slot).tid())
    }

    /// `pick_highest` + `dequeue`
    pub fn pop_highest(&mut self, arena: &ThreadArena) -> Option<ThreadHandle> {
        let tid = self.pick_highest(arena)?;
        Some(self.dequeue(arena, tid))
    }

    pub fn len(&self) -> usize {
        self.nr
    }

    pub fn is_empty(&self) -> bool {
        self.nr == 0
    }

    /// Bitmap de níveis ocupados
    pub fn bitmap(&self) -> u32 {
        self.bitmap.bits()
    }

    /// A thread está enfileirada aqui (percorre o nível dela)
    pub fn contains(&self, arena: &ThreadArena, tid: Tid) -> bool {
        let prio = arena.slot(tid.slot()).priority() as usize;
        prio < NR_PRIORITIES && self.levels[prio].contains(arena, tid.slot())
    }

    /// Quantas vezes `slot` aparece em todos os níveis
    pub fn occurrences(&self, arena: &ThreadArena, slot: u16) -> usize {
        self.levels
            .iter()
            .map(|l| l.slots(arena).filter(|&s| s == slot).count())
            .sum()
    }

    /// Copia os TIDs em ordem de seleção (nível, depois FIFO)
    pub fn collect_tids(&self, arena: &ThreadArena, out: &mut [Tid]) -> usize {
        let mut n = 0;
        for level in &self.levels {
            if n == out.len() {
                break;
            }
            n += level.collect_tids(arena, &mut out[n..]);
        }
        n
    }

    /// Confere bitmap × listas, encadeamento, contagem e que toda thread
    /// enfileirada está READY no nível da sua prioridade.
    pub fn verify(&self, arena: &ThreadArena) -> bool {
        let mut total = 0;
        for (prio, level) in self.levels.iter().enumerate() {
            if level.is_empty() == self.bitmap.test(prio) || !level.verify(arena) {
                return false;
            }
            for slot in level.slots(arena) {
                let t = arena.slot(slot);
                if t.state() != ThreadState::Ready || t.priority() as usize != prio {
                    return false;
                }
            }
            total += level.len();
        }
        total == self.nr
    }
}

impl Default for RunQueue {
    fn default() -> Self {
        Self::new()
    }
}
