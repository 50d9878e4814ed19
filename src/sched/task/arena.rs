//! Arena de threads
//!
//! Todas as threads moram num único vetor de capacidade fixa, alocado uma
//! vez na criação do scheduler. Nada no caminho do dispatcher aloca ou
//! libera memória de TCB; slots são reciclados pelo reaper.
//!
//! A posse de uma thread viva é representada por um [`ThreadHandle`]:
//! exatamente um por thread, não clonável. Quem segura o handle (uma
//! runqueue, o `current` de uma CPU, a vaga da idle, a vaga de bloqueio ou
//! a lista de mortos) é dono da presença da thread no escalonamento.

use alloc::boxed::Box;
use alloc::vec::Vec;

use spin::Mutex;

use super::entity::{KernelStack, Thread, ThreadFlags};
use super::state::ThreadState;
use crate::sys::types::{ProcessRef, Tid};
use crate::sys::{SchedError, SchedResult};

/// Token de posse de uma thread (não é `Clone` nem `Copy`)
#[derive(Debug, PartialEq, Eq)]
pub struct ThreadHandle {
    slot: u16,
}

impl ThreadHandle {
    /// Só a arena e as listas intrusivas fabricam handles
    pub(crate) fn from_slot(slot: u16) -> Self {
        Self { slot }
    }

    pub fn slot(&self) -> u16 {
        self.slot
    }

    pub(crate) fn into_slot(self) -> u16 {
        self.slot
    }
}

/// Parâmetros de uma thread nova
pub struct ThreadInit<'a> {
    pub name: &'a str,
    pub priority: u8,
    pub flags: ThreadFlags,
    pub process: Option<ProcessRef>,
    pub stack: KernelStack,
}

/// Arena de threads de capacidade fixa
pub struct ThreadArena {
    slots: Box<[Thread]>,
    /// Slots livres (pilha LIFO)
    free: Mutex<Vec<u16>>,
}

impl ThreadArena {
    /// Maior capacidade representável (u16::MAX é reservado para NIL)
    pub const MAX_CAPACITY: usize = u16::MAX as usize;

    pub fn new(capacity: usize) -> SchedResult<Self> {
        if capacity == 0 || capacity > Self::MAX_CAPACITY {
            return Err(SchedError::InvalidParameter);
        }

        let mut slots = Vec::new();
        slots
            .try_reserve_exact(capacity)
            .map_err(|_| SchedError::OutOfMemory)?;
        let mut free = Vec::new();
        free.try_reserve_exact(capacity)
            .map_err(|_| SchedError::OutOfMemory)?;

        for slot in 0..capacity as u16 {
            slots.push(Thread::vacant(slot));
        }
        // Ordem reversa: o primeiro pop devolve o slot 0
        for slot in (0..capacity as u16).rev() {
            free.push(slot);
        }

        Ok(Self {
            slots: slots.into_boxed_slice(),
            free: Mutex::new(free),
        })
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Slots ocupados
    pub fn live(&self) -> usize {
        self.capacity() - self.free.lock().len()
    }

    /// Reserva um slot e inicializa a thread (estado READY).
    ///
    /// A pilha já vem alocada: nada aqui pode falhar depois de o slot ser
    /// retirado da lista livre.
    pub fn claim(&self, init: ThreadInit<'_>) -> SchedResult<(ThreadHandle, &Thread)> {
        let slot = self.free.lock().pop().ok_or(SchedError::TooManyThreads)?;
        let thread = &self.slots[slot as usize];

        let generation = thread.tid().generation().wrapping_add(1);
        let tid = Tid::from_parts(generation, slot);
        thread.setup(
            tid,
            init.name,
            init.priority,
            init.flags,
            init.process,
            init.stack,
        );

        Ok((ThreadHandle::from_slot(slot), thread))
    }

    /// Libera o slot de uma thread morta. Consome o handle: liberar duas
    /// vezes não compila.
    ///
    /// Retorna a pilha para o chamador decidir onde dropá-la (o reaper
    /// dropa em contexto normal, com interrupções habilitadas).
    pub fn release(&self, handle: ThreadHandle) -> Option<KernelStack> {
        let thread = self.get(&handle);

        if thread.state() != ThreadState::Dead {
            crate::kerror!("(Arena) Liberando thread que não está DEAD! TID=", thread.tid().as_u32());
            panic!("liberação de thread viva");
        }
        if thread.is_linked() {
            crate::kerror!("(Arena) Liberando thread ainda enfileirada! TID=", thread.tid().as_u32());
            panic!("liberação de thread enfileirada");
        }

        let stack = thread.teardown();
        self.free.lock().push(handle.into_slot());
        stack
    }

    /// Thread de um handle (sempre válida)
    pub fn get(&self, handle: &ThreadHandle) -> &Thread {
        &self.slots[handle.slot as usize]
    }

    /// Thread de um slot, viva ou não (uso interno das listas)
    pub(crate) fn slot(&self, slot: u16) -> &Thread {
        &self.slots[slot as usize]
    }

    /// Resolve um TID. `None` se o slot está livre ou foi reutilizado.
    pub fn lookup(&self, tid: Tid) -> Option<&Thread> {
        let thread = self.slots.get(tid.slot() as usize)?;
        (thread.is_live() && thread.tid() == tid).then_some(thread)
    }

    /// Itera as threads vivas
    pub fn iter_live(&self) -> impl Iterator<Item = &Thread> {
        self.slots.iter().filter(|t| t.is_live())
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn init(name: &str) -> ThreadInit<'_> {
        ThreadInit {
            name,
            priority: crate::sched::config::PRIORITY_DEFAULT,
            flags: ThreadFlags::KERNEL,
            process: None,
            stack: KernelStack::allocate(256).unwrap(),
        }
    }

    /// Arena com `n` threads prontas
    pub(crate) fn arena_with(n: usize) -> (ThreadArena, std::vec::Vec<ThreadHandle>) {
        let arena = ThreadArena::new(16).unwrap();
        let handles = (0..n)
            .map(|_| arena.claim(init("t")).unwrap().0)
            .collect();
        (arena, handles)
    }

    #[test]
    fn claim_until_full() {
        let arena = ThreadArena::new(2).unwrap();
        let (a, _) = arena.claim(init("a")).unwrap();
        let (b, _) = arena.claim(init("b")).unwrap();
        assert_ne!(a.slot(), b.slot());
        assert_eq!(arena.live(), 2);
        assert_eq!(
            arena.claim(init("c")).err(),
            Some(SchedError::TooManyThreads)
        );
    }

    #[test]
    fn stale_tid_does_not_resolve_after_reuse() {
        let arena = ThreadArena::new(1).unwrap();
        let (h, t) = arena.claim(init("old")).unwrap();
        let old_tid = t.tid();
        assert!(arena.lookup(old_tid).is_some());

        t.set_state(ThreadState::Dead);
        assert!(arena.release(h).is_some());
        assert!(arena.lookup(old_tid).is_none());

        let (_h2, t2) = arena.claim(init("new")).unwrap();
        assert_eq!(t2.tid().slot(), old_tid.slot());
        assert_ne!(t2.tid(), old_tid);
        assert!(arena.lookup(old_tid).is_none());
        assert_eq!(arena.lookup(t2.tid()).unwrap().name().as_str(), "new");
    }

    #[test]
    #[should_panic(expected = "thread viva")]
    fn releasing_a_live_thread_is_fatal() {
        let arena = ThreadArena::new(1).unwrap();
        let (h, _) = arena.claim(init("live")).unwrap();
        arena.release(h);
    }

    #[test]
    fn invalid_capacity() {
        assert!(ThreadArena::new(0).is_err());
        assert!(ThreadArena::new(ThreadArena::MAX_CAPACITY + 1).is_err());
    }
}
