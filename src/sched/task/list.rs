//! Lista intrusiva de threads
//!
//! Os links moram na própria [`Thread`]; a lista guarda só cabeça, cauda e
//! tamanho, todos como índices de slot da arena. Nenhuma operação aloca, o
//! que permite usar a lista com o lock da CPU adquirido.
//!
//! Inserir consome um [`ThreadHandle`] e remover devolve um. Como só existe
//! um handle por thread, uma thread nunca está em duas listas ao mesmo tempo.
//!
//! Os links são atômicos apenas para permitir `&Thread` compartilhado; quem
//! garante exclusão é o lock que protege a lista (runqueue da CPU ou lista
//! de mortos), por isso `Relaxed` basta.

use core::sync::atomic::{AtomicBool, AtomicU16, Ordering};

use super::arena::{ThreadArena, ThreadHandle};
use crate::sys::types::Tid;

/// Slot inválido (fim da lista)
pub const NIL: u16 = u16::MAX;

/// Link intrusivo embutido em cada thread
pub struct Link {
    prev: AtomicU16,
    next: AtomicU16,
    linked: AtomicBool,
}

impl Link {
    pub const fn new() -> Self {
        Self {
            prev: AtomicU16::new(NIL),
            next: AtomicU16::new(NIL),
            linked: AtomicBool::new(false),
        }
    }

    /// A thread está em alguma lista
    pub fn is_linked(&self) -> bool {
        self.linked.load(Ordering::Relaxed)
    }

    fn prev(&self) -> u16 {
        self.prev.load(Ordering::Relaxed)
    }

    fn next(&self) -> u16 {
        self.next.load(Ordering::Relaxed)
    }

    fn set_prev(&self, slot: u16) {
        self.prev.store(slot, Ordering::Relaxed);
    }

    fn set_next(&self, slot: u16) {
        self.next.store(slot, Ordering::Relaxed);
    }

    fn reset(&self) {
        self.set_prev(NIL);
        self.set_next(NIL);
        self.linked.store(false, Ordering::Relaxed);
    }
}

impl Default for Link {
    fn default() -> Self {
        Self::new()
    }
}

/// FIFO duplamente encadeada sobre slots da arena
pub struct TaskList {
    head: u16,
    tail: u16,
    len: usize,
}

impl TaskList {
    pub const fn new() -> Self {
        Self {
            head: NIL,
            tail: NIL,
            len: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Slot da cabeça (mais antigo), sem remover
    pub fn front(&self) -> Option<u16> {
        (self.head != NIL).then_some(self.head)
    }

    /// Adiciona no fim. O(1).
    pub fn push_back(&mut self, arena: &ThreadArena, handle: ThreadHandle) {
        let slot = handle.into_slot();
        let link = &arena.slot(slot).link;

        if link.is_linked() {
            crate::kerror!("(List) Thread já está em uma lista! slot=", slot);
            panic!("thread inserida em duas listas");
        }

        link.set_prev(self.tail);
        link.set_next(NIL);
        link.linked.store(true, Ordering::Relaxed);

        if self.tail == NIL {
            self.head = slot;
        } else {
            arena.slot(self.tail).link.set_next(slot);
        }
        self.tail = slot;
        self.len += 1;
    }

    /// Remove a cabeça. O(1).
    pub fn pop_front(&mut self, arena: &ThreadArena) -> Option<ThreadHandle> {
        let slot = self.front()?;
        Some(self.unlink(arena, slot))
    }

    /// Remove `slot` de qualquer posição. O(1).
    ///
    /// O chamador garante que `slot` está nesta lista; builds de debug
    /// conferem percorrendo a lista.
    pub fn unlink(&mut self, arena: &ThreadArena, slot: u16) -> ThreadHandle {
        #[cfg(debug_assertions)]
        if !self.contains(arena, slot) {
            crate::kerror!("(List) unlink de thread fora da lista! slot=", slot);
            panic!("thread não está nesta lista");
        }

        let link = &arena.slot(slot).link;
        let prev = link.prev();
        let next = link.next();

        if prev == NIL {
            self.head = next;
        } else {
            arena.slot(prev).link.set_next(next);
        }
        if next == NIL {
            self.tail = prev;
        } else {
            arena.slot(next).link.set_prev(prev);
        }

        link.reset();
        self.len -= 1;

        // A posse volta para quem removeu
        ThreadHandle::from_slot(slot)
    }

    /// Procura `slot` percorrendo a lista. O(n), só diagnóstico.
    pub fn contains(&self, arena: &ThreadArena, slot: u16) -> bool {
        self.slots(arena).any(|s| s == slot)
    }

    /// Itera os slots da cabeça para a cauda
    pub fn slots<'a>(&self, arena: &'a ThreadArena) -> Slots<'a> {
        Slots {
            arena,
            cursor: self.head,
            remaining: self.len,
        }
    }

    /// Copia os TIDs na ordem da fila; retorna quantos foram escritos
    pub fn collect_tids(&self, arena: &ThreadArena, out: &mut [Tid]) -> usize {
        let mut n = 0;
        for (dst, slot) in out.iter_mut().zip(self.slots(arena)) {
            *dst = arena.slot(slot).tid();
            n += 1;
        }
        n
    }

    /// Confere encadeamento e tamanho. Retorna `false` em qualquer
    /// inconsistência (links quebrados, ciclo, contagem errada).
    pub fn verify(&self, arena: &ThreadArena) -> bool {
        let mut prev = NIL;
        let mut cursor = self.head;
        let mut count = 0usize;

        while cursor != NIL {
            if count >= self.len || (cursor as usize) >= arena.capacity() {
                return false;
            }
            let link = &arena.slot(cursor).link;
            if !link.is_linked() || link.prev() != prev {
                return false;
            }
            prev = cursor;
            cursor = link.next();
            count += 1;
        }

        count == self.len && self.tail == prev
    }
}

impl Default for TaskList {
    fn default() -> Self {
        Self::new()
    }
}

/// Iterador de slots de uma [`TaskList`]
pub struct Slots<'a> {
    arena: &'a ThreadArena,
    cursor: u16,
    remaining: usize,
}

impl Iterator for Slots<'_> {
    type Item = u16;

    fn next(&mut self) -> Option<u16> {
        // `remaining` limita a travessia mesmo se os links estiverem corrompidos
        if self.cursor == NIL || self.remaining == 0 {
            return None;
        }
        let slot = self.cursor;
        self.cursor = self.arena.slot(slot).link.next();
        self.remaining -= 1;
        Some(slot)
    }
}
