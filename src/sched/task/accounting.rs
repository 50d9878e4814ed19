//! Contabilidade de Recursos (Accounting)
//!
//! Rastreia quantas vezes cada thread ganhou a CPU e por que a perdeu.
//! Os contadores são atômicos: o dispatcher atualiza com IRQ desabilitada e
//! qualquer contexto pode ler sem lock.

use core::sync::atomic::{AtomicU64, Ordering};

/// Estatísticas de escalonamento de uma thread (retrato)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Accounting {
    /// Quantas vezes o dispatcher escolheu esta thread
    pub dispatches: u64,

    /// Número de trocas de contexto voluntárias (ex: yield, esperar I/O)
    pub voluntary_switches: u64,

    /// Número de trocas de contexto involuntárias (quantum esgotado)
    pub involuntary_switches: u64,
}

/// Contadores vivos de uma thread
pub struct AccountingCounters {
    dispatches: AtomicU64,
    voluntary: AtomicU64,
    involuntary: AtomicU64,
}

impl AccountingCounters {
    pub const fn new() -> Self {
        Self {
            dispatches: AtomicU64::new(0),
            voluntary: AtomicU64::new(0),
            involuntary: AtomicU64::new(0),
        }
    }

    /// Registra que a thread ganhou a CPU
    pub fn account_dispatch(&self) {
        self.dispatches.fetch_add(1, Ordering::Relaxed);
    }

    /// Incrementa contadores de troca de contexto
    pub fn account_switch(&self, voluntary: bool) {
        if voluntary {
            self.voluntary.fetch_add(1, Ordering::Relaxed);
        } else {
            self.involuntary.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Zera (slot reaproveitado)
    pub fn reset(&self) {
        self.dispatches.store(0, Ordering::Relaxed);
        self.voluntary.store(0, Ordering::Relaxed);
        self.involuntary.store(0, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> Accounting {
        Accounting {
            dispatches: self.dispatches.load(Ordering::Relaxed),
            voluntary_switches: self.voluntary.load(Ordering::Relaxed),
            involuntary_switches: self.involuntary.load(Ordering::Relaxed),
        }
    }
}

impl Default for AccountingCounters {
    fn default() -> Self {
        Self::new()
    }
}
