//! Operações atômicas

use core::sync::atomic::{AtomicU64, Ordering};

/// Contador atômico
pub struct AtomicCounter(AtomicU64);

impl AtomicCounter {
    pub const fn new(value: u64) -> Self {
        Self(AtomicU64::new(value))
    }

    pub fn get(&self) -> u64 {
        self.0.load(Ordering::Acquire)
    }

    /// Incrementa e retorna o valor anterior
    pub fn inc(&self) -> u64 {
        self.0.fetch_add(1, Ordering::AcqRel)
    }

    /// Decrementa e retorna o valor anterior.
    ///
    /// Decrementar um contador zerado é violação de invariante (underflow
    /// de contabilidade) e entra em pânico.
    pub fn dec(&self) -> u64 {
        let prev = self.0.fetch_sub(1, Ordering::AcqRel);
        if prev == 0 {
            crate::kerror!("(Sync) AtomicCounter underflow");
            panic!("AtomicCounter underflow");
        }
        prev
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inc_dec_return_previous() {
        let c = AtomicCounter::new(1);
        assert_eq!(c.inc(), 1);
        assert_eq!(c.dec(), 2);
        assert_eq!(c.get(), 1);
    }

    #[test]
    #[should_panic(expected = "underflow")]
    fn dec_below_zero_is_fatal() {
        let c = AtomicCounter::new(0);
        c.dec();
    }
}
