/// Arquivo: core/time/timer.rs
///
/// Propósito: Timer one-shot usado para preempção por quantum.
///
/// Detalhes de Implementação:
/// - A contagem de tempo real é do hardware (`TimerOps::arm_oneshot`); este
///   objeto só guarda o "a quem avisar" quando a interrupção chegar.
/// - Sem alocação: o callback é um `fn` simples, não um closure em Box, para
///   poder ser armado com o lock da CPU adquirido.
/// - Rearmar substitui o disparo anterior. Um disparo que chega depois de
///   `cancel` é ignorado.
use crate::sys::types::Tid;

/// Callback chamado quando o timer dispara
pub type TimerCallback<T> = fn(&T);

/// Timer one-shot com dono
pub struct OneShotTimer<T: ?Sized> {
    /// Duração pedida no último `arm` (em ticks)
    ticks: u64,
    /// Thread que estava rodando quando o timer foi armado
    owner: Option<Tid>,
    callback: Option<TimerCallback<T>>,
    /// Quantas vezes disparou de verdade
    fired: u64,
}

impl<T: ?Sized> OneShotTimer<T> {
    pub const fn new() -> Self {
        Self {
            ticks: 0,
            owner: None,
            callback: None,
            fired: 0,
        }
    }

    /// Arma o timer para `owner`, substituindo qualquer disparo pendente
    pub fn arm(&mut self, ticks: u64, owner: Tid, callback: TimerCallback<T>) {
        self.ticks = ticks;
        self.owner = Some(owner);
        self.callback = Some(callback);
    }

    /// Desarma. Um disparo posterior vira no-op.
    pub fn cancel(&mut self) {
        self.owner = None;
        self.callback = None;
    }

    /// Consome o disparo: retorna dono e callback se estava armado
    pub fn fire(&mut self) -> Option<(Tid, TimerCallback<T>)> {
        let owner = self.owner.take()?;
        let callback = self.callback.take()?;
        self.fired += 1;
        Some((owner, callback))
    }

    pub fn is_armed(&self) -> bool {
        self.owner.is_some()
    }

    pub fn owner(&self) -> Option<Tid> {
        self.owner
    }

    pub fn duration(&self) -> u64 {
        self.ticks
    }

    pub fn fired_count(&self) -> u64 {
        self.fired
    }
}

impl<T: ?Sized> Default for OneShotTimer<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::sync::atomic::{AtomicU32, Ordering};

    fn bump(counter: &AtomicU32) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    #[test]
    fn fires_once() {
        let hits = AtomicU32::new(0);
        let mut t: OneShotTimer<AtomicU32> = OneShotTimer::new();
        t.arm(10, Tid::new(7), bump);
        assert!(t.is_armed());
        assert_eq!(t.duration(), 10);

        let (owner, cb) = t.fire().unwrap();
        assert_eq!(owner, Tid::new(7));
        cb(&hits);
        assert_eq!(hits.load(Ordering::Relaxed), 1);

        assert!(t.fire().is_none());
        assert_eq!(t.fired_count(), 1);
    }

    #[test]
    fn cancelled_timer_is_noop() {
        let mut t: OneShotTimer<AtomicU32> = OneShotTimer::new();
        t.arm(5, Tid::new(1), bump);
        t.cancel();
        assert!(!t.is_armed());
        assert!(t.fire().is_none());
        assert_eq!(t.fired_count(), 0);
    }

    #[test]
    fn rearm_replaces_owner() {
        let mut t: OneShotTimer<AtomicU32> = OneShotTimer::new();
        t.arm(5, Tid::new(1), bump);
        t.arm(8, Tid::new(2), bump);
        assert_eq!(t.owner(), Some(Tid::new(2)));
        assert_eq!(t.duration(), 8);
    }
}
