//! Spinlock - bloqueio com busy-wait

use core::cell::UnsafeCell;
use core::ops::{Deref, DerefMut};
use core::sync::atomic::{AtomicBool, AtomicU32, Ordering};

use crate::arch::{CpuOps, IrqGuard};
use crate::sys::types::CpuId;

/// Spinlock - usa busy-wait, NÃO pode dormir
///
/// # Quando usar
///
/// - Seções críticas MUITO curtas
/// - Dentro de handlers de interrupção
/// - Quando não pode chamar o scheduler
///
/// # Interrupções
///
/// Este lock não mexe no estado de interrupções. Dado que o dispatcher
/// também toca (direto ou no pós-switch) fica num [`IrqSpinlock`].
pub struct Spinlock<T> {
    locked: AtomicBool,
    data: UnsafeCell<T>,
}

// SAFETY: Spinlock protege acesso com lock atômico
unsafe impl<T: Send> Send for Spinlock<T> {}
unsafe impl<T: Send> Sync for Spinlock<T> {}

impl<T> Spinlock<T> {
    /// Cria novo spinlock
    pub const fn new(data: T) -> Self {
        Self {
            locked: AtomicBool::new(false),
            data: UnsafeCell::new(data),
        }
    }

    /// Adquire o lock
    pub fn lock(&self) -> SpinlockGuard<'_, T> {
        while self
            .locked
            .compare_exchange_weak(false, true, Ordering::Acquire, Ordering::Relaxed)
            .is_err()
        {
            // Spin só em leitura para não martelar a linha de cache
            while self.locked.load(Ordering::Relaxed) {
                core::hint::spin_loop();
            }
        }

        SpinlockGuard { lock: self }
    }

    /// Tenta adquirir sem bloquear
    pub fn try_lock(&self) -> Option<SpinlockGuard<'_, T>> {
        if self
            .locked
            .compare_exchange(false, true, Ordering::Acquire, Ordering::Relaxed)
            .is_ok()
        {
            Some(SpinlockGuard { lock: self })
        } else {
            None
        }
    }

    /// Verifica se alguém detém o lock (apenas diagnóstico)
    pub fn is_locked(&self) -> bool {
        self.locked.load(Ordering::Relaxed)
    }
}

/// Guard do spinlock - libera ao sair do escopo
pub struct SpinlockGuard<'a, T> {
    lock: &'a Spinlock<T>,
}

impl<T> Deref for SpinlockGuard<'_, T> {
    type Target = T;

    fn deref(&self) -> &T {
        // SAFETY: Lock está adquirido
        unsafe { &*self.lock.data.get() }
    }
}

impl<T> DerefMut for SpinlockGuard<'_, T> {
    fn deref_mut(&mut self) -> &mut T {
        // SAFETY: Lock está adquirido
        unsafe { &mut *self.lock.data.get() }
    }
}

impl<T> Drop for SpinlockGuard<'_, T> {
    fn drop(&mut self) {
        self.lock.locked.store(false, Ordering::Release);
    }
}

/// Spinlock que só é adquirido com interrupções desabilitadas.
///
/// Para dados que o dispatcher ou o handler pós-switch também tocam. Se um
/// contexto de thread segurasse o lock com IRQ habilitada, o retorno da IRQ
/// do timer poderia reagendar na mesma CPU e o dispatcher giraria para
/// sempre num lock cujo dono não volta a rodar.
///
/// `lock` desabilita as interrupções antes de girar e as restaura depois de
/// soltar o lock. Chamado já com IRQ desabilitada, não muda nada.
pub struct IrqSpinlock<T> {
    inner: Spinlock<T>,
}

impl<T> IrqSpinlock<T> {
    pub const fn new(data: T) -> Self {
        Self {
            inner: Spinlock::new(data),
        }
    }

    /// Desabilita interrupções em `cpu` e adquire o lock
    pub fn lock<'a, C: CpuOps + ?Sized>(&'a self, cpu: &'a C) -> IrqSpinlockGuard<'a, T, C> {
        let irq = IrqGuard::new(cpu);
        let guard = self.inner.lock();
        IrqSpinlockGuard { guard, _irq: irq }
    }

    /// Apenas diagnóstico
    pub fn is_locked(&self) -> bool {
        self.inner.is_locked()
    }
}

/// Guard do [`IrqSpinlock`]. Solta o lock e só então restaura as
/// interrupções (campos caem na ordem de declaração).
pub struct IrqSpinlockGuard<'a, T, C: CpuOps + ?Sized> {
    guard: SpinlockGuard<'a, T>,
    _irq: IrqGuard<'a, C>,
}

impl<T, C: CpuOps + ?Sized> Deref for IrqSpinlockGuard<'_, T, C> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.guard
    }
}

impl<T, C: CpuOps + ?Sized> DerefMut for IrqSpinlockGuard<'_, T, C> {
    fn deref_mut(&mut self) -> &mut T {
        &mut self.guard
    }
}

/// Spinlock sem dados e sem guard.
///
/// Usado onde o lock atravessa uma troca de contexto: a thread que adquire
/// não é a que libera (o lock de thread é solto pelo handler pós-switch, já
/// na pilha da próxima thread). Um guard RAII não sobrevive a isso.
///
/// O dono registrado é a CPU, não a thread: quem solta no pós-switch roda
/// na mesma CPU que adquiriu.
pub struct RawSpinlock {
    locked: AtomicBool,
    owner: AtomicU32,
}

/// `owner` com o lock livre
const NO_OWNER: u32 = u32::MAX;

impl RawSpinlock {
    pub const fn new() -> Self {
        Self {
            locked: AtomicBool::new(false),
            owner: AtomicU32::new(NO_OWNER),
        }
    }

    /// Adquire o lock (busy-wait) em nome de `cpu`
    pub fn acquire(&self, cpu: CpuId) {
        while self
            .locked
            .compare_exchange_weak(false, true, Ordering::Acquire, Ordering::Relaxed)
            .is_err()
        {
            while self.locked.load(Ordering::Relaxed) {
                core::hint::spin_loop();
            }
        }
        self.owner.store(cpu.as_u32(), Ordering::Relaxed);
    }

    /// Tenta adquirir sem bloquear
    pub fn try_acquire(&self, cpu: CpuId) -> bool {
        let acquired = self
            .locked
            .compare_exchange(false, true, Ordering::Acquire, Ordering::Relaxed)
            .is_ok();
        if acquired {
            self.owner.store(cpu.as_u32(), Ordering::Relaxed);
        }
        acquired
    }

    /// Libera o lock.
    ///
    /// # Safety
    ///
    /// O chamador deve ter adquirido o lock, possivelmente em outro contexto
    /// de execução que entregou a posse para este (handoff do dispatcher).
    pub unsafe fn release(&self) {
        self.owner.store(NO_OWNER, Ordering::Relaxed);
        self.locked.store(false, Ordering::Release);
    }

    pub fn is_locked(&self) -> bool {
        self.locked.load(Ordering::Relaxed)
    }

    /// O lock está com `cpu`. Só é exato quando `cpu` é a CPU que pergunta:
    /// o dono só muda com o lock adquirido.
    pub fn is_held_by(&self, cpu: CpuId) -> bool {
        self.is_locked() && self.owner.load(Ordering::Relaxed) == cpu.as_u32()
    }
}

impl Default for RawSpinlock {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn guard_releases_on_drop() {
        let lock = Spinlock::new(5u32);
        {
            let mut g = lock.lock();
            *g += 1;
            assert!(lock.is_locked());
            assert!(lock.try_lock().is_none());
        }
        assert!(!lock.is_locked());
        assert_eq!(*lock.lock(), 6);
    }

    #[test]
    fn raw_lock_handoff() {
        let lock = RawSpinlock::new();
        lock.acquire(CpuId::BOOT);
        assert!(!lock.try_acquire(CpuId::new(1)));
        unsafe { lock.release() };
        assert!(lock.try_acquire(CpuId::new(1)));
        unsafe { lock.release() };
        assert!(!lock.is_locked());
    }

    #[test]
    fn raw_lock_knows_its_owner_cpu() {
        let lock = RawSpinlock::new();
        assert!(!lock.is_held_by(CpuId::BOOT));

        lock.acquire(CpuId::new(1));
        assert!(lock.is_held_by(CpuId::new(1)));
        assert!(!lock.is_held_by(CpuId::BOOT));

        unsafe { lock.release() };
        assert!(!lock.is_held_by(CpuId::new(1)));
    }

    struct FakeCpu(AtomicBool);

    impl CpuOps for FakeCpu {
        fn current_cpu(&self) -> CpuId {
            CpuId::BOOT
        }
        fn interrupts_enabled(&self) -> bool {
            self.0.load(Ordering::SeqCst)
        }
        fn disable_interrupts(&self) {
            self.0.store(false, Ordering::SeqCst);
        }
        fn enable_interrupts(&self) {
            self.0.store(true, Ordering::SeqCst);
        }
        fn idle_wait(&self) {}
    }

    #[test]
    fn irq_lock_masks_interrupts_while_held() {
        let cpu = FakeCpu(AtomicBool::new(true));
        let lock = IrqSpinlock::new(0u32);
        {
            let mut g = lock.lock(&cpu);
            *g += 1;
            assert!(lock.is_locked());
            assert!(!cpu.interrupts_enabled());
        }
        assert!(!lock.is_locked());
        assert!(cpu.interrupts_enabled());
        assert_eq!(*lock.lock(&cpu), 1);
    }

    #[test]
    fn irq_lock_keeps_interrupts_off_when_already_off() {
        let cpu = FakeCpu(AtomicBool::new(false));
        let lock = IrqSpinlock::new(());
        drop(lock.lock(&cpu));
        assert!(!cpu.interrupts_enabled());
    }

    #[test]
    fn contended_counter() {
        use std::sync::Arc;

        let lock = Arc::new(Spinlock::new(0u64));
        let workers: std::vec::Vec<_> = (0..4)
            .map(|_| {
                let lock = Arc::clone(&lock);
                std::thread::spawn(move || {
                    for _ in 0..10_000 {
                        *lock.lock() += 1;
                    }
                })
            })
            .collect();
        for w in workers {
            w.join().unwrap();
        }
        assert_eq!(*lock.lock(), 40_000);
    }
}
