//! Thread Control Block
//!
//! Todos os campos têm mutabilidade interior: as threads vivem numa arena
//! compartilhada entre CPUs e são acessadas por `&Thread`. Quem pode mudar
//! o quê está documentado campo a campo.

use alloc::boxed::Box;
use alloc::vec::Vec;
use core::sync::atomic::{
    AtomicBool, AtomicI32, AtomicU32, AtomicU64, AtomicU8, AtomicUsize, Ordering,
};

use bitflags::bitflags;

use super::accounting::{Accounting, AccountingCounters};
use super::arena::ThreadHandle;
use super::list::Link;
use super::state::ThreadState;
use crate::sched::config::{PRIORITY_DEFAULT, THREAD_NAME_LEN};
use crate::arch::CpuOps;
use crate::sync::{IrqSpinlock, RawSpinlock, Spinlock};
use crate::sys::types::{AddressSpace, CpuId, Pid, ProcessRef, Tid};
use crate::sys::{SchedError, SchedResult};

bitflags! {
    /// Papéis especiais de uma thread
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct ThreadFlags: u8 {
        /// Idle thread de uma CPU: nunca entra em runqueue
        const IDLE = 1 << 0;
        /// Thread reaper
        const REAPER = 1 << 1;
        /// Thread de kernel (sem processo de usuário)
        const KERNEL = 1 << 2;
    }
}

/// Nome de thread com tamanho fixo (sem alocação)
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct ThreadName {
    buf: [u8; THREAD_NAME_LEN],
    len: u8,
}

impl ThreadName {
    pub const fn empty() -> Self {
        Self {
            buf: [0; THREAD_NAME_LEN],
            len: 0,
        }
    }

    /// Copia `name`, truncando em fronteira de caractere
    pub fn new(name: &str) -> Self {
        let mut len = name.len().min(THREAD_NAME_LEN);
        while !name.is_char_boundary(len) {
            len -= 1;
        }

        let mut buf = [0u8; THREAD_NAME_LEN];
        buf[..len].copy_from_slice(&name.as_bytes()[..len]);
        Self {
            buf,
            len: len as u8,
        }
    }

    pub fn as_str(&self) -> &str {
        core::str::from_utf8(&self.buf[..self.len as usize]).unwrap_or("?")
    }
}

impl core::fmt::Debug for ThreadName {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Pilha de kernel de uma thread
pub struct KernelStack {
    mem: Box<[u8]>,
}

impl KernelStack {
    /// Aloca `size` bytes zerados. Falha com `OutOfMemory` em vez de abortar.
    pub fn allocate(size: usize) -> SchedResult<Self> {
        if size < 64 {
            return Err(SchedError::InvalidParameter);
        }

        let mut mem: Vec<u8> = Vec::new();
        mem.try_reserve_exact(size)
            .map_err(|_| SchedError::OutOfMemory)?;
        mem.resize(size, 0);

        Ok(Self {
            mem: mem.into_boxed_slice(),
        })
    }

    pub fn size(&self) -> usize {
        self.mem.len()
    }

    /// Endereço mais baixo
    pub fn bottom(&self) -> usize {
        self.mem.as_ptr() as usize
    }

    /// Topo da pilha alinhado em 16 bytes (a pilha cresce para baixo)
    pub fn top(&self) -> usize {
        (self.bottom() + self.size()) & !0xF
    }

    /// Memória crua, para a plataforma montar o frame inicial
    pub fn as_mut_slice(&mut self) -> &mut [u8] {
        &mut self.mem
    }
}

/// Contexto salvo da thread.
///
/// Os registradores ficam na própria pilha; aqui só o stack pointer, que a
/// plataforma lê e escreve em `switch_context`.
pub struct ThreadContext {
    sp: AtomicUsize,
}

impl ThreadContext {
    pub const fn new() -> Self {
        Self {
            sp: AtomicUsize::new(0),
        }
    }

    pub fn sp(&self) -> usize {
        self.sp.load(Ordering::Acquire)
    }

    pub fn set_sp(&self, sp: usize) {
        self.sp.store(sp, Ordering::Release);
    }
}

impl Default for ThreadContext {
    fn default() -> Self {
        Self::new()
    }
}

/// Thread Control Block
pub struct Thread {
    /// ID (slot + geração); muda só quando o slot é reutilizado
    tid: AtomicU32,
    /// Slot ocupado por uma thread viva
    live: AtomicBool,
    /// Lock da thread. Protege `state` contra wakeups concorrentes e fica
    /// adquirido durante a troca de contexto (solto no pós-switch).
    pub(crate) lock: RawSpinlock,
    state: AtomicU8,
    /// Prioridade efetiva (0 = maior). Só muda fora de runqueue ou com o
    /// lock da CPU.
    priority: AtomicU8,
    /// Prioridade pedida pelo criador; a política volta para ela
    base_priority: AtomicU8,
    /// Ticks restantes do quantum; zero = pedido de reschedule
    quantum: AtomicU64,
    /// CPU escolhida pelo balanceador
    cpu: AtomicU32,
    flags: AtomicU8,
    exit_code: AtomicI32,
    name: Spinlock<ThreadName>,
    /// Processo dono. Só é escrito com o slot fora de uso (`setup` e
    /// `teardown`), então o dispatcher lê sem lock.
    has_process: AtomicBool,
    pid: AtomicU32,
    space: AtomicU64,
    stack: Spinlock<Option<KernelStack>>,
    pub context: ThreadContext,
    pub(crate) link: Link,
    /// Handle da thread enquanto BLOCKED (ninguém mais a possui)
    pub(crate) parked: IrqSpinlock<Option<ThreadHandle>>,
    accounting: AccountingCounters,
}

impl Thread {
    /// Slot vazio da arena
    pub(crate) fn vacant(slot: u16) -> Self {
        Self {
            tid: AtomicU32::new(Tid::from_parts(0, slot).as_u32()),
            live: AtomicBool::new(false),
            lock: RawSpinlock::new(),
            state: AtomicU8::new(ThreadState::Dead.as_u8()),
            priority: AtomicU8::new(PRIORITY_DEFAULT),
            base_priority: AtomicU8::new(PRIORITY_DEFAULT),
            quantum: AtomicU64::new(0),
            cpu: AtomicU32::new(0),
            flags: AtomicU8::new(0),
            exit_code: AtomicI32::new(0),
            name: Spinlock::new(ThreadName::empty()),
            has_process: AtomicBool::new(false),
            pid: AtomicU32::new(0),
            space: AtomicU64::new(0),
            stack: Spinlock::new(None),
            context: ThreadContext::new(),
            link: Link::new(),
            parked: IrqSpinlock::new(None),
            accounting: AccountingCounters::new(),
        }
    }

    /// Preenche um slot recém-reservado. A thread nasce READY, sem CPU.
    pub(crate) fn setup(
        &self,
        tid: Tid,
        name: &str,
        priority: u8,
        flags: ThreadFlags,
        process: Option<ProcessRef>,
        stack: KernelStack,
    ) {
        self.tid.store(tid.as_u32(), Ordering::Relaxed);
        self.state.store(ThreadState::Ready.as_u8(), Ordering::Relaxed);
        self.priority.store(priority, Ordering::Relaxed);
        self.base_priority.store(priority, Ordering::Relaxed);
        self.quantum.store(0, Ordering::Relaxed);
        self.cpu.store(0, Ordering::Relaxed);
        self.flags.store(flags.bits(), Ordering::Relaxed);
        self.exit_code.store(0, Ordering::Relaxed);
        *self.name.lock() = ThreadName::new(name);
        self.store_process(process);
        *self.stack.lock() = Some(stack);
        self.context.set_sp(0);
        self.accounting.reset();
        self.live.store(true, Ordering::Release);
    }

    /// Devolve os recursos do slot. A pilha é liberada aqui.
    pub(crate) fn teardown(&self) -> Option<KernelStack> {
        self.live.store(false, Ordering::Release);
        self.store_process(None);
        self.flags.store(0, Ordering::Relaxed);
        self.context.set_sp(0);
        self.stack.lock().take()
    }

    pub fn tid(&self) -> Tid {
        Tid::new(self.tid.load(Ordering::Relaxed))
    }

    pub fn is_live(&self) -> bool {
        self.live.load(Ordering::Acquire)
    }

    pub fn state(&self) -> ThreadState {
        ThreadState::from_u8(self.state.load(Ordering::Acquire))
    }

    pub(crate) fn set_state(&self, state: ThreadState) {
        self.state.store(state.as_u8(), Ordering::Release);
    }

    pub fn priority(&self) -> u8 {
        self.priority.load(Ordering::Relaxed)
    }

    pub(crate) fn set_priority(&self, priority: u8) {
        self.priority.store(priority, Ordering::Relaxed);
    }

    pub fn base_priority(&self) -> u8 {
        self.base_priority.load(Ordering::Relaxed)
    }

    pub(crate) fn set_base_priority(&self, priority: u8) {
        self.base_priority.store(priority, Ordering::Relaxed);
    }

    pub fn quantum(&self) -> u64 {
        self.quantum.load(Ordering::Acquire)
    }

    pub fn set_quantum(&self, ticks: u64) {
        self.quantum.store(ticks, Ordering::Release);
    }

    pub fn cpu(&self) -> CpuId {
        CpuId::new(self.cpu.load(Ordering::Relaxed))
    }

    pub(crate) fn set_cpu(&self, cpu: CpuId) {
        self.cpu.store(cpu.as_u32(), Ordering::Relaxed);
    }

    pub fn flags(&self) -> ThreadFlags {
        ThreadFlags::from_bits_truncate(self.flags.load(Ordering::Relaxed))
    }

    pub fn is_idle(&self) -> bool {
        self.flags().contains(ThreadFlags::IDLE)
    }

    pub fn exit_code(&self) -> i32 {
        self.exit_code.load(Ordering::Relaxed)
    }

    pub(crate) fn set_exit_code(&self, code: i32) {
        self.exit_code.store(code, Ordering::Relaxed);
    }

    pub fn name(&self) -> ThreadName {
        *self.name.lock()
    }

    pub fn process(&self) -> Option<ProcessRef> {
        if !self.has_process.load(Ordering::Acquire) {
            return None;
        }
        Some(ProcessRef::new(
            Pid::new(self.pid.load(Ordering::Relaxed)),
            AddressSpace::new(self.space.load(Ordering::Relaxed)),
        ))
    }

    fn store_process(&self, process: Option<ProcessRef>) {
        match process {
            Some(p) => {
                self.pid.store(p.pid.as_u32(), Ordering::Relaxed);
                self.space.store(p.space.as_u64(), Ordering::Relaxed);
                self.has_process.store(true, Ordering::Release);
            }
            None => self.has_process.store(false, Ordering::Release),
        }
    }

    pub fn has_stack(&self) -> bool {
        self.stack.lock().is_some()
    }

    pub fn accounting(&self) -> Accounting {
        self.accounting.snapshot()
    }

    pub(crate) fn counters(&self) -> &AccountingCounters {
        &self.accounting
    }

    /// Lock da thread está adquirido (diagnóstico)
    pub fn is_locked(&self) -> bool {
        self.lock.is_locked()
    }

    /// Thread está parada em uma primitiva de espera com o handle guardado
    pub fn is_parked<C: CpuOps + ?Sized>(&self, cpu: &C) -> bool {
        self.parked.lock(cpu).is_some()
    }

    /// Thread está em alguma lista (runqueue ou lista de mortos)
    pub fn is_linked(&self) -> bool {
        self.link.is_linked()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn name_truncates_at_char_boundary() {
        // 31 'a' + 'é' (2 bytes) = 33 bytes: 'é' não cabe inteiro
        let long = "aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaé";
        let name = ThreadName::new(long);
        assert_eq!(name.as_str().len(), 31);
        assert!(name.as_str().chars().all(|c| c == 'a'));
        assert_eq!(ThreadName::new("reaper").as_str(), "reaper");
    }

    #[test]
    fn stack_top_is_aligned_and_inside() {
        let stack = KernelStack::allocate(4096).unwrap();
        assert_eq!(stack.top() % 16, 0);
        assert!(stack.top() > stack.bottom());
        assert!(stack.top() <= stack.bottom() + stack.size());
    }

    #[test]
    fn tiny_stack_is_rejected() {
        assert_eq!(
            KernelStack::allocate(8).err(),
            Some(SchedError::InvalidParameter)
        );
    }

    #[test]
    fn setup_and_teardown() {
        let t = Thread::vacant(3);
        assert!(!t.is_live());
        let stack = KernelStack::allocate(1024).unwrap();
        t.setup(
            Tid::from_parts(1, 3),
            "worker",
            7,
            ThreadFlags::KERNEL,
            Some(ProcessRef::new(Pid::new(4), AddressSpace::new(0x8000))),
            stack,
        );
        assert!(t.is_live());
        let process = t.process().unwrap();
        assert_eq!(process.pid, Pid::new(4));
        assert_eq!(process.space, AddressSpace::new(0x8000));
        assert_eq!(t.state(), ThreadState::Ready);
        assert_eq!(t.priority(), 7);
        assert_eq!(t.base_priority(), 7);
        assert_eq!(t.name().as_str(), "worker");
        assert!(t.has_stack());

        let stack = t.teardown();
        assert!(stack.is_some());
        assert!(!t.is_live());
        assert!(!t.has_stack());
        assert!(t.process().is_none());
    }
}
