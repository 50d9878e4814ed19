//! # Orquestrador de Agendamento (High-Level Scheduler)
//!
//! O objeto [`Scheduler`] junta a arena de threads, o estado de cada CPU, o
//! contador global de threads rodando, a política de prioridade e o reaper.
//! Não existe estado global mutável fora dele: o kernel cria um (em
//! `sched::init`) e todo o resto recebe `&Scheduler`.
//!
//! ## Mecanismos de Execução:
//! - **Cooperativo:** Threads cedem voluntariamente via `yield_now()` ou
//!   bloqueando numa primitiva de espera.
//! - **Preemptivo:** O timer one-shot zera o quantum da thread atual; o
//!   próximo `preempt_point()` (retorno de IRQ/syscall) faz o reschedule.
//!
//! ## Sequência de boot:
//! `Scheduler::new` → `init_percpu(cpu)` em cada CPU → `start_reaper()` →
//! `spawn(...)` das threads iniciais → `enter()` em cada CPU.

use alloc::boxed::Box;
use alloc::vec::Vec;

use super::cpu::{CpuSched, LoadBalancer};
use super::idle::idle_entry;
use super::policy::{Placement, PriorityPolicy, DEFAULT_POLICY};
use crate::arch::{IrqGuard, Platform, ThreadEntry, ThreadStart};
use crate::sched::config::{
    is_valid_priority, DEFAULT_QUANTUM, IDLE_STACK_SIZE, KERNEL_STACK_SIZE, MAX_CPUS, MAX_THREADS,
    PRIORITY_LOWEST,
};
use crate::sched::task::{
    KernelStack, Reaper, Thread, ThreadArena, ThreadFlags, ThreadInit, ThreadState,
};
use crate::sync::AtomicCounter;
use crate::sys::types::{CpuId, ProcessRef, Tid};
use crate::sys::{SchedError, SchedResult};

/// Parâmetros de criação do scheduler
#[derive(Clone, Copy)]
pub struct SchedParams {
    /// CPUs lógicas (1..=MAX_CPUS)
    pub nr_cpus: usize,
    /// Quantum entregue a cada dispatch, em ticks
    pub quantum: u64,
    /// Capacidade da arena (idle threads inclusas)
    pub max_threads: usize,
    /// Pilha das threads criadas por `spawn`
    pub stack_size: usize,
    pub policy: &'static dyn PriorityPolicy,
}

impl Default for SchedParams {
    fn default() -> Self {
        Self {
            nr_cpus: 1,
            quantum: DEFAULT_QUANTUM,
            max_threads: MAX_THREADS,
            stack_size: KERNEL_STACK_SIZE,
            policy: &DEFAULT_POLICY,
        }
    }
}

/// Scheduler do kernel
pub struct Scheduler {
    platform: &'static dyn Platform,
    pub(crate) arena: ThreadArena,
    pub(crate) cpus: Box<[CpuSched]>,
    /// Threads prontas + rodando em todas as CPUs (sem idles)
    pub(crate) nr_running: AtomicCounter,
    pub(crate) reaper: Reaper,
    pub(crate) policy: &'static dyn PriorityPolicy,
    pub(crate) quantum: u64,
    stack_size: usize,
}

impl Scheduler {
    pub fn new(platform: &'static dyn Platform, params: SchedParams) -> SchedResult<Self> {
        if params.nr_cpus == 0 || params.nr_cpus > MAX_CPUS {
            return Err(SchedError::InvalidCpu);
        }
        if params.quantum == 0 || params.max_threads <= params.nr_cpus || params.stack_size < 4096 {
            return Err(SchedError::InvalidParameter);
        }

        let arena = ThreadArena::new(params.max_threads)?;

        let mut cpus = Vec::new();
        cpus.try_reserve_exact(params.nr_cpus)
            .map_err(|_| SchedError::OutOfMemory)?;
        for id in 0..params.nr_cpus {
            cpus.push(CpuSched::new(CpuId::new(id as u32)));
        }

        crate::kinfo!("(Sched) Scheduler criado. CPUs=", params.nr_cpus);
        crate::kinfo!("(Sched) Política de prioridade: "; params.policy.name());

        Ok(Self {
            platform,
            arena,
            cpus: cpus.into_boxed_slice(),
            nr_running: AtomicCounter::new(0),
            reaper: Reaper::new(),
            policy: params.policy,
            quantum: params.quantum,
            stack_size: params.stack_size,
        })
    }

    pub fn platform(&self) -> &'static dyn Platform {
        self.platform
    }

    pub fn nr_cpus(&self) -> usize {
        self.cpus.len()
    }

    pub fn quantum(&self) -> u64 {
        self.quantum
    }

    pub fn policy_name(&self) -> &'static str {
        self.policy.name()
    }

    pub(crate) fn cpu(&self, cpu: CpuId) -> SchedResult<&CpuSched> {
        self.cpus.get(cpu.as_usize()).ok_or(SchedError::InvalidCpu)
    }

    /// Estado da CPU que está executando o chamador
    pub(crate) fn this_cpu(&self) -> &CpuSched {
        let id = self.platform.current_cpu();
        match self.cpus.get(id.as_usize()) {
            Some(cpu) => cpu,
            None => {
                crate::kerror!("(Sched) CPU desconhecida pela plataforma:", id.as_u32());
                panic!("CPU fora do scheduler");
            }
        }
    }

    /// Thread rodando na CPU atual
    pub fn current_thread(&self) -> &Thread {
        let cpu = self.this_cpu();
        let thread = cpu.current_tid().and_then(|tid| self.arena.lookup(tid));
        match thread {
            Some(t) => t,
            None => {
                crate::kerror!("(Sched) CPU sem thread atual:", cpu.id().as_u32());
                panic!("CPU sem thread atual");
            }
        }
    }

    // =========================================================================
    // INICIALIZAÇÃO
    // =========================================================================

    /// Cria a idle thread de `cpu` e a instala como thread atual (RUNNING).
    pub fn init_percpu(&'static self, cpu: CpuId) -> SchedResult<Tid> {
        let c = self.cpu(cpu)?;
        if c.is_online() {
            return Err(SchedError::CpuAlreadyOnline);
        }

        let mut stack = KernelStack::allocate(IDLE_STACK_SIZE)?;
        let start = ThreadStart {
            sched: self,
            entry: idle_entry,
            arg: cpu.as_usize(),
        };
        let sp = self.platform.init_context(&mut stack, start);

        let (handle, idle) = self.arena.claim(ThreadInit {
            name: "idle",
            priority: PRIORITY_LOWEST,
            flags: ThreadFlags::IDLE | ThreadFlags::KERNEL,
            process: None,
            stack,
        })?;
        let tid = idle.tid();
        idle.context.set_sp(sp);
        idle.set_cpu(cpu);
        idle.set_quantum(0);
        idle.set_state(ThreadState::Running);

        {
            let mut rs = c.run.lock(self.platform);
            rs.current = Some(handle);
            rs.idle_tid = Some(tid);
            c.set_current_tid(tid);
        }
        c.set_online();

        crate::kinfo!("(Sched) CPU online, idle TID=", tid.as_u32());
        Ok(tid)
    }

    /// Entra no scheduler nesta CPU: troca de bootstrap para a idle thread.
    ///
    /// Em hardware real não retorna; a idle thread passa a girar o
    /// dispatcher.
    pub fn enter(&self) {
        let cpu = self.this_cpu();
        let Some(idle) = cpu.current_tid().and_then(|tid| self.arena.lookup(tid)) else {
            crate::kerror!("(Sched) enter sem init_percpu na CPU", cpu.id().as_u32());
            panic!("enter sem idle thread");
        };

        self.platform.disable_interrupts();
        crate::kinfo!("(Sched) Entrando no scheduler na CPU", cpu.id().as_u32());

        // SAFETY: interrupções desabilitadas, contexto da idle montado por
        // init_context e ninguém mais a executa.
        unsafe { self.platform.switch_context(idle, None) };
    }

    // =========================================================================
    // CRIAÇÃO
    // =========================================================================

    /// Cria uma thread de kernel pronta para rodar.
    ///
    /// A pilha é alocada antes de reservar o slot, então uma falha não deixa
    /// nada pela metade. A CPU é escolhida pelo balanceador uma única vez.
    pub fn spawn(
        &'static self,
        name: &str,
        entry: ThreadEntry,
        arg: usize,
        priority: u8,
        process: Option<ProcessRef>,
    ) -> SchedResult<Tid> {
        let flags = if process.is_none() {
            ThreadFlags::KERNEL
        } else {
            ThreadFlags::empty()
        };
        self.spawn_flagged(name, entry, arg, priority, process, flags)
    }

    pub(crate) fn spawn_flagged(
        &'static self,
        name: &str,
        entry: ThreadEntry,
        arg: usize,
        priority: u8,
        process: Option<ProcessRef>,
        flags: ThreadFlags,
    ) -> SchedResult<Tid> {
        if !is_valid_priority(priority) {
            return Err(SchedError::InvalidPriority);
        }
        let target = self.select_cpu()?;

        let mut stack = KernelStack::allocate(self.stack_size)?;
        let sp = self
            .platform
            .init_context(&mut stack, ThreadStart { sched: self, entry, arg });

        let (handle, thread) = self.arena.claim(ThreadInit {
            name,
            priority,
            flags,
            process,
            stack,
        })?;
        let tid = thread.tid();
        thread.context.set_sp(sp);
        thread.set_cpu(target.id());

        {
            let mut rs = target.run.lock(self.platform);
            rs.enqueue(&self.arena, handle, Placement::Active);
            target.inc_total();
            self.nr_running.inc();
            #[cfg(feature = "debug_sched")]
            self.debug_verify(&rs);
        }

        crate::kdebug!("(Sched) Spawn TID=", tid.as_u32());
        crate::ktrace!("(Sched) Spawn nome: "; name);
        crate::ktrace!("(Balance) CPU escolhida=", target.id().as_u32());
        Ok(tid)
    }

    /// Balanceador sobre as CPUs online
    fn select_cpu(&self) -> SchedResult<&CpuSched> {
        let mut loads = [(CpuId::BOOT, 0usize); MAX_CPUS];
        let mut n = 0;
        for cpu in self.cpus.iter().filter(|c| c.is_online()) {
            loads[n] = (cpu.id(), cpu.total());
            n += 1;
        }
        if n == 0 {
            return Err(SchedError::NotInitialized);
        }

        let chosen = LoadBalancer::pick(&loads[..n], self.platform.current_cpu());
        self.cpu(chosen)
    }

    // =========================================================================
    // PONTOS DE RESCHEDULE
    // =========================================================================

    /// Cede a CPU voluntariamente
    pub fn yield_now(&self) {
        let irq_state = self.platform.save_and_disable();
        let me = self.current_thread();
        me.lock.acquire(self.platform.current_cpu());
        crate::ktrace!("(Sched) yield TID=", me.tid().as_u32());
        self.reschedule(irq_state);
    }

    /// O quantum da thread atual acabou (a idle nunca pede)
    pub fn need_resched(&self) -> bool {
        let cpu = self.this_cpu();
        cpu.current_tid()
            .and_then(|tid| self.arena.lookup(tid))
            .is_some_and(|t| !t.is_idle() && t.quantum() == 0)
    }

    /// Ponto de preempção (retorno de IRQ/syscall). Reagenda só se o
    /// quantum acabou; retorna se reagendou.
    pub fn preempt_point(&self) -> bool {
        if !self.need_resched() {
            return false;
        }
        crate::ktrace!("(Sched) Preempção por quantum");
        self.yield_now();
        true
    }

    /// Handler do timer one-shot (chamado pela IRQ do timer local).
    ///
    /// Só zera o quantum da dona do timer; a troca fica para o próximo
    /// ponto de preempção.
    pub fn timer_expired(&self) {
        let cpu = self.this_cpu();
        let fired = cpu.timer.lock(self.platform).fire();

        let Some((owner, callback)) = fired else {
            return;
        };
        if cpu.current_tid() != Some(owner) {
            crate::ktrace!("(Sched) Timer de thread que já saiu da CPU:", owner.as_u32());
            return;
        }
        if let Some(thread) = self.arena.lookup(owner) {
            callback(thread);
        }
    }

    /// Bloqueia a thread atual.
    ///
    /// Pré-condições: interrupções desabilitadas (`irq_state` é o estado
    /// anterior), lock da própria thread adquirido e a thread já registrada
    /// numa primitiva de espera que vai chamar [`unpark`](Self::unpark).
    pub fn block_current(&self, irq_state: bool) {
        let me = self.current_thread();
        if me.is_idle() {
            crate::kerror!("(Sched) Idle thread tentou bloquear");
            panic!("idle thread não pode bloquear");
        }
        if !me.lock.is_held_by(self.platform.current_cpu()) {
            crate::kerror!("(Sched) block_current sem o lock da thread TID=", me.tid().as_u32());
            panic!("block_current sem lock da thread");
        }

        me.set_state(ThreadState::Blocked);
        crate::ktrace!("(Sched) Bloqueando TID=", me.tid().as_u32());
        self.reschedule(irq_state);
    }

    /// Acorda uma thread BLOCKED, devolvendo-a à runqueue da CPU onde ela
    /// foi colocada (sem migração).
    ///
    /// Se a thread marcou BLOCKED mas ainda não saiu da CPU, o bloqueio é
    /// cancelado (volta a RUNNING) e o dispatcher trata como yield.
    /// Retorna `false` se a thread não existe ou não estava bloqueada.
    pub fn unpark(&self, tid: Tid) -> bool {
        let Some(thread) = self.arena.lookup(tid) else {
            return false;
        };

        let _irq = IrqGuard::new(self.platform);
        thread.lock.acquire(self.platform.current_cpu());

        // O slot pode ter sido reciclado entre o lookup e o lock
        let woke = if thread.is_live() && thread.tid() == tid && thread.state() == ThreadState::Blocked {
            let parked = thread.parked.lock(self.platform).take();
            match parked {
                Some(handle) => {
                    let cpu = &self.cpus[thread.cpu().as_usize()];
                    thread.set_state(ThreadState::Ready);
                    let mut rs = cpu.run.lock(self.platform);
                    rs.enqueue(&self.arena, handle, Placement::Active);
                    cpu.inc_total();
                    self.nr_running.inc();
                    #[cfg(feature = "debug_sched")]
                    self.debug_verify(&rs);
                }
                None => thread.set_state(ThreadState::Running),
            }
            crate::kdebug!("(Sched) Wakeup TID=", tid.as_u32());
            true
        } else {
            false
        };

        // SAFETY: adquirido acima neste mesmo contexto
        unsafe { thread.lock.release() };
        woke
    }

    /// Marca a thread atual como DEAD e sai da CPU.
    ///
    /// Em hardware real não retorna: a thread nunca mais é escolhida.
    pub fn retire_current(&self, exit_code: i32) {
        let irq_state = self.platform.save_and_disable();
        let me = self.current_thread();
        if me.is_idle() {
            crate::kerror!("(Sched) Idle thread tentou terminar");
            panic!("idle thread não pode terminar");
        }

        me.lock.acquire(self.platform.current_cpu());
        me.set_exit_code(exit_code);
        me.set_state(ThreadState::Dead);
        crate::kdebug!("(Sched) Exit TID=", me.tid().as_u32());
        self.reschedule(irq_state);
    }

    /// Termina a thread atual
    pub fn exit_current(&self, exit_code: i32) -> ! {
        self.retire_current(exit_code);
        crate::kerror!("(Sched) Thread DEAD voltou a executar!");
        panic!("thread morta voltou a executar");
    }

    /// Muda a prioridade (base e efetiva) de uma thread.
    ///
    /// Uma thread enfileirada é retirada e recolocada no novo nível, na
    /// mesma fila (ativa ou expirada) em que estava.
    pub fn set_priority(&self, tid: Tid, priority: u8) -> SchedResult<()> {
        if !is_valid_priority(priority) {
            return Err(SchedError::InvalidPriority);
        }
        let thread = self.arena.lookup(tid).ok_or(SchedError::NoSuchThread)?;
        if thread.is_idle() {
            return Err(SchedError::InvalidParameter);
        }

        let _irq = IrqGuard::new(self.platform);
        thread.lock.acquire(self.platform.current_cpu());

        let result = if thread.is_live() && thread.tid() == tid {
            let cpu = &self.cpus[thread.cpu().as_usize()];
            let mut rs = cpu.run.lock(self.platform);
            let queue = if thread.state() == ThreadState::Ready {
                rs.queue_of(&self.arena, tid)
            } else {
                None
            };

            match queue {
                Some(idx) => {
                    let handle = rs.queue_mut(idx).dequeue(&self.arena, tid);
                    thread.set_priority(priority);
                    thread.set_base_priority(priority);
                    rs.queue_mut(idx).enqueue(&self.arena, handle);
                }
                None => {
                    thread.set_priority(priority);
                    thread.set_base_priority(priority);
                }
            }
            Ok(())
        } else {
            Err(SchedError::NoSuchThread)
        };

        // SAFETY: adquirido acima neste mesmo contexto
        unsafe { thread.lock.release() };
        result
    }

    // =========================================================================
    // INTROSPECÇÃO
    // =========================================================================

    /// Resolve um TID
    pub fn thread(&self, tid: Tid) -> Option<&Thread> {
        self.arena.lookup(tid)
    }

    /// Thread atual de `cpu`
    pub fn current(&self, cpu: CpuId) -> Option<Tid> {
        self.cpu(cpu).ok()?.current_tid()
    }

    /// Idle thread de `cpu`
    pub fn idle_thread(&self, cpu: CpuId) -> Option<Tid> {
        let c = self.cpu(cpu).ok()?;
        let idle = c.run.lock(self.platform).idle_tid;
        idle
    }

    /// Threads prontas + rodando em `cpu` (sem a idle)
    pub fn cpu_load(&self, cpu: CpuId) -> Option<usize> {
        self.cpu(cpu).ok().map(CpuSched::total)
    }

    /// Threads prontas + rodando no sistema
    pub fn nr_running(&self) -> u64 {
        self.nr_running.get()
    }

    /// Threads vivas na arena (idles e mortas ainda não liberadas inclusas)
    pub fn live_threads(&self) -> usize {
        self.arena.live()
    }

    /// Copia os TIDs prontos de `cpu` em ordem de seleção; retorna quantos
    pub fn queued(&self, cpu: CpuId, out: &mut [Tid]) -> usize {
        let Ok(c) = self.cpu(cpu) else {
            return 0;
        };
        let n = c.run.lock(self.platform).collect_tids(&self.arena, out);
        n
    }
}
