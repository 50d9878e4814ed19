//! Plataforma mock para testes de host.
//!
//! Nada aqui troca de pilha: `switch_context` só registra o evento e
//! retorna, então o handler pós-switch roda logo em seguida, na mesma
//! pilha do teste. Do ponto de vista do scheduler é como se a thread
//! escolhida tivesse acabado de voltar de uma troca.

#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, AtomicU32, AtomicUsize, Ordering};
use std::sync::Mutex;

use forge_sched::arch::{ContextOps, CpuOps, ThreadStart, TimerOps};
use forge_sched::sched::config::MAX_CPUS;
use forge_sched::sched::task::{KernelStack, Thread};
use forge_sched::sys::{AddressSpace, CpuId, Tid};
use forge_sched::{SchedParams, Scheduler};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    Switch { to: Tid, from: Option<Tid> },
    AddressSpace(AddressSpace),
    Arm { cpu: CpuId, ticks: u64 },
    Disarm(CpuId),
    Idle(CpuId),
}

pub struct MockPlatform {
    cpu: AtomicU32,
    irq: [AtomicBool; MAX_CPUS],
    /// Quantas vezes uma CPU passou de IRQ habilitada para desabilitada
    masks: AtomicUsize,
    events: Mutex<Vec<Event>>,
}

impl MockPlatform {
    pub fn new() -> Self {
        Self {
            cpu: AtomicU32::new(0),
            irq: std::array::from_fn(|_| AtomicBool::new(true)),
            masks: AtomicUsize::new(0),
            events: Mutex::new(Vec::new()),
        }
    }

    /// Muda a CPU "executando" o teste
    pub fn set_cpu(&self, cpu: u32) {
        self.cpu.store(cpu, Ordering::SeqCst);
    }

    fn record(&self, event: Event) {
        self.events.lock().unwrap().push(event);
    }

    /// Devolve e limpa os eventos registrados
    pub fn take_events(&self) -> Vec<Event> {
        std::mem::take(&mut *self.events.lock().unwrap())
    }

    /// Só as trocas de contexto, como pares (para, de)
    pub fn take_switches(&self) -> Vec<(Tid, Option<Tid>)> {
        self.take_events()
            .into_iter()
            .filter_map(|e| match e {
                Event::Switch { to, from } => Some((to, from)),
                _ => None,
            })
            .collect()
    }

    pub fn irq_masks(&self) -> usize {
        self.masks.load(Ordering::SeqCst)
    }

    fn current(&self) -> usize {
        self.cpu.load(Ordering::SeqCst) as usize
    }
}

impl CpuOps for MockPlatform {
    fn current_cpu(&self) -> CpuId {
        CpuId::new(self.cpu.load(Ordering::SeqCst))
    }

    fn interrupts_enabled(&self) -> bool {
        self.irq[self.current()].load(Ordering::SeqCst)
    }

    fn disable_interrupts(&self) {
        if self.irq[self.current()].swap(false, Ordering::SeqCst) {
            self.masks.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn enable_interrupts(&self) {
        self.irq[self.current()].store(true, Ordering::SeqCst);
    }

    fn idle_wait(&self) {
        self.record(Event::Idle(self.current_cpu()));
    }
}

impl ContextOps for MockPlatform {
    fn init_context(&self, stack: &mut KernelStack, _start: ThreadStart) -> usize {
        stack.top()
    }

    unsafe fn switch_context(&self, to: &Thread, from: Option<&Thread>) {
        self.record(Event::Switch {
            to: to.tid(),
            from: from.map(Thread::tid),
        });
    }

    fn switch_address_space(&self, space: AddressSpace) {
        self.record(Event::AddressSpace(space));
    }
}

impl TimerOps for MockPlatform {
    fn arm_oneshot(&self, cpu: CpuId, ticks: u64) {
        self.record(Event::Arm { cpu, ticks });
    }

    fn disarm(&self, cpu: CpuId) {
        self.record(Event::Disarm(cpu));
    }
}

/// Entry que nunca roda no mock
pub fn noop_entry(_sched: &'static Scheduler, _arg: usize) {}

pub fn params(nr_cpus: usize) -> SchedParams {
    SchedParams {
        nr_cpus,
        quantum: 5,
        max_threads: 64,
        stack_size: 4096,
        ..SchedParams::default()
    }
}

/// Scheduler com todas as CPUs online e a CPU 0 selecionada
pub fn boot_with(params: SchedParams) -> (&'static MockPlatform, &'static Scheduler) {
    let platform: &'static MockPlatform = Box::leak(Box::new(MockPlatform::new()));
    let sched: &'static Scheduler =
        Box::leak(Box::new(Scheduler::new(platform, params).expect("scheduler")));

    for cpu in 0..params.nr_cpus as u32 {
        platform.set_cpu(cpu);
        sched.init_percpu(CpuId::new(cpu)).expect("init_percpu");
    }
    platform.set_cpu(0);
    platform.take_events();
    (platform, sched)
}

pub fn boot(nr_cpus: usize) -> (&'static MockPlatform, &'static Scheduler) {
    boot_with(params(nr_cpus))
}

pub fn spawn(sched: &'static Scheduler, name: &str, priority: u8) -> Tid {
    sched
        .spawn(name, noop_entry, 0, priority, None)
        .expect("spawn")
}

/// TIDs prontos da CPU em ordem de seleção
pub fn queued(sched: &Scheduler, cpu: u32) -> Vec<Tid> {
    let mut buf = [Tid::new(0); 64];
    let n = sched.queued(CpuId::new(cpu), &mut buf);
    buf[..n].to_vec()
}

pub fn idle_of(sched: &Scheduler, cpu: u32) -> Tid {
    sched.idle_thread(CpuId::new(cpu)).expect("idle thread")
}
