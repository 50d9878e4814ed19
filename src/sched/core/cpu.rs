//! Estado de escalonamento por CPU e balanceamento de carga

use core::sync::atomic::{AtomicBool, AtomicU32, AtomicUsize, Ordering};

use super::policy::Placement;
use super::runqueue::RunQueue;
use crate::core::time::OneShotTimer;
use crate::sched::task::{Thread, ThreadArena, ThreadHandle};
use crate::sync::IrqSpinlock;
use crate::sys::types::{CpuId, Tid};

/// Valor de `current_tid` quando a CPU ainda não tem thread
const NO_TID: u32 = u32::MAX;

/// Timer de preempção: dispara com a thread dona do quantum
pub type PreemptTimer = OneShotTimer<Thread>;

/// Tudo que o lock de runqueue da CPU protege
pub struct RunState {
    /// Par ativa/expirada; `active` indexa a ativa
    queues: [RunQueue; 2],
    active: usize,
    /// Thread rodando nesta CPU (a idle inclusive)
    pub(crate) current: Option<ThreadHandle>,
    /// Vaga da idle quando ela não está rodando
    pub(crate) idle: Option<ThreadHandle>,
    pub(crate) idle_tid: Option<Tid>,
}

impl RunState {
    const fn new() -> Self {
        Self {
            queues: [RunQueue::new(), RunQueue::new()],
            active: 0,
            current: None,
            idle: None,
            idle_tid: None,
        }
    }

    pub fn active(&self) -> &RunQueue {
        &self.queues[self.active]
    }

    pub fn expired(&self) -> &RunQueue {
        &self.queues[self.active ^ 1]
    }

    /// Enfileira na fila indicada pela política
    pub(crate) fn enqueue(&mut self, arena: &ThreadArena, handle: ThreadHandle, placement: Placement) {
        let idx = match placement {
            Placement::Active => self.active,
            Placement::Expired => self.active ^ 1,
        };
        self.queues[idx].enqueue(arena, handle);
    }

    /// Próxima thread pronta.
    ///
    /// As duas filas trocam de papel quando a expirada tem um nível mais
    /// urgente que o melhor da ativa (o que inclui a ativa vazia). A fila
    /// expirada só adia uma thread diante de outras de mesmo nível ou mais
    /// urgentes, nunca diante de uma menos urgente.
    pub(crate) fn pick_next(&mut self, arena: &ThreadArena) -> Option<ThreadHandle> {
        // Bitmap vazio dá 32: nunca ganha
        let active_best = self.queues[self.active].bitmap().trailing_zeros();
        let expired_best = self.queues[self.active ^ 1].bitmap().trailing_zeros();
        if expired_best < active_best {
            crate::ktrace!("(Sched) Rotação ativa/expirada, nível=", expired_best);
            self.active ^= 1;
        }
        self.queues[self.active].pop_highest(arena)
    }

    /// Índice da fila que contém `tid`, se alguma
    pub(crate) fn queue_of(&self, arena: &ThreadArena, tid: Tid) -> Option<usize> {
        (0..2).find(|&i| self.queues[i].contains(arena, tid))
    }

    pub(crate) fn queue_mut(&mut self, idx: usize) -> &mut RunQueue {
        &mut self.queues[idx]
    }

    /// Threads prontas nas duas filas
    pub fn queued(&self) -> usize {
        self.queues[0].len() + self.queues[1].len()
    }

    pub(crate) fn occurrences(&self, arena: &ThreadArena, slot: u16) -> usize {
        self.queues[0].occurrences(arena, slot) + self.queues[1].occurrences(arena, slot)
    }

    /// Ativa primeiro, depois expirada
    pub(crate) fn collect_tids(&self, arena: &ThreadArena, out: &mut [Tid]) -> usize {
        let n = self.active().collect_tids(arena, out);
        n + self.expired().collect_tids(arena, &mut out[n..])
    }

    pub(crate) fn verify(&self, arena: &ThreadArena) -> bool {
        self.queues[0].verify(arena) && self.queues[1].verify(arena)
    }
}

/// Passagem de bastão entre o dispatcher e o handler pós-switch.
///
/// O dispatcher grava aqui com o lock de runqueue adquirido; o pós-switch
/// (já na pilha da próxima thread) consome.
pub(crate) struct Handoff {
    /// Slot da thread que rodava antes da última troca (lock dela adquirido)
    pub(crate) prev: Option<u16>,
    /// Handle da thread anterior se ela saiu da CPU BLOCKED ou DEAD
    pub(crate) retired: Option<ThreadHandle>,
}

/// Estado de escalonamento de uma CPU
pub struct CpuSched {
    id: CpuId,
    pub(crate) run: IrqSpinlock<RunState>,
    /// Threads prontas + rodando nesta CPU (sem a idle). Só muda com `run`
    /// adquirido; o balanceador lê sem lock.
    total: AtomicUsize,
    pub(crate) timer: IrqSpinlock<PreemptTimer>,
    pub(crate) handoff: IrqSpinlock<Handoff>,
    online: AtomicBool,
    /// Espelho de `run.current` para leitura sem lock (IRQ do timer)
    current_tid: AtomicU32,
}

impl CpuSched {
    pub(crate) const fn new(id: CpuId) -> Self {
        Self {
            id,
            run: IrqSpinlock::new(RunState::new()),
            total: AtomicUsize::new(0),
            timer: IrqSpinlock::new(OneShotTimer::new()),
            handoff: IrqSpinlock::new(Handoff {
                prev: None,
                retired: None,
            }),
            online: AtomicBool::new(false),
            current_tid: AtomicU32::new(NO_TID),
        }
    }

    pub fn id(&self) -> CpuId {
        self.id
    }

    pub fn is_online(&self) -> bool {
        self.online.load(Ordering::Acquire)
    }

    pub(crate) fn set_online(&self) {
        self.online.store(true, Ordering::Release);
    }

    pub fn total(&self) -> usize {
        self.total.load(Ordering::Relaxed)
    }

    /// Chamador segura `run`
    pub(crate) fn inc_total(&self) {
        self.total.fetch_add(1, Ordering::Relaxed);
    }

    /// Chamador segura `run`
    pub(crate) fn dec_total(&self) {
        if self.total.fetch_sub(1, Ordering::Relaxed) == 0 {
            crate::kerror!("(Sched) total da CPU ficou negativo! CPU=", self.id.as_u32());
            panic!("contagem de threads da CPU negativa");
        }
    }

    pub fn current_tid(&self) -> Option<Tid> {
        match self.current_tid.load(Ordering::Acquire) {
            NO_TID => None,
            raw => Some(Tid::new(raw)),
        }
    }

    pub(crate) fn set_current_tid(&self, tid: Tid) {
        self.current_tid.store(tid.as_u32(), Ordering::Release);
    }
}

/// Escolha de CPU para threads novas
pub struct LoadBalancer;

impl LoadBalancer {
    /// Menos-carregada por média.
    ///
    /// - Uma CPU: ela mesma.
    /// - Várias: `média = (soma + 1) / n` (o +1 é a thread nova) e vence a
    ///   primeira CPU, em ordem de id, com `total < média`.
    /// - Nenhuma abaixo da média: fica na CPU `current` (se ela estiver na
    ///   lista; senão na primeira).
    pub fn pick(loads: &[(CpuId, usize)], current: CpuId) -> CpuId {
        let fallback = loads
            .iter()
            .find(|(cpu, _)| *cpu == current)
            .or_else(|| loads.first())
            .map_or(current, |(cpu, _)| *cpu);

        if loads.len() <= 1 {
            return fallback;
        }

        let sum: usize = loads.iter().map(|(_, total)| total).sum();
        let average = (sum + 1) / loads.len();

        match loads.iter().find(|(_, total)| *total < average) {
            Some((cpu, _)) => *cpu,
            None => {
                crate::ktrace!("(Balance) Nenhuma CPU abaixo da média, fica na atual");
                fallback
            }
        }
    }
}
