//! Dispatcher e handler pós-switch
//!
//! ```text
//! reschedule (CPU X, IRQ off, lock da atual adquirido)
//!   ├─ lock runqueue
//!   ├─ política + destino da atual (fila / vaga idle / handoff.retired)
//!   ├─ escolhe a próxima (ou idle, quantum 0)
//!   ├─ handoff.prev = atual; próxima = RUNNING e current
//!   ├─ unlock runqueue
//!   ├─ arma ou cancela o timer
//!   ├─ switch_context (se a próxima é outra thread)
//!   └─ finish_switch ── roda na thread que ganhou a CPU:
//!        estaciona o handle (BLOCKED), solta o lock da anterior,
//!        entrega a morta ao reaper, restaura IRQ
//! ```
//!
//! Nada aqui aloca nem libera memória.

use super::policy::Placement;
use super::scheduler::Scheduler;
use crate::sched::task::{Thread, ThreadState};

/// Callback do timer de preempção: só sinaliza, não troca de thread
fn expire_quantum(thread: &Thread) {
    thread.set_quantum(0);
}

impl Scheduler {
    /// Dispatcher.
    ///
    /// Pré-condições: interrupções desabilitadas pelo chamador
    /// (`irq_state` é o estado de antes), lock da thread atual adquirido,
    /// lock de runqueue desta CPU livre.
    ///
    /// Quando retorna, a thread que chamou voltou a rodar (ou nunca saiu,
    /// se foi escolhida de novo).
    pub fn reschedule(&self, irq_state: bool) {
        let cpu = self.this_cpu();
        let arena = &self.arena;
        let mut rs = cpu.run.lock(self.platform());

        // 1-2: a thread atual não pode estar esperando escolha
        let Some(prev_handle) = rs.current.take() else {
            crate::kerror!("(Sched) reschedule sem thread atual! CPU=", cpu.id().as_u32());
            panic!("reschedule sem thread atual");
        };
        let prev = arena.get(&prev_handle);
        let prev_slot = prev_handle.slot();
        let prev_state = prev.state();

        if prev_state == ThreadState::Ready {
            crate::kerror!("(Sched) Thread atual está READY! TID=", prev.tid().as_u32());
            panic!("thread atual READY no reschedule");
        }

        // 3: gancho de prioridade (idle nunca passa pela política)
        let placement = if prev.is_idle() {
            Placement::Active
        } else {
            self.policy.adjust(prev)
        };

        // 4: destino da thread que sai
        match prev_state {
            ThreadState::Running => {
                if prev.is_idle() {
                    prev.set_state(ThreadState::Ready);
                    rs.idle = Some(prev_handle);
                } else {
                    prev.counters().account_switch(prev.quantum() != 0);
                    prev.set_state(ThreadState::Ready);
                    rs.enqueue(arena, prev_handle, placement);
                }
            }
            ThreadState::Blocked | ThreadState::Dead => {
                if prev.is_idle() {
                    crate::kerror!("(Sched) Idle thread saiu de RUNNING!");
                    panic!("idle thread bloqueada ou morta");
                }
                prev.counters().account_switch(true);
                cpu.dec_total();
                self.nr_running.dec();

                let mut handoff = cpu.handoff.lock(self.platform());
                if handoff.retired.is_some() {
                    crate::kerror!("(Sched) Handoff anterior não consumido! CPU=", cpu.id().as_u32());
                    panic!("handoff pendente no reschedule");
                }
                handoff.retired = Some(prev_handle);
            }
            ThreadState::Ready => unreachable!(),
        }

        // 5: próxima thread ou idle
        let next_handle = match rs.pick_next(arena) {
            Some(handle) => {
                arena.get(&handle).set_quantum(self.quantum);
                handle
            }
            None => match rs.idle.take() {
                Some(handle) => {
                    arena.get(&handle).set_quantum(0);
                    handle
                }
                None => {
                    crate::kerror!("(Sched) Nenhuma thread executável e sem idle! CPU=", cpu.id().as_u32());
                    panic!("sem thread executável");
                }
            },
        };

        // 6
        let next = arena.get(&next_handle);
        let next_slot = next_handle.slot();
        let next_tid = next.tid();
        let quantum = next.quantum();

        cpu.handoff.lock(self.platform()).prev = Some(prev_slot);
        next.set_state(ThreadState::Running);
        next.counters().account_dispatch();
        rs.current = Some(next_handle);
        cpu.set_current_tid(next_tid);

        #[cfg(feature = "debug_sched")]
        self.debug_verify(&rs);

        // 7
        drop(rs);

        // 8
        if quantum > 0 {
            cpu.timer.lock(self.platform()).arm(quantum, next_tid, expire_quantum);
            self.platform().arm_oneshot(cpu.id(), quantum);
        } else {
            cpu.timer.lock(self.platform()).cancel();
            self.platform().disarm(cpu.id());
        }

        // 9
        if next_slot != prev_slot {
            let prev = arena.slot(prev_slot);
            crate::ktrace!("(Sched) Switch para TID=", next_tid.as_u32());
            self.load_address_space(prev, next);

            // SAFETY: IRQ off, lock da anterior adquirido e solto só no
            // pós-switch; `next` saiu da runqueue e é a atual desta CPU.
            unsafe { self.platform().switch_context(next, Some(prev)) };
        }

        self.finish_switch(irq_state);
    }

    /// Troca de espaço de endereçamento quando a próxima thread é de outro
    /// processo. Threads de kernel herdam o espaço que estiver carregado.
    fn load_address_space(&self, prev: &Thread, next: &Thread) {
        let Some(next_proc) = next.process() else {
            return;
        };
        let same_process = prev
            .process()
            .is_some_and(|prev_proc| prev_proc.pid == next_proc.pid);

        if !same_process {
            crate::ktrace!("(Sched) Trocando espaço de endereçamento PID=", next_proc.pid.as_u32());
            self.platform().switch_address_space(next_proc.space);
        }
    }

    /// Handler pós-switch. Roda na thread que acabou de ganhar a CPU.
    pub fn finish_switch(&self, irq_state: bool) {
        let cpu = self.this_cpu();
        let (prev_slot, retired) = {
            let mut handoff = cpu.handoff.lock(self.platform());
            (handoff.prev.take(), handoff.retired.take())
        };

        match prev_slot {
            Some(slot) => {
                let prev = self.arena.slot(slot);
                let mut dead = None;

                if let Some(handle) = retired {
                    match prev.state() {
                        // Estaciona antes de soltar o lock: um waker que
                        // estava girando no lock já encontra o handle.
                        ThreadState::Blocked => *prev.parked.lock(self.platform()) = Some(handle),
                        ThreadState::Dead => dead = Some(handle),
                        state => {
                            crate::kerror!("(Sched) Handle aposentado em estado inválido:", state.as_u8());
                            panic!("handoff com estado inválido");
                        }
                    }
                }

                // SAFETY: adquirido por quem chamou o dispatcher na thread
                // anterior; a posse veio pelo handoff.
                unsafe { prev.lock.release() };

                if let Some(handle) = dead {
                    crate::ktrace!("(Sched) Thread morta para o reaper TID=", prev.tid().as_u32());
                    self.reaper.push_dead(self.platform(), &self.arena, handle);
                    self.reaper.pending().up(self);
                }
            }
            None if retired.is_some() => {
                crate::kerror!("(Sched) Handle aposentado sem thread anterior");
                panic!("handoff inconsistente");
            }
            // Primeira entrada na CPU (bootstrap)
            None => {}
        }

        self.platform().restore(irq_state);
    }
}
