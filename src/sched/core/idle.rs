//! Idle Thread - filler por CPU
//!
//! Cada CPU tem uma idle thread criada em `init_percpu`. Ela nunca entra
//! em runqueue: quando sai da CPU fica guardada na vaga `idle` do estado da
//! CPU e é escolhida sempre que as filas estão vazias, com quantum zero
//! (sem timer). Em vez de ser preemptada ela chama o dispatcher a cada
//! volta do seu loop.

use super::scheduler::Scheduler;

/// Entry point da idle thread
pub(crate) fn idle_entry(sched: &'static Scheduler, cpu: usize) {
    crate::kinfo!("(Idle) Idle thread iniciada na CPU", cpu);

    // A ThreadStart habilitou interrupções; o loop roda com elas desligadas
    // e `idle_wait` religa só durante o HLT.
    loop {
        sched.idle_step();
    }
}

impl Scheduler {
    /// Uma volta do loop da idle thread: dispatcher e depois espera.
    ///
    /// Só a idle thread da CPU pode chamar.
    pub fn idle_step(&self) {
        let platform = self.platform();
        platform.disable_interrupts();

        let me = self.current_thread();
        if !me.is_idle() {
            crate::kerror!("(Idle) idle_step fora da idle thread! TID=", me.tid().as_u32());
            panic!("idle_step chamado por thread comum");
        }

        me.lock.acquire(platform.current_cpu());
        self.reschedule(false);

        // Volta aqui quando as filas esvaziaram de novo
        platform.idle_wait();
    }
}
