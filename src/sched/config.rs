//! Constantes de configuração do Scheduler

/// Número de níveis de prioridade por runqueue (0 = mais urgente)
pub const NR_PRIORITIES: usize = 32;

/// Prioridade padrão para threads de kernel
pub const PRIORITY_DEFAULT: u8 = 16;

/// Prioridade menos urgente
pub const PRIORITY_LOWEST: u8 = (NR_PRIORITIES - 1) as u8;

/// Prioridade da thread reaper (abaixo do trabalho normal)
pub const PRIORITY_REAPER: u8 = 24;

/// Quantum padrão (Timeslice) em ticks do timer
pub const DEFAULT_QUANTUM: u64 = 10;

/// Tamanho padrão da Stack de Kernel (em bytes)
pub const KERNEL_STACK_SIZE: usize = 65536; // 64KB

/// Stack da idle thread (não chama nada profundo)
pub const IDLE_STACK_SIZE: usize = 16 * 1024;

/// Máximo de CPUs lógicas suportadas
pub const MAX_CPUS: usize = 32;

/// Capacidade padrão da arena de threads
pub const MAX_THREADS: usize = 1024;

/// Tamanho do buffer de nome (bytes UTF-8)
pub const THREAD_NAME_LEN: usize = 32;

/// Verifica se `priority` é um nível válido
pub const fn is_valid_priority(priority: u8) -> bool {
    (priority as usize) < NR_PRIORITIES
}
