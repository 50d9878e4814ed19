//! Tipos de Erro do Subsistema de Escalonamento
//!
//! Só erros recuperáveis na fronteira da API chegam aqui. Violações de
//! invariante dentro do dispatcher não têm código de erro: são fatais.

/// Erros do scheduler
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedError {
    /// Sem memória para pilha de kernel ou estruturas per-CPU
    OutOfMemory,
    /// Arena de threads cheia
    TooManyThreads,
    /// Prioridade fora de [0, NR_PRIORITIES)
    InvalidPriority,
    /// CPU inexistente ou acima de MAX_CPUS
    InvalidCpu,
    /// CPU já inicializada (idle thread já existe)
    CpuAlreadyOnline,
    /// Thread inexistente ou já liberada
    NoSuchThread,
    /// Parâmetro de configuração inválido
    InvalidParameter,
    /// Scheduler ainda não foi inicializado
    NotInitialized,
}

impl SchedError {
    /// Retorna descrição legível do erro
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::OutOfMemory => "OOM: sem memória para estruturas do scheduler",
            Self::TooManyThreads => "Arena de threads cheia",
            Self::InvalidPriority => "Prioridade fora do intervalo",
            Self::InvalidCpu => "CPU inválida",
            Self::CpuAlreadyOnline => "CPU já inicializada",
            Self::NoSuchThread => "Thread inexistente",
            Self::InvalidParameter => "Parâmetro inválido",
            Self::NotInitialized => "Scheduler não inicializado",
        }
    }
}

impl core::fmt::Display for SchedError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Tipo Result específico para operações do scheduler
pub type SchedResult<T> = Result<T, SchedError>;
