//! Políticas de ajuste de prioridade
//!
//! O dispatcher consulta a política uma vez por reschedule, antes de
//! reenfileirar a thread que estava rodando (a idle nunca é consultada).
//! A política pode mexer na prioridade efetiva e escolher em qual fila do
//! par ativa/expirada a thread volta.

use crate::sched::config::PRIORITY_LOWEST;
use crate::sched::task::Thread;

/// Fila de destino de uma thread que continua RUNNING
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Placement {
    /// Volta para a fila ativa (concorre já na próxima escolha)
    Active,
    /// Vai para a fila expirada: espera as threads prontas de mesmo nível
    /// ou mais urgentes, nunca as menos urgentes
    Expired,
}

/// Gancho de envelhecimento/decaimento de prioridade.
///
/// Chamado com o lock da CPU adquirido e a thread fora de qualquer fila:
/// não pode alocar, bloquear nem chamar o scheduler.
pub trait PriorityPolicy: Sync {
    fn adjust(&self, thread: &Thread) -> Placement;

    fn name(&self) -> &'static str;
}

/// Prioridade fixa: não mexe em nada (padrão)
pub struct FixedPriority;

impl PriorityPolicy for FixedPriority {
    fn adjust(&self, _thread: &Thread) -> Placement {
        Placement::Active
    }

    fn name(&self) -> &'static str {
        "fixed"
    }
}

/// Feedback de um nível por vez.
///
/// - Quantum esgotado: cai um nível (até `PRIORITY_LOWEST`).
/// - Largou a CPU com quantum sobrando: sobe um nível em direção à
///   prioridade base.
///
/// A thread sempre volta para a fila ativa, no nível novo: quem cai de
/// nível continua à frente de qualquer thread menos urgente.
pub struct FeedbackPolicy;

impl PriorityPolicy for FeedbackPolicy {
    fn adjust(&self, thread: &Thread) -> Placement {
        let prio = thread.priority();

        if thread.quantum() == 0 {
            if prio < PRIORITY_LOWEST {
                thread.set_priority(prio + 1);
            }
        } else if prio > thread.base_priority() {
            thread.set_priority(prio - 1);
        }
        Placement::Active
    }

    fn name(&self) -> &'static str {
        "feedback"
    }
}

/// Política padrão do scheduler
pub static DEFAULT_POLICY: FixedPriority = FixedPriority;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sched::task::arena::tests::init;
    use crate::sched::task::{ThreadArena, ThreadInit};

    #[test]
    fn fixed_is_a_noop() {
        let arena = ThreadArena::new(1).unwrap();
        let (_h, t) = arena.claim(init("t")).unwrap();
        let before = t.priority();
        assert_eq!(FixedPriority.adjust(t), Placement::Active);
        assert_eq!(t.priority(), before);
    }

    #[test]
    fn feedback_demotes_on_exhausted_quantum() {
        let arena = ThreadArena::new(1).unwrap();
        let (_h, t) = arena
            .claim(ThreadInit {
                priority: 10,
                ..init("cpu-bound")
            })
            .unwrap();
        t.set_quantum(0);
        assert_eq!(FeedbackPolicy.adjust(t), Placement::Active);
        assert_eq!(t.priority(), 11);
    }

    #[test]
    fn feedback_never_goes_below_lowest() {
        let arena = ThreadArena::new(1).unwrap();
        let (_h, t) = arena
            .claim(ThreadInit {
                priority: PRIORITY_LOWEST,
                ..init("bottom")
            })
            .unwrap();
        t.set_quantum(0);
        FeedbackPolicy.adjust(t);
        assert_eq!(t.priority(), PRIORITY_LOWEST);
    }

    #[test]
    fn feedback_recovers_toward_base() {
        let arena = ThreadArena::new(1).unwrap();
        let (_h, t) = arena
            .claim(ThreadInit {
                priority: 10,
                ..init("io-bound")
            })
            .unwrap();
        t.set_priority(12);
        t.set_quantum(3);
        assert_eq!(FeedbackPolicy.adjust(t), Placement::Active);
        assert_eq!(t.priority(), 11);
        FeedbackPolicy.adjust(t);
        FeedbackPolicy.adjust(t);
        assert_eq!(t.priority(), 10);
    }
}
