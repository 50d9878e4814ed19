//! Troca de contexto (HAL).
//!
//! O scheduler decide *quem* roda; a plataforma sabe *como* salvar e
//! restaurar registradores. A convenção de `from`:
//!
//! - `from == None` ou `from == to`: inicialização, não salva nada (usado
//!   no bootstrap de cada CPU para entrar na idle thread).
//! - caso contrário: salva o estado da thread `from` no seu
//!   [`ThreadContext`](crate::sched::task::ThreadContext) e retoma `to`.
//!
//! Quando `from` volta a rodar, `switch_context` retorna para ela e o
//! dispatcher executa o handler pós-switch.

use crate::sched::task::{KernelStack, Thread};
use crate::sched::Scheduler;
use crate::sys::types::AddressSpace;

/// Função de entrada de uma thread de kernel
pub type ThreadEntry = fn(&'static Scheduler, usize);

/// Tudo que o trampolim de uma thread nova precisa para começar a rodar.
///
/// A plataforma grava isto na pilha inicial (ou em registradores
/// callee-saved) em [`ContextOps::init_context`] e, na primeira vez que a
/// thread é escalonada, chama [`ThreadStart::run`].
#[derive(Clone, Copy)]
pub struct ThreadStart {
    pub sched: &'static Scheduler,
    pub entry: ThreadEntry,
    pub arg: usize,
}

impl ThreadStart {
    /// Corpo do trampolim.
    ///
    /// Uma thread nova nunca passa pelo retorno de `switch_context`, então
    /// o handler pós-switch da troca que a colocou na CPU roda aqui.
    pub fn run(self) -> ! {
        self.sched.finish_switch(true);
        (self.entry)(self.sched, self.arg);
        self.sched.exit_current(0)
    }
}

pub trait ContextOps {
    /// Prepara a pilha de uma thread nova para que a primeira troca para
    /// ela execute `start.run()`. Retorna o stack pointer inicial.
    fn init_context(&self, stack: &mut KernelStack, start: ThreadStart) -> usize;

    /// Troca o fluxo de controle de `from` para `to`.
    ///
    /// # Safety
    ///
    /// - Interrupções desabilitadas na CPU atual
    /// - `to` tem contexto válido (inicializado por `init_context` ou salvo
    ///   por uma troca anterior) e não está rodando em outra CPU
    /// - O lock de `from` está adquirido; quem solta é o handler pós-switch
    unsafe fn switch_context(&self, to: &Thread, from: Option<&Thread>);

    /// Carrega a tabela de páginas de outro processo (CR3 no x86_64).
    fn switch_address_space(&self, space: AddressSpace);
}
