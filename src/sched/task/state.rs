//! Estados de thread

/// Estado de uma thread
///
/// ```text
/// Ready ──dispatch──▶ Running ──yield/quantum──▶ Ready
///                        │
///                        ├──primitiva de espera──▶ Blocked ──unpark──▶ Ready
///                        └──exit──▶ Dead (terminal, vai para o reaper)
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ThreadState {
    /// Pronta para executar (em uma runqueue)
    Ready = 0,
    /// Executando em alguma CPU
    Running = 1,
    /// Bloqueada esperando algo
    Blocked = 2,
    /// Terminada, esperando o reaper
    Dead = 3,
}

impl ThreadState {
    pub const fn as_u8(self) -> u8 {
        self as u8
    }

    /// Converte o valor guardado no `AtomicU8` da thread.
    ///
    /// Qualquer valor fora do enum é corrupção do TCB.
    pub fn from_u8(raw: u8) -> Self {
        match raw {
            0 => Self::Ready,
            1 => Self::Running,
            2 => Self::Blocked,
            3 => Self::Dead,
            _ => {
                crate::kerror!("(Task) Estado de thread corrompido:", raw);
                panic!("estado de thread corrompido");
            }
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Ready => "READY",
            Self::Running => "RUNNING",
            Self::Blocked => "BLOCKED",
            Self::Dead => "DEAD",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn raw_roundtrip_covers_every_state() {
        for s in [
            ThreadState::Ready,
            ThreadState::Running,
            ThreadState::Blocked,
            ThreadState::Dead,
        ] {
            assert_eq!(ThreadState::from_u8(s.as_u8()), s);
        }
    }

    #[test]
    #[should_panic(expected = "corrompido")]
    fn unknown_raw_state_is_fatal() {
        ThreadState::from_u8(9);
    }
}
