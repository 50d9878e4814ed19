// =============================================================================
// KERNEL LOGGING SYSTEM - ZERO OVERHEAD
// =============================================================================
//
// Sistema de logging do scheduler com custo ZERO em release.
//
// ARQUITETURA:
// - Usa features do Cargo para compile-time filtering
// - Com feature "no_logs", TODOS os macros viram expressões vazias
// - SEM core::fmt - Evita geração de código SSE/AVX no caminho do dispatcher
// - SEM alocação - Apenas strings literais + um valor hex opcional
// - Escreve no `LogSink` registrado pelo kernel (normalmente a serial)
//
// NÍVEIS DE LOG (do mais crítico ao menos):
// - ERROR: Violações de invariante (seguidas de panic)
// - WARN:  Situações suspeitas mas recuperáveis
// - INFO:  Inicialização, criação de CPUs e threads de sistema
// - DEBUG: Spawn, reaping, wakeups
// - TRACE: Cada dispatch, enqueue e troca de contexto
//
// COMO USAR:
//   kinfo!("(Sched) Inicializando...");        // Apenas string
//   kdebug!("(Sched) Spawn TID=", tid);        // String + hex
//   kinfo!("(Sched) Thread: "; name);          // String + texto
//
// =============================================================================

use spin::Once;

/// Destino das mensagens de log (serial, framebuffer, buffer de teste...).
///
/// Deve ser seguro chamar de qualquer contexto, inclusive com interrupções
/// desabilitadas e com locks do scheduler adquiridos.
pub trait LogSink: Sync {
    fn write_str(&self, s: &str);
}

static SINK: Once<&'static dyn LogSink> = Once::new();

/// Registra o destino dos logs. Só a primeira chamada tem efeito.
///
/// Retorna `false` se já havia um sink registrado.
pub fn set_sink(sink: &'static dyn LogSink) -> bool {
    let mut installed = false;
    SINK.call_once(|| {
        installed = true;
        sink
    });
    installed
}

// =============================================================================
// PREFIXOS COM CORES ANSI
// =============================================================================

pub const P_ERROR: &str = "\x1b[1;31m[ERRO]\x1b[0m ";
pub const P_WARN: &str = "\x1b[1;33m[WARN]\x1b[0m ";
pub const P_INFO: &str = "\x1b[32m[INFO]\x1b[0m ";
pub const P_DEBUG: &str = "\x1b[36m[DEBG]\x1b[0m ";
pub const P_TRACE: &str = "\x1b[35m[TRAC]\x1b[0m ";

/// Emite uma linha: prefixo + mensagem.
pub fn log(prefix: &str, msg: &str) {
    if let Some(sink) = SINK.get() {
        sink.write_str(prefix);
        sink.write_str(msg);
        sink.write_str("\n");
    }
}

/// Emite uma linha: prefixo + mensagem + valor em hexadecimal.
pub fn log_hex(prefix: &str, msg: &str, val: u64) {
    if let Some(sink) = SINK.get() {
        let mut buf = [0u8; 18];
        sink.write_str(prefix);
        sink.write_str(msg);
        sink.write_str(format_hex(val, &mut buf));
        sink.write_str("\n");
    }
}

/// Emite uma linha: prefixo + mensagem + detalhe textual (ex: nome da thread).
pub fn log_str(prefix: &str, msg: &str, detail: &str) {
    if let Some(sink) = SINK.get() {
        sink.write_str(prefix);
        sink.write_str(msg);
        sink.write_str(detail);
        sink.write_str("\n");
    }
}

/// Formata `val` como `0x...` sem zeros à esquerda, sem core::fmt.
pub fn format_hex(val: u64, buf: &mut [u8; 18]) -> &str {
    const DIGITS: &[u8; 16] = b"0123456789abcdef";

    let nibbles = if val == 0 {
        1
    } else {
        (64 - val.leading_zeros() as usize + 3) / 4
    };

    buf[0] = b'0';
    buf[1] = b'x';
    for i in 0..nibbles {
        let shift = (nibbles - 1 - i) * 4;
        buf[2 + i] = DIGITS[((val >> shift) & 0xF) as usize];
    }

    // Só ASCII foi escrito
    core::str::from_utf8(&buf[..2 + nibbles]).unwrap_or("0x?")
}

// =============================================================================
// MACROS DE LOG - NÍVEL ERROR
// =============================================================================

#[cfg(not(feature = "no_logs"))]
#[macro_export]
macro_rules! kerror {
    ($msg:expr) => {
        $crate::core::logging::log($crate::core::logging::P_ERROR, $msg)
    };
    ($msg:expr, $val:expr) => {
        $crate::core::logging::log_hex($crate::core::logging::P_ERROR, $msg, $val as u64)
    };
    ($msg:expr; $detail:expr) => {
        $crate::core::logging::log_str($crate::core::logging::P_ERROR, $msg, $detail)
    };
}

#[cfg(feature = "no_logs")]
#[macro_export]
macro_rules! kerror {
    ($($t:tt)*) => {{}};
}

// =============================================================================
// MACROS DE LOG - NÍVEL WARN
// =============================================================================

#[cfg(not(feature = "no_logs"))]
#[macro_export]
macro_rules! kwarn {
    ($msg:expr) => {
        $crate::core::logging::log($crate::core::logging::P_WARN, $msg)
    };
    ($msg:expr, $val:expr) => {
        $crate::core::logging::log_hex($crate::core::logging::P_WARN, $msg, $val as u64)
    };
    ($msg:expr; $detail:expr) => {
        $crate::core::logging::log_str($crate::core::logging::P_WARN, $msg, $detail)
    };
}

#[cfg(feature = "no_logs")]
#[macro_export]
macro_rules! kwarn {
    ($($t:tt)*) => {{}};
}

// =============================================================================
// MACROS DE LOG - NÍVEL INFO
// =============================================================================

#[cfg(not(any(feature = "no_logs", feature = "log_error")))]
#[macro_export]
macro_rules! kinfo {
    ($msg:expr) => {
        $crate::core::logging::log($crate::core::logging::P_INFO, $msg)
    };
    ($msg:expr, $val:expr) => {
        $crate::core::logging::log_hex($crate::core::logging::P_INFO, $msg, $val as u64)
    };
    ($msg:expr; $detail:expr) => {
        $crate::core::logging::log_str($crate::core::logging::P_INFO, $msg, $detail)
    };
}

#[cfg(any(feature = "no_logs", feature = "log_error"))]
#[macro_export]
macro_rules! kinfo {
    ($($t:tt)*) => {{}};
}

// =============================================================================
// MACROS DE LOG - NÍVEL DEBUG
// =============================================================================

#[cfg(all(
    not(feature = "no_logs"),
    any(feature = "log_debug", feature = "log_trace")
))]
#[macro_export]
macro_rules! kdebug {
    ($msg:expr) => {
        $crate::core::logging::log($crate::core::logging::P_DEBUG, $msg)
    };
    ($msg:expr, $val:expr) => {
        $crate::core::logging::log_hex($crate::core::logging::P_DEBUG, $msg, $val as u64)
    };
    ($msg:expr; $detail:expr) => {
        $crate::core::logging::log_str($crate::core::logging::P_DEBUG, $msg, $detail)
    };
}

#[cfg(not(all(
    not(feature = "no_logs"),
    any(feature = "log_debug", feature = "log_trace")
)))]
#[macro_export]
macro_rules! kdebug {
    ($($t:tt)*) => {{}};
}

// =============================================================================
// MACROS DE LOG - NÍVEL TRACE
// =============================================================================

#[cfg(all(not(feature = "no_logs"), feature = "log_trace"))]
#[macro_export]
macro_rules! ktrace {
    ($msg:expr) => {
        $crate::core::logging::log($crate::core::logging::P_TRACE, $msg)
    };
    ($msg:expr, $val:expr) => {
        $crate::core::logging::log_hex($crate::core::logging::P_TRACE, $msg, $val as u64)
    };
    ($msg:expr; $detail:expr) => {
        $crate::core::logging::log_str($crate::core::logging::P_TRACE, $msg, $detail)
    };
}

#[cfg(not(all(not(feature = "no_logs"), feature = "log_trace")))]
#[macro_export]
macro_rules! ktrace {
    ($($t:tt)*) => {{}};
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hex_zero_has_one_digit() {
        let mut buf = [0u8; 18];
        assert_eq!(format_hex(0, &mut buf), "0x0");
    }

    #[test]
    fn hex_drops_leading_zeros() {
        let mut buf = [0u8; 18];
        assert_eq!(format_hex(0x1f, &mut buf), "0x1f");
        assert_eq!(format_hex(0x1000, &mut buf), "0x1000");
    }

    #[test]
    fn hex_full_width() {
        let mut buf = [0u8; 18];
        assert_eq!(format_hex(u64::MAX, &mut buf), "0xffffffffffffffff");
    }

    #[test]
    fn macros_without_sink_are_silent() {
        // Nenhum sink registrado neste binário de teste: não deve entrar em pânico.
        crate::kinfo!("(Log) sem sink");
        crate::ktrace!("(Log) valor=", 42);
    }
}
