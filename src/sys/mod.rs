//! System Definitions.
//!
//! Identificadores e erros compartilhados entre o scheduler e o resto do kernel.

pub mod error;
pub mod types;

pub use error::{SchedError, SchedResult};
pub use types::{AddressSpace, CpuId, Pid, ProcessRef, Tid};
