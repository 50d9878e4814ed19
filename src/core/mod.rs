//! Core Module
//!
//! Serviços básicos independentes de arquitetura usados pelo scheduler:
//! logging e timers.

pub mod logging;
pub mod time;
