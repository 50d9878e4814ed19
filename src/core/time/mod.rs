//! Tempo e Timers
//!
//! O scheduler só precisa de um timer one-shot por CPU; o relógio em si é
//! responsabilidade da plataforma.

pub mod timer;

pub use timer::{OneShotTimer, TimerCallback};
