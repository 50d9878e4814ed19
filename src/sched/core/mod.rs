//! Núcleo do scheduler: runqueues, estado por CPU, dispatcher, idle e
//! política de prioridade

pub mod cpu;
pub mod debug;
pub mod idle;
pub mod policy;
pub mod runqueue;
pub mod scheduler;
pub mod switch;

pub use cpu::{CpuSched, LoadBalancer, PreemptTimer, RunState};
pub use policy::{FeedbackPolicy, FixedPriority, Placement, PriorityPolicy};
pub use runqueue::RunQueue;
pub use scheduler::{SchedParams, Scheduler};
