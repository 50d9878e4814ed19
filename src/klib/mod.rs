//! Kernel Library (KLib).
//!
//! Utilitários agnósticos de hardware para uso interno do scheduler.

pub mod bitmap;
pub mod test_framework;

pub use bitmap::PriorityBitmap;
