//! Testes do Escalonador (Scheduler)
//!
//! Auto-testes executados dentro do kernel por `sched::init` (feature
//! `self_test`). Só exercitam estruturas puras (filas, balanceador,
//! timer); não trocam de contexto de verdade.

use crate::core::time::OneShotTimer;
use crate::klib::test_framework::{run_test_suite, SuiteSummary, TestCase, TestResult};
use crate::klib::PriorityBitmap;
use crate::sched::config::PRIORITY_DEFAULT;
use crate::sched::core::{LoadBalancer, RunQueue};
use crate::sched::task::{KernelStack, ThreadArena, ThreadFlags, ThreadHandle, ThreadInit, ThreadState};
use crate::sys::types::{CpuId, Tid};

const SCHED_TESTS: &[TestCase] = &[
    TestCase::new("runqueue_fifo_same_priority", test_fifo_same_priority),
    TestCase::new("runqueue_priority_dominance", test_priority_dominance),
    TestCase::new("bitmap_first_set", test_bitmap_first_set),
    TestCase::new("balancer_below_average", test_balancer_below_average),
    TestCase::new("balancer_fallback_current", test_balancer_fallback),
    TestCase::new("preempt_timer_cancel", test_timer_cancel),
    TestCase::new("arena_stale_tid", test_arena_stale_tid),
];

/// Executa todos os testes de scheduler
pub fn run_sched_tests() -> SuiteSummary {
    crate::kinfo!("╔════════════════════════════════════════╗");
    crate::kinfo!("║     🧪 TESTES DE SCHEDULER             ║");
    crate::kinfo!("╚════════════════════════════════════════╝");

    let summary = run_test_suite("sched", SCHED_TESTS);

    if summary.all_passed() {
        crate::kinfo!("║  ✅ SCHEDULER VALIDADO!                ║");
    } else {
        crate::kerror!("(Sched) Auto-testes falharam:", summary.failed);
    }
    summary
}

fn claim(arena: &ThreadArena, name: &str, priority: u8) -> Option<(ThreadHandle, Tid)> {
    let stack = KernelStack::allocate(256).ok()?;
    let (handle, thread) = arena
        .claim(ThreadInit {
            name,
            priority,
            flags: ThreadFlags::KERNEL,
            process: None,
            stack,
        })
        .ok()?;
    Some((handle, thread.tid()))
}

/// Libera tudo que o teste deixou na fila
fn drain(arena: &ThreadArena, rq: &mut RunQueue) {
    while let Some(handle) = rq.pop_highest(arena) {
        arena.get(&handle).set_state(ThreadState::Dead);
        arena.release(handle);
    }
}

fn test_fifo_same_priority() -> TestResult {
    let Ok(arena) = ThreadArena::new(4) else {
        return TestResult::Skipped;
    };
    let mut rq = RunQueue::new();
    let mut order = [Tid::new(0); 3];

    for (i, name) in ["A", "B", "C"].into_iter().enumerate() {
        let Some((handle, tid)) = claim(&arena, name, PRIORITY_DEFAULT) else {
            return TestResult::Skipped;
        };
        order[i] = tid;
        rq.enqueue(&arena, handle);
    }

    for expected in order {
        match rq.pick_highest(&arena) {
            Some(tid) if tid == expected => {
                let handle = rq.dequeue(&arena, tid);
                arena.get(&handle).set_state(ThreadState::Dead);
                arena.release(handle);
            }
            _ => {
                drain(&arena, &mut rq);
                return TestResult::Failed;
            }
        }
    }
    TestResult::Passed
}

fn test_priority_dominance() -> TestResult {
    let Ok(arena) = ThreadArena::new(4) else {
        return TestResult::Skipped;
    };
    let mut rq = RunQueue::new();

    let (Some((low, _)), Some((high, high_tid))) = (claim(&arena, "low", 30), claim(&arena, "high", 2))
    else {
        return TestResult::Skipped;
    };
    rq.enqueue(&arena, low);
    rq.enqueue(&arena, high);

    let ok = rq.pick_highest(&arena) == Some(high_tid);
    drain(&arena, &mut rq);
    if ok {
        TestResult::Passed
    } else {
        TestResult::Failed
    }
}

fn test_bitmap_first_set() -> TestResult {
    let mut bm = PriorityBitmap::new();
    bm.set(9);
    bm.set(4);
    if bm.first_set() != Some(4) {
        return TestResult::Failed;
    }
    bm.clear(4);
    if bm.first_set() == Some(9) {
        TestResult::Passed
    } else {
        TestResult::Failed
    }
}

fn test_balancer_below_average() -> TestResult {
    let loads = [
        (CpuId::new(0), 0),
        (CpuId::new(1), 0),
        (CpuId::new(2), 5),
        (CpuId::new(3), 5),
    ];
    let cpu = LoadBalancer::pick(&loads, CpuId::new(3));
    if cpu == CpuId::new(0) || cpu == CpuId::new(1) {
        TestResult::Passed
    } else {
        TestResult::Failed
    }
}

fn test_balancer_fallback() -> TestResult {
    let loads = [(CpuId::new(0), 2), (CpuId::new(1), 2)];
    if LoadBalancer::pick(&loads, CpuId::new(1)) == CpuId::new(1) {
        TestResult::Passed
    } else {
        TestResult::Failed
    }
}

fn test_timer_cancel() -> TestResult {
    fn noop(_: &u8) {}

    let mut timer: OneShotTimer<u8> = OneShotTimer::new();
    timer.arm(10, Tid::new(1), noop);
    timer.cancel();
    if timer.fire().is_none() {
        TestResult::Passed
    } else {
        TestResult::Failed
    }
}

fn test_arena_stale_tid() -> TestResult {
    let Ok(arena) = ThreadArena::new(1) else {
        return TestResult::Skipped;
    };
    let Some((handle, old)) = claim(&arena, "old", PRIORITY_DEFAULT) else {
        return TestResult::Skipped;
    };
    arena.get(&handle).set_state(ThreadState::Dead);
    arena.release(handle);

    let Some((_handle, new)) = claim(&arena, "new", PRIORITY_DEFAULT) else {
        return TestResult::Skipped;
    };
    if arena.lookup(old).is_none() && arena.lookup(new).is_some() {
        TestResult::Passed
    } else {
        TestResult::Failed
    }
}

#[cfg(test)]
mod tests {
    #[test]
    fn self_test_suite_passes_on_host() {
        let summary = super::run_sched_tests();
        assert_eq!(summary.failed, 0);
        assert_eq!(summary.skipped, 0);
    }
}
