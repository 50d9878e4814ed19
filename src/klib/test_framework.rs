//! Framework de testes do kernel
//!
//! Roda suites de auto-teste dentro do kernel (feature `self_test`), sem
//! depender de `std` nem do harness do cargo.

/// Resultado de teste
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TestResult {
    Passed,
    Failed,
    Skipped,
}

/// Um caso de teste
pub struct TestCase {
    pub name: &'static str,
    pub func: fn() -> TestResult,
}

impl TestCase {
    pub const fn new(name: &'static str, func: fn() -> TestResult) -> Self {
        Self { name, func }
    }
}

/// Totais de uma suite executada
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SuiteSummary {
    pub passed: usize,
    pub failed: usize,
    pub skipped: usize,
}

impl SuiteSummary {
    pub fn all_passed(&self) -> bool {
        self.failed == 0
    }
}

/// Executa suite de testes
pub fn run_test_suite(name: &str, tests: &[TestCase]) -> SuiteSummary {
    crate::kinfo!("=== Executando suite: "; name);

    let mut summary = SuiteSummary::default();

    for test in tests {
        match (test.func)() {
            TestResult::Passed => {
                crate::kinfo!("[PASS] "; test.name);
                summary.passed += 1;
            }
            TestResult::Failed => {
                crate::kerror!("[FAIL] "; test.name);
                summary.failed += 1;
            }
            TestResult::Skipped => {
                crate::kwarn!("[SKIP] "; test.name);
                summary.skipped += 1;
            }
        }
    }

    crate::kinfo!("Resultados: passed=", summary.passed);
    if summary.failed > 0 {
        crate::kerror!("Resultados: failed=", summary.failed);
    }
    summary
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ok() -> TestResult {
        TestResult::Passed
    }

    fn bad() -> TestResult {
        TestResult::Failed
    }

    fn skip() -> TestResult {
        TestResult::Skipped
    }

    #[test]
    fn suite_counts_each_outcome() {
        let suite = [
            TestCase::new("ok", ok),
            TestCase::new("ok2", ok),
            TestCase::new("bad", bad),
            TestCase::new("skip", skip),
        ];
        let summary = run_test_suite("mixed", &suite);
        assert_eq!(
            summary,
            SuiteSummary {
                passed: 2,
                failed: 1,
                skipped: 1
            }
        );
        assert!(!summary.all_passed());
    }
}
