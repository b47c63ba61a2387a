//! Benchmark loop and result checks.
//!
//! The runner only knows how to call an execution closure repeatedly and how
//! to judge what it returns. Building the EVM is left to the subcommands.

use clap::ValueEnum;
use microbench::Options;
use revm::{context_interface::result::ExecutionResult, primitives::Bytes};
use std::{
    fmt,
    hint::black_box,
    time::{Duration, Instant},
};
use thiserror::Error;

/// Message of a failed call that ended in `REVERT`.
pub const EXECUTION_REVERTED: &str = "execution reverted";

/// Outcome a benchmark requires from every execution.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum Expectation {
    /// Every call must succeed.
    #[default]
    Success,
    /// Every call must revert.
    Revert,
    /// Outcome is not checked.
    Any,
}

/// Why an execution did not succeed.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum ExecutionFailure {
    /// Call ended with `REVERT`.
    #[error("execution reverted")]
    Reverted {
        /// Revert data.
        output: Bytes,
    },
    /// Call halted exceptionally.
    #[error("execution halted: {reason}")]
    Halted {
        /// Halt reason reported by the engine.
        reason: String,
    },
}

/// Result of one execution, as far as the runner cares.
pub trait Outcome {
    /// Failure carried by the result, `None` if it succeeded.
    fn failure(&self) -> Option<ExecutionFailure>;
}

impl Outcome for ExecutionResult {
    fn failure(&self) -> Option<ExecutionFailure> {
        match self {
            ExecutionResult::Success { .. } => None,
            ExecutionResult::Revert { output, .. } => Some(ExecutionFailure::Reverted {
                output: output.clone(),
            }),
            ExecutionResult::Halt { reason, .. } => Some(ExecutionFailure::Halted {
                reason: format!("{reason:?}"),
            }),
        }
    }
}

/// Execution outcome that doesn't match the [`Expectation`].
#[derive(Debug, Error)]
pub enum Mismatch {
    /// Success was expected.
    #[error("expected success but got error: {0}")]
    UnexpectedFailure(ExecutionFailure),
    /// A revert was expected, the call succeeded.
    #[error("expected revert but transaction succeeded")]
    UnexpectedSuccess,
    /// A revert was expected, the call failed some other way.
    #[error("expected error message 'execution reverted' but got: {0}")]
    WrongFailure(ExecutionFailure),
}

impl Expectation {
    /// Checks a single execution result.
    ///
    /// A revert expectation is met only when the failure message is exactly
    /// [`EXECUTION_REVERTED`].
    pub fn check<O: Outcome + ?Sized>(self, outcome: &O) -> Result<(), Mismatch> {
        match (self, outcome.failure()) {
            (Self::Any, _) | (Self::Success, None) => Ok(()),
            (Self::Success, Some(failure)) => Err(Mismatch::UnexpectedFailure(failure)),
            (Self::Revert, None) => Err(Mismatch::UnexpectedSuccess),
            (Self::Revert, Some(failure)) if failure.to_string() == EXECUTION_REVERTED => Ok(()),
            (Self::Revert, Some(failure)) => Err(Mismatch::WrongFailure(failure)),
        }
    }
}

/// Errors that abort a benchmark.
#[derive(Debug, Error)]
pub enum BenchError {
    /// The EVM rejected the transaction or its database failed.
    #[error("{name}: iteration {iteration}: EVM error: {message}")]
    Evm {
        /// Benchmark name.
        name: String,
        /// Zero based iteration that failed.
        iteration: u64,
        /// Rendered EVM error.
        message: String,
    },
    /// The execution outcome doesn't match the expectation.
    #[error("{name}: iteration {iteration}: {source}")]
    Mismatch {
        /// Benchmark name.
        name: String,
        /// Zero based iteration that failed.
        iteration: u64,
        /// What went wrong.
        source: Mismatch,
    },
    /// Output differs from the one recorded in the fixture.
    #[error("{name}: unexpected output: got {got}, expected {expected}")]
    OutputMismatch {
        /// Benchmark name.
        name: String,
        /// Output returned by the call.
        got: Bytes,
        /// Output recorded in the fixture.
        expected: Bytes,
    },
}

/// Timing of a fixed iteration benchmark.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BenchReport {
    /// Benchmark name.
    pub name: String,
    /// Number of executions.
    pub iterations: u64,
    /// Wall clock time of all executions.
    pub elapsed: Duration,
}

impl BenchReport {
    /// Average time of one execution.
    pub fn average(&self) -> Duration {
        if self.iterations == 0 {
            return Duration::ZERO;
        }
        let nanos = self.elapsed.as_nanos() / u128::from(self.iterations);
        Duration::from_nanos(u64::try_from(nanos).unwrap_or(u64::MAX))
    }
}

impl fmt::Display for BenchReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Ran {} iterations of {} in {:?}",
            self.iterations, self.name, self.elapsed
        )?;
        write!(f, "Average time per iteration: {:?}", self.average())
    }
}

/// Calls `exec` `iterations` times and checks every result.
///
/// Stops at the first EVM error or expectation mismatch.
pub fn run_iterations<F, O, E>(
    name: &str,
    iterations: u64,
    expectation: Expectation,
    mut exec: F,
) -> Result<BenchReport, BenchError>
where
    F: FnMut() -> Result<O, E>,
    O: Outcome,
    E: fmt::Display,
{
    let timer = Instant::now();
    for iteration in 0..iterations {
        let result = black_box(exec()).map_err(|e| BenchError::Evm {
            name: name.to_string(),
            iteration,
            message: e.to_string(),
        })?;
        expectation
            .check(&result)
            .map_err(|source| BenchError::Mismatch {
                name: name.to_string(),
                iteration,
                source,
            })?;
    }
    let elapsed = timer.elapsed();

    Ok(BenchReport {
        name: name.to_string(),
        iterations,
        elapsed,
    })
}

/// Runs `exec` under `microbench` for roughly `duration`.
///
/// One checked execution runs first so a broken setup fails before the
/// measurement. Failures during the measurement are reported after it ends.
pub fn run_for_duration<F, O, E>(
    name: &str,
    duration: Duration,
    expectation: Expectation,
    mut exec: F,
) -> Result<(), BenchError>
where
    F: FnMut() -> Result<O, E>,
    O: Outcome,
    E: fmt::Display,
{
    let checked = |iteration: u64, result: Result<O, E>| {
        let result = result.map_err(|e| BenchError::Evm {
            name: name.to_string(),
            iteration,
            message: e.to_string(),
        })?;
        expectation
            .check(&result)
            .map_err(|source| BenchError::Mismatch {
                name: name.to_string(),
                iteration,
                source,
            })
    };
    checked(0, exec())?;

    let mut iteration = 0;
    let mut failure = None;
    let options = Options::default().time(duration);
    microbench::bench(&options, name, || {
        iteration += 1;
        let result = black_box(exec());
        if failure.is_none() {
            failure = checked(iteration, result).err();
        }
    });

    failure.map_or(Ok(()), Err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use revm::context_interface::result::{HaltReason, Output, SuccessReason};
    use rstest::rstest;

    fn success() -> ExecutionResult {
        ExecutionResult::Success {
            reason: SuccessReason::Return,
            gas_used: 21_000,
            gas_refunded: 0,
            logs: Vec::new(),
            output: Output::Call(Bytes::new()),
        }
    }

    fn revert() -> ExecutionResult {
        ExecutionResult::Revert {
            gas_used: 22_000,
            output: Bytes::from_static(b"n is too large"),
        }
    }

    fn halt() -> ExecutionResult {
        ExecutionResult::Halt {
            reason: HaltReason::InvalidFEOpcode,
            gas_used: 1_000_000,
        }
    }

    #[test]
    fn revert_message_is_literal() {
        let failure = revert().failure().unwrap();
        assert_eq!(failure.to_string(), EXECUTION_REVERTED);

        let failure = halt().failure().unwrap();
        assert_eq!(failure.to_string(), "execution halted: InvalidFEOpcode");
        assert!(success().failure().is_none());
    }

    #[rstest]
    #[case(Expectation::Success, success(), true)]
    #[case(Expectation::Success, revert(), false)]
    #[case(Expectation::Success, halt(), false)]
    #[case(Expectation::Revert, revert(), true)]
    #[case(Expectation::Revert, success(), false)]
    #[case(Expectation::Revert, halt(), false)]
    #[case(Expectation::Any, success(), true)]
    #[case(Expectation::Any, revert(), true)]
    #[case(Expectation::Any, halt(), true)]
    fn expectation_check(
        #[case] expectation: Expectation,
        #[case] result: ExecutionResult,
        #[case] ok: bool,
    ) {
        assert_eq!(expectation.check(&result).is_ok(), ok);
    }

    #[test]
    fn revert_expectation_reports_success() {
        assert!(matches!(
            Expectation::Revert.check(&success()),
            Err(Mismatch::UnexpectedSuccess)
        ));
        assert!(matches!(
            Expectation::Revert.check(&halt()),
            Err(Mismatch::WrongFailure(ExecutionFailure::Halted { .. }))
        ));
    }

    #[test]
    fn runs_every_iteration() {
        let mut calls = 0u64;
        let report = run_iterations("ok", 25, Expectation::Success, || {
            calls += 1;
            Ok::<_, String>(success())
        })
        .unwrap();
        assert_eq!(calls, 25);
        assert_eq!(report.iterations, 25);
        assert_eq!(report.name, "ok");
    }

    #[test]
    fn stops_at_first_mismatch() {
        let mut calls = 0u64;
        let err = run_iterations("flaky", 10, Expectation::Success, || {
            calls += 1;
            Ok::<_, String>(if calls == 3 { revert() } else { success() })
        })
        .unwrap_err();
        assert_eq!(calls, 3);
        assert!(matches!(
            err,
            BenchError::Mismatch {
                iteration: 2,
                source: Mismatch::UnexpectedFailure(ExecutionFailure::Reverted { .. }),
                ..
            }
        ));
    }

    #[test]
    fn evm_error_is_fatal() {
        let err = run_iterations("broken", 10, Expectation::Any, || {
            Err::<ExecutionResult, _>("nonce too low")
        })
        .unwrap_err();
        assert!(
            matches!(err, BenchError::Evm { iteration: 0, ref message, .. } if message == "nonce too low")
        );
    }

    #[test]
    fn duration_mode_fails_before_measuring() {
        let mut calls = 0u64;
        let err = run_for_duration("revert", Duration::from_millis(10), Expectation::Revert, || {
            calls += 1;
            Ok::<_, String>(success())
        })
        .unwrap_err();
        assert_eq!(calls, 1);
        assert!(matches!(
            err,
            BenchError::Mismatch {
                source: Mismatch::UnexpectedSuccess,
                ..
            }
        ));
    }

    #[test]
    fn report_average() {
        let report = BenchReport {
            name: "sample".to_string(),
            iterations: 4,
            elapsed: Duration::from_micros(10),
        };
        assert_eq!(report.average(), Duration::from_nanos(2_500));
        assert_eq!(
            report.to_string(),
            "Ran 4 iterations of sample in 10µs\nAverage time per iteration: 2.5µs"
        );
    }
}
