use ndarray::Array1;

use crate::environment::Environment;
use crate::error::{FlagforgeError, Result};
use crate::reward::{relative_improvement, RewardMode};

/// Builds, inspects and times a program under a given set of compiler flags.
///
/// Implementations wrap whatever toolchain and benchmark harness is at hand.
/// Failures should surface as [`FlagforgeError::EnvironmentFailure`] or
/// [`FlagforgeError::Timeout`] so the agent can retry or skip the step.
pub trait ProgramRunner {
    /// Static code features of `program` compiled with `flags`.
    fn features(&mut self, program: &str, flags: &[String]) -> Result<Vec<f32>>;

    /// Measured runtime of `program` compiled with `flags`, in seconds.
    fn runtime(&mut self, program: &str, flags: &[String]) -> Result<f64>;
}

/// An [`Environment`] whose actions append compiler flags.
///
/// Each action index maps to one flag. An empty flag string is a no-op: it is
/// a legal action that leaves the flag set untouched. The state is the runner's
/// feature vector for the current flag set, and the terminal reward is the
/// relative improvement of the current runtime over the baseline measured with
/// `base_flags` alone.
pub struct CompilerEnvironment<R: ProgramRunner> {
    runner: R,
    actions: Vec<String>,
    base_flags: Vec<String>,
    program: String,
    applied: Vec<String>,
    num_features: usize,
    baseline: Option<f64>,
    reward_mode: RewardMode,
}

impl<R: ProgramRunner> CompilerEnvironment<R> {
    pub fn new(
        runner: R,
        actions: Vec<String>,
        base_flags: Vec<String>,
        program: impl Into<String>,
        num_features: usize,
    ) -> Result<Self> {
        if actions.is_empty() {
            return Err(FlagforgeError::invalid_parameter("actions", "At least one flag is required"));
        }
        if num_features == 0 {
            return Err(FlagforgeError::invalid_parameter("num_features", "Must be greater than 0"));
        }

        Ok(CompilerEnvironment {
            runner,
            actions,
            base_flags,
            program: program.into(),
            applied: Vec::new(),
            num_features,
            baseline: None,
            reward_mode: RewardMode::default(),
        })
    }

    pub fn with_reward_mode(mut self, mode: RewardMode) -> Self {
        self.reward_mode = mode;
        self
    }

    pub fn num_actions(&self) -> usize {
        self.actions.len()
    }

    pub fn actions(&self) -> &[String] {
        &self.actions
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    /// Flags applied by actions since the last reset, in order.
    pub fn applied_flags(&self) -> &[String] {
        &self.applied
    }

    /// Baseline runtime of the current program, if it has been measured.
    pub fn baseline_runtime(&self) -> Option<f64> {
        self.baseline
    }

    pub fn runner(&self) -> &R {
        &self.runner
    }

    pub fn runner_mut(&mut self) -> &mut R {
        &mut self.runner
    }

    /// `base_flags` followed by every applied flag.
    pub fn current_flags(&self) -> Vec<String> {
        self.base_flags.iter().chain(self.applied.iter()).cloned().collect()
    }

    fn measure_baseline(&mut self) -> Result<f64> {
        match self.baseline {
            Some(baseline) => Ok(baseline),
            None => {
                let baseline = self.runner.runtime(&self.program, &self.base_flags)?;
                log::debug!("baseline runtime for {}: {:.6}s", self.program, baseline);
                self.baseline = Some(baseline);
                Ok(baseline)
            }
        }
    }
}

impl<R: ProgramRunner> Environment for CompilerEnvironment<R> {
    fn state(&mut self) -> Result<Array1<f32>> {
        let flags = self.current_flags();
        let features = self.runner.features(&self.program, &flags)?;
        if features.len() != self.num_features {
            return Err(FlagforgeError::dimension_mismatch(
                format!("{} features", self.num_features),
                format!("{} features", features.len()),
            ));
        }
        Ok(Array1::from(features))
    }

    fn apply(&mut self, action: usize) -> Result<()> {
        let flag = self.actions.get(action).ok_or(FlagforgeError::InvalidAction {
            action,
            max_actions: self.actions.len(),
        })?;

        if flag.is_empty() || self.applied.contains(flag) {
            return Ok(());
        }
        self.applied.push(flag.clone());
        Ok(())
    }

    fn measure_terminal_reward(&mut self) -> Result<f32> {
        let baseline = self.measure_baseline()?;
        let flags = self.current_flags();
        let runtime = self.runner.runtime(&self.program, &flags)?;
        log::debug!(
            "{} with {:?}: {:.6}s (baseline {:.6}s)",
            self.program,
            self.applied,
            runtime,
            baseline
        );
        relative_improvement(baseline, runtime, self.reward_mode)
    }

    /// Clear the applied flags. Switching programs discards the cached baseline
    /// and measures the new program's baseline immediately.
    fn reset(&mut self, program: Option<&str>) -> Result<()> {
        self.applied.clear();
        if let Some(program) = program {
            if program != self.program || self.baseline.is_none() {
                self.program = program.to_string();
                self.baseline = None;
                self.measure_baseline()?;
            }
        }
        Ok(())
    }
}
