//! Online gain tuning by coordinate descent ("twiddle").
//!
//! The tuner owns the PID controller. Every evaluation window it scores the
//! current gains with the controller's mean cost, nudges one gain at a time
//! and restarts the controller so the next window measures the new gains from
//! a clean state.

use tracing::debug;

use crate::control::pid::PidController;
use crate::error::ControlResult;
use crate::types::{Coordinate, Gains, SearchState, TuningConfig, TuningReport};

const DELTA_GROWTH: f64 = 1.1;
const DELTA_SHRINK: f64 = 0.9;

/// What a single state-machine step did
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum StepOutcome {
    /// First window scored; the baseline cost is now known
    Started,
    /// The probe beat the best cost and was kept
    Improved(Coordinate),
    /// Raising the gain did not help, lowering it is tried next
    ProbingOpposite(Coordinate),
    /// Neither direction helped; the gain went back to where it was
    Reverted(Coordinate),
    /// Tuning is over, nothing changed
    Idle,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TwiddleStep {
    pub outcome: StepOutcome,
    /// Set on the step that brought the delta sum under the tolerance
    pub converged: bool,
}

/// Result of pushing one CTE sample through the tuner
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TunerOutput {
    pub steer: f64,
    /// The controller state was zeroed before this sample
    pub controller_reset: bool,
    /// Present when an evaluation window closed on this sample
    pub evaluation: Option<Evaluation>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Evaluation {
    pub cost: f64,
    pub step: TwiddleStep,
}

pub struct TwiddleTuner {
    pid: PidController,
    config: TuningConfig,

    gains: Gains,
    best_gains: Gains,
    deltas: [f64; 3],
    cursor: usize,
    state: SearchState,
    best_cost: f64,

    window_sample_count: u64,
    enabled: bool,
    started: bool,
    iteration: u64,
    evaluations: u64,
}

impl TwiddleTuner {
    pub fn new(gains: Gains, config: TuningConfig) -> ControlResult<Self> {
        gains.validate()?;
        config.validate()?;

        Ok(Self {
            pid: PidController::new(gains),
            gains,
            best_gains: gains,
            deltas: config.deltas,
            cursor: 0,
            state: SearchState::Init,
            best_cost: f64::INFINITY,
            window_sample_count: 0,
            enabled: config.enabled,
            started: false,
            iteration: 0,
            evaluations: 0,
            config,
        })
    }

    /// Feed one CTE sample, closing the evaluation window first if it is due
    pub fn process(&mut self, cte: f64) -> ControlResult<TunerOutput> {
        let mut controller_reset = !self.started;
        self.started = true;
        let mut evaluation = None;

        if self.enabled {
            if self.window_complete()? {
                let cost = self.pid.total_error()?;
                let step = self.evaluate(cost);

                self.pid.init(self.gains);
                self.window_sample_count = 0;
                controller_reset = true;
                evaluation = Some(Evaluation { cost, step });
            }

            if self.enabled {
                self.window_sample_count += 1;
            }
        }

        let steer = self.pid.update(cte);

        Ok(TunerOutput {
            steer,
            controller_reset,
            evaluation,
        })
    }

    /// Run one step of the search with the cost of the trial that just ended.
    ///
    /// The caller is responsible for restarting the controller with
    /// [`TwiddleTuner::gains`] afterwards.
    pub fn evaluate(&mut self, cost: f64) -> TwiddleStep {
        if !self.enabled {
            return TwiddleStep {
                outcome: StepOutcome::Idle,
                converged: false,
            };
        }

        self.evaluations += 1;
        let coordinate = self.active_coordinate();
        let i = coordinate.index();

        let outcome = match self.state {
            SearchState::Init => {
                self.commit(cost);
                self.gains[coordinate] += self.deltas[i];
                self.state = SearchState::ProbeIncreased;
                StepOutcome::Started
            }
            SearchState::ProbeIncreased => {
                if cost < self.best_cost {
                    self.commit(cost);
                    self.deltas[i] *= DELTA_GROWTH;
                    self.advance();
                    StepOutcome::Improved(coordinate)
                } else {
                    self.gains[coordinate] -= 2.0 * self.deltas[i];
                    self.state = SearchState::ProbeDecreased;
                    StepOutcome::ProbingOpposite(coordinate)
                }
            }
            SearchState::ProbeDecreased => {
                let outcome = if cost < self.best_cost {
                    self.commit(cost);
                    self.deltas[i] *= DELTA_GROWTH;
                    StepOutcome::Improved(coordinate)
                } else {
                    self.gains[coordinate] += self.deltas[i];
                    self.deltas[i] *= DELTA_SHRINK;
                    StepOutcome::Reverted(coordinate)
                };
                self.advance();
                self.state = SearchState::ProbeIncreased;
                outcome
            }
        };

        debug!(
            "Twiddle step {:?}: cost={:.5}, best={:.5}, delta_sum={:.4}",
            outcome,
            cost,
            self.best_cost,
            self.delta_sum()
        );

        let converged = self.delta_sum() <= self.config.tolerance;
        if converged {
            // Drop the pending probe and keep the best gains seen
            self.enabled = false;
            self.gains = self.best_gains;
        }

        TwiddleStep { outcome, converged }
    }

    fn commit(&mut self, cost: f64) {
        self.best_cost = cost;
        self.best_gains = self.gains;
    }

    /// Move to the next tunable gain and raise it by its delta
    fn advance(&mut self) {
        self.cursor = (self.cursor + 1) % self.config.tunable.len();
        if self.cursor == 0 {
            self.iteration += 1;
        }
        let next = self.active_coordinate();
        self.gains[next] += self.deltas[next.index()];
    }

    fn window_complete(&self) -> ControlResult<bool> {
        if self.window_sample_count >= self.config.window {
            return Ok(true);
        }

        // A trial already worse than the best can end early
        if let Some(min_samples) = self.config.early_abort_after {
            if self.state != SearchState::Init && self.window_sample_count > min_samples {
                return Ok(self.pid.total_error()? > self.best_cost);
            }
        }

        Ok(false)
    }

    /// Sum of the step sizes of the gains being tuned
    pub fn delta_sum(&self) -> f64 {
        self.config
            .tunable
            .iter()
            .map(|c| self.deltas[c.index()])
            .sum()
    }

    pub fn report(&self, cost: f64) -> TuningReport {
        TuningReport {
            iteration: self.iteration,
            evaluations: self.evaluations,
            cost,
            best_cost: self.best_cost,
            gains: self.gains,
            best_gains: self.best_gains,
            deltas: self.deltas,
            delta_sum: self.delta_sum(),
            active: self.active_coordinate(),
            state: self.state,
            enabled: self.enabled,
            timestamp: chrono::Utc::now().timestamp_millis(),
        }
    }

    pub fn active_coordinate(&self) -> Coordinate {
        self.config.tunable[self.cursor]
    }

    pub fn gains(&self) -> Gains {
        self.gains
    }

    pub fn best_gains(&self) -> Gains {
        self.best_gains
    }

    pub fn deltas(&self) -> [f64; 3] {
        self.deltas
    }

    pub fn state(&self) -> SearchState {
        self.state
    }

    pub fn best_cost(&self) -> f64 {
        self.best_cost
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn iteration(&self) -> u64 {
        self.iteration
    }

    pub fn evaluations(&self) -> u64 {
        self.evaluations
    }

    pub fn window_sample_count(&self) -> u64 {
        self.window_sample_count
    }

    pub fn controller(&self) -> &PidController {
        &self.pid
    }
}
