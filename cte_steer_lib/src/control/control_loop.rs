//! Host loop tying the tuner to the simulator's telemetry stream.

use tracing::{debug, info};

use crate::control::twiddle::{StepOutcome, TwiddleTuner};
use crate::control::ThrottlePolicy;
use crate::error::ControlResult;
use crate::types::{ControllerConfig, SteerCommand, Telemetry, TuningReport};

/// Everything the host has to send back for one telemetry sample
#[derive(Debug, Clone)]
pub struct ControlOutput {
    pub command: SteerCommand,
    /// The controller restarted; the simulator should reset the car first
    pub reset_simulator: bool,
    /// Present when a tuning window was scored on this sample
    pub report: Option<TuningReport>,
}

/// Steering loop state, driven one sample at a time
pub struct ControlLoop {
    tuner: TwiddleTuner,
    throttle: ThrottlePolicy,
    samples: u64,
}

impl ControlLoop {
    pub fn new(config: &ControllerConfig) -> ControlResult<Self> {
        config.validate()?;

        Ok(Self {
            tuner: TwiddleTuner::new(config.gains, config.tuning.clone())?,
            throttle: config.throttle.clone(),
            samples: 0,
        })
    }

    pub fn step(&mut self, telemetry: &Telemetry) -> ControlResult<ControlOutput> {
        let output = self.tuner.process(telemetry.cte)?;
        self.samples += 1;

        let report = output.evaluation.map(|evaluation| {
            let report = self.tuner.report(evaluation.cost);
            log_evaluation(&report, evaluation.step.outcome, evaluation.step.converged);
            report
        });

        let throttle = self.throttle.throttle(telemetry, output.steer);
        let command = SteerCommand::new(output.steer, throttle);

        if self.tuner.is_enabled() {
            debug!("CTE: {:.4} Steering Value: {:.4}", telemetry.cte, output.steer);
        } else {
            info!(
                "CTE: {:.4} Steering Value: {:.4} Throttle: {:.2}",
                telemetry.cte, output.steer, throttle
            );
        }

        Ok(ControlOutput {
            command,
            reset_simulator: output.controller_reset,
            report,
        })
    }

    pub fn tuner(&self) -> &TwiddleTuner {
        &self.tuner
    }

    pub fn samples(&self) -> u64 {
        self.samples
    }
}

fn log_evaluation(report: &TuningReport, outcome: StepOutcome, converged: bool) {
    info!(
        "Iteration {} ({} evaluations): error = {:.5}, best_err = {:.5}, sum_dp = {:.4}",
        report.iteration, report.evaluations, report.cost, report.best_cost, report.delta_sum
    );
    debug!("Step {:?}, next trial {}", outcome, report.gains);

    if converged {
        info!("Twiddle finished, keeping {}", report.gains);
    }
}
