use cte_steer_lib::{
    init_tracing, ControlLoop, ControllerConfig, SteerCommandWithMetadata, Telemetry,
};
use dora_node_api::arrow::array::Array;
use dora_node_api::{arrow::array::BinaryArray, dora_core::config::DataId, DoraNode, Event};
use eyre::Result;
use tracing::{error, info, warn};

fn main() -> Result<()> {
    let _guard = init_tracing();

    info!("Starting steering controller node");

    let config = ControllerConfig::from_env()?;
    info!("Steering Controller Configuration:");
    info!("  Gains: {}", config.gains);
    info!(
        "  Twiddle: enabled={}, window={}, tolerance={}, tunable={:?}, early_abort_after={:?}",
        config.tuning.enabled,
        config.tuning.window,
        config.tuning.tolerance,
        config.tuning.tunable,
        config.tuning.early_abort_after
    );
    info!("  Throttle: {:?}", config.throttle);

    let mut control = ControlLoop::new(&config)?;

    let (mut node, mut events) = DoraNode::init_from_env()?;
    let steer_output = DataId::from("steer_command".to_owned());
    let report_output = DataId::from("tuning_report".to_owned());

    while let Some(event) = events.recv() {
        match event {
            Event::Input { id, data, metadata: _ } => match id.as_str() {
                "telemetry" => {
                    if let Some(array) = data.as_any().downcast_ref::<BinaryArray>() {
                        if array.is_empty() {
                            continue;
                        }

                        let bytes = array.value(0);
                        let telemetry: Telemetry = match serde_json::from_slice(bytes) {
                            Ok(t) => t,
                            Err(e) => {
                                warn!("Failed to deserialize Telemetry: {}", e);
                                continue;
                            }
                        };

                        let output = match control.step(&telemetry) {
                            Ok(output) => output,
                            Err(e) => {
                                error!("Steering loop rejected sample: {}", e);
                                continue;
                            }
                        };

                        let command =
                            SteerCommandWithMetadata::new(output.command, output.reset_simulator);
                        let serialized = serde_json::to_vec(&command)?;
                        let arrow_data = BinaryArray::from_vec(vec![serialized.as_slice()]);
                        node.send_output(steer_output.clone(), Default::default(), arrow_data)?;

                        if let Some(report) = output.report {
                            let serialized = serde_json::to_vec(&report)?;
                            let arrow_data = BinaryArray::from_vec(vec![serialized.as_slice()]);
                            node.send_output(report_output.clone(), Default::default(), arrow_data)?;
                        }
                    }
                }
                other => {
                    warn!("Unexpected input: {}", other);
                }
            },
            Event::InputClosed { id } => {
                info!("Input {} closed", id);
                break;
            }
            Event::Stop(_) => {
                info!("Received stop event");
                break;
            }
            other => {
                warn!("Unexpected event: {:?}", other);
            }
        }
    }

    let tuner = control.tuner();
    info!(
        "Steering controller stopped after {} samples, gains {} (best {})",
        control.samples(),
        tuner.gains(),
        tuner.best_gains()
    );

    Ok(())
}
