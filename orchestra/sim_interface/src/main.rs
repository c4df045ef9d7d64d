use cte_steer_lib::{
    init_tracing, SteerCommandWithMetadata, Telemetry, DEFAULT_SIM_PORT, MANUAL_EVENT,
    RESET_EVENT, STEER_EVENT, TELEMETRY_EVENT,
};
use dora_node_api::{
    arrow::array::{Array, BinaryArray},
    dora_core::config::DataId,
    DoraNode, Event,
};
use eyre::Result;
use serde_json::{json, Value};
use socketioxide::{
    extract::{Data, SocketRef},
    layer::SocketIoLayer,
    SocketIo,
};
use std::env;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tower::ServiceBuilder;
use tracing::{debug, error, info, warn};

#[derive(Clone)]
struct SharedState {
    pub telemetry_queue: Arc<Mutex<Vec<Telemetry>>>,
    pub connected: Arc<Mutex<usize>>,
}

impl SharedState {
    fn new() -> Self {
        Self {
            telemetry_queue: Arc::new(Mutex::new(Vec::new())),
            connected: Arc::new(Mutex::new(0)),
        }
    }
}

fn setup_socketio(shared_state: SharedState) -> (SocketIo, SocketIoLayer) {
    let (layer, io) = SocketIo::new_layer();

    io.ns("/", move |socket: SocketRef| {
        if let Ok(mut connected) = shared_state.connected.lock() {
            *connected += 1;
        }
        info!("Connected!!! simulator socket {}", socket.id);

        let state = shared_state.clone();
        socket.on(TELEMETRY_EVENT, move |socket: SocketRef, Data::<Value>(data)| {
            match classify_telemetry(&data) {
                TelemetryEvent::Sample(telemetry) => {
                    if let Ok(mut queue) = state.telemetry_queue.lock() {
                        queue.push(telemetry);
                    }
                }
                TelemetryEvent::Manual { reason, reply } => {
                    debug!("No telemetry in event ({}), handing back manual control", reason);
                    socket.emit(reply.0, reply.1).ok();
                }
            }
        });

        let state = shared_state.clone();
        socket.on_disconnect(move |socket: SocketRef| {
            if let Ok(mut connected) = state.connected.lock() {
                *connected = connected.saturating_sub(1);
            }
            info!("Disconnected simulator socket {}", socket.id);
        });
    });

    (io, layer)
}

async fn serve(addr: String, layer: SocketIoLayer) -> Result<()> {
    let app = axum::Router::new().layer(ServiceBuilder::new().layer(layer));

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("Listening to port {}", listener.local_addr()?.port());

    axum::serve(listener, app).await?;
    Ok(())
}

/// What to do with one simulator `telemetry` event
enum TelemetryEvent {
    /// Forward to the steering controller
    Sample(Telemetry),
    /// Manual driving, answer the simulator directly
    Manual {
        reason: String,
        reply: (&'static str, Value),
    },
}

fn classify_telemetry(payload: &Value) -> TelemetryEvent {
    match Telemetry::from_sim_payload(payload) {
        Ok(telemetry) => TelemetryEvent::Sample(telemetry),
        Err(e) => TelemetryEvent::Manual {
            reason: e.to_string(),
            reply: (MANUAL_EVENT, json!({})),
        },
    }
}

/// Simulator events for one steering command, in sending order
fn outgoing_events(command: &SteerCommandWithMetadata) -> Vec<(&'static str, Value)> {
    let mut events = Vec::with_capacity(2);
    if command.reset_simulator {
        events.push((RESET_EVENT, json!({})));
    }
    events.push((
        STEER_EVENT,
        json!({
            "steering_angle": command.command.steering_angle,
            "throttle": command.command.throttle,
        }),
    ));
    events
}

#[tokio::main]
async fn main() -> Result<()> {
    let _guard = init_tracing();

    info!("Starting simulator interface");

    let (node, mut events) = DoraNode::init_from_env()?;
    let telemetry_output = DataId::from("telemetry".to_owned());

    let shared_state = SharedState::new();
    let (io, layer) = setup_socketio(shared_state.clone());

    let bind_address = env::var("BIND_ADDRESS").unwrap_or_else(|_| "127.0.0.1".to_string());
    let port = env::var("SIM_PORT")
        .ok()
        .and_then(|p| p.parse::<u16>().ok())
        .unwrap_or(DEFAULT_SIM_PORT);
    let addr = format!("{}:{}", bind_address, port);
    info!("Binding Socket.IO server to: {}", addr);

    let socketio_handle = tokio::spawn(async move {
        if let Err(e) = serve(addr, layer).await {
            error!("Failed to listen to port: {}", e);
        }
    });

    // Forward queued telemetry into the dataflow
    let state_for_telemetry = shared_state.clone();
    let telemetry_processor = tokio::spawn(async move {
        let mut node = node;
        loop {
            let pending: Vec<Telemetry> = match state_for_telemetry.telemetry_queue.lock() {
                Ok(mut queue) => queue.drain(..).collect(),
                Err(_) => Vec::new(),
            };

            for telemetry in pending {
                match serde_json::to_vec(&telemetry) {
                    Ok(serialized) => {
                        let arrow_data = BinaryArray::from_vec(vec![serialized.as_slice()]);
                        if let Err(e) =
                            node.send_output(telemetry_output.clone(), Default::default(), arrow_data)
                        {
                            warn!("Failed to forward telemetry: {}", e);
                        }
                    }
                    Err(e) => warn!("Failed to serialize telemetry: {}", e),
                }
            }

            tokio::time::sleep(Duration::from_millis(1)).await;
        }
    });

    info!("Simulator interface initialized - waiting for the simulator...");

    loop {
        if let Some(event) = events.recv() {
            match event {
                Event::Input { id, data, .. } => match id.as_str() {
                    "steer_command" => {
                        if let Some(binary_array) = data.as_any().downcast_ref::<BinaryArray>() {
                            if binary_array.len() > 0 {
                                let bytes = binary_array.value(0);

                                match serde_json::from_slice::<SteerCommandWithMetadata>(bytes) {
                                    Ok(command) => {
                                        for (name, payload) in outgoing_events(&command) {
                                            if let Err(e) = io.emit(name, payload) {
                                                warn!("Failed to emit {}: {}", name, e);
                                            }
                                        }
                                    }
                                    Err(e) => {
                                        error!("Failed to parse steer command: {}", e);
                                    }
                                }
                            }
                        }
                    }
                    other => {
                        warn!("Unknown input: {}", other);
                    }
                },
                Event::Stop(_) => {
                    info!("Stop event received");
                    break;
                }
                _ => {}
            }
        } else {
            break;
        }
    }

    // Cleanup
    socketio_handle.abort();
    telemetry_processor.abort();
    let connected = shared_state.connected.lock().map(|c| *c).unwrap_or(0);
    info!("Simulator interface shutting down ({} simulator connections open)", connected);

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use cte_steer_lib::SteerCommand;

    #[test]
    fn test_reset_precedes_steer() {
        let command = SteerCommandWithMetadata::new(SteerCommand::new(-0.38, 1.0), true);

        let events = outgoing_events(&command);

        assert_eq!(events.len(), 2);
        assert_eq!(events[0].0, "reset");
        assert_eq!(events[1].0, "steer");
        assert_eq!(events[1].1["steering_angle"], -0.38);
        assert_eq!(events[1].1["throttle"], 1.0);
    }

    #[test]
    fn test_null_telemetry_switches_to_manual() {
        for payload in [Value::Null, json!({ "cte": "abc", "speed": "1", "steering_angle": "0" })] {
            match classify_telemetry(&payload) {
                TelemetryEvent::Manual { reply, .. } => {
                    assert_eq!(reply.0, "manual");
                    assert_eq!(reply.1, json!({}));
                }
                TelemetryEvent::Sample(t) => panic!("expected manual reply, got {:?}", t),
            }
        }
    }

    #[test]
    fn test_telemetry_is_forwarded() {
        let payload = json!({ "cte": "0.25", "speed": "30.1", "steering_angle": "-2" });

        match classify_telemetry(&payload) {
            TelemetryEvent::Sample(t) => {
                assert_eq!(t.cte, 0.25);
                assert_eq!(t.speed, 30.1);
                assert_eq!(t.steering_angle, -2.0);
            }
            TelemetryEvent::Manual { reason, .. } => panic!("unexpected manual reply: {}", reason),
        }
    }

    #[test]
    fn test_plain_steer() {
        let command = SteerCommandWithMetadata::new(SteerCommand::new(0.1, -1.0), false);

        let events = outgoing_events(&command);

        assert_eq!(events.len(), 1);
        assert_eq!(events[0].0, "steer");
        assert_eq!(events[0].1["throttle"], -1.0);
    }
}
