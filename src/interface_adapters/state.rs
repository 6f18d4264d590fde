use std::sync::Arc;

use crate::interface_adapters::rcon::RconCommands;
use crate::use_cases::telemetry::{TelemetryHandle, TelemetryPipeline};

#[derive(Clone)]
pub struct AppState {
    // Read side: copy-out views of the aggregated picture.
    pub telemetry: TelemetryHandle,
    // Write side: typed admin commands straight to the console.
    pub commands: Arc<RconCommands>,
    // Keeps the feed and aggregator tasks alive for as long as the state is.
    pub pipeline: Arc<TelemetryPipeline>,
}
