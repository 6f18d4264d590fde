// Use cases layer: application workflows for the telemetry service.

pub mod feed;
pub mod players;
pub mod telemetry;

#[cfg(test)]
pub(crate) mod test_support;

pub use feed::{FeedMode, FeedSettings, feed_task, mode_for_link};
pub use players::{
    LiveSource, OnlinePlayersResolver, PlayerSource, RecentActivitySource, SimulatedSource,
    SourceResult, first_available,
};
pub use telemetry::{
    AggregatedState, PipelineSettings, TelemetryHandle, TelemetryPipeline, aggregator_task,
};
