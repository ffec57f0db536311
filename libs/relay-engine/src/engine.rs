use std::sync::Arc;
use std::time::Duration;

use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use crate::error::EngineError;
use crate::processor::Processor;
use crate::topic::DataBus;

/// The running relay: owns the bus and ticks processors in order.
pub struct Engine {
    bus: Arc<DataBus>,
    processors: Vec<Box<dyn Processor>>,
    ticks: u64,
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let names: Vec<&str> = self.processors.iter().map(|p| p.name()).collect();
        f.debug_struct("Engine")
            .field("bus", &self.bus)
            .field("processors", &names)
            .field("ticks", &self.ticks)
            .finish()
    }
}

impl Engine {
    pub fn new(bus: Arc<DataBus>) -> Self {
        Self {
            bus,
            processors: Vec::new(),
            ticks: 0,
        }
    }

    /// Number of completed ticks.
    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    /// Initialize `processor` against the bus and append it to the schedule.
    pub fn add(&mut self, mut processor: Box<dyn Processor>) -> Result<(), EngineError> {
        processor
            .initialize(&self.bus)
            .map_err(|e| EngineError::processor(processor.name(), e))?;
        tracing::info!(processor = %processor.name(), "initialized processor");
        self.processors.push(processor);
        Ok(())
    }

    /// Run every processor once, in registration order.
    ///
    /// The first failure aborts the rest of the tick. Writes already made by
    /// earlier processors stay on the bus.
    pub fn tick(&mut self) -> Result<(), EngineError> {
        for processor in &mut self.processors {
            processor
                .process()
                .map_err(|e| EngineError::processor(processor.name(), e))?;
        }
        self.ticks += 1;
        Ok(())
    }

    /// Tick every `period` until `cancel` fires.
    ///
    /// Cancellation is observed only between ticks. With `halt_on_error` the
    /// first failed tick ends the loop with its error; otherwise it is logged
    /// and the schedule continues.
    pub async fn run(
        &mut self,
        period: Duration,
        halt_on_error: bool,
        cancel: CancellationToken,
    ) -> Result<(), EngineError> {
        if self.processors.is_empty() {
            return Err(EngineError::Config("no processors configured".into()));
        }

        let mut interval = tokio::time::interval(period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        tracing::info!(period_ms = period.as_millis() as u64, processors = self.processors.len(), "engine running");

        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    tracing::info!(ticks = self.ticks, "engine stopped");
                    return Ok(());
                }
                _ = interval.tick() => {
                    if let Err(e) = self.tick() {
                        if halt_on_error {
                            tracing::error!(error = %e, "tick failed, halting");
                            return Err(e);
                        }
                        tracing::error!(error = %e, "tick failed, continuing");
                    }
                }
            }
        }
    }
}
