use std::sync::Arc;

use relay_api::RelayError;

use crate::topic::DataBus;

/// A scheduled unit of work.
///
/// Processors communicate only through bus topics: one writes a topic,
/// another reads it on a later (or the same) tick.
pub trait Processor: Send {
    /// Name used in logs and errors.
    fn name(&self) -> &str;

    /// Bind readers and writers. Called once before the first `process()`.
    fn initialize(&mut self, bus: &Arc<DataBus>) -> Result<(), RelayError>;

    /// Run one tick: drain new records, compute, write results.
    ///
    /// Must not block. Having nothing to do is `Ok(())`.
    fn process(&mut self) -> Result<(), RelayError>;
}
