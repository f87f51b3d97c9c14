use crate::errors::CoreError;
use crate::models::observation::RawObservation;

/// Stream of raw observations produced by one adapter run.
pub type ObservationStream<'a> = Box<dyn Iterator<Item = Result<RawObservation, CoreError>> + 'a>;

/// Capability every upstream price source implements.
///
/// An adapter hides all site-specific extraction (HTML tables, JSON APIs,
/// PDF or Excel reports) and only hands over raw observations. The pipeline
/// consumes them in the order they are yielded.
pub trait SourceAdapter {
    /// Source name; selects the output directory and the catalog file.
    fn name(&self) -> &str;

    /// Produce the observations of one run. Each call starts a fresh,
    /// finite pass over the source.
    ///
    /// An `Err` item reports a single unusable observation; the stream may
    /// continue after it.
    fn observations(&mut self) -> ObservationStream<'_>;
}
