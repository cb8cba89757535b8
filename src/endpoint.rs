use crate::error::Result;
use crate::word::Word;

/// Upstream end of a worker: something words can be pulled from.
///
/// `produce` fills a prefix of `dst` and returns its length. A short count is
/// the normal case and callers must loop. Zero means end-of-stream: a
/// one-shot file reached its end, or a stopped buffer has been drained.
pub trait Source<W: Word>: Send + Sync {
    fn produce(&self, dst: &mut [W]) -> Result<usize>;

    /// Unblock any call currently waiting inside `produce`
    fn signal_stop(&self) {}
}

/// Downstream end of a worker: something words can be pushed into.
///
/// `consume` takes a prefix of `src` and returns its length. Zero for a
/// non-empty `src` means the sink is closed and will never take more.
pub trait Sink<W: Word>: Send + Sync {
    fn consume(&self, src: &[W]) -> Result<usize>;

    /// Unblock any call currently waiting inside `consume`
    fn signal_stop(&self) {}
}

/// An in-memory stage that is both a sink for one worker and a source for
/// the next.
pub trait Pipe<W: Word>: Source<W> + Sink<W> {
    /// Number of live words currently stored
    fn len(&self) -> usize;

    /// Maximum number of live words the pipe can hold at once
    fn usable_capacity(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
