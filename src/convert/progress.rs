//! Progress-callback trait for stage-level conversion events.
//!
//! The core never prints; callers inject a sink and forward events to a
//! terminal progress bar, a GUI, or a log. All methods have no-op defaults
//! so implementations only override what they care about. The trait is
//! `Send + Sync` because page extraction can run on worker threads.

/// A pipeline stage, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    /// Span/geometry extraction from the source.
    Extract,
    /// Header/footer classification.
    Classify,
    /// Structure inference.
    Infer,
    /// Paragraph reconstruction.
    Reconstruct,
    /// Image processing.
    Images,
    /// Target serialization and write.
    Write,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Stage::Extract => "extract",
            Stage::Classify => "classify",
            Stage::Infer => "infer",
            Stage::Reconstruct => "reconstruct",
            Stage::Images => "images",
            Stage::Write => "write",
        };
        write!(f, "{}", name)
    }
}

/// Receives structured progress events during a conversion run.
pub trait ProgressSink: Send + Sync {
    /// A stage is about to run.
    fn on_stage(&self, stage: Stage) {
        let _ = stage;
    }

    /// Pages were extracted from the source.
    fn on_pages_extracted(&self, count: u32) {
        let _ = count;
    }

    /// Blocks were classified by the inference engine.
    fn on_blocks_classified(&self, count: u32) {
        let _ = count;
    }

    /// Images were extracted and processed.
    fn on_images_extracted(&self, count: u32) {
        let _ = count;
    }
}

/// A sink that ignores every event.
pub struct NullSink;

impl ProgressSink for NullSink {}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    struct Counting {
        stages: AtomicU32,
    }

    impl ProgressSink for Counting {
        fn on_stage(&self, _stage: Stage) {
            self.stages.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn test_default_methods_are_noops() {
        let sink = NullSink;
        sink.on_stage(Stage::Extract);
        sink.on_pages_extracted(5);
    }

    #[test]
    fn test_overridden_method_fires() {
        let sink = Counting {
            stages: AtomicU32::new(0),
        };
        sink.on_stage(Stage::Extract);
        sink.on_stage(Stage::Write);
        assert_eq!(sink.stages.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_stage_display() {
        assert_eq!(Stage::Extract.to_string(), "extract");
        assert_eq!(Stage::Write.to_string(), "write");
    }
}
