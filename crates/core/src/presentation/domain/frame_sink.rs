use crate::shared::frame::Frame;

/// Destination for annotated frames (the "show" step).
pub trait FrameSink {
    fn show(&mut self, frame: &Frame) -> Result<(), Box<dyn std::error::Error>>;

    /// Finalizes any output. Default: nothing to do.
    fn close(&mut self) -> Result<(), Box<dyn std::error::Error>> {
        Ok(())
    }
}

/// Discards frames; used when nothing is recorded.
pub struct NullFrameSink;

impl FrameSink for NullFrameSink {
    fn show(&mut self, _frame: &Frame) -> Result<(), Box<dyn std::error::Error>> {
        Ok(())
    }
}
