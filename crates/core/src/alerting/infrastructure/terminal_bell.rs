use std::io::{self, Write};

use crate::alerting::domain::alert_sound::AlertSound;
use crate::alerting::domain::tone::Tone;

const BEL: &[u8] = b"\x07";

/// Rings the terminal bell. Pitch and length are up to the terminal.
pub struct TerminalBell<W: Write + Send> {
    out: W,
}

impl TerminalBell<io::Stderr> {
    pub fn stderr() -> Self {
        Self::new(io::stderr())
    }
}

impl<W: Write + Send> TerminalBell<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write + Send> AlertSound for TerminalBell<W> {
    fn play(&mut self, _tone: &Tone) -> Result<(), Box<dyn std::error::Error>> {
        self.out.write_all(BEL)?;
        self.out.flush()?;
        Ok(())
    }
}
