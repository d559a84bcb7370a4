//! Built-in channels that need no audio device or mail server

use crate::channels::{EmailChannel, SoundCue, SoundChannel};
use crate::NotifyError;
use std::io::Write;
use tracing::{info, warn};

/// Rings the terminal bell and logs the cue
#[derive(Debug, Default)]
pub struct TerminalBell;

impl SoundChannel for TerminalBell {
    fn play(&self, cue: &SoundCue, looping: bool) -> Result<(), NotifyError> {
        info!("Sound: {:?} (loop: {})", cue, looping);
        let mut stderr = std::io::stderr().lock();
        stderr
            .write_all(b"\x07")
            .and_then(|_| stderr.flush())
            .map_err(|e| NotifyError::Sound(e.to_string()))
    }

    fn stop(&self) -> Result<(), NotifyError> {
        Ok(())
    }
}

/// Writes outgoing email to the log instead of a mail server
#[derive(Debug, Default)]
pub struct LogEmailChannel;

impl EmailChannel for LogEmailChannel {
    fn send(&self, recipient: &str, subject: &str, body: &str) -> Result<(), NotifyError> {
        warn!("Email to {} | {} | {}", recipient, subject, body.replace('\n', " / "));
        Ok(())
    }
}
