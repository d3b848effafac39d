use async_trait::async_trait;

use super::traits::KeyboardSink;
use super::SinkError;

/// Keyboard output that only records the key press in the log.
///
/// Used when no platform key injector is wired in.
#[derive(Debug, Default)]
pub struct LogKeyboardSink;

#[async_trait]
impl KeyboardSink for LogKeyboardSink {
    async fn press_key(&self, code: i32) -> Result<(), SinkError> {
        log::info!("virtual key press: code {}", code);
        Ok(())
    }
}
