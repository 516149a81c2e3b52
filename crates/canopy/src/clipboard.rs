use std::io::Write;

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;

use canopy_explorer::Clipboard;

/// OSC 52 escape asking the terminal to place `text` on the system clipboard.
pub fn osc52_sequence(text: &str) -> String {
    format!("\x1b]52;c;{}\x07", STANDARD.encode(text))
}

/// Clipboard backed by the hosting terminal.
#[derive(Debug, Default, Clone, Copy)]
pub struct TerminalClipboard;

#[async_trait]
impl Clipboard for TerminalClipboard {
    async fn write(&self, text: &str) -> std::io::Result<()> {
        let mut stdout = std::io::stdout().lock();
        stdout.write_all(osc52_sequence(text).as_bytes())?;
        stdout.flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sequence_wraps_base64_payload() {
        assert_eq!(
            osc52_sequence("/registry/pods"),
            "\x1b]52;c;L3JlZ2lzdHJ5L3BvZHM=\x07"
        );
    }
}
