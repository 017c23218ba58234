use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

use log::debug;
use parking_lot::Mutex;

use crate::utils::parallel::CancellationToken;
use crate::utils::process::ToolCommand;

/// Answers whether the encoder binary ships a named encoder implementation.
pub trait EncoderSupport: Send + Sync {
    fn supports(&self, encoder: &str) -> bool;
}

/// Memoized `ffmpeg -h encoder=<name>` checks, shared by every worker of a run.
pub struct EncoderCapabilities {
    encoder_path: PathBuf,
    timeout: Option<Duration>,
    cancel: CancellationToken,
    cache: Mutex<HashMap<String, bool>>,
}

impl EncoderCapabilities {
    pub fn new(
        encoder_path: impl Into<PathBuf>,
        timeout: Option<Duration>,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            encoder_path: encoder_path.into(),
            timeout,
            cancel,
            cache: Mutex::new(HashMap::new()),
        }
    }

    pub fn cached(&self, encoder: &str) -> Option<bool> {
        self.cache.lock().get(encoder).copied()
    }

    fn probe(&self, encoder: &str) -> bool {
        let marker = format!("Encoder {}", encoder);
        let result = ToolCommand::new(&self.encoder_path)
            .args(["-h".to_string(), format!("encoder={}", encoder)])
            .timeout(self.timeout)
            .cancel_on(&self.cancel)
            .output();

        match result {
            Ok(output) => output.status.success() && output.combined().contains(&marker),
            Err(e) => {
                debug!("capability check for {} failed: {}", encoder, e);
                false
            }
        }
    }
}

impl EncoderSupport for EncoderCapabilities {
    fn supports(&self, encoder: &str) -> bool {
        // The lock is held across the probe so concurrent workers asking for
        // the same encoder trigger a single invocation.
        let mut cache = self.cache.lock();
        if let Some(&known) = cache.get(encoder) {
            return known;
        }

        let available = self.probe(encoder);
        debug!("encoder {} available: {}", encoder, available);
        cache.insert(encoder.to_string(), available);
        available
    }
}
