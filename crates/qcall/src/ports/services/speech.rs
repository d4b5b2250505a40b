//! Speech Synthesis Port
//!
//! One strategy per way of turning a phrase into an audio file. The
//! announcement resolver tries them in order until one produces a clip.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::domain::errors::DomainError;

/// Speech synthesis strategy
///
/// # Example
///
/// ```rust,ignore
/// use qcall::ports::SpeechSynthesizer;
///
/// struct Espeak;
///
/// #[async_trait]
/// impl SpeechSynthesizer for Espeak {
///     fn name(&self) -> &str { "espeak" }
///     async fn attempt(&self, text: &str, target: &Path) -> Result<PathBuf, DomainError> {
///         // run espeak-ng -w <target> <text>
///     }
/// }
/// ```
#[async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    /// Strategy name for logs
    fn name(&self) -> &str;

    /// Upper bound for one attempt
    fn timeout(&self) -> Duration {
        Duration::from_secs(15)
    }

    /// Render `text` into `target`, returning the written path
    async fn attempt(&self, text: &str, target: &Path) -> Result<PathBuf, DomainError>;
}
