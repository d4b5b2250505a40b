//! Speech Synthesis Adapters
//!
//! `GoogleTranslateTts` renders through the public translate TTS endpoint.
//! `SystemSpeech` shells out to the local speech engine.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::io::AsyncWriteExt;

use qcall::{DomainError, SpeechSynthesizer};

use super::process::{self, powershell_quote};

const TRANSLATE_TTS_URL: &str = "https://translate.google.com/translate_tts";

/// HTTPS speech synthesis via the translate TTS endpoint
pub struct GoogleTranslateTts {
    client: reqwest::Client,
    endpoint: String,
    language: String,
    timeout: Duration,
}

impl GoogleTranslateTts {
    pub fn new(language: impl Into<String>, timeout: Duration) -> Result<Self, DomainError> {
        let client = reqwest::Client::builder()
            .connect_timeout(timeout)
            .timeout(timeout)
            .user_agent("Mozilla/5.0 (qcall announcement renderer)")
            .build()
            .map_err(|e| DomainError::ExternalService(format!("HTTP client: {}", e)))?;

        Ok(Self {
            client,
            endpoint: TRANSLATE_TTS_URL.to_string(),
            language: language.into(),
            timeout,
        })
    }

    /// Point at another compatible endpoint
    #[cfg(test)]
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }
}

#[async_trait]
impl SpeechSynthesizer for GoogleTranslateTts {
    fn name(&self) -> &str {
        "google-translate-tts"
    }

    fn timeout(&self) -> Duration {
        self.timeout
    }

    async fn attempt(&self, text: &str, target: &Path) -> Result<PathBuf, DomainError> {
        let mut response = self
            .client
            .get(&self.endpoint)
            .query(&[
                ("ie", "UTF-8"),
                ("q", text),
                ("tl", self.language.as_str()),
                ("client", "tw-ob"),
            ])
            .send()
            .await
            .map_err(|e| DomainError::ExternalService(format!("TTS request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(DomainError::ExternalService(format!(
                "TTS endpoint returned {}",
                status
            )));
        }

        let mut file = tokio::fs::File::create(target)
            .await
            .map_err(|e| DomainError::ExternalService(format!("Cannot create clip: {}", e)))?;

        while let Some(chunk) = response
            .chunk()
            .await
            .map_err(|e| DomainError::ExternalService(format!("TTS stream failed: {}", e)))?
        {
            file.write_all(&chunk)
                .await
                .map_err(|e| DomainError::ExternalService(format!("Cannot write clip: {}", e)))?;
        }
        file.flush()
            .await
            .map_err(|e| DomainError::ExternalService(format!("Cannot write clip: {}", e)))?;

        tracing::debug!(path = %target.display(), "TTS clip downloaded");
        Ok(target.to_path_buf())
    }
}

/// Local OS speech engine: PowerShell System.Speech on Windows,
/// `espeak-ng` elsewhere. Both render WAV, so the clip lands next to the
/// requested target with a `.wav` extension.
pub struct SystemSpeech {
    voice: String,
    timeout: Duration,
}

impl SystemSpeech {
    pub fn new(voice: impl Into<String>, timeout: Duration) -> Self {
        Self {
            voice: voice.into(),
            timeout,
        }
    }

    fn wave_path(target: &Path) -> PathBuf {
        target.with_extension("wav")
    }

    fn command(&self, text: &str, target: &Path) -> (&'static str, Vec<String>) {
        let target = Self::wave_path(target).display().to_string();

        if cfg!(windows) {
            let script = format!(
                "Add-Type -AssemblyName System.Speech; \
                 $s = New-Object System.Speech.Synthesis.SpeechSynthesizer; \
                 $s.SetOutputToWaveFile({}); $s.Speak({}); $s.Dispose()",
                powershell_quote(&target),
                powershell_quote(text)
            );
            (
                "powershell",
                vec![
                    "-NoProfile".to_string(),
                    "-NonInteractive".to_string(),
                    "-Command".to_string(),
                    script,
                ],
            )
        } else {
            (
                "espeak-ng",
                vec![
                    "-v".to_string(),
                    self.voice.clone(),
                    "-w".to_string(),
                    target,
                    text.to_string(),
                ],
            )
        }
    }
}

#[async_trait]
impl SpeechSynthesizer for SystemSpeech {
    fn name(&self) -> &str {
        "system-speech"
    }

    fn timeout(&self) -> Duration {
        self.timeout
    }

    async fn attempt(&self, text: &str, target: &Path) -> Result<PathBuf, DomainError> {
        let (program, args) = self.command(text, target);
        process::run(program, &args, None).await?;
        Ok(Self::wave_path(target))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[cfg(not(windows))]
    #[test]
    fn test_espeak_command_writes_wav_beside_target() {
        let speech = SystemSpeech::new("ur", Duration::from_secs(5));
        let (program, args) = speech.command("ٹکٹ", Path::new("/tmp/A001-counter1.mp3"));

        assert_eq!(program, "espeak-ng");
        assert_eq!(
            args,
            vec!["-v", "ur", "-w", "/tmp/A001-counter1.wav", "ٹکٹ"]
        );
        assert_eq!(
            SystemSpeech::wave_path(Path::new("/tmp/A001-counter1.mp3")),
            PathBuf::from("/tmp/A001-counter1.wav")
        );
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_fails_without_file() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("clip.mp3");
        let tts = GoogleTranslateTts::new("ur", Duration::from_millis(500))
            .unwrap()
            .with_endpoint("http://127.0.0.1:9/translate_tts");

        let err = tts.attempt("A", &target).await.unwrap_err();

        assert!(matches!(err, DomainError::ExternalService(_)));
        assert!(!target.exists());
    }
}
