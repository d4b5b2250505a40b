//! Announcement Resolver
//!
//! Picks how a call is voiced on the display boards. A valid clip on disk
//! is played directly. Otherwise each speech synthesizer is tried in turn,
//! and when all of them fail the displays are told to speak the phrase
//! themselves.

use async_trait::async_trait;
use chrono::Utc;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use qcall::domain::services::announcement::{announcement_phrase, clip_filename};
use qcall::{
    AnnouncementPayload, AnnouncementType, Announcer, BroadcastEvent, Broadcaster, DomainError,
    EventName, SpeechSynthesizer,
};

/// Clip formats a synthesizer may leave behind, in lookup order
const CLIP_EXTENSIONS: [&str; 2] = ["mp3", "wav"];

/// Resolver configuration
#[derive(Debug, Clone)]
pub struct ResolverConfig {
    /// Directory holding rendered clips
    pub audio_dir: PathBuf,
    /// URL prefix the clips are served under
    pub public_path: String,
    /// Files at or below this size are treated as broken
    pub min_clip_bytes: u64,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            audio_dir: PathBuf::from("./public/audio"),
            public_path: "/audio".to_string(),
            min_clip_bytes: 1000,
        }
    }
}

pub struct AnnouncementResolver {
    synthesizers: Vec<Arc<dyn SpeechSynthesizer>>,
    broadcaster: Arc<dyn Broadcaster>,
    config: ResolverConfig,
}

impl AnnouncementResolver {
    /// Synthesizers are tried in the given order
    pub fn new(
        synthesizers: Vec<Arc<dyn SpeechSynthesizer>>,
        broadcaster: Arc<dyn Broadcaster>,
        config: Option<ResolverConfig>,
    ) -> Self {
        Self {
            synthesizers,
            broadcaster,
            config: config.unwrap_or_default(),
        }
    }

    fn audio_url(&self, filename: &str) -> String {
        format!(
            "{}/{}",
            self.config.public_path.trim_end_matches('/'),
            filename
        )
    }

    async fn is_valid_clip(&self, path: &Path) -> bool {
        match tokio::fs::metadata(path).await {
            Ok(meta) => meta.is_file() && meta.len() > self.config.min_clip_bytes,
            Err(_) => false,
        }
    }

    /// A valid clip for `target` in any known format
    async fn existing_clip(&self, target: &Path) -> Option<PathBuf> {
        for extension in CLIP_EXTENSIONS {
            let candidate = target.with_extension(extension);
            if self.is_valid_clip(&candidate).await {
                return Some(candidate);
            }
        }
        None
    }

    async fn discard(path: &Path) {
        if let Err(e) = tokio::fs::remove_file(path).await {
            if e.kind() != std::io::ErrorKind::NotFound {
                tracing::warn!(path = %path.display(), "Failed to remove invalid clip: {}", e);
            }
        }
    }

    /// Run the synthesizers in order until one leaves a valid clip.
    ///
    /// The clip keeps the extension the synthesizer wrote, so a WAV renderer
    /// never ends up behind an `.mp3` name.
    async fn generate(&self, phrase: &str, target: &Path) -> Result<PathBuf, DomainError> {
        tokio::fs::create_dir_all(&self.config.audio_dir)
            .await
            .map_err(|e| {
                DomainError::ExternalService(format!(
                    "Cannot create audio dir {}: {}",
                    self.config.audio_dir.display(),
                    e
                ))
            })?;

        let mut last_error = None;
        for synthesizer in &self.synthesizers {
            let attempt = tokio::time::timeout(
                synthesizer.timeout(),
                synthesizer.attempt(phrase, target),
            )
            .await;

            let error = match attempt {
                Ok(Ok(written)) => {
                    if self.is_valid_clip(&written).await {
                        let clip = match written.extension() {
                            Some(extension) => target.with_extension(extension),
                            None => target.to_path_buf(),
                        };
                        if written != clip {
                            tokio::fs::rename(&written, &clip).await.map_err(|e| {
                                DomainError::ExternalService(format!("Cannot move clip: {}", e))
                            })?;
                        }
                        tracing::info!(
                            synthesizer = synthesizer.name(),
                            path = %clip.display(),
                            "🔊 Announcement clip generated"
                        );
                        return Ok(clip);
                    }
                    Self::discard(&written).await;
                    DomainError::ExternalService(format!(
                        "{} produced an undersized clip",
                        synthesizer.name()
                    ))
                }
                Ok(Err(e)) => e,
                Err(_) => DomainError::Timeout(format!(
                    "{} exceeded {:?}",
                    synthesizer.name(),
                    synthesizer.timeout()
                )),
            };

            tracing::warn!(synthesizer = synthesizer.name(), "Speech synthesis failed: {}", error);
            Self::discard(target).await;
            last_error = Some(error);
        }

        Err(last_error
            .unwrap_or_else(|| DomainError::ExternalService("No speech synthesizer configured".into())))
    }

    fn emit(&self, payload: AnnouncementPayload) {
        match serde_json::to_value(&payload) {
            Ok(value) => self
                .broadcaster
                .emit(BroadcastEvent::global(EventName::UrduVoiceAnnouncement, value)),
            Err(e) => tracing::error!("Failed to serialize announcement: {}", e),
        }
    }

    /// Voice a call and report whether a clip was used
    pub async fn resolve_and_broadcast(
        &self,
        ticket_number: &str,
        counter_number: i32,
        is_recall: bool,
    ) -> bool {
        let filename = clip_filename(ticket_number, counter_number);
        let target = self.config.audio_dir.join(&filename);
        let phrase = announcement_phrase(ticket_number, counter_number, is_recall);

        let clip = match self.existing_clip(&target).await {
            Some(existing) => {
                tracing::debug!(ticket = %ticket_number, clip = %existing.display(), "Reusing announcement clip");
                Some(existing)
            }
            None => match self.generate(&phrase, &target).await {
                Ok(generated) => Some(generated),
                Err(e) => {
                    tracing::warn!(
                        ticket = %ticket_number,
                        "All speech synthesizers failed, falling back to live speech: {}",
                        e
                    );
                    None
                }
            },
        };

        let clip_name = clip
            .as_deref()
            .and_then(Path::file_name)
            .map(|name| name.to_string_lossy().into_owned());
        let clip_ready = clip_name.is_some();
        let (kind, audio_url) = match clip_name {
            Some(name) => (AnnouncementType::Mp3Announcement, Some(self.audio_url(&name))),
            None => (AnnouncementType::TtsAnnouncement, None),
        };

        self.emit(AnnouncementPayload {
            kind,
            audio_url,
            message: Some(phrase),
            ticket_number: ticket_number.to_string(),
            counter_number,
            is_recall,
            timestamp: Utc::now(),
        });

        clip_ready
    }
}

#[async_trait]
impl Announcer for AnnouncementResolver {
    async fn announce(
        &self,
        ticket_number: &str,
        counter_number: i32,
        is_recall: bool,
    ) -> Result<bool, DomainError> {
        Ok(self
            .resolve_and_broadcast(ticket_number, counter_number, is_recall)
            .await)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::RecordingBroadcaster;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    /// Writes `size` bytes, or fails when `size` is `None`
    struct FakeSynth {
        name: &'static str,
        size: Option<usize>,
        attempts: AtomicUsize,
    }

    impl FakeSynth {
        fn new(name: &'static str, size: Option<usize>) -> Arc<Self> {
            Arc::new(Self {
                name,
                size,
                attempts: AtomicUsize::new(0),
            })
        }

        fn attempts(&self) -> usize {
            self.attempts.load(Ordering::SeqCst)
        }
    }

    fn as_dyn(synth: &Arc<FakeSynth>) -> Arc<dyn SpeechSynthesizer> {
        synth.clone()
    }

    #[async_trait]
    impl SpeechSynthesizer for FakeSynth {
        fn name(&self) -> &str {
            self.name
        }

        fn timeout(&self) -> Duration {
            Duration::from_secs(1)
        }

        async fn attempt(&self, _text: &str, target: &Path) -> Result<PathBuf, DomainError> {
            self.attempts.fetch_add(1, Ordering::SeqCst);
            match self.size {
                Some(size) => {
                    tokio::fs::write(target, vec![0u8; size]).await.unwrap();
                    Ok(target.to_path_buf())
                }
                None => Err(DomainError::ExternalService(format!("{} offline", self.name))),
            }
        }
    }

    /// Renders WAV next to the requested target, like espeak-ng does
    struct WavSynth {
        attempts: AtomicUsize,
    }

    #[async_trait]
    impl SpeechSynthesizer for WavSynth {
        fn name(&self) -> &str {
            "wav"
        }

        fn timeout(&self) -> Duration {
            Duration::from_secs(1)
        }

        async fn attempt(&self, _text: &str, target: &Path) -> Result<PathBuf, DomainError> {
            self.attempts.fetch_add(1, Ordering::SeqCst);
            let wav = target.with_extension("wav");
            tokio::fs::write(&wav, vec![0u8; 3000]).await.unwrap();
            Ok(wav)
        }
    }

    struct Hanging;

    #[async_trait]
    impl SpeechSynthesizer for Hanging {
        fn name(&self) -> &str {
            "hanging"
        }

        fn timeout(&self) -> Duration {
            Duration::from_millis(20)
        }

        async fn attempt(&self, _text: &str, _target: &Path) -> Result<PathBuf, DomainError> {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Err(DomainError::ExternalService("unreachable".into()))
        }
    }

    fn resolver(
        dir: &Path,
        synthesizers: Vec<Arc<dyn SpeechSynthesizer>>,
        broadcaster: Arc<RecordingBroadcaster>,
    ) -> AnnouncementResolver {
        AnnouncementResolver::new(
            synthesizers,
            broadcaster,
            Some(ResolverConfig {
                audio_dir: dir.join("audio"),
                public_path: "/audio".to_string(),
                min_clip_bytes: 1000,
            }),
        )
    }

    fn last_payload(broadcaster: &RecordingBroadcaster) -> AnnouncementPayload {
        let event = broadcaster
            .named(EventName::UrduVoiceAnnouncement)
            .pop()
            .unwrap();
        serde_json::from_value(event.payload).unwrap()
    }

    #[tokio::test]
    async fn test_existing_clip_takes_fast_path() {
        let dir = tempfile::tempdir().unwrap();
        let audio = dir.path().join("audio");
        std::fs::create_dir_all(&audio).unwrap();
        std::fs::write(audio.join("A001-counter3.mp3"), vec![1u8; 4096]).unwrap();

        let synth = FakeSynth::new("http", Some(4096));
        let broadcaster = Arc::new(RecordingBroadcaster::new());
        let resolver = resolver(dir.path(), vec![as_dyn(&synth)], broadcaster.clone());

        assert!(resolver.resolve_and_broadcast("A001", 3, false).await);
        assert_eq!(synth.attempts(), 0);

        let payload = last_payload(&broadcaster);
        assert_eq!(payload.kind, AnnouncementType::Mp3Announcement);
        assert_eq!(payload.audio_url.as_deref(), Some("/audio/A001-counter3.mp3"));
        assert_eq!(payload.counter_number, 3);
        assert!(!payload.is_recall);
    }

    #[tokio::test]
    async fn test_generated_clip_is_reused() {
        let dir = tempfile::tempdir().unwrap();
        let synth = FakeSynth::new("http", Some(2048));
        let broadcaster = Arc::new(RecordingBroadcaster::new());
        let resolver = resolver(dir.path(), vec![as_dyn(&synth)], broadcaster.clone());

        assert!(resolver.resolve_and_broadcast("B002", 1, false).await);
        assert!(resolver.resolve_and_broadcast("B002", 1, true).await);

        assert_eq!(synth.attempts(), 1);
        assert_eq!(broadcaster.count(EventName::UrduVoiceAnnouncement), 2);
        assert!(dir.path().join("audio/B002-counter1.mp3").exists());
    }

    #[tokio::test]
    async fn test_falls_through_to_next_synthesizer() {
        let dir = tempfile::tempdir().unwrap();
        let broken = FakeSynth::new("http", None);
        let undersized = FakeSynth::new("tiny", Some(10));
        let local = FakeSynth::new("local", Some(1500));
        let broadcaster = Arc::new(RecordingBroadcaster::new());
        let resolver = resolver(
            dir.path(),
            vec![
                Arc::new(Hanging) as Arc<dyn SpeechSynthesizer>,
                as_dyn(&broken),
                as_dyn(&undersized),
                as_dyn(&local),
            ],
            broadcaster.clone(),
        );

        assert!(resolver.resolve_and_broadcast("C003", 2, false).await);

        assert_eq!(broken.attempts(), 1);
        assert_eq!(undersized.attempts(), 1);
        assert_eq!(local.attempts(), 1);
        let clip = dir.path().join("audio/C003-counter2.mp3");
        assert_eq!(std::fs::metadata(clip).unwrap().len(), 1500);
        assert_eq!(
            last_payload(&broadcaster).kind,
            AnnouncementType::Mp3Announcement
        );
    }

    #[tokio::test]
    async fn test_all_failures_fall_back_to_live_speech() {
        let dir = tempfile::tempdir().unwrap();
        let broadcaster = Arc::new(RecordingBroadcaster::new());
        let resolver = resolver(
            dir.path(),
            vec![
                as_dyn(&FakeSynth::new("http", None)),
                as_dyn(&FakeSynth::new("tiny", Some(5))),
            ],
            broadcaster.clone(),
        );

        assert!(!resolver.resolve_and_broadcast("D004", 6, true).await);

        let payload = last_payload(&broadcaster);
        assert_eq!(payload.kind, AnnouncementType::TtsAnnouncement);
        assert!(payload.audio_url.is_none());
        assert_eq!(
            payload.message,
            Some(announcement_phrase("D004", 6, true))
        );
        assert!(payload.is_recall);
        assert!(!dir.path().join("audio/D004-counter6.mp3").exists());
    }

    #[tokio::test]
    async fn test_announcer_port_reports_clip_usage() {
        let dir = tempfile::tempdir().unwrap();
        let broadcaster = Arc::new(RecordingBroadcaster::new());
        let announcer: Arc<dyn Announcer> = Arc::new(resolver(
            dir.path(),
            Vec::new(),
            broadcaster.clone(),
        ));

        assert!(!announcer.announce("E005", 1, false).await.unwrap());
        assert_eq!(broadcaster.count(EventName::UrduVoiceAnnouncement), 1);
    }

    #[tokio::test]
    async fn test_wav_clip_keeps_its_extension() {
        let dir = tempfile::tempdir().unwrap();
        let synth = Arc::new(WavSynth {
            attempts: AtomicUsize::new(0),
        });
        let broadcaster = Arc::new(RecordingBroadcaster::new());
        let resolver = resolver(
            dir.path(),
            vec![synth.clone() as Arc<dyn SpeechSynthesizer>],
            broadcaster.clone(),
        );

        assert!(resolver.resolve_and_broadcast("F006", 2, false).await);
        assert_eq!(
            last_payload(&broadcaster).audio_url.as_deref(),
            Some("/audio/F006-counter2.wav")
        );
        assert!(dir.path().join("audio/F006-counter2.wav").exists());
        assert!(!dir.path().join("audio/F006-counter2.mp3").exists());

        assert!(resolver.resolve_and_broadcast("F006", 2, true).await);
        assert_eq!(synth.attempts.load(Ordering::SeqCst), 1);
        assert_eq!(
            last_payload(&broadcaster).audio_url.as_deref(),
            Some("/audio/F006-counter2.wav")
        );
    }
}
