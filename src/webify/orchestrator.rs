//! Batch artifact generation for a whole share.

use std::path::Path;
use std::sync::Arc;

use fileserve_av::{MediaClassifier, WebifyMode};
use fileserve_common::paths::is_video_file;
use fileserve_common::{Error, Result};
use fileserve_db::{ShareFile, ShareRepository};

use super::artifacts::{ArtifactKind, ArtifactStore};
use super::transcoder::{Generation, Transcoder};

/// What happens to the rest of a batch after an encode fails.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum BatchPolicy {
    #[default]
    ContinueOnError,
    FailFast,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileOutcome {
    Generated(ArtifactKind),
    AlreadyPresent(ArtifactKind),
    /// The file needs no artifact of this kind.
    NotNeeded,
    /// Not a video.
    Skipped,
    Failed { kind: ArtifactKind, reason: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileReport {
    pub reference: String,
    pub file_name: String,
    pub outcome: FileOutcome,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchReport {
    pub files: Vec<FileReport>,
}

impl BatchReport {
    pub fn generated(&self) -> usize {
        self.count(|o| matches!(o, FileOutcome::Generated(_)))
    }

    pub fn failed(&self) -> usize {
        self.count(|o| matches!(o, FileOutcome::Failed { .. }))
    }

    fn count(&self, pred: impl Fn(&FileOutcome) -> bool) -> usize {
        self.files.iter().filter(|f| pred(&f.outcome)).count()
    }

    fn push(&mut self, file: &ShareFile, outcome: FileOutcome) {
        self.files.push(FileReport {
            reference: file.reference.clone(),
            file_name: file.file_name.clone(),
            outcome,
        });
    }
}

pub struct WebifyOrchestrator {
    repository: Arc<dyn ShareRepository>,
    classifier: MediaClassifier,
    transcoder: Transcoder,
    policy: BatchPolicy,
}

impl WebifyOrchestrator {
    pub fn new(
        repository: Arc<dyn ShareRepository>,
        classifier: MediaClassifier,
        transcoder: Transcoder,
    ) -> Self {
        Self {
            repository,
            classifier,
            transcoder,
            policy: BatchPolicy::default(),
        }
    }

    pub fn with_policy(mut self, policy: BatchPolicy) -> Self {
        self.policy = policy;
        self
    }

    fn share_files(&self, share_id: i64) -> Result<Vec<ShareFile>> {
        if self.repository.share_by_id(share_id)?.is_none() {
            return Err(Error::not_found("share", share_id));
        }
        self.repository.files_of_share(share_id)
    }

    /// Make sure every video of the share has its stream or optimized copy.
    ///
    /// Probe and classification errors abort the batch. Encode failures are
    /// recorded per file and handled according to the [`BatchPolicy`].
    pub async fn ensure_artifacts(
        &self,
        share_id: i64,
        mut progress: impl FnMut(&str),
    ) -> Result<BatchReport> {
        let mut report = BatchReport::default();

        for file in self.share_files(share_id)? {
            let source = Path::new(&file.file_path);
            if !is_video_file(source) {
                report.push(&file, FileOutcome::Skipped);
                continue;
            }

            let kind = match self.classifier.classify_for_webify(source).await? {
                WebifyMode::Stream => ArtifactKind::Stream,
                WebifyMode::Optimized => ArtifactKind::Optimized,
            };
            self.produce(&file, kind, &mut report, &mut progress).await?;
        }

        Ok(report)
    }

    /// Generate missing previews for videos too heavy to view directly.
    pub async fn ensure_previews(
        &self,
        share_id: i64,
        mut progress: impl FnMut(&str),
    ) -> Result<BatchReport> {
        let mut report = BatchReport::default();

        for file in self.share_files(share_id)? {
            let source = Path::new(&file.file_path);
            if !is_video_file(source) {
                report.push(&file, FileOutcome::Skipped);
                continue;
            }

            if !self.classifier.classify_for_preview(source).await? {
                report.push(&file, FileOutcome::NotNeeded);
                continue;
            }
            self.produce(&file, ArtifactKind::Preview, &mut report, &mut progress)
                .await?;
        }

        Ok(report)
    }

    async fn produce(
        &self,
        file: &ShareFile,
        kind: ArtifactKind,
        report: &mut BatchReport,
        progress: &mut impl FnMut(&str),
    ) -> Result<()> {
        let marker = self.transcoder.artifacts().ready_marker(kind, &file.file_path);
        if ArtifactStore::exists(&marker).await {
            report.push(file, FileOutcome::AlreadyPresent(kind));
            return Ok(());
        }

        progress(&format!("Generating {} for {}", kind, file.file_name));
        match self.transcoder.generate(kind, &file.file_path).await {
            Ok(Generation::Generated) => report.push(file, FileOutcome::Generated(kind)),
            Ok(Generation::AlreadyPresent) => report.push(file, FileOutcome::AlreadyPresent(kind)),
            Err(e) => {
                tracing::error!("Failed to generate {} for {}: {}", kind, file.file_name, e);
                report.push(
                    file,
                    FileOutcome::Failed {
                        kind,
                        reason: e.to_string(),
                    },
                );
                if self.policy == BatchPolicy::FailFast {
                    return Err(e);
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use fileserve_av::fake::{video_metadata, FakeToolkit};
    use fileserve_av::EncodeSettings;
    use fileserve_db::pool::{get_conn, init_memory_pool};
    use fileserve_db::queries::{share_files, shares};
    use fileserve_db::SqliteShareRepository;

    struct Fixture {
        _dir: tempfile::TempDir,
        toolkit: Arc<FakeToolkit>,
        transcoder: Transcoder,
        repository: Arc<SqliteShareRepository>,
        share_id: i64,
    }

    impl Fixture {
        fn orchestrator(&self) -> WebifyOrchestrator {
            WebifyOrchestrator::new(
                self.repository.clone(),
                MediaClassifier::new(self.toolkit.clone()),
                self.transcoder.clone(),
            )
        }
    }

    /// A share with a long video, a short video, and a PDF.
    fn fixture() -> Fixture {
        let dir = tempfile::tempdir().unwrap();
        let media = dir.path().join("media");
        std::fs::create_dir(&media).unwrap();
        for name in ["long.mp4", "short.mp4", "doc.pdf"] {
            std::fs::write(media.join(name), b"x").unwrap();
        }

        let pool = init_memory_pool().unwrap();
        let share_id = {
            let conn = get_conn(&pool).unwrap();
            let share = shares::create_share(&conn, "Trip", None).unwrap();
            for name in ["long.mp4", "short.mp4", "doc.pdf"] {
                share_files::add_file_to_share(&conn, share.id, &media.join(name), None).unwrap();
            }
            share.id
        };

        let toolkit = Arc::new(
            FakeToolkit::new()
                .with_metadata("long.mp4", video_metadata(3840, 20_000_000, 600.0, 20_500_000))
                .with_metadata("short.mp4", video_metadata(1280, 2_000_000, 20.0, 2_100_000)),
        );
        let artifacts = ArtifactStore::new(
            dir.path().join("previews"),
            dir.path().join("web-optimized"),
            dir.path().join("streams"),
        );
        let transcoder = Transcoder::new(toolkit.clone(), artifacts, EncodeSettings::default());

        Fixture {
            _dir: dir,
            toolkit,
            transcoder,
            repository: Arc::new(SqliteShareRepository::new(pool)),
            share_id,
        }
    }

    fn outcomes(report: &BatchReport) -> Vec<(&str, &FileOutcome)> {
        report
            .files
            .iter()
            .map(|f| (f.file_name.as_str(), &f.outcome))
            .collect()
    }

    #[tokio::test]
    async fn webify_generates_per_classification() {
        let fx = fixture();
        let mut messages = Vec::new();

        let report = fx
            .orchestrator()
            .ensure_artifacts(fx.share_id, |m| messages.push(m.to_string()))
            .await
            .unwrap();

        assert_eq!(
            outcomes(&report),
            vec![
                ("long.mp4", &FileOutcome::Generated(ArtifactKind::Stream)),
                ("short.mp4", &FileOutcome::Generated(ArtifactKind::Optimized)),
                ("doc.pdf", &FileOutcome::Skipped),
            ]
        );
        assert_eq!(
            messages,
            vec![
                "Generating video stream for long.mp4",
                "Generating optimized video for short.mp4",
            ]
        );

        // Second pass is a no-op
        let again = fx.orchestrator().ensure_artifacts(fx.share_id, |_| {}).await.unwrap();
        assert_eq!(again.generated(), 0);
        assert_eq!(fx.toolkit.encode_count(), 2);
    }

    #[tokio::test]
    async fn previews_only_for_heavy_videos() {
        let fx = fixture();

        let report = fx
            .orchestrator()
            .ensure_previews(fx.share_id, |_| {})
            .await
            .unwrap();

        assert_eq!(
            outcomes(&report),
            vec![
                ("long.mp4", &FileOutcome::Generated(ArtifactKind::Preview)),
                ("short.mp4", &FileOutcome::NotNeeded),
                ("doc.pdf", &FileOutcome::Skipped),
            ]
        );
    }

    #[tokio::test]
    async fn encode_failures_follow_policy() {
        let fx = fixture();
        fx.toolkit.fail_encodes(true);

        let report = fx
            .orchestrator()
            .ensure_artifacts(fx.share_id, |_| {})
            .await
            .unwrap();
        assert_eq!(report.failed(), 2);
        assert_eq!(fx.toolkit.encode_count(), 2);

        let result = fx
            .orchestrator()
            .with_policy(BatchPolicy::FailFast)
            .ensure_artifacts(fx.share_id, |_| {})
            .await;
        assert_matches!(result, Err(Error::TranscodeFailed(_)));
        assert_eq!(fx.toolkit.encode_count(), 3);
    }

    #[tokio::test]
    async fn probe_failure_aborts_batch() {
        let fx = fixture();
        // Replace the short video's metadata with one missing the duration
        let mut meta = video_metadata(1280, 1, 1.0, 1);
        meta.duration = None;
        fx.toolkit.set_metadata("short.mp4", meta);

        let result = fx.orchestrator().ensure_artifacts(fx.share_id, |_| {}).await;
        assert_matches!(result, Err(Error::ProbeFailed(_)));
    }

    #[tokio::test]
    async fn unknown_share_is_not_found() {
        let fx = fixture();
        let result = fx.orchestrator().ensure_artifacts(9999, |_| {}).await;
        assert_matches!(result, Err(Error::NotFound { .. }));
    }
}
