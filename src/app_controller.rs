use anyhow::{anyhow, Context, Result};
use log::{debug, error, info, warn};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};

use crate::app_config::Config;
use crate::container::{DocumentContainer, EpubContainer};
use crate::file_utils::{FileManager, FileType};
use crate::translation::{
    ConcurrentOrchestrator, FragmentTranslationTask, OrchestrationReport, RetryPolicy,
    RetryingTranslator, TranslatedFragment, TranslationService, Translator,
};

// @module: Application controller for book translation

/// Name of the file collecting documents that kept their original text
pub const ISSUES_LOG_FILE: &str = "epubwai.issues.log";

/// Result of translating one book
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    /// The output already existed and overwriting was not requested
    Skipped { output_path: PathBuf },
    /// The book was translated and saved
    Completed { output_path: PathBuf, report: OrchestrationReport },
}

/// Totals of a folder run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FolderSummary {
    pub processed: usize,
    pub skipped: usize,
    pub errors: usize,
}

/// Main application controller for book translation
pub struct Controller {
    // @field: App configuration
    config: Config,
    // @field: Translator override; a provider-backed service is built per run when absent
    translator: Option<Arc<dyn Translator>>,
}

impl Controller {
    // @method: Create a new controller with the given configuration
    pub fn with_config(config: Config) -> Result<Self> {
        Ok(Self {
            config,
            translator: None,
        })
    }

    // @method: Create a controller that uses the given translator instead of a provider
    pub fn with_translator(config: Config, translator: Arc<dyn Translator>) -> Self {
        Self {
            config,
            translator: Some(translator),
        }
    }

    /// Configuration in use
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Output path for a book
    pub fn output_path_for(&self, input_file: &Path, output_dir: &Path) -> PathBuf {
        FileManager::generate_output_path(input_file, output_dir, &self.config.output_suffix())
    }

    /// Translate one book into `output_dir`
    pub async fn run(&self, input_file: PathBuf, output_dir: PathBuf, force_overwrite: bool) -> Result<RunOutcome> {
        let multi_progress = MultiProgress::new();
        self.run_with_progress(&input_file, &output_dir, &multi_progress, force_overwrite).await
    }

    /// Run the six stages for one book with progress reporting
    async fn run_with_progress(
        &self,
        input_file: &Path,
        output_dir: &Path,
        multi_progress: &MultiProgress,
        force_overwrite: bool,
    ) -> Result<RunOutcome> {
        let start_time = Instant::now();

        // 1. Check input and output
        match FileManager::detect_file_type(input_file)? {
            FileType::Epub => {}
            FileType::Directory => return Err(anyhow!("Expected an EPUB file, got a directory: {:?}", input_file)),
            FileType::Unknown => return Err(anyhow!("Not an EPUB file: {:?}", input_file)),
        }

        let output_path = self.output_path_for(input_file, output_dir);
        if output_path.exists() && !force_overwrite {
            warn!("Skipping {}, translation already exists (use -f to force overwrite)", output_path.display());
            return Ok(RunOutcome::Skipped { output_path });
        }

        // 2. Load the book
        let mut container = EpubContainer::open(input_file)
            .with_context(|| format!("Failed to load book: {:?}", input_file))?;
        let fragments = container.list_fragments();
        info!("Loaded {} with {} documents", input_file.display(), fragments.len());

        // 3. Build the translator
        let (translator, service) = self.build_translator().await?;
        let retrying = RetryingTranslator::new(
            translator,
            RetryPolicy::new(self.config.translation.common.retry_count)
                .with_backoff_ms(self.config.translation.common.retry_backoff_ms),
        );
        let orchestrator = ConcurrentOrchestrator::new(
            FragmentTranslationTask::new(retrying),
            self.config.translation.common.workers,
        );

        // 4. Translate concurrently
        let translation_start = Instant::now();
        let progress_bar = multi_progress.add(ProgressBar::new(fragments.len() as u64));
        progress_bar.set_style(Self::progress_style("documents"));
        progress_bar.set_message("Translating");

        let pb = progress_bar.clone();
        let translated = orchestrator
            .run_with_progress(&fragments, move |completed, _total| pb.set_position(completed as u64))
            .await;
        progress_bar.finish_and_clear();
        let translation_elapsed = translation_start.elapsed();

        let report = OrchestrationReport::from_results(&translated);
        if report.failures() > 0 {
            self.write_issues(&translated, input_file, output_dir);
        }

        // 5. Apply translations
        let updated = container.apply_translated_fragments(&translated);
        if updated != translated.len() {
            warn!("Only {} of {} documents could be written back", updated, translated.len());
        }

        // 6. Save
        FileManager::ensure_dir(output_dir)?;
        container.save(&output_path)
            .with_context(|| format!("Failed to save book: {:?}", output_path))?;

        info!(
            "Translated {} of {} documents ({} partial, {} without text, {} kept original) in {} (total {})",
            report.translated + report.partial,
            report.total,
            report.partial,
            report.no_text,
            report.failures(),
            Self::format_duration(translation_elapsed),
            Self::format_duration(start_time.elapsed())
        );
        if let Some(service) = service {
            let usage = service.token_usage();
            if usage.requests > 0 {
                info!("{}", usage.summary());
            }
        }
        info!("Success: {}", output_path.display());

        Ok(RunOutcome::Completed { output_path, report })
    }

    /// Translator override, or a provider-backed service for this run
    async fn build_translator(&self) -> Result<(Arc<dyn Translator>, Option<Arc<TranslationService>>)> {
        if let Some(translator) = &self.translator {
            return Ok((Arc::clone(translator), None));
        }

        let service = Arc::new(TranslationService::new(
            self.config.translation.clone(),
            &self.config.source_language,
            &self.config.target_language,
        )?);

        info!(
            "Using {} - {}",
            self.config.translation.provider.display_name(),
            self.config.translation.get_model()
        );
        // Failures here surface again per document, so they are not fatal
        if let Err(e) = service.test_connection().await {
            warn!("Connection test failed: {:#}", e);
        }

        let translator: Arc<dyn Translator> = service.clone();
        Ok((translator, Some(service)))
    }

    /// Record documents that kept their original content
    fn write_issues(&self, translated: &[TranslatedFragment], input_file: &Path, output_dir: &Path) {
        let log_path = output_dir.join(ISSUES_LOG_FILE);
        let book = input_file.file_name()
            .map(|name| name.to_string_lossy().to_string())
            .unwrap_or_else(|| input_file.display().to_string());

        for fragment in translated.iter().filter(|f| f.outcome.is_failure()) {
            let line = format!("{} - {} ({}): {}", book, fragment.href, fragment.id, fragment.outcome);
            if let Err(e) = FileManager::append_to_log_file(&log_path, &line) {
                warn!("Failed to write issues log: {}", e);
                return;
            }
        }
        info!("Documents kept in the original are listed in {}", log_path.display());
    }

    fn progress_style(unit: &str) -> ProgressStyle {
        ProgressStyle::default_bar()
            .template(&format!(
                "{{spinner:.green}} [{{elapsed_precise}}] [{{bar:40.cyan/blue}}] {{pos}}/{{len}} {} ({{percent}}%) {{msg}} {{eta}}",
                unit
            ))
            .or_else(|_| ProgressStyle::default_bar().template("{spinner} [{elapsed_precise}] [{bar:40}] {pos}/{len} ({percent}%) {msg}"))
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("█▓▒░")
    }

    // Format duration in a human-readable format
    pub fn format_duration(duration: Duration) -> String {
        let total_seconds = duration.as_secs();
        let hours = total_seconds / 3600;
        let minutes = (total_seconds % 3600) / 60;
        let seconds = total_seconds % 60;

        if hours > 0 {
            format!("{}h {}m {}s", hours, minutes, seconds)
        } else if minutes > 0 {
            format!("{}m {}s", minutes, seconds)
        } else {
            format!("{}.{:03}s", seconds, duration.subsec_millis())
        }
    }

    /// Translate every EPUB under `input_dir` into `output_dir`, mirroring
    /// subdirectories. Books that already carry the output suffix are not picked up.
    pub async fn run_folder(&self, input_dir: PathBuf, output_dir: PathBuf, force_overwrite: bool) -> Result<FolderSummary> {
        let start_time = Instant::now();

        if !FileManager::dir_exists(&input_dir) {
            return Err(anyhow!("Input directory does not exist: {:?}", input_dir));
        }

        let suffix = self.config.output_suffix();
        let books: Vec<PathBuf> = FileManager::find_files(&input_dir, "epub")?
            .into_iter()
            .filter(|path| !FileManager::is_translated_output(path, &suffix))
            .collect();

        if books.is_empty() {
            return Err(anyhow!("No EPUB files found in directory: {:?}", input_dir));
        }

        let multi_progress = MultiProgress::new();
        let folder_pb = multi_progress.add(ProgressBar::new(books.len() as u64));
        folder_pb.set_style(Self::progress_style("books"));
        folder_pb.set_message("Processing files");

        let mut summary = FolderSummary::default();
        for book in &books {
            let file_name = book.file_name()
                .map(|f| f.to_string_lossy().to_string())
                .unwrap_or_else(|| "unknown".to_string());
            folder_pb.set_message(format!("Processing: {}", file_name));

            // Books keep their place in the tree, so same-named books never share an output path
            let book_output_dir = book
                .parent()
                .and_then(|parent| parent.strip_prefix(&input_dir).ok())
                .map(|relative| output_dir.join(relative))
                .unwrap_or_else(|| output_dir.clone());

            match self.run_with_progress(book, &book_output_dir, &multi_progress, force_overwrite).await {
                Ok(RunOutcome::Completed { .. }) => summary.processed += 1,
                Ok(RunOutcome::Skipped { .. }) => summary.skipped += 1,
                Err(e) => {
                    error!("Error processing file {}: {:#}", file_name, e);
                    summary.errors += 1;
                }
            }
            folder_pb.inc(1);
        }

        folder_pb.finish_with_message("Folder processing complete");
        info!(
            "Folder processing completed: {} processed, {} skipped, {} errors in {}",
            summary.processed,
            summary.skipped,
            summary.errors,
            Self::format_duration(start_time.elapsed())
        );
        debug!("Folder summary: {:?}", summary);

        Ok(summary)
    }
}
