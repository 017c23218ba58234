//! Fans discovered files out over a fixed set of workers and collects one
//! outcome per file.

use std::sync::atomic::Ordering;

use crossbeam::channel;
use log::{debug, info};

use crate::audio::discovery::{AudioFile, FileDiscoverer};
use crate::audio::metadata::MetadataExtractor;
use crate::codec::capabilities::EncoderCapabilities;
use crate::pipeline::task::{ConversionOutcome, ConversionTask};
use crate::utils::file_ops::FileManager;
use crate::utils::parallel::{CancellationToken, ParallelProcessor};
use crate::utils::reporting::{Reporter, RunSummary};
use crate::{ConversionJob, ConvertError, Result};

pub struct Dispatcher {
    job: ConversionJob,
    cancel: CancellationToken,
}

impl ParallelProcessor for Dispatcher {}

impl Dispatcher {
    pub fn new(job: ConversionJob) -> Self {
        Self::with_cancellation(job, CancellationToken::new())
    }

    pub fn with_cancellation(job: ConversionJob, cancel: CancellationToken) -> Self {
        Self { job, cancel }
    }

    pub fn job(&self) -> &ConversionJob {
        &self.job
    }

    /// Token that stops the run: no further files are started and running
    /// tools are killed.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Convert every audio file under the input root.
    ///
    /// Only run-level problems (missing input root, uncreatable output root,
    /// traversal errors) are returned as `Err`; per-file failures end up in
    /// the summary.
    pub fn run(&self) -> Result<RunSummary> {
        let job = &self.job;
        if !job.input_root.is_dir() {
            return Err(ConvertError::InputNotFound(job.input_root.clone()));
        }
        FileManager::new(&job.output_root).ensure_directory(&job.output_root)?;

        let files = FileDiscoverer::discover(&job.input_root)?;
        if files.is_empty() {
            println!("No audio files found in input directory");
            return Ok(RunSummary::default());
        }

        println!("Found {} audio files", files.len());
        let total = files.len();
        let outcomes = self.process_files(files)?;
        Ok(Reporter::new().summarize(total, outcomes))
    }

    /// Run the conversion task over `files` on a dedicated pool and wait for
    /// every worker to finish.
    pub fn process_files(&self, files: Vec<AudioFile>) -> Result<Vec<(AudioFile, ConversionOutcome)>> {
        let total = files.len();
        if total == 0 {
            return Ok(Vec::new());
        }

        let workers = self.job.worker_count().min(total);
        let capabilities = EncoderCapabilities::new(
            &self.job.encoder_path,
            self.job.timeout,
            self.cancel.clone(),
        );
        let extractor = MetadataExtractor::new(&self.job.encoder_path, self.job.timeout);
        let task = ConversionTask::new(&self.job, &extractor, &capabilities, self.cancel.clone());

        // Both queues hold every file, so neither side ever blocks on send.
        let (work_tx, work_rx) = channel::bounded::<AudioFile>(total);
        let (result_tx, result_rx) = channel::bounded(total);
        for file in files {
            work_tx
                .send(file)
                .map_err(|_| std::io::Error::other("work queue closed"))?;
        }
        drop(work_tx);

        let progress = Self::get_progress_counter();
        let pool = Self::build_pool(workers)?;
        info!("dispatching {} files to {} workers", total, workers);

        pool.scope(|scope| {
            for id in 0..workers {
                let work_rx = work_rx.clone();
                let result_tx = result_tx.clone();
                let (task, cancel, progress) = (&task, &self.cancel, &progress);

                scope.spawn(move |_| {
                    while let Ok(file) = work_rx.recv() {
                        if cancel.is_cancelled() {
                            break;
                        }
                        let outcome = task.run(&file);
                        if result_tx.send((file, outcome)).is_err() {
                            break;
                        }

                        let processed = progress.fetch_add(1, Ordering::SeqCst) + 1;
                        if processed % 100 == 0 || processed == total {
                            info!("Progress: {}/{} files", processed, total);
                        }
                    }
                    debug!("worker {} finished", id);
                });
            }
        });
        drop(result_tx);

        if self.cancel.is_cancelled() {
            info!("run cancelled after {} of {} files", progress.load(Ordering::SeqCst), total);
        }
        Ok(result_rx.into_iter().collect())
    }
}
