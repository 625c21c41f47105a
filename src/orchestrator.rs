//! Generation driver: selection policy, worker pool, and the per-sample
//! fetch → decode → build → persist → cleanup lifecycle.
//!
//! A fixed pool of OS threads pulls sample indices from a bounded channel.
//! Workers share only read-only state (catalog, builder, store handle);
//! every artifact key is unique per index, so there is no contended
//! mutable resource and no locking.

use crate::audio::wav;
use crate::builder::{BuildOutcome, SampleBuilder};
use crate::catalog::{Speaker, SpeakerCatalog, Utterance};
use crate::config::{Config, FormConfig};
use crate::defaults::INDEX_WIDTH;
use crate::error::{MixError, Result};
use crate::store::{ObjectStore, RetryPolicy};
use crossbeam_channel::bounded;
use indicatif::{ProgressBar, ProgressStyle};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::thread;

/// Train/test partition of generated samples.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Split {
    Train,
    Test,
}

impl Split {
    pub fn dir_name(&self) -> &'static str {
        match self {
            Split::Train => "train",
            Split::Test => "test",
        }
    }
}

/// Resolve a filename template to a path, replacing `*` with the
/// zero-padded 6-digit sample index.
pub fn formatter(dir: &Path, template: &str, num: u64) -> PathBuf {
    dir.join(template.replace('*', &format!("{num:0width$}", width = INDEX_WIDTH)))
}

/// Remote key for an uploaded waveform artifact: `{split}/{filename}`.
fn artifact_key(split: Split, template: &str, num: u64) -> String {
    format!(
        "{}/{}",
        split.dir_name(),
        template.replace('*', &format!("{num:0width$}", width = INDEX_WIDTH))
    )
}

/// The three utterances chosen for one sample index.
#[derive(Debug, Clone, Copy)]
pub struct Selection<'a> {
    /// Reference clip for the target speaker's embedding.
    pub enrollment: &'a Utterance,
    /// Clean utterance the model must recover.
    pub target: &'a Utterance,
    /// Competing utterance from a different speaker.
    pub interference: &'a Utterance,
}

/// Draw two distinct speakers, two distinct utterances from the first
/// (enrollment + target) and one from the second (interference).
///
/// Draws are uniform; the same utterance may recur across sample indices.
/// Callers must pass at least two eligible speakers.
pub fn select<'a, R: Rng>(rng: &mut R, eligible: &[&'a Speaker]) -> Selection<'a> {
    let speakers = rand::seq::index::sample(rng, eligible.len(), 2);
    let a = eligible[speakers.index(0)];
    let b = eligible[speakers.index(1)];

    let utterances = rand::seq::index::sample(rng, a.utterances.len(), 2);
    let enrollment = &a.utterances[utterances.index(0)];
    let target = &a.utterances[utterances.index(1)];
    let interference = &b.utterances[rng.random_range(0..b.utterances.len())];

    Selection {
        enrollment,
        target,
        interference,
    }
}

/// Counts for one completed (or cancelled) split run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RunReport {
    /// Indices dispatched before completion or cancellation.
    pub attempted: u64,
    /// Indices that produced a full artifact set.
    pub accepted: u64,
    /// Indices skipped by a length/quality gate.
    pub rejected: u64,
}

/// Top-level generation driver for one output directory.
pub struct Generator {
    store: Arc<dyn ObjectStore>,
    builder: SampleBuilder,
    retry: RetryPolicy,
    form: FormConfig,
    sample_rate: u32,
    out_dir: PathBuf,
    seed: u64,
    quiet: bool,
}

impl Generator {
    pub fn new(store: Arc<dyn ObjectStore>, config: &Config, out_dir: PathBuf, quiet: bool) -> Self {
        Self {
            store,
            builder: SampleBuilder::from_config(config),
            retry: RetryPolicy::from_config(config),
            form: config.form.clone(),
            sample_rate: config.audio.sample_rate,
            out_dir,
            seed: config.generate.seed.unwrap_or_else(rand::random),
            quiet,
        }
    }

    /// Drive `count` sample-generation attempts for `split` through a pool
    /// of `workers` threads (0 = available core count).
    ///
    /// Clearing `running` stops dispatching new indices; in-flight indices
    /// finish their lifecycle to a terminal state. The first fatal worker
    /// error halts dispatch and is returned after the pool drains.
    pub fn run(
        &self,
        catalog: &SpeakerCatalog,
        split: Split,
        count: u64,
        workers: usize,
        running: &AtomicBool,
    ) -> Result<RunReport> {
        catalog.require_selectable()?;
        let eligible = catalog.eligible();

        let split_dir = self.out_dir.join(split.dir_name());
        let scratch_root = split_dir.join(".scratch");
        fs::create_dir_all(&scratch_root)?;

        let workers = if workers == 0 {
            thread::available_parallelism().map(|n| n.get()).unwrap_or(1)
        } else {
            workers
        };

        let (index_tx, index_rx) = bounded::<u64>(workers * 2);
        let (fatal_tx, fatal_rx) = bounded::<MixError>(workers);
        let accepted = AtomicU64::new(0);
        let rejected = AtomicU64::new(0);
        let progress = self.progress_bar(count);
        let mut attempted = 0u64;

        thread::scope(|s| {
            for worker in 0..workers {
                let index_rx = index_rx.clone();
                let fatal_tx = fatal_tx.clone();
                let eligible = &eligible;
                let split_dir = &split_dir;
                let scratch_root = &scratch_root;
                let accepted = &accepted;
                let rejected = &rejected;
                let progress = &progress;
                let mut rng = StdRng::seed_from_u64(self.seed.wrapping_add(worker as u64));

                s.spawn(move || {
                    while let Ok(num) = index_rx.recv() {
                        match self.generate_one(num, eligible, &mut rng, split, split_dir, scratch_root)
                        {
                            Ok(true) => {
                                accepted.fetch_add(1, Ordering::Relaxed);
                            }
                            Ok(false) => {
                                rejected.fetch_add(1, Ordering::Relaxed);
                            }
                            Err(e) => {
                                // Halt dispatch; other in-flight indices
                                // still reach a terminal state.
                                running.store(false, Ordering::SeqCst);
                                let _ = fatal_tx.try_send(e);
                                break;
                            }
                        }
                        progress.inc(1);
                    }
                });
            }
            drop(index_rx);
            drop(fatal_tx);

            for num in 0..count {
                if !running.load(Ordering::SeqCst) {
                    break;
                }
                if index_tx.send(num).is_err() {
                    break;
                }
                attempted += 1;
            }
            drop(index_tx);
        });

        progress.finish_and_clear();

        // Scratch root is empty after per-index cleanup; best-effort removal.
        if let Err(e) = fs::remove_dir(&scratch_root) {
            if !self.quiet {
                eprintln!("voxmix: could not remove scratch dir: {e}");
            }
        }

        if let Ok(fatal) = fatal_rx.try_recv() {
            return Err(fatal);
        }

        Ok(RunReport {
            attempted,
            accepted: accepted.load(Ordering::Relaxed),
            rejected: rejected.load(Ordering::Relaxed),
        })
    }

    fn progress_bar(&self, count: u64) -> ProgressBar {
        if self.quiet {
            return ProgressBar::hidden();
        }
        let pb = ProgressBar::new(count);
        pb.set_style(
            // SAFETY: hardcoded template string — always valid
            #[allow(clippy::expect_used)]
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} ({eta})")
                .expect("hardcoded progress bar template")
                .progress_chars("#>-"),
        );
        pb
    }

    /// Run the full lifecycle for one index. Returns Ok(true) when the
    /// sample was persisted, Ok(false) when it was rejected.
    fn generate_one<R: Rng>(
        &self,
        num: u64,
        eligible: &[&Speaker],
        rng: &mut R,
        split: Split,
        split_dir: &Path,
        scratch_root: &Path,
    ) -> Result<bool> {
        let selection = select(rng, eligible);

        // Index-namespaced scratch: concurrent workers never collide.
        let scratch = scratch_root.join(format!("{num:0width$}", width = INDEX_WIDTH));
        fs::create_dir_all(&scratch)?;

        let result = self.attempt(num, &selection, &scratch, split, split_dir);

        // Fetched source copies are always removed, accepted or not.
        if let Err(e) = fs::remove_dir_all(&scratch) {
            eprintln!("voxmix: failed to clean scratch for index {num}: {e}");
        }

        result
    }

    fn attempt(
        &self,
        num: u64,
        selection: &Selection<'_>,
        scratch: &Path,
        split: Split,
        split_dir: &Path,
    ) -> Result<bool> {
        let sources = [
            selection.enrollment,
            selection.target,
            selection.interference,
        ];

        let mut local = Vec::with_capacity(3);
        for (i, utterance) in sources.iter().enumerate() {
            let file_name = utterance.key.rsplit('/').next().unwrap_or(&utterance.key);
            let path = scratch.join(format!("{i}-{file_name}"));
            self.retry.run(|| self.store.fetch(&utterance.key, &path))?;
            local.push(path);
        }

        let enrollment = wav::decode(&local[0], &selection.enrollment.key, self.sample_rate)?;
        let target = wav::decode(&local[1], &selection.target.key, self.sample_rate)?;
        let interference = wav::decode(&local[2], &selection.interference.key, self.sample_rate)?;

        match self.builder.build(&enrollment, &target, &interference) {
            BuildOutcome::Rejected(_) => Ok(false),
            BuildOutcome::Built(sample) => {
                self.persist(num, selection, split, split_dir, &sample)?;
                Ok(true)
            }
        }
    }

    /// Persist order matters: local wavs → remote upload (target first) →
    /// local spectra + enrollment pointer → delete local wav copies. An
    /// interrupted worker therefore never leaves an uploaded mixed-wav
    /// without its target-wav.
    ///
    /// A failure anywhere in the sequence discards whatever was written to
    /// the output tree so far: a failed index ends with zero local
    /// artifacts, same as a rejection.
    fn persist(
        &self,
        num: u64,
        selection: &Selection<'_>,
        split: Split,
        split_dir: &Path,
        sample: &crate::builder::BuiltSample,
    ) -> Result<()> {
        let result = self.persist_artifacts(num, selection, split, split_dir, sample);
        if result.is_err() {
            self.discard_local_artifacts(num, split_dir);
        }
        result
    }

    fn persist_artifacts(
        &self,
        num: u64,
        selection: &Selection<'_>,
        split: Split,
        split_dir: &Path,
        sample: &crate::builder::BuiltSample,
    ) -> Result<()> {
        let target_path = formatter(split_dir, &self.form.target_wav, num);
        let mixed_path = formatter(split_dir, &self.form.mixed_wav, num);
        wav::encode(&target_path, &sample.target, self.sample_rate)?;
        wav::encode(&mixed_path, &sample.mixed, self.sample_rate)?;

        let target_key = artifact_key(split, &self.form.target_wav, num);
        let mixed_key = artifact_key(split, &self.form.mixed_wav, num);
        self.retry.run(|| self.store.put(&target_path, &target_key))?;
        self.retry.run(|| self.store.put(&mixed_path, &mixed_key))?;

        sample
            .target_mag
            .save(&formatter(split_dir, &self.form.target_mag, num))?;
        sample
            .mixed_mag
            .save(&formatter(split_dir, &self.form.mixed_mag, num))?;

        // Text pointer to the enrollment utterance's remote key; the
        // d-vector itself is computed downstream.
        fs::write(
            formatter(split_dir, &self.form.dvec, num),
            &selection.enrollment.key,
        )?;

        // Wav mixtures live in the remote store; spectra and the pointer
        // stay on local disk.
        fs::remove_file(&target_path)?;
        fs::remove_file(&mixed_path)?;
        Ok(())
    }

    fn discard_local_artifacts(&self, num: u64, split_dir: &Path) {
        for template in [
            &self.form.target_wav,
            &self.form.mixed_wav,
            &self.form.target_mag,
            &self.form.mixed_mag,
            &self.form.dvec,
        ] {
            let path = formatter(split_dir, template, num);
            if path.exists() {
                fs::remove_file(&path).ok();
            }
        }
    }
}
