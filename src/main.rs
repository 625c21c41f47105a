use anyhow::{Result, bail};
use clap::Parser;
use std::fs;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use voxmix::catalog::SpeakerCatalog;
use voxmix::cli::{Cli, Commands};
use voxmix::config::Config;
use voxmix::orchestrator::{Generator, Split};
use voxmix::store;

fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = Config::load(&cli.config)?.with_env_overrides();
    if let Some(processes) = cli.processes {
        config.generate.workers = processes;
    }
    if cli.vad {
        config.generate.vad = true;
    }
    if let Some(seed) = cli.seed {
        config.generate.seed = Some(seed);
    }

    let store = store::from_config(&config)?;

    match cli.command {
        Some(Commands::Speakers) => {
            let catalog =
                SpeakerCatalog::from_store(store.as_ref(), &config.store.prefix, &config.store.suffix)?;
            for speaker in catalog.speakers() {
                let mark = if speaker.is_eligible() { "" } else { "  (too few utterances)" };
                println!(
                    "{:8} {:4} utterance(s){}",
                    speaker.id,
                    speaker.utterances.len(),
                    mark
                );
            }
            println!(
                "{} speaker(s), {} eligible",
                catalog.speakers().len(),
                catalog.eligible().len()
            );
            return Ok(());
        }
        None => {}
    }

    fs::create_dir_all(cli.out_dir.join("train"))?;
    fs::create_dir_all(cli.out_dir.join("test"))?;

    // Cooperative cancellation: SIGINT stops dispatching new indices and
    // lets in-flight samples finish their lifecycle.
    let running = Arc::new(AtomicBool::new(true));
    spawn_signal_watcher(running.clone());

    let generator = Generator::new(store.clone(), &config, cli.out_dir.clone(), cli.quiet);

    let train_catalog =
        SpeakerCatalog::from_store(store.as_ref(), &config.store.prefix, &config.store.suffix)?;
    if !cli.quiet {
        eprintln!(
            "voxmix: {} eligible speaker(s), generating {} train sample(s)",
            train_catalog.eligible().len(),
            config.generate.train_samples
        );
    }
    let train_report = generator.run(
        &train_catalog,
        Split::Train,
        config.generate.train_samples,
        config.generate.workers,
        &running,
    )?;
    println!(
        "train: {} accepted, {} rejected of {} attempted",
        train_report.accepted, train_report.rejected, train_report.attempted
    );

    if config.generate.test_samples > 0 {
        let Some(test_prefix) = config.store.test_prefix.as_deref() else {
            bail!("generate.test_samples > 0 requires store.test_prefix");
        };
        let test_catalog =
            SpeakerCatalog::from_store(store.as_ref(), test_prefix, &config.store.suffix)?;
        let test_report = generator.run(
            &test_catalog,
            Split::Test,
            config.generate.test_samples,
            config.generate.workers,
            &running,
        )?;
        println!(
            "test: {} accepted, {} rejected of {} attempted",
            test_report.accepted, test_report.rejected, test_report.attempted
        );
    }

    if !running.load(Ordering::SeqCst) {
        bail!("interrupted before completing the requested index range");
    }

    Ok(())
}

/// Flip `running` off on the first SIGINT. The watcher thread owns a
/// minimal tokio runtime; the worker pool itself is plain OS threads.
fn spawn_signal_watcher(running: Arc<AtomicBool>) {
    thread::spawn(move || {
        let runtime = match tokio::runtime::Builder::new_current_thread()
            .enable_io()
            .build()
        {
            Ok(runtime) => runtime,
            Err(e) => {
                eprintln!("voxmix: signal watcher unavailable: {e}");
                return;
            }
        };
        if runtime.block_on(tokio::signal::ctrl_c()).is_ok() {
            eprintln!("voxmix: interrupt received, finishing in-flight samples");
            running.store(false, Ordering::SeqCst);
        }
    });
}
