//! Fire-and-forget submission of conversion jobs.
//!
//! The rewriter only needs the destination path to be deterministic; it
//! never waits for the WebP file to exist. [`DetachedConverter`] therefore
//! runs every job on its own background thread and drops the join handle.
//! Nobody observes the outcome: failures are logged and discarded, there is
//! no timeout, no cancellation. `submit` never blocks.
//!
//! The only synchronisation point is [`Converter::wait_idle`], which a
//! binary calls right before exiting so the process does not cut running
//! conversions short. The rewriter itself never calls it.

use super::backend::ImageBackend;
use super::params::{Quality, WebpParams};
use std::path::PathBuf;
use std::sync::{Arc, Condvar, Mutex};

/// One image to convert. Built by the rewriter, consumed by a [`Converter`].
#[derive(Debug, Clone, PartialEq)]
pub struct ConversionJob {
    pub source: PathBuf,
    pub destination: PathBuf,
    pub quality: Quality,
}

impl ConversionJob {
    pub fn params(&self) -> WebpParams {
        WebpParams {
            source: self.source.clone(),
            output: self.destination.clone(),
            quality: self.quality,
        }
    }
}

/// Accepts conversion jobs. `submit` returns immediately and reports nothing.
pub trait Converter: Sync {
    fn submit(&self, job: ConversionJob);

    /// Block until every submitted job has finished. For process shutdown only.
    fn wait_idle(&self) {}
}

/// Number of jobs still running, with a condvar signalled when it hits zero.
#[derive(Default)]
struct InFlight {
    count: Mutex<usize>,
    idle: Condvar,
}

impl InFlight {
    fn start(self: &Arc<Self>) -> InFlightGuard {
        *self.count.lock().unwrap_or_else(|e| e.into_inner()) += 1;
        InFlightGuard(Arc::clone(self))
    }

    fn wait(&self) {
        let mut count = self.count.lock().unwrap_or_else(|e| e.into_inner());
        while *count > 0 {
            count = self.idle.wait(count).unwrap_or_else(|e| e.into_inner());
        }
    }
}

/// Decrements the in-flight count on drop, including when a job panics.
struct InFlightGuard(Arc<InFlight>);

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        let mut count = self.0.count.lock().unwrap_or_else(|e| e.into_inner());
        *count = count.saturating_sub(1);
        if *count == 0 {
            self.0.idle.notify_all();
        }
    }
}

/// Runs each job on a detached thread against a shared backend.
pub struct DetachedConverter<B: ImageBackend + 'static> {
    backend: Arc<B>,
    in_flight: Arc<InFlight>,
}

impl<B: ImageBackend + 'static> DetachedConverter<B> {
    pub fn new(backend: B) -> Self {
        Self {
            backend: Arc::new(backend),
            in_flight: Arc::default(),
        }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }
}

impl<B: ImageBackend + 'static> Converter for DetachedConverter<B> {
    fn submit(&self, job: ConversionJob) {
        let backend = Arc::clone(&self.backend);
        let guard = self.in_flight.start();
        let spawned = std::thread::Builder::new()
            .name("webp-convert".into())
            .spawn(move || {
                let _guard = guard;
                run_job(backend.as_ref(), &job);
            });
        // The handle is dropped: the thread is never joined.
        if let Err(e) = spawned {
            tracing::warn!("could not start conversion thread: {e}");
        }
    }

    fn wait_idle(&self) {
        self.in_flight.wait();
    }
}

fn run_job(backend: &dyn ImageBackend, job: &ConversionJob) {
    tracing::debug!(
        backend = backend.name(),
        source = %job.source.display(),
        destination = %job.destination.display(),
        quality = job.quality.value(),
        "converting"
    );
    if let Err(e) = backend.to_webp(&job.params()) {
        tracing::warn!(
            backend = backend.name(),
            source = %job.source.display(),
            "webp conversion failed: {e}"
        );
    }
}

/// Drops every job. Used for dry runs.
#[derive(Debug, Default, Clone, Copy)]
pub struct DiscardConverter;

impl Converter for DiscardConverter {
    fn submit(&self, job: ConversionJob) {
        tracing::debug!(destination = %job.destination.display(), "dry run: conversion skipped");
    }
}
