//! Durable "this job already succeeded for this host" flags.

use std::fs::OpenOptions;
use std::io;
use std::path::PathBuf;

/// Existence-only store keyed by (host, template name).
pub trait MarkerStore: Send + Sync {
    fn exists(&self, host: &str, template: &str) -> bool;

    /// Record completion. Creating an existing marker is not an error.
    fn create(&self, host: &str, template: &str) -> io::Result<()>;
}

/// One empty file per marker: `<dir>/<host>-<template>.success`.
pub struct FsMarkerStore {
    dir: PathBuf,
}

impl FsMarkerStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn path_for(&self, host: &str, template: &str) -> PathBuf {
        self.dir
            .join(format!("{}-{}.success", sanitize(host), sanitize(template)))
    }
}

// Template names are free text; keep the marker inside `dir`.
fn sanitize(part: &str) -> String {
    part.replace(['/', '\\'], "_")
}

impl MarkerStore for FsMarkerStore {
    fn exists(&self, host: &str, template: &str) -> bool {
        self.path_for(host, template).exists()
    }

    fn create(&self, host: &str, template: &str) -> io::Result<()> {
        match OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(self.path_for(host, template))
        {
            Ok(file) => file.sync_all(),
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => Ok(()),
            Err(e) => Err(e),
        }
    }
}
