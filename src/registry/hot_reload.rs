//! Frame-driven hot reload.
//!
//! Each source record moves through
//! `Unobserved → Baseline(t) → {Unchanged, Changed}`; a change recompiles
//! every dependent and the record returns to `Baseline(t')`.
//!
//! A normal [`tick`](ShaderRegistry::tick) polls a single record, advancing
//! a cyclic cursor, so the per-frame cost is one `stat` regardless of how
//! many files are tracked. An option change takes priority: it recompiles
//! every option-dependent shader and skips polling for that frame.

use std::fs;
use std::sync::atomic::Ordering;
use std::thread;

use log::{debug, error, info, warn};

use super::ShaderRegistry;
use super::compiled::ShaderHandle;
use super::source_file::FileChange;
use crate::errors::Result;

impl ShaderRegistry {
    /// Per-frame hot-reload step. Returns `true` if any bytecode was
    /// replaced.
    ///
    /// Must be called from a single thread. An `Err` means a recompile
    /// exhausted its retries and should be treated as fatal.
    pub fn tick(&self) -> Result<bool> {
        self.update_shaders(false)
    }

    /// Polls every record in one call (startup, or on explicit request).
    pub fn check_all(&self) -> Result<bool> {
        self.update_shaders(true)
    }

    pub fn update_shaders(&self, check_all: bool) -> Result<bool> {
        if self.files.lock().is_empty() {
            return Ok(false);
        }

        if self.options.options_changed() {
            info!("Hot-swapping shaders that use compile-time options");
            let dependent: Vec<ShaderHandle> = self
                .shaders
                .lock()
                .iter()
                .filter(|shader| shader.uses_options())
                .cloned()
                .collect();

            for shader in &dependent {
                self.recompile_with_retry(shader)?;
            }
            return Ok(true);
        }

        let polls = if check_all { self.source_file_count() } else { 1 };
        let mut changed = false;
        for _ in 0..polls {
            changed |= self.poll_next()?;
        }
        Ok(changed)
    }

    /// Advances the cursor and checks that one record.
    fn poll_next(&self) -> Result<bool> {
        let (slot, path) = {
            let files = self.files.lock();
            if files.is_empty() {
                return Ok(false);
            }
            let slot = (self.cursor.load(Ordering::Relaxed) + 1) % files.len();
            self.cursor.store(slot, Ordering::Relaxed);
            match files.get(slot) {
                Some(record) => (slot, record.path().to_path_buf()),
                None => return Ok(false),
            }
        };

        let modified = match fs::metadata(&path).and_then(|meta| meta.modified()) {
            Ok(modified) => modified,
            Err(err) => {
                debug!("Skipping {} this frame: {err}", path.display());
                return Ok(false);
            }
        };

        let dependents = {
            let mut files = self.files.lock();
            let Some(record) = files.get_mut(slot) else {
                return Ok(false);
            };
            match record.observe(modified) {
                FileChange::Changed => record.live_dependents(),
                FileChange::Baseline | FileChange::Unchanged => return Ok(false),
            }
        };

        info!("Hot-swapping shaders for {}", path.display());
        for shader in &dependents {
            self.recompile_with_retry(shader)?;
        }
        Ok(true)
    }

    /// Recompiles `shader` in place, retrying retryable failures according
    /// to the configured [`RetryPolicy`](crate::config::RetryPolicy).
    fn recompile_with_retry(&self, shader: &ShaderHandle) -> Result<()> {
        let policy = self.config.retry;
        let attempts = policy.attempts();
        let mut attempt = 1;

        loop {
            match self.compile_shader(shader) {
                Ok(()) => return Ok(()),
                Err(err) if err.is_retryable() && attempt < attempts => {
                    if attempt == 1 {
                        warn!("Recompiling {} failed, retrying: {err}", shader.desc());
                    }
                    attempt += 1;
                    thread::sleep(policy.delay());
                }
                Err(err) => {
                    error!(
                        "Giving up on {} after {attempt} attempt(s): {err}",
                        shader.desc()
                    );
                    return Err(err);
                }
            }
        }
    }
}
