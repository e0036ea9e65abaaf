//! Source file records: modification tracking and dependents.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Weak};
use std::time::SystemTime;

use rustc_hash::FxHashMap;

use super::compiled::{CompiledShader, ShaderHandle};

/// Outcome of comparing a record against a fresh timestamp.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum FileChange {
    /// First observation; the timestamp became the baseline.
    Baseline,
    Unchanged,
    Changed,
}

/// One source file and the shaders whose include closure reaches it.
#[derive(Debug)]
pub(crate) struct SourceFileRecord {
    path: PathBuf,
    /// `None` until the first poll.
    last_modified: Option<SystemTime>,
    dependents: Vec<Weak<CompiledShader>>,
}

impl SourceFileRecord {
    fn new(path: PathBuf) -> Self {
        Self {
            path,
            last_modified: None,
            dependents: Vec::new(),
        }
    }

    pub(crate) fn path(&self) -> &Path {
        &self.path
    }

    /// Adds `shader` unless it is already a dependent.
    fn add_dependent(&mut self, shader: &ShaderHandle) {
        let ptr = Arc::as_ptr(shader);
        if !self.dependents.iter().any(|weak| weak.as_ptr() == ptr) {
            self.dependents.push(Arc::downgrade(shader));
        }
    }

    pub(crate) fn live_dependents(&self) -> Vec<ShaderHandle> {
        self.dependents.iter().filter_map(Weak::upgrade).collect()
    }

    pub(crate) fn observe(&mut self, modified: SystemTime) -> FileChange {
        match self.last_modified {
            None => {
                self.last_modified = Some(modified);
                FileChange::Baseline
            }
            Some(previous) if modified > previous => {
                self.last_modified = Some(modified);
                FileChange::Changed
            }
            Some(_) => FileChange::Unchanged,
        }
    }
}

/// Path → record map with stable indices for round-robin polling.
#[derive(Debug, Default)]
pub(crate) struct FileTable {
    index: FxHashMap<PathBuf, usize>,
    records: Vec<SourceFileRecord>,
}

impl FileTable {
    /// Makes `shader` a dependent of `path`, creating the record on first
    /// sight.
    pub(crate) fn register(&mut self, path: &Path, shader: &ShaderHandle) {
        let slot = match self.index.get(path) {
            Some(&slot) => slot,
            None => {
                let slot = self.records.len();
                self.records.push(SourceFileRecord::new(path.to_path_buf()));
                self.index.insert(path.to_path_buf(), slot);
                slot
            }
        };
        self.records[slot].add_dependent(shader);
    }

    /// Drops `shader` from every record whose path is not in `keep`, so a
    /// shader's dependencies always match its latest include closure.
    pub(crate) fn prune(&mut self, shader: &ShaderHandle, keep: &[PathBuf]) {
        let ptr = Arc::as_ptr(shader);
        for record in &mut self.records {
            if !keep.contains(&record.path) {
                record.dependents.retain(|weak| weak.as_ptr() != ptr);
            }
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.records.len()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub(crate) fn get(&self, slot: usize) -> Option<&SourceFileRecord> {
        self.records.get(slot)
    }

    pub(crate) fn get_mut(&mut self, slot: usize) -> Option<&mut SourceFileRecord> {
        self.records.get_mut(slot)
    }

    pub(crate) fn find(&self, path: &Path) -> Option<&SourceFileRecord> {
        self.index.get(path).map(|&slot| &self.records[slot])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::{DefinitionSet, ShaderStage};
    use crate::registry::compiled::ShaderDesc;
    use std::time::Duration;

    fn shader(entry: &str) -> ShaderHandle {
        let desc = ShaderDesc::new("Mesh.hlsl", Some(entry), ShaderStage::Vertex).unwrap();
        Arc::new(CompiledShader::new(desc, DefinitionSet::new()))
    }

    #[test]
    fn observe_walks_baseline_then_changes() {
        let mut record = SourceFileRecord::new(PathBuf::from("a.hlsl"));
        let t0 = SystemTime::UNIX_EPOCH + Duration::from_secs(100);

        assert_eq!(record.observe(t0), FileChange::Baseline);
        assert_eq!(record.observe(t0), FileChange::Unchanged);
        assert_eq!(record.observe(t0 - Duration::from_secs(1)), FileChange::Unchanged);
        assert_eq!(record.observe(t0 + Duration::from_secs(1)), FileChange::Changed);
        assert_eq!(record.observe(t0 + Duration::from_secs(1)), FileChange::Unchanged);
    }

    #[test]
    fn register_deduplicates_dependents() {
        let mut table = FileTable::default();
        let vs = shader("VSMain");
        let ps = shader("PSMain");

        table.register(Path::new("/s/Common.hlsl"), &vs);
        table.register(Path::new("/s/Common.hlsl"), &vs);
        table.register(Path::new("/s/Common.hlsl"), &ps);
        table.register(Path::new("/s/Mesh.hlsl"), &vs);

        assert_eq!(table.len(), 2);
        let common = table.find(Path::new("/s/Common.hlsl")).unwrap();
        assert_eq!(common.live_dependents().len(), 2);
    }

    #[test]
    fn prune_removes_stale_dependencies_only_for_that_shader() {
        let mut table = FileTable::default();
        let vs = shader("VSMain");
        let ps = shader("PSMain");
        let common = PathBuf::from("/s/Common.hlsl");
        let mesh = PathBuf::from("/s/Mesh.hlsl");

        table.register(&mesh, &vs);
        table.register(&common, &vs);
        table.register(&common, &ps);
        table.prune(&vs, std::slice::from_ref(&mesh));

        assert_eq!(table.find(&mesh).unwrap().live_dependents().len(), 1);
        let remaining = table.find(&common).unwrap().live_dependents();
        assert_eq!(remaining.len(), 1);
        assert!(Arc::ptr_eq(&remaining[0], &ps));
    }

    #[test]
    fn dropped_shaders_are_not_returned() {
        let mut table = FileTable::default();
        let vs = shader("VSMain");
        table.register(Path::new("/s/Mesh.hlsl"), &vs);
        drop(vs);

        assert!(table.get(0).unwrap().live_dependents().is_empty());
    }
}
