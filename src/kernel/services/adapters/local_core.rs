//! Directory-backed core: a local cache plus a "remote" mirror directory.
//!
//! Layout of each side: `index.json` (file metadata) and `docs/<id>` (document
//! bodies). Sync is last-writer-wins per file by `lastmod`.

use chrono::{DateTime, Utc};
use chrono_humanize::HumanTime;
use compact_str::CompactString;
use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::kernel::services::ports::{
    CoreError, CoreErrorCode, CoreResult, File, FileId, FileKind, NoteCore, SyncProgress,
    SyncWorkUnit,
};

const INDEX_FILE: &str = "index.json";
const DOCS_DIR: &str = "docs";
const ROOT_NAME: &str = "root";

#[derive(Debug, Default, Serialize, Deserialize)]
struct Index {
    root: Option<FileId>,
    #[serde(default)]
    files: Vec<File>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    last_synced: Option<DateTime<Utc>>,
}

struct Tree {
    root: FileId,
    files: FxHashMap<FileId, File>,
    last_synced: Option<DateTime<Utc>>,
}

impl Tree {
    fn to_index(&self) -> Index {
        let mut files: Vec<File> = self.files.values().cloned().collect();
        files.sort_by_key(|f| f.id);
        Index {
            root: Some(self.root),
            files,
            last_synced: self.last_synced,
        }
    }

    fn get(&self, id: FileId) -> CoreResult<&File> {
        self.files.get(&id).ok_or_else(|| CoreError::not_found(id))
    }

    fn document(&self, id: FileId) -> CoreResult<&File> {
        let file = self.get(id)?;
        match file.kind {
            FileKind::Document => Ok(file),
            _ => Err(CoreError::new(
                CoreErrorCode::FileNotDocument,
                format!("file {} is not a document", id),
            )),
        }
    }
}

pub struct LocalCore {
    local_dir: PathBuf,
    remote_dir: PathBuf,
    tree: Mutex<Tree>,
}

impl LocalCore {
    /// Opens `<dir>/local` against the mirror in `<dir>/remote`.
    pub fn open(dir: &Path) -> CoreResult<Self> {
        Self::open_with_remote(&dir.join("local"), &dir.join("remote"))
    }

    pub fn open_with_remote(local_dir: &Path, remote_dir: &Path) -> CoreResult<Self> {
        std::fs::create_dir_all(local_dir.join(DOCS_DIR))?;
        std::fs::create_dir_all(remote_dir.join(DOCS_DIR))?;

        let local = read_index(local_dir)?;
        let tree = match local.root {
            Some(root) => Tree {
                root,
                files: local.files.into_iter().map(|f| (f.id, f)).collect(),
                last_synced: local.last_synced,
            },
            None => {
                // A fresh cache adopts the remote root so both sides agree on it.
                let remote = read_index(remote_dir)?;
                let root = remote
                    .root
                    .and_then(|id| remote.files.into_iter().find(|f| f.id == id))
                    .unwrap_or_else(new_root);
                let mut files = FxHashMap::default();
                let root_id = root.id;
                files.insert(root.id, root);
                let tree = Tree {
                    root: root_id,
                    files,
                    last_synced: None,
                };
                write_index(local_dir, &tree.to_index())?;
                tree
            }
        };

        tracing::info!(
            local = %local_dir.display(),
            remote = %remote_dir.display(),
            files = tree.files.len(),
            "local core opened"
        );
        Ok(Self {
            local_dir: local_dir.to_path_buf(),
            remote_dir: remote_dir.to_path_buf(),
            tree: Mutex::new(tree),
        })
    }

    fn persist(&self, tree: &Tree) -> CoreResult<()> {
        write_index(&self.local_dir, &tree.to_index())
    }
}

impl NoteCore for LocalCore {
    fn write_document(&self, id: FileId, content: &[u8]) -> CoreResult<()> {
        let mut tree = self.tree.lock();
        tree.document(id)?;
        write_atomic(&doc_path(&self.local_dir, id), content)?;
        if let Some(file) = tree.files.get_mut(&id) {
            file.lastmod = Utc::now();
        }
        self.persist(&tree)
    }

    fn read_document(&self, id: FileId) -> CoreResult<Vec<u8>> {
        let tree = self.tree.lock();
        tree.document(id)?;
        match std::fs::read(doc_path(&self.local_dir, id)) {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Vec::new()),
            Err(e) => Err(e.into()),
        }
    }

    fn sync_all(&self, progress: &mut dyn FnMut(SyncProgress)) -> CoreResult<()> {
        let mut tree = self.tree.lock();
        let mut remote: FxHashMap<FileId, File> = read_index(&self.remote_dir)
            .map_err(|e| CoreError::new(CoreErrorCode::CouldNotReachServer, e.message))?
            .files
            .into_iter()
            .map(|f| (f.id, f))
            .collect();

        let mut pulls = Vec::new();
        let mut pushes = Vec::new();
        for (id, local) in tree.files.iter() {
            match remote.get(id) {
                None => pushes.push(*id),
                Some(theirs) if local.lastmod > theirs.lastmod => pushes.push(*id),
                Some(theirs) if theirs.lastmod > local.lastmod => pulls.push(*id),
                Some(_) => {}
            }
        }
        pulls.extend(remote.keys().filter(|id| !tree.files.contains_key(*id)).copied());

        let total = (pulls.len() + pushes.len() + 2) as u64;
        let mut done = 0u64;
        let mut report = |current: SyncWorkUnit| {
            done += 1;
            progress(SyncProgress {
                total,
                progress: done,
                current,
            });
        };

        report(SyncWorkUnit::PullMetadata);
        for id in pulls {
            let Some(file) = remote.get(&id).cloned() else {
                continue;
            };
            if matches!(file.kind, FileKind::Document) {
                copy_doc(&self.remote_dir, &self.local_dir, id)?;
            }
            tree.files.insert(id, file);
            report(SyncWorkUnit::PullDocument(id));
        }
        for id in pushes {
            let Some(file) = tree.files.get(&id).cloned() else {
                continue;
            };
            if matches!(file.kind, FileKind::Document) {
                copy_doc(&self.local_dir, &self.remote_dir, id)?;
            }
            remote.insert(id, file);
            report(SyncWorkUnit::PushDocument(id));
        }

        let mut remote_files: Vec<File> = remote.into_values().collect();
        remote_files.sort_by_key(|f| f.id);
        write_index(
            &self.remote_dir,
            &Index {
                root: Some(tree.root),
                files: remote_files,
                last_synced: None,
            },
        )?;
        report(SyncWorkUnit::PushMetadata);

        tree.last_synced = Some(Utc::now());
        self.persist(&tree)
    }

    /// Empty until the first successful sync.
    fn last_synced_human_string(&self) -> CoreResult<String> {
        let tree = self.tree.lock();
        Ok(match tree.last_synced {
            Some(at) => HumanTime::from(at.signed_duration_since(Utc::now())).to_string(),
            None => String::new(),
        })
    }

    fn root(&self) -> CoreResult<File> {
        let tree = self.tree.lock();
        tree.get(tree.root).cloned()
    }

    fn file_by_id(&self, id: FileId) -> CoreResult<File> {
        self.tree.lock().get(id).cloned()
    }

    fn children(&self, id: FileId) -> CoreResult<Vec<File>> {
        let tree = self.tree.lock();
        if !tree.get(id)?.is_folder() {
            return Err(CoreError::new(
                CoreErrorCode::FileNotFolder,
                format!("file {} is not a folder", id),
            ));
        }
        Ok(tree
            .files
            .values()
            .filter(|f| f.parent == id && !f.is_root())
            .cloned()
            .collect())
    }

    fn create_file(&self, name: &str, parent: FileId, kind: FileKind) -> CoreResult<File> {
        let name = name.trim();
        if name.is_empty() || name.contains('/') {
            return Err(CoreError::unexpected(format!("invalid file name {:?}", name)));
        }

        let mut tree = self.tree.lock();
        if !tree.get(parent)?.is_folder() {
            return Err(CoreError::new(
                CoreErrorCode::FileNotFolder,
                format!("file {} is not a folder", parent),
            ));
        }
        let conflict = tree
            .files
            .values()
            .any(|f| f.parent == parent && !f.is_root() && f.name == name);
        if conflict {
            return Err(CoreError::new(
                CoreErrorCode::FileNameConflict,
                format!("{:?} already exists", name),
            ));
        }

        let file = File {
            id: FileId::new_v4(),
            parent,
            name: CompactString::from(name),
            kind,
            lastmod: Utc::now(),
        };
        if matches!(kind, FileKind::Document) {
            write_atomic(&doc_path(&self.local_dir, file.id), b"")?;
        }
        tree.files.insert(file.id, file.clone());
        self.persist(&tree)?;
        tracing::debug!(id = %file.id, name = %file.name, kind = %file.kind, "file created");
        Ok(file)
    }
}

fn new_root() -> File {
    let id = FileId::new_v4();
    File {
        id,
        parent: id,
        name: CompactString::from(ROOT_NAME),
        kind: FileKind::Folder,
        lastmod: Utc::now(),
    }
}

fn doc_path(dir: &Path, id: FileId) -> PathBuf {
    dir.join(DOCS_DIR).join(id.to_string())
}

fn read_index(dir: &Path) -> CoreResult<Index> {
    match std::fs::read(dir.join(INDEX_FILE)) {
        Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Index::default()),
        Err(e) => Err(e.into()),
    }
}

fn write_index(dir: &Path, index: &Index) -> CoreResult<()> {
    let bytes = serde_json::to_vec_pretty(index)?;
    write_atomic(&dir.join(INDEX_FILE), &bytes)
}

fn write_atomic(path: &Path, bytes: &[u8]) -> CoreResult<()> {
    let tmp = path.with_extension("tmp");
    std::fs::write(&tmp, bytes)?;
    std::fs::rename(&tmp, path)?;
    Ok(())
}

fn copy_doc(from: &Path, to: &Path, id: FileId) -> CoreResult<()> {
    match std::fs::read(doc_path(from, id)) {
        Ok(bytes) => write_atomic(&doc_path(to, id), &bytes),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e.into()),
    }
}

#[cfg(test)]
#[path = "../../../../tests/unit/kernel/services/adapters/local_core.rs"]
mod tests;
