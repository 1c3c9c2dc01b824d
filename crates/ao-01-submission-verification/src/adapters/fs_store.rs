//! # Local Content Store
//!
//! Objects live at `{upload_root}/{project_dir}/{hash}_{arrival_ms}_{name}`.
//!
//! Bytes are written to a `.staging-*` temporary file in the project
//! directory, fsynced, and renamed into place only on commit. A staged file
//! that is dropped is deleted, so a rejected or failed write never leaves a
//! readable object behind.
//!
//! An in-memory hash index serves lookups. It is rebuilt from disk when the
//! store is opened and updated on every commit.

use crate::domain::entities::StoredObject;
use crate::domain::naming::{object_name, parse_object_name};
use crate::ports::outbound::{ContentStore, StagedContent, StoreError};
use parking_lot::RwLock;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::io::{self, ErrorKind, Write};
use std::path::{Path, PathBuf};
use tempfile::{NamedTempFile, PersistError};
use tracing::{debug, info, warn};

/// Prefix of temporary files; never a valid object name.
const STAGING_PREFIX: &str = ".staging-";

/// How many successive milliseconds to try when an object name is taken.
const MAX_NAME_ATTEMPTS: u32 = 16;

/// Shortest hash prefix accepted by [`ContentStore::locate`].
pub const MIN_LOOKUP_PREFIX: usize = 8;

/// Filesystem-backed content store.
pub struct LocalContentStore {
    root: PathBuf,
    /// content hash -> (arrival ms, object); latest arrival wins
    index: RwLock<HashMap<String, (i64, StoredObject)>>,
}

/// Bytes staged in a temporary file inside the project directory.
pub struct StagedFile {
    file: NamedTempFile,
    dir: PathBuf,
    project_dir: String,
    content_hash: String,
    size: u64,
}

impl StagedContent for StagedFile {
    fn content_hash(&self) -> &str {
        &self.content_hash
    }

    fn size(&self) -> u64 {
        self.size
    }
}

impl LocalContentStore {
    /// Open (creating if needed) a store rooted at `root` and index its contents.
    pub fn open<P: AsRef<Path>>(root: P) -> io::Result<Self> {
        let root = root.as_ref().to_path_buf();
        std::fs::create_dir_all(&root)?;

        let store = Self {
            root,
            index: RwLock::new(HashMap::new()),
        };
        let indexed = store.rebuild_index()?;
        info!(objects = indexed, "content store opened");
        Ok(store)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Number of distinct content hashes indexed.
    pub fn indexed_count(&self) -> usize {
        self.index.read().len()
    }

    /// Rescan `{root}/{project}/` and replace the index.
    ///
    /// Leftover staging files from an interrupted write are removed. Files
    /// not shaped like object names are ignored.
    pub fn rebuild_index(&self) -> io::Result<usize> {
        let mut index: HashMap<String, (i64, StoredObject)> = HashMap::new();

        for project in std::fs::read_dir(&self.root)? {
            let project = project?;
            if !project.file_type()?.is_dir() {
                continue;
            }
            let Some(project_dir) = project.file_name().to_str().map(str::to_owned) else {
                continue;
            };

            for entry in std::fs::read_dir(project.path())? {
                let entry = entry?;
                if !entry.file_type()?.is_file() {
                    continue;
                }
                let Some(name) = entry.file_name().to_str().map(str::to_owned) else {
                    continue;
                };

                if name.starts_with(STAGING_PREFIX) {
                    if let Err(e) = std::fs::remove_file(entry.path()) {
                        warn!(project = %project_dir, error = %e.kind(), "failed to remove stale staging file");
                    }
                    continue;
                }

                let Some((hash, arrival_ms)) = parse_object_name(&name) else {
                    debug!(project = %project_dir, file = %name, "skipping non-object file");
                    continue;
                };

                let object = StoredObject {
                    content_hash: hash.to_string(),
                    relative_path: format!("{project_dir}/{name}"),
                    path: entry.path(),
                    size: entry.metadata()?.len(),
                    object_name: name.clone(),
                };

                match index.get(hash) {
                    Some((existing, _)) if *existing > arrival_ms => {}
                    _ => {
                        index.insert(hash.to_string(), (arrival_ms, object));
                    }
                }
            }
        }

        let count = index.len();
        *self.index.write() = index;
        Ok(count)
    }

    fn project_path(&self, project_dir: &str) -> Result<PathBuf, StoreError> {
        // Project directory names come from the sanitizer; refuse anything that
        // could escape the root all the same
        if project_dir.is_empty()
            || project_dir.contains(&['/', '\\'][..])
            || project_dir == "."
            || project_dir == ".."
        {
            return Err(StoreError::Directory(ErrorKind::InvalidInput));
        }
        Ok(self.root.join(project_dir))
    }
}

impl ContentStore for LocalContentStore {
    type Staged = StagedFile;

    fn stage(&self, project_dir: &str, content: &[u8]) -> Result<StagedFile, StoreError> {
        let dir = self.project_path(project_dir)?;
        std::fs::create_dir_all(&dir).map_err(|e| StoreError::Directory(e.kind()))?;

        let mut file = tempfile::Builder::new()
            .prefix(STAGING_PREFIX)
            .tempfile_in(&dir)
            .map_err(|e| StoreError::Write(e.kind()))?;
        file.write_all(content)
            .map_err(|e| StoreError::Write(e.kind()))?;
        file.as_file()
            .sync_all()
            .map_err(|e| StoreError::Write(e.kind()))?;

        Ok(StagedFile {
            file,
            dir,
            project_dir: project_dir.to_string(),
            content_hash: hex::encode(Sha256::digest(content)),
            size: content.len() as u64,
        })
    }

    fn commit(
        &self,
        staged: StagedFile,
        arrival_ms: i64,
        original_name: &str,
    ) -> Result<StoredObject, StoreError> {
        let StagedFile {
            mut file,
            dir,
            project_dir,
            content_hash,
            size,
        } = staged;

        for attempt in 0..MAX_NAME_ATTEMPTS {
            let stamp = arrival_ms.saturating_add(i64::from(attempt));
            let name = object_name(&content_hash, stamp, original_name);
            let target = dir.join(&name);

            match file.persist_noclobber(&target) {
                Ok(_) => {
                    let object = StoredObject {
                        content_hash: content_hash.clone(),
                        relative_path: format!("{project_dir}/{name}"),
                        path: target,
                        size,
                        object_name: name,
                    };
                    self.index
                        .write()
                        .insert(content_hash, (stamp, object.clone()));
                    return Ok(object);
                }
                Err(PersistError { error, file: back })
                    if error.kind() == ErrorKind::AlreadyExists =>
                {
                    debug!(attempt, "object name taken, advancing timestamp");
                    file = back;
                }
                Err(PersistError { error, .. }) => {
                    return Err(StoreError::Commit(error.kind()));
                }
            }
        }

        Err(StoreError::NameExhausted(MAX_NAME_ATTEMPTS))
    }

    fn locate(&self, hash_or_prefix: &str) -> Option<StoredObject> {
        let query = hash_or_prefix
            .strip_prefix("0x")
            .unwrap_or(hash_or_prefix)
            .to_ascii_lowercase();
        let index = self.index.read();

        if let Some((_, object)) = index.get(&query) {
            return Some(object.clone());
        }

        if query.len() < MIN_LOOKUP_PREFIX || !query.bytes().all(|b| b.is_ascii_hexdigit()) {
            return None;
        }

        let mut matches = index
            .iter()
            .filter(|(hash, _)| hash.starts_with(&query))
            .map(|(_, (_, object))| object);
        match (matches.next(), matches.next()) {
            (Some(object), None) => Some(object.clone()),
            _ => None,
        }
    }
}
