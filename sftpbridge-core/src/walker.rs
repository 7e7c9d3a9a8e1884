//! Recursive remote directory traversal.
//!
//! Depth-first, pre-order: each directory is listed, and every sub-directory
//! is fully walked before the next sibling is visited. A directory whose name
//! is the archive marker puts its whole subtree in the archive, at any depth.

use crate::error::BridgeResult;
use crate::path;
use crate::ports::RemoteSession;
use crate::types::RemoteEntry;
use futures::future::BoxFuture;

/// Traversal state threaded by value into each recursive step.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WalkContext {
    pub remote_root: String,
    pub inside_archive: bool,
}

impl WalkContext {
    pub fn new(remote_root: impl Into<String>) -> Self {
        Self {
            remote_root: remote_root.into(),
            inside_archive: false,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EntryKind {
    Directory,
    /// A file somewhere beneath an archive marker directory.
    Archived,
    Active,
}

/// One entry produced by the walk.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WalkEntry {
    pub entry: RemoteEntry,
    /// Directory that listed this entry.
    pub dir: String,
    /// `dir` joined with the entry name.
    pub path: String,
    pub kind: EntryKind,
}

impl WalkEntry {
    pub fn inside_archive(&self) -> bool {
        self.kind == EntryKind::Archived
    }
}

/// Walks a remote tree through an open session.
pub struct RemoteWalker<'a> {
    session: &'a dyn RemoteSession,
    archive_dir_name: &'a str,
}

impl<'a> RemoteWalker<'a> {
    pub fn new(session: &'a dyn RemoteSession, archive_dir_name: &'a str) -> Self {
        Self {
            session,
            archive_dir_name,
        }
    }

    /// Walks `context.remote_root` and returns every entry beneath it in pre-order.
    ///
    /// Listing failures propagate unchanged, with the failing path attached.
    pub async fn walk(&self, context: WalkContext) -> BridgeResult<Vec<WalkEntry>> {
        let root = context.remote_root.clone();
        self.walk_dir(root, context).await
    }

    fn walk_dir(
        &self,
        dir: String,
        context: WalkContext,
    ) -> BoxFuture<'_, BridgeResult<Vec<WalkEntry>>> {
        Box::pin(async move {
            let listing = self
                .session
                .list_dir(&dir)
                .await
                .map_err(|e| e.with_context(format!("listing {dir}")))?;

            let mut entries = Vec::new();
            for entry in listing {
                if entry.name == "." || entry.name == ".." {
                    continue;
                }
                let entry_path = path::child(&dir, &entry.name);

                if entry.is_dir {
                    let child_context = WalkContext {
                        inside_archive: context.inside_archive
                            || entry.name == self.archive_dir_name,
                        ..context.clone()
                    };
                    entries.push(WalkEntry {
                        entry,
                        dir: dir.clone(),
                        path: entry_path.clone(),
                        kind: EntryKind::Directory,
                    });
                    entries.extend(self.walk_dir(entry_path, child_context).await?);
                } else {
                    let kind = if context.inside_archive {
                        EntryKind::Archived
                    } else {
                        EntryKind::Active
                    };
                    entries.push(WalkEntry {
                        entry,
                        dir: dir.clone(),
                        path: entry_path,
                        kind,
                    });
                }
            }
            Ok(entries)
        })
    }
}
