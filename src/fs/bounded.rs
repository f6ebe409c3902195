//! Root-bounded filesystem adapter.
//!
//! Wraps any `FileSystem` and rejects operations whose resolved path would
//! escape a configured root, the way a chroot or a layered blobstore keeps
//! callers inside their slice of the namespace.

use async_trait::async_trait;
use std::time::SystemTime;

use super::types::*;

pub struct BoundedFs<F: FileSystem> {
    inner: F,
    root: String,
}

/// `/sandbox` must not admit `/sandboxes` as "within root" — compare on a
/// path-segment boundary, not a string prefix.
fn is_path_within_root(root: &str, path: &str) -> bool {
    if root == "/" {
        return true;
    }
    path == root || path.starts_with(&format!("{}/", root))
}

impl<F: FileSystem> BoundedFs<F> {
    pub fn new(inner: F, root: impl Into<String>) -> Self {
        let mut root = root.into();
        if root.len() > 1 && root.ends_with('/') {
            root.pop();
        }
        if root.is_empty() {
            root = "/".to_string();
        }
        Self { inner, root }
    }

    fn check(&self, path: &str, operation: &str) -> Result<(), FsError> {
        let resolved = self.inner.resolve_path(&self.root, path);
        if !is_path_within_root(&self.root, &resolved) {
            return Err(FsError::PermissionDenied {
                path: path.to_string(),
                operation: operation.to_string(),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl<F: FileSystem> FileSystem for BoundedFs<F> {
    async fn read_file(&self, path: &str) -> Result<String, FsError> {
        self.check(path, "open")?;
        self.inner.read_file(path).await
    }

    async fn read_file_buffer(&self, path: &str) -> Result<Vec<u8>, FsError> {
        self.check(path, "open")?;
        self.inner.read_file_buffer(path).await
    }

    async fn write_file(&self, path: &str, content: &[u8]) -> Result<(), FsError> {
        self.check(path, "open")?;
        self.inner.write_file(path, content).await
    }

    async fn append_file(&self, path: &str, content: &[u8]) -> Result<(), FsError> {
        self.check(path, "open")?;
        self.inner.append_file(path, content).await
    }

    async fn exists(&self, path: &str) -> bool {
        if self.check(path, "access").is_err() {
            return false;
        }
        self.inner.exists(path).await
    }

    async fn stat(&self, path: &str) -> Result<FsStat, FsError> {
        self.check(path, "stat")?;
        self.inner.stat(path).await
    }

    async fn lstat(&self, path: &str) -> Result<FsStat, FsError> {
        self.check(path, "lstat")?;
        self.inner.lstat(path).await
    }

    async fn mkdir(&self, path: &str, options: &MkdirOptions) -> Result<(), FsError> {
        self.check(path, "mkdir")?;
        self.inner.mkdir(path, options).await
    }

    async fn readdir(&self, path: &str) -> Result<Vec<String>, FsError> {
        self.check(path, "scandir")?;
        self.inner.readdir(path).await
    }

    async fn readdir_with_file_types(&self, path: &str) -> Result<Vec<DirentEntry>, FsError> {
        self.check(path, "scandir")?;
        self.inner.readdir_with_file_types(path).await
    }

    async fn rm(&self, path: &str, options: &RmOptions) -> Result<(), FsError> {
        self.check(path, "rm")?;
        self.inner.rm(path, options).await
    }

    async fn cp(&self, src: &str, dest: &str, options: &CpOptions) -> Result<(), FsError> {
        self.check(src, "cp")?;
        self.check(dest, "cp")?;
        self.inner.cp(src, dest, options).await
    }

    async fn mv(&self, src: &str, dest: &str) -> Result<(), FsError> {
        self.check(src, "rename")?;
        self.check(dest, "rename")?;
        self.inner.mv(src, dest).await
    }

    async fn chmod(&self, path: &str, mode: u32) -> Result<(), FsError> {
        self.check(path, "chmod")?;
        self.inner.chmod(path, mode).await
    }

    async fn symlink(&self, target: &str, link_path: &str) -> Result<(), FsError> {
        self.check(link_path, "symlink")?;
        self.inner.symlink(target, link_path).await
    }

    async fn link(&self, existing_path: &str, new_path: &str) -> Result<(), FsError> {
        self.check(existing_path, "link")?;
        self.check(new_path, "link")?;
        self.inner.link(existing_path, new_path).await
    }

    async fn readlink(&self, path: &str) -> Result<String, FsError> {
        self.check(path, "readlink")?;
        self.inner.readlink(path).await
    }

    async fn realpath(&self, path: &str) -> Result<String, FsError> {
        self.check(path, "realpath")?;
        let resolved = self.inner.realpath(path).await?;
        if !is_path_within_root(&self.root, &resolved) {
            return Err(FsError::PermissionDenied {
                path: path.to_string(),
                operation: "realpath".to_string(),
            });
        }
        Ok(resolved)
    }

    async fn utimes(&self, path: &str, mtime: SystemTime) -> Result<(), FsError> {
        self.check(path, "utimes")?;
        self.inner.utimes(path, mtime).await
    }

    fn resolve_path(&self, base: &str, path: &str) -> String {
        self.inner.resolve_path(base, path)
    }

    fn get_all_paths(&self) -> Vec<String> {
        self.inner
            .get_all_paths()
            .into_iter()
            .filter(|p| is_path_within_root(&self.root, p))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::InMemoryFs;
    use crate::fs::types::FileSystem;

    #[tokio::test]
    async fn test_sandbox_does_not_match_sandboxes_prefix() {
        let inner = InMemoryFs::new();
        inner.mkdir("/sandbox", &MkdirOptions::default()).await.unwrap();
        inner.mkdir("/sandboxes", &MkdirOptions::default()).await.unwrap();
        inner.write_file("/sandboxes/leak.txt", b"leak").await.unwrap();
        let fs = BoundedFs::new(inner, "/sandbox");

        assert!(!fs.exists("/sandboxes/leak.txt").await);
        let result = fs.read_file("/sandboxes/leak.txt").await;
        assert!(matches!(result, Err(FsError::PermissionDenied { .. })));
    }

    #[tokio::test]
    async fn test_allows_paths_within_root() {
        let inner = InMemoryFs::new();
        inner.mkdir("/sandbox", &MkdirOptions::default()).await.unwrap();
        let fs = BoundedFs::new(inner, "/sandbox");
        fs.write_file("/sandbox/ok.txt", b"ok").await.unwrap();
        assert_eq!(fs.read_file("/sandbox/ok.txt").await.unwrap(), "ok");
    }

    #[tokio::test]
    async fn test_rejects_traversal_above_root() {
        let inner = InMemoryFs::new();
        inner.mkdir("/sandbox", &MkdirOptions::default()).await.unwrap();
        inner.write_file("/secret.txt", b"top secret").await.unwrap();
        let fs = BoundedFs::new(inner, "/sandbox");
        let result = fs.read_file("/sandbox/../secret.txt").await;
        assert!(matches!(result, Err(FsError::PermissionDenied { .. })));
    }

    #[tokio::test]
    async fn test_root_of_slash_allows_everything() {
        let inner = InMemoryFs::new();
        inner.write_file("/anywhere.txt", b"x").await.unwrap();
        let fs = BoundedFs::new(inner, "/");
        assert!(fs.exists("/anywhere.txt").await);
    }
}
