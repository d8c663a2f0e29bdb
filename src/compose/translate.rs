// Rewrites manifest paths from this process's view of the project root to the Engine host's view.

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_yaml::Value;
use std::path::{Component, Path, PathBuf};
use tempfile::TempDir;
use tracing::{debug, warn};

use super::manifest::{BuildSpec, EnvFileSpec, ExtendsSpec, FileObjectSpec, VolumeSpec};
use crate::error::{Error, Result};

/// Resolves `.` and `..` without touching the filesystem.
pub fn normalize_path(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !out.pop() && !path.is_absolute() {
                    out.push("..");
                }
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

/// Maps paths under the local project root onto the host root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathTranslator {
    local_root: PathBuf,
    host_root: PathBuf,
}

impl PathTranslator {
    pub fn new(local_root: impl AsRef<Path>, host_root: impl AsRef<Path>) -> Self {
        Self {
            local_root: normalize_path(local_root.as_ref()),
            host_root: normalize_path(host_root.as_ref()),
        }
    }

    pub fn local_root(&self) -> &Path {
        &self.local_root
    }

    pub fn host_root(&self) -> &Path {
        &self.host_root
    }

    /// Both sides see the same paths; no prefix substitution is needed.
    pub fn is_identity(&self) -> bool {
        self.local_root == self.host_root
    }

    /// Absolute local path -> host path. Paths outside the local root are returned as-is.
    pub fn to_host(&self, path: &Path) -> PathBuf {
        let path = normalize_path(path);
        if self.is_identity() {
            return path;
        }
        match path.strip_prefix(&self.local_root) {
            Ok(rest) if rest.as_os_str().is_empty() => self.host_root.clone(),
            Ok(rest) => self.host_root.join(rest),
            Err(_) => path,
        }
    }
}

/// Path rewriting for one manifest: relative values resolve against its project directory.
pub struct PathRewriter<'a> {
    translator: &'a PathTranslator,
    project_dir: PathBuf,
}

impl<'a> PathRewriter<'a> {
    pub fn new(translator: &'a PathTranslator, project_dir: &Path) -> Self {
        Self {
            translator,
            project_dir: normalize_path(project_dir),
        }
    }

    /// Absolute path in this process's namespace.
    pub fn to_local(&self, raw: &str) -> String {
        normalize_path(&self.project_dir.join(raw))
            .to_string_lossy()
            .into_owned()
    }

    /// Absolute path in the Engine host's namespace.
    pub fn to_host(&self, raw: &str) -> String {
        self.translator
            .to_host(&self.project_dir.join(raw))
            .to_string_lossy()
            .into_owned()
    }
}

/// Re-reads `value` as `T`, rewrites it and writes it back. Shapes that match no variant are
/// left for the CLI to report.
fn rewrite_as<T, F>(value: &mut Value, field: &str, f: F) -> Result<()>
where
    T: DeserializeOwned + Serialize,
    F: FnOnce(T) -> T,
{
    match serde_yaml::from_value::<T>(value.clone()) {
        Ok(spec) => {
            *value = serde_yaml::to_value(f(spec))?;
        }
        Err(e) => debug!(field, error = %e, "leaving unrecognized manifest field as-is"),
    }
    Ok(())
}

/// Rewrites every path-carrying field of a parsed manifest in place.
pub fn rewrite_manifest(doc: &mut Value, paths: &PathRewriter) -> Result<()> {
    let root = doc
        .as_mapping_mut()
        .ok_or_else(|| Error::invalid("compose manifest must be a mapping"))?;

    if let Some(services) = root.get_mut("services").and_then(Value::as_mapping_mut) {
        for (_, service) in services.iter_mut() {
            let Some(service) = service.as_mapping_mut() else {
                continue;
            };
            if let Some(build) = service.get_mut("build") {
                rewrite_as(build, "build", |b: BuildSpec| b.rewrite(paths))?;
            }
            if let Some(env_file) = service.get_mut("env_file") {
                rewrite_as(env_file, "env_file", |e: EnvFileSpec| e.rewrite(paths))?;
            }
            if let Some(extends) = service.get_mut("extends") {
                rewrite_as(extends, "extends", |e: ExtendsSpec| e.rewrite(paths))?;
            }
            if let Some(Value::Sequence(volumes)) = service.get_mut("volumes") {
                for volume in volumes.iter_mut() {
                    rewrite_as(volume, "volumes", |v: VolumeSpec| v.rewrite(paths))?;
                }
            }
        }
    }

    for section in ["configs", "secrets"] {
        if let Some(entries) = root.get_mut(section).and_then(Value::as_mapping_mut) {
            for (_, entry) in entries.iter_mut() {
                rewrite_as(entry, section, |f: FileObjectSpec| f.rewrite(paths))?;
            }
        }
    }
    Ok(())
}

/// Manifest text with all paths rewritten for the Engine host.
pub fn translate_manifest(text: &str, paths: &PathRewriter) -> Result<String> {
    let mut doc: Value = serde_yaml::from_str(text)?;
    // `<<: *anchor` fields must be inlined before rewriting or they keep their local paths
    doc.apply_merge()?;
    rewrite_manifest(&mut doc, paths)?;
    Ok(serde_yaml::to_string(&doc)?)
}

/// A rewritten manifest in its own temporary directory. The directory is removed by `cleanup`
/// or, failing that, when the value is dropped.
#[derive(Debug)]
pub struct TranslatedManifest {
    dir: Option<TempDir>,
    path: PathBuf,
}

impl TranslatedManifest {
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Removes the file and its directory. Failures are logged, never returned.
    pub fn cleanup(mut self) {
        self.remove();
    }

    fn remove(&mut self) {
        if let Some(dir) = self.dir.take() {
            let location = dir.path().to_path_buf();
            match dir.close() {
                Ok(()) => debug!(path = %location.display(), "removed translated manifest"),
                Err(e) => warn!(
                    path = %location.display(),
                    error = %e,
                    "failed to remove translated manifest"
                ),
            }
        }
    }
}

impl Drop for TranslatedManifest {
    fn drop(&mut self) {
        self.remove();
    }
}

/// Reads `manifest_path`, rewrites it for the host namespace and writes the result to a fresh
/// temporary directory.
pub async fn preprocess(
    manifest_path: &Path,
    project_dir: &Path,
    translator: &PathTranslator,
) -> Result<TranslatedManifest> {
    let text = tokio::fs::read_to_string(manifest_path).await?;
    let paths = PathRewriter::new(translator, project_dir);
    let translated = translate_manifest(&text, &paths).map_err(|e| match e {
        Error::Yaml(source) => Error::Manifest {
            path: manifest_path.to_path_buf(),
            source,
        },
        other => other,
    })?;

    let dir = tempfile::Builder::new().prefix("compose-").tempdir()?;
    let file_name = manifest_path
        .file_name()
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("compose.yaml"));
    let path = dir.path().join(file_name);
    // from here on the directory is owned by the guard, so a failed write still cleans up
    let manifest = TranslatedManifest {
        dir: Some(dir),
        path,
    };
    tokio::fs::write(&manifest.path, translated).await?;
    debug!(
        source = %manifest_path.display(),
        translated = %manifest.path.display(),
        "manifest translated"
    );
    Ok(manifest)
}
