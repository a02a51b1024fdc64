use std::{
    collections::BTreeMap,
    fs::{self, File},
    io::Write,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result, bail};
use serde::Serialize;
use sha2::{Digest, Sha256};

/// Repository the provisioning engine pushes container assets to.
pub const REPOSITORY_NAME: &str =
    "cdk-hnb659fds-container-assets-${AWS::AccountId}-${AWS::Region}";

/// A container image that is built from a local build context.
pub struct DockerImageAsset {
    directory: PathBuf,
    fingerprint: String,
}

impl DockerImageAsset {
    pub const DOCKERFILE: &'static str = "Dockerfile";

    /// Locate the build context and fingerprint its contents.
    pub fn from_directory(directory: impl AsRef<Path>) -> Result<Self> {
        let directory = directory.as_ref();
        if !directory.is_dir() {
            bail!("Build context {directory:?} doesn't exist");
        }
        if !directory.join(Self::DOCKERFILE).is_file() {
            bail!(
                "Build context {directory:?} doesn't contain a {}",
                Self::DOCKERFILE
            );
        }

        let directory = directory
            .canonicalize()
            .with_context(|| format!("Failed to resolve {directory:?}"))?;
        let fingerprint = fingerprint(&directory)?;

        Ok(Self {
            directory,
            fingerprint,
        })
    }

    pub fn fingerprint(&self) -> &str {
        &self.fingerprint
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    /// The image URI the deployed function pulls, before the engine substitutes the pseudo
    /// parameters.
    pub fn image_uri(&self) -> String {
        format!(
            "${{AWS::AccountId}}.dkr.ecr.${{AWS::Region}}.${{AWS::URLSuffix}}/{REPOSITORY_NAME}:{}",
            self.fingerprint
        )
    }
}

/// Hash every regular file below `directory` in a stable order.
///
/// Symlinks below `directory` are skipped.
///
/// Both the relative path and the contents of each file are hashed, each followed by a NUL byte.
fn fingerprint(directory: &Path) -> Result<String> {
    let mut files = Vec::new();
    collect_files(directory, directory, &mut files)?;
    files.sort();

    let mut hasher = Sha256::new();
    for relative in &files {
        let contents = fs::read(directory.join(relative))
            .with_context(|| format!("Failed to read {relative} in {directory:?}"))?;
        hasher.update(relative.as_bytes());
        hasher.update(b"\0");
        hasher.update(&contents);
        hasher.update(b"\0");
    }

    Ok(format!("{:x}", hasher.finalize()))
}

fn collect_files(root: &Path, directory: &Path, files: &mut Vec<String>) -> Result<()> {
    let entries =
        fs::read_dir(directory).with_context(|| format!("Failed to read {directory:?}"))?;

    for entry in entries {
        let entry = entry?;
        let path = entry.path();
        // Symlinks are not followed, so a link cycle can't recurse.
        let file_type = entry.file_type()?;
        if file_type.is_symlink() {
            log::warn!("Skipping symlink {path:?} in build context");
        } else if file_type.is_dir() {
            collect_files(root, &path, files)?;
        } else if file_type.is_file() {
            let relative = path.strip_prefix(root)?;
            let components = relative
                .components()
                .map(|component| component.as_os_str().to_string_lossy())
                .collect::<Vec<_>>();
            files.push(components.join("/"));
        }
    }

    Ok(())
}

/// Tells the provisioning engine how to build and where to publish image assets.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AssetManifest {
    version: &'static str,
    docker_images: BTreeMap<String, DockerImageEntry>,
}

#[derive(Serialize)]
struct DockerImageEntry {
    source: DockerImageSource,
    destinations: BTreeMap<String, DockerImageDestination>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct DockerImageSource {
    directory: PathBuf,
    docker_file: &'static str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct DockerImageDestination {
    repository_name: &'static str,
    image_tag: String,
}

impl AssetManifest {
    pub fn new(assets: &[&DockerImageAsset]) -> Self {
        let docker_images = assets
            .iter()
            .map(|asset| {
                let destination = DockerImageDestination {
                    repository_name: REPOSITORY_NAME,
                    image_tag: asset.fingerprint.clone(),
                };
                let entry = DockerImageEntry {
                    source: DockerImageSource {
                        directory: asset.directory.clone(),
                        docker_file: DockerImageAsset::DOCKERFILE,
                    },
                    destinations: BTreeMap::from([(
                        "current_account-current_region".to_string(),
                        destination,
                    )]),
                };
                (asset.fingerprint.clone(), entry)
            })
            .collect();

        Self {
            version: "1",
            docker_images,
        }
    }

    pub fn to_file(&self, path: impl AsRef<Path>) -> Result<()> {
        let mut file = File::create(path.as_ref())
            .with_context(|| format!("Failed to open {:?}", path.as_ref()))?;
        serde_json::to_writer_pretty(&mut file, self)
            .context("Failed to serialize asset manifest")?;
        file.write_all(b"\n")?;
        Ok(())
    }
}
