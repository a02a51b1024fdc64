use std::{
    fs::{self, File},
    io::Write,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use serde::Serialize;

use crate::{
    asset::{AssetManifest, DockerImageAsset},
    stack::{Scope, StackEntry, check_stack_id},
    template::Template,
};

/// Collects registered stacks and writes them out for the provisioning engine.
#[derive(Default)]
pub struct App {
    stacks: Vec<StackEntry>,
}

impl Scope for App {
    fn register(&mut self, entry: StackEntry) {
        log::debug!("Registered stack {}", entry.id);
        self.stacks.push(entry);
    }
}

/// Index of everything written by [`App::synth`].
#[derive(Serialize)]
struct Manifest {
    version: &'static str,
    stacks: Vec<ManifestStack>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ManifestStack {
    id: String,
    template_file: String,
    assets_file: String,
}

impl App {
    const MANIFEST: &'static str = "manifest.json";

    pub fn stacks(&self) -> &[StackEntry] {
        &self.stacks
    }

    /// Write a template and an asset manifest per stack plus an index into `out_dir`.
    ///
    /// Build contexts are resolved relative to `project_dir`. Returns the written paths.
    pub fn synth(
        &self,
        project_dir: impl AsRef<Path>,
        out_dir: impl AsRef<Path>,
    ) -> Result<Vec<PathBuf>> {
        let out_dir = out_dir.as_ref();

        // Everything is checked before the first file is written.
        let mut assets = Vec::with_capacity(self.stacks.len());
        for entry in &self.stacks {
            check_stack_id(&entry.id)?;

            let context = project_dir
                .as_ref()
                .join(entry.descriptor.image_source());
            let asset = DockerImageAsset::from_directory(&context)
                .with_context(|| format!("Failed to prepare image for {}", entry.id))?;
            log::debug!(
                "Fingerprinted {:?} as {}",
                asset.directory(),
                asset.fingerprint()
            );
            assets.push(asset);
        }

        fs::create_dir_all(out_dir).with_context(|| format!("Failed to create {out_dir:?}"))?;

        let mut written = Vec::new();
        let mut manifest = Manifest {
            version: "1",
            stacks: Vec::new(),
        };

        for (entry, asset) in self.stacks.iter().zip(&assets) {
            let template_file = format!("{}.template.json", entry.id);
            let template_path = out_dir.join(&template_file);
            Template::render(entry, asset).to_file(&template_path)?;
            written.push(template_path);

            let assets_file = format!("{}.assets.json", entry.id);
            let assets_path = out_dir.join(&assets_file);
            AssetManifest::new(&[asset]).to_file(&assets_path)?;
            written.push(assets_path);

            manifest.stacks.push(ManifestStack {
                id: entry.id.clone(),
                template_file,
                assets_file,
            });
        }

        let manifest_path = out_dir.join(Self::MANIFEST);
        let mut file = File::create(&manifest_path)
            .with_context(|| format!("Failed to open {manifest_path:?}"))?;
        serde_json::to_writer_pretty(&mut file, &manifest)
            .context("Failed to serialize manifest")?;
        file.write_all(b"\n")?;
        written.push(manifest_path);

        Ok(written)
    }
}
