/*!
 * Audio packaging.
 *
 * Turns a character's `AudioBundle` into downloadable artifacts:
 * - `<output>/<KEY>/<KEY>_line_NNN.<ext>`: one file per synthesized line,
 *   numbered 1..n in sequence order with no gaps for failed lines
 * - `<output>/<KEY>_all_lines.zip`: the same files in a single archive
 *
 * Archives are written with fixed timestamps and permissions so that packaging
 * the same bundle twice produces byte-identical files.
 */

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use log::{debug, info};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, DateTime, ZipWriter};

use crate::errors::PackageError;
use crate::file_utils::FileManager;
use crate::synthesis::AudioBundle;

/// Files produced for one character
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackagedCharacter {
    pub character: String,
    pub archive: PathBuf,
    pub line_files: Vec<PathBuf>,
}

/// Writes per-character line files and archives into an output directory
#[derive(Debug, Clone)]
pub struct AudioPackager {
    output_dir: PathBuf,
    extension: String,
}

impl AudioPackager {
    pub fn new(output_dir: impl Into<PathBuf>, extension: impl Into<String>) -> Self {
        Self {
            output_dir: output_dir.into(),
            extension: extension.into(),
        }
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Final names of the bundle's files, in archive order
    pub fn entry_names(&self, bundle: &AudioBundle) -> Vec<String> {
        (1..=bundle.len())
            .map(|index| FileManager::line_file_name(&bundle.character, index, &self.extension))
            .collect()
    }

    /// Package a bundle and return the archive path.
    ///
    /// Any previous output for the same character is replaced.
    pub fn package(&self, bundle: &AudioBundle) -> Result<PathBuf, PackageError> {
        Ok(self.package_character(bundle)?.archive)
    }

    /// Package a bundle and return every file written
    pub fn package_character(&self, bundle: &AudioBundle) -> Result<PackagedCharacter, PackageError> {
        if bundle.is_empty() {
            return Err(PackageError::EmptyBundle(bundle.character.clone()));
        }

        let line_files = self.export_lines(bundle)?;
        let archive = FileManager::archive_path(&self.output_dir, &bundle.character);
        self.write_archive(&archive, &line_files)?;

        info!(
            "Packaged {} lines for {} into {}",
            line_files.len(),
            bundle.character,
            archive.display()
        );

        Ok(PackagedCharacter {
            character: bundle.character.clone(),
            archive,
            line_files,
        })
    }

    /// Copy staged files to their final names under `<output>/<KEY>/`
    fn export_lines(&self, bundle: &AudioBundle) -> Result<Vec<PathBuf>, PackageError> {
        let character_dir = self
            .output_dir
            .join(FileManager::sanitize_file_component(&bundle.character));

        // Leftovers of an earlier run may have more lines than this one
        if character_dir.exists() {
            fs::remove_dir_all(&character_dir)?;
        }
        fs::create_dir_all(&character_dir)?;

        let mut exported = Vec::with_capacity(bundle.len());
        for (name, staged) in self.entry_names(bundle).into_iter().zip(bundle.paths()) {
            let target = character_dir.join(&name);
            debug!("{} -> {}", staged.display(), target.display());
            fs::copy(staged, &target)?;
            exported.push(target);
        }
        Ok(exported)
    }

    fn write_archive(&self, archive: &Path, files: &[PathBuf]) -> Result<(), PackageError> {
        let options = SimpleFileOptions::default()
            .compression_method(CompressionMethod::Deflated)
            .last_modified_time(DateTime::default())
            .unix_permissions(0o644);

        // Write next to the target and rename so a failed run never leaves a torn archive
        let partial = archive.with_extension("zip.partial");
        {
            let mut writer = ZipWriter::new(BufWriter::new(File::create(&partial)?));
            for path in files {
                let name = path
                    .file_name()
                    .map(|n| n.to_string_lossy().to_string())
                    .unwrap_or_default();
                writer.start_file(name, options)?;
                writer.write_all(&fs::read(path)?)?;
            }
            writer.finish()?.flush()?;
        }
        fs::rename(&partial, archive)?;
        Ok(())
    }
}
