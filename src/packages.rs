//! Flat-file package store: `database/{subject}/{package_id}/package.json`.

use std::path::{Path, PathBuf};

use tracing::{info, instrument};

use crate::domain::QuestionPackage;
use crate::error::{AppError, Result};
use crate::schema::{parse_package, to_pretty_json};

const PACKAGE_FILE: &str = "package.json";
const PACKAGE_PREFIX: &str = "package_";

#[derive(Clone, Debug)]
pub struct PackageStore {
  root: PathBuf,
}

impl PackageStore {
  pub fn new(root: impl Into<PathBuf>) -> Self {
    Self { root: root.into() }
  }

  pub fn root(&self) -> &Path {
    &self.root
  }

  pub fn subject_dir(&self, subject: &str) -> PathBuf {
    self.root.join(subject)
  }

  pub fn package_path(&self, subject: &str, package_id: &str) -> PathBuf {
    self.subject_dir(subject).join(package_id).join(PACKAGE_FILE)
  }

  /// Subject directories, sorted. A missing database root yields an empty list.
  pub fn list_subjects(&self) -> Result<Vec<String>> {
    list_names(&self.root, |is_dir, _| is_dir)
  }

  /// Entries of the subject directory named `package_*`, sorted.
  pub fn list_packages(&self, subject: &str) -> Result<Vec<String>> {
    list_names(&self.subject_dir(subject), |_, name| name.starts_with(PACKAGE_PREFIX))
  }

  #[instrument(level = "debug", skip(self))]
  pub fn load(&self, subject: &str, package_id: &str) -> Result<QuestionPackage> {
    let path = self.package_path(subject, package_id);
    let text = match std::fs::read_to_string(&path) {
      Ok(t) => t,
      Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
        return Err(AppError::NotFound(path.display().to_string()))
      }
      Err(e) => return Err(e.into()),
    };
    Ok(parse_package(&text)?)
  }

  /// Whole-file overwrite of the package under its own `package_id`.
  #[instrument(level = "info", skip(self, pkg), fields(package_id = %pkg.package_id))]
  pub fn save(&self, subject: &str, pkg: &QuestionPackage) -> Result<PathBuf> {
    let path = self.package_path(subject, &pkg.package_id);
    if let Some(dir) = path.parent() {
      std::fs::create_dir_all(dir)?;
    }
    std::fs::write(&path, to_pretty_json(pkg)?)?;
    info!(target: "quizbank", %subject, path = %path.display(), mcqs = pkg.mcqs.len(), essays = pkg.essay.len(), "Saved package");
    Ok(path)
  }
}

fn list_names(dir: &Path, keep: impl Fn(bool, &str) -> bool) -> Result<Vec<String>> {
  if !dir.is_dir() {
    return Ok(Vec::new());
  }
  let mut names = Vec::new();
  for entry in std::fs::read_dir(dir)? {
    let entry = entry?;
    let name = entry.file_name().to_string_lossy().into_owned();
    if keep(entry.file_type()?.is_dir(), &name) {
      names.push(name);
    }
  }
  names.sort();
  Ok(names)
}
