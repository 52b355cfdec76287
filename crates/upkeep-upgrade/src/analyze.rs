//! Classify a customized tree against its stock baseline and carry the
//! customizations over to a new release.

use tracing::{debug, info, warn};
use upkeep_registry::ReleaseRegistry;
use upkeep_tree::{ProjectTree, TrackedFile};

use crate::category::{CategoryRegistry, Trees};
use crate::error::UpgradeResult;
use crate::report::UpgradeReport;

/// Runs the classification rules over a source tree.
pub struct Analyzer<'a> {
    registry: &'a dyn ReleaseRegistry,
    categories: &'a CategoryRegistry,
}

impl<'a> Analyzer<'a> {
    pub fn new(registry: &'a dyn ReleaseRegistry, categories: &'a CategoryRegistry) -> Self {
        Self {
            registry,
            categories,
        }
    }

    /// Classify every tracked file of `source`, in path order.
    ///
    /// Registry failures abort the analysis. Category failures become
    /// warnings.
    pub fn analyze(
        &self,
        source: &ProjectTree,
        base: &ProjectTree,
    ) -> UpgradeResult<UpgradeReport> {
        info!(
            source = %source.root().display(),
            base = %base.root().display(),
            "analyzing customizations"
        );
        let trees = Trees::new(source, base);
        let mut report = UpgradeReport::new();
        for file in source.tracked_files()? {
            self.classify(&file, &trees, &mut report)?;
        }
        info!(
            added = report.added.len(),
            auto_mergeable = report.auto_mergeable.len(),
            manual_merge = report.manual_merge.len(),
            warnings = report.warnings.len(),
            "analysis complete"
        );
        Ok(report)
    }

    fn classify(
        &self,
        file: &TrackedFile,
        trees: &Trees<'_>,
        report: &mut UpgradeReport,
    ) -> UpgradeResult<()> {
        let releases = self.registry.lookup_by_path(&file.path)?;
        let category = self.categories.claim(file);

        if releases.is_empty() {
            let added = match category {
                None => true,
                Some(category) => {
                    match category.is_valid_addition(file, trees, &mut report.warnings) {
                        Ok(valid) => valid,
                        Err(e) => {
                            let message = format!("{} check failed: {e}", category.name());
                            report.warn(&file.path, message);
                            false
                        }
                    }
                }
            };
            debug!(path = %file.path, added, "unregistered file");
            if added {
                report.added.push(file.path.clone());
            }
            return Ok(());
        }

        let fingerprint = file.fingerprint()?;
        if releases.iter().any(|r| r.fingerprint == fingerprint) {
            return Ok(());
        }

        let genuine = match category {
            None => true,
            Some(category) => {
                match category.is_valid_modification(file, trees, &mut report.warnings, &releases) {
                    Ok(genuine) => genuine,
                    Err(e) => {
                        report.warn(&file.path, format!("{} check failed: {e}", category.name()));
                        report.manual_merge.push(file.path.clone());
                        return Ok(());
                    }
                }
            }
        };
        if !genuine {
            debug!(path = %file.path, "incidental modification");
            return Ok(());
        }

        if !trees.base.exists(&file.path)? {
            report.warn(
                &file.path,
                "stock file could not be found in the base project; merge it manually",
            );
            report.manual_merge.push(file.path.clone());
        } else if self.categories.can_auto_merge(&file.path) {
            report.auto_mergeable.push(file.path.clone());
        } else {
            report.manual_merge.push(file.path.clone());
        }
        Ok(())
    }

    /// [`analyze`](Self::analyze), then copy additions into `target` and run
    /// the automatic merges.
    pub fn upgrade(
        &self,
        source: &ProjectTree,
        base: &ProjectTree,
        target: &ProjectTree,
    ) -> UpgradeResult<UpgradeReport> {
        let report = self.analyze(source, base)?;
        let trees = Trees::new(source, base);

        for path in &report.added {
            target.copy_from(source, path)?;
            debug!(path = %path, "added file copied");
        }
        for path in &report.auto_mergeable {
            match self.categories.merger(path) {
                Some(category) => {
                    category.apply_merge(path, &trees, target)?;
                    debug!(path = %path, category = category.name(), "file merged");
                }
                None => warn!(path = %path, "no category can merge this file"),
            }
        }

        info!(
            target = %target.root().display(),
            copied = report.added.len(),
            merged = report.auto_mergeable.len(),
            manual = report.manual_merge.len(),
            "upgrade complete"
        );
        for warning in &report.warnings {
            warn!(path = %warning.path, "{}", warning.message);
        }
        Ok(report)
    }
}

impl std::fmt::Debug for Analyzer<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Analyzer")
            .field("categories", self.categories)
            .finish()
    }
}
