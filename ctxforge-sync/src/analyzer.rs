//! Change analysis: maps a change set onto modules, classifies impact,
//! decides whether the overview needs regenerating and estimates cost.

use std::collections::HashMap;
use std::fmt;

use serde::Serialize;

use ctxforge_core::{
    modules::{describe, module_name_for},
    ChangeSet, ImpactLevel, Module, ModuleImpact, ModuleName, RenamedPath,
};

/// Modules affected beyond which staging the run is suggested.
pub const MANY_MODULES: usize = 5;

const BASE_SECONDS_PER_MODULE: f64 = 20.0;
const OVERVIEW_SECONDS: f64 = 30.0;

// ---------------------------------------------------------------------------
// Cost estimate
// ---------------------------------------------------------------------------

/// Coarse regeneration time estimate, exposed only as a bucket label.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct CostEstimate {
    label: String,
}

impl CostEstimate {
    /// Linear model: 20 s per module, halved for `Low`, doubled for `High`,
    /// plus 30 s when the overview is regenerated.
    pub fn estimate(impacts: &[ModuleImpact], overview_needed: bool) -> Self {
        let mut seconds: f64 = impacts
            .iter()
            .map(|impact| {
                BASE_SECONDS_PER_MODULE
                    * match impact.impact {
                        ImpactLevel::Low => 0.5,
                        ImpactLevel::Medium => 1.0,
                        ImpactLevel::High => 2.0,
                    }
            })
            .sum();
        if overview_needed {
            seconds += OVERVIEW_SECONDS;
        }
        Self {
            label: bucket(seconds),
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }
}

impl fmt::Display for CostEstimate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.label)
    }
}

/// Human time range for an estimate in seconds.
pub fn bucket(seconds: f64) -> String {
    if seconds < 30.0 {
        "<30s".to_string()
    } else if seconds < 60.0 {
        "<1 min".to_string()
    } else if seconds <= 120.0 {
        "1-2 min".to_string()
    } else {
        format!("~{} min", (seconds / 60.0).ceil() as u64)
    }
}

// ---------------------------------------------------------------------------
// Analysis
// ---------------------------------------------------------------------------

/// What a change set means for the artifact tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Analysis {
    /// Sorted by impact, highest first; ties keep first-seen order.
    pub affected_modules: Vec<ModuleImpact>,
    pub overview_needed: bool,
    pub cost: CostEstimate,
    pub recommendations: Vec<String>,
}

impl Analysis {
    pub fn is_empty(&self) -> bool {
        self.affected_modules.is_empty()
    }

    pub fn affected(&self, name: &ModuleName) -> Option<&ModuleImpact> {
        self.affected_modules.iter().find(|m| &m.module == name)
    }
}

struct Accumulator<'a> {
    modules: &'a [Module],
    source_roots: &'a [String],
    order: Vec<ModuleImpact>,
    index: HashMap<ModuleName, usize>,
}

impl<'a> Accumulator<'a> {
    fn entry(&mut self, path: &str) -> &mut ModuleImpact {
        let name = module_name_for(path, self.source_roots);
        let idx = match self.index.get(&name) {
            Some(idx) => *idx,
            None => {
                let description = self
                    .modules
                    .iter()
                    .find(|m| m.name == name)
                    .map(|m| m.description.clone())
                    .unwrap_or_else(|| describe(&name));
                self.order.push(ModuleImpact::new(name.clone(), description));
                self.index.insert(name, self.order.len() - 1);
                self.order.len() - 1
            }
        };
        &mut self.order[idx]
    }

    fn touch(&mut self, path: &str) -> &mut ModuleImpact {
        let impact = self.entry(path);
        if !impact.affected_files.iter().any(|p| p == path) {
            impact.affected_files.push(path.to_string());
        }
        impact
    }

    fn rename(&mut self, rename: &RenamedPath, side: &str) {
        let impact = self.touch(side);
        if !impact.renamed.iter().any(|r| r.from == rename.from) {
            impact.renamed.push(rename.clone());
        }
    }
}

/// Analyze `changes` against the current `modules`.
///
/// Rename sources and targets both count towards their owning module.
pub fn analyze(changes: &ChangeSet, modules: &[Module], source_roots: &[String]) -> Analysis {
    let mut acc = Accumulator {
        modules,
        source_roots,
        order: Vec::new(),
        index: HashMap::new(),
    };

    for path in &changes.added {
        acc.touch(path).added.push(path.clone());
    }
    for path in &changes.modified {
        acc.touch(path).modified.push(path.clone());
    }
    for path in &changes.deleted {
        acc.touch(path).deleted.push(path.clone());
    }
    for rename in &changes.renamed {
        acc.rename(rename, &rename.from);
        acc.rename(rename, &rename.to);
    }

    let mut affected = acc.order;
    for impact in &mut affected {
        impact.reclassify();
    }
    affected.sort_by(|a, b| b.impact.cmp(&a.impact));

    let overview_needed = affected.iter().any(|m| m.impact == ImpactLevel::High)
        || affected.len() > 1
        || changes.has_structural_change();

    let cost = CostEstimate::estimate(&affected, overview_needed);
    let recommendations = recommend(changes, &affected, overview_needed);

    Analysis {
        affected_modules: affected,
        overview_needed,
        cost,
        recommendations,
    }
}

fn recommend(changes: &ChangeSet, affected: &[ModuleImpact], overview_needed: bool) -> Vec<String> {
    if affected.is_empty() {
        return vec!["No relevant source changes; nothing to regenerate.".to_string()];
    }

    let mut out = Vec::new();
    let high: Vec<&str> = affected
        .iter()
        .filter(|m| m.impact == ImpactLevel::High)
        .map(|m| m.module.0.as_str())
        .collect();
    if !high.is_empty() {
        out.push(format!(
            "High-impact changes in {}; review the regenerated docs.",
            high.join(", ")
        ));
    }
    if !changes.deleted.is_empty() {
        out.push(format!(
            "{} file(s) deleted; verify that stale module docs were cleaned up.",
            changes.deleted.len()
        ));
    }
    if !changes.renamed.is_empty() {
        out.push(format!(
            "{} file(s) renamed; check cross-references in other docs.",
            changes.renamed.len()
        ));
    }
    if affected.len() > MANY_MODULES {
        out.push(format!(
            "{} modules affected; consider previewing first or staging the run.",
            affected.len()
        ));
    }
    if overview_needed {
        out.push("Overview and index will be regenerated.".to_string());
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use ctxforge_core::modules::{default_source_roots, group_modules};

    fn set(added: &[&str], modified: &[&str], deleted: &[&str]) -> ChangeSet {
        let owned = |xs: &[&str]| xs.iter().map(|s| s.to_string()).collect();
        ChangeSet {
            added: owned(added),
            modified: owned(modified),
            deleted: owned(deleted),
            renamed: Vec::new(),
        }
    }

    fn scenario_modules() -> Vec<Module> {
        group_modules(
            [
                "generators/a.ts",
                "generators/b.ts",
                "generators/x.ts",
                "services/z.ts",
                "services/w.ts",
            ],
            &default_source_roots(),
        )
    }

    #[test]
    fn scenario_modified_and_deleted() {
        let changes = set(&[], &["generators/x.ts"], &["services/y.ts"]);
        let analysis = analyze(&changes, &scenario_modules(), &default_source_roots());

        let names: Vec<&str> = analysis
            .affected_modules
            .iter()
            .map(|m| m.module.0.as_str())
            .collect();
        assert_eq!(names, ["services", "generators"]);
        assert_eq!(analysis.affected_modules[0].impact, ImpactLevel::High);
        assert_eq!(analysis.affected_modules[1].impact, ImpactLevel::Low);
        assert!(analysis.overview_needed);
        assert_eq!(analysis.affected_modules[0].description, "Service layer");
    }

    #[test]
    fn single_added_path_triggers_overview() {
        let changes = set(&["generators/new.ts"], &[], &[]);
        let analysis = analyze(&changes, &scenario_modules(), &default_source_roots());
        assert_eq!(analysis.affected_modules.len(), 1);
        assert_eq!(analysis.affected_modules[0].impact, ImpactLevel::Low);
        assert!(analysis.overview_needed);
    }

    #[test]
    fn single_modification_does_not_trigger_overview() {
        let changes = set(&[], &["generators/x.ts"], &[]);
        let analysis = analyze(&changes, &scenario_modules(), &default_source_roots());
        assert!(!analysis.overview_needed);
        assert_eq!(analysis.cost.label(), "<30s");
    }

    #[test]
    fn rename_counts_for_both_modules() {
        let changes = ChangeSet {
            renamed: vec![RenamedPath {
                from: "services/z.ts".to_string(),
                to: "generators/z.ts".to_string(),
            }],
            ..ChangeSet::default()
        };
        let analysis = analyze(&changes, &scenario_modules(), &default_source_roots());
        assert_eq!(analysis.affected_modules.len(), 2);
        for impact in &analysis.affected_modules {
            assert_eq!(impact.impact, ImpactLevel::High);
            assert_eq!(impact.renamed.len(), 1);
        }
        assert!(analysis.overview_needed);
    }

    #[test]
    fn rename_within_one_module_is_recorded_once() {
        let changes = ChangeSet {
            renamed: vec![RenamedPath {
                from: "services/z.ts".to_string(),
                to: "services/zz.ts".to_string(),
            }],
            ..ChangeSet::default()
        };
        let analysis = analyze(&changes, &scenario_modules(), &default_source_roots());
        assert_eq!(analysis.affected_modules.len(), 1);
        assert_eq!(analysis.affected_modules[0].renamed.len(), 1);
        assert_eq!(analysis.affected_modules[0].affected_files.len(), 2);
    }

    #[test]
    fn ties_keep_insertion_order() {
        let changes = set(&[], &["services/z.ts", "generators/x.ts"], &[]);
        let analysis = analyze(&changes, &scenario_modules(), &default_source_roots());
        let names: Vec<&str> = analysis
            .affected_modules
            .iter()
            .map(|m| m.module.0.as_str())
            .collect();
        assert_eq!(names, ["services", "generators"]);
    }

    #[test]
    fn empty_change_set_recommends_nothing_to_do() {
        let analysis = analyze(&ChangeSet::default(), &scenario_modules(), &default_source_roots());
        assert!(analysis.is_empty());
        assert!(!analysis.overview_needed);
        assert_eq!(analysis.recommendations.len(), 1);
        assert!(analysis.recommendations[0].contains("nothing to regenerate"));
    }

    #[test]
    fn many_modules_recommendation() {
        let modified: Vec<String> = (0..6).map(|i| format!("dir{i}/file.rs")).collect();
        let changes = ChangeSet {
            modified,
            ..ChangeSet::default()
        };
        let analysis = analyze(&changes, &[], &default_source_roots());
        assert!(analysis
            .recommendations
            .iter()
            .any(|r| r.contains("6 modules affected")));
        // 6 low modules (60 s) + overview (30 s)
        assert_eq!(analysis.cost.label(), "1-2 min");
    }

    #[test]
    fn bucket_labels() {
        assert_eq!(bucket(0.0), "<30s");
        assert_eq!(bucket(29.9), "<30s");
        assert_eq!(bucket(30.0), "<1 min");
        assert_eq!(bucket(60.0), "1-2 min");
        assert_eq!(bucket(120.0), "1-2 min");
        assert_eq!(bucket(121.0), "~3 min");
        assert_eq!(bucket(300.0), "~5 min");
    }
}
