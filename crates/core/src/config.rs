//! Rules-file loading and validation.
//!
//! The rules file is YAML by default (`.github/conflict-resolver.yml`);
//! a `.toml` extension switches to TOML. Raw entries are deserialized
//! loosely and then validated one by one so errors can name the offending
//! rule by index.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::conflict::{ConflictKind, FalloutPolicy, ResolutionRule, ResolutionStrategy, RuleMatcher};
use crate::errors::ConfigError;
use crate::resolver::RuleSource;

/// Where the workflow action looks when no path is given.
pub const DEFAULT_CONFIG_PATH: &str = ".github/conflict-resolver.yml";

/// Written by `conflict-resolver init`.
pub const SAMPLE_CONFIG: &str = r#"# Automatic merge/rebase conflict resolution rules.
#
# Rules are checked top to bottom; the first rule whose `paths` glob matches
# (and whose `conflict_type`, if given, equals the file's conflict type) wins.
# Files that match no rule are left for manual resolution.
#
# conflict_type: both-modified | both-added | deleted-by-us | deleted-by-them
#                both-deleted | added-by-us | added-by-them
# strategy:      ours | theirs

# `resolve` lets rules handle rename fallout (both-deleted, added-by-us,
# added-by-them); `manual` always leaves those for a human.
rename_fallout: resolve

rules:
  - paths: "package-lock.json"
    strategy: theirs
    description: "Regenerated lockfile"

  - paths: "**/*.snap"
    strategy: theirs
    conflict_type: both-modified

  - paths: "docs/**"
    strategy: ours
"#;

// ---------------------------------------------------------------------------
// Validated rule set
// ---------------------------------------------------------------------------

/// The ordered rules for one pass plus the fallout policy.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RuleSet {
    pub rules: Vec<ResolutionRule>,
    pub rename_fallout: FalloutPolicy,
}

impl RuleSet {
    pub fn new(rules: Vec<ResolutionRule>) -> Self {
        Self {
            rules,
            rename_fallout: FalloutPolicy::default(),
        }
    }

    pub fn with_fallout(mut self, policy: FalloutPolicy) -> Self {
        self.rename_fallout = policy;
        self
    }

    /// A matcher configured with this set's policy.
    pub fn matcher(&self) -> RuleMatcher {
        RuleMatcher::new(self.rename_fallout)
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }
}

// ---------------------------------------------------------------------------
// Raw file shape
// ---------------------------------------------------------------------------

/// Top-level document as written by users.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ConfigFile {
    #[serde(default)]
    pub rename_fallout: FalloutPolicy,

    #[serde(default)]
    pub rules: Option<Vec<RuleEntry>>,
}

/// One rule before validation. Field aliases cover the spellings older
/// rule files used.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RuleEntry {
    #[serde(default, alias = "path", alias = "file_pattern", alias = "filePattern")]
    pub paths: Option<String>,

    #[serde(default)]
    pub strategy: Option<String>,

    #[serde(default, alias = "conflictType")]
    pub conflict_type: Option<String>,

    #[serde(default)]
    pub description: Option<String>,
}

impl RuleEntry {
    fn validate(self, index: usize) -> Result<ResolutionRule, ConfigError> {
        let field = |name: &str| format!("rules[{index}].{name}");

        let path_pattern = self
            .paths
            .filter(|p| !p.trim().is_empty())
            .ok_or_else(|| ConfigError::InvalidValue {
                field: field("paths"),
                detail: "each rule must have a \"paths\" glob".into(),
            })?;

        let strategy = self
            .strategy
            .ok_or_else(|| ConfigError::InvalidValue {
                field: field("strategy"),
                detail: "each rule must have a \"strategy\" field".into(),
            })?
            .parse::<ResolutionStrategy>()
            .map_err(|detail| ConfigError::InvalidValue {
                field: field("strategy"),
                detail,
            })?;

        let kind = self
            .conflict_type
            .map(|raw| {
                raw.parse::<ConflictKind>()
                    .map_err(|e| ConfigError::InvalidValue {
                        field: field("conflict_type"),
                        detail: e.to_string(),
                    })
            })
            .transpose()?;

        Ok(ResolutionRule {
            path_pattern,
            kind,
            strategy,
            description: self.description,
        })
    }
}

impl ConfigFile {
    /// Validate every entry, preserving declaration order.
    pub fn validate(self) -> Result<RuleSet, ConfigError> {
        let entries = self.rules.ok_or_else(|| ConfigError::InvalidValue {
            field: "rules".into(),
            detail: "config must contain a \"rules\" list".into(),
        })?;

        let rules = entries
            .into_iter()
            .enumerate()
            .map(|(index, entry)| entry.validate(index))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(RuleSet {
            rules,
            rename_fallout: self.rename_fallout,
        })
    }
}

// ---------------------------------------------------------------------------
// Parsing
// ---------------------------------------------------------------------------

/// Serialization format of a rules file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    Yaml,
    Toml,
}

impl ConfigFormat {
    /// `.toml` is TOML; everything else is treated as YAML.
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("toml") => Self::Toml,
            _ => Self::Yaml,
        }
    }
}

/// Parse and validate rules-file contents.
pub fn parse_rules(contents: &str, format: ConfigFormat) -> Result<RuleSet, ConfigError> {
    if contents.trim().is_empty() {
        return ConfigFile::default().validate();
    }
    let file: ConfigFile = match format {
        ConfigFormat::Yaml => {
            serde_yaml::from_str(contents).map_err(|e| ConfigError::ParseError(e.to_string()))?
        }
        ConfigFormat::Toml => {
            toml::from_str(contents).map_err(|e| ConfigError::ParseError(e.to_string()))?
        }
    };
    file.validate()
}

// ---------------------------------------------------------------------------
// Loading
// ---------------------------------------------------------------------------

/// A rules file on disk.
#[derive(Debug, Clone)]
pub struct RulesFile {
    path: PathBuf,
}

impl RulesFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the rules. A missing file yields an empty rule set and a
    /// warning; everything else that goes wrong is an error.
    pub fn load(&self) -> Result<RuleSet, ConfigError> {
        if !self.path.exists() {
            warn!(
                path = %self.path.display(),
                "config file not found, no automatic conflict resolution will be performed"
            );
            return Ok(RuleSet::default());
        }
        self.load_required()
    }

    /// Load the rules, failing if the file does not exist.
    pub fn load_required(&self) -> Result<RuleSet, ConfigError> {
        info!(path = %self.path.display(), "loading conflict resolution rules");

        if !self.path.exists() {
            return Err(ConfigError::FileNotFound(self.path.display().to_string()));
        }

        let contents = std::fs::read_to_string(&self.path)?;
        let rule_set = parse_rules(&contents, ConfigFormat::from_path(&self.path))?;

        info!(
            count = rule_set.len(),
            rename_fallout = ?rule_set.rename_fallout,
            "loaded conflict resolution rules"
        );
        debug!(rules = ?rule_set.rules, "rule list");
        Ok(rule_set)
    }
}

impl RuleSource for RulesFile {
    fn load_rules(&self) -> Result<RuleSet, ConfigError> {
        self.load()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn yaml_rules() -> &'static str {
        r#"
rename_fallout: manual
rules:
  - paths: "*.json"
    strategy: theirs
    description: "generated"
  - path: "src/**/*.ts"
    strategy: ours
    conflict_type: both-modified
  - file_pattern: "assets/**"
    strategy: theirs
    conflictType: both_added
"#
    }

    #[test]
    fn test_parse_yaml_rules_in_order() {
        let set = parse_rules(yaml_rules(), ConfigFormat::Yaml).expect("failed to parse yaml");
        assert_eq!(set.rename_fallout, FalloutPolicy::Manual);
        assert_eq!(set.len(), 3);

        assert_eq!(set.rules[0].path_pattern, "*.json");
        assert_eq!(set.rules[0].strategy, ResolutionStrategy::Theirs);
        assert_eq!(set.rules[0].kind, None);
        assert_eq!(set.rules[0].description.as_deref(), Some("generated"));

        assert_eq!(set.rules[1].path_pattern, "src/**/*.ts");
        assert_eq!(set.rules[1].kind, Some(ConflictKind::BothModified));

        assert_eq!(set.rules[2].path_pattern, "assets/**");
        assert_eq!(set.rules[2].kind, Some(ConflictKind::BothAdded));
    }

    #[test]
    fn test_parse_toml_rules() {
        let toml_str = r#"
rename_fallout = "resolve"

[[rules]]
paths = "Cargo.lock"
strategy = "theirs"

[[rules]]
paths = "docs/**"
strategy = "ours"
conflict_type = "deleted-by-them"
"#;
        let set = parse_rules(toml_str, ConfigFormat::Toml).expect("failed to parse toml");
        assert_eq!(set.rename_fallout, FalloutPolicy::Resolve);
        assert_eq!(set.rules[0].path_pattern, "Cargo.lock");
        assert_eq!(set.rules[1].kind, Some(ConflictKind::DeletedByThem));
    }

    #[test]
    fn test_default_fallout_policy_is_resolve() {
        let set = parse_rules("rules: []\n", ConfigFormat::Yaml).unwrap();
        assert!(set.is_empty());
        assert_eq!(set.rename_fallout, FalloutPolicy::Resolve);
    }

    #[test]
    fn test_missing_rules_list_rejected() {
        for doc in ["rename_fallout: manual\n", "", "   \n"] {
            let result = parse_rules(doc, ConfigFormat::Yaml);
            assert!(
                matches!(result, Err(ConfigError::InvalidValue { ref field, .. }) if field == "rules"),
                "doc {doc:?} gave {result:?}"
            );
        }
    }

    #[test]
    fn test_rule_without_paths_rejected() {
        let result = parse_rules("rules:\n  - strategy: ours\n", ConfigFormat::Yaml);
        assert!(matches!(
            result,
            Err(ConfigError::InvalidValue { ref field, .. }) if field == "rules[0].paths"
        ));
    }

    #[test]
    fn test_rule_without_strategy_rejected() {
        let doc = "rules:\n  - paths: a\n    strategy: ours\n  - paths: b\n";
        let result = parse_rules(doc, ConfigFormat::Yaml);
        assert!(matches!(
            result,
            Err(ConfigError::InvalidValue { ref field, .. }) if field == "rules[1].strategy"
        ));
    }

    #[test]
    fn test_invalid_strategy_rejected() {
        let result = parse_rules("rules:\n  - paths: a\n    strategy: manual\n", ConfigFormat::Yaml);
        match result {
            Err(ConfigError::InvalidValue { field, detail }) => {
                assert_eq!(field, "rules[0].strategy");
                assert!(detail.contains("manual"));
            }
            other => panic!("expected InvalidValue, got {other:?}"),
        }
    }

    #[test]
    fn test_invalid_conflict_type_rejected() {
        let doc = "rules:\n  - paths: a\n    strategy: ours\n    conflict_type: renamed\n";
        let result = parse_rules(doc, ConfigFormat::Yaml);
        assert!(matches!(
            result,
            Err(ConfigError::InvalidValue { ref field, .. }) if field == "rules[0].conflict_type"
        ));
    }

    #[test]
    fn test_malformed_yaml_is_parse_error() {
        let result = parse_rules("rules: [unclosed\n", ConfigFormat::Yaml);
        assert!(matches!(result, Err(ConfigError::ParseError(_))));
    }

    #[test]
    fn test_format_from_path() {
        assert_eq!(ConfigFormat::from_path(Path::new("a/rules.toml")), ConfigFormat::Toml);
        assert_eq!(ConfigFormat::from_path(Path::new("a/rules.yml")), ConfigFormat::Yaml);
        assert_eq!(ConfigFormat::from_path(Path::new("a/rules.yaml")), ConfigFormat::Yaml);
        assert_eq!(ConfigFormat::from_path(Path::new("rules")), ConfigFormat::Yaml);
    }

    #[test]
    fn test_load_missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let file = RulesFile::new(dir.path().join("absent.yml"));
        let set = file.load().expect("missing file must not be an error");
        assert!(set.is_empty());

        assert!(matches!(
            file.load_required(),
            Err(ConfigError::FileNotFound(_))
        ));
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("conflict-resolver.yml");
        let mut f = std::fs::File::create(&path).unwrap();
        f.write_all(yaml_rules().as_bytes()).unwrap();

        let set = RulesFile::new(&path).load_rules().expect("load failed");
        assert_eq!(set.len(), 3);
        assert_eq!(set.matcher().fallout_policy(), FalloutPolicy::Manual);
    }

    #[test]
    fn test_sample_config_is_valid() {
        let set = parse_rules(SAMPLE_CONFIG, ConfigFormat::Yaml).expect("sample must parse");
        assert_eq!(set.len(), 3);
        assert_eq!(set.rename_fallout, FalloutPolicy::Resolve);
    }
}
