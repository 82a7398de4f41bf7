//! Declarative settings catalog.
//!
//! The catalog is plain JSON, read once at startup and converted into
//! immutable `SettingGroup`s:
//!
//! ```json
//! { "groups": [ { "name": "Dock Settings", "settings": [
//!     { "domain": "com.apple.dock", "key": "tilesize", "kind": "scalar",
//!       "type": "-int", "value": "36", "description": "Set Dock size to smaller" }
//! ] } ] }
//! ```
//!
//! Values that cannot be represented in the typed model (a scalar without a
//! type flag, an unparseable flag) fail the load. Kind-level problems (an
//! unknown `kind`, a dictionary without items) are carried into the model so
//! the engine reports them per setting at apply time; `validate` lists them
//! up front.

use crate::error::{PrefApplyError, Result};
use crate::group::SettingGroup;
use crate::setting::{DictEntry, Setting, SettingKind, TypeFlag};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::fs;
use std::path::Path;

/// Catalog shipped inside the binary
const BUILTIN_CATALOG: &str = include_str!("../catalog/default.json");

#[derive(Debug, Clone, Serialize, Deserialize)]
struct CatalogFile {
    groups: Vec<GroupEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct GroupEntry {
    name: String,
    #[serde(default)]
    settings: Vec<SettingEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct SettingEntry {
    domain: String,
    key: String,
    kind: String,
    #[serde(rename = "type", default)]
    type_flag: Option<String>,
    #[serde(default)]
    value: Option<String>,
    #[serde(default)]
    items: Option<Vec<DictItemEntry>>,
    #[serde(default)]
    description: String,
    #[serde(default)]
    requires_privilege: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct DictItemEntry {
    key: String,
    #[serde(rename = "type")]
    type_flag: String,
    value: String,
}

/// Ordered setting groups, constructed once and never mutated
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Catalog {
    groups: Vec<SettingGroup>,
}

/// A setting the engine will refuse to write
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogIssue {
    pub group: String,
    pub domain: String,
    pub key: String,
    pub problem: String,
}

impl fmt::Display for CatalogIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {} in {}: {}",
            self.group, self.key, self.domain, self.problem
        )
    }
}

impl Catalog {
    pub fn new(groups: Vec<SettingGroup>) -> Self {
        Self { groups }
    }

    /// The catalog compiled into the binary
    pub fn builtin() -> Result<Self> {
        Self::from_json(BUILTIN_CATALOG)
    }

    /// Load a catalog from a JSON file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path)?;
        Self::from_json(&content)
    }

    pub fn from_json(content: &str) -> Result<Self> {
        let file: CatalogFile = serde_json::from_str(content)?;
        let groups = file
            .groups
            .into_iter()
            .map(convert_group)
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { groups })
    }

    pub fn groups(&self) -> &[SettingGroup] {
        &self.groups
    }

    /// Union of every domain referenced by every setting, deduplicated and sorted
    pub fn domains(&self) -> BTreeSet<String> {
        collect_domains(&self.groups)
    }

    pub fn setting_count(&self) -> usize {
        self.groups.iter().map(|g| g.settings().len()).sum()
    }

    /// Settings that will be reported as invalid when applied
    pub fn validate(&self) -> Vec<CatalogIssue> {
        let mut issues = Vec::new();
        for group in &self.groups {
            for setting in group.settings() {
                let problem = match &setting.kind {
                    SettingKind::Dictionary { items } if items.is_empty() => {
                        "dictionary setting has no items".to_string()
                    }
                    SettingKind::Unrecognized { tag } => format!("unknown kind '{}'", tag),
                    _ => continue,
                };
                issues.push(CatalogIssue {
                    group: group.name().to_string(),
                    domain: setting.domain.clone(),
                    key: setting.key.clone(),
                    problem,
                });
            }
        }
        issues
    }
}

/// Union of every domain referenced across `groups`
pub fn collect_domains(groups: &[SettingGroup]) -> BTreeSet<String> {
    groups
        .iter()
        .flat_map(SettingGroup::domains)
        .map(str::to_string)
        .collect()
}

fn convert_group(entry: GroupEntry) -> Result<SettingGroup> {
    let settings = entry
        .settings
        .into_iter()
        .map(|s| convert_setting(&entry.name, s))
        .collect::<Result<Vec<_>>>()?;
    Ok(SettingGroup::new(entry.name, settings))
}

fn convert_setting(group: &str, entry: SettingEntry) -> Result<Setting> {
    let context = |msg: &str| {
        PrefApplyError::catalog(format!(
            "[{}] {} in {}: {}",
            group, entry.key, entry.domain, msg
        ))
    };

    if entry.domain.trim().is_empty() || entry.key.trim().is_empty() {
        return Err(context("domain and key must not be empty"));
    }

    let kind = match entry.kind.as_str() {
        "scalar" | "regular" => {
            let type_flag = parse_type_flag(entry.type_flag.as_deref())
                .map_err(|msg| context(&msg))?;
            let value = required_value(entry.value.as_deref()).map_err(|msg| context(&msg))?;
            SettingKind::Scalar { type_flag, value }
        }
        "array_add" | "array-add" => {
            let value = required_value(entry.value.as_deref()).map_err(|msg| context(&msg))?;
            SettingKind::ArrayAppend { value }
        }
        "dictionary" | "dict" => {
            let items = entry
                .items
                .as_deref()
                .unwrap_or_default()
                .iter()
                .map(|item| {
                    let type_flag = parse_type_flag(Some(&item.type_flag))
                        .map_err(|msg| context(&format!("item '{}': {}", item.key, msg)))?;
                    Ok(DictEntry::new(item.key.as_str(), type_flag, item.value.as_str()))
                })
                .collect::<Result<Vec<_>>>()?;
            SettingKind::Dictionary { items }
        }
        other => SettingKind::Unrecognized {
            tag: other.to_string(),
        },
    };

    Ok(Setting {
        domain: entry.domain,
        key: entry.key,
        kind,
        description: entry.description,
        requires_privilege: entry.requires_privilege,
    })
}

fn parse_type_flag(raw: Option<&str>) -> std::result::Result<TypeFlag, String> {
    match raw.map(str::trim) {
        None | Some("") => Err("missing type flag".to_string()),
        Some(flag) => flag
            .parse()
            .map_err(|_| format!("unsupported type flag '{}'", flag)),
    }
}

fn required_value(raw: Option<&str>) -> std::result::Result<String, String> {
    match raw {
        Some(value) if !value.is_empty() => Ok(value.to_string()),
        _ => Err("missing value".to_string()),
    }
}
