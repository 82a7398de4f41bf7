//! Typed preference writes and their apply strategies.
//!
//! A `Setting` is immutable value data. `Setting::apply` never fails: every
//! outcome is reported through the context's `Reporter` and summarized in
//! the returned `ApplyOutcome`.

use crate::command_executor::CommandOutput;
use crate::context::EngineContext;
use crate::prefs_tool;
use strum::{Display, EnumIter, EnumString};
use tracing::Level;

/// Storage type flag passed to `defaults write`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[derive(Display, EnumString, EnumIter)]
pub enum TypeFlag {
    #[strum(to_string = "-bool", serialize = "-boolean", serialize = "bool", serialize = "boolean")]
    Bool,
    #[strum(to_string = "-int", serialize = "-integer", serialize = "int", serialize = "integer")]
    Int,
    #[strum(to_string = "-float", serialize = "float")]
    Float,
    #[strum(to_string = "-string", serialize = "string")]
    Text,
}

/// One `(subkey, type, value)` triple of a dictionary write
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DictEntry {
    pub key: String,
    pub type_flag: TypeFlag,
    pub value: String,
}

impl DictEntry {
    pub fn new(key: impl Into<String>, type_flag: TypeFlag, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            type_flag,
            value: value.into(),
        }
    }
}

/// Apply strategy of a setting, with the data that strategy needs
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SettingKind {
    /// Single typed value assignment
    Scalar { type_flag: TypeFlag, value: String },
    /// Append one element to an array-valued key
    ArrayAppend { value: String },
    /// Replace the key with a dictionary built from `items`
    Dictionary { items: Vec<DictEntry> },
    /// A kind tag read from a catalog that this engine does not implement
    Unrecognized { tag: String },
}

/// One preference write intent
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Setting {
    pub domain: String,
    pub key: String,
    pub kind: SettingKind,
    /// Logged on success; no semantic effect
    pub description: String,
    pub requires_privilege: bool,
}

/// What happened when a setting was applied
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyOutcome {
    /// The write command succeeded
    Applied,
    /// The write command ran and failed
    Failed,
    /// Not attempted: elevated privilege required but not held
    Skipped,
    /// Not attempted: the setting itself is malformed
    Invalid,
}

impl Setting {
    fn with_kind(domain: impl Into<String>, key: impl Into<String>, kind: SettingKind) -> Self {
        Self {
            domain: domain.into(),
            key: key.into(),
            kind,
            description: String::new(),
            requires_privilege: false,
        }
    }

    pub fn scalar(
        domain: impl Into<String>,
        key: impl Into<String>,
        type_flag: TypeFlag,
        value: impl Into<String>,
    ) -> Self {
        Self::with_kind(
            domain,
            key,
            SettingKind::Scalar {
                type_flag,
                value: value.into(),
            },
        )
    }

    pub fn array_add(
        domain: impl Into<String>,
        key: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        Self::with_kind(domain, key, SettingKind::ArrayAppend { value: value.into() })
    }

    pub fn dictionary(
        domain: impl Into<String>,
        key: impl Into<String>,
        items: Vec<DictEntry>,
    ) -> Self {
        Self::with_kind(domain, key, SettingKind::Dictionary { items })
    }

    pub fn unrecognized(
        domain: impl Into<String>,
        key: impl Into<String>,
        tag: impl Into<String>,
    ) -> Self {
        Self::with_kind(domain, key, SettingKind::Unrecognized { tag: tag.into() })
    }

    pub fn describe(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn privileged(mut self) -> Self {
        self.requires_privilege = true;
        self
    }

    /// Write this setting through the preference tool.
    pub fn apply(&self, ctx: &EngineContext<'_>) -> ApplyOutcome {
        if self.requires_privilege && !ctx.privilege.has_elevated_privilege() {
            ctx.reporter.warn(&format!(
                "Setting {} in {} requires sudo. Skipping.",
                self.key, self.domain
            ));
            return ApplyOutcome::Skipped;
        }

        match &self.kind {
            SettingKind::Scalar { type_flag, value } => {
                let command = prefs_tool::write_scalar(&self.domain, &self.key, *type_flag, value);
                let output = ctx.runner.run(&command, ctx.captured());
                self.finish(
                    ctx,
                    &output,
                    Level::ERROR,
                    format!(
                        "Failed to apply setting: {}={}{} for domain {}",
                        self.key,
                        value,
                        self.note(),
                        self.domain
                    ),
                )
            }
            SettingKind::ArrayAppend { value } => {
                let command = prefs_tool::write_array_add(&self.domain, &self.key, value);
                let output = ctx.runner.run(&command, ctx.captured());
                // Appends are tolerated: the array may not exist yet on a first run
                self.finish(
                    ctx,
                    &output,
                    Level::WARN,
                    format!(
                        "Failed to add to array: {} += {}{} for domain {}",
                        self.key,
                        value,
                        self.note(),
                        self.domain
                    ),
                )
            }
            SettingKind::Dictionary { items } if items.is_empty() => {
                ctx.reporter.error(&format!(
                    "Dictionary setting {} in {} has no items; nothing written.",
                    self.key, self.domain
                ));
                ApplyOutcome::Invalid
            }
            SettingKind::Dictionary { items } => {
                let command = prefs_tool::write_dict(&self.domain, &self.key, items);
                let output = ctx.runner.run(&command, ctx.captured());
                self.finish(
                    ctx,
                    &output,
                    Level::ERROR,
                    format!(
                        "Failed to apply dict setting: {}{} for domain {}",
                        self.key,
                        self.note(),
                        self.domain
                    ),
                )
            }
            SettingKind::Unrecognized { tag } => {
                ctx.reporter.error(&format!(
                    "Unknown setting type '{}' for {} in {}",
                    tag, self.key, self.domain
                ));
                ApplyOutcome::Invalid
            }
        }
    }

    fn finish(
        &self,
        ctx: &EngineContext<'_>,
        output: &CommandOutput,
        failure_level: Level,
        failure_message: String,
    ) -> ApplyOutcome {
        if output.success {
            if !self.description.is_empty() {
                ctx.reporter.info(&self.description);
            }
            return ApplyOutcome::Applied;
        }

        ctx.reporter.report(failure_level, &failure_message);
        if let Some(stderr) = output.stderr_text() {
            ctx.reporter.report(failure_level, &format!("Stderr: {}", stderr));
        }
        ApplyOutcome::Failed
    }

    /// " (description)" or nothing
    fn note(&self) -> String {
        if self.description.is_empty() {
            String::new()
        } else {
            format!(" ({})", self.description)
        }
    }
}
