//! Named, ordered collections of settings.

use crate::context::EngineContext;
use crate::setting::{ApplyOutcome, Setting};

/// Settings applied together, in declared order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SettingGroup {
    name: String,
    settings: Vec<Setting>,
}

impl SettingGroup {
    pub fn new(name: impl Into<String>, settings: Vec<Setting>) -> Self {
        Self {
            name: name.into(),
            settings,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn settings(&self) -> &[Setting] {
        &self.settings
    }

    /// Domains referenced by this group's settings, duplicates included
    pub fn domains(&self) -> impl Iterator<Item = &str> {
        self.settings.iter().map(|s| s.domain.as_str())
    }

    /// Apply every member once, in order. A failing member never stops the rest.
    pub fn apply(&self, ctx: &EngineContext<'_>) {
        ctx.reporter.info(&format!("Configuring {}...", self.name));

        let (mut applied, mut failed, mut skipped, mut invalid) = (0usize, 0usize, 0usize, 0usize);
        for setting in &self.settings {
            match setting.apply(ctx) {
                ApplyOutcome::Applied => applied += 1,
                ApplyOutcome::Failed => failed += 1,
                ApplyOutcome::Skipped => skipped += 1,
                ApplyOutcome::Invalid => invalid += 1,
            }
        }

        ctx.reporter.debug(&format!(
            "{}: {} applied, {} failed, {} skipped, {} invalid",
            self.name, applied, failed, skipped, invalid
        ));
    }
}
