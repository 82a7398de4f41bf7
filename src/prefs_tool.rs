//! Command shapes for the `defaults` preference-store tool.
//!
//! The engine relies on nothing but these argument layouts and on the
//! tool's stderr wording for absent domains (see `backup::is_domain_absent`).

use crate::command_executor::CommandSpec;
use crate::setting::{DictEntry, TypeFlag};
use std::path::Path;

pub const DEFAULTS_PROGRAM: &str = "defaults";

/// Extension of the files written by `defaults export`
pub const EXPORT_EXTENSION: &str = "plist";

/// `defaults write <domain> <key> <type> <value>`
pub fn write_scalar(domain: &str, key: &str, type_flag: TypeFlag, value: &str) -> CommandSpec {
    CommandSpec::new(DEFAULTS_PROGRAM)
        .args(["write", domain, key])
        .arg(type_flag.to_string())
        .arg(value)
}

/// `defaults write <domain> <key> -array-add <value>`
pub fn write_array_add(domain: &str, key: &str, value: &str) -> CommandSpec {
    CommandSpec::new(DEFAULTS_PROGRAM).args(["write", domain, key, "-array-add", value])
}

/// `defaults write <domain> <key> -dict <subkey> <type> <value> ...`, items in order
pub fn write_dict(domain: &str, key: &str, items: &[DictEntry]) -> CommandSpec {
    items.iter().fold(
        CommandSpec::new(DEFAULTS_PROGRAM).args(["write", domain, key, "-dict"]),
        |spec, item| {
            spec.arg(item.key.as_str())
                .arg(item.type_flag.to_string())
                .arg(item.value.as_str())
        },
    )
}

/// `defaults export <domain> <path>`, or `None` if `path` is not valid UTF-8
pub fn export(domain: &str, path: &Path) -> Option<CommandSpec> {
    let path = path.to_str()?;
    Some(CommandSpec::new(DEFAULTS_PROGRAM).args(["export", domain, path]))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_scalar_shape() {
        let spec = write_scalar("com.apple.dock", "tilesize", TypeFlag::Int, "36");
        assert_eq!(spec.program(), "defaults");
        assert_eq!(
            spec.arguments(),
            ["write", "com.apple.dock", "tilesize", "-int", "36"]
        );
    }

    #[test]
    fn test_write_array_add_keeps_value_verbatim() {
        let value = r#"{LSHandlerRoleAll="com.google.chrome";LSHandlerURLScheme="http";}"#;
        let spec = write_array_add(
            "com.apple.LaunchServices/com.apple.launchservices.secure",
            "LSHandlers",
            value,
        );
        assert_eq!(spec.arguments()[3], "-array-add");
        assert_eq!(spec.arguments()[4], value);
    }

    #[test]
    fn test_write_dict_embeds_items_in_order() {
        let items = vec![
            DictEntry::new("TimeAnnouncementsEnabled", TypeFlag::Bool, "true"),
            DictEntry::new("TimeAnnouncerVolume", TypeFlag::Float, "0.5"),
            DictEntry::new("SpeakingRate", TypeFlag::Int, "180"),
        ];
        let spec = write_dict(
            "com.apple.speech.synthesis.general.prefs",
            "TimeAnnouncementPrefs",
            &items,
        );
        assert_eq!(
            spec.to_command_line(),
            "defaults write com.apple.speech.synthesis.general.prefs TimeAnnouncementPrefs -dict \
             TimeAnnouncementsEnabled -bool true TimeAnnouncerVolume -float 0.5 SpeakingRate -int 180"
        );
    }

    #[test]
    fn test_export_shape() {
        let path = Path::new("/tmp/b/com.apple.finder.plist");
        let spec = export("com.apple.finder", path).unwrap();
        assert_eq!(
            spec.arguments(),
            ["export", "com.apple.finder", "/tmp/b/com.apple.finder.plist"]
        );
    }

    #[test]
    fn test_export_rejects_non_utf8_path() {
        use std::ffi::OsStr;
        use std::os::unix::ffi::OsStrExt;

        let path = Path::new(OsStr::from_bytes(b"/tmp/b\xff/d.plist"));
        assert!(export("d", path).is_none());
    }
}
