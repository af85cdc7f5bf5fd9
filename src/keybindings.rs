//! Keyboard shortcuts for list-level actions.
//!
//! Shortcuts are written as strings such as `Ctrl+S` or `Ctrl+Shift+D`,
//! stored in the config file and parsed into [`Shortcut`]s. A key press
//! matches a shortcut only if the key and all three modifiers match exactly.

use std::fmt;

use crate::config::ShortcutsConfig;

/// Action triggered by a shortcut.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShortcutAction {
    /// Save the current image's annotations
    Save,
    /// Remove every annotation of the current image
    Clear,
    /// Open the previous image (wraps around)
    PrevImage,
    /// Open the next image (wraps around)
    NextImage,
}

impl ShortcutAction {
    /// Get the display name for this action.
    pub fn name(&self) -> &'static str {
        match self {
            ShortcutAction::Save => "Save",
            ShortcutAction::Clear => "Clear annotations",
            ShortcutAction::PrevImage => "Previous image",
            ShortcutAction::NextImage => "Next image",
        }
    }

    /// Get all actions, in dispatch order.
    pub fn all() -> &'static [ShortcutAction] {
        &[
            ShortcutAction::Save,
            ShortcutAction::Clear,
            ShortcutAction::PrevImage,
            ShortcutAction::NextImage,
        ]
    }
}

/// A key press as delivered by the host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyPress {
    /// Key name as reported by the host (`"s"`, `"ArrowUp"`, `" "`, ...).
    pub key: String,
    pub ctrl: bool,
    pub shift: bool,
    pub alt: bool,
}

impl KeyPress {
    /// A key without modifiers.
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            ctrl: false,
            shift: false,
            alt: false,
        }
    }

    pub fn ctrl(mut self) -> Self {
        self.ctrl = true;
        self
    }

    pub fn shift(mut self) -> Self {
        self.shift = true;
        self
    }

    pub fn alt(mut self) -> Self {
        self.alt = true;
        self
    }
}

/// A parsed shortcut: one key plus exact modifier state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Shortcut {
    /// Canonical key name.
    pub key: String,
    pub ctrl: bool,
    pub shift: bool,
    pub alt: bool,
}

impl Shortcut {
    /// Parse `Mod+Mod+Key`. Case-insensitive; returns None without a key.
    pub fn parse(text: &str) -> Option<Self> {
        let lower = text.trim().to_lowercase();
        let mut parts: Vec<&str> = lower.split('+').map(str::trim).collect();
        // "Ctrl++" binds the plus key
        if lower.ends_with("++") {
            parts.truncate(parts.len().saturating_sub(2));
            parts.push("+");
        }
        let key = parts.pop().filter(|k| !k.is_empty())?;
        Some(Self {
            key: canonical_key(key),
            ctrl: parts.contains(&"ctrl"),
            shift: parts.contains(&"shift"),
            alt: parts.contains(&"alt"),
        })
    }

    /// Whether a key press triggers this shortcut.
    pub fn matches(&self, press: &KeyPress) -> bool {
        press.ctrl == self.ctrl
            && press.shift == self.shift
            && press.alt == self.alt
            && press.key.to_lowercase() == self.key.to_lowercase()
    }

    /// The key press that triggers this shortcut.
    pub fn to_key_press(&self) -> KeyPress {
        KeyPress {
            key: self.key.clone(),
            ctrl: self.ctrl,
            shift: self.shift,
            alt: self.alt,
        }
    }
}

impl fmt::Display for Shortcut {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.ctrl {
            write!(f, "Ctrl+")?;
        }
        if self.shift {
            write!(f, "Shift+")?;
        }
        if self.alt {
            write!(f, "Alt+")?;
        }
        match self.key.as_str() {
            " " => write!(f, "Space"),
            key => write!(f, "{}", key),
        }
    }
}

/// Map lowercase key names and aliases to the names hosts report.
fn canonical_key(key: &str) -> String {
    match key {
        "arrowup" => "ArrowUp".to_string(),
        "arrowdown" => "ArrowDown".to_string(),
        "arrowleft" => "ArrowLeft".to_string(),
        "arrowright" => "ArrowRight".to_string(),
        "space" => " ".to_string(),
        "esc" | "escape" => "Escape".to_string(),
        "enter" => "Enter".to_string(),
        "backspace" => "Backspace".to_string(),
        other => {
            let mut chars = other.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect(),
                None => String::new(),
            }
        }
    }
}

/// Active shortcut bindings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyBindings {
    pub save: Shortcut,
    pub clear: Shortcut,
    pub prev_image: Shortcut,
    pub next_image: Shortcut,
}

impl Default for KeyBindings {
    fn default() -> Self {
        Self::from_config(&ShortcutsConfig::default())
    }
}

impl KeyBindings {
    /// Create new keybindings with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build bindings from config strings. Unparseable entries keep their defaults.
    pub fn from_config(config: &ShortcutsConfig) -> Self {
        let defaults = ShortcutsConfig::default();
        let pick = |value: &str, fallback: &str, what: &str| {
            Shortcut::parse(value).unwrap_or_else(|| {
                log::warn!("Invalid {} shortcut {:?}, using {}", what, value, fallback);
                Shortcut::parse(fallback).unwrap_or(Shortcut {
                    key: String::new(),
                    ctrl: false,
                    shift: false,
                    alt: false,
                })
            })
        };
        let bindings = Self {
            save: pick(&config.save, &defaults.save, "save"),
            clear: pick(&config.clear, &defaults.clear, "clear"),
            prev_image: pick(&config.prev_image, &defaults.prev_image, "previous image"),
            next_image: pick(&config.next_image, &defaults.next_image, "next image"),
        };
        for (winner, shadowed) in bindings.conflicts() {
            log::warn!(
                "Shortcut {} is bound to both {} and {}; {} will never trigger",
                bindings.shortcut_for(shadowed),
                winner.name(),
                shadowed.name(),
                shadowed.name()
            );
        }
        bindings
    }

    /// Convert back to config strings.
    pub fn to_config(&self) -> ShortcutsConfig {
        ShortcutsConfig {
            save: self.save.to_string(),
            clear: self.clear.to_string(),
            prev_image: self.prev_image.to_string(),
            next_image: self.next_image.to_string(),
        }
    }

    /// Get the shortcut bound to an action.
    pub fn shortcut_for(&self, action: ShortcutAction) -> &Shortcut {
        match action {
            ShortcutAction::Save => &self.save,
            ShortcutAction::Clear => &self.clear,
            ShortcutAction::PrevImage => &self.prev_image,
            ShortcutAction::NextImage => &self.next_image,
        }
    }

    /// Get the action that corresponds to a key press, if any.
    pub fn action_for(&self, press: &KeyPress) -> Option<ShortcutAction> {
        ShortcutAction::all()
            .iter()
            .copied()
            .find(|action| self.shortcut_for(*action).matches(press))
    }

    /// Check if a shortcut is already bound to another action.
    pub fn conflict(&self, shortcut: &Shortcut, exclude: ShortcutAction) -> Option<ShortcutAction> {
        ShortcutAction::all()
            .iter()
            .copied()
            .filter(|action| *action != exclude)
            .find(|action| self.shortcut_for(*action) == shortcut)
    }

    /// Actions whose shortcut is already taken by an earlier action, as
    /// `(earlier, shadowed)` pairs. The earlier action wins in [`Self::action_for`].
    pub fn conflicts(&self) -> Vec<(ShortcutAction, ShortcutAction)> {
        let all = ShortcutAction::all();
        all.iter()
            .enumerate()
            .filter_map(|(index, &action)| {
                self.conflict(self.shortcut_for(action), action)
                    .filter(|other| all[..index].contains(other))
                    .map(|other| (other, action))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_modifiers_and_aliases() {
        let s = Shortcut::parse("Ctrl+Shift+D").unwrap();
        assert_eq!(s.key, "D");
        assert!(s.ctrl && s.shift && !s.alt);

        assert_eq!(Shortcut::parse("arrowup").unwrap().key, "ArrowUp");
        assert_eq!(Shortcut::parse("alt+esc").unwrap().key, "Escape");
        assert_eq!(Shortcut::parse("Space").unwrap().key, " ");
        assert_eq!(Shortcut::parse("ctrl++").unwrap().key, "+");
        assert!(Shortcut::parse("").is_none());
        assert!(Shortcut::parse("Ctrl+").is_none());
    }

    #[test]
    fn test_modifiers_must_match_exactly() {
        let save = Shortcut::parse("Ctrl+S").unwrap();
        assert!(save.matches(&KeyPress::new("s").ctrl()));
        assert!(save.matches(&KeyPress::new("S").ctrl()));
        assert!(!save.matches(&KeyPress::new("s")));
        assert!(!save.matches(&KeyPress::new("s").ctrl().shift()));
        assert!(save.matches(&save.to_key_press()));
    }

    #[test]
    fn test_default_actions() {
        let bindings = KeyBindings::new();
        assert_eq!(bindings.action_for(&KeyPress::new("s").ctrl()), Some(ShortcutAction::Save));
        assert_eq!(
            bindings.action_for(&KeyPress::new("d").ctrl().shift()),
            Some(ShortcutAction::Clear)
        );
        assert_eq!(bindings.action_for(&KeyPress::new("ArrowUp")), Some(ShortcutAction::PrevImage));
        assert_eq!(bindings.action_for(&KeyPress::new("ArrowDown")), Some(ShortcutAction::NextImage));
        assert_eq!(bindings.action_for(&KeyPress::new("x")), None);
    }

    #[test]
    fn test_invalid_config_entry_keeps_default() {
        let config = ShortcutsConfig {
            save: "Ctrl+".to_string(),
            next_image: "n".to_string(),
            ..ShortcutsConfig::default()
        };
        let bindings = KeyBindings::from_config(&config);
        assert_eq!(bindings.save, Shortcut::parse("Ctrl+S").unwrap());
        assert_eq!(bindings.action_for(&KeyPress::new("n")), Some(ShortcutAction::NextImage));
    }

    #[test]
    fn test_display_round_trips() {
        let bindings = KeyBindings::new();
        assert_eq!(bindings.to_config(), ShortcutsConfig::default());
        assert_eq!(Shortcut::parse("space").unwrap().to_string(), "Space");
    }

    #[test]
    fn test_conflict() {
        let bindings = KeyBindings::new();
        let ctrl_s = Shortcut::parse("ctrl+s").unwrap();
        assert_eq!(bindings.conflict(&ctrl_s, ShortcutAction::Clear), Some(ShortcutAction::Save));
        assert_eq!(bindings.conflict(&ctrl_s, ShortcutAction::Save), None);
        assert!(bindings.conflicts().is_empty());
    }

    #[test]
    fn test_duplicate_config_shortcut_is_reported() {
        let config = ShortcutsConfig {
            next_image: "ctrl+s".to_string(),
            ..ShortcutsConfig::default()
        };
        let bindings = KeyBindings::from_config(&config);
        assert_eq!(
            bindings.conflicts(),
            vec![(ShortcutAction::Save, ShortcutAction::NextImage)]
        );
        assert_eq!(bindings.action_for(&KeyPress::new("s").ctrl()), Some(ShortcutAction::Save));
    }
}
