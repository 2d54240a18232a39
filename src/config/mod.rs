//! User configuration: workspace count, border styling, keybinds, per-window
//! rules and autostart commands. Loaded from a TOML file with full built-in
//! defaults, and re-loadable at runtime via the reload action.

pub mod action;
pub mod keys;

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};

use anyhow::{Context as _, Result};
use serde::Deserialize;
use tracing::warn;

use crate::config::action::Action;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
struct RawConfig {
    workspace_count: usize,
    workspace_names: Vec<String>,
    border_width: u32,
    focused_color: u32,
    unfocused_color: u32,
    alternate_split: bool,
    keybinds: BTreeMap<String, Vec<String>>,
    rules: Vec<WindowRule>,
    autostart: Vec<String>,
    autostart_on_reload: Vec<String>,
}

impl Default for RawConfig {
    fn default() -> Self {
        Self {
            workspace_count: 9,
            workspace_names: Vec::new(),
            border_width: 3,
            focused_color: 0xffffff,
            unfocused_color: 0x41485f,
            alternate_split: true,
            keybinds: default_keybinds(),
            rules: Vec::new(),
            autostart: Vec::new(),
            autostart_on_reload: Vec::new(),
        }
    }
}

fn default_keybinds() -> BTreeMap<String, Vec<String>> {
    let mut binds = BTreeMap::new();
    let mut bind = |combo: &str, actions: &[&str]| {
        binds.insert(combo.to_string(), actions.iter().map(|s| s.to_string()).collect());
    };

    bind("Mod4+Left", &["navigate_left"]);
    bind("Mod4+Right", &["navigate_right"]);
    bind("Mod4+Up", &["navigate_up"]);
    bind("Mod4+Down", &["navigate_down"]);
    bind("Mod4+g", &["tile_horizontal"]);
    bind("Mod4+v", &["tile_vertical"]);
    bind("Mod4+space", &["toggle_floating"]);
    bind("Mod4+f", &["toggle_fullscreen"]);
    bind("Mod4+q", &["kill"]);
    bind("Mod4+r", &["reload"]);
    bind("Mod4+Shift+e", &["exit"]);
    bind("Mod4+Return", &["exec:xterm"]);
    for n in 1..=9 {
        binds.insert(format!("Mod4+{n}"), vec![format!("goto_workspace:{n}")]);
        binds.insert(format!("Mod4+Shift+{n}"), vec![format!("move_to_workspace:{n}")]);
    }
    binds
}

/// A per-window rule, matched against the window's WM_CLASS.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct WindowRule {
    pub class: String,
    /// Spawn workspace, 1-based as written by the user.
    pub workspace: Option<usize>,
    pub float: bool,
    pub fullscreen: bool,
    pub prohibit: bool,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub workspace_count: usize,
    pub border_width: u32,
    pub focused_color: u32,
    pub unfocused_color: u32,
    pub alternate_split: bool,
    pub autostart: Vec<String>,
    pub autostart_on_reload: Vec<String>,
    workspace_names: Vec<String>,
    keybinds: HashMap<(u16, u32), Vec<Action>>,
    rules: Vec<WindowRule>,
}

impl Default for Config {
    fn default() -> Self {
        Self::from_raw(RawConfig::default())
    }
}

impl Config {
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join("driftwm").join("config.toml"))
    }

    /// Loads the config file, falling back to built-in defaults when no file
    /// exists. A file that exists but fails to parse is an error; silently
    /// running with defaults over a typo'd config helps nobody.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = match path {
            Some(p) => p.to_path_buf(),
            None => match Self::default_path() {
                Some(p) => p,
                None => return Ok(Self::default()),
            },
        };

        if !path.exists() {
            return Ok(Self::default());
        }

        let text = std::fs::read_to_string(&path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        let raw: RawConfig = toml::from_str(&text)
            .with_context(|| format!("failed to parse {}", path.display()))?;
        Ok(Self::from_raw(raw))
    }

    /// Parses a configuration from TOML text.
    pub fn from_toml(text: &str) -> Result<Self> {
        let raw: RawConfig = toml::from_str(text)?;
        Ok(Self::from_raw(raw))
    }

    fn from_raw(raw: RawConfig) -> Self {
        let workspace_count = raw.workspace_count.max(1);

        let mut workspace_names = raw.workspace_names;
        workspace_names.truncate(workspace_count);
        for i in workspace_names.len()..workspace_count {
            workspace_names.push((i + 1).to_string());
        }

        let mut keybinds: HashMap<(u16, u32), Vec<Action>> = HashMap::new();
        for (combo, actions) in &raw.keybinds {
            let key = match parse_combo(combo) {
                Some(key) => key,
                None => {
                    warn!(combo, "ignoring unparsable keybind");
                    continue;
                }
            };
            let mut parsed = Vec::with_capacity(actions.len());
            for a in actions {
                match a.parse::<Action>() {
                    Ok(action) => parsed.push(action),
                    Err(e) => warn!(combo, action = %a, "ignoring keybind action: {e}"),
                }
            }
            if !parsed.is_empty() {
                keybinds.insert(key, parsed);
            }
        }

        Self {
            workspace_count,
            border_width: raw.border_width,
            focused_color: raw.focused_color,
            unfocused_color: raw.unfocused_color,
            alternate_split: raw.alternate_split,
            autostart: raw.autostart,
            autostart_on_reload: raw.autostart_on_reload,
            workspace_names,
            keybinds,
            rules: raw.rules,
        }
    }

    pub fn workspace_name(&self, index: usize) -> &str {
        &self.workspace_names[index]
    }

    pub fn workspace_names(&self) -> &[String] {
        &self.workspace_names
    }

    /// Actions bound to the exact modifier+keysym combination.
    pub fn keybind_actions(&self, modifiers: u16, keysym: u32) -> &[Action] {
        self.keybinds
            .get(&(modifiers, keysym))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Every (modifier, keysym) pair that must be grabbed on the root window.
    pub fn grab_list(&self) -> Vec<(u16, u32)> {
        self.keybinds.keys().copied().collect()
    }

    fn rule_for(&self, class: &str) -> Option<&WindowRule> {
        self.rules.iter().find(|r| r.class.eq_ignore_ascii_case(class))
    }

    pub fn should_float(&self, class: &str) -> bool {
        self.rule_for(class).map_or(false, |r| r.float)
    }

    pub fn should_fullscreen(&self, class: &str) -> bool {
        self.rule_for(class).map_or(false, |r| r.fullscreen)
    }

    pub fn should_prohibit(&self, class: &str) -> bool {
        self.rule_for(class).map_or(false, |r| r.prohibit)
    }

    /// Workspace this window class spawns on, 0-based, if a valid rule exists.
    pub fn spawn_workspace(&self, class: &str) -> Option<usize> {
        let ws = self.rule_for(class)?.workspace?;
        if ws >= 1 && ws <= self.workspace_count {
            Some(ws - 1)
        } else {
            None
        }
    }
}

/// Parses a "Mod4+Shift+Return" style combination into (modifier mask, keysym).
fn parse_combo(combo: &str) -> Option<(u16, u32)> {
    let mut modifiers = 0u16;
    let mut keysym = None;
    for part in combo.split('+') {
        let part = part.trim();
        if let Some(m) = keys::modifier_from_name(part) {
            modifiers |= m;
        } else if keysym.is_none() {
            keysym = Some(keys::keysym_from_name(part)?);
        } else {
            return None;
        }
    }
    keysym.map(|k| (modifiers, k))
}
