use std::collections::BTreeMap;

use serde::Serialize;

use super::utils::sanitize_name;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum ColorSpaceHint {
    Srgb,
    Linear,
    Normal,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct TextureEntry {
    pub name: String,
    pub source_name: String,
    pub path: Option<String>,
    pub hint: ColorSpaceHint,
}

/// Export-run texture table, deduplicated by sanitized name. The first
/// registration of a name wins, later hints for it are ignored.
#[derive(Clone, Debug, Default, Serialize)]
pub struct TextureRegistry {
    entries: BTreeMap<String, TextureEntry>,
}

impl TextureRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_or_create(&mut self, name: &str, path: Option<&str>, hint: ColorSpaceHint) -> String {
        let key = sanitize_name(name);
        if !self.entries.contains_key(&key) {
            log::debug!("collecting texture: {key}");
            self.entries.insert(
                key.clone(),
                TextureEntry {
                    name: key.clone(),
                    source_name: name.to_string(),
                    path: path.map(str::to_string),
                    hint,
                },
            );
        }
        key
    }

    pub fn get(&self, name: &str) -> Option<&TextureEntry> {
        self.entries.get(name)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &TextureEntry> {
        self.entries.values()
    }
}
