//! Known schema names and the rules that map a payload file name onto one.

use crate::types::SchemaName;

/// Length of the hash suffix some payload files carry after the table name
/// (`character_table3b2f1a.bytes`).
pub const HASH_SUFFIX_LEN: usize = 6;

/// Schemas published in the schema repository, matched by exact base name.
pub const BUILTIN_SCHEMAS: &[&str] = &[
    "activity_table",
    "audio_data",
    "battle_equip_table",
    "buff_table",
    "building_data",
    "campaign_table",
    "chapter_table",
    "char_master_table",
    "char_meta_table",
    "char_patch_table",
    "character_table",
    "charm_table",
    "charword_table",
    "checkin_table",
    "climb_tower_table",
    "clue_data",
    "crisis_table",
    "crisis_v2_table",
    "display_meta_table",
    "enemy_database",
    "enemy_handbook_table",
    "favor_table",
    "gacha_table",
    "gamedata_const",
    "handbook_info_table",
    "handbook_team_table",
    "hotupdate_meta_table",
    "item_table",
    "level_script_table",
    "medal_table",
    "meta_ui_table",
    "mission_table",
    "open_server_table",
    "replicate_table",
    "retro_table",
    "roguelike_topic_table",
    "sandbox_perm_table",
    "shop_client_table",
    "skill_table",
    "skin_table",
    "special_operator_table",
    "stage_table",
    "story_review_meta_table",
    "story_review_table",
    "story_table",
    "tip_table",
    "token_table",
    "uniequip_table",
    "zone_table",
    "cooperate_battle_table",
    "ep_breakbuff_table",
    "extra_battlelog_table",
    "legion_mode_buff_table",
    "building_local_data",
];

/// Substring → schema mappings for families of files sharing one schema.
pub const BUILTIN_MAPPINGS: &[(&str, &str)] = &[("level_", "prts___levels")];

/// Catalog of schema names a payload can be decoded with.
#[derive(Debug, Clone)]
pub struct SchemaCatalog {
    names: Vec<String>,
    mappings: Vec<(String, String)>,
}

impl Default for SchemaCatalog {
    fn default() -> Self {
        Self::new(
            BUILTIN_SCHEMAS.iter().map(|s| (*s).to_owned()).collect(),
            BUILTIN_MAPPINGS
                .iter()
                .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
                .collect(),
        )
    }
}

impl SchemaCatalog {
    pub fn new(names: Vec<String>, mappings: Vec<(String, String)>) -> Self {
        Self { names, mappings }
    }

    /// Resolve a base file name (no extension) to a schema name.
    ///
    /// An exact name match wins; otherwise the first mapping whose key occurs
    /// anywhere in `base` applies.
    pub fn resolve(&self, base: &str) -> Option<SchemaName> {
        if let Some(name) = self.names.iter().find(|n| *n == base) {
            return Some(SchemaName::new(name.as_str()));
        }
        self.mappings
            .iter()
            .find(|(key, _)| base.contains(key.as_str()))
            .map(|(_, schema)| SchemaName::new(schema.as_str()))
    }

    /// Canonical "core" name of a raw payload file: the base name itself if it
    /// resolves, else the base name without its hash suffix if that resolves.
    pub fn payload_core<'a>(&self, base: &'a str) -> Option<&'a str> {
        if self.resolve(base).is_some() {
            return Some(base);
        }
        if base.len() > HASH_SUFFIX_LEN {
            let cut = base.len() - HASH_SUFFIX_LEN;
            if let Some(stripped) = base.get(..cut) {
                if self.resolve(stripped).is_some() {
                    return Some(stripped);
                }
            }
        }
        None
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}
