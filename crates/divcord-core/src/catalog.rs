//! Reference game data: acts, maps, bosses and cards
//!
//! The catalog is loaded once and only read afterwards. Name lookups are
//! case and whitespace insensitive; the normalized-name indices are built at
//! load time so every lookup is a single hash probe.

use crate::error::{Error, Result};
use crate::source::{Source, SourceType};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::Path;

/// An act area and the boss fights that take place in it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActArea {
    /// Area id, e.g. "1_1_7_1"
    pub id: String,
    pub name: String,
    pub act: u32,
    pub area_level: u32,
    #[serde(default)]
    pub bossfights: Vec<Bossfight>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bossfight {
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MapArea {
    pub name: String,
    pub tier: u32,
    #[serde(default)]
    pub unique: bool,
}

impl MapArea {
    /// Monster level of the map (tier 1 is level 68)
    pub fn level(&self) -> u32 {
        67u32.saturating_add(self.tier)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MapBoss {
    pub name: String,
    /// Maps this boss can be found in
    #[serde(default)]
    pub maps: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Card {
    pub name: String,
    #[serde(default)]
    pub weight: Option<f64>,
    #[serde(default)]
    pub min_level: Option<u32>,
    #[serde(default)]
    pub max_level: Option<u32>,
    #[serde(default)]
    pub league: Option<String>,
}

/// The catalog as it is stored on disk
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogData {
    #[serde(default)]
    pub acts: Vec<ActArea>,
    #[serde(default)]
    pub maps: Vec<MapArea>,
    #[serde(default)]
    pub map_bosses: Vec<MapBoss>,
    #[serde(default)]
    pub cards: Vec<Card>,
}

/// Immutable game data snapshot with precomputed lookup indices
#[derive(Debug, Clone, Default)]
pub struct ReferenceCatalog {
    data: CatalogData,
    act_by_name: HashMap<String, usize>,
    act_by_id: HashMap<String, usize>,
    /// normalized boss name -> (area index, fight index)
    act_boss_by_name: HashMap<String, (usize, usize)>,
    map_by_name: HashMap<String, usize>,
    map_boss_by_name: HashMap<String, usize>,
    /// map index -> map boss indices, in catalog order
    bosses_by_map: Vec<Vec<usize>>,
    card_by_name: HashMap<String, usize>,
}

/// Lowercase and collapse internal whitespace
pub fn normalize_name(s: &str) -> String {
    s.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

fn index_by<T>(items: &[T], name: impl Fn(&T) -> &str) -> HashMap<String, usize> {
    let mut index = HashMap::with_capacity(items.len());
    for (i, item) in items.iter().enumerate() {
        // First declaration wins for duplicate names
        index.entry(normalize_name(name(item))).or_insert(i);
    }
    index
}

impl ReferenceCatalog {
    /// Build the indices over `data`
    pub fn new(data: CatalogData) -> Self {
        let act_by_name = index_by(&data.acts, |a| &a.name);
        let act_by_id = index_by(&data.acts, |a| &a.id);
        let map_by_name = index_by(&data.maps, |m| &m.name);
        let map_boss_by_name = index_by(&data.map_bosses, |b| &b.name);
        let card_by_name = index_by(&data.cards, |c| &c.name);

        let mut act_boss_by_name = HashMap::new();
        for (area_idx, area) in data.acts.iter().enumerate() {
            for (fight_idx, fight) in area.bossfights.iter().enumerate() {
                act_boss_by_name
                    .entry(normalize_name(&fight.name))
                    .or_insert((area_idx, fight_idx));
            }
        }

        let mut bosses_by_map = vec![Vec::new(); data.maps.len()];
        for (boss_idx, boss) in data.map_bosses.iter().enumerate() {
            for map_name in &boss.maps {
                if let Some(&map_idx) = lookup_map(&map_by_name, map_name) {
                    if !bosses_by_map[map_idx].contains(&boss_idx) {
                        bosses_by_map[map_idx].push(boss_idx);
                    }
                }
            }
        }

        Self {
            data,
            act_by_name,
            act_by_id,
            act_boss_by_name,
            map_by_name,
            map_boss_by_name,
            bosses_by_map,
            card_by_name,
        }
    }

    /// Parse a catalog from its JSON form
    pub fn from_json(json: &str) -> Result<Self> {
        let data: CatalogData = serde_json::from_str(json).map_err(|e| Error::InvalidDocument {
            what: "reference catalog",
            message: e.to_string(),
        })?;
        Ok(Self::new(data))
    }

    /// Load a catalog from a JSON file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref()).map_err(|e| Error::FileRead {
            path: path.as_ref().to_path_buf(),
            source: e,
        })?;
        Self::from_json(&content)
    }

    pub fn data(&self) -> &CatalogData {
        &self.data
    }

    /// Find an act area by name or by area id
    pub fn act_area(&self, name_or_id: &str) -> Option<&ActArea> {
        let key = normalize_name(name_or_id);
        self.act_by_id
            .get(&key)
            .or_else(|| self.act_by_name.get(&key))
            .map(|&i| &self.data.acts[i])
    }

    /// Find the area hosting an act boss fight
    pub fn act_boss(&self, name: &str) -> Option<(&ActArea, &Bossfight)> {
        self.act_boss_by_name
            .get(&normalize_name(name))
            .map(|&(area, fight)| {
                let area = &self.data.acts[area];
                (area, &area.bossfights[fight])
            })
    }

    /// Find a map by name; "Port" and "Port Map" both find "Port Map"
    pub fn map(&self, name: &str) -> Option<&MapArea> {
        lookup_map(&self.map_by_name, name).map(|&i| &self.data.maps[i])
    }

    pub fn map_boss(&self, name: &str) -> Option<&MapBoss> {
        self.map_boss_by_name
            .get(&normalize_name(name))
            .map(|&i| &self.data.map_bosses[i])
    }

    /// Bosses found in the named map, in catalog order
    pub fn bosses_in_map(&self, map_name: &str) -> Vec<&MapBoss> {
        lookup_map(&self.map_by_name, map_name)
            .map(|&i| {
                self.bosses_by_map[i]
                    .iter()
                    .map(|&b| &self.data.map_bosses[b])
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn card(&self, name: &str) -> Option<&Card> {
        self.card_by_name
            .get(&normalize_name(name))
            .map(|&i| &self.data.cards[i])
    }

    /// Guess the source type of a bare name by which table knows it
    pub fn classify_name(&self, name: &str) -> Option<SourceType> {
        if self.map(name).is_some() {
            Some(SourceType::Map)
        } else if self.map_boss(name).is_some() {
            Some(SourceType::MapBoss)
        } else if self.act_area(name).is_some() {
            Some(SourceType::Act)
        } else if self.act_boss(name).is_some() {
            Some(SourceType::ActBoss)
        } else {
            None
        }
    }

    /// Monster level at which a source drops, when the catalog knows it
    pub fn source_level(&self, source: &Source) -> Option<u32> {
        match source.source_type {
            SourceType::Act => self.act_area(&source.id).map(|a| a.area_level),
            SourceType::ActBoss => self.act_boss(&source.id).map(|(a, _)| a.area_level),
            SourceType::Map => self.map(&source.id).map(MapArea::level),
            SourceType::MapBoss => self.map_boss(&source.id).and_then(|boss| {
                boss.maps
                    .iter()
                    .filter_map(|m| self.map(m))
                    .map(MapArea::level)
                    .min()
            }),
            SourceType::GlobalDrop => source.min_level,
            _ => None,
        }
    }

    /// Stable sort by drop level; sources without a known level go last
    pub fn sort_sources_by_level(&self, sources: &mut [Source]) {
        sources.sort_by_key(|s| self.source_level(s).unwrap_or(u32::MAX));
    }
}

fn lookup_map<'a>(index: &'a HashMap<String, usize>, name: &str) -> Option<&'a usize> {
    let key = normalize_name(name);
    index
        .get(&key)
        .or_else(|| index.get(&format!("{} map", key)))
}
