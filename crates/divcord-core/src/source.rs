//! Drop sources: where a divination card can be found

use crate::enums::{closed_enum, ClosedEnum};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::hash::{Hash, Hasher};

closed_enum! {
    /// Every kind of drop origin the spreadsheet may name
    pub enum SourceType as "source type" {
        Act => "Act",
        ActBoss => "Act Boss",
        Map => "Map",
        MapBoss => "Map Boss",
        GlobalDrop => "Global Drop",
        Disabled => "Disabled",
        Story => "Story",
        Vendor => "Vendor",
        Chest => "Chest",
        Strongbox => "Strongbox",
        UniqueMonster => "Unique Monster",
        RogueExile => "Rogue Exile",
        TormentedSpirit => "Tormented Spirit",
        Essence => "Essence",
        Abyss => "Abyss",
        AbyssLichBoss => "Abyss Lich Boss",
        Breach => "Breach",
        BreachlordBossDomain => "Breachlord Boss Domain",
        Harbinger => "Harbinger",
        HarbingerPortal => "Harbinger Portal",
        Legion => "Legion",
        LegionMonster => "Legion Monster",
        Delirium => "Delirium",
        DeliriumCurrencyRewards => "Delirium Currency Rewards",
        Simulacrum => "Simulacrum",
        Metamorph => "Metamorph",
        Blight => "Blight",
        BlightedMap => "Blighted Map",
        BlightRavagedMap => "Blight-ravaged Map",
        Incursion => "Incursion",
        IncursionArchitect => "Incursion Architect",
        TempleOfAtzoatl => "Temple of Atzoatl",
        Delve => "Delve",
        DelveBoss => "Delve Boss",
        Betrayal => "Betrayal",
        Heist => "Heist",
        HeistBoss => "Heist Boss",
        Ritual => "Ritual",
        Ultimatum => "Ultimatum",
        Expedition => "Expedition",
        ExpeditionLogbook => "Expedition Logbook",
        ExpeditionLogbookBoss => "Expedition Logbook Boss",
        Harvest => "Harvest",
        OshabiBoss => "Oshabi Boss",
        Sanctum => "Sanctum",
        Labyrinth => "Labyrinth",
        TrialOfAscendancy => "Trial of Ascendancy",
        TrialOfTheAncestors => "Trial of the Ancestors",
        KiracMission => "Kirac Mission",
        ElderGuardianBoss => "Elder Guardian Boss",
        ShaperGuardianBoss => "Shaper Guardian Boss",
        ConquerorMapBoss => "Conqueror Map Boss",
        Maven => "Maven",
        UberBoss => "Uber Boss",
        VaalSideArea => "Vaal Side Area",
        VaalSideAreaBoss => "Vaal Side Area Boss",
        BeyondBoss => "Beyond Boss",
    }
}

impl SourceType {
    /// Types that are looked up in the reference catalog and always need a name
    pub fn is_catalog_backed(&self) -> bool {
        matches!(
            self,
            SourceType::Act | SourceType::ActBoss | SourceType::Map | SourceType::MapBoss
        )
    }

    /// Types whose members contain further sources (a map holds its bosses)
    pub fn has_transitive_members(&self) -> bool {
        matches!(self, SourceType::Act | SourceType::Map)
    }
}

/// Whether a source names a specific member or only a category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum SourceKind {
    #[serde(rename = "with-member")]
    WithMember,
    #[serde(rename = "empty")]
    Empty,
}

/// The identity triple used for equality and de-duplication
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SourceKey {
    pub id: String,
    #[serde(rename = "type")]
    pub source_type: SourceType,
    pub kind: SourceKind,
}

/// One drop origin of a card
///
/// Equality and hashing only look at `(id, type, kind)`; the level range of
/// a global drop is carried along but does not make two sources distinct.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Source {
    pub id: String,
    #[serde(rename = "type")]
    pub source_type: SourceType,
    pub kind: SourceKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_level: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_level: Option<u32>,
}

impl Source {
    /// A source naming a specific member of its type
    pub fn with_member(id: impl Into<String>, source_type: SourceType) -> Self {
        Self {
            id: id.into(),
            source_type,
            kind: SourceKind::WithMember,
            min_level: None,
            max_level: None,
        }
    }

    /// A category-only source
    pub fn empty(id: impl Into<String>, source_type: SourceType) -> Self {
        Self {
            id: id.into(),
            source_type,
            kind: SourceKind::Empty,
            min_level: None,
            max_level: None,
        }
    }

    pub fn global_drop(min_level: Option<u32>, max_level: Option<u32>) -> Self {
        Self {
            min_level,
            max_level,
            ..Self::empty("", SourceType::GlobalDrop)
        }
    }

    pub fn key(&self) -> SourceKey {
        SourceKey {
            id: self.id.clone(),
            source_type: self.source_type,
            kind: self.kind,
        }
    }

    fn key_ref(&self) -> (&str, SourceType, SourceKind) {
        (&self.id, self.source_type, self.kind)
    }
}

impl PartialEq for Source {
    fn eq(&self, other: &Self) -> bool {
        self.key_ref() == other.key_ref()
    }
}

impl Eq for Source {}

impl Hash for Source {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.key_ref().hash(state);
    }
}

impl std::fmt::Display for Source {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.id.is_empty() {
            write!(f, "{}", self.source_type.as_str())
        } else {
            write!(f, "{}: {}", self.source_type.as_str(), self.id)
        }
    }
}

/// Drop repeated sources, keeping the first occurrence of each identity
pub fn dedupe_sources(sources: Vec<Source>) -> Vec<Source> {
    let mut seen: HashSet<SourceKey> = HashSet::new();
    sources
        .into_iter()
        .filter(|s| seen.insert(s.key()))
        .collect()
}

/// Sources of `left` whose identity does not occur in `right`, in `left` order
pub fn sources_difference(left: &[Source], right: &[Source]) -> Vec<Source> {
    let right: HashSet<&Source> = right.iter().collect();
    left.iter().filter(|s| !right.contains(s)).cloned().collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_source_type_parse_loose() {
        assert_eq!(SourceType::parse_loose("map boss"), Some(SourceType::MapBoss));
        assert_eq!(SourceType::parse_loose("  Global Drop "), Some(SourceType::GlobalDrop));
        assert_eq!(SourceType::parse_loose("Boss"), None);
        assert!("nope".parse::<SourceType>().is_err());
    }

    #[test]
    fn test_source_serialization_shape() {
        let source = Source::with_member("Port Map", SourceType::Map);
        let json = serde_json::to_value(&source).unwrap();

        assert_eq!(
            json,
            serde_json::json!({"id": "Port Map", "type": "Map", "kind": "with-member"})
        );

        let global = Source::global_drop(Some(68), None);
        let json = serde_json::to_value(&global).unwrap();
        assert_eq!(json["kind"], "empty");
        assert_eq!(json["min_level"], 68);
        assert!(json.get("max_level").is_none());
    }

    #[test]
    fn test_equality_ignores_levels() {
        let a = Source::global_drop(Some(1), Some(10));
        let b = Source::global_drop(Some(60), None);
        assert_eq!(a, b);
        assert_ne!(
            Source::with_member("Port Map", SourceType::Map),
            Source::empty("Port Map", SourceType::Map)
        );
    }

    #[test]
    fn test_dedupe_keeps_first_seen_order() {
        let sources = vec![
            Source::with_member("Port Map", SourceType::Map),
            Source::with_member("Doedre", SourceType::MapBoss),
            Source::with_member("Port Map", SourceType::Map),
            Source::with_member("Port Map", SourceType::MapBoss),
        ];
        let once = dedupe_sources(sources);

        assert_eq!(once.len(), 3);
        assert_eq!(once[0].id, "Port Map");
        assert_eq!(once[1].id, "Doedre");
        assert_eq!(once[2].source_type, SourceType::MapBoss);

        let twice = dedupe_sources(once.clone());
        assert_eq!(twice, once);
    }

    #[test]
    fn test_sources_difference() {
        let s1 = Source::with_member("Port Map", SourceType::Map);
        let s2 = Source::with_member("Strand Map", SourceType::Map);

        assert_eq!(sources_difference(&[s1.clone(), s2.clone()], &[s1.clone()]), vec![s2]);
        assert!(sources_difference(&[s1.clone()], &[s1]).is_empty());
    }
}
