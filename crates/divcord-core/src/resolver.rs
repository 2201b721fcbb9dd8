//! Source resolution against the reference catalog

use crate::catalog::ReferenceCatalog;
use crate::enums::ClosedEnum;
use crate::parser::SourceMention;
use crate::source::{Source, SourceKind, SourceType};

/// Outcome of resolving one mention
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolved {
    pub source: Source,
    /// False when a catalog-backed type named something the catalog lacks.
    /// The source is still usable; callers report it as a soft error.
    pub in_catalog: bool,
}

impl Resolved {
    fn known(source: Source) -> Self {
        Self {
            source,
            in_catalog: true,
        }
    }

    fn unknown(source: Source) -> Self {
        Self {
            source,
            in_catalog: false,
        }
    }
}

/// Validates and normalizes sources using a borrowed catalog
#[derive(Debug, Clone, Copy)]
pub struct SourceResolver<'a> {
    catalog: &'a ReferenceCatalog,
}

impl<'a> SourceResolver<'a> {
    pub fn new(catalog: &'a ReferenceCatalog) -> Self {
        Self { catalog }
    }

    pub fn catalog(&self) -> &'a ReferenceCatalog {
        self.catalog
    }

    /// Resolve an `(id, type)` pair
    ///
    /// Catalog-backed types take the catalog's canonical id when found and
    /// keep the text as written otherwise.
    pub fn resolve(&self, id: &str, source_type: SourceType) -> Resolved {
        let id = id.trim();
        match source_type {
            SourceType::GlobalDrop => Resolved::known(Source::empty(id, SourceType::GlobalDrop)),
            SourceType::Map => match self.catalog.map(id) {
                Some(map) => Resolved::known(Source::with_member(&map.name, source_type)),
                None => Resolved::unknown(Source::with_member(id, source_type)),
            },
            SourceType::MapBoss => match self.catalog.map_boss(id) {
                Some(boss) => Resolved::known(Source::with_member(&boss.name, source_type)),
                None => Resolved::unknown(Source::with_member(id, source_type)),
            },
            SourceType::Act => match self.catalog.act_area(id) {
                Some(area) => Resolved::known(Source::with_member(&area.id, source_type)),
                None => Resolved::unknown(Source::with_member(id, source_type)),
            },
            SourceType::ActBoss => match self.catalog.act_boss(id) {
                Some((_, fight)) => Resolved::known(Source::with_member(&fight.name, source_type)),
                None => Resolved::unknown(Source::with_member(id, source_type)),
            },
            other if id.is_empty() => Resolved::known(Source::empty(other.as_str(), other)),
            other => Resolved::known(Source::with_member(id, other)),
        }
    }

    /// Resolve a parsed mention, carrying global drop levels along
    pub fn resolve_mention(&self, mention: &SourceMention) -> Resolved {
        let mut resolved = self.resolve(&mention.id, mention.source_type);
        if mention.source_type == SourceType::GlobalDrop {
            resolved.source.min_level = mention.min_level;
            resolved.source.max_level = mention.max_level;
        }
        resolved
    }

    /// Boss sources that live inside a map or act area
    ///
    /// One level deep only. Bosses come back in catalog order. Category-only
    /// sources and sources the catalog does not know yield nothing.
    pub fn transitive_sources(&self, source: &Source) -> Vec<Source> {
        if source.kind == SourceKind::Empty {
            return Vec::new();
        }

        match source.source_type {
            SourceType::Map => self
                .catalog
                .bosses_in_map(&source.id)
                .into_iter()
                .map(|boss| Source::with_member(&boss.name, SourceType::MapBoss))
                .collect(),
            SourceType::Act => self
                .catalog
                .act_area(&source.id)
                .map(|area| {
                    area.bossfights
                        .iter()
                        .map(|fight| Source::with_member(&fight.name, SourceType::ActBoss))
                        .collect()
                })
                .unwrap_or_default(),
            _ => Vec::new(),
        }
    }
}

/// Resolve a single `(id, type)` pair against `catalog`
pub fn resolve(id: &str, source_type: SourceType, catalog: &ReferenceCatalog) -> Resolved {
    SourceResolver::new(catalog).resolve(id, source_type)
}
