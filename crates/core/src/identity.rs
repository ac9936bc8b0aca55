//! Id-or-name entity identity and composite snapshot keys.
//!
//! Some read-collaborator records reference their phase/layer/check by
//! numeric id, others by display name only. Key construction therefore
//! goes through a tagged identity that prefers the id and falls back to
//! the normalized name, instead of duck-typing on "maybe has an id"
//! throughout the engine.

use crate::range::PkRange;
use crate::side::Side;
use crate::types::DbId;

/// Normalize a display name for keying: trim, collapse runs of
/// whitespace, lowercase.
pub fn normalize_name(name: &str) -> String {
    name.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// How one entity (phase, layer or check) is identified.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Identity {
    ById(DbId),
    ByName(String),
    Unknown,
}

impl Identity {
    /// Resolve from the optional id/name pair a collaborator record
    /// carries. The numeric id wins when present; a blank name resolves
    /// to `Unknown`.
    pub fn resolve(id: Option<DbId>, name: Option<&str>) -> Self {
        match (id, name) {
            (Some(id), _) => Identity::ById(id),
            (None, Some(name)) if !name.trim().is_empty() => {
                Identity::ByName(normalize_name(name))
            }
            _ => Identity::Unknown,
        }
    }

    /// Name-based identity for entities addressed by display name.
    pub fn by_name(name: &str) -> Self {
        Identity::resolve(None, Some(name))
    }

    /// Stable key fragment: `id:<v>`, `name:<normalized>`, or `unknown`.
    pub fn key_fragment(&self) -> String {
        match self {
            Identity::ById(id) => format!("id:{id}"),
            Identity::ByName(name) => format!("name:{name}"),
            Identity::Unknown => "unknown".to_string(),
        }
    }
}

/// Composite key for one (phase, layer, check, range) tuple, without the
/// side. Used for "status by side" lookups that scan all sides of one
/// logical tuple.
pub fn base_snapshot_key(
    phase: &Identity,
    layer: &Identity,
    check: &Identity,
    range: &PkRange,
) -> String {
    format!(
        "{}|{}|{}|{}",
        phase.key_fragment(),
        layer.key_fragment(),
        check.key_fragment(),
        range.key_fragment()
    )
}

/// Composite key for one (phase, layer, check, range, side) tuple.
pub fn snapshot_key(
    phase: &Identity,
    layer: &Identity,
    check: &Identity,
    range: &PkRange,
    side: Side,
) -> String {
    format!(
        "{}|{}",
        base_snapshot_key(phase, layer, check, range),
        side.as_str()
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    // -- normalize_name -------------------------------------------------------

    #[test]
    fn name_normalization_trims_and_lowercases() {
        assert_eq!(normalize_name("  Base Slab  "), "base slab");
        assert_eq!(normalize_name("Base\t  Slab"), "base slab");
        assert_eq!(normalize_name("REBAR"), "rebar");
    }

    // -- resolve --------------------------------------------------------------

    #[test]
    fn id_wins_over_name() {
        assert_eq!(
            Identity::resolve(Some(7), Some("Base Slab")),
            Identity::ById(7)
        );
    }

    #[test]
    fn name_fallback_when_id_absent() {
        assert_eq!(
            Identity::resolve(None, Some("Base Slab")),
            Identity::ByName("base slab".to_string())
        );
    }

    #[test]
    fn blank_name_resolves_unknown() {
        assert_eq!(Identity::resolve(None, Some("   ")), Identity::Unknown);
        assert_eq!(Identity::resolve(None, None), Identity::Unknown);
    }

    // -- keys -----------------------------------------------------------------

    #[test]
    fn key_fragments() {
        assert_eq!(Identity::ById(42).key_fragment(), "id:42");
        assert_eq!(Identity::by_name(" Wing  Wall ").key_fragment(), "name:wing wall");
        assert_eq!(Identity::Unknown.key_fragment(), "unknown");
    }

    #[test]
    fn reordered_range_produces_same_key() {
        let phase = Identity::ById(1);
        let layer = Identity::by_name("wall");
        let check = Identity::ById(3);
        let a = snapshot_key(&phase, &layer, &check, &PkRange::new(0.0, 400.0), Side::Left);
        let b = snapshot_key(&phase, &layer, &check, &PkRange::new(400.0, 0.0), Side::Left);
        assert_eq!(a, b);
    }

    #[test]
    fn different_entities_never_collide() {
        let range = PkRange::new(0.0, 100.0);
        let by_id = snapshot_key(
            &Identity::ById(1),
            &Identity::ById(2),
            &Identity::ById(3),
            &range,
            Side::Both,
        );
        let by_name = snapshot_key(
            &Identity::by_name("1"),
            &Identity::by_name("2"),
            &Identity::by_name("3"),
            &range,
            Side::Both,
        );
        assert_ne!(by_id, by_name);
    }

    #[test]
    fn side_extends_the_base_key() {
        let phase = Identity::ById(1);
        let layer = Identity::ById(2);
        let check = Identity::ById(3);
        let range = PkRange::new(0.0, 100.0);
        let base = base_snapshot_key(&phase, &layer, &check, &range);
        let full = snapshot_key(&phase, &layer, &check, &range, Side::Right);
        assert!(full.starts_with(&base));
        assert!(full.ends_with("RIGHT"));
    }
}
