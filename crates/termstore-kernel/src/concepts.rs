//! Well-known concept identifiers used by the editing core.

pub const ROOT_CONCEPT: &str = "138875005";

// ── Modules ──
pub const MODULE_SCT_CORE: &str = "900000000000207008";
pub const MODULE_SCT_MODEL_COMPONENT: &str = "900000000000012004";

// ── Language reference sets and acceptability values ──
pub const REFSET_LANGUAGE_TYPE_UK: &str = "900000000000508004";
pub const REFSET_LANGUAGE_TYPE_US: &str = "900000000000509007";
pub const ACCEPTABLE: &str = "900000000000549004";
pub const PREFERRED: &str = "900000000000548007";

// ── Inactivation indicator reference sets ──
pub const REFSET_CONCEPT_INACTIVITY_INDICATOR: &str = "900000000000489007";
pub const REFSET_DESCRIPTION_INACTIVITY_INDICATOR: &str = "900000000000490003";

// ── Inactivation reasons ──
pub const DUPLICATE: &str = "900000000000482003";
pub const OUTDATED: &str = "900000000000483008";
pub const AMBIGUOUS: &str = "900000000000484002";
pub const ERRONEOUS: &str = "900000000000485001";
pub const LIMITED: &str = "900000000000486000";
pub const MOVED_ELSEWHERE: &str = "900000000000487009";
pub const PENDING_MOVE: &str = "900000000000492006";
pub const CONCEPT_NON_CURRENT: &str = "900000000000495008";

// ── Historical association reference sets ──
pub const REFSET_POSSIBLY_EQUIVALENT_TO_ASSOCIATION: &str = "900000000000523009";
pub const REFSET_MOVED_TO_ASSOCIATION: &str = "900000000000524003";
pub const REFSET_MOVED_FROM_ASSOCIATION: &str = "900000000000525002";
pub const REFSET_REPLACED_BY_ASSOCIATION: &str = "900000000000526001";
pub const REFSET_SAME_AS_ASSOCIATION: &str = "900000000000527005";
pub const REFSET_WAS_A_ASSOCIATION: &str = "900000000000528000";
pub const REFSET_SIMILAR_TO_ASSOCIATION: &str = "900000000000529008";
pub const REFSET_ALTERNATIVE_ASSOCIATION: &str = "900000000000530003";
pub const REFSET_REFERS_TO_ASSOCIATION: &str = "900000000000531004";

// ── Query specification ──
pub const REFSET_QUERY_SPECIFICATION_TYPE: &str = "900000000000512005";

/// The inactivation indicator refset for a component category, if it has one.
pub fn inactivation_indicator_refset(
    category: crate::ComponentCategory,
) -> Option<&'static str> {
    match category {
        crate::ComponentCategory::Concept => Some(REFSET_CONCEPT_INACTIVITY_INDICATOR),
        crate::ComponentCategory::Description => Some(REFSET_DESCRIPTION_INACTIVITY_INDICATOR),
        crate::ComponentCategory::Relationship => None,
    }
}
