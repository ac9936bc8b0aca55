//! Road section reference model.

use serde::{Deserialize, Serialize};

use crate::types::{DbId, Pk};

/// Immutable reference bounding linear and point ranges on one alignment.
///
/// Supplied by the phase read collaborator; the engine never writes it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoadSection {
    pub id: DbId,
    pub name: String,
    pub slug: String,
    /// Total alignment length in meters.
    pub length: Pk,
    /// Chainage of the section start reference point.
    pub start_pk: Pk,
    /// Chainage of the section end reference point.
    pub end_pk: Pk,
}
