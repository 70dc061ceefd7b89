//! Logical region catalog.
//!
//! Tracks the live index spaces, field spaces, and logical regions, and the
//! fields declared on each field space. Pure bookkeeping: nothing here
//! schedules work, but the dependence analyzer and the submission path
//! validate every requirement against this catalog.

use crate::error::{Resource, RuntimeError};
use crate::types::{FieldId, FieldSpaceId, IndexSpaceId, RegionId};
use crate::util::Arena;

/// Handle to an index space.
///
/// Only the element count is modeled; geometric structure and partitioning
/// are out of scope for this core.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexSpace {
    id: IndexSpaceId,
    extent: u64,
}

impl IndexSpace {
    /// Returns the index space identifier.
    #[must_use]
    pub fn id(&self) -> IndexSpaceId {
        self.id
    }

    /// Returns the number of points in the space.
    #[must_use]
    pub fn extent(&self) -> u64 {
        self.extent
    }
}

/// Handle to a field space.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldSpace {
    id: FieldSpaceId,
}

impl FieldSpace {
    /// Returns the field space identifier.
    #[must_use]
    pub fn id(&self) -> FieldSpaceId {
        self.id
    }
}

/// Handle to a logical region: an index space crossed with a field space.
///
/// Two handles name the same region iff their identifiers are equal. The
/// region tree is flat in this core, so a region is also its own parent for
/// privilege checking.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LogicalRegion {
    id: RegionId,
    index_space: IndexSpaceId,
    field_space: FieldSpaceId,
}

impl LogicalRegion {
    /// Returns the region identifier.
    #[must_use]
    pub fn id(&self) -> RegionId {
        self.id
    }

    /// Returns the identifier of the region's index space.
    #[must_use]
    pub fn index_space(&self) -> IndexSpaceId {
        self.index_space
    }

    /// Returns the identifier of the region's field space.
    #[must_use]
    pub fn field_space(&self) -> FieldSpaceId {
        self.field_space
    }
}

#[derive(Debug)]
struct IndexSpaceRecord {
    extent: u64,
    regions: usize,
}

#[derive(Debug)]
struct FieldRecord {
    size_bytes: usize,
}

#[derive(Debug)]
struct FieldSpaceRecord {
    fields: Vec<FieldRecord>,
    /// Set once a region has been created over this field space; late
    /// field allocation is unsupported after that point.
    consumed: bool,
    regions: usize,
}

#[derive(Debug)]
struct RegionRecord {
    index_space: IndexSpaceId,
    field_space: FieldSpaceId,
    /// Pending/Ready/Running tasks holding a requirement on this region.
    in_flight: usize,
}

/// The catalog of live regions and their supporting spaces.
#[derive(Debug, Default)]
pub(crate) struct Catalog {
    index_spaces: Arena<IndexSpaceRecord>,
    field_spaces: Arena<FieldSpaceRecord>,
    regions: Arena<RegionRecord>,
}

impl Catalog {
    pub(crate) fn new() -> Self {
        Self {
            index_spaces: Arena::new(),
            field_spaces: Arena::new(),
            regions: Arena::new(),
        }
    }

    pub(crate) fn create_index_space(&mut self, extent: u64) -> IndexSpace {
        let id = IndexSpaceId::from_arena(self.index_spaces.insert(IndexSpaceRecord {
            extent,
            regions: 0,
        }));
        IndexSpace { id, extent }
    }

    pub(crate) fn destroy_index_space(&mut self, space: IndexSpace) -> Result<(), RuntimeError> {
        let record = self
            .index_spaces
            .get(space.id.arena_index())
            .ok_or(RuntimeError::StaleReference(Resource::IndexSpace(space.id)))?;
        if record.regions > 0 {
            return Err(RuntimeError::UseAfterFree(Resource::IndexSpace(space.id)));
        }
        self.index_spaces.remove(space.id.arena_index());
        Ok(())
    }

    pub(crate) fn create_field_space(&mut self) -> FieldSpace {
        let id = FieldSpaceId::from_arena(self.field_spaces.insert(FieldSpaceRecord {
            fields: Vec::new(),
            consumed: false,
            regions: 0,
        }));
        FieldSpace { id }
    }

    pub(crate) fn allocate_field(
        &mut self,
        space: FieldSpace,
        size_bytes: usize,
    ) -> Result<FieldId, RuntimeError> {
        let record = self
            .field_spaces
            .get_mut(space.id.arena_index())
            .ok_or(RuntimeError::StaleReference(Resource::FieldSpace(space.id)))?;
        if record.consumed {
            return Err(RuntimeError::Allocation(space.id));
        }
        let id = FieldId(u32::try_from(record.fields.len()).expect("field count overflow"));
        record.fields.push(FieldRecord { size_bytes });
        Ok(id)
    }

    pub(crate) fn field_size(&self, space: FieldSpaceId, field: FieldId) -> Option<usize> {
        self.field_spaces
            .get(space.arena_index())
            .and_then(|record| record.fields.get(field.index() as usize))
            .map(|f| f.size_bytes)
    }

    pub(crate) fn destroy_field_space(&mut self, space: FieldSpace) -> Result<(), RuntimeError> {
        let record = self
            .field_spaces
            .get(space.id.arena_index())
            .ok_or(RuntimeError::StaleReference(Resource::FieldSpace(space.id)))?;
        if record.regions > 0 {
            return Err(RuntimeError::UseAfterFree(Resource::FieldSpace(space.id)));
        }
        self.field_spaces.remove(space.id.arena_index());
        Ok(())
    }

    pub(crate) fn create_region(
        &mut self,
        index_space: IndexSpace,
        field_space: FieldSpace,
    ) -> Result<LogicalRegion, RuntimeError> {
        if self.index_spaces.get(index_space.id.arena_index()).is_none() {
            return Err(RuntimeError::StaleReference(Resource::IndexSpace(
                index_space.id,
            )));
        }
        if self.field_spaces.get(field_space.id.arena_index()).is_none() {
            return Err(RuntimeError::StaleReference(Resource::FieldSpace(
                field_space.id,
            )));
        }
        self.index_spaces
            .get_mut(index_space.id.arena_index())
            .expect("index space checked above")
            .regions += 1;
        let fs_record = self
            .field_spaces
            .get_mut(field_space.id.arena_index())
            .expect("field space checked above");
        fs_record.consumed = true;
        fs_record.regions += 1;
        let id = RegionId::from_arena(self.regions.insert(RegionRecord {
            index_space: index_space.id,
            field_space: field_space.id,
            in_flight: 0,
        }));
        Ok(LogicalRegion {
            id,
            index_space: index_space.id,
            field_space: field_space.id,
        })
    }

    pub(crate) fn destroy_region(&mut self, region: LogicalRegion) -> Result<(), RuntimeError> {
        let record = self
            .regions
            .get(region.id.arena_index())
            .ok_or(RuntimeError::StaleReference(Resource::Region(region.id)))?;
        if record.in_flight > 0 {
            return Err(RuntimeError::UseAfterFree(Resource::Region(region.id)));
        }
        let record = self
            .regions
            .remove(region.id.arena_index())
            .expect("region vanished during destroy");
        if let Some(is_record) = self.index_spaces.get_mut(record.index_space.arena_index()) {
            is_record.regions -= 1;
        }
        if let Some(fs_record) = self.field_spaces.get_mut(record.field_space.arena_index()) {
            fs_record.regions -= 1;
        }
        Ok(())
    }

    /// Returns true if the region is live.
    pub(crate) fn region_live(&self, region: RegionId) -> bool {
        self.regions.get(region.arena_index()).is_some()
    }

    /// Returns true if `field` exists in the region's field space.
    pub(crate) fn region_has_field(&self, region: RegionId, field: FieldId) -> bool {
        self.regions
            .get(region.arena_index())
            .is_some_and(|record| self.field_size(record.field_space, field).is_some())
    }

    pub(crate) fn pin_region(&mut self, region: RegionId) {
        if let Some(record) = self.regions.get_mut(region.arena_index()) {
            record.in_flight += 1;
        }
    }

    pub(crate) fn unpin_region(&mut self, region: RegionId) {
        if let Some(record) = self.regions.get_mut(region.arena_index()) {
            debug_assert!(record.in_flight > 0, "unbalanced region unpin");
            record.in_flight = record.in_flight.saturating_sub(1);
        }
    }
}
