use std::ops::Range;

use log::{debug, trace, warn};

use crate::{
    error::{MpwError, Result},
    linker::link_jump_table,
    memory::GuestMemory,
    resource::{CODE, ResourceRecord, ResourceSource},
};

/// Size of the A5 world header at the start of CODE 0.
pub const A5_WORLD_HEADER_LEN: usize = 16;

/// Segment-0 header describing the A5 world and the jump table inside it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct A5World {
    pub above_a5: u32,
    pub below_a5: u32,
    pub jump_table_size: u32,
    pub jump_table_offset: u32,
}

impl A5World {
    pub fn parse(data: &[u8]) -> Result<Self> {
        if data.len() < A5_WORLD_HEADER_LEN {
            return Err(MpwError::TruncatedA5World(format!(
                "{} bytes, header needs {A5_WORLD_HEADER_LEN}",
                data.len()
            )));
        }
        let long = |at: usize| {
            u32::from_be_bytes([data[at], data[at + 1], data[at + 2], data[at + 3]])
        };
        Ok(Self {
            above_a5: long(0),
            below_a5: long(4),
            jump_table_size: long(8),
            jump_table_offset: long(12),
        })
    }

    pub fn size(&self) -> Option<u32> {
        self.above_a5.checked_add(self.below_a5)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemorySegment {
    pub resource_id: u16,
    pub base: u32,
    pub length: u32,
}

/// Loaded segments, indexed by resource id.
#[derive(Debug, Clone, Default)]
pub struct SegmentTable {
    slots: Vec<Option<MemorySegment>>,
}

impl SegmentTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, segment: MemorySegment) {
        let index = segment.resource_id as usize;
        if self.slots.len() <= index {
            self.slots.resize(index + 1, None);
        }
        self.slots[index] = Some(segment);
    }

    pub fn get(&self, resource_id: u16) -> Option<&MemorySegment> {
        self.slots.get(resource_id as usize)?.as_ref()
    }

    pub fn contains(&self, resource_id: u16) -> bool {
        self.get(resource_id).is_some()
    }

    /// One past the highest resource id seen.
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &MemorySegment> {
        self.slots.iter().flatten()
    }

    pub fn len(&self) -> usize {
        self.iter().count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Result of loading a tool's code into guest memory.
#[derive(Debug, Clone)]
pub struct LoadedImage {
    pub a5: u32,
    pub a5_world: A5World,
    pub segments: SegmentTable,
    pub jump_table: Range<u32>,
}

impl LoadedImage {
    /// Address of the `JMP` instruction in jump table entry 0.
    pub fn entry_point(&self) -> u32 {
        self.jump_table.start.wrapping_add(2)
    }

    pub fn jump_table_entries(&self) -> u32 {
        self.jump_table.end.wrapping_sub(self.jump_table.start) / 8
    }
}

/// Load every CODE resource of `source` and link the jump table.
pub fn load_executable<S: ResourceSource + ?Sized>(
    memory: &mut GuestMemory,
    source: &S,
) -> Result<LoadedImage> {
    let records = source.resources(CODE);
    let image = load_code_resources(memory, &records)?;
    let linked = link_jump_table(memory, &image.segments, image.jump_table.clone())?;
    debug!(
        "linked {linked} jump table entries, a5 = {:#08x}, entry = {:#08x}",
        image.a5,
        image.entry_point()
    );
    Ok(image)
}

/// Copy CODE segments into guest memory without linking them.
pub fn load_code_resources(
    memory: &mut GuestMemory,
    records: &[&ResourceRecord],
) -> Result<LoadedImage> {
    if records.is_empty() {
        return Err(MpwError::NoCodeResources);
    }

    let mut segments = SegmentTable::new();
    let mut a5_world: Option<(u32, A5World, Range<u32>)> = None;

    for record in records {
        if record.kind != CODE {
            trace!("skipping {} {}", record.kind_str(), record.id);
            continue;
        }
        let resource_id = record.id as u16;

        if resource_id == 0 {
            if a5_world.is_some() {
                return Err(MpwError::DuplicateA5World);
            }
            let world = A5World::parse(&record.data)?;
            let size = world.size().ok_or_else(|| {
                MpwError::TruncatedA5World(format!(
                    "A5 world size {:#x} + {:#x} overflows",
                    world.above_a5, world.below_a5
                ))
            })?;

            let jt_len = world.jump_table_size as usize;
            let jt_bytes = record
                .data
                .get(A5_WORLD_HEADER_LEN..A5_WORLD_HEADER_LEN + jt_len)
                .ok_or_else(|| {
                    MpwError::TruncatedA5World(format!(
                        "jump table of {jt_len} bytes but only {} bytes follow the header",
                        record.data.len().saturating_sub(A5_WORLD_HEADER_LEN)
                    ))
                })?;

            let jt_end = world.below_a5 as u64
                + world.jump_table_offset as u64
                + world.jump_table_size as u64;
            if jt_end > size as u64 {
                warn!("jump table ends at {jt_end:#x}, past the {size:#x} byte A5 world");
            }

            let base = memory.allocate(size)?;
            let a5 = base.wrapping_add(world.below_a5);
            let jt_start = a5.wrapping_add(world.jump_table_offset);
            memory.write_data(jt_start, jt_bytes);

            debug!("CODE 0: A5 world {size:#x} bytes at {base:#08x}, a5 = {a5:#08x}");
            debug!("jump table {jt_start:#08x}+{:#x}", world.jump_table_size);

            segments.insert(MemorySegment {
                resource_id,
                base,
                length: size,
            });
            a5_world = Some((
                a5,
                world,
                jt_start..jt_start.wrapping_add(world.jump_table_size),
            ));
        } else {
            let length = record.data.len() as u32;
            let base = memory.allocate(length)?;
            memory.write_data(base, &record.data);

            debug!("CODE {resource_id}: {length:#x} bytes at {base:#08x}");

            segments.insert(MemorySegment {
                resource_id,
                base,
                length,
            });
        }
    }

    let (a5, a5_world, jump_table) = a5_world.ok_or(MpwError::MissingA5World)?;

    Ok(LoadedImage {
        a5,
        a5_world,
        segments,
        jump_table,
    })
}
