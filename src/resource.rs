//! Classic Macintosh resource forks.
//!
//! The loader only needs typed records, so this module parses a raw
//! resource-fork image into [`ResourceRecord`]s. All fields are big endian.
//!
//! ```text
//! header:   u32 data_offset, u32 map_offset, u32 data_len, u32 map_len
//! map:      [16] header copy, [4] handle, [2] file ref, u16 attributes,
//!           u16 type_list_offset, u16 name_list_offset
//! types:    u16 count-1, { [4] type, u16 count-1, u16 ref_list_offset }*
//! refs:     i16 id, u16 name_offset, u8 attrs, u24 data_offset, [4] handle
//! data:     u32 len, [len] bytes
//! ```

use std::{fs, io, path::Path};

use log::debug;

use crate::error::{MpwError, Result};

pub const CODE: [u8; 4] = *b"CODE";

const HEADER_LEN: usize = 16;
const MAP_HEADER_LEN: usize = 28;
const TYPE_ENTRY_LEN: usize = 8;
const REF_ENTRY_LEN: usize = 12;
const NO_NAME: u16 = 0xffff;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceRecord {
    pub kind: [u8; 4],
    pub id: i16,
    pub attributes: u8,
    pub name: Option<Vec<u8>>,
    pub data: Vec<u8>,
}

impl ResourceRecord {
    pub fn new(kind: [u8; 4], id: i16, data: Vec<u8>) -> Self {
        Self {
            kind,
            id,
            attributes: 0,
            name: None,
            data,
        }
    }

    pub fn code(id: i16, data: Vec<u8>) -> Self {
        Self::new(CODE, id, data)
    }

    pub fn kind_str(&self) -> String {
        String::from_utf8_lossy(&self.kind).into_owned()
    }
}

/// Something that yields the typed resources of one binary.
pub trait ResourceSource {
    /// All resources of type `kind`, in fork order.
    fn resources(&self, kind: [u8; 4]) -> Vec<&ResourceRecord>;
}

impl ResourceSource for [ResourceRecord] {
    fn resources(&self, kind: [u8; 4]) -> Vec<&ResourceRecord> {
        self.iter().filter(|r| r.kind == kind).collect()
    }
}

impl ResourceSource for Vec<ResourceRecord> {
    fn resources(&self, kind: [u8; 4]) -> Vec<&ResourceRecord> {
        self.as_slice().resources(kind)
    }
}

/// A parsed resource fork.
#[derive(Debug, Clone, Default)]
pub struct ResourceFork {
    pub attributes: u16,
    pub records: Vec<ResourceRecord>,
}

impl ResourceSource for ResourceFork {
    fn resources(&self, kind: [u8; 4]) -> Vec<&ResourceRecord> {
        self.records.resources(kind)
    }
}

struct Reader<'a> {
    bytes: &'a [u8],
}

impl<'a> Reader<'a> {
    fn slice(&self, offset: usize, len: usize, what: &str) -> Result<&'a [u8]> {
        offset
            .checked_add(len)
            .and_then(|end| self.bytes.get(offset..end))
            .ok_or_else(|| {
                MpwError::BadResourceFork(format!(
                    "{what} at {offset:#x} (+{len}) exceeds fork ({} bytes)",
                    self.bytes.len()
                ))
            })
    }

    fn u8(&self, offset: usize, what: &str) -> Result<u8> {
        Ok(self.slice(offset, 1, what)?[0])
    }

    fn u16(&self, offset: usize, what: &str) -> Result<u16> {
        let b = self.slice(offset, 2, what)?;
        Ok(u16::from_be_bytes([b[0], b[1]]))
    }

    fn u24(&self, offset: usize, what: &str) -> Result<u32> {
        let b = self.slice(offset, 3, what)?;
        Ok(u32::from_be_bytes([0, b[0], b[1], b[2]]))
    }

    fn u32(&self, offset: usize, what: &str) -> Result<u32> {
        let b = self.slice(offset, 4, what)?;
        Ok(u32::from_be_bytes([b[0], b[1], b[2], b[3]]))
    }
}

impl ResourceFork {
    pub fn parse(bytes: &[u8]) -> Result<Self> {
        let r = Reader { bytes };

        if bytes.len() < HEADER_LEN {
            return Err(MpwError::BadResourceFork(format!(
                "fork is {} bytes, shorter than its header",
                bytes.len()
            )));
        }

        let data_offset = r.u32(0, "data offset")? as usize;
        let map_offset = r.u32(4, "map offset")? as usize;
        let map_len = r.u32(12, "map length")? as usize;
        r.slice(map_offset, map_len.max(MAP_HEADER_LEN), "resource map")?;

        let attributes = r.u16(map_offset + 22, "map attributes")?;
        let type_list = map_offset + r.u16(map_offset + 24, "type list offset")? as usize;
        let name_list = map_offset + r.u16(map_offset + 26, "name list offset")? as usize;

        // An empty fork stores 0xffff (count - 1 == -1).
        let type_count = r.u16(type_list, "type count")?.wrapping_add(1) as usize;

        let mut records = Vec::new();
        for t in 0..type_count {
            let entry = type_list + 2 + t * TYPE_ENTRY_LEN;
            let kind: [u8; 4] = r
                .slice(entry, 4, "resource type")?
                .try_into()
                .map_err(|_| MpwError::BadResourceFork("short resource type".into()))?;
            let count = r.u16(entry + 4, "resource count")? as usize + 1;
            let ref_list = type_list + r.u16(entry + 6, "reference list offset")? as usize;

            for i in 0..count {
                let reference = ref_list + i * REF_ENTRY_LEN;
                let id = r.u16(reference, "resource id")? as i16;
                let name_offset = r.u16(reference + 2, "name offset")?;
                let attrs = r.u8(reference + 4, "resource attributes")?;
                let offset = r.u24(reference + 5, "resource data offset")? as usize;

                let data_at = data_offset + offset;
                let len = r.u32(data_at, "resource data length")? as usize;
                let data = r.slice(data_at + 4, len, "resource data")?.to_vec();

                let name = if name_offset == NO_NAME {
                    None
                } else {
                    let at = name_list + name_offset as usize;
                    let name_len = r.u8(at, "resource name length")? as usize;
                    Some(r.slice(at + 1, name_len, "resource name")?.to_vec())
                };

                records.push(ResourceRecord {
                    kind,
                    id,
                    attributes: attrs,
                    name,
                    data,
                });
            }
        }

        Ok(Self {
            attributes,
            records,
        })
    }

    /// Open the resource fork of `path`.
    ///
    /// On macOS the named fork is tried first; otherwise, or when it is
    /// missing or empty, the file itself is read as a raw fork image.
    pub fn open(path: &Path) -> Result<Self> {
        let bytes = read_fork_bytes(path).map_err(|source| MpwError::ResourceOpen {
            path: path.to_path_buf(),
            source,
        })?;
        debug!("read {} byte resource fork from {}", bytes.len(), path.display());
        Self::parse(&bytes)
    }
}

fn read_fork_bytes(path: &Path) -> io::Result<Vec<u8>> {
    if cfg!(target_os = "macos") {
        let named = path.join("..namedfork/rsrc");
        if let Ok(bytes) = fs::read(&named)
            && !bytes.is_empty()
        {
            return Ok(bytes);
        }
    }
    fs::read(path)
}

/// Serialise records into a resource-fork image that [`ResourceFork::parse`]
/// accepts. Used to build tool images for tests and fixtures.
pub fn build_resource_fork(records: &[ResourceRecord]) -> Vec<u8> {
    let mut kinds: Vec<[u8; 4]> = Vec::new();
    for record in records {
        if !kinds.contains(&record.kind) {
            kinds.push(record.kind);
        }
    }

    let mut data = Vec::new();
    let mut names = Vec::new();
    let mut type_list = Vec::new();
    let mut ref_lists = Vec::new();

    type_list.extend_from_slice(&(kinds.len() as u16).wrapping_sub(1).to_be_bytes());
    let refs_start = 2 + kinds.len() * TYPE_ENTRY_LEN;

    for kind in &kinds {
        let of_kind: Vec<&ResourceRecord> = records.iter().filter(|r| r.kind == *kind).collect();
        let ref_offset = refs_start + ref_lists.len();

        type_list.extend_from_slice(kind);
        type_list.extend_from_slice(&(of_kind.len() as u16 - 1).to_be_bytes());
        type_list.extend_from_slice(&(ref_offset as u16).to_be_bytes());

        for record in of_kind {
            let name_offset = match &record.name {
                Some(name) => {
                    let at = names.len() as u16;
                    names.push(name.len() as u8);
                    names.extend_from_slice(name);
                    at
                }
                None => NO_NAME,
            };
            let data_at = data.len() as u32;
            data.extend_from_slice(&(record.data.len() as u32).to_be_bytes());
            data.extend_from_slice(&record.data);

            ref_lists.extend_from_slice(&record.id.to_be_bytes());
            ref_lists.extend_from_slice(&name_offset.to_be_bytes());
            ref_lists.push(record.attributes);
            ref_lists.extend_from_slice(&data_at.to_be_bytes()[1..]);
            ref_lists.extend_from_slice(&[0; 4]);
        }
    }

    let type_list_offset = MAP_HEADER_LEN;
    let name_list_offset = type_list_offset + type_list.len() + ref_lists.len();
    let map_len = name_list_offset + names.len();
    let data_offset = 256usize;
    let map_offset = data_offset + data.len();

    let mut header = Vec::with_capacity(HEADER_LEN);
    header.extend_from_slice(&(data_offset as u32).to_be_bytes());
    header.extend_from_slice(&(map_offset as u32).to_be_bytes());
    header.extend_from_slice(&(data.len() as u32).to_be_bytes());
    header.extend_from_slice(&(map_len as u32).to_be_bytes());

    let mut fork = header.clone();
    fork.resize(data_offset, 0);
    fork.extend_from_slice(&data);

    fork.extend_from_slice(&header);
    fork.extend_from_slice(&[0; 6]);
    fork.extend_from_slice(&0u16.to_be_bytes());
    fork.extend_from_slice(&(type_list_offset as u16).to_be_bytes());
    fork.extend_from_slice(&(name_list_offset as u16).to_be_bytes());
    fork.extend_from_slice(&type_list);
    fork.extend_from_slice(&ref_lists);
    fork.extend_from_slice(&names);
    fork
}
