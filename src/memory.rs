use std::{error::Error, fmt};

/// Mask for the 24-bit address bus.
pub const ADDRESS_MASK: u32 = 0x00ff_ffff;

/// Size of the flat guest address space (16 MB).
pub const ADDRESS_SPACE: usize = 16 * 1024 * 1024;

/// First address handed out by the allocator; everything below is low-memory
/// globals (CurApName, the argument block pointer, ...).
pub const HEAP_START: u32 = 0x0800;

/// Flat guest address space plus a bump allocator.
///
/// Every access masks its address to 24 bits, so reads and writes can never
/// fall outside the arena. Only allocation is bounded, by `limit`.
#[derive(Debug, Clone)]
pub struct GuestMemory {
    data: Vec<u8>,
    high_water: u32,
    limit: u32,
}

impl Default for GuestMemory {
    fn default() -> Self {
        Self::new()
    }
}

impl GuestMemory {
    pub fn new() -> Self {
        Self {
            data: vec![0u8; ADDRESS_SPACE],
            high_water: HEAP_START,
            limit: ADDRESS_SPACE as u32,
        }
    }

    /// Create an arena whose allocator stops at `limit` bytes.
    pub fn with_limit(limit: u32) -> Result<Self, MemoryError> {
        if limit as usize > ADDRESS_SPACE {
            return Err(MemoryError::LimitTooLarge { limit });
        }
        if limit < HEAP_START {
            return Err(MemoryError::LimitTooSmall { limit });
        }
        let mut memory = Self::new();
        memory.limit = limit;
        Ok(memory)
    }

    pub fn high_water(&self) -> u32 {
        self.high_water
    }

    pub fn limit(&self) -> u32 {
        self.limit
    }

    /// Allocate `size` bytes and return the block's base address.
    ///
    /// The size is rounded up to an even count. After advancing the cursor the
    /// allocator clears `size` bytes starting at the *new* cursor, i.e. the
    /// bytes following the returned block rather than the block itself.
    pub fn allocate(&mut self, size: u32) -> Result<u32, MemoryError> {
        let rounded = size
            .checked_add(size & 1)
            .ok_or(MemoryError::OutOfMemory {
                requested: size,
                available: self.available(),
            })?;

        let address = self.high_water;
        let new_high_water = address as u64 + rounded as u64;
        if new_high_water + size as u64 > self.limit as u64 {
            return Err(MemoryError::OutOfMemory {
                requested: size,
                available: self.available(),
            });
        }

        self.high_water = new_high_water as u32;
        let start = self.high_water as usize;
        self.data[start..start + size as usize].fill(0);

        Ok(address)
    }

    fn available(&self) -> u32 {
        self.limit.saturating_sub(self.high_water)
    }

    pub fn read_byte(&self, addr: u32) -> u8 {
        self.data[(addr & ADDRESS_MASK) as usize]
    }

    pub fn read_word(&self, addr: u32) -> u16 {
        u16::from_be_bytes([self.read_byte(addr), self.read_byte(addr.wrapping_add(1))])
    }

    pub fn read_long(&self, addr: u32) -> u32 {
        ((self.read_word(addr) as u32) << 16) | self.read_word(addr.wrapping_add(2)) as u32
    }

    pub fn read_long_long(&self, addr: u32) -> u64 {
        ((self.read_long(addr) as u64) << 32) | self.read_long(addr.wrapping_add(4)) as u64
    }

    pub fn write_byte(&mut self, addr: u32, value: u8) {
        self.data[(addr & ADDRESS_MASK) as usize] = value;
    }

    pub fn write_word(&mut self, addr: u32, value: u16) {
        self.write_data(addr, &value.to_be_bytes());
    }

    pub fn write_long(&mut self, addr: u32, value: u32) {
        self.write_data(addr, &value.to_be_bytes());
    }

    pub fn write_long_long(&mut self, addr: u32, value: u64) {
        self.write_data(addr, &value.to_be_bytes());
    }

    /// Copy `data` into guest memory byte by byte, wrapping at the 24-bit
    /// boundary like the address bus does.
    pub fn write_data(&mut self, addr: u32, data: &[u8]) {
        for (i, &byte) in data.iter().enumerate() {
            self.write_byte(addr.wrapping_add(i as u32), byte);
        }
    }

    pub fn read_data(&self, addr: u32, len: u32) -> Vec<u8> {
        (0..len)
            .map(|i| self.read_byte(addr.wrapping_add(i)))
            .collect()
    }

    /// Write `bytes` followed by a NUL terminator.
    pub fn write_cstring(&mut self, addr: u32, bytes: &[u8]) {
        self.write_data(addr, bytes);
        self.write_byte(addr.wrapping_add(bytes.len() as u32), 0);
    }

    /// Read a length-prefixed Pascal string.
    pub fn read_pstring(&self, addr: u32) -> Vec<u8> {
        let len = self.read_byte(addr) as u32;
        self.read_data(addr.wrapping_add(1), len)
    }

    /// Write a Pascal string, truncating to 255 bytes.
    pub fn write_pstring(&mut self, addr: u32, bytes: &[u8]) {
        let len = bytes.len().min(255);
        self.write_byte(addr, len as u8);
        self.write_data(addr.wrapping_add(1), &bytes[..len]);
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MemoryError {
    OutOfMemory { requested: u32, available: u32 },
    LimitTooLarge { limit: u32 },
    LimitTooSmall { limit: u32 },
}

impl fmt::Display for MemoryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MemoryError::OutOfMemory {
                requested,
                available,
            } => {
                write!(
                    f,
                    "out of guest memory: requested {requested} bytes, {available} available"
                )
            }
            MemoryError::LimitTooLarge { limit } => {
                write!(
                    f,
                    "memory limit {limit:#x} exceeds the 24-bit address space ({ADDRESS_SPACE:#x})"
                )
            }
            MemoryError::LimitTooSmall { limit } => {
                write!(
                    f,
                    "memory limit {limit:#x} leaves no room above low memory ({HEAP_START:#x})"
                )
            }
        }
    }
}

impl Error for MemoryError {}
