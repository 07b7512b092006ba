//! Conversion between host numbers and their guest memory encodings.
//!
//! Integers and IEEE singles/doubles are stored as plain big-endian words,
//! longs and long longs. The SANE extended type is an 80-bit value (15-bit
//! biased exponent, explicit integer bit, 63-bit fraction). Its guest image
//! is the little-endian x87 byte image reversed, followed by six zero bytes.

use crate::memory::GuestMemory;

mod arith;

/// Bytes an extended value occupies in guest memory.
pub const EXTENDED_GUEST_SIZE: u32 = 16;

/// Significant bytes of an extended value.
pub const EXTENDED_BYTES: usize = 10;

const EXTENDED_BIAS: i32 = 16383;
const EXTENDED_EXP_MAX: u16 = 0x7fff;
const DOUBLE_BIAS: i32 = 1023;
const DOUBLE_FRACTION_BITS: u32 = 52;
const INTEGER_BIT: u64 = 1 << 63;

/// An 80-bit extended precision value.
///
/// Rust has no native 80-bit float, so the value is kept as its raw fields.
/// `+ - * /` are implemented in software at full extended precision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Extended {
    pub sign_exponent: u16,
    pub mantissa: u64,
}

impl Extended {
    pub const ZERO: Extended = Extended {
        sign_exponent: 0,
        mantissa: 0,
    };

    pub fn new(sign_exponent: u16, mantissa: u64) -> Self {
        Self {
            sign_exponent,
            mantissa,
        }
    }

    pub fn is_negative(&self) -> bool {
        self.sign_exponent & 0x8000 != 0
    }

    pub fn exponent(&self) -> u16 {
        self.sign_exponent & EXTENDED_EXP_MAX
    }

    pub fn is_zero(&self) -> bool {
        self.mantissa == 0 && self.exponent() != EXTENDED_EXP_MAX
    }

    pub fn is_nan(&self) -> bool {
        self.exponent() == EXTENDED_EXP_MAX && (self.mantissa << 1) != 0
    }

    /// The host (little-endian x87) byte image.
    pub fn to_host_bytes(self) -> [u8; EXTENDED_BYTES] {
        let mut bytes = [0u8; EXTENDED_BYTES];
        bytes[..8].copy_from_slice(&self.mantissa.to_le_bytes());
        bytes[8..].copy_from_slice(&self.sign_exponent.to_le_bytes());
        bytes
    }

    pub fn from_host_bytes(bytes: [u8; EXTENDED_BYTES]) -> Self {
        let mut mantissa = [0u8; 8];
        mantissa.copy_from_slice(&bytes[..8]);
        Self {
            mantissa: u64::from_le_bytes(mantissa),
            sign_exponent: u16::from_le_bytes([bytes[8], bytes[9]]),
        }
    }

    /// Exact for every `i32`.
    pub fn from_i32(value: i32) -> Self {
        if value == 0 {
            return Self::ZERO;
        }
        let sign = if value < 0 { 0x8000 } else { 0 };
        let magnitude = value.unsigned_abs() as u64;
        let shift = magnitude.leading_zeros();
        Self {
            sign_exponent: sign | (EXTENDED_BIAS as u16 + (63 - shift) as u16),
            mantissa: magnitude << shift,
        }
    }

    /// Exact: every double is representable as an extended.
    pub fn from_f64(value: f64) -> Self {
        let bits = value.to_bits();
        let sign = if bits >> 63 != 0 { 0x8000u16 } else { 0 };
        let exponent = ((bits >> DOUBLE_FRACTION_BITS) & 0x7ff) as i32;
        let fraction = bits & ((1u64 << DOUBLE_FRACTION_BITS) - 1);

        match exponent {
            0x7ff => Self {
                sign_exponent: sign | EXTENDED_EXP_MAX,
                mantissa: INTEGER_BIT | (fraction << 11),
            },
            0 if fraction == 0 => Self {
                sign_exponent: sign,
                mantissa: 0,
            },
            0 => {
                // Double subnormal: value = fraction * 2^-1074.
                let shift = fraction.leading_zeros();
                let unbiased = 63 - 1074 - shift as i32;
                Self {
                    sign_exponent: sign | (unbiased + EXTENDED_BIAS) as u16,
                    mantissa: fraction << shift,
                }
            }
            _ => Self {
                sign_exponent: sign | (exponent - DOUBLE_BIAS + EXTENDED_BIAS) as u16,
                mantissa: INTEGER_BIT | (fraction << 11),
            },
        }
    }

    /// Round to the nearest double, ties to even.
    pub fn to_f64(self) -> f64 {
        let sign = if self.is_negative() { 1u64 << 63 } else { 0 };
        let exponent = self.exponent();

        if exponent == EXTENDED_EXP_MAX {
            let fraction = (self.mantissa << 1) >> 12;
            if self.mantissa << 1 == 0 {
                return f64::from_bits(sign | (0x7ffu64 << DOUBLE_FRACTION_BITS));
            }
            // Keep the payload, force it quiet so it stays a NaN.
            let quiet = 1u64 << (DOUBLE_FRACTION_BITS - 1);
            return f64::from_bits(sign | (0x7ffu64 << DOUBLE_FRACTION_BITS) | fraction | quiet);
        }
        if self.mantissa == 0 {
            return f64::from_bits(sign);
        }

        // Normalise; extended denormals use the minimum exponent.
        let shift = self.mantissa.leading_zeros();
        let mantissa = self.mantissa << shift;
        let mut unbiased = exponent.max(1) as i32 - EXTENDED_BIAS - shift as i32;

        if unbiased > DOUBLE_BIAS {
            return f64::from_bits(sign | (0x7ffu64 << DOUBLE_FRACTION_BITS));
        }

        // Bits to discard from the 64-bit mantissa.
        let drop = if unbiased >= 1 - DOUBLE_BIAS {
            11
        } else {
            11 + (1 - DOUBLE_BIAS - unbiased) as u32
        };
        if drop > 64 {
            return f64::from_bits(sign);
        }

        let wide = mantissa as u128;
        let mut kept = (wide >> drop) as u64;
        let remainder = wide & ((1u128 << drop) - 1);
        let half = 1u128 << (drop - 1);
        if remainder > half || (remainder == half && kept & 1 == 1) {
            kept += 1;
        }

        if drop == 11 {
            if kept == 1u64 << (DOUBLE_FRACTION_BITS + 1) {
                kept >>= 1;
                unbiased += 1;
                if unbiased > DOUBLE_BIAS {
                    return f64::from_bits(sign | (0x7ffu64 << DOUBLE_FRACTION_BITS));
                }
            }
            let biased = (unbiased + DOUBLE_BIAS) as u64;
            let fraction = kept & ((1u64 << DOUBLE_FRACTION_BITS) - 1);
            f64::from_bits(sign | (biased << DOUBLE_FRACTION_BITS) | fraction)
        } else {
            // Subnormal result; a carry into bit 52 yields the smallest normal.
            f64::from_bits(sign | kept)
        }
    }
}

impl From<f64> for Extended {
    fn from(value: f64) -> Self {
        Self::from_f64(value)
    }
}

impl From<i32> for Extended {
    fn from(value: i32) -> Self {
        Self::from_i32(value)
    }
}

/// A number with a fixed big-endian encoding in guest memory.
pub trait GuestNumber: Sized + Copy {
    /// Bytes occupied in guest memory.
    const SIZE: u32;

    fn read(memory: &GuestMemory, addr: u32) -> Self;
    fn write(self, memory: &mut GuestMemory, addr: u32);
}

impl GuestNumber for i16 {
    const SIZE: u32 = 2;

    fn read(memory: &GuestMemory, addr: u32) -> Self {
        memory.read_word(addr) as i16
    }

    fn write(self, memory: &mut GuestMemory, addr: u32) {
        memory.write_word(addr, self as u16);
    }
}

impl GuestNumber for i32 {
    const SIZE: u32 = 4;

    fn read(memory: &GuestMemory, addr: u32) -> Self {
        memory.read_long(addr) as i32
    }

    fn write(self, memory: &mut GuestMemory, addr: u32) {
        memory.write_long(addr, self as u32);
    }
}

impl GuestNumber for f32 {
    const SIZE: u32 = 4;

    fn read(memory: &GuestMemory, addr: u32) -> Self {
        f32::from_bits(memory.read_long(addr))
    }

    fn write(self, memory: &mut GuestMemory, addr: u32) {
        memory.write_long(addr, self.to_bits());
    }
}

impl GuestNumber for f64 {
    const SIZE: u32 = 8;

    fn read(memory: &GuestMemory, addr: u32) -> Self {
        f64::from_bits(memory.read_long_long(addr))
    }

    fn write(self, memory: &mut GuestMemory, addr: u32) {
        memory.write_long_long(addr, self.to_bits());
    }
}

impl GuestNumber for Extended {
    const SIZE: u32 = EXTENDED_GUEST_SIZE;

    fn read(memory: &GuestMemory, addr: u32) -> Self {
        let mut host = [0u8; EXTENDED_BYTES];
        for (i, byte) in host.iter_mut().rev().enumerate() {
            *byte = memory.read_byte(addr.wrapping_add(i as u32));
        }
        Extended::from_host_bytes(host)
    }

    fn write(self, memory: &mut GuestMemory, addr: u32) {
        let host = self.to_host_bytes();
        for (i, &byte) in host.iter().rev().enumerate() {
            memory.write_byte(addr.wrapping_add(i as u32), byte);
        }
        for i in EXTENDED_BYTES as u32..Self::SIZE {
            memory.write_byte(addr.wrapping_add(i), 0);
        }
    }
}

pub fn read_num<T: GuestNumber>(memory: &GuestMemory, addr: u32) -> T {
    T::read(memory, addr)
}

pub fn write_num<T: GuestNumber>(memory: &mut GuestMemory, value: T, addr: u32) {
    value.write(memory, addr);
}
