//! Ioctl Command Encoding
//!
//! Packs direction, type, number and argument size into the 32-bit command
//! word the kernel expects. The field widths follow the generic Linux layout
//! (x86, arm, riscv and friends):
//!
//! ```text
//!  31 30 29                 16 15          8 7           0
//! ┌─────┬─────────────────────┬─────────────┬─────────────┐
//! │ dir │        size         │    type     │   number    │
//! └─────┴─────────────────────┴─────────────┴─────────────┘
//! ```

use std::fmt;
use std::ops::BitOr;

// =============================================================================
// Field Layout
// =============================================================================

pub const NUMBER_BITS: u32 = 8;
pub const TYPE_BITS: u32 = 8;
pub const SIZE_BITS: u32 = 14;
pub const DIRECTION_BITS: u32 = 2;

pub const NUMBER_MASK: u32 = (1 << NUMBER_BITS) - 1;
pub const TYPE_MASK: u32 = (1 << TYPE_BITS) - 1;
pub const SIZE_MASK: u32 = (1 << SIZE_BITS) - 1;
pub const DIRECTION_MASK: u32 = (1 << DIRECTION_BITS) - 1;

pub const NUMBER_SHIFT: u32 = 0;
pub const TYPE_SHIFT: u32 = NUMBER_SHIFT + NUMBER_BITS;
pub const SIZE_SHIFT: u32 = TYPE_SHIFT + TYPE_BITS;
pub const DIRECTION_SHIFT: u32 = SIZE_SHIFT + SIZE_BITS;

// =============================================================================
// Direction
// =============================================================================

/// Data transfer direction of an ioctl, seen from userspace.
///
/// Read and write are independent flags; a read/write ioctl is the union of
/// both rather than a separate value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Direction(u32);

impl Direction {
    pub const NONE: Direction = Direction(0);
    pub const WRITE: Direction = Direction(1);
    pub const READ: Direction = Direction(2);

    /// Raw two-bit value
    pub const fn bits(self) -> u32 {
        self.0
    }

    pub const fn union(self, other: Direction) -> Direction {
        Direction(self.0 | other.0)
    }

    pub const fn contains(self, other: Direction) -> bool {
        self.0 & other.0 == other.0
    }
}

impl BitOr for Direction {
    type Output = Direction;

    fn bitor(self, rhs: Direction) -> Direction {
        self.union(rhs)
    }
}

// =============================================================================
// Command Word
// =============================================================================

/// An encoded ioctl command word.
///
/// Built through [`ioc`] and its typed helpers; [`IoctlCommand::from_raw`]
/// exists only for legacy requests such as `SG_IO` that predate the encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct IoctlCommand(u32);

impl IoctlCommand {
    /// Wraps a legacy request code that was not built from the `_IOC` fields
    pub const fn from_raw(raw: u32) -> Self {
        Self(raw)
    }

    /// The word passed to `ioctl(2)`
    pub const fn raw(self) -> u32 {
        self.0
    }

    pub const fn direction(self) -> Direction {
        Direction((self.0 >> DIRECTION_SHIFT) & DIRECTION_MASK)
    }

    /// The "type" (magic) byte identifying the driver family
    pub const fn kind(self) -> u8 {
        ((self.0 >> TYPE_SHIFT) & TYPE_MASK) as u8
    }

    pub const fn number(self) -> u8 {
        ((self.0 >> NUMBER_SHIFT) & NUMBER_MASK) as u8
    }

    /// Size of the argument structure in bytes
    pub const fn size(self) -> usize {
        ((self.0 >> SIZE_SHIFT) & SIZE_MASK) as usize
    }
}

impl fmt::Display for IoctlCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#010x}", self.0)
    }
}

/// Packs the four fields into a command word.
///
/// `size` must fit the 14-bit size field. Exceeding it is a programming
/// error; debug builds assert, and in const contexts the assertion fires at
/// compile time.
pub const fn ioc(direction: Direction, kind: u8, number: u8, size: usize) -> IoctlCommand {
    debug_assert!(size <= SIZE_MASK as usize, "ioctl argument size exceeds the size field");
    debug_assert!(direction.bits() <= DIRECTION_MASK, "invalid ioctl direction");

    IoctlCommand(
        (direction.bits() << DIRECTION_SHIFT)
            | ((kind as u32) << TYPE_SHIFT)
            | ((number as u32) << NUMBER_SHIFT)
            | ((size as u32) << SIZE_SHIFT),
    )
}

/// Command without an argument structure
pub const fn io(kind: u8, number: u8) -> IoctlCommand {
    ioc(Direction::NONE, kind, number, 0)
}

/// Command where the kernel writes a `T` back to userspace
pub const fn ior<T>(kind: u8, number: u8) -> IoctlCommand {
    ioc(Direction::READ, kind, number, std::mem::size_of::<T>())
}

/// Command where userspace hands a `T` to the kernel
pub const fn iow<T>(kind: u8, number: u8) -> IoctlCommand {
    ioc(Direction::WRITE, kind, number, std::mem::size_of::<T>())
}

/// Command where the kernel reads a `T` and writes results back into it
pub const fn iowr<T>(kind: u8, number: u8) -> IoctlCommand {
    ioc(
        Direction::WRITE.union(Direction::READ),
        kind,
        number,
        std::mem::size_of::<T>(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[repr(C)]
    struct SeventyTwo([u8; 72]);

    #[test]
    fn test_field_layout() {
        assert_eq!(TYPE_SHIFT, 8);
        assert_eq!(SIZE_SHIFT, 16);
        assert_eq!(DIRECTION_SHIFT, 30);
        assert_eq!(NUMBER_BITS + TYPE_BITS + SIZE_BITS + DIRECTION_BITS, 32);
    }

    #[test]
    fn test_known_kernel_codes() {
        // NVME_IOCTL_ADMIN_CMD = _IOWR('N', 0x41, struct nvme_admin_cmd)
        assert_eq!(iowr::<SeventyTwo>(b'N', 0x41).raw(), 0xC048_4E41);
        // NVME_IOCTL_ID = _IO('N', 0x40)
        assert_eq!(io(b'N', 0x40).raw(), 0x4E40);
        // BLKGETSIZE64 = _IOR(0x12, 114, size_t)
        assert_eq!(ior::<u64>(0x12, 114).raw(), 0x8008_1272);
        // FS_IOC_SETFLAGS = _IOW('f', 2, long)
        assert_eq!(iow::<u64>(b'f', 2).raw(), 0x4008_6602);
    }

    #[test]
    fn test_read_write_is_union_of_flags() {
        let rw = Direction::READ | Direction::WRITE;
        assert_eq!(rw.bits(), 3);
        assert!(rw.contains(Direction::READ));
        assert!(rw.contains(Direction::WRITE));
        assert!(!Direction::READ.contains(Direction::WRITE));
        assert_eq!(iowr::<u32>(1, 2).direction(), rw);
    }

    #[test]
    fn test_fields_round_trip() {
        let directions = [
            Direction::NONE,
            Direction::WRITE,
            Direction::READ,
            Direction::READ | Direction::WRITE,
        ];
        for direction in directions {
            for kind in [0u8, 1, b'N', 0x22, 0xFF] {
                for number in [0u8, 0x41, 0x85, 0xFF] {
                    for size in [0usize, 1, 72, 80, 4096, SIZE_MASK as usize] {
                        let cmd = ioc(direction, kind, number, size);
                        assert_eq!(cmd.direction(), direction);
                        assert_eq!(cmd.kind(), kind);
                        assert_eq!(cmd.number(), number);
                        assert_eq!(cmd.size(), size);
                    }
                }
            }
        }
    }

    #[test]
    #[cfg(debug_assertions)]
    #[should_panic(expected = "size field")]
    fn test_oversized_argument_asserts() {
        let size = SIZE_MASK as usize + 1;
        let _ = ioc(Direction::READ, b'N', 1, size);
    }

    #[test]
    fn test_display_is_hex() {
        assert_eq!(IoctlCommand::from_raw(0x2285).to_string(), "0x00002285");
    }
}
