//! Bus-facing read/write surfaces.
//!
//! The emulated machine sees two address ranges backed by the mapper: the
//! descriptor bus, through which privileged code programs the page table one
//! half-word at a time, and the RAM bus, which runs the full
//! translate-then-access path on every call. Multi-byte values are
//! big-endian on both buses.
//!
//! The RAM bus deliberately does *not* consult the permission evaluator;
//! only callers of [`Mapper::access_allowed`] get enforcement. See the test
//! `ram_bus_does_not_enforce_permissions`.

use crate::cpu::DMA_CORE_ID;
use crate::mapper::Mapper;

/// Handler contract the emulator's bus-dispatch layer registers at an
/// address range.
pub trait BusHandler {
    fn read8(&mut self, addr: u32) -> u8;
    fn read16(&mut self, addr: u32) -> u16;
    fn read32(&mut self, addr: u32) -> u32;
    fn write8(&mut self, addr: u32, val: u8);
    fn write16(&mut self, addr: u32, val: u16);
    fn write32(&mut self, addr: u32, val: u32);
}

impl Mapper {
    /// 16-bit descriptor bus read. `addr / 2` is the half-word address: even
    /// half-word addresses select the upper word of descriptor `addr / 4`,
    /// odd ones the lower word.
    pub fn desc_read16(&self, addr: u32) -> u16 {
        let word = (addr / 2) as usize;
        let index = word / 2;
        if word & 1 == 1 {
            self.table().lower_word(index)
        } else {
            self.table().upper_word(index)
        }
    }

    /// 16-bit descriptor bus write. Writes issued by the DMA core are
    /// silently discarded.
    pub fn desc_write16(&mut self, addr: u32, val: u16) {
        if self.cpu_id() == DMA_CORE_ID {
            return;
        }
        let word = (addr / 2) as usize;
        let index = word / 2;
        if word & 1 == 1 {
            self.table_mut().set_lower_word(index, val);
        } else {
            self.table_mut().set_upper_word(index, val);
        }
    }

    /// 32-bit descriptor bus read: most significant half first.
    pub fn desc_read32(&self, addr: u32) -> u32 {
        (self.desc_read16(addr) as u32) << 16 | self.desc_read16(addr + 2) as u32
    }

    /// 32-bit descriptor bus write: most significant half first.
    pub fn desc_write32(&mut self, addr: u32, val: u32) {
        self.desc_write16(addr, (val >> 16) as u16);
        self.desc_write16(addr + 2, val as u16);
    }

    /// 8-bit descriptor bus read from the containing half-word, big-endian
    /// byte lanes.
    pub fn desc_read8(&self, addr: u32) -> u8 {
        let word = self.desc_read16(addr & !1);
        if addr & 1 == 1 {
            word as u8
        } else {
            (word >> 8) as u8
        }
    }

    /// 8-bit descriptor bus write: read-modify-write of the containing
    /// half-word.
    pub fn desc_write8(&mut self, addr: u32, val: u8) {
        let word = self.desc_read16(addr & !1);
        let word = if addr & 1 == 1 {
            word & 0xFF00 | val as u16
        } else {
            word & 0x00FF | (val as u16) << 8
        };
        self.desc_write16(addr & !1, word);
    }

    /// Read a byte of RAM through the current mapping.
    pub fn ram_read8(&mut self, addr: u32) -> u8 {
        let phys = self.translate(addr, false);
        self.ram_byte(phys)
    }

    /// Read a big-endian 16-bit value of RAM through the current mapping.
    pub fn ram_read16(&mut self, addr: u32) -> u16 {
        let phys = self.translate(addr, false);
        (self.ram_byte(phys) as u16) << 8 | self.ram_byte(phys + 1) as u16
    }

    /// Read a big-endian 32-bit value of RAM through the current mapping.
    pub fn ram_read32(&mut self, addr: u32) -> u32 {
        let phys = self.translate(addr, false);
        (self.ram_byte(phys) as u32) << 24
            | (self.ram_byte(phys + 1) as u32) << 16
            | (self.ram_byte(phys + 2) as u32) << 8
            | self.ram_byte(phys + 3) as u32
    }

    /// Write a byte of RAM through the current mapping.
    pub fn ram_write8(&mut self, addr: u32, val: u8) {
        let phys = self.translate(addr, true);
        self.set_ram_byte(phys, val);
    }

    /// Write a big-endian 16-bit value of RAM through the current mapping.
    pub fn ram_write16(&mut self, addr: u32, val: u16) {
        let phys = self.translate(addr, true);
        self.set_ram_byte(phys, (val >> 8) as u8);
        self.set_ram_byte(phys + 1, val as u8);
    }

    /// Write a big-endian 32-bit value of RAM through the current mapping.
    pub fn ram_write32(&mut self, addr: u32, val: u32) {
        let phys = self.translate(addr, true);
        self.set_ram_byte(phys, (val >> 24) as u8);
        self.set_ram_byte(phys + 1, (val >> 16) as u8);
        self.set_ram_byte(phys + 2, (val >> 8) as u8);
        self.set_ram_byte(phys + 3, val as u8);
    }
}

/// Descriptor bus surface of a mapper, for bus-dispatch registration.
pub struct DescriptorPort<'a>(pub &'a mut Mapper);

impl BusHandler for DescriptorPort<'_> {
    fn read8(&mut self, addr: u32) -> u8 {
        self.0.desc_read8(addr)
    }

    fn read16(&mut self, addr: u32) -> u16 {
        self.0.desc_read16(addr)
    }

    fn read32(&mut self, addr: u32) -> u32 {
        self.0.desc_read32(addr)
    }

    fn write8(&mut self, addr: u32, val: u8) {
        self.0.desc_write8(addr, val);
    }

    fn write16(&mut self, addr: u32, val: u16) {
        self.0.desc_write16(addr, val);
    }

    fn write32(&mut self, addr: u32, val: u32) {
        self.0.desc_write32(addr, val);
    }
}

/// RAM bus surface of a mapper, for bus-dispatch registration.
pub struct RamPort<'a>(pub &'a mut Mapper);

impl BusHandler for RamPort<'_> {
    fn read8(&mut self, addr: u32) -> u8 {
        self.0.ram_read8(addr)
    }

    fn read16(&mut self, addr: u32) -> u16 {
        self.0.ram_read16(addr)
    }

    fn read32(&mut self, addr: u32) -> u32 {
        self.0.ram_read32(addr)
    }

    fn write8(&mut self, addr: u32, val: u8) {
        self.0.ram_write8(addr, val);
    }

    fn write16(&mut self, addr: u32, val: u16) {
        self.0.ram_write16(addr, val);
    }

    fn write32(&mut self, addr: u32, val: u32) {
        self.0.ram_write32(addr, val);
    }
}
