//! Mapper state and the checked-translation path.

use log::{debug, info, log_enabled, Level};

use crate::access::{evaluate, AccessFault, AccessKind, AccessVerdict};
use crate::cpu::{CpuCore, NullCpu};
use crate::descriptor::{Descriptor, DescriptorTable, SYS_ENTRY_START};
use crate::error::{Error, Result};

/// Log target for all mapper messages.
pub(crate) const LOG_TARGET: &str = "mapper";

/// Size of one page in bytes.
pub const PAGE_SIZE: u32 = 4096;

/// One past the highest RAM-mapped virtual address (8 MiB). Addresses at or
/// above this are peripherals: they bypass the page table and are reachable
/// only in system mode.
pub const VIRT_RAM_CEILING: u32 = 0x80_0000;

/// Largest RAM buffer the 13-bit physical page field can reach (32 MiB).
const MAX_RAM_SIZE: usize = 32 * 1024 * 1024;

/// The memory-management unit of one emulated machine.
///
/// Owns the page table and the physical RAM buffer. `sysmode` and the
/// current process id are request-scoped context: the CPU core sets them
/// ahead of a batch of bus accesses.
pub struct Mapper {
    table: DescriptorTable,
    ram: Vec<u8>,
    /// Wraparound mask; the RAM length is a power of two, so masked offsets
    /// are in range by construction.
    phys_mask: usize,
    sysmode: bool,
    process_id: u8,
    cpu: Box<dyn CpuCore>,
}

impl Mapper {
    /// Create a mapper over `ram` with a stand-in CPU core.
    ///
    /// The buffer length must be a nonzero power of two no larger than the
    /// 32 MiB physical window.
    pub fn new(ram: Vec<u8>) -> Result<Self> {
        Self::with_cpu(ram, Box::new(NullCpu))
    }

    /// Create a mapper over `ram`, consulting `cpu` for the current core id
    /// and fault diagnostics.
    pub fn with_cpu(ram: Vec<u8>, cpu: Box<dyn CpuCore>) -> Result<Self> {
        if !ram.len().is_power_of_two() {
            return Err(Error::InvalidRamSize(ram.len()));
        }
        if ram.len() > MAX_RAM_SIZE {
            return Err(Error::RamTooLarge(ram.len()));
        }
        let phys_mask = ram.len() - 1;
        Ok(Self {
            table: DescriptorTable::new(),
            ram,
            phys_mask,
            sysmode: false,
            process_id: 0,
            cpu,
        })
    }

    /// The page table.
    pub fn table(&self) -> &DescriptorTable {
        &self.table
    }

    /// Mutable page table access, for machine setup and snapshot restore.
    /// Emulated code programs descriptors through the descriptor bus.
    pub fn table_mut(&mut self) -> &mut DescriptorTable {
        &mut self.table
    }

    /// The physical RAM buffer.
    pub fn ram(&self) -> &[u8] {
        &self.ram
    }

    /// Mutable RAM access, for loaders and snapshot restore.
    pub fn ram_mut(&mut self) -> &mut [u8] {
        &mut self.ram
    }

    /// Whether translations use the system half of the table.
    pub fn sysmode(&self) -> bool {
        self.sysmode
    }

    /// Select the system or user half of the table for the next accesses.
    pub fn set_sysmode(&mut self, sysmode: bool) {
        self.sysmode = sysmode;
    }

    /// Owner tag user-mode accesses are checked against.
    pub fn process_id(&self) -> u8 {
        self.process_id
    }

    /// Set the owner tag for the next user-mode accesses.
    pub fn set_process_id(&mut self, id: u8) {
        if self.process_id != id {
            debug!(target: LOG_TARGET, "switching to map id {id}");
        }
        self.process_id = id;
    }

    /// Translate a virtual address into an offset in the RAM buffer, using
    /// the current sysmode, and mark the page referenced (plus altered on a
    /// write).
    ///
    /// Offsets beyond the RAM size silently wrap instead of faulting; this
    /// aliasing matches the hardware and emulated software may rely on it.
    /// Permissions are *not* checked here: only the explicit
    /// [`access_allowed`](Self::access_allowed) path enforces them.
    ///
    /// # Panics
    ///
    /// Panics if `addr` lies at or above [`VIRT_RAM_CEILING`]; such addresses
    /// belong to peripherals and never reach the paged path.
    pub fn translate(&mut self, addr: u32, is_write: bool) -> usize {
        let mut page = (addr >> 12) as usize;
        assert!(
            page < SYS_ENTRY_START,
            "virtual address {addr:#x} beyond the paged window"
        );
        if self.sysmode {
            page += SYS_ENTRY_START;
        }
        self.table.mark_accessed(page, is_write);
        let frame = self.table.physical_page(page) as usize;
        ((addr as usize & 0xFFF) | frame << 12) & self.phys_mask
    }

    /// Pre-check entry point: would `kind` be permitted at `addr`?
    ///
    /// Consults the page table without touching RAM or the
    /// referenced/altered bits. Addresses at or above [`VIRT_RAM_CEILING`]
    /// bypass the table: they are legal only for system-mode accesses.
    pub fn access_allowed(&self, addr: u32, kind: AccessKind, system: bool) -> AccessVerdict {
        if addr >= VIRT_RAM_CEILING {
            if system {
                return AccessVerdict::Granted;
            }
            info!(target: LOG_TARGET, "address {addr:#x} not accessible in user mode");
            return AccessVerdict::ProtectionFault;
        }
        let mut page = (addr >> 12) as usize;
        if system {
            page += SYS_ENTRY_START;
        }
        let desc = self.table.get(page);
        let fault = evaluate(&desc, kind, system, self.process_id);
        if !fault.is_clear() {
            self.log_fault(addr, page, &desc, kind, &fault);
        }
        fault.verdict()
    }

    /// Byte of RAM at a wrapped physical offset.
    pub(crate) fn ram_byte(&self, offset: usize) -> u8 {
        self.ram[offset & self.phys_mask]
    }

    /// Store a byte of RAM at a wrapped physical offset.
    pub(crate) fn set_ram_byte(&mut self, offset: usize, val: u8) {
        let offset = offset & self.phys_mask;
        self.ram[offset] = val;
    }

    /// Id of the core issuing the current bus access.
    pub(crate) fn cpu_id(&self) -> u8 {
        self.cpu.current_cpu_id()
    }

    fn log_fault(&self, addr: u32, page: usize, desc: &Descriptor, kind: AccessKind, fault: &AccessFault) {
        debug!(
            target: LOG_TARGET,
            "access fault: page ent {:#010x} req {:?}, violations {:?}",
            desc.to_combined(),
            kind,
            fault.violations
        );
        if let Some(owner) = fault.owner_mismatch {
            debug!(target: LOG_TARGET, "proc uid {} page uid {owner}", self.process_id);
        }
        // The CPU dumps are expensive to format; skip them unless debug
        // logging is actually on.
        if log_enabled!(target: LOG_TARGET, Level::Debug) {
            debug!(target: LOG_TARGET, "access fault at addr {addr:#x} page {page}, CPU state:");
            debug!(target: LOG_TARGET, "{}", self.cpu.dump_registers());
            debug!(target: LOG_TARGET, "{}", self.cpu.dump_call_stack());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const RAM_8M: usize = 8 * 1024 * 1024;

    fn mapper() -> Mapper {
        Mapper::new(vec![0; RAM_8M]).unwrap()
    }

    fn map_page(m: &mut Mapper, index: usize, desc: Descriptor) {
        m.table_mut().set(index, &desc);
    }

    #[test]
    fn ram_size_must_be_power_of_two() {
        assert!(matches!(
            Mapper::new(vec![0; 3]),
            Err(Error::InvalidRamSize(3))
        ));
        assert!(matches!(Mapper::new(Vec::new()), Err(Error::InvalidRamSize(0))));
        assert!(matches!(
            Mapper::new(vec![0; 64 * 1024 * 1024]),
            Err(Error::RamTooLarge(_))
        ));
    }

    #[test]
    fn translate_combines_frame_and_offset() {
        let mut m = mapper();
        map_page(
            &mut m,
            1,
            Descriptor {
                physical_page: 5,
                ..Descriptor::default()
            },
        );
        assert_eq!(m.translate(0x001234, false), 0x5234);
    }

    #[test]
    fn translate_wraps_past_ram_size() {
        let mut m = mapper();
        // Frame 0x800 starts at 8 MiB, one past the end of this buffer.
        map_page(
            &mut m,
            0,
            Descriptor {
                physical_page: 0x800,
                ..Descriptor::default()
            },
        );
        assert_eq!(m.translate(0x10, false), 0x10);
    }

    #[test]
    fn sysmode_selects_the_system_half() {
        let mut m = mapper();
        map_page(
            &mut m,
            SYS_ENTRY_START + 2,
            Descriptor {
                physical_page: 7,
                ..Descriptor::default()
            },
        );
        m.set_sysmode(true);
        assert_eq!(m.translate(0x2040, false), 0x7040);
        assert!(m.table().get(SYS_ENTRY_START + 2).referenced);
        // The user half is untouched.
        assert!(!m.table().get(2).referenced);
    }

    #[test]
    #[should_panic(expected = "beyond the paged window")]
    fn translate_panics_above_the_window() {
        let mut m = mapper();
        m.translate(VIRT_RAM_CEILING, false);
    }

    #[test]
    fn precheck_reports_disable_bits() {
        let mut m = mapper();
        map_page(
            &mut m,
            3,
            Descriptor {
                write_disabled: true,
                ..Descriptor::default()
            },
        );
        assert_eq!(
            m.access_allowed(0x3000, AccessKind::WRITE, false),
            AccessVerdict::ProtectionFault
        );
        assert_eq!(
            m.access_allowed(0x3000, AccessKind::READ, false),
            AccessVerdict::Granted
        );

        // Clearing the bit clears the fault.
        map_page(&mut m, 3, Descriptor::default());
        assert_eq!(
            m.access_allowed(0x3000, AccessKind::WRITE, false),
            AccessVerdict::Granted
        );
    }

    #[test]
    fn precheck_selects_the_half_by_mode() {
        let mut m = mapper();
        // The user page is clean, its system counterpart is not.
        map_page(
            &mut m,
            SYS_ENTRY_START + 3,
            Descriptor {
                write_disabled: true,
                ..Descriptor::default()
            },
        );
        assert_eq!(
            m.access_allowed(0x3000, AccessKind::WRITE, false),
            AccessVerdict::Granted
        );
        assert_eq!(
            m.access_allowed(0x3000, AccessKind::WRITE, true),
            AccessVerdict::ProtectionFault
        );
    }

    #[test]
    fn precheck_reports_owner_mismatch() {
        let mut m = mapper();
        map_page(
            &mut m,
            0,
            Descriptor {
                owner_id: 7,
                read_disabled: true,
                ..Descriptor::default()
            },
        );
        // The system counterpart carries the same read-disable bit.
        map_page(
            &mut m,
            SYS_ENTRY_START,
            Descriptor {
                read_disabled: true,
                ..Descriptor::default()
            },
        );
        m.set_process_id(3);
        // Ownership wins over the read violation in the outward class.
        assert_eq!(
            m.access_allowed(0x0, AccessKind::READ, false),
            AccessVerdict::OwnershipFault
        );
        // System mode skips ownership entirely; the read violation remains.
        assert_eq!(
            m.access_allowed(0x0, AccessKind::READ, true),
            AccessVerdict::ProtectionFault
        );

        m.set_process_id(7);
        assert_eq!(
            m.access_allowed(0x0, AccessKind::WRITE, false),
            AccessVerdict::Granted
        );
    }

    #[test]
    fn precheck_does_not_touch_accessed_bits() {
        let mut m = mapper();
        m.access_allowed(0x4000, AccessKind::READ, false);
        let desc = m.table().get(4);
        assert!(!desc.referenced);
        assert!(!desc.altered);
    }

    #[test]
    fn peripheral_window_is_system_only() {
        let m = mapper();
        for addr in [VIRT_RAM_CEILING, 0xF0_0000, u32::MAX] {
            assert_eq!(
                m.access_allowed(addr, AccessKind::READ, true),
                AccessVerdict::Granted
            );
            assert_eq!(
                m.access_allowed(addr, AccessKind::READ, false),
                AccessVerdict::ProtectionFault
            );
        }
    }
}
