//! # mapper
//!
//! Hardware-accurate memory-management unit for a machine emulator.
//!
//! The mapper translates 23-bit virtual addresses into offsets in a
//! simulated RAM buffer, splitting the address space into a user and a
//! system half of 2048 pages each, enforcing per-page read/write/execute
//! disable bits (set means forbidden) and per-page process ownership, and
//! recording referenced/altered bits that emulated system software inspects
//! to run its own virtual-memory policy.
//!
//! ## Quick Start
//!
//! ```rust
//! use mapper::{AccessKind, AccessVerdict, Descriptor, Mapper};
//!
//! fn main() -> mapper::Result<()> {
//!     let mut mmu = Mapper::new(vec![0; 8 * 1024 * 1024])?;
//!
//!     // Map virtual page 1 to physical frame 5, owned by process 3.
//!     mmu.table_mut().set(
//!         1,
//!         &Descriptor {
//!             physical_page: 5,
//!             owner_id: 3,
//!             ..Descriptor::default()
//!         },
//!     );
//!     mmu.set_process_id(3);
//!
//!     assert_eq!(
//!         mmu.access_allowed(0x1234, AccessKind::READ, false),
//!         AccessVerdict::Granted
//!     );
//!     mmu.ram_write8(0x1234, 0xAB);
//!     assert_eq!(mmu.ram()[0x5234], 0xAB);
//!     Ok(())
//! }
//! ```
//!
//! ## Fidelity notes
//!
//! Two hardware quirks are preserved on purpose: physical offsets beyond the
//! RAM size wrap around instead of faulting, and the RAM bus never checks
//! permissions on its own — enforcement happens only through the explicit
//! [`Mapper::access_allowed`] pre-check. Emulated software relies on both.

mod access;
mod bus;
mod cpu;
mod descriptor;
mod error;
mod mapper;

pub use access::{evaluate, AccessFault, AccessKind, AccessVerdict};
pub use bus::{BusHandler, DescriptorPort, RamPort};
pub use cpu::{CpuCore, NullCpu, DMA_CORE_ID};
pub use descriptor::{Descriptor, DescriptorTable, NUM_ENTRIES, SYS_ENTRY_START};
pub use error::{Error, Result};
pub use mapper::{Mapper, PAGE_SIZE, VIRT_RAM_CEILING};
