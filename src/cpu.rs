//! CPU core collaborator interface.
//!
//! The mapper never drives the CPU; it only needs to know which core is
//! issuing the current bus access and, on a fault, how to render the core's
//! state for the debug log.

/// Core id of the DMA-capable secondary core. Its writes to the descriptor
/// bus are silently discarded: that core has no mapping-configuration
/// privilege.
pub const DMA_CORE_ID: u8 = 0;

/// What the mapper needs from the CPU core currently stepping.
pub trait CpuCore {
    /// Id of the core issuing the current bus access.
    fn current_cpu_id(&self) -> u8;

    /// Register dump for fault diagnostics.
    fn dump_registers(&self) -> String;

    /// Call-stack dump for fault diagnostics.
    fn dump_call_stack(&self) -> String;
}

/// Stand-in core for tests and standalone use: reports the primary core id
/// and has nothing to dump.
pub struct NullCpu;

impl CpuCore for NullCpu {
    fn current_cpu_id(&self) -> u8 {
        1
    }

    fn dump_registers(&self) -> String {
        String::new()
    }

    fn dump_call_stack(&self) -> String {
        String::new()
    }
}
