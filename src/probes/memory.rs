//! Heap analysis probe.

use core::fmt::Write;

use super::{footer, heading};
use crate::app::ports::ProbeId;

/// Size of the allocation smoke test.
pub const ALLOC_TEST_BYTES: usize = 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemoryReading {
    pub total: u32,
    pub free: u32,
    pub min_free: u32,
    pub largest_block: u32,
    pub total_blocks: u32,
    pub free_blocks: u32,
    pub alloc_ok: bool,
}

impl MemoryReading {
    pub fn used(&self) -> u32 {
        self.total.saturating_sub(self.free)
    }

    /// Used share of the heap in whole percent.
    pub fn utilisation_pct(&self) -> u32 {
        if self.total == 0 {
            return 0;
        }
        (u64::from(self.used()) * 100 / u64::from(self.total)) as u32
    }
}

fn alloc_test() -> bool {
    let mut probe: Vec<u8> = Vec::new();
    probe.try_reserve_exact(ALLOC_TEST_BYTES).is_ok()
}

#[cfg(target_os = "espidf")]
pub fn read() -> MemoryReading {
    use esp_idf_svc::sys::*;

    let mut info: multi_heap_info_t = unsafe { core::mem::zeroed() };
    // SAFETY: out-pointer to a local; read-only heap statistics.
    let total = unsafe {
        heap_caps_get_info(&mut info, MALLOC_CAP_DEFAULT);
        heap_caps_get_total_size(MALLOC_CAP_DEFAULT)
    };

    MemoryReading {
        total: total as u32,
        free: info.total_free_bytes as u32,
        min_free: info.minimum_free_bytes as u32,
        largest_block: info.largest_free_block as u32,
        total_blocks: info.total_blocks as u32,
        free_blocks: info.free_blocks as u32,
        alloc_ok: alloc_test(),
    }
}

#[cfg(not(target_os = "espidf"))]
pub fn read() -> MemoryReading {
    MemoryReading {
        total: 327_680,
        free: 245_760,
        min_free: 231_424,
        largest_block: 212_992,
        total_blocks: 184,
        free_blocks: 9,
        alloc_ok: alloc_test(),
    }
}

pub fn report(r: &MemoryReading) -> String {
    let mut out = heading(ProbeId::Memory);
    let _ = writeln!(out, "Heap:");
    let _ = writeln!(out, "  Total:        {} KB", r.total / 1024);
    let _ = writeln!(out, "  Free:         {} KB", r.free / 1024);
    let _ = writeln!(out, "  Used:         {} KB", r.used() / 1024);
    let _ = writeln!(out, "  Utilisation:  {}%", r.utilisation_pct());
    let _ = writeln!(out, "  Minimum free: {} KB", r.min_free / 1024);
    let _ = writeln!(out, "Blocks:");
    let _ = writeln!(out, "  Total:        {}", r.total_blocks);
    let _ = writeln!(out, "  Free:         {}", r.free_blocks);
    let _ = writeln!(out, "  Largest free: {} bytes", r.largest_block);
    let _ = writeln!(
        out,
        "Allocation test ({} bytes): {}",
        ALLOC_TEST_BYTES,
        if r.alloc_ok { "ok" } else { "FAILED" }
    );
    out.push_str(&footer(ProbeId::Memory));
    out
}
