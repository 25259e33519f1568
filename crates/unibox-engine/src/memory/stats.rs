use std::fmt;

/// Point-in-time snapshot of a [`TrackedAllocator`](super::TrackedAllocator).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MemoryStats {
    pub blocks: usize,
    /// Usable bytes, headers excluded.
    pub used_bytes: usize,
    pub header_bytes: usize,
}

impl MemoryStats {
    pub fn absolute_bytes(&self) -> usize {
        self.used_bytes + self.header_bytes
    }

    pub fn used_kb(&self) -> f64 {
        self.used_bytes as f64 / 1024.0
    }
}

impl fmt::Display for MemoryStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} blocks, {:.2} kb used ({} b, {} b with headers)",
            self.blocks,
            self.used_kb(),
            self.used_bytes,
            self.absolute_bytes()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_reports_blocks_and_bytes() {
        let s = MemoryStats { blocks: 2, used_bytes: 2048, header_bytes: 128 };
        assert_eq!(s.to_string(), "2 blocks, 2.00 kb used (2048 b, 2176 b with headers)");
    }
}
