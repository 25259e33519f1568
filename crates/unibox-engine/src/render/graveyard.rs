use crate::collections::DArray;
use crate::device::{GlApi, GlHandle, GpuObjectKind};

/// Starting capacity of every per-kind sequence.
pub const DEFAULT_GRAVEYARD_CAPACITY: usize = 1024;

/// Deferred destruction queue for device objects.
///
/// Objects are pushed here instead of being deleted on the spot. At a frame
/// boundary, where the context is known to be current, [`Graveyard::flush`]
/// issues one batched delete per kind.
#[derive(Debug)]
pub struct Graveyard {
    sequences: [DArray<GlHandle>; GpuObjectKind::COUNT],
}

impl Graveyard {
    pub fn new(start_capacity: usize) -> Self {
        Self {
            sequences: std::array::from_fn(|_| DArray::with_capacity(start_capacity)),
        }
    }

    /// Queues `handle` for deletion. Handle 0 names no object and is dropped.
    pub fn push(&mut self, kind: GpuObjectKind, handle: GlHandle) {
        if handle == 0 {
            log::trace!("graveyard: ignoring null {kind:?} handle");
            return;
        }
        self.sequences[kind.index()].push(handle);
    }

    /// Deletes every queued object, one batched call per non-empty kind.
    pub fn flush(&mut self, gl: &dyn GlApi) {
        let largest = self.sequences.iter().map(DArray::len).max().unwrap_or(0);
        if largest == 0 {
            return;
        }

        let mut scratch: Vec<GlHandle> = Vec::with_capacity(largest);
        for kind in GpuObjectKind::ALL {
            let seq = &mut self.sequences[kind.index()];
            if seq.is_empty() {
                continue;
            }

            scratch.clear();
            scratch.extend(seq.iter().copied());
            gl.delete_objects(kind, &scratch);
            log::trace!("graveyard: deleted {} {kind:?} objects", scratch.len());

            seq.clear();
            seq.shrink();
        }
    }

    pub fn pending(&self, kind: GpuObjectKind) -> usize {
        self.sequences[kind.index()].len()
    }

    pub fn pending_handles(&self, kind: GpuObjectKind) -> &[GlHandle] {
        self.sequences[kind.index()].as_slice()
    }

    pub fn capacity(&self, kind: GpuObjectKind) -> usize {
        self.sequences[kind.index()].capacity()
    }

    pub fn is_empty(&self) -> bool {
        self.sequences.iter().all(DArray::is_empty)
    }
}

impl Default for Graveyard {
    fn default() -> Self {
        Self::new(DEFAULT_GRAVEYARD_CAPACITY)
    }
}

impl Drop for Graveyard {
    fn drop(&mut self) {
        if !self.is_empty() {
            let leaked: usize = self.sequences.iter().map(DArray::len).sum();
            log::warn!("graveyard dropped with {leaked} unflushed device objects");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::HeadlessGl;

    #[test]
    fn flush_issues_one_batch_per_kind() {
        let gl = HeadlessGl::new();
        let mut g = Graveyard::new(4);
        for h in [3, 5, 9] {
            g.push(GpuObjectKind::Texture, h);
        }
        g.push(GpuObjectKind::VertexBuffer, 11);

        g.flush(&gl);

        assert_eq!(gl.delete_batches(GpuObjectKind::Texture), vec![vec![3, 5, 9]]);
        assert_eq!(gl.delete_batches(GpuObjectKind::VertexBuffer), vec![vec![11]]);
        assert!(gl.delete_batches(GpuObjectKind::Query).is_empty());
        assert_eq!(g.pending(GpuObjectKind::Texture), 0);
        assert!(g.is_empty());
    }

    #[test]
    fn null_handle_is_ignored() {
        let mut g = Graveyard::default();
        g.push(GpuObjectKind::Program, 0);
        assert!(g.is_empty());
    }

    #[test]
    fn empty_flush_touches_nothing() {
        let gl = HeadlessGl::new();
        let mut g = Graveyard::default();
        g.flush(&gl);
        assert!(gl.calls().is_empty());
    }

    #[test]
    fn flush_shrinks_back_to_floor() {
        let gl = HeadlessGl::new();
        let mut g = Graveyard::new(2);
        for h in 1..=40 {
            g.push(GpuObjectKind::Framebuffer, h);
        }
        assert!(g.capacity(GpuObjectKind::Framebuffer) >= 40);
        g.flush(&gl);
        assert_eq!(g.capacity(GpuObjectKind::Framebuffer), 2);
        assert_eq!(gl.delete_batches(GpuObjectKind::Framebuffer)[0].len(), 40);
    }
}
