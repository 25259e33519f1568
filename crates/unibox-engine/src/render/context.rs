use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use crate::device::{GlApi, GlHandle, GpuObjectKind};

use super::Graveyard;

/// Shared handle to a live device and its graveyard.
///
/// Every GL-backed object (shader programs, textures) holds a clone, so it
/// can issue calls and retire its device objects without reaching for
/// process-wide state. Cloning is cheap.
#[derive(Clone)]
pub struct GlContext {
    gl: Rc<dyn GlApi>,
    graveyard: Rc<RefCell<Graveyard>>,
}

impl GlContext {
    pub fn new(gl: Rc<dyn GlApi>) -> Self {
        Self::with_graveyard(gl, Graveyard::default())
    }

    pub fn with_graveyard(gl: Rc<dyn GlApi>, graveyard: Graveyard) -> Self {
        Self {
            gl,
            graveyard: Rc::new(RefCell::new(graveyard)),
        }
    }

    pub fn gl(&self) -> &dyn GlApi {
        &*self.gl
    }

    /// Queues a device object for the next flush.
    pub fn defer_delete(&self, kind: GpuObjectKind, handle: GlHandle) {
        self.graveyard.borrow_mut().push(kind, handle);
    }

    pub fn flush_graveyard(&self) {
        self.graveyard.borrow_mut().flush(&*self.gl);
    }

    pub fn pending(&self, kind: GpuObjectKind) -> usize {
        self.graveyard.borrow().pending(kind)
    }
}

impl fmt::Debug for GlContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GlContext")
            .field("backend", &self.gl.backend_name())
            .field("graveyard", &self.graveyard.borrow())
            .finish()
    }
}
