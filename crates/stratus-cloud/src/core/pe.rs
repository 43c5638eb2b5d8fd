//! Processing elements (CPU cores) of physical hosts.

use serde::Serialize;

/// Status of a processing element.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub enum PeStatus {
    Free,
    Busy,
}

/// A simulated CPU core rated in millions of instructions per second (MIPS).
#[derive(Clone, Debug, Serialize)]
pub struct ProcessingElement {
    pub id: u32,
    mips: f64,
    status: PeStatus,
}

impl ProcessingElement {
    pub fn new(id: u32, mips: f64) -> Self {
        Self {
            id,
            mips,
            status: PeStatus::Free,
        }
    }

    /// Returns the rated capacity of this core in MIPS.
    pub fn mips(&self) -> f64 {
        self.mips
    }

    pub fn status(&self) -> PeStatus {
        self.status
    }

    pub fn set_status(&mut self, status: PeStatus) {
        self.status = status;
    }

    pub fn is_free(&self) -> bool {
        self.status == PeStatus::Free
    }
}
