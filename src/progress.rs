use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    LayingOut,
    Rendering,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProgressEvent {
    pub phase: Phase,
    /// Atoms placed or pages rendered so far.
    pub completed: usize,
    pub total: usize,
}

impl ProgressEvent {
    pub fn new(phase: Phase, completed: usize, total: usize) -> Self {
        Self {
            phase,
            completed,
            total,
        }
    }

    pub fn fraction(&self) -> f32 {
        if self.total == 0 {
            return 1.0;
        }
        (self.completed as f32 / self.total as f32).clamp(0.0, 1.0)
    }
}

pub type ProgressCallback = Arc<dyn Fn(&ProgressEvent) + Send + Sync>;

pub(crate) fn report(callback: Option<&ProgressCallback>, event: ProgressEvent) {
    if let Some(callback) = callback {
        callback(&event);
    }
}
