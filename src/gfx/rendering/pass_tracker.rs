//! Ordering of the GPU passes
//!
//! Every pass consumes the output of the pass before it. A [`PassTracker`]
//! walks one of the fixed sequences and rejects a pass that is requested out
//! of turn, so a broken ordering fails loudly instead of rendering from stale
//! textures.

use std::fmt;

use crate::error::PassOrderError;

/// A named pipeline stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    Shadow,
    Data,
    Voxelize,
    MipMap,
    Draw,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Shadow => "shadow",
            Stage::Data => "data",
            Stage::Voxelize => "voxelize",
            Stage::MipMap => "mipmap",
            Stage::Draw => "draw",
        };
        f.write_str(name)
    }
}

/// One-time pass sequence run for each scene before the first frame.
pub const PREPASS: &[Stage] = &[Stage::Shadow, Stage::Data, Stage::Voxelize, Stage::MipMap];

/// Per-frame sequence. The voxel volume is static after the prepass.
pub const FRAME: &[Stage] = &[Stage::Shadow, Stage::Data, Stage::Draw];

#[derive(Debug, Clone)]
pub struct PassTracker {
    sequence: &'static [Stage],
    next: usize,
}

impl PassTracker {
    pub fn new(sequence: &'static [Stage]) -> Self {
        Self { sequence, next: 0 }
    }

    pub fn prepass() -> Self {
        Self::new(PREPASS)
    }

    pub fn frame() -> Self {
        Self::new(FRAME)
    }

    /// Records `stage` as run. Fails unless it is the next stage of the
    /// sequence.
    pub fn advance(&mut self, stage: Stage) -> Result<(), PassOrderError> {
        match self.sequence.get(self.next) {
            Some(expected) if *expected == stage => {
                self.next += 1;
                Ok(())
            }
            _ => Err(PassOrderError {
                requested: stage,
                previous: self.previous(),
            }),
        }
    }

    /// Last stage that ran, if any.
    pub fn previous(&self) -> Option<Stage> {
        self.next.checked_sub(1).map(|i| self.sequence[i])
    }

    pub fn is_complete(&self) -> bool {
        self.next == self.sequence.len()
    }

    pub fn reset(&mut self) {
        self.next = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prepass_in_order() {
        let mut tracker = PassTracker::prepass();
        for stage in PREPASS {
            tracker.advance(*stage).unwrap();
        }
        assert!(tracker.is_complete());
    }

    #[test]
    fn test_out_of_order_pass_is_rejected() {
        let mut tracker = PassTracker::frame();
        tracker.advance(Stage::Shadow).unwrap();
        let err = tracker.advance(Stage::Draw).unwrap_err();
        assert_eq!(
            err,
            PassOrderError {
                requested: Stage::Draw,
                previous: Some(Stage::Shadow),
            }
        );
        // A rejected pass does not move the tracker.
        tracker.advance(Stage::Data).unwrap();
    }

    #[test]
    fn test_frame_never_voxelizes() {
        let mut tracker = PassTracker::frame();
        tracker.advance(Stage::Shadow).unwrap();
        tracker.advance(Stage::Data).unwrap();
        assert!(tracker.advance(Stage::Voxelize).is_err());
    }

    #[test]
    fn test_pass_after_completion_fails() {
        let mut tracker = PassTracker::frame();
        for stage in FRAME {
            tracker.advance(*stage).unwrap();
        }
        assert!(tracker.advance(Stage::Shadow).is_err());
        tracker.reset();
        assert!(tracker.advance(Stage::Shadow).is_ok());
        assert_eq!(tracker.previous(), Some(Stage::Shadow));
    }
}
