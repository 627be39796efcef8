//! Animation playback state
//!
//! A small mixer stand-in: tracks which clip is active, how long it has
//! played and the crossfade in progress. Completion of one-shot clips is
//! polled once per tick through [`AnimationPlayer::finished`]; the renderer
//! gets the blend as a [`Pose`] on the actor's scene node.

use std::collections::{HashMap, HashSet};

use crate::assets::{AnimationKind, ClipInfo};

/// An in-progress blend from the previous clip
#[derive(Debug, Clone, Copy, PartialEq)]
struct Crossfade {
    from: AnimationKind,
    elapsed: f32,
    duration: f32,
}

/// Snapshot of playback for drawing a model
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pose {
    pub clip: AnimationKind,
    pub time: f32,
    /// Clip still blending out, if any
    pub blend_from: Option<AnimationKind>,
    /// Weight of `clip` in the blend
    pub weight: f32,
}

#[derive(Debug, Clone)]
pub struct AnimationPlayer {
    /// Asset key, for diagnostics
    owner: String,
    clips: HashMap<AnimationKind, ClipInfo>,
    /// Always a playable clip from `clips`, or `None`
    current: Option<AnimationKind>,
    play_time: f32,
    fade: Option<Crossfade>,
    warned: HashSet<AnimationKind>,
}

impl AnimationPlayer {
    pub fn new(owner: impl Into<String>, clips: HashMap<AnimationKind, ClipInfo>) -> Self {
        Self {
            owner: owner.into(),
            clips,
            current: None,
            play_time: 0.0,
            fade: None,
            warned: HashSet::new(),
        }
    }

    /// Whether `kind` exists and can be played
    pub fn has_clip(&self, kind: AnimationKind) -> bool {
        self.clips.get(&kind).is_some_and(ClipInfo::is_playable)
    }

    /// Switch to `kind`, blending over `fade` seconds
    ///
    /// Playing the active clip again is a no-op. A missing clip leaves the
    /// current animation untouched and returns false.
    pub fn play(&mut self, kind: AnimationKind, fade: f32) -> bool {
        if self.current == Some(kind) {
            return true;
        }
        if !self.has_clip(kind) {
            if self.warned.insert(kind) {
                log::warn!("'{}' has no playable '{}' animation", self.owner, kind.as_str());
            }
            return false;
        }

        self.fade = match self.current {
            Some(from) if fade > 0.0 => Some(Crossfade {
                from,
                elapsed: 0.0,
                duration: fade,
            }),
            _ => None,
        };
        self.current = Some(kind);
        self.play_time = 0.0;
        true
    }

    /// Stop everything (actor being disposed)
    pub fn stop(&mut self) {
        self.current = None;
        self.fade = None;
        self.play_time = 0.0;
    }

    pub fn advance(&mut self, dt: f32) {
        if self.current.is_none() {
            return;
        }
        self.play_time += dt;
        if let Some(fade) = &mut self.fade {
            fade.elapsed += dt;
            if fade.elapsed >= fade.duration {
                self.fade = None;
            }
        }
    }

    /// One-shot clip reached its end (looping clips never finish)
    pub fn finished(&self) -> bool {
        self.current
            .and_then(|kind| self.clips.get(&kind))
            .is_some_and(|clip| !clip.looping && self.play_time >= clip.duration)
    }

    pub fn current(&self) -> Option<AnimationKind> {
        self.current
    }

    pub fn play_time(&self) -> f32 {
        self.play_time
    }

    /// Current clip, time and blend; `None` when stopped
    pub fn pose(&self) -> Option<Pose> {
        let clip = self.current?;
        Some(Pose {
            clip,
            time: self.play_time,
            blend_from: self.fade.map(|f| f.from),
            weight: self
                .fade
                .map(|f| (f.elapsed / f.duration).clamp(0.0, 1.0))
                .unwrap_or(1.0),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn player() -> AnimationPlayer {
        let clips = HashMap::from([
            (AnimationKind::Idle, ClipInfo::looping(1.0)),
            (AnimationKind::Kick, ClipInfo::once(0.5)),
            (AnimationKind::Run, ClipInfo::once(0.0)),
        ]);
        AnimationPlayer::new("test", clips)
    }

    #[test]
    fn test_missing_clip_keeps_current() {
        let mut p = player();
        assert!(p.play(AnimationKind::Idle, 0.2));
        // Zero-length clips are not playable
        assert!(!p.play(AnimationKind::Run, 0.2));
        assert_eq!(p.current(), Some(AnimationKind::Idle));
        assert!(!p.has_clip(AnimationKind::Run));
    }

    #[test]
    fn test_one_shot_finishes_looping_never() {
        let mut p = player();
        p.play(AnimationKind::Idle, 0.0);
        p.advance(5.0);
        assert!(!p.finished());

        p.play(AnimationKind::Kick, 0.2);
        p.advance(0.3);
        assert!(!p.finished());
        p.advance(0.2);
        assert!(p.finished());
    }

    #[test]
    fn test_crossfade_runs_out() {
        let mut p = player();
        assert_eq!(p.pose(), None);
        p.play(AnimationKind::Idle, 0.2);
        // Nothing to blend from on the first clip
        assert_eq!(p.pose().unwrap().blend_from, None);

        p.play(AnimationKind::Kick, 0.2);
        assert_eq!(p.pose().unwrap().blend_from, Some(AnimationKind::Idle));
        p.advance(0.1);
        assert!((p.pose().unwrap().weight - 0.5).abs() < 1e-5);
        p.advance(0.1);
        let pose = p.pose().unwrap();
        assert_eq!(pose.blend_from, None);
        assert_eq!(pose.weight, 1.0);
        assert_eq!(pose.clip, AnimationKind::Kick);
    }

    #[test]
    fn test_replaying_current_does_not_restart() {
        let mut p = player();
        p.play(AnimationKind::Idle, 0.0);
        p.advance(0.4);
        p.play(AnimationKind::Idle, 0.2);
        assert!((p.play_time() - 0.4).abs() < 1e-6);
    }
}
