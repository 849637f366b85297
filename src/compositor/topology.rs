//! Stage wiring for the pulse ring pipeline.
//!
//! Wiring is a pure function of which optional stages are enabled: every
//! optional stage reads the nearest enabled stage before it in
//! [`StageId::OPTIONAL`], or the combined base when none is enabled, and the
//! preview reads the last enabled stage.

use std::fmt;

/// A stage of the pulse ring pipeline.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum StageId {
    Border,
    Ring,
    Combine,
    NoiseWarp,
    GlyphDither,
    Diffuse,
    Blur,
    Preview,
}

impl StageId {
    /// Every stage in execution order.
    pub const ALL: [StageId; 8] = [
        StageId::Border,
        StageId::Ring,
        StageId::Combine,
        StageId::NoiseWarp,
        StageId::GlyphDither,
        StageId::Diffuse,
        StageId::Blur,
        StageId::Preview,
    ];

    /// Toggleable stages, in chain order.
    pub const OPTIONAL: [StageId; 4] = [
        StageId::NoiseWarp,
        StageId::GlyphDither,
        StageId::Diffuse,
        StageId::Blur,
    ];

    pub fn is_optional(self) -> bool {
        Self::OPTIONAL.contains(&self)
    }

    /// Whether the stage renders into a target of its own.
    pub fn has_target(self) -> bool {
        self != StageId::Preview
    }

    pub fn priority(self) -> i32 {
        match self {
            StageId::Border | StageId::Ring => 0,
            StageId::Combine => 10,
            StageId::NoiseWarp => 20,
            StageId::GlyphDither => 30,
            StageId::Diffuse => 40,
            StageId::Blur => 50,
            StageId::Preview => 100,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            StageId::Border => "Border Beam",
            StageId::Ring => "Expanding Ring",
            StageId::Combine => "Combine",
            StageId::NoiseWarp => "Noise Warp",
            StageId::GlyphDither => "Glyph Dither",
            StageId::Diffuse => "Diffuse",
            StageId::Blur => "Blur",
            StageId::Preview => "Preview",
        }
    }
}

impl fmt::Display for StageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Enable flags for the optional stages.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct EnabledStages {
    pub noise_warp: bool,
    pub glyph_dither: bool,
    pub diffuse: bool,
    pub blur: bool,
}

impl Default for EnabledStages {
    /// Glyph dither only.
    fn default() -> Self {
        Self {
            noise_warp: false,
            glyph_dither: true,
            diffuse: false,
            blur: false,
        }
    }
}

impl EnabledStages {
    /// No optional stage enabled.
    pub const NONE: EnabledStages = EnabledStages {
        noise_warp: false,
        glyph_dither: false,
        diffuse: false,
        blur: false,
    };

    /// Whether `stage` runs. Mandatory stages always do.
    pub fn contains(&self, stage: StageId) -> bool {
        match stage {
            StageId::NoiseWarp => self.noise_warp,
            StageId::GlyphDither => self.glyph_dither,
            StageId::Diffuse => self.diffuse,
            StageId::Blur => self.blur,
            _ => true,
        }
    }

    /// Sets an optional stage's flag. Returns whether the flag changed;
    /// mandatory stages cannot be changed.
    pub fn set(&mut self, stage: StageId, enabled: bool) -> bool {
        let flag = match stage {
            StageId::NoiseWarp => &mut self.noise_warp,
            StageId::GlyphDither => &mut self.glyph_dither,
            StageId::Diffuse => &mut self.diffuse,
            StageId::Blur => &mut self.blur,
            _ => return false,
        };
        let changed = *flag != enabled;
        *flag = enabled;
        changed
    }
}

/// The stage whose output `stage` samples, or `None` when it reads no chained
/// input (generators, the combine stage and disabled stages).
pub fn resolve_input(stage: StageId, enabled: &EnabledStages) -> Option<StageId> {
    if !enabled.contains(stage) {
        return None;
    }
    let optional = StageId::OPTIONAL;
    let upstream = match stage {
        StageId::Border | StageId::Ring | StageId::Combine => return None,
        StageId::Preview => &optional[..],
        _ => {
            let at = optional.iter().position(|&s| s == stage)?;
            &optional[..at]
        }
    };
    upstream
        .iter()
        .rev()
        .copied()
        .find(|&s| enabled.contains(s))
        .or(Some(StageId::Combine))
}

/// Enabled stages in execution order with their resolved inputs.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PipelineTopology {
    enabled: EnabledStages,
    stages: Vec<(StageId, Option<StageId>)>,
}

impl PipelineTopology {
    pub fn new(enabled: EnabledStages) -> Self {
        let stages = StageId::ALL
            .iter()
            .copied()
            .filter(|&s| enabled.contains(s))
            .map(|s| (s, resolve_input(s, &enabled)))
            .collect();
        Self { enabled, stages }
    }

    pub fn enabled(&self) -> &EnabledStages {
        &self.enabled
    }

    pub fn is_enabled(&self, stage: StageId) -> bool {
        self.enabled.contains(stage)
    }

    /// Resolved input of an enabled stage.
    pub fn input(&self, stage: StageId) -> Option<StageId> {
        self.stages
            .iter()
            .find(|(s, _)| *s == stage)
            .and_then(|(_, input)| *input)
    }

    /// Enabled stages with their inputs, in execution order.
    pub fn stages(&self) -> &[(StageId, Option<StageId>)] {
        &self.stages
    }

    /// The stage the preview paints to the surface.
    pub fn output(&self) -> StageId {
        self.input(StageId::Preview).unwrap_or(StageId::Combine)
    }
}

impl fmt::Display for PipelineTopology {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut chain = vec![StageId::Combine];
        chain.extend(
            StageId::OPTIONAL
                .iter()
                .copied()
                .filter(|&s| self.enabled.contains(s)),
        );
        chain.push(StageId::Preview);
        for (i, stage) in chain.iter().enumerate() {
            if i > 0 {
                f.write_str(" -> ")?;
            }
            write!(f, "{}", stage)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stages(noise_warp: bool, glyph_dither: bool, diffuse: bool, blur: bool) -> EnabledStages {
        EnabledStages {
            noise_warp,
            glyph_dither,
            diffuse,
            blur,
        }
    }

    #[test]
    fn blur_reads_base_when_alone() {
        let enabled = stages(false, false, false, true);
        assert_eq!(resolve_input(StageId::Blur, &enabled), Some(StageId::Combine));
        assert_eq!(resolve_input(StageId::Preview, &enabled), Some(StageId::Blur));
    }

    #[test]
    fn stages_skip_disabled_predecessors() {
        let enabled = stages(true, false, true, true);
        assert_eq!(resolve_input(StageId::NoiseWarp, &enabled), Some(StageId::Combine));
        assert_eq!(resolve_input(StageId::Diffuse, &enabled), Some(StageId::NoiseWarp));
        assert_eq!(resolve_input(StageId::Blur, &enabled), Some(StageId::Diffuse));
        assert_eq!(resolve_input(StageId::GlyphDither, &enabled), None);
    }

    #[test]
    fn no_consumer_points_at_a_disabled_stage() {
        for bits in 0..16u8 {
            let enabled = stages(bits & 1 != 0, bits & 2 != 0, bits & 4 != 0, bits & 8 != 0);
            let topology = PipelineTopology::new(enabled);
            for &(stage, input) in topology.stages() {
                assert!(enabled.contains(stage));
                if let Some(input) = input {
                    assert!(enabled.contains(input), "{stage} reads disabled {input}");
                    assert!(input.priority() < stage.priority());
                }
            }
        }
    }

    #[test]
    fn generators_read_nothing() {
        let enabled = EnabledStages::default();
        for stage in [StageId::Border, StageId::Ring, StageId::Combine] {
            assert_eq!(resolve_input(stage, &enabled), None);
        }
    }

    #[test]
    fn toggling_reproduces_wiring() {
        let mut enabled = EnabledStages::default();
        let before = PipelineTopology::new(enabled);
        assert!(enabled.set(StageId::Diffuse, true));
        assert_ne!(PipelineTopology::new(enabled), before);
        assert!(enabled.set(StageId::Diffuse, false));
        assert_eq!(PipelineTopology::new(enabled), before);
    }

    #[test]
    fn mandatory_stages_cannot_be_disabled() {
        let mut enabled = EnabledStages::NONE;
        assert!(!enabled.set(StageId::Combine, false));
        assert!(enabled.contains(StageId::Combine));
        assert_eq!(PipelineTopology::new(enabled).output(), StageId::Combine);
    }

    #[test]
    fn display_lists_the_chain() {
        let topology = PipelineTopology::new(stages(true, true, false, false));
        assert_eq!(
            topology.to_string(),
            "Combine -> Noise Warp -> Glyph Dither -> Preview"
        );
    }
}
