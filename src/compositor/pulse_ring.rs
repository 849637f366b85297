//! The dithered pulse ring scene.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::rc::Rc;

use glam::Vec2;

use super::topology::{EnabledStages, PipelineTopology, StageId};
use super::Compositor;
use crate::backend::{Destination, FrameError, RenderBackend};
use crate::color::Color;
use crate::effects::{
    slots, Blur, BlurParams, BorderBeam, BorderBeamParams, CombineAdd, Diffuse, DiffuseParams,
    EffectBody, ExpandingRing, ExpandingRingParams, GlyphDither, GlyphDitherParams, NoiseWarp,
    NoiseWarpParams, Preview,
};
use crate::pointer::PointerTracker;
use crate::program::BlendMode;
use crate::render_graph::{Extent, PassId, ShaderPass, ShaderPassDescriptor, TargetId};
use crate::sprite::{PendingSprite, SpriteSheet};
use crate::texture::{AssetId, TextureFilter, TextureRef};
use crate::uniforms::{UniformError, UniformSet};

/// Where the glyph dither stage gets its sprite strip.
#[derive(Clone, Debug, PartialEq)]
pub enum SpriteSource {
    /// A strip of nested squares drawn at mount.
    Generated { count: u32, glyph_size: u32 },
    /// An image file decoded on a worker thread.
    File(PathBuf),
}

impl Default for SpriteSource {
    fn default() -> Self {
        SpriteSource::Generated {
            count: 8,
            glyph_size: 32,
        }
    }
}

impl SpriteSource {
    fn load(&self) -> PendingSprite {
        match self {
            SpriteSource::Generated { count, glyph_size } => {
                PendingSprite::ready(Ok(SpriteSheet::generated(*count, *glyph_size)))
            }
            SpriteSource::File(path) => PendingSprite::load(path.clone()),
        }
    }
}

/// Configuration for a [`PulseRing`] mount.
#[derive(Clone, Debug, PartialEq)]
pub struct PulseRingConfig {
    pub stages: EnabledStages,
    /// Whether pointer-aware stages follow the pointer.
    pub track_pointer: bool,
    /// Resting pointer position.
    pub pointer_center: Vec2,
    pub border: BorderBeamParams,
    pub ring: ExpandingRingParams,
    pub noise_warp: NoiseWarpParams,
    pub glyph_dither: GlyphDitherParams,
    pub diffuse: DiffuseParams,
    pub blur: BlurParams,
    pub sprite: SpriteSource,
}

impl Default for PulseRingConfig {
    fn default() -> Self {
        Self {
            stages: EnabledStages::default(),
            track_pointer: false,
            pointer_center: Vec2::splat(0.5),
            border: BorderBeamParams::default(),
            ring: ExpandingRingParams::default(),
            noise_warp: NoiseWarpParams::default(),
            glyph_dither: GlyphDitherParams::default(),
            diffuse: DiffuseParams::default(),
            blur: BlurParams::default(),
            sprite: SpriteSource::default(),
        }
    }
}

impl PulseRingConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stages(mut self, stages: EnabledStages) -> Self {
        self.stages = stages;
        self
    }

    /// Enables or disables one optional stage.
    pub fn stage(mut self, stage: StageId, enabled: bool) -> Self {
        self.stages.set(stage, enabled);
        self
    }

    pub fn track_pointer(mut self, track: bool) -> Self {
        self.track_pointer = track;
        self
    }

    pub fn pointer_center(mut self, center: Vec2) -> Self {
        self.pointer_center = center;
        self
    }

    pub fn border(mut self, border: BorderBeamParams) -> Self {
        self.border = border;
        self
    }

    pub fn ring(mut self, ring: ExpandingRingParams) -> Self {
        self.ring = ring;
        self
    }

    pub fn noise_warp(mut self, noise_warp: NoiseWarpParams) -> Self {
        self.noise_warp = noise_warp;
        self
    }

    pub fn glyph_dither(mut self, glyph_dither: GlyphDitherParams) -> Self {
        self.glyph_dither = glyph_dither;
        self
    }

    pub fn diffuse(mut self, diffuse: DiffuseParams) -> Self {
        self.diffuse = diffuse;
        self
    }

    pub fn blur(mut self, blur: BlurParams) -> Self {
        self.blur = blur;
        self
    }

    pub fn sprite(mut self, sprite: SpriteSource) -> Self {
        self.sprite = sprite;
        self
    }
}

/// Border glow plus expanding ring, run through the optional effect chain.
///
/// ```text
/// Border ─┐
///         ├─ Combine ─ [Noise Warp] ─ [Glyph Dither] ─ [Diffuse] ─ [Blur] ─ Preview ─▶ Surface
/// Ring ───┘
/// ```
///
/// Every stage except the preview owns a pooled target. Toggling a stage
/// rewires the chain at the next frame. An optional stage whose program fails
/// to build is dropped from the wiring as if it were disabled.
pub struct PulseRing {
    compositor: Compositor,
    passes: BTreeMap<StageId, PassId>,
    targets: BTreeMap<StageId, TargetId>,
    stages: EnabledStages,
    topology: PipelineTopology,
    dirty: bool,
    sprite: PendingSprite,
    sprite_asset: Option<AssetId>,
}

impl PulseRing {
    /// Creates the targets and passes. Nothing is drawn until [`render`](Self::render).
    pub fn mount(backend: &mut dyn RenderBackend, config: &PulseRingConfig) -> Self {
        let pointer = PointerTracker::new(config.track_pointer, config.pointer_center);
        let mut compositor = Compositor::new(pointer);

        let mut targets = BTreeMap::new();
        for stage in StageId::ALL.into_iter().filter(|s| s.has_target()) {
            targets.insert(stage, compositor.create_target(backend, stage.label()));
        }

        let mut passes = BTreeMap::new();
        for stage in StageId::ALL {
            let desc = describe(stage, config, &targets);
            passes.insert(stage, compositor.add_pass(desc));
        }

        let topology = PipelineTopology::new(config.stages);
        let mut ring = Self {
            compositor,
            passes,
            targets,
            stages: config.stages,
            topology,
            dirty: true,
            sprite: config.sprite.load(),
            sprite_asset: None,
        };
        ring.apply_topology();
        log::info!("Mounted pulse ring: {}", ring.topology);
        ring
    }

    /// Renders one frame to the surface. Returns the number of draws issued.
    pub fn render(
        &mut self,
        backend: &mut dyn RenderBackend,
        delta: f32,
        viewport: Extent,
    ) -> Result<usize, FrameError> {
        self.poll_sprite(backend);
        if self.dirty {
            self.apply_topology();
        }
        let drawn = self.compositor.render(backend, delta, viewport);
        if self.live_stages() != *self.topology.enabled() {
            self.apply_topology();
        }
        drawn
    }

    pub fn stages(&self) -> EnabledStages {
        self.stages
    }

    /// Enables or disables an optional stage from the next frame on.
    /// Returns whether anything changed.
    pub fn set_stage_enabled(&mut self, stage: StageId, enabled: bool) -> bool {
        let changed = self.stages.set(stage, enabled);
        self.dirty |= changed;
        changed
    }

    /// Flips an optional stage. Returns its new state.
    pub fn toggle_stage(&mut self, stage: StageId) -> bool {
        let enabled = !self.stages.contains(stage);
        self.set_stage_enabled(stage, enabled);
        self.stages.contains(stage)
    }

    /// Wiring as of the last frame boundary. Broken optional stages are
    /// excluded even while their flag in [`stages`](Self::stages) is set.
    pub fn topology(&self) -> &PipelineTopology {
        &self.topology
    }

    pub fn pass(&self, stage: StageId) -> Option<&ShaderPass> {
        self.passes
            .get(&stage)
            .and_then(|&id| self.compositor.pass(id))
    }

    /// Uniform cells of a stage, for live parameter changes.
    pub fn uniforms(&self, stage: StageId) -> Option<&UniformSet> {
        self.pass(stage).map(ShaderPass::uniforms)
    }

    pub fn target(&self, stage: StageId) -> Option<TargetId> {
        self.targets.get(&stage).copied()
    }

    pub fn compositor(&self) -> &Compositor {
        &self.compositor
    }

    pub fn pointer_mut(&mut self) -> &mut PointerTracker {
        self.compositor.pointer_mut()
    }

    /// Applies every parameter, stage flag and pointer setting of `config`.
    /// The sprite source is only read at mount and by [`set_sprite`](Self::set_sprite).
    pub fn configure(&mut self, config: &PulseRingConfig) -> Result<(), UniformError> {
        let params: [(StageId, &dyn Fn(&UniformSet) -> Result<(), UniformError>); 6] = [
            (StageId::Border, &|set: &UniformSet| config.border.apply(set)),
            (StageId::Ring, &|set: &UniformSet| config.ring.apply(set)),
            (StageId::NoiseWarp, &|set: &UniformSet| config.noise_warp.apply(set)),
            (StageId::GlyphDither, &|set: &UniformSet| config.glyph_dither.apply(set)),
            (StageId::Diffuse, &|set: &UniformSet| config.diffuse.apply(set)),
            (StageId::Blur, &|set: &UniformSet| config.blur.apply(set)),
        ];
        for (stage, apply) in params {
            if let Some(set) = self.uniforms(stage) {
                apply(set)?;
            }
        }
        for stage in StageId::OPTIONAL {
            self.set_stage_enabled(stage, config.stages.contains(stage));
        }
        let pointer = self.compositor.pointer_mut();
        pointer.set_center(config.pointer_center);
        pointer.set_enabled(config.track_pointer);
        Ok(())
    }

    /// Replaces the glyph sprite. The stage samples the fallback until the new
    /// strip has been uploaded.
    pub fn set_sprite(&mut self, source: &SpriteSource) {
        self.sprite = source.load();
    }

    fn poll_sprite(&mut self, backend: &mut dyn RenderBackend) {
        let Some(result) = self.sprite.poll() else {
            return;
        };
        let sheet = match result {
            Ok(sheet) => sheet,
            Err(e) => {
                log::warn!("Glyph sprite unavailable, sampling the fallback: {}", e);
                return;
            }
        };

        let asset = backend.upload_texture("Glyph Sprite", sheet.image(), TextureFilter::Nearest);
        if let Some(old) = self.sprite_asset.replace(asset) {
            backend.release_texture(old);
        }
        if let Some(set) = self.uniforms(StageId::GlyphDither) {
            if let Err(e) = set.set(GlyphDither::SPRITE, TextureRef::Asset(asset)) {
                log::error!("Glyph sprite could not be bound: {}", e);
            }
        }
        log::debug!(
            "Uploaded {} glyph sprite ({}x{})",
            sheet.glyph_count(),
            sheet.width(),
            sheet.height()
        );
    }

    /// The requested stages minus optional stages that failed to compile.
    fn live_stages(&self) -> EnabledStages {
        let mut live = self.stages;
        for stage in StageId::OPTIONAL {
            if self.pass(stage).is_some_and(ShaderPass::is_broken) {
                live.set(stage, false);
            }
        }
        live
    }

    fn apply_topology(&mut self) {
        let live = self.live_stages();
        for stage in StageId::OPTIONAL {
            if self.stages.contains(stage) && !live.contains(stage) {
                log::warn!("Bypassing {}: its program failed to build", stage);
            }
        }
        self.topology = PipelineTopology::new(live);
        for stage in StageId::ALL {
            let enabled = self.topology.is_enabled(stage);
            let input = self
                .topology
                .input(stage)
                .and_then(|s| self.targets.get(&s))
                .map(|&id| TextureRef::Target(id));
            let Some(pass) = self
                .passes
                .get(&stage)
                .and_then(|&id| self.compositor.pass_mut(id))
            else {
                continue;
            };
            pass.set_enabled(enabled);
            if stage.is_optional() || stage == StageId::Preview {
                pass.set_input(input);
            }
        }
        self.dirty = false;
        log::debug!("Pipeline: {}", self.topology);
    }

    /// Releases the sprite texture and every target.
    pub fn unmount(self, backend: &mut dyn RenderBackend) {
        if let Some(asset) = self.sprite_asset {
            backend.release_texture(asset);
        }
        self.compositor.unmount(backend);
    }
}

fn describe(
    stage: StageId,
    config: &PulseRingConfig,
    targets: &BTreeMap<StageId, TargetId>,
) -> ShaderPassDescriptor {
    let (effect, uniforms): (Rc<dyn EffectBody>, UniformSet) = match stage {
        StageId::Border => (Rc::new(BorderBeam), config.border.uniforms()),
        StageId::Ring => (Rc::new(ExpandingRing), config.ring.uniforms()),
        StageId::Combine => {
            let input = |stage: StageId| {
                TextureRef::or_fallback(targets.get(&stage).map(|&id| TextureRef::Target(id)))
            };
            (
                Rc::new(CombineAdd),
                UniformSet::new()
                    .with(CombineAdd::INPUT_A, input(StageId::Border))
                    .with(CombineAdd::INPUT_B, input(StageId::Ring)),
            )
        }
        StageId::NoiseWarp => (Rc::new(NoiseWarp), config.noise_warp.uniforms()),
        StageId::GlyphDither => (Rc::new(GlyphDither), config.glyph_dither.uniforms()),
        StageId::Diffuse => (Rc::new(Diffuse), config.diffuse.uniforms()),
        StageId::Blur => (Rc::new(Blur), config.blur.uniforms()),
        StageId::Preview => (Rc::new(Preview), UniformSet::new()),
    };

    let mut desc =
        ShaderPassDescriptor::new(stage.label(), effect, uniforms).priority(stage.priority());
    if desc.uniforms.contains(slots::TIME) {
        desc = desc.time(slots::TIME);
    }
    if desc.uniforms.contains(slots::RESOLUTION) {
        desc = desc.resolution(slots::RESOLUTION);
    }
    if desc.uniforms.contains(slots::POINTER) {
        desc = desc.pointer(slots::POINTER);
    }
    if stage.is_optional() || stage == StageId::Preview {
        desc = desc.input(slots::INPUT);
    }

    match targets.get(&stage) {
        Some(&target) => {
            desc = desc.destination(Destination::Target(target));
            if matches!(stage, StageId::Border | StageId::Ring) {
                desc = desc.clear(Color::BLACK);
            }
        }
        None => {
            desc = desc
                .destination(Destination::Surface)
                .clear(Color::BLACK)
                .blend(BlendMode::Normal);
        }
    }
    desc
}
