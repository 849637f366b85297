//! CPU backend that runs each effect's reference `shade` per pixel.

use std::collections::HashMap;
use std::rc::Rc;

use glam::{Vec2, Vec4};
use image::RgbaImage;

use super::{Destination, DrawCall, FrameError, RenderBackend};
use crate::effects::{EffectBody, Fragment, TextureSampler};
use crate::program::{validate_wgsl, BlendMode, ProgramDesc, ProgramId, ShaderError};
use crate::render_graph::{Extent, TargetId};
use crate::texture::{AssetId, TextureFilter, TextureRef, FALLBACK_RGBA};
use crate::uniforms::UniformSet;

/// A floating point RGBA image, row 0 at the top.
#[derive(Clone, Debug, PartialEq)]
pub struct Image {
    extent: Extent,
    pixels: Vec<Vec4>,
}

impl Image {
    fn new(extent: Extent, fill: Vec4) -> Self {
        Self {
            extent,
            pixels: vec![fill; extent.area()],
        }
    }

    fn from_rgba(image: &RgbaImage) -> Self {
        let pixels = image
            .pixels()
            .map(|p| Vec4::from_array(p.0.map(|c| c as f32 / 255.0)))
            .collect();
        Self {
            extent: Extent::new(image.width(), image.height()),
            pixels,
        }
    }

    pub fn extent(&self) -> Extent {
        self.extent
    }

    pub fn pixels(&self) -> &[Vec4] {
        &self.pixels
    }

    /// Pixel at column `x`, row `y` (top-left origin).
    pub fn pixel(&self, x: u32, y: u32) -> Option<Vec4> {
        if x >= self.extent.width || y >= self.extent.height {
            return None;
        }
        self.pixels
            .get((y * self.extent.width + x) as usize)
            .copied()
    }

    fn texel(&self, x: i64, y: i64) -> Vec4 {
        let x = x.clamp(0, self.extent.width as i64 - 1) as usize;
        let y = y.clamp(0, self.extent.height as i64 - 1) as usize;
        self.pixels[y * self.extent.width as usize + x]
    }

    /// Samples at a bottom-left-origin `uv`, clamped to the edge.
    fn sample(&self, uv: Vec2, filter: TextureFilter) -> Vec4 {
        if self.pixels.is_empty() {
            return Vec4::ZERO;
        }
        let size = self.extent.as_vec2();
        let p = Vec2::new(uv.x, 1.0 - uv.y) * size;
        match filter {
            TextureFilter::Nearest => {
                let p = p.floor();
                self.texel(p.x as i64, p.y as i64)
            }
            TextureFilter::Linear => {
                let p = p - 0.5;
                let base = p.floor();
                let t = p - base;
                let (x, y) = (base.x as i64, base.y as i64);
                let top = self.texel(x, y).lerp(self.texel(x + 1, y), t.x);
                let bottom = self.texel(x, y + 1).lerp(self.texel(x + 1, y + 1), t.x);
                top.lerp(bottom, t.y)
            }
        }
    }
}

struct Program {
    effect: Rc<dyn EffectBody>,
    blend: BlendMode,
}

struct Asset {
    image: Image,
    filter: TextureFilter,
}

/// What a single draw touched, recorded for inspection.
#[derive(Clone, Debug, PartialEq)]
pub struct DrawRecord {
    pub label: String,
    pub destination: Destination,
    pub inputs: Vec<(String, TextureRef)>,
}

/// Renders on the CPU by evaluating [`EffectBody::shade`] for every pixel.
///
/// Targets and the surface hold unclamped floats clamped to `[0, 1]` on
/// write, which matches an 8-bit normalized color target. Targets sample
/// with linear filtering; assets use the filter they were uploaded with.
pub struct SoftwareBackend {
    surface: Image,
    targets: HashMap<TargetId, Image>,
    assets: HashMap<AssetId, Asset>,
    programs: HashMap<ProgramId, Program>,
    fallback: Image,
    next_target: u32,
    next_asset: u32,
    next_program: u32,
    in_frame: bool,
    frames: u64,
    draw_log: Vec<DrawRecord>,
}

impl SoftwareBackend {
    pub fn new(surface: Extent) -> Self {
        let fallback = Image {
            extent: Extent::UNIT,
            pixels: vec![Vec4::from_array(FALLBACK_RGBA.map(|c| c as f32 / 255.0))],
        };
        Self {
            surface: Image::new(surface, Vec4::ZERO),
            targets: HashMap::new(),
            assets: HashMap::new(),
            programs: HashMap::new(),
            fallback,
            next_target: 0,
            next_asset: 0,
            next_program: 0,
            in_frame: false,
            frames: 0,
            draw_log: Vec::new(),
        }
    }

    /// The visible surface as of the last draw.
    pub fn surface(&self) -> &Image {
        &self.surface
    }

    /// Contents of a live target.
    pub fn target_pixels(&self, id: TargetId) -> Option<&Image> {
        self.targets.get(&id)
    }

    pub fn live_targets(&self) -> usize {
        self.targets.len()
    }

    pub fn live_textures(&self) -> usize {
        self.assets.len()
    }

    /// Number of frames submitted through [`end_frame`](RenderBackend::end_frame).
    pub fn frames_presented(&self) -> u64 {
        self.frames
    }

    /// Draws recorded since the last [`begin_frame`](RenderBackend::begin_frame).
    pub fn draw_log(&self) -> &[DrawRecord] {
        &self.draw_log
    }

    fn shade(&self, program: &Program, uniforms: &UniformSet, extent: Extent) -> Vec<Vec4> {
        let sampler = Sampler { backend: self };
        let size = extent.as_vec2();
        let mut out = Vec::with_capacity(extent.area());
        for y in 0..extent.height {
            for x in 0..extent.width {
                let coord = Vec2::new(x as f32 + 0.5, y as f32 + 0.5);
                let uv = Vec2::new(coord.x / size.x, 1.0 - coord.y / size.y);
                let frag = Fragment::new(uv, coord, uniforms, &sampler);
                out.push(program.effect.shade(&frag));
            }
        }
        out
    }
}

struct Sampler<'a> {
    backend: &'a SoftwareBackend,
}

impl Sampler<'_> {
    fn resolve(&self, texture: TextureRef) -> (&Image, TextureFilter) {
        let fallback = (&self.backend.fallback, TextureFilter::Nearest);
        match texture {
            TextureRef::Fallback => fallback,
            TextureRef::Target(id) => self
                .backend
                .targets
                .get(&id)
                .map(|image| (image, TextureFilter::Linear))
                .unwrap_or(fallback),
            TextureRef::Asset(id) => self
                .backend
                .assets
                .get(&id)
                .map(|asset| (&asset.image, asset.filter))
                .unwrap_or(fallback),
        }
    }
}

impl TextureSampler for Sampler<'_> {
    fn sample(&self, texture: TextureRef, uv: Vec2) -> Vec4 {
        let (image, filter) = self.resolve(texture);
        image.sample(uv, filter)
    }

    fn size(&self, texture: TextureRef) -> Extent {
        self.resolve(texture).0.extent
    }
}

fn blend(mode: BlendMode, src: Vec4, dst: Vec4) -> Vec4 {
    let out = match mode {
        BlendMode::Replace => src,
        BlendMode::Normal => {
            let rgb = src.truncate() * src.w + dst.truncate() * (1.0 - src.w);
            rgb.extend(src.w + dst.w * (1.0 - src.w))
        }
    };
    out.clamp(Vec4::ZERO, Vec4::ONE)
}

impl RenderBackend for SoftwareBackend {
    fn surface_extent(&self) -> Extent {
        self.surface.extent
    }

    fn resize_surface(&mut self, extent: Extent) {
        if !extent.is_empty() && extent != self.surface.extent {
            self.surface = Image::new(extent, Vec4::ZERO);
        }
    }

    fn create_target(&mut self, label: &str, extent: Extent) -> TargetId {
        let id = TargetId(self.next_target);
        self.next_target += 1;
        log::trace!("Created target '{}' as {:?}", label, id);
        self.targets.insert(id, Image::new(extent, Vec4::ZERO));
        id
    }

    fn resize_target(&mut self, id: TargetId, extent: Extent) {
        if let Some(image) = self.targets.get_mut(&id) {
            *image = Image::new(extent, Vec4::ZERO);
        }
    }

    fn release_target(&mut self, id: TargetId) {
        self.targets.remove(&id);
    }

    fn target_extent(&self, id: TargetId) -> Option<Extent> {
        self.targets.get(&id).map(Image::extent)
    }

    fn upload_texture(&mut self, label: &str, image: &RgbaImage, filter: TextureFilter) -> AssetId {
        let id = AssetId(self.next_asset);
        self.next_asset += 1;
        log::trace!(
            "Uploaded texture '{}' ({}x{})",
            label,
            image.width(),
            image.height()
        );
        self.assets.insert(
            id,
            Asset {
                image: Image::from_rgba(image),
                filter,
            },
        );
        id
    }

    fn release_texture(&mut self, id: AssetId) {
        self.assets.remove(&id);
    }

    fn compile(&mut self, desc: &ProgramDesc) -> Result<ProgramId, ShaderError> {
        validate_wgsl(&desc.label, &desc.source())?;
        let id = ProgramId(self.next_program);
        self.next_program += 1;
        self.programs.insert(
            id,
            Program {
                effect: Rc::clone(&desc.effect),
                blend: desc.blend,
            },
        );
        Ok(id)
    }

    fn begin_frame(&mut self) -> Result<(), FrameError> {
        self.in_frame = true;
        self.draw_log.clear();
        Ok(())
    }

    fn draw(&mut self, call: &DrawCall<'_>) -> Result<(), FrameError> {
        if !self.in_frame {
            return Err(FrameError::NoActiveFrame);
        }
        let program = self
            .programs
            .get(&call.program)
            .ok_or(FrameError::UnknownProgram(call.program))?;
        let extent = match call.destination {
            Destination::Surface => self.surface.extent,
            Destination::Target(id) => self
                .targets
                .get(&id)
                .map(Image::extent)
                .ok_or(FrameError::UnknownTarget(id))?,
        };

        let shaded = self.shade(program, call.uniforms, extent);
        let mode = program.blend;

        let dst = match call.destination {
            Destination::Surface => &mut self.surface,
            Destination::Target(id) => self
                .targets
                .get_mut(&id)
                .ok_or(FrameError::UnknownTarget(id))?,
        };
        if let Some(clear) = call.clear {
            dst.pixels.fill(clear.to_vec4());
        }
        for (dst, src) in dst.pixels.iter_mut().zip(shaded) {
            *dst = blend(mode, src, *dst);
        }

        self.draw_log.push(DrawRecord {
            label: call.label.to_string(),
            destination: call.destination,
            inputs: call
                .uniforms
                .textures()
                .map(|(name, t)| (name.to_string(), t))
                .collect(),
        });
        Ok(())
    }

    fn end_frame(&mut self) {
        if self.in_frame {
            self.in_frame = false;
            self.frames += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::color::Color;
    use crate::effects::{Preview, Solid};
    use crate::uniforms::UniformLayout;

    fn compile(
        backend: &mut SoftwareBackend,
        effect: Rc<dyn EffectBody>,
        set: &UniformSet,
        blend: BlendMode,
    ) -> ProgramId {
        backend
            .compile(&ProgramDesc {
                label: effect.name().to_string(),
                effect,
                layout: UniformLayout::new(set),
                blend,
            })
            .unwrap()
    }

    #[test]
    fn draws_require_an_active_frame() {
        let mut backend = SoftwareBackend::new(Extent::new(4, 4));
        let set = UniformSet::new().with("color", Color::WHITE);
        let program = compile(&mut backend, Rc::new(Solid), &set, BlendMode::Replace);
        let call = DrawCall {
            label: "solid",
            program,
            uniforms: &set,
            destination: Destination::Surface,
            clear: None,
        };
        assert_eq!(backend.draw(&call), Err(FrameError::NoActiveFrame));

        backend.begin_frame().unwrap();
        backend.draw(&call).unwrap();
        backend.end_frame();
        assert_eq!(backend.surface().pixel(0, 0), Some(Vec4::ONE));
        assert_eq!(backend.frames_presented(), 1);
    }

    #[test]
    fn normal_blend_composites_over_clear() {
        let mut backend = SoftwareBackend::new(Extent::new(2, 2));
        let set = UniformSet::new().with("color", Color::rgba(1.0, 0.0, 0.0, 0.5));
        let program = compile(&mut backend, Rc::new(Solid), &set, BlendMode::Normal);

        backend.begin_frame().unwrap();
        backend
            .draw(&DrawCall {
                label: "solid",
                program,
                uniforms: &set,
                destination: Destination::Surface,
                clear: Some(Color::BLACK),
            })
            .unwrap();
        backend.end_frame();

        let px = backend.surface().pixel(1, 1).unwrap();
        assert!((px - Vec4::new(0.5, 0.0, 0.0, 1.0)).abs().max_element() < 1e-6);
    }

    #[test]
    fn targets_sample_with_top_row_at_high_v() {
        let mut backend = SoftwareBackend::new(Extent::new(1, 2));
        let target = backend.create_target("split", Extent::new(1, 2));
        backend.targets.get_mut(&target).unwrap().pixels =
            vec![Vec4::new(1.0, 0.0, 0.0, 1.0), Vec4::new(0.0, 0.0, 1.0, 1.0)];

        let set = UniformSet::new().with("input", TextureRef::Target(target));
        let program = compile(&mut backend, Rc::new(Preview), &set, BlendMode::Replace);
        backend.begin_frame().unwrap();
        backend
            .draw(&DrawCall {
                label: "copy",
                program,
                uniforms: &set,
                destination: Destination::Surface,
                clear: None,
            })
            .unwrap();

        assert_eq!(backend.surface().pixel(0, 0), Some(Vec4::new(1.0, 0.0, 0.0, 1.0)));
        assert_eq!(backend.surface().pixel(0, 1), Some(Vec4::new(0.0, 0.0, 1.0, 1.0)));
        assert_eq!(
            backend.draw_log()[0].inputs,
            vec![("input".to_string(), TextureRef::Target(target))]
        );
    }

    #[test]
    fn released_targets_sample_as_fallback() {
        let mut backend = SoftwareBackend::new(Extent::new(1, 1));
        let target = backend.create_target("gone", Extent::UNIT);
        backend.release_target(target);

        let sampler = Sampler { backend: &backend };
        assert_eq!(
            sampler.sample(TextureRef::Target(target), Vec2::splat(0.5)),
            Vec4::new(0.0, 0.0, 0.0, 1.0)
        );
    }

    #[test]
    fn unknown_destination_is_an_error() {
        let mut backend = SoftwareBackend::new(Extent::new(1, 1));
        let set = UniformSet::new().with("color", Color::WHITE);
        let program = compile(&mut backend, Rc::new(Solid), &set, BlendMode::Replace);
        let target = backend.create_target("gone", Extent::UNIT);
        backend.release_target(target);

        backend.begin_frame().unwrap();
        let err = backend.draw(&DrawCall {
            label: "solid",
            program,
            uniforms: &set,
            destination: Destination::Target(target),
            clear: None,
        });
        assert_eq!(err, Err(FrameError::UnknownTarget(target)));
    }
}
