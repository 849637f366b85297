//! Named uniform cells and their GPU byte layout.
//!
//! A [`UniformSet`] maps names to [`UniformCell`]s. Cells are shared handles with
//! stable identity: configuration updates and per-frame writes mutate the
//! *same* cell in place, and the set itself is never replaced. This gives a
//! three-level indirection
//!
//! ```text
//! name ──▶ UniformCell ──▶ UniformLayout slot (byte offset / texture binding)
//! ```
//!
//! so a compiled program's bindings are computed once from the set and only the
//! cell contents change between frames.
//!
//! # Layout
//!
//! Non-texture cells are packed, in insertion order, into one uniform buffer at
//! `@group(0) @binding(0)` using WGSL uniform address-space alignment. Texture
//! cells become a `texture_2d<f32>` + `sampler` pair at bindings `1 + 2i` and
//! `2 + 2i`, in insertion order.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use glam::{Mat4, Vec2, Vec3, Vec4};

use crate::color::Color;
use crate::texture::TextureRef;

/// The type of a uniform cell. A cell never changes kind after creation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UniformKind {
    Float,
    Int,
    Vec2,
    Vec3,
    Vec4,
    Color,
    Mat4,
    Texture,
}

impl UniformKind {
    /// Alignment in the uniform address space, in bytes.
    pub fn align(self) -> usize {
        match self {
            UniformKind::Float | UniformKind::Int => 4,
            UniformKind::Vec2 => 8,
            UniformKind::Vec3 | UniformKind::Vec4 | UniformKind::Color | UniformKind::Mat4 => 16,
            UniformKind::Texture => 0,
        }
    }

    /// Size in the uniform buffer, in bytes. Textures occupy no buffer space.
    pub fn size(self) -> usize {
        match self {
            UniformKind::Float | UniformKind::Int => 4,
            UniformKind::Vec2 => 8,
            UniformKind::Vec3 => 12,
            UniformKind::Vec4 | UniformKind::Color => 16,
            UniformKind::Mat4 => 64,
            UniformKind::Texture => 0,
        }
    }

    /// The WGSL type used to declare a field of this kind.
    pub fn wgsl_type(self) -> &'static str {
        match self {
            UniformKind::Float => "f32",
            UniformKind::Int => "i32",
            UniformKind::Vec2 => "vec2f",
            UniformKind::Vec3 => "vec3f",
            UniformKind::Vec4 | UniformKind::Color => "vec4f",
            UniformKind::Mat4 => "mat4x4f",
            UniformKind::Texture => "texture_2d<f32>",
        }
    }
}

/// A typed uniform value.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum UniformValue {
    Float(f32),
    Int(i32),
    Vec2(Vec2),
    Vec3(Vec3),
    Vec4(Vec4),
    Color(Color),
    Mat4(Mat4),
    Texture(TextureRef),
}

impl UniformValue {
    pub fn kind(&self) -> UniformKind {
        match self {
            UniformValue::Float(_) => UniformKind::Float,
            UniformValue::Int(_) => UniformKind::Int,
            UniformValue::Vec2(_) => UniformKind::Vec2,
            UniformValue::Vec3(_) => UniformKind::Vec3,
            UniformValue::Vec4(_) => UniformKind::Vec4,
            UniformValue::Color(_) => UniformKind::Color,
            UniformValue::Mat4(_) => UniformKind::Mat4,
            UniformValue::Texture(_) => UniformKind::Texture,
        }
    }

    pub fn as_float(&self) -> Option<f32> {
        match *self {
            UniformValue::Float(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i32> {
        match *self {
            UniformValue::Int(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_vec2(&self) -> Option<Vec2> {
        match *self {
            UniformValue::Vec2(v) => Some(v),
            _ => None,
        }
    }

    /// Vec3 cells, or the RGB part of a color cell.
    pub fn as_vec3(&self) -> Option<Vec3> {
        match *self {
            UniformValue::Vec3(v) => Some(v),
            UniformValue::Color(c) => Some(c.to_vec3()),
            _ => None,
        }
    }

    /// Vec4 cells, or a color cell as RGBA.
    pub fn as_vec4(&self) -> Option<Vec4> {
        match *self {
            UniformValue::Vec4(v) => Some(v),
            UniformValue::Color(c) => Some(c.to_vec4()),
            _ => None,
        }
    }

    pub fn as_texture(&self) -> Option<TextureRef> {
        match *self {
            UniformValue::Texture(t) => Some(t),
            _ => None,
        }
    }
}

impl From<f32> for UniformValue {
    fn from(v: f32) -> Self {
        UniformValue::Float(v)
    }
}

impl From<i32> for UniformValue {
    fn from(v: i32) -> Self {
        UniformValue::Int(v)
    }
}

impl From<bool> for UniformValue {
    fn from(v: bool) -> Self {
        UniformValue::Int(v as i32)
    }
}

impl From<Vec2> for UniformValue {
    fn from(v: Vec2) -> Self {
        UniformValue::Vec2(v)
    }
}

impl From<Vec3> for UniformValue {
    fn from(v: Vec3) -> Self {
        UniformValue::Vec3(v)
    }
}

impl From<Vec4> for UniformValue {
    fn from(v: Vec4) -> Self {
        UniformValue::Vec4(v)
    }
}

impl From<Color> for UniformValue {
    fn from(v: Color) -> Self {
        UniformValue::Color(v)
    }
}

impl From<Mat4> for UniformValue {
    fn from(v: Mat4) -> Self {
        UniformValue::Mat4(v)
    }
}

impl From<TextureRef> for UniformValue {
    fn from(v: TextureRef) -> Self {
        UniformValue::Texture(v)
    }
}

/// Errors raised when mutating uniforms.
#[derive(Debug, Clone, PartialEq)]
pub enum UniformError {
    /// No cell with this name exists in the set.
    UnknownSlot(String),
    /// The new value's kind differs from the cell's kind.
    KindMismatch {
        expected: UniformKind,
        found: UniformKind,
    },
}

impl std::fmt::Display for UniformError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            UniformError::UnknownSlot(name) => write!(f, "Unknown uniform slot: '{}'", name),
            UniformError::KindMismatch { expected, found } => {
                write!(f, "Uniform kind mismatch: expected {:?}, found {:?}", expected, found)
            }
        }
    }
}

impl std::error::Error for UniformError {}

/// A shared, mutable uniform value with stable identity.
///
/// Cloning a cell clones the handle, not the value.
#[derive(Clone, Debug)]
pub struct UniformCell(Rc<RefCell<UniformValue>>);

impl UniformCell {
    pub fn new(value: impl Into<UniformValue>) -> Self {
        Self(Rc::new(RefCell::new(value.into())))
    }

    pub fn get(&self) -> UniformValue {
        *self.0.borrow()
    }

    pub fn kind(&self) -> UniformKind {
        self.0.borrow().kind()
    }

    /// Overwrites the value. The kind must match the cell's kind.
    pub fn set(&self, value: impl Into<UniformValue>) -> Result<(), UniformError> {
        let value = value.into();
        let mut slot = self.0.borrow_mut();
        if slot.kind() != value.kind() {
            return Err(UniformError::KindMismatch {
                expected: slot.kind(),
                found: value.kind(),
            });
        }
        *slot = value;
        Ok(())
    }

    /// Adds `delta` to a float cell and returns the new value.
    pub fn add_float(&self, delta: f32) -> Result<f32, UniformError> {
        let mut slot = self.0.borrow_mut();
        match &mut *slot {
            UniformValue::Float(v) => {
                *v += delta;
                Ok(*v)
            }
            other => Err(UniformError::KindMismatch {
                expected: UniformKind::Float,
                found: other.kind(),
            }),
        }
    }

    /// Whether both handles point at the same cell.
    pub fn ptr_eq(&self, other: &UniformCell) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

#[derive(Clone, Debug)]
struct UniformEntry {
    name: String,
    cell: UniformCell,
}

/// An ordered mapping from uniform name to [`UniformCell`].
#[derive(Clone, Debug, Default)]
pub struct UniformSet {
    entries: Vec<UniformEntry>,
    index: HashMap<String, usize>,
}

impl UniformSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder form of [`insert`](Self::insert).
    pub fn with(mut self, name: &str, value: impl Into<UniformValue>) -> Self {
        self.insert(name, value);
        self
    }

    /// Adds a cell and returns a handle to it.
    ///
    /// Inserting an existing name replaces that cell's value in place, keeping
    /// its position and identity when the kind matches, and replacing the cell
    /// otherwise.
    pub fn insert(&mut self, name: &str, value: impl Into<UniformValue>) -> UniformCell {
        let value = value.into();
        if let Some(&i) = self.index.get(name) {
            let entry = &mut self.entries[i];
            if entry.cell.set(value).is_err() {
                entry.cell = UniformCell::new(value);
            }
            return entry.cell.clone();
        }

        let cell = UniformCell::new(value);
        self.index.insert(name.to_string(), self.entries.len());
        self.entries.push(UniformEntry {
            name: name.to_string(),
            cell: cell.clone(),
        });
        cell
    }

    pub fn cell(&self, name: &str) -> Option<&UniformCell> {
        self.index.get(name).map(|&i| &self.entries[i].cell)
    }

    pub fn get(&self, name: &str) -> Option<UniformValue> {
        self.cell(name).map(UniformCell::get)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    /// Overwrites a named cell in place.
    pub fn set(&self, name: &str, value: impl Into<UniformValue>) -> Result<(), UniformError> {
        self.cell(name)
            .ok_or_else(|| UniformError::UnknownSlot(name.to_string()))?
            .set(value)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &UniformCell)> {
        self.entries.iter().map(|e| (e.name.as_str(), &e.cell))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Texture cells in binding order.
    pub fn textures(&self) -> impl Iterator<Item = (&str, TextureRef)> {
        self.iter()
            .filter_map(|(name, cell)| cell.get().as_texture().map(|t| (name, t)))
    }
}

/// A non-texture field placed in the uniform buffer.
#[derive(Clone, Debug, PartialEq)]
pub struct LayoutField {
    pub name: String,
    pub kind: UniformKind,
    pub offset: usize,
}

/// Byte layout of a [`UniformSet`]'s uniform buffer plus its texture bindings.
#[derive(Clone, Debug, PartialEq)]
pub struct UniformLayout {
    fields: Vec<LayoutField>,
    textures: Vec<String>,
    size: usize,
}

fn align_to(value: usize, align: usize) -> usize {
    value.div_ceil(align) * align
}

impl UniformLayout {
    pub fn new(set: &UniformSet) -> Self {
        let mut fields = Vec::new();
        let mut textures = Vec::new();
        let mut cursor = 0;

        for (name, cell) in set.iter() {
            let kind = cell.kind();
            if kind == UniformKind::Texture {
                textures.push(name.to_string());
                continue;
            }
            let offset = align_to(cursor, kind.align());
            cursor = offset + kind.size();
            fields.push(LayoutField {
                name: name.to_string(),
                kind,
                offset,
            });
        }

        Self {
            fields,
            textures,
            size: align_to(cursor.max(16), 16),
        }
    }

    pub fn fields(&self) -> &[LayoutField] {
        &self.fields
    }

    /// Texture slot names; slot `i` binds at `1 + 2i` (texture) and `2 + 2i` (sampler).
    pub fn texture_slots(&self) -> &[String] {
        &self.textures
    }

    /// Uniform buffer size in bytes (a non-zero multiple of 16).
    pub fn size(&self) -> usize {
        self.size
    }

    /// Packs the current cell values into a buffer of [`size`](Self::size) bytes.
    ///
    /// Fields missing from `set`, or whose kind differs from the layout, are left zeroed.
    pub fn pack(&self, set: &UniformSet) -> Vec<u8> {
        let mut bytes = vec![0u8; self.size];
        for field in &self.fields {
            let Some(value) = set.get(&field.name) else {
                continue;
            };
            if value.kind() != field.kind {
                continue;
            }
            let at = field.offset;
            match value {
                UniformValue::Float(v) => write_pod(&mut bytes, at, &v),
                UniformValue::Int(v) => write_pod(&mut bytes, at, &v),
                UniformValue::Vec2(v) => write_pod(&mut bytes, at, &v.to_array()),
                UniformValue::Vec3(v) => write_pod(&mut bytes, at, &v.to_array()),
                UniformValue::Vec4(v) => write_pod(&mut bytes, at, &v.to_array()),
                UniformValue::Color(c) => write_pod(&mut bytes, at, &c.to_vec4().to_array()),
                UniformValue::Mat4(m) => write_pod(&mut bytes, at, &m.to_cols_array()),
                UniformValue::Texture(_) => {}
            }
        }
        bytes
    }

    /// Renders the WGSL struct declaration matching this layout.
    pub fn wgsl_struct(&self, name: &str) -> String {
        let mut out = format!("struct {name} {{\n");
        for field in &self.fields {
            out.push_str(&format!("    {}: {},\n", field.name, field.kind.wgsl_type()));
        }
        if self.fields.is_empty() {
            out.push_str("    _unused: vec4f,\n");
        }
        out.push('}');
        out
    }
}

fn write_pod<T: bytemuck::Pod>(bytes: &mut [u8], offset: usize, value: &T) {
    let src = bytemuck::bytes_of(value);
    bytes[offset..offset + src.len()].copy_from_slice(src);
}
