use crate::binary::entity::{BinaryEntity, Entity};
use crate::binary::FORMAT_TAG;
use crate::core::error::{PbrtError, Result};
use crate::core::paramset::{ParamSet, ParamValues};
use crate::core::pbrt::Float;
use crate::core::scene::NamedMap;
use crate::core::transform::{Transform, TransformSet};
use byteorder::{NativeEndian, WriteBytesExt};
use std::collections::HashMap;
use std::convert::TryFrom;
use std::io::Write;
use std::sync::Arc;
use log::debug;

/// Writes scene graph nodes as blocks, each unique node exactly once.
///
/// Payloads are assembled on a stack of buffers: writing a node that
/// refers to another node first writes the other one as a complete block
/// and then only records its handle, so blocks always appear after the
/// blocks they depend on.
pub struct BinaryWriter<W: Write> {
    out             : W,
    buffers         : Vec<Vec<u8>>,
    emitted         : HashMap<(i32, usize), i32>,
    // Keeps every written node alive so pointer keys can't be reused.
    written         : Vec<Entity>,
    bytes_written   : usize
}

impl<W: Write> BinaryWriter<W> {
    /// Starts a stream, writing the format header right away.
    pub fn new(mut out: W) -> Result<Self> {
        out.write_i32::<NativeEndian>(FORMAT_TAG)?;

        Ok(Self {
            out,
            buffers: Vec::new(),
            emitted: HashMap::new(),
            written: Vec::new(),
            bytes_written: 4
        })
    }

    pub fn bytes_written(&self) -> usize {
        self.bytes_written
    }

    /// Number of blocks written so far.
    pub fn num_entities(&self) -> usize {
        self.emitted.len()
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    /// Writes `entity` unless it already was and returns its handle;
    /// `None` is handle -1.
    pub fn serialize<T: BinaryEntity>(&mut self, entity: Option<&Arc<T>>) -> Result<i32> {
        let entity = match entity {
            Some(e) => e,
            None    => return Ok(-1)
        };

        let key = (T::TAG, Arc::as_ptr(entity) as *const u8 as usize);
        if let Some(handle) = self.emitted.get(&key) {
            return Ok(*handle);
        }

        self.buffers.push(Vec::new());
        entity.write_to(self)?;
        self.execute_write(T::TAG)?;

        let handle = self.emitted.len() as i32;
        self.emitted.insert(key, handle);
        self.written.push(T::into_entity(entity.clone()));

        Ok(handle)
    }

    fn execute_write(&mut self, tag: i32) -> Result<()> {
        let block = self.buffers.pop().unwrap_or_default();

        self.out.write_u64::<NativeEndian>(block.len() as u64)?;
        self.out.write_i32::<NativeEndian>(tag)?;
        self.out.write_all(&block)?;
        self.bytes_written += 12 + block.len();

        debug!("wrote block tag {} ({} bytes)", tag, block.len());

        Ok(())
    }

    pub fn flush(&mut self) -> Result<()> {
        self.out.flush()?;

        Ok(())
    }

    fn buf(&mut self) -> &mut Vec<u8> {
        if self.buffers.is_empty() {
            self.buffers.push(Vec::new());
        }

        let n = self.buffers.len() - 1;
        &mut self.buffers[n]
    }

    pub fn write_u8(&mut self, v: u8) -> Result<()> {
        self.buf().write_u8(v)?;
        Ok(())
    }

    pub fn write_bool(&mut self, v: bool) -> Result<()> {
        self.write_u8(v as u8)
    }

    pub fn write_i32(&mut self, v: i32) -> Result<()> {
        self.buf().write_i32::<NativeEndian>(v)?;
        Ok(())
    }

    pub fn write_u64(&mut self, v: u64) -> Result<()> {
        self.buf().write_u64::<NativeEndian>(v)?;
        Ok(())
    }

    pub fn write_f32(&mut self, v: Float) -> Result<()> {
        self.buf().write_f32::<NativeEndian>(v)?;
        Ok(())
    }

    pub fn write_string(&mut self, s: &str) -> Result<()> {
        let len = i32::try_from(s.len())
            .map_err(|_| PbrtError::TooManyEntries { what: "string", count: s.len() })?;

        self.write_i32(len)?;
        self.buf().extend_from_slice(s.as_bytes());

        Ok(())
    }

    pub fn write_floats(&mut self, v: &[Float]) -> Result<()> {
        self.write_u64(v.len() as u64)?;
        v.iter().try_for_each(|x| self.write_f32(*x))
    }

    pub fn write_ints(&mut self, v: &[i32]) -> Result<()> {
        self.write_u64(v.len() as u64)?;
        v.iter().try_for_each(|x| self.write_i32(*x))
    }

    pub fn write_bools(&mut self, v: &[bool]) -> Result<()> {
        self.write_u64(v.len() as u64)?;
        v.iter().try_for_each(|x| self.write_bool(*x))
    }

    pub fn write_strings(&mut self, v: &[String]) -> Result<()> {
        self.write_u64(v.len() as u64)?;
        v.iter().try_for_each(|x| self.write_string(x))
    }

    pub fn write_transform(&mut self, t: &Transform) -> Result<()> {
        for c in [t.vx(), t.vy(), t.vz(), t.p].iter() {
            self.write_f32(c.x)?;
            self.write_f32(c.y)?;
            self.write_f32(c.z)?;
        }

        Ok(())
    }

    pub fn write_transform_set(&mut self, ts: &TransformSet) -> Result<()> {
        self.write_transform(ts.start())?;
        self.write_transform(ts.end())
    }

    pub fn write_entity<T: BinaryEntity>(&mut self, e: Option<&Arc<T>>) -> Result<()> {
        let handle = self.serialize(e)?;
        self.write_i32(handle)
    }

    pub fn write_entities<T: BinaryEntity>(&mut self, v: &[Arc<T>]) -> Result<()> {
        self.write_u64(v.len() as u64)?;
        v.iter().try_for_each(|e| self.write_entity(Some(e)))
    }

    pub fn write_entity_map<T: BinaryEntity>(&mut self, map: &NamedMap<T>) -> Result<()> {
        let count = i32::try_from(map.len())
            .map_err(|_| PbrtError::TooManyEntries { what: "entity map", count: map.len() })?;

        self.write_i32(count)?;

        for (name, e) in map.iter() {
            self.write_string(name)?;
            self.write_entity(Some(e))?;
        }

        Ok(())
    }

    pub fn write_params(&mut self, params: &ParamSet) -> Result<()> {
        let count = u16::try_from(params.len())
            .map_err(|_| PbrtError::TooManyEntries { what: "parameter list", count: params.len() })?;

        self.buf().write_u16::<NativeEndian>(count)?;

        for (name, p) in params.iter() {
            self.write_u8(p.ty().tag())?;
            self.write_string(name)?;

            match p.values() {
                ParamValues::Float(v)   => self.write_floats(v)?,
                ParamValues::Integer(v) => self.write_ints(v)?,
                ParamValues::Bool(v)    => self.write_bools(v)?,
                ParamValues::String(v)  => self.write_strings(v)?,
                ParamValues::Texture(t) => self.write_entity(t.as_ref())?
            }
        }

        Ok(())
    }
}
