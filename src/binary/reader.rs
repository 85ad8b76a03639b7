use crate::binary::entity::{tags, BinaryEntity, Entity, EntityKind};
use crate::binary::{FORMAT_MAJOR, FORMAT_TAG};
use crate::core::error::{PbrtError, Result};
use crate::core::paramset::{Param, ParamSet, ParamType, ParamValues, ValueKind};
use crate::core::pbrt::Float;
use crate::core::scene::*;
use crate::core::transform::{Transform, TransformSet};
use crate::core::geometry::vector::Vector3f;
use crate::pbrtparser::tokens::Loc;
use byteorder::{ByteOrder, NativeEndian};
use std::io::{ErrorKind, Read};
use std::path::PathBuf;
use std::sync::Arc;
use log::{debug, warn};

/// Cursor over the payload of one block, resolving handles against the
/// entities read before it.
pub struct ReadContext<'a> {
    data        : &'a [u8],
    pos         : usize,
    entities    : &'a [Option<Entity>]
}

impl<'a> ReadContext<'a> {
    pub fn new(data: &'a [u8], entities: &'a [Option<Entity>]) -> Self {
        Self { data, pos: 0, entities }
    }

    pub fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8]> {
        let left = self.remaining();

        if n > left {
            return Err(PbrtError::TruncatedBlock { wanted: n, left });
        }

        let s = &self.data[self.pos..self.pos + n];
        self.pos += n;

        Ok(s)
    }

    pub fn read_u8(&mut self) -> Result<u8> {
        Ok(self.take(1)?[0])
    }

    pub fn read_bool(&mut self) -> Result<bool> {
        Ok(self.read_u8()? != 0)
    }

    pub fn read_u16(&mut self) -> Result<u16> {
        Ok(NativeEndian::read_u16(self.take(2)?))
    }

    pub fn read_i32(&mut self) -> Result<i32> {
        Ok(NativeEndian::read_i32(self.take(4)?))
    }

    pub fn read_u64(&mut self) -> Result<u64> {
        Ok(NativeEndian::read_u64(self.take(8)?))
    }

    pub fn read_f32(&mut self) -> Result<Float> {
        Ok(NativeEndian::read_f32(self.take(4)?))
    }

    pub fn read_string(&mut self) -> Result<String> {
        let len = self.read_i32()?;
        let len = if len < 0 { 0 } else { len as usize };
        let bytes = self.take(len)?;

        Ok(String::from_utf8_lossy(bytes).into_owned())
    }

    // Element counts are checked against the bytes left before anything
    // is allocated.
    fn read_count(&mut self, elem_size: usize) -> Result<usize> {
        let n = self.read_u64()? as usize;
        let wanted = n.saturating_mul(elem_size);

        if wanted > self.remaining() {
            return Err(PbrtError::TruncatedBlock { wanted, left: self.remaining() });
        }

        Ok(n)
    }

    pub fn read_floats(&mut self) -> Result<Vec<Float>> {
        let n = self.read_count(4)?;
        (0..n).map(|_| self.read_f32()).collect()
    }

    pub fn read_ints(&mut self) -> Result<Vec<i32>> {
        let n = self.read_count(4)?;
        (0..n).map(|_| self.read_i32()).collect()
    }

    pub fn read_bools(&mut self) -> Result<Vec<bool>> {
        let n = self.read_count(1)?;
        (0..n).map(|_| self.read_bool()).collect()
    }

    pub fn read_strings(&mut self) -> Result<Vec<String>> {
        let n = self.read_count(4)?;
        (0..n).map(|_| self.read_string()).collect()
    }

    fn read_vec3(&mut self) -> Result<Vector3f> {
        let x = self.read_f32()?;
        let y = self.read_f32()?;
        let z = self.read_f32()?;

        Ok(Vector3f::new(x, y, z))
    }

    pub fn read_transform(&mut self) -> Result<Transform> {
        let vx = self.read_vec3()?;
        let vy = self.read_vec3()?;
        let vz = self.read_vec3()?;
        let p = self.read_vec3()?;

        Ok(Transform::from_columns(&vx, &vy, &vz, &p))
    }

    pub fn read_transform_set(&mut self) -> Result<TransformSet> {
        let start = self.read_transform()?;
        let end = self.read_transform()?;

        Ok(TransformSet::new(start, end))
    }

    /// Resolves a handle: -1 and slots of unknown block types give `None`,
    /// anything of another type than `T` is an error.
    pub fn get_entity<T: EntityKind>(&self, id: i32) -> Result<Option<Arc<T>>> {
        if id == -1 {
            return Ok(None);
        }

        let slot = if id < 0 { None } else { self.entities.get(id as usize) };

        match slot {
            None => Err(PbrtError::InvalidHandle { id, count: self.entities.len() }),
            Some(None) => Ok(None),
            Some(Some(e)) => T::from_entity(e)
                .map(Some)
                .ok_or(PbrtError::EntityType { id, expected: T::NAME })
        }
    }

    pub fn read_entity<T: EntityKind>(&mut self) -> Result<Option<Arc<T>>> {
        let id = self.read_i32()?;
        self.get_entity(id)
    }

    /// Like `read_entity`, for references that can't be null.
    pub fn read_required<T: EntityKind>(&mut self) -> Result<Arc<T>> {
        let id = self.read_i32()?;
        self.get_entity(id)?.ok_or(PbrtError::EntityType { id, expected: T::NAME })
    }

    pub fn read_entities<T: EntityKind>(&mut self) -> Result<Vec<Arc<T>>> {
        let n = self.read_count(4)?;
        let mut v = Vec::with_capacity(n);

        for _ in 0..n {
            match self.read_entity()? {
                Some(e) => v.push(e),
                None    => debug!("dropping null {} reference", T::NAME)
            }
        }

        Ok(v)
    }

    pub fn read_entity_map<T: EntityKind>(&mut self) -> Result<NamedMap<T>> {
        let n = self.read_i32()?;
        let mut map = NamedMap::new();

        for _ in 0..n.max(0) {
            let name = self.read_string()?;

            if let Some(e) = self.read_entity()? {
                map.insert(name, e);
            }
        }

        Ok(map)
    }

    pub fn read_params(&mut self) -> Result<ParamSet> {
        let n = self.read_u16()?;
        let mut params = ParamSet::new();

        for _ in 0..n {
            let tag = self.read_u8()?;
            let name = self.read_string()?;
            let ty = ParamType::from_tag(tag).ok_or_else(|| PbrtError::UnknownParamType {
                ty: format!("#{}", tag),
                loc: binary_loc()
            })?;

            let values = match ty.kind() {
                ValueKind::Float    => ParamValues::Float(self.read_floats()?),
                ValueKind::Integer  => ParamValues::Integer(self.read_ints()?),
                ValueKind::Bool     => ParamValues::Bool(self.read_bools()?),
                ValueKind::String   => ParamValues::String(self.read_strings()?),
                ValueKind::Texture  => ParamValues::Texture(self.read_entity::<Texture>()?)
            };

            if let Some(p) = Param::with_values(ty, values) {
                params.add(&name, p);
            }
        }

        Ok(params)
    }
}

fn binary_loc() -> Loc {
    Loc::new(Arc::new(PathBuf::from("<binary>")), 0, 0)
}

fn decode<T: BinaryEntity>(ctx: &mut ReadContext<'_>) -> Result<Entity> {
    let e = T::read_from(ctx)?;

    if ctx.remaining() != 0 {
        debug!("{} bytes left over in {} block", ctx.remaining(), T::NAME);
    }

    Ok(T::into_entity(Arc::new(e)))
}

/// Reads the stream block by block. Blocks of unknown type leave an
/// empty slot so later handles still line up.
pub struct BinaryReader<R: Read> {
    input       : R,
    entities    : Vec<Option<Entity>>
}

impl<R: Read> BinaryReader<R> {
    pub fn new(input: R) -> Self {
        Self { input, entities: Vec::new() }
    }

    pub fn entities(&self) -> &[Option<Entity>] {
        &self.entities
    }

    fn read_header(&mut self) -> Result<()> {
        let mut buf = [0u8; 4];
        if read_fully(&mut self.input, &mut buf)? != buf.len() {
            return Err(PbrtError::TruncatedFile);
        }

        let tag = NativeEndian::read_i32(&buf);

        if tag != FORMAT_TAG {
            warn!(
                "binary file format version {}.{} differs from ours ({}.{}); reading it anyway",
                tag >> 16, tag & 0xffff, FORMAT_TAG >> 16, FORMAT_TAG & 0xffff);

            if tag >> 16 != FORMAT_MAJOR {
                warn!("major format version mismatch: expect the read to fail or produce garbage");
            }
        }

        Ok(())
    }

    // The next block as (tag, payload), `None` at a clean end of file.
    fn read_block(&mut self) -> Result<Option<(i32, Vec<u8>)>> {
        let mut head = [0u8; 12];

        match read_fully(&mut self.input, &mut head)? {
            0 => return Ok(None),
            12 => {}
            _ => return Err(PbrtError::TruncatedFile)
        }

        let size = NativeEndian::read_u64(&head[0..8]);
        let tag = NativeEndian::read_i32(&head[8..12]);

        let mut payload = Vec::new();
        (&mut self.input).take(size).read_to_end(&mut payload)?;

        if payload.len() as u64 != size {
            return Err(PbrtError::TruncatedFile);
        }

        Ok(Some((tag, payload)))
    }

    /// Reads all blocks. The last entity in the file has to be the scene.
    pub fn read_scene(mut self) -> Result<Scene> {
        self.read_header()?;

        while let Some((tag, payload)) = self.read_block()? {
            let mut ctx = ReadContext::new(&payload, &self.entities);

            let entity = match tag {
                tags::OBJECT             => Some(decode::<Object>(&mut ctx)?),
                tags::INSTANCE           => Some(decode::<Instance>(&mut ctx)?),
                tags::SHAPE              => Some(decode::<Shape>(&mut ctx)?),
                tags::MATERIAL           => Some(decode::<Material>(&mut ctx)?),
                tags::CAMERA             => Some(decode::<Camera>(&mut ctx)?),
                tags::FILM               => Some(decode::<Film>(&mut ctx)?),
                tags::MEDIUM             => Some(decode::<Medium>(&mut ctx)?),
                tags::SAMPLER            => Some(decode::<Sampler>(&mut ctx)?),
                tags::PIXEL_FILTER       => Some(decode::<PixelFilter>(&mut ctx)?),
                tags::INTEGRATOR         => Some(decode::<Integrator>(&mut ctx)?),
                tags::VOLUME_INTEGRATOR  => Some(decode::<VolumeIntegrator>(&mut ctx)?),
                tags::SURFACE_INTEGRATOR => Some(decode::<SurfaceIntegrator>(&mut ctx)?),
                tags::TEXTURE            => Some(decode::<Texture>(&mut ctx)?),
                tags::LIGHT_SOURCE       => Some(decode::<LightSource>(&mut ctx)?),
                tags::AREA_LIGHT_SOURCE  => Some(decode::<AreaLightSource>(&mut ctx)?),
                tags::VOLUME             => Some(decode::<Volume>(&mut ctx)?),
                tags::ATTRIBUTES         => Some(decode::<Attributes>(&mut ctx)?),
                tags::SCENE              => Some(decode::<Scene>(&mut ctx)?),
                _ => {
                    warn!("unknown entity type tag {} in binary file; skipping its block", tag);
                    None
                }
            };

            self.entities.push(entity);
        }

        debug!("read {} entities", self.entities.len());

        match self.entities.pop() {
            Some(Some(Entity::Scene(s))) => Ok(Arc::try_unwrap(s).unwrap_or_else(|s| (*s).clone())),
            _ => Err(PbrtError::NoScene)
        }
    }
}

// Fills `buf` as far as the input allows and returns the byte count.
fn read_fully<R: Read>(input: &mut R, buf: &mut [u8]) -> Result<usize> {
    let mut n = 0;

    while n < buf.len() {
        match input.read(&mut buf[n..]) {
            Ok(0) => break,
            Ok(k) => n += k,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(e.into())
        }
    }

    Ok(n)
}
