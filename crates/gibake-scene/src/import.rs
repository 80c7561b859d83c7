//! glTF 2.0 scene import.
//!
//! Walks the default scene's node hierarchy, flattening every triangle mesh
//! primitive into a [`Primitive`] with its accumulated world transform.
//! `TEXCOORD_0` feeds material lookups and `TEXCOORD_1` is the light map
//! channel. Texture coordinates are flipped to a bottom-left origin to match
//! [`Image::sample`].
//!
//! Unusable primitives and textures are logged and skipped so that one bad
//! asset never aborts a whole import.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use gibake_core::{Error, Result};
use glam::{Mat4, Vec2, Vec3, Vec4};
use tracing::{debug, info, warn};

use crate::image::{Image, PixelFormat, WrapMode};
use crate::material::Material;
use crate::primitive::Primitive;
use crate::scene::Scene;

/// Load a `.gltf` or `.glb` file into a [`Scene`] with the default sun.
pub fn load_gltf(path: impl AsRef<Path>) -> Result<Scene> {
    let path = path.as_ref();
    let (document, buffers, images) = gltf::import(path)
        .map_err(|e| Error::Scene(format!("failed to load '{}': {e}", path.display())))?;

    let mut importer = Importer {
        buffers: &buffers,
        images: &images,
        materials: HashMap::new(),
        textures: HashMap::new(),
        primitives: Vec::new(),
    };

    let scene = document
        .default_scene()
        .or_else(|| document.scenes().next())
        .ok_or_else(|| Error::Scene(format!("'{}' contains no scene", path.display())))?;

    for node in scene.nodes() {
        importer.visit_node(&node, Mat4::IDENTITY);
    }

    let primitives = importer.primitives;
    info!(
        "Loaded {} primitives ({} triangles) from {}",
        primitives.len(),
        primitives.iter().map(Primitive::triangle_count).sum::<usize>(),
        path.display()
    );
    Ok(Scene::new(primitives))
}

struct Importer<'a> {
    buffers: &'a [gltf::buffer::Data],
    images: &'a [gltf::image::Data],
    materials: HashMap<Option<usize>, Arc<Material>>,
    textures: HashMap<(usize, bool), Option<Arc<Image>>>,
    primitives: Vec<Primitive>,
}

impl Importer<'_> {
    fn visit_node(&mut self, node: &gltf::Node<'_>, parent: Mat4) {
        let transform = parent * Mat4::from_cols_array_2d(&node.transform().matrix());

        if let Some(mesh) = node.mesh() {
            let mesh_name = mesh
                .name()
                .map_or_else(|| format!("mesh{}", mesh.index()), str::to_owned);
            for primitive in mesh.primitives() {
                let name = format!("{mesh_name}.{}", primitive.index());
                match self.read_primitive(&primitive, &name, transform) {
                    Ok(p) => self.primitives.push(p),
                    Err(e) => warn!("Skipping primitive: {e}"),
                }
            }
        }

        for child in node.children() {
            self.visit_node(&child, transform);
        }
    }

    fn read_primitive(
        &mut self,
        primitive: &gltf::Primitive<'_>,
        name: &str,
        transform: Mat4,
    ) -> Result<Primitive> {
        let invalid = |reason: &str| Error::InvalidPrimitive {
            name: name.to_owned(),
            reason: reason.to_owned(),
        };

        if primitive.mode() != gltf::mesh::Mode::Triangles {
            return Err(invalid("only triangle lists are supported"));
        }

        let buffers = self.buffers;
        let reader = primitive.reader(|buffer| Some(&buffers[buffer.index()]));

        let positions: Vec<Vec3> = reader
            .read_positions()
            .ok_or_else(|| invalid("missing POSITION attribute"))?
            .map(Vec3::from)
            .collect();
        let indices: Vec<u32> = reader
            .read_indices()
            .ok_or_else(|| invalid("missing indices"))?
            .into_u32()
            .collect();
        let normals: Vec<Vec3> = reader
            .read_normals()
            .map(|iter| iter.map(Vec3::from).collect())
            .unwrap_or_default();
        let tangents: Vec<Vec4> = reader
            .read_tangents()
            .map(|iter| iter.map(Vec4::from).collect())
            .unwrap_or_default();
        let flip = |uv: [f32; 2]| Vec2::new(uv[0], 1.0 - uv[1]);
        let tex_coords: Vec<Vec2> = reader
            .read_tex_coords(0)
            .map(|iter| iter.into_f32().map(flip).collect())
            .unwrap_or_default();
        let light_map_tex_coords: Vec<Vec2> = reader
            .read_tex_coords(1)
            .map(|iter| iter.into_f32().map(flip).collect())
            .unwrap_or_default();

        if normals.is_empty() {
            warn!("Primitive {name} has no normals");
        }
        if light_map_tex_coords.is_empty() {
            debug!("Primitive {name} has no light map coordinates");
        }

        let material = self.material(&primitive.material());

        let prim = Primitive {
            name: name.to_owned(),
            transform,
            positions,
            normals,
            tangents,
            tex_coords,
            light_map_tex_coords,
            indices,
            material,
        };
        prim.validate()?;
        Ok(prim)
    }

    fn material(&mut self, material: &gltf::Material<'_>) -> Arc<Material> {
        let key = material.index();
        if let Some(m) = self.materials.get(&key) {
            return Arc::clone(m);
        }

        let pbr = material.pbr_metallic_roughness();
        let factor = pbr.base_color_factor();
        let albedo_map = pbr
            .base_color_texture()
            .and_then(|info| self.texture(&info.texture(), true));
        let roughness_map = pbr
            .metallic_roughness_texture()
            .and_then(|info| self.texture(&info.texture(), false));
        let normal_map = material
            .normal_texture()
            .and_then(|info| self.texture(&info.texture(), false));

        let result = Arc::new(Material {
            albedo_map,
            normal_map,
            roughness_map,
            base_color: Vec3::new(factor[0], factor[1], factor[2]),
            roughness: pbr.roughness_factor(),
            metallic: pbr.metallic_factor(),
        });
        self.materials.insert(key, Arc::clone(&result));
        result
    }

    fn texture(&mut self, texture: &gltf::Texture<'_>, srgb: bool) -> Option<Arc<Image>> {
        let source = texture.source().index();
        let key = (source, srgb);
        if let Some(cached) = self.textures.get(&key) {
            return cached.clone();
        }

        let sampler = texture.sampler();
        let wrap = |mode: gltf::texture::WrappingMode| match mode {
            gltf::texture::WrappingMode::ClampToEdge => WrapMode::ClampToEdge,
            _ => WrapMode::Repeat,
        };

        let image = self.images.get(source).and_then(|data| {
            let converted = convert_image(data, srgb);
            if let Err(e) = &converted {
                warn!("Omitting texture {source}: {e}");
            }
            converted.ok()
        });
        let image = image.map(|img| {
            Arc::new(img.with_wrap_mode(wrap(sampler.wrap_s()), wrap(sampler.wrap_t())))
        });
        self.textures.insert(key, image.clone());
        image
    }
}

fn convert_image(data: &gltf::image::Data, srgb: bool) -> Result<Image> {
    use gltf::image::Format;

    let format = match (data.format, srgb) {
        (Format::R8, _) => PixelFormat::R8,
        (Format::R8G8B8, false) => PixelFormat::Rgb8,
        (Format::R8G8B8, true) => PixelFormat::Srgb8,
        (Format::R8G8B8A8, false) => PixelFormat::Rgba8,
        (Format::R8G8B8A8, true) => PixelFormat::Srgb8Alpha8,
        (Format::R32G32B32FLOAT, _) => PixelFormat::Rgb32F,
        (Format::R32G32B32A32FLOAT, _) => PixelFormat::Rgba32F,
        (other, _) => {
            return Err(Error::UnsupportedFormat(format!("glTF image format {other:?}")));
        }
    };
    Image::from_raw(data.width, data.height, format, data.pixels.clone())
}
