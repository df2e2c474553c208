//! Shadow-map resources and light-space math.

use glam::{Mat4, Vec3, Vec4};

use crate::scene::{Light, LightKind};

/// Depth format used for the shadow maps; filterable with a comparison
/// sampler on every backend that reports comparison-sampler support.
pub const SHADOW_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;

/// Half-extent of the orthographic volume a directional light shadows.
const DIRECTIONAL_EXTENT: f32 = 1200.0;

/// View-projection matrix rendering the scene from the light's point of
/// view. Directional lights get an orthographic volume; spotlights get a
/// perspective frustum matching their cone.
pub fn light_view_proj(light: &Light) -> Mat4 {
    let up = if light.direction().abs().dot(Vec3::Y) > 0.99 {
        Vec3::Z
    } else {
        Vec3::Y
    };
    let view = Mat4::look_at_rh(light.position, light.target, up);
    let projection = match light.kind {
        LightKind::Directional => Mat4::orthographic_rh(
            -DIRECTIONAL_EXTENT,
            DIRECTIONAL_EXTENT,
            -DIRECTIONAL_EXTENT,
            DIRECTIONAL_EXTENT,
            light.shadow.near_clip,
            light.shadow.far_clip,
        ),
        LightKind::Spot { cone_deg, .. } => Mat4::perspective_rh(
            cone_deg.to_radians(),
            1.0,
            light.shadow.near_clip,
            light.shadow.far_clip,
        ),
    };
    projection * view
}

/// World-space corners of a light frustum, unprojected from the wgpu clip
/// cube (z in [0, 1]). Near plane first.
pub fn frustum_corners(view_proj: Mat4) -> [Vec3; 8] {
    let inverse = view_proj.inverse();
    let mut corners = [Vec3::ZERO; 8];
    let mut index = 0;
    for z in [0.0f32, 1.0] {
        for y in [-1.0f32, 1.0] {
            for x in [-1.0f32, 1.0] {
                let clip = inverse * Vec4::new(x, y, z, 1.0);
                corners[index] = clip.truncate() / clip.w;
                index += 1;
            }
        }
    }
    corners
}

/// Index pairs describing the 12 wireframe edges of a frustum's corners as
/// returned by [`frustum_corners`].
pub const FRUSTUM_EDGES: [(usize, usize); 12] = [
    (0, 1),
    (1, 3),
    (3, 2),
    (2, 0),
    (4, 5),
    (5, 7),
    (7, 6),
    (6, 4),
    (0, 4),
    (1, 5),
    (2, 6),
    (3, 7),
];

/// Depth texture array holding one shadow map layer per light, plus the
/// comparison sampler the forward pass filters it with.
pub struct ShadowAtlas {
    _texture: wgpu::Texture,
    layer_views: Vec<wgpu::TextureView>,
    array_view: wgpu::TextureView,
    sampler: wgpu::Sampler,
    resolution: u32,
}

impl ShadowAtlas {
    pub fn new(device: &wgpu::Device, resolution: u32, layers: u32) -> Self {
        let resolution = resolution.max(1);
        let layers = layers.max(1);
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("shadow-atlas"),
            size: wgpu::Extent3d {
                width: resolution,
                height: resolution,
                depth_or_array_layers: layers,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: SHADOW_FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::TEXTURE_BINDING,
            view_formats: &[],
        });
        let layer_views = (0..layers)
            .map(|layer| {
                texture.create_view(&wgpu::TextureViewDescriptor {
                    label: Some("shadow-layer"),
                    dimension: Some(wgpu::TextureViewDimension::D2),
                    base_array_layer: layer,
                    array_layer_count: Some(1),
                    ..Default::default()
                })
            })
            .collect();
        let array_view = texture.create_view(&wgpu::TextureViewDescriptor {
            label: Some("shadow-array"),
            dimension: Some(wgpu::TextureViewDimension::D2Array),
            ..Default::default()
        });
        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("shadow-sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            compare: Some(wgpu::CompareFunction::LessEqual),
            ..Default::default()
        });
        Self {
            _texture: texture,
            layer_views,
            array_view,
            sampler,
            resolution,
        }
    }

    pub fn layer_view(&self, layer: usize) -> &wgpu::TextureView {
        &self.layer_views[layer]
    }

    pub fn array_view(&self) -> &wgpu::TextureView {
        &self.array_view
    }

    pub fn sampler(&self) -> &wgpu::Sampler {
        &self.sampler
    }

    pub fn resolution(&self) -> u32 {
        self.resolution
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec3;

    fn project(matrix: Mat4, point: Vec3) -> Vec3 {
        let clip = matrix * point.extend(1.0);
        clip.truncate() / clip.w
    }

    #[test]
    fn directional_volume_spans_near_to_far() {
        let light = Light::directional(Vec3::new(0.0, 500.0, 0.0), Vec3::ZERO);
        let matrix = light_view_proj(&light);
        let direction = light.direction();
        let near = project(matrix, light.position + direction * light.shadow.near_clip);
        let far = project(matrix, light.position + direction * light.shadow.far_clip);
        assert!(near.z.abs() < 1e-3);
        assert!((far.z - 1.0).abs() < 1e-3);
    }

    #[test]
    fn spot_projection_follows_the_cone() {
        let mut narrow = Light::spot(Vec3::new(0.0, 0.0, 500.0), Vec3::ZERO, 30.0, 20.0);
        narrow.shadow.near_clip = 10.0;
        let mut wide = narrow;
        wide.kind = LightKind::Spot {
            cone_deg: 90.0,
            concentration: 20.0,
        };
        // A point off-axis lands further from the center under the narrow
        // cone than under the wide one.
        let point = Vec3::new(20.0, 0.0, 400.0);
        let narrow_x = project(light_view_proj(&narrow), point).x.abs();
        let wide_x = project(light_view_proj(&wide), point).x.abs();
        assert!(narrow_x > wide_x);
    }

    #[test]
    fn vertical_light_gets_a_stable_up_vector() {
        let light = Light::directional(Vec3::new(0.0, 1000.0, 0.0), Vec3::ZERO);
        let matrix = light_view_proj(&light);
        assert!(matrix.is_finite());
    }

    #[test]
    fn frustum_corners_roundtrip_an_ortho_volume() {
        let matrix = Mat4::orthographic_rh(-1.0, 1.0, -1.0, 1.0, 1.0, 3.0);
        let corners = frustum_corners(matrix);
        // Near plane corners sit at z = -1, far plane at z = -3.
        for corner in &corners[..4] {
            assert!((corner.z + 1.0).abs() < 1e-4);
        }
        for corner in &corners[4..] {
            assert!((corner.z + 3.0).abs() < 1e-4);
        }
    }

    #[test]
    fn frustum_edges_touch_every_corner() {
        let mut seen = [false; 8];
        for (a, b) in FRUSTUM_EDGES {
            seen[a] = true;
            seen[b] = true;
        }
        assert!(seen.iter().all(|&s| s));
    }
}
