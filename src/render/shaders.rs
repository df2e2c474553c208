//! WGSL sources for the three pipelines.

/// Depth-only pass from a light's point of view. No fragment stage; only
/// the depth attachment is written.
pub(crate) const SHADOW_SHADER: &str = r#"
struct ShadowPassUniform {
    view_proj: mat4x4<f32>,
}

struct ObjectConstants {
    model: mat4x4<f32>,
    normal: mat3x4<f32>,
    ambient: vec4<f32>,
    diffuse: vec4<f32>,
    specular: vec4<f32>,
    flags: vec4<f32>,
}

@group(0) @binding(0)
var<uniform> shadow_pass: ShadowPassUniform;

@group(1) @binding(0)
var<uniform> object: ObjectConstants;

@vertex
fn vs_main(@location(0) position: vec3<f32>) -> @builtin(position) vec4<f32> {
    return shadow_pass.view_proj * object.model * vec4<f32>(position, 1.0);
}
"#;

/// Forward Blinn-Phong pass with PCF shadow sampling from the atlas.
pub(crate) const FORWARD_SHADER: &str = r#"
struct GlobalUniform {
    view_proj: mat4x4<f32>,
    camera_position: vec4<f32>,
    counts: vec4<u32>,
}

struct LightUniform {
    view_proj: mat4x4<f32>,
    // xyz position, w kind (0 directional, 1 spot)
    position_kind: vec4<f32>,
    // xyz direction, w cos of the half cone angle
    direction_cone: vec4<f32>,
    // rgb diffuse, w spot concentration
    diffuse: vec4<f32>,
    specular: vec4<f32>,
    // rgb ambient, w enabled
    ambient: vec4<f32>,
    // bias, normal bias, sample radius in texels, strength
    shadow_a: vec4<f32>,
    // casts flag, map resolution, filter kernel radius, unused
    shadow_b: vec4<f32>,
}

struct LightArray {
    data: array<LightUniform, 4>,
}

struct ObjectConstants {
    model: mat4x4<f32>,
    normal: mat3x4<f32>,
    ambient: vec4<f32>,
    diffuse: vec4<f32>,
    // rgb specular, w shininess
    specular: vec4<f32>,
    // x: unlit
    flags: vec4<f32>,
}

@group(0) @binding(0)
var<uniform> globals: GlobalUniform;

@group(0) @binding(1)
var<uniform> lights: LightArray;

@group(0) @binding(2)
var shadow_maps: texture_depth_2d_array;

@group(0) @binding(3)
var shadow_sampler: sampler_comparison;

@group(1) @binding(0)
var<uniform> object: ObjectConstants;

struct VertexInput {
    @location(0) position: vec3<f32>,
    @location(1) normal: vec3<f32>,
}

struct VertexOutput {
    @builtin(position) position: vec4<f32>,
    @location(0) world_pos: vec3<f32>,
    @location(1) normal: vec3<f32>,
}

@vertex
fn vs_main(input: VertexInput) -> VertexOutput {
    var out: VertexOutput;
    let world_position = object.model * vec4<f32>(input.position, 1.0);
    out.position = globals.view_proj * world_position;
    out.world_pos = world_position.xyz;

    let world_normal = mat3x3<f32>(
        object.normal[0].xyz,
        object.normal[1].xyz,
        object.normal[2].xyz
    ) * input.normal;
    out.normal = world_normal;
    return out;
}

fn shadow_factor(light: LightUniform, index: i32, world_pos: vec3<f32>, normal: vec3<f32>) -> f32 {
    if (light.shadow_b.x < 0.5) {
        return 1.0;
    }
    let biased = world_pos + normal * light.shadow_a.y;
    let clip = light.view_proj * vec4<f32>(biased, 1.0);
    if (clip.w <= 0.0) {
        return 1.0;
    }
    let ndc = clip.xyz / clip.w;
    if (abs(ndc.x) > 1.0 || abs(ndc.y) > 1.0 || ndc.z < 0.0 || ndc.z > 1.0) {
        return 1.0;
    }
    let uv = ndc.xy * vec2<f32>(0.5, -0.5) + vec2<f32>(0.5, 0.5);
    let depth_ref = ndc.z - light.shadow_a.x;
    let texel = light.shadow_a.z / light.shadow_b.y;
    let radius = i32(light.shadow_b.z);

    var sum = 0.0;
    var taps = 0.0;
    for (var dy = -radius; dy <= radius; dy = dy + 1) {
        for (var dx = -radius; dx <= radius; dx = dx + 1) {
            let offset = vec2<f32>(f32(dx), f32(dy)) * texel;
            sum = sum + textureSampleCompareLevel(
                shadow_maps, shadow_sampler, uv + offset, index, depth_ref);
            taps = taps + 1.0;
        }
    }
    let lit = sum / taps;
    return mix(1.0, lit, light.shadow_a.w);
}

@fragment
fn fs_main(input: VertexOutput) -> @location(0) vec4<f32> {
    if (object.flags.x > 0.5) {
        return vec4<f32>(object.diffuse.rgb, 1.0);
    }

    let n = normalize(input.normal);
    let view_dir = normalize(globals.camera_position.xyz - input.world_pos);
    var color = vec3<f32>(0.0);

    for (var i = 0u; i < globals.counts.x; i = i + 1u) {
        let light = lights.data[i];
        if (light.ambient.w < 0.5) {
            continue;
        }
        color = color + light.ambient.rgb * object.ambient.rgb;

        var l: vec3<f32>;
        var attenuation = 1.0;
        let spot_dir = normalize(light.direction_cone.xyz);
        if (light.position_kind.w < 0.5) {
            l = -spot_dir;
        } else {
            l = normalize(light.position_kind.xyz - input.world_pos);
            let cone = dot(-l, spot_dir);
            let cutoff = light.direction_cone.w;
            if (cone <= cutoff) {
                continue;
            }
            attenuation = pow(max(cone, 0.0), light.diffuse.w)
                * smoothstep(cutoff, mix(cutoff, 1.0, 0.2), cone);
        }

        let ndotl = max(dot(n, l), 0.0);
        if (ndotl <= 0.0) {
            continue;
        }
        let half_dir = normalize(l + view_dir);
        let spec = pow(max(dot(n, half_dir), 0.0), max(object.specular.w, 1.0));
        let shadow = shadow_factor(light, i32(i), input.world_pos, n);
        color = color + shadow * attenuation
            * (ndotl * light.diffuse.rgb * object.diffuse.rgb
                + spec * light.specular.rgb * object.specular.rgb);
    }

    return vec4<f32>(color, 1.0);
}
"#;

/// Flat-colored line list for the shadow frustum wireframes.
pub(crate) const LINE_SHADER: &str = r#"
struct LineUniform {
    view_proj: mat4x4<f32>,
    color: vec4<f32>,
}

@group(0) @binding(0)
var<uniform> line_globals: LineUniform;

@vertex
fn vs_main(@location(0) position: vec3<f32>) -> @builtin(position) vec4<f32> {
    return line_globals.view_proj * vec4<f32>(position, 1.0);
}

@fragment
fn fs_main() -> @location(0) vec4<f32> {
    return line_globals.color;
}
"#;
