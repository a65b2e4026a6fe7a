/// WGSL matcap shader for instanced meshes.
///
/// The view-space normal picks a texel from the matcap sphere image; no scene
/// lights are involved. Back faces flip their normal so open or inverted
/// geometry still shades.
pub const MATCAP_SHADER: &str = r#"
struct Camera {
    view_proj: mat4x4<f32>,
    view: mat4x4<f32>,
};

@group(0) @binding(0)
var<uniform> camera: Camera;

@group(1) @binding(0)
var matcap_texture: texture_2d<f32>;
@group(1) @binding(1)
var matcap_sampler: sampler;

struct VertexInput {
    @location(0) position: vec3<f32>,
    @location(1) normal: vec3<f32>,
};

struct InstanceInput {
    @location(2) model_0: vec4<f32>,
    @location(3) model_1: vec4<f32>,
    @location(4) model_2: vec4<f32>,
    @location(5) model_3: vec4<f32>,
};

struct VertexOutput {
    @builtin(position) clip_position: vec4<f32>,
    @location(0) view_normal: vec3<f32>,
    @location(1) to_eye: vec3<f32>,
};

@vertex
fn vs_main(vertex: VertexInput, instance: InstanceInput) -> VertexOutput {
    let model = mat4x4<f32>(
        instance.model_0,
        instance.model_1,
        instance.model_2,
        instance.model_3,
    );
    let world_pos = model * vec4<f32>(vertex.position, 1.0);
    let view_pos = camera.view * world_pos;

    var out: VertexOutput;
    out.clip_position = camera.view_proj * world_pos;
    out.view_normal = (camera.view * model * vec4<f32>(vertex.normal, 0.0)).xyz;
    out.to_eye = -view_pos.xyz;
    return out;
}

@fragment
fn fs_main(in: VertexOutput, @builtin(front_facing) front: bool) -> @location(0) vec4<f32> {
    var n = normalize(in.view_normal);
    if (!front) {
        n = -n;
    }
    let view_dir = normalize(in.to_eye);
    let x = normalize(vec3<f32>(view_dir.z, 0.0, -view_dir.x));
    let y = cross(view_dir, x);
    let uv = vec2<f32>(dot(x, n), dot(y, n)) * 0.495 + 0.5;
    let color = textureSample(matcap_texture, matcap_sampler, vec2<f32>(uv.x, 1.0 - uv.y));
    return vec4<f32>(color.rgb, 1.0);
}
"#;
