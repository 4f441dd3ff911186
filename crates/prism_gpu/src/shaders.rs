//! WGSL sources for filter passes
//!
//! Filter shaders share one interface:
//! - `@group(0) @binding(0)` uniform block: 3x3 projection + `params`
//! - `@group(0) @binding(1)` input texture, `@binding(2)` its sampler
//! - vertex inputs at locations 0/1/2: position, texture coordinate, color

/// Copies the input region into the output, modulated by the quad color and
/// `params.x` (alpha)
pub const PASSTHROUGH_SHADER: &str = r#"
struct FilterUniforms {
    projection: mat3x3<f32>,
    params: vec4<f32>,
};

@group(0) @binding(0) var<uniform> uniforms: FilterUniforms;
@group(0) @binding(1) var input_texture: texture_2d<f32>;
@group(0) @binding(2) var input_sampler: sampler;

struct VertexOutput {
    @builtin(position) position: vec4<f32>,
    @location(0) uv: vec2<f32>,
    @location(1) color: vec4<f32>,
};

@vertex
fn vs_main(
    @location(0) position: vec2<f32>,
    @location(1) uv: vec2<f32>,
    @location(2) color: vec4<f32>,
) -> VertexOutput {
    var out: VertexOutput;
    let clip = uniforms.projection * vec3<f32>(position, 1.0);
    out.position = vec4<f32>(clip.xy, 0.0, 1.0);
    out.uv = uv;
    out.color = color;
    return out;
}

@fragment
fn fs_main(in: VertexOutput) -> @location(0) vec4<f32> {
    let texel = textureSample(input_texture, input_sampler, in.uv);
    return texel * in.color * uniforms.params.x;
}
"#;
