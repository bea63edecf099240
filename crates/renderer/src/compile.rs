use std::borrow::Cow;

use wgpu::naga::ShaderStage;

/// Compiles the per-point interpolation vertex program.
pub(crate) fn compile_vertex_shader(device: &wgpu::Device) -> wgpu::ShaderModule {
    device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some("pixel sort vertex"),
        source: wgpu::ShaderSource::Glsl {
            shader: Cow::Borrowed(VERTEX_SHADER_GLSL),
            stage: ShaderStage::Vertex,
            defines: &[],
        },
    })
}

/// Compiles the fragment program that writes each point's source color.
pub(crate) fn compile_fragment_shader(device: &wgpu::Device) -> wgpu::ShaderModule {
    device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some("pixel sort fragment"),
        source: wgpu::ShaderSource::Glsl {
            shader: Cow::Borrowed(FRAGMENT_SHADER_GLSL),
            stage: ShaderStage::Fragment,
            defines: &[],
        },
    })
}

/// Vertex program shared by every point.
///
/// The uniform block layout must match `SortUniforms` in `gpu/uniforms.rs`.
/// `a_color.a` carries the 1-based original grid index, not alpha; the
/// reconstruction below must stay identical to `encode::past_position`.
/// Points are drawn at 1px: wgpu fixes the point size, so `gl_PointSize` is
/// never written.
pub(crate) const VERTEX_SHADER_GLSL: &str = r"#version 450
layout(location = 0) in vec2 a_position;
layout(location = 1) in vec4 a_color;
layout(location = 0) out vec4 v_color;

layout(std140, set = 0, binding = 0) uniform SortParams {
    vec2 u_aspectRatio;
    vec2 u_grid;
    float u_phase;
} params;

void main() {
    v_color = a_color;
    float w = params.u_grid.x;
    float h = params.u_grid.y;
    float i = a_color.a;
    float x = 2.0 * mod(i, w) / w - 1.0;
    float y = -(2.0 * ceil(i / w) / h - 1.0);
    vec2 past_pos = vec2(x, y);
    vec2 ar = params.u_aspectRatio / max(params.u_aspectRatio.x, params.u_aspectRatio.y);
    vec2 pos = mix(past_pos, a_position, params.u_phase);
    gl_Position = vec4(pos * ar, 1.0, 1.0);
    // Point size is fixed at 1.0 by wgpu's PointList rasterisation.
}
";

pub(crate) const FRAGMENT_SHADER_GLSL: &str = r"#version 450
layout(location = 0) in vec4 v_color;
layout(location = 0) out vec4 o_color;

void main() {
    o_color = vec4(v_color.rgb / 255.0, 1.0);
}
";
