//! WGSL sources. The transport kernel mirrors `update_node` term for term,
//! including the summation order of the Laplacian and the clamp order.

use bf_mesh::WGSL_NODE_INDEX;

const TRANSPORT_HEAD: &str = r#"
struct Params {
    nr: u32,
    ntheta: u32,
    nz: u32,
    interior: u32,
    flags: u32,
    slot_count: u32,
    _pad0: u32,
    _pad1: u32,
    dt: f32,
    t_min: f32,
    t_max: f32,
    max_delta: f32,
}

@group(0) @binding(0) var<uniform> params: Params;
@group(0) @binding(1) var<storage, read> temp_in: array<f32>;
@group(0) @binding(2) var<storage, read_write> temp_out: array<f32>;
// radial[3nr] angular[nr] r_minus[nr] r_plus[nr] arc[nr] axial[3nz] z_minus[nz] z_plus[nz]
@group(0) @binding(3) var<storage, read> geometry: array<f32>;
// alpha[n] dispersion[n] vr[n] vtheta[n] vz[n]
@group(0) @binding(4) var<storage, read> node_coeffs: array<f32>;
@group(0) @binding(5) var<storage, read_write> slots: array<atomic<u32>>;
"#;

const TRANSPORT_BODY: &str = r#"
const ADVECTION: u32 = 1u;
const DISPERSION: u32 = 2u;

fn upwind(v: f32, t: f32, t_minus: f32, t_plus: f32, h_minus: f32, h_plus: f32) -> f32 {
    if (v > 0.0) {
        return -v * (t - t_minus) / h_minus;
    }
    return -v * (t_plus - t) / h_plus;
}

@compute @workgroup_size(64)
fn transport_step(
    @builtin(global_invocation_id) gid: vec3<u32>,
    @builtin(num_workgroups) nwg: vec3<u32>,
) {
    let n = gid.x + gid.y * nwg.x * 64u;
    if (n >= params.interior) {
        return;
    }
    let nr = params.nr;
    let nz = params.nz;
    let inz = nz - 2u;
    let k = n % inz + 1u;
    let rest = n / inz;
    let j = rest % params.ntheta;
    let i = rest / params.ntheta + 1u;
    let jp = (j + 1u) % params.ntheta;
    let jm = (j + params.ntheta - 1u) % params.ntheta;

    let idx = node_index(i, j, k);
    let t = temp_in[idx];
    let t_rm = temp_in[node_index(i - 1u, j, k)];
    let t_rp = temp_in[node_index(i + 1u, j, k)];
    let t_jm = temp_in[node_index(i, jm, k)];
    let t_jp = temp_in[node_index(i, jp, k)];
    let t_zm = temp_in[node_index(i, j, k - 1u)];
    let t_zp = temp_in[node_index(i, j, k + 1u)];

    let rc = 3u * i;
    let zc = 7u * nr + 3u * k;
    let lap = geometry[rc] * (t_rm - t)
        + geometry[rc + 2u] * (t_rp - t)
        + geometry[3u * nr + i] * ((t_jp - t) + (t_jm - t))
        + geometry[zc] * (t_zm - t)
        + geometry[zc + 2u] * (t_zp - t);

    let count = nr * params.ntheta * nz;
    var rate = node_coeffs[idx] * lap;
    if ((params.flags & DISPERSION) != 0u) {
        rate = rate + node_coeffs[count + idx] * lap;
    }
    if ((params.flags & ADVECTION) != 0u) {
        let arc = geometry[6u * nr + i];
        rate = rate + upwind(node_coeffs[2u * count + idx], t, t_rm, t_rp,
            geometry[4u * nr + i], geometry[5u * nr + i]);
        rate = rate + upwind(node_coeffs[3u * count + idx], t, t_jm, t_jp, arc, arc);
        rate = rate + upwind(node_coeffs[4u * count + idx], t, t_zm, t_zp,
            geometry[7u * nr + 3u * nz + k], geometry[7u * nr + 4u * nz + k]);
    }

    let delta = clamp(params.dt * rate, -params.max_delta, params.max_delta);
    let t_new = clamp(t + delta, params.t_min, params.t_max);
    temp_out[idx] = t_new;
    // non-negative floats order the same as their bit patterns
    atomicMax(&slots[idx % params.slot_count], bitcast<u32>(abs(t_new - t)));
}
"#;

pub const REDUCE_SHADER: &str = r#"
@group(0) @binding(0) var<storage, read> slot_bits: array<u32>;
@group(0) @binding(1) var<storage, read_write> result: array<f32>;

var<workgroup> partial: array<f32, 256>;

@compute @workgroup_size(256)
fn reduce_max(@builtin(local_invocation_index) lid: u32) {
    partial[lid] = bitcast<f32>(slot_bits[lid]);
    workgroupBarrier();
    for (var stride = 128u; stride > 0u; stride = stride / 2u) {
        if (lid < stride) {
            partial[lid] = max(partial[lid], partial[lid + stride]);
        }
        workgroupBarrier();
    }
    if (lid == 0u) {
        result[0] = partial[0];
    }
}
"#;

pub fn transport_shader() -> String {
    let mut src = String::with_capacity(TRANSPORT_HEAD.len() + TRANSPORT_BODY.len() + 128);
    src.push_str(TRANSPORT_HEAD);
    src.push_str(WGSL_NODE_INDEX);
    src.push_str(TRANSPORT_BODY);
    src
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transport_shader_embeds_shared_index() {
        let src = transport_shader();
        assert!(src.contains("fn node_index"));
        assert!(src.contains("fn transport_step"));
    }

    #[test]
    fn reduce_width_matches_slot_count() {
        assert_eq!(crate::REDUCTION_SLOTS, 256);
        assert!(REDUCE_SHADER.contains("@workgroup_size(256)"));
    }
}
