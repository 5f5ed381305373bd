//! CPU particle vertex generation.
//!
//! Particles are simulated on the CPU and expanded into vertex data in one of
//! two layouts:
//! - non-instanced: four vertex records per particle, each carrying a corner UV
//! - instanced: one record per particle plus a shared four-vertex UV stream
//!
//! Toggling the layout throws away written vertex data; the next
//! [`ParticleVertexWriter::update_render_data`] refills it.

use bytemuck::{Pod, Zeroable};

use crate::batch::MAX_VERTICES_PER_BUFFER;
use crate::coords::{Rgba8, Vec3};
use crate::assembler::QUAD_INDICES;

/// Corner UVs: bottom-left, bottom-right, top-left, top-right.
const CORNER_UVS: [[f32; 2]; 4] = [[0.0, 0.0], [1.0, 0.0], [0.0, 1.0], [1.0, 1.0]];

#[derive(Debug, Copy, Clone, Default, Eq, PartialEq)]
pub enum ParticleRenderMode {
    #[default]
    Billboard,
    /// Billboard stretched along the particle velocity.
    StretchedBillboard,
}

/// Vertex attribute as the particle shader sees it.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum ParticleAttribute {
    Position,
    /// `uv.x, uv.y, frame index`.
    TexCoord,
    Size,
    Rotation,
    Color,
    Velocity,
    /// Instanced position with the frame index in `w`.
    PositionFrame,
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct AttributeDesc {
    pub attribute: ParticleAttribute,
    /// Vertex buffer slot.
    pub stream: u32,
    pub instanced: bool,
}

const fn attr(attribute: ParticleAttribute, stream: u32, instanced: bool) -> AttributeDesc {
    AttributeDesc { attribute, stream, instanced }
}

const ATTRS: [AttributeDesc; 5] = [
    attr(ParticleAttribute::Position, 0, false),
    attr(ParticleAttribute::TexCoord, 0, false),
    attr(ParticleAttribute::Size, 0, false),
    attr(ParticleAttribute::Rotation, 0, false),
    attr(ParticleAttribute::Color, 0, false),
];

const ATTRS_STRETCH: [AttributeDesc; 6] = [
    attr(ParticleAttribute::Position, 0, false),
    attr(ParticleAttribute::TexCoord, 0, false),
    attr(ParticleAttribute::Size, 0, false),
    attr(ParticleAttribute::Rotation, 0, false),
    attr(ParticleAttribute::Color, 0, false),
    attr(ParticleAttribute::Velocity, 0, false),
];

const ATTRS_INS: [AttributeDesc; 5] = [
    attr(ParticleAttribute::PositionFrame, 0, true),
    attr(ParticleAttribute::Size, 0, true),
    attr(ParticleAttribute::Rotation, 0, true),
    attr(ParticleAttribute::Color, 0, true),
    attr(ParticleAttribute::TexCoord, 1, false),
];

const ATTRS_STRETCH_INS: [AttributeDesc; 6] = [
    attr(ParticleAttribute::PositionFrame, 0, true),
    attr(ParticleAttribute::Size, 0, true),
    attr(ParticleAttribute::Rotation, 0, true),
    attr(ParticleAttribute::Color, 0, true),
    attr(ParticleAttribute::Velocity, 0, true),
    attr(ParticleAttribute::TexCoord, 1, false),
];

/// One simulated particle.
#[derive(Debug, Copy, Clone)]
pub struct Particle {
    pub position: Vec3,
    pub velocity: Vec3,
    pub size: Vec3,
    pub rotation: Vec3,
    pub color: Rgba8,
    pub frame_index: f32,
    pub remaining_lifetime: f32,
}

impl Default for Particle {
    fn default() -> Self {
        Self {
            position: Vec3::zero(),
            velocity: Vec3::zero(),
            size: Vec3::new(1.0, 1.0, 1.0),
            rotation: Vec3::zero(),
            color: Rgba8::WHITE,
            frame_index: 0.0,
            remaining_lifetime: 1.0,
        }
    }
}

/// GPU record. Velocity is zero unless the mode is stretched.
#[repr(C)]
#[derive(Debug, Copy, Clone, Default, PartialEq, Pod, Zeroable)]
pub struct ParticleVertex {
    pub position: [f32; 3],
    pub texcoord: [f32; 3],
    pub size: [f32; 3],
    pub rotation: [f32; 3],
    pub color: u32,
    pub velocity: [f32; 3],
}

/// Owns the particle pool and the vertex data expanded from it.
#[derive(Debug)]
pub struct ParticleVertexWriter {
    mode: ParticleRenderMode,
    use_instance: bool,
    capacity: usize,
    particles: Vec<Particle>,
    vertices: Vec<ParticleVertex>,
    indices: Vec<u16>,
    attributes: &'static [AttributeDesc],
}

impl ParticleVertexWriter {
    /// `capacity` is clamped so four vertices per particle stay `u16`-addressable.
    pub fn new(capacity: usize, mode: ParticleRenderMode) -> Self {
        let max = MAX_VERTICES_PER_BUFFER as usize / 4;
        let capacity = capacity.min(max);
        let mut writer = Self {
            mode,
            use_instance: false,
            capacity,
            particles: Vec::with_capacity(capacity),
            vertices: Vec::new(),
            indices: Vec::new(),
            attributes: &ATTRS,
        };
        writer.set_vertex_attributes();
        writer
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    #[inline]
    pub fn particle_count(&self) -> usize {
        self.particles.len()
    }

    #[inline]
    pub fn particles(&self) -> &[Particle] {
        &self.particles
    }

    #[inline]
    pub fn mode(&self) -> ParticleRenderMode {
        self.mode
    }

    #[inline]
    pub fn use_instance(&self) -> bool {
        self.use_instance
    }

    #[inline]
    pub fn attributes(&self) -> &[AttributeDesc] {
        self.attributes
    }

    #[inline]
    pub fn vertices(&self) -> &[ParticleVertex] {
        &self.vertices
    }

    pub fn vertex_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.vertices)
    }

    /// Non-instanced: six per particle. Instanced: the shared quad.
    #[inline]
    pub fn indices(&self) -> &[u16] {
        &self.indices
    }

    /// Per-vertex stream for the instanced layout.
    pub fn instance_uvs(&self) -> [[f32; 3]; 4] {
        CORNER_UVS.map(|[u, v]| [u, v, 0.0])
    }

    /// Records per particle in the current layout.
    #[inline]
    pub fn vertices_per_particle(&self) -> usize {
        if self.use_instance { 1 } else { 4 }
    }

    /// Claims a pooled particle. `None` at capacity.
    pub fn get_free_particle(&mut self) -> Option<&mut Particle> {
        if self.particles.len() >= self.capacity {
            return None;
        }
        self.particles.push(Particle::default());
        self.particles.last_mut()
    }

    pub fn clear(&mut self) {
        self.particles.clear();
        self.vertices.clear();
        self.indices.clear();
    }

    /// Ages, culls and integrates particles. Returns the live count.
    pub fn update_particles(&mut self, dt: f32) -> usize {
        let mut i = 0;
        while i < self.particles.len() {
            let p = &mut self.particles[i];
            p.remaining_lifetime -= dt;
            if p.remaining_lifetime < 0.0 {
                self.particles.swap_remove(i);
                continue;
            }
            p.position = Vec3::new(
                p.position.x + p.velocity.x * dt,
                p.position.y + p.velocity.y * dt,
                p.position.z + p.velocity.z * dt,
            );
            i += 1;
        }
        self.particles.len()
    }

    pub fn set_render_mode(&mut self, mode: ParticleRenderMode) {
        if self.mode != mode {
            self.mode = mode;
            self.set_vertex_attributes();
            self.vertices.clear();
        }
    }

    /// Switches layout. Written vertex data is discarded.
    pub fn set_use_instance(&mut self, value: bool) {
        if self.use_instance == value {
            return;
        }
        self.use_instance = value;
        self.set_vertex_attributes();
        self.vertices.clear();
        self.indices.clear();
        log::debug!("particles: instancing {}", if value { "on" } else { "off" });
    }

    /// Expands every live particle into vertex records.
    pub fn update_render_data(&mut self) {
        self.vertices.clear();
        let stretched = self.mode == ParticleRenderMode::StretchedBillboard;

        for p in &self.particles {
            let base = ParticleVertex {
                position: p.position.to_array(),
                texcoord: [0.0, 0.0, p.frame_index],
                size: p.size.to_array(),
                rotation: p.rotation.to_array(),
                color: p.color.to_u32(),
                velocity: if stretched { p.velocity.to_array() } else { [0.0; 3] },
            };
            if self.use_instance {
                self.vertices.push(base);
            } else {
                for [u, v] in CORNER_UVS {
                    self.vertices.push(ParticleVertex { texcoord: [u, v, p.frame_index], ..base });
                }
            }
        }
        self.rebuild_indices();
    }

    fn rebuild_indices(&mut self) {
        if self.use_instance {
            if self.indices.len() != QUAD_INDICES.len() {
                self.indices.clear();
                self.indices.extend_from_slice(&QUAD_INDICES);
            }
            return;
        }
        let wanted = self.particles.len() * QUAD_INDICES.len();
        if self.indices.len() == wanted {
            return;
        }
        self.indices.clear();
        for i in 0..self.particles.len() {
            let base = (i * 4) as u16;
            self.indices.extend(QUAD_INDICES.iter().map(|&k| base + k));
        }
    }

    fn set_vertex_attributes(&mut self) {
        self.attributes = match (self.use_instance, self.mode) {
            (false, ParticleRenderMode::Billboard) => &ATTRS,
            (false, ParticleRenderMode::StretchedBillboard) => &ATTRS_STRETCH,
            (true, ParticleRenderMode::Billboard) => &ATTRS_INS,
            (true, ParticleRenderMode::StretchedBillboard) => &ATTRS_STRETCH_INS,
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spawn(w: &mut ParticleVertexWriter, n: usize) {
        for i in 0..n {
            let p = w.get_free_particle().unwrap();
            p.position = Vec3::new(i as f32, 0.0, 0.0);
            p.velocity = Vec3::new(0.0, 2.0, 0.0);
        }
    }

    // ── layout ────────────────────────────────────────────────────────────

    #[test]
    fn non_instanced_writes_four_corners() {
        let mut w = ParticleVertexWriter::new(8, ParticleRenderMode::Billboard);
        spawn(&mut w, 2);
        w.update_render_data();

        assert_eq!(w.vertices().len(), 8);
        let uvs: Vec<[f32; 2]> = w.vertices()[..4].iter().map(|v| [v.texcoord[0], v.texcoord[1]]).collect();
        assert_eq!(uvs, CORNER_UVS.to_vec());
        assert_eq!(w.vertices()[4].position, [1.0, 0.0, 0.0]);
        assert_eq!(&w.indices()[6..12], &[4, 5, 6, 5, 7, 6]);
    }

    #[test]
    fn instancing_toggle_switches_layout() {
        let mut w = ParticleVertexWriter::new(8, ParticleRenderMode::Billboard);
        spawn(&mut w, 3);
        w.update_render_data();

        w.set_use_instance(true);
        assert!(w.vertices().is_empty());
        assert!(w.attributes().iter().any(|a| a.instanced));
        w.update_render_data();
        assert_eq!(w.vertices().len(), 3);
        assert_eq!(w.indices(), &QUAD_INDICES);

        w.set_use_instance(false);
        w.update_render_data();
        assert_eq!(w.vertices().len(), 12);
        assert_eq!(w.indices().len(), 18);
        assert!(w.attributes().iter().all(|a| !a.instanced));
    }

    #[test]
    fn stretched_mode_carries_velocity() {
        let mut w = ParticleVertexWriter::new(4, ParticleRenderMode::StretchedBillboard);
        spawn(&mut w, 1);
        w.update_render_data();
        assert!(w.vertices().iter().all(|v| v.velocity == [0.0, 2.0, 0.0]));
        assert!(w.attributes().iter().any(|a| a.attribute == ParticleAttribute::Velocity));

        w.set_render_mode(ParticleRenderMode::Billboard);
        w.update_render_data();
        assert!(w.vertices().iter().all(|v| v.velocity == [0.0; 3]));
    }

    #[test]
    fn vertex_bytes_match_record_size() {
        let mut w = ParticleVertexWriter::new(4, ParticleRenderMode::Billboard);
        spawn(&mut w, 1);
        w.update_render_data();
        assert_eq!(w.vertex_bytes().len(), 4 * std::mem::size_of::<ParticleVertex>());
    }

    // ── pool ──────────────────────────────────────────────────────────────

    #[test]
    fn pool_is_bounded_by_capacity() {
        let mut w = ParticleVertexWriter::new(2, ParticleRenderMode::Billboard);
        spawn(&mut w, 2);
        assert!(w.get_free_particle().is_none());
    }

    #[test]
    fn capacity_clamped_to_index_range() {
        let w = ParticleVertexWriter::new(1 << 20, ParticleRenderMode::Billboard);
        assert!(w.capacity() * 4 <= MAX_VERTICES_PER_BUFFER as usize);
    }

    #[test]
    fn expired_particles_are_culled() {
        let mut w = ParticleVertexWriter::new(4, ParticleRenderMode::Billboard);
        spawn(&mut w, 2);
        let p = w.get_free_particle().unwrap();
        p.remaining_lifetime = 5.0;
        p.velocity = Vec3::new(0.0, 2.0, 0.0);
        assert_eq!(w.update_particles(2.0), 1);
        assert_eq!(w.particles()[0].position.y, 4.0);
    }
}
