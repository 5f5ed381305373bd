use crate::atlas::DynamicAtlasManager;
use crate::batch::Batcher;
use crate::node::TransformSource;
use crate::render_data::RenderData;
use crate::sprite::Sprite;

use super::{AssembleError, Assembler, content_bounds, fill_render_data};

/// Two triangles over vertices laid out left-bottom, right-bottom,
/// left-top, right-top.
pub const QUAD_INDICES: [u16; 6] = [0, 1, 2, 1, 3, 2];

/// One quad covering the content rect.
#[derive(Debug, Copy, Clone, Default)]
pub struct Simple;

pub(super) fn write_quad(rd: &mut RenderData, l: f32, b: f32, r: f32, t: f32) {
    let data = rd.data_mut();
    if data.len() < 4 {
        return;
    }
    data[0].x = l;
    data[0].y = b;
    data[1].x = r;
    data[1].y = b;
    data[2].x = l;
    data[2].y = t;
    data[3].x = r;
    data[3].y = t;
}

impl Assembler for Simple {
    type Component = Sprite;

    fn create_data(&self, sprite: &mut Sprite, batcher: &mut Batcher) -> Result<(), AssembleError> {
        sprite.render_data.allocate(batcher, 4, 6)?;
        sprite.render_data.write_index_buffer(&QUAD_INDICES);
        Ok(())
    }

    fn update_render_data(
        &self,
        sprite: &mut Sprite,
        node: &dyn TransformSource,
        batcher: &mut Batcher,
        atlas: Option<&mut DynamicAtlasManager>,
    ) -> Result<(), AssembleError> {
        if let (Some(frame), Some(atlas)) = (sprite.sprite_frame(), atlas) {
            atlas.pack_to_dynamic_atlas(frame);
        }
        self.update_uvs(sprite, batcher)?;

        if sprite.sprite_frame().is_some() && sprite.render_data.vert_dirty() {
            self.update_vertex_data(sprite, node)?;
        }
        Ok(())
    }

    fn update_uvs(&self, sprite: &mut Sprite, batcher: &mut Batcher) -> Result<(), AssembleError> {
        let Some(frame) = sprite.sprite_frame().cloned() else { return Ok(()) };
        let uv = *frame.borrow().uv();
        let corners = [[uv[0], uv[1]], [uv[2], uv[3]], [uv[4], uv[5]], [uv[6], uv[7]]];
        sprite.render_data.write_uvs(batcher, &corners);
        Ok(())
    }

    fn update_vertex_data(&self, sprite: &mut Sprite, node: &dyn TransformSource) -> Result<(), AssembleError> {
        let (mut l, mut b, mut r, mut t) = content_bounds(node);

        if !sprite.trim() {
            if let Some(frame) = sprite.sprite_frame() {
                let frame = frame.borrow();
                let size = node.content_size();
                let original = frame.original_size();
                let scale_x = size.width / original.width;
                let scale_y = size.height / original.height;
                let border = frame.trimmed_border();
                l += border.left * scale_x;
                b += border.bottom * scale_y;
                r += border.right * scale_x;
                t += border.top * scale_y;
            }
        }

        write_quad(&mut sprite.render_data, l, b, r, t);
        sprite.render_data.set_vertex_dirty();
        Ok(())
    }

    fn fill_buffers(&self, sprite: &mut Sprite, node: &dyn TransformSource, batcher: &mut Batcher) {
        fill_render_data(&mut sprite.render_data, &mut sprite.transform_version, node, batcher);
    }

    fn update_color(&self, sprite: &mut Sprite, _node: &dyn TransformSource, batcher: &mut Batcher) {
        // Alpha comes from the color itself, not node opacity.
        let color = sprite.color().to_linear();
        sprite.render_data.write_color(batcher, color);
    }
}
