use crate::atlas::DynamicAtlasManager;
use crate::batch::Batcher;
use crate::node::TransformSource;
use crate::sprite::Sprite;

use super::{AssembleError, Assembler, content_bounds, fill_render_data};

const GRID: usize = 4;

const fn grid_indices() -> [u16; 54] {
    let mut out = [0u16; 54];
    let mut i = 0;
    let mut row = 0;
    while row < GRID - 1 {
        let mut col = 0;
        while col < GRID - 1 {
            let vid = (row * GRID + col) as u16;
            let up = GRID as u16;
            out[i] = vid;
            out[i + 1] = vid + 1;
            out[i + 2] = vid + up;
            out[i + 3] = vid + 1;
            out[i + 4] = vid + 1 + up;
            out[i + 5] = vid + up;
            i += 6;
            col += 1;
        }
        row += 1;
    }
    out
}

/// Nine quads over the 4×4 vertex grid, row-major from the bottom.
pub const SLICED_INDICES: [u16; 54] = grid_indices();

/// 9-slice sprite: corners keep their size, edges stretch along one axis,
/// the center stretches along both.
#[derive(Debug, Copy, Clone, Default)]
pub struct Sliced;

/// Border scale: shrink the caps when they do not fit, never grow them.
fn border_scale(extent: f32, caps: f32) -> f32 {
    let scale = extent / caps;
    if !scale.is_finite() || scale > 1.0 { 1.0 } else { scale }
}

impl Assembler for Sliced {
    type Component = Sprite;

    fn create_data(&self, sprite: &mut Sprite, batcher: &mut Batcher) -> Result<(), AssembleError> {
        sprite.render_data.allocate(batcher, 16, 54)?;
        sprite.render_data.write_index_buffer(&SLICED_INDICES);
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
        let uv = *frame.borrow().uv_sliced();
        sprite.render_data.write_uvs(batcher, &uv);
        Ok(())
    }

    fn update_vertex_data(&self, sprite: &mut Sprite, node: &dyn TransformSource) -> Result<(), AssembleError> {
        let Some(frame) = sprite.sprite_frame() else { return Ok(()) };
        let insets = frame.borrow().insets();

        let size = node.content_size();
        let (l, b, r, t) = content_bounds(node);

        let sizable_w = (size.width - insets.left - insets.right).max(0.0);
        let sizable_h = (size.height - insets.top - insets.bottom).max(0.0);
        let x_scale = border_scale(size.width, insets.left + insets.right);
        let y_scale = border_scale(size.height, insets.top + insets.bottom);

        let x1 = insets.left * x_scale + l;
        let y1 = insets.bottom * y_scale + b;
        let xs = [l, x1, x1 + sizable_w, r];
        let ys = [b, y1, y1 + sizable_h, t];

        let data = sprite.render_data.data_mut();
        for (i, v) in data.iter_mut().take(GRID * GRID).enumerate() {
            v.x = xs[i % GRID];
            v.y = ys[i / GRID];
        }
        sprite.render_data.set_vertex_dirty();
        Ok(())
    }

    fn fill_buffers(&self, sprite: &mut Sprite, node: &dyn TransformSource, batcher: &mut Batcher) {
        fill_render_data(&mut sprite.render_data, &mut sprite.transform_version, node, batcher);
    }

    fn update_color(&self, sprite: &mut Sprite, node: &dyn TransformSource, batcher: &mut Batcher) {
        let color = sprite.color().to_linear_with_alpha(node.opacity());
        sprite.render_data.write_color(batcher, color);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::batch::{COLOR_OFFSET, FLOAT_STRIDE};
    use crate::coords::{Rect, Size};
    use crate::node::UiNode;
    use crate::sprite::{Insets, SpriteFrame, SpriteType, Texture2D};

    fn sliced_sprite(insets: Insets) -> Sprite {
        let mut frame = SpriteFrame::with_rect(
            Texture2D::new(100, 100),
            Rect::new(0.0, 0.0, 100.0, 100.0),
            false,
        );
        frame.set_insets(insets);
        let mut s = Sprite::new(frame.into_shared());
        s.set_type(SpriteType::Sliced);
        s
    }

    fn xs(s: &Sprite) -> Vec<f32> {
        s.render_data().data()[..4].iter().map(|v| v.x).collect()
    }

    // ── indices ───────────────────────────────────────────────────────────

    #[test]
    fn index_pattern_covers_nine_quads() {
        assert_eq!(&SLICED_INDICES[..6], &[0, 1, 4, 1, 5, 4]);
        assert_eq!(&SLICED_INDICES[48..], &[10, 11, 14, 11, 15, 14]);
        assert!(SLICED_INDICES.iter().all(|&i| i < 16));
    }

    // ── border scaling ────────────────────────────────────────────────────

    #[test]
    fn borders_keep_size_when_they_fit() {
        let mut batcher = Batcher::default();
        let node = UiNode::new(Size::new(200.0, 200.0));
        let mut s = sliced_sprite(Insets::new(10.0, 10.0, 20.0, 10.0));
        s.update(&node, &mut batcher, None).unwrap();
        assert_eq!(xs(&s), vec![-100.0, -90.0, 80.0, 100.0]);
    }

    #[test]
    fn oversized_borders_shrink_to_content() {
        let mut batcher = Batcher::default();
        let node = UiNode::new(Size::new(50.0, 100.0));
        let mut s = sliced_sprite(Insets::new(40.0, 0.0, 40.0, 0.0));
        s.update(&node, &mut batcher, None).unwrap();
        // caps scaled by 50/80, center collapsed to zero width
        assert_eq!(xs(&s), vec![-25.0, 0.0, 0.0, 25.0]);
    }

    #[test]
    fn zero_insets_do_not_produce_nan() {
        assert_eq!(border_scale(0.0, 0.0), 1.0);
        assert_eq!(border_scale(50.0, 0.0), 1.0);
        // oversized caps shrink proportionally rather than clamping to 1,
        // so the borders still meet at the center
        assert_eq!(border_scale(50.0, 80.0), 0.625);

        let mut batcher = Batcher::default();
        let node = UiNode::new(Size::new(100.0, 100.0));
        let mut s = sliced_sprite(Insets::default());
        s.update(&node, &mut batcher, None).unwrap();
        assert!(s.render_data().data().iter().all(|v| v.x.is_finite() && v.y.is_finite()));
    }

    #[test]
    fn negative_size_with_zero_insets_stays_finite() {
        assert_eq!(border_scale(-20.0, 0.0), 1.0);

        let mut batcher = Batcher::default();
        let node = UiNode::new(Size::new(-20.0, 10.0));
        let mut s = sliced_sprite(Insets::default());
        s.update(&node, &mut batcher, None).unwrap();
        assert!(s.render_data().data().iter().all(|v| v.x.is_finite() && v.y.is_finite()));
        assert_eq!(xs(&s), vec![10.0, 10.0, 10.0, -10.0]);
    }

    #[test]
    fn grid_rows_share_y() {
        let mut batcher = Batcher::default();
        let node = UiNode::new(Size::new(100.0, 100.0));
        let mut s = sliced_sprite(Insets::new(10.0, 10.0, 10.0, 20.0));
        s.update(&node, &mut batcher, None).unwrap();
        let d = s.render_data().data();
        for row in 0..4 {
            let y = d[row * 4].y;
            assert!(d[row * 4..row * 4 + 4].iter().all(|v| v.y == y));
        }
        assert_eq!(d[4].y, -30.0);
    }

    #[test]
    fn shared_frame_insets_rebuild_geometry() {
        let mut batcher = Batcher::default();
        let node = UiNode::new(Size::new(100.0, 100.0));
        let mut s = sliced_sprite(Insets::default());
        s.update(&node, &mut batcher, None).unwrap();
        s.fill(&node, &mut batcher);
        assert_eq!(xs(&s), vec![-50.0, -50.0, 50.0, 50.0]);

        let frame = s.sprite_frame().cloned().unwrap();
        frame.borrow_mut().set_insets(Insets::new(10.0, 10.0, 10.0, 10.0));
        s.update(&node, &mut batcher, None).unwrap();
        assert_eq!(xs(&s), vec![-50.0, -40.0, 40.0, 50.0]);
    }

    // ── uv / color ────────────────────────────────────────────────────────

    #[test]
    fn uvs_follow_sliced_table() {
        let mut batcher = Batcher::default();
        let node = UiNode::default();
        let mut s = sliced_sprite(Insets::new(10.0, 10.0, 10.0, 10.0));
        s.update(&node, &mut batcher, None).unwrap();
        let expected = *s.sprite_frame().unwrap().borrow().uv_sliced();
        let got: Vec<[f32; 2]> = s.render_data().data().iter().map(|v| [v.u, v.v]).collect();
        assert_eq!(got, expected.to_vec());
    }

    #[test]
    fn alpha_comes_from_node_opacity() {
        let mut batcher = Batcher::default();
        let mut node = UiNode::default();
        node.set_opacity(0.5);
        let mut s = sliced_sprite(Insets::default());
        s.update(&node, &mut batcher, None).unwrap();
        let chunk = s.render_data().chunk().unwrap();
        let vb = batcher.vertices(chunk).unwrap();
        for record in vb.chunks_exact(FLOAT_STRIDE) {
            assert_eq!(record[COLOR_OFFSET + 3], 0.5);
        }
    }

    #[test]
    fn opacity_change_refreshes_color() {
        let mut batcher = Batcher::default();
        let mut node = UiNode::default();
        let mut s = sliced_sprite(Insets::default());
        s.update(&node, &mut batcher, None).unwrap();
        node.set_opacity(0.25);
        s.update(&node, &mut batcher, None).unwrap();
        assert_eq!(s.render_data().data()[15].color.a, 0.25);
    }
}
