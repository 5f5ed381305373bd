use crate::atlas::DynamicAtlasManager;
use crate::batch::Batcher;
use crate::node::TransformSource;
use crate::sprite::{FillType, Sprite};

use super::simple::write_quad;
use super::{AssembleError, Assembler, content_bounds, fill_render_data};

const BAR_INDICES: [u16; 6] = [0, 1, 2, 2, 1, 3];

/// Progress-bar sprite: one quad clipped along a single axis.
#[derive(Debug, Copy, Clone, Default)]
pub struct BarFilled;

/// Normalizes `(fill_start, fill_range)` into `start <= end` within `[0, 1]`.
///
/// A negative range extends backward from `start`.
pub fn normalize_fill(start: f32, range: f32) -> (f32, f32) {
    let (mut start, mut range) = (start, range);
    if range < 0.0 {
        start += range;
        range = -range;
    }
    let end = (start + range).clamp(0.0, 1.0);
    let start = start.clamp(0.0, 1.0);
    let range = (end - start).max(0.0);
    (start, (start + range).min(1.0))
}

impl Assembler for BarFilled {
    type Component = Sprite;

    fn create_data(&self, sprite: &mut Sprite, batcher: &mut Batcher) -> Result<(), AssembleError> {
        sprite.render_data.allocate(batcher, 4, 6)?;
        sprite.render_data.write_index_buffer(&BAR_INDICES);
        for v in sprite.render_data.data_mut() {
            v.z = 0.0;
        }
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
        if sprite.sprite_frame().is_none() || !sprite.render_data.vert_dirty() {
            return Ok(());
        }

        let result = self
            .update_uvs(sprite, batcher)
            .and_then(|()| self.update_vertex_data(sprite, node));
        if let Err(err) = &result {
            log::error!("bar filled sprite: {err}");
        }
        result
    }

    fn update_uvs(&self, sprite: &mut Sprite, batcher: &mut Batcher) -> Result<(), AssembleError> {
        let Some(frame) = sprite.sprite_frame().cloned() else { return Ok(()) };
        let (start, end) = normalize_fill(sprite.fill_start(), sprite.fill_range());

        let q = {
            let frame = frame.borrow();
            let tw = frame.texture().width().max(1) as f32;
            let th = frame.texture().height().max(1) as f32;
            let r = frame.rect();
            if frame.rotated() {
                let ul = r.x / tw;
                let vb = (r.y + r.width) / th;
                let ur = (r.x + r.height) / tw;
                let vt = r.y / th;
                [ul, vt, ul, vb, ur, vt, ur, vb]
            } else {
                let ul = r.x / tw;
                let vb = (r.y + r.height) / th;
                let ur = (r.x + r.width) / tw;
                let vt = r.y / th;
                [ul, vb, ur, vb, ul, vt, ur, vt]
            }
        };

        let lerp = |a: usize, b: usize, t: f32| [q[a] + (q[b] - q[a]) * t, q[a + 1] + (q[b + 1] - q[a + 1]) * t];
        let uvs = match sprite.fill_type() {
            FillType::Horizontal => [lerp(0, 2, start), lerp(0, 2, end), lerp(4, 6, start), lerp(4, 6, end)],
            FillType::Vertical => [lerp(0, 4, start), lerp(2, 6, start), lerp(0, 4, end), lerp(2, 6, end)],
            other => return Err(AssembleError::UnsupportedFillType(other)),
        };
        sprite.render_data.write_uvs(batcher, &uvs);
        Ok(())
    }

    fn update_vertex_data(&self, sprite: &mut Sprite, node: &dyn TransformSource) -> Result<(), AssembleError> {
        let (start, end) = normalize_fill(sprite.fill_start(), sprite.fill_range());
        let (mut l, mut b, mut r, mut t) = content_bounds(node);

        match sprite.fill_type() {
            FillType::Horizontal => {
                let (from, to) = (l + (r - l) * start, l + (r - l) * end);
                l = from;
                r = to;
            }
            FillType::Vertical => {
                let (from, to) = (b + (t - b) * start, b + (t - b) * end);
                b = from;
                t = to;
            }
            other => return Err(AssembleError::UnsupportedFillType(other)),
        }

        write_quad(&mut sprite.render_data, l, b, r, t);
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
    use crate::atlas::AtlasConfig;
    use crate::coords::{Rect, Size};
    use crate::node::UiNode;
    use crate::sprite::{SpriteFrame, SpriteType, Texture2D};

    fn bar(fill_type: FillType, start: f32, range: f32) -> Sprite {
        let frame = SpriteFrame::new(Texture2D::new(100, 100));
        let mut s = Sprite::new(frame.into_shared());
        s.set_type(SpriteType::Filled);
        s.set_fill_type(fill_type);
        s.set_fill_start(start);
        s.set_fill_range(range);
        s
    }

    fn uvs(s: &Sprite) -> Vec<[f32; 2]> {
        s.render_data().data().iter().map(|v| [v.u, v.v]).collect()
    }

    // ── normalization ─────────────────────────────────────────────────────

    #[test]
    fn fill_normalization() {
        assert_eq!(normalize_fill(0.0, 0.5), (0.0, 0.5));
        assert_eq!(normalize_fill(0.5, -0.25), (0.25, 0.5));
        assert_eq!(normalize_fill(0.8, 0.5), (0.8, 1.0));
        assert_eq!(normalize_fill(-0.5, 0.25), (0.0, 0.0));
        assert_eq!(normalize_fill(0.25, -1.0), (0.0, 0.25));
        assert_eq!(normalize_fill(1.5, 1.0), (1.0, 1.0));
    }

    #[test]
    fn normalized_fill_is_ordered_and_bounded() {
        for &s in &[-2.0f32, -0.3, 0.0, 0.4, 1.0, 3.0] {
            for &r in &[-2.0f32, -0.5, 0.0, 0.3, 1.0, 5.0] {
                let (a, b) = normalize_fill(s, r);
                assert!((0.0..=1.0).contains(&a) && (0.0..=1.0).contains(&b));
                assert!(a <= b, "({s}, {r}) -> ({a}, {b})");
            }
        }
    }

    // ── geometry ──────────────────────────────────────────────────────────

    #[test]
    fn horizontal_fill_clips_x() {
        let mut batcher = Batcher::default();
        let node = UiNode::new(Size::new(100.0, 20.0));
        let mut s = bar(FillType::Horizontal, 0.0, 0.5);
        s.update(&node, &mut batcher, None).unwrap();

        let d = s.render_data().data();
        assert_eq!((d[0].x, d[1].x), (-50.0, 0.0));
        assert_eq!((d[0].y, d[2].y), (-10.0, 10.0));
        assert_eq!(uvs(&s), vec![[0.0, 1.0], [0.5, 1.0], [0.0, 0.0], [0.5, 0.0]]);
    }

    #[test]
    fn vertical_fill_clips_y() {
        let mut batcher = Batcher::default();
        let node = UiNode::new(Size::new(20.0, 100.0));
        let mut s = bar(FillType::Vertical, 0.5, 0.5);
        s.update(&node, &mut batcher, None).unwrap();

        let d = s.render_data().data();
        assert_eq!((d[0].y, d[2].y), (0.0, 50.0));
        assert_eq!(uvs(&s), vec![[0.0, 0.5], [1.0, 0.5], [0.0, 0.0], [1.0, 0.0]]);
    }

    #[test]
    fn rotated_frame_swaps_uv_extent() {
        let mut batcher = Batcher::default();
        let node = UiNode::default();
        let frame = SpriteFrame::with_rect(
            Texture2D::new(100, 100),
            Rect::new(0.0, 0.0, 20.0, 40.0),
            true,
        );
        let mut s = Sprite::new(frame.into_shared());
        s.set_type(SpriteType::Filled);
        s.update(&node, &mut batcher, None).unwrap();
        // full horizontal fill walks the rotated frame's texture-space v axis
        assert_eq!(uvs(&s), vec![[0.0, 0.0], [0.0, 0.2], [0.4, 0.0], [0.4, 0.2]]);
    }

    #[test]
    fn atlas_reset_restores_original_uvs() {
        let mut batcher = Batcher::default();
        let mut atlas = DynamicAtlasManager::new(AtlasConfig::default());
        let node = UiNode::new(Size::new(16.0, 16.0));
        let image = image::RgbaImage::from_pixel(16, 16, image::Rgba([255, 255, 255, 255]));
        let texture = Texture2D::from_image(image);
        let source = texture.id();
        let mut s = Sprite::new(SpriteFrame::new(texture).into_shared());
        s.set_type(SpriteType::Filled);

        batcher.begin_frame();
        s.update(&node, &mut batcher, Some(&mut atlas)).unwrap();
        s.fill(&node, &mut batcher);
        assert_ne!(s.batch_key().texture, Some(source));
        let packed = uvs(&s);
        assert_ne!(packed, vec![[0.0, 1.0], [1.0, 1.0], [0.0, 0.0], [1.0, 0.0]]);
        let uv = *s.sprite_frame().unwrap().borrow().uv();
        assert_eq!(packed[0], [uv[0], uv[1]]);

        atlas.reset();
        s.update(&node, &mut batcher, None).unwrap();
        assert_eq!(s.batch_key().texture, Some(source));
        assert_eq!(uvs(&s), vec![[0.0, 1.0], [1.0, 1.0], [0.0, 0.0], [1.0, 0.0]]);
    }

    // ── configuration errors ──────────────────────────────────────────────

    #[test]
    fn radial_is_reported_not_rendered() {
        let mut batcher = Batcher::default();
        let node = UiNode::default();
        let mut s = bar(FillType::Radial, 0.0, 1.0);
        let err = s.update(&node, &mut batcher, None).unwrap_err();
        assert_eq!(err, AssembleError::UnsupportedFillType(FillType::Radial));
        assert_eq!(err.code(), 2626);
        assert!(s.render_data().data().iter().all(|v| v.x == 0.0 && v.y == 0.0));
    }

    #[test]
    fn clean_render_data_is_not_recomputed() {
        let mut batcher = Batcher::default();
        let node = UiNode::default();
        let mut s = bar(FillType::Horizontal, 0.0, 1.0);
        s.update(&node, &mut batcher, None).unwrap();
        batcher.begin_frame();
        s.fill(&node, &mut batcher);
        assert!(!s.render_data().vert_dirty());

        // geometry stays put while clean even if the sprite changes under it
        s.render_data.data_mut()[1].x = 7.0;
        s.update(&node, &mut batcher, None).unwrap();
        assert_eq!(s.render_data().data()[1].x, 7.0);

        s.set_fill_range(0.5);
        s.update(&node, &mut batcher, None).unwrap();
        assert_eq!(s.render_data().data()[1].x, 0.0);
    }

    #[test]
    fn bar_index_pattern() {
        let mut batcher = Batcher::default();
        let node = UiNode::default();
        let mut s = bar(FillType::Horizontal, 0.0, 1.0);
        s.update(&node, &mut batcher, None).unwrap();
        assert_eq!(s.render_data().index_pattern(), &[0, 1, 2, 2, 1, 3]);
    }
}
