//! Mosaic engine crate.
//!
//! Render-data batching for 2D UI geometry. Per frame:
//! 1. components (sprites, graphics, particles) refresh local geometry
//!    through their assembler when dirty
//! 2. assemblers write world-space vertices into chunks of shared mesh
//!    buffers and append index data, split into draw batches by texture
//! 3. batches are recorded into command buffers and submitted through
//!    [`gfx::Queue`], which aggregates draw statistics
//!
//! Small sprite textures are packed at runtime into the [`atlas`] so that
//! neighbouring sprites share a batch.

pub mod coords;
pub mod logging;
pub mod node;
pub mod texture;

pub mod batch;
pub mod render_data;

pub mod assembler;
pub mod atlas;
pub mod sprite;

pub mod gfx;
pub mod particle;

#[cfg(test)]
mod tests {
    use crate::assembler::Graphics;
    use crate::atlas::{AtlasConfig, DynamicAtlasManager};
    use crate::batch::Batcher;
    use crate::coords::Size;
    use crate::gfx::{CommandBuffer, HeadlessBackend, Queue, QueueInfo};
    use crate::node::UiNode;
    use crate::sprite::{Sprite, SpriteFrame, Texture2D};

    fn sprite_on(tex: &Texture2D) -> Sprite {
        Sprite::new(SpriteFrame::new(tex.clone()).into_shared())
    }

    fn pixel_sprite(color: [u8; 4]) -> Sprite {
        let image = image::RgbaImage::from_pixel(16, 16, image::Rgba(color));
        Sprite::new(SpriteFrame::new(Texture2D::from_image(image)).into_shared())
    }

    // ── frame ─────────────────────────────────────────────────────────────

    #[test]
    fn frame_flows_from_components_to_queue_stats() {
        let mut batcher = Batcher::default();
        let node = UiNode::new(Size::new(10.0, 10.0));

        let (first, second) = (Texture2D::new(32, 32), Texture2D::new(32, 32));
        let mut sprites = vec![sprite_on(&first), sprite_on(&first), sprite_on(&second)];
        let mut shapes = Graphics::new();
        shapes.rect(0.0, 0.0, 4.0, 4.0);

        batcher.begin_frame();
        for s in &mut sprites {
            s.update(&node, &mut batcher, None).unwrap();
            s.fill(&node, &mut batcher);
        }
        shapes.update(&node, &mut batcher).unwrap();
        shapes.fill(&node, &mut batcher);
        let batches = batcher.end_frame().to_vec();

        // first texture twice, second texture, untextured graphics
        assert_eq!(batches.len(), 3);
        assert_eq!(batches[0].index_count, 12);

        let mut cmd: CommandBuffer<u32> = CommandBuffer::with_native(0);
        for b in &batches {
            cmd.record_draw(b.index_count, 0);
        }

        let mut backend = HeadlessBackend::new();
        let mut queue = Queue::new();
        queue.initialize(&mut backend, QueueInfo::default());
        queue.submit(&mut backend, vec![cmd]);

        let stats = queue.stats();
        assert_eq!(stats.draw_calls, 3);
        assert_eq!(stats.triangles, 4 + 2 + 2);
    }

    #[test]
    fn atlas_packing_merges_batches() {
        let mut batcher = Batcher::default();
        let mut atlas = DynamicAtlasManager::new(AtlasConfig::default());
        let node = UiNode::new(Size::new(16.0, 16.0));

        let mut sprites = vec![pixel_sprite([255, 0, 0, 255]), pixel_sprite([0, 0, 255, 255])];

        batcher.begin_frame();
        for s in &mut sprites {
            s.update(&node, &mut batcher, Some(&mut atlas)).unwrap();
            s.fill(&node, &mut batcher);
        }
        assert_eq!(batcher.end_frame().len(), 1);
        assert_eq!(atlas.atlas_count(), 1);

        for s in &mut sprites {
            let frame = s.sprite_frame().cloned().unwrap();
            s.destroy(&mut batcher, Some(&mut atlas));
            atlas.delete_atlas_sprite_frame(&frame);
            assert!(!frame.borrow().is_packed());
        }
        assert_eq!(atlas.atlas_count(), 0);
    }
}
