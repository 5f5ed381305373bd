/// Linear RGBA color with `f32` channels in `[0, 1]`.
///
/// This is the per-vertex color written into mesh buffers.
#[derive(Debug, Copy, Clone, Default, PartialEq)]
pub struct ColorRgba {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

impl ColorRgba {
    #[inline]
    pub const fn new(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self { r, g, b, a }
    }

    #[inline]
    pub const fn white() -> Self {
        Self::new(1.0, 1.0, 1.0, 1.0)
    }

    #[inline]
    pub const fn to_array(self) -> [f32; 4] {
        [self.r, self.g, self.b, self.a]
    }

    #[inline]
    pub fn is_finite(self) -> bool {
        self.r.is_finite() && self.g.is_finite() && self.b.is_finite() && self.a.is_finite()
    }
}

/// Component color as authored: straight-alpha bytes.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct Rgba8 {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Default for Rgba8 {
    fn default() -> Self {
        Self::WHITE
    }
}

impl Rgba8 {
    pub const WHITE: Rgba8 = Rgba8::new(255, 255, 255, 255);

    #[inline]
    pub const fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    /// Channels divided by 255, alpha included.
    #[inline]
    pub fn to_linear(self) -> ColorRgba {
        ColorRgba::new(
            self.r as f32 / 255.0,
            self.g as f32 / 255.0,
            self.b as f32 / 255.0,
            self.a as f32 / 255.0,
        )
    }

    /// Channels divided by 255 with alpha replaced by `alpha`.
    ///
    /// Opacity composes down the node hierarchy, so assemblers that honour it
    /// take alpha from the node rather than from the color.
    #[inline]
    pub fn to_linear_with_alpha(self, alpha: f32) -> ColorRgba {
        let c = self.to_linear();
        ColorRgba::new(c.r, c.g, c.b, alpha)
    }

    /// Packs into `0xAABBGGRR` (little-endian RGBA8 in memory).
    #[inline]
    pub const fn to_u32(self) -> u32 {
        (self.a as u32) << 24 | (self.b as u32) << 16 | (self.g as u32) << 8 | self.r as u32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn to_linear_divides_by_255() {
        let c = Rgba8::new(255, 0, 51, 255).to_linear();
        assert_eq!(c, ColorRgba::new(1.0, 0.0, 0.2, 1.0));
    }

    #[test]
    fn alpha_override_ignores_own_alpha() {
        let c = Rgba8::new(255, 255, 255, 10).to_linear_with_alpha(0.5);
        assert_eq!(c.a, 0.5);
    }

    #[test]
    fn packs_rgba_little_endian() {
        assert_eq!(Rgba8::new(0x11, 0x22, 0x33, 0x44).to_u32(), 0x4433_2211);
    }
}
