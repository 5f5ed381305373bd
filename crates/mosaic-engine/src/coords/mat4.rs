use super::Vec2;

/// Column-major 4×4 matrix.
///
/// Element names follow storage order: `m[0..4]` is the first column, so the
/// translation lives in `m[12]`, `m[13]`, `m[14]` and the projective row in
/// `m[3]`, `m[7]`, `m[11]`, `m[15]`.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Mat4 {
    pub m: [f32; 16],
}

impl Default for Mat4 {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Mat4 {
    pub const IDENTITY: Mat4 = Mat4 {
        m: [
            1.0, 0.0, 0.0, 0.0, //
            0.0, 1.0, 0.0, 0.0, //
            0.0, 0.0, 1.0, 0.0, //
            0.0, 0.0, 0.0, 1.0,
        ],
    };

    #[inline]
    pub const fn from_cols_array(m: [f32; 16]) -> Self {
        Self { m }
    }

    pub fn from_translation(x: f32, y: f32, z: f32) -> Self {
        let mut out = Self::IDENTITY;
        out.m[12] = x;
        out.m[13] = y;
        out.m[14] = z;
        out
    }

    pub fn from_scale(x: f32, y: f32, z: f32) -> Self {
        let mut out = Self::IDENTITY;
        out.m[0] = x;
        out.m[5] = y;
        out.m[10] = z;
        out
    }

    /// Rotation about +Z by `radians`, counter-clockwise.
    pub fn from_rotation_z(radians: f32) -> Self {
        let (s, c) = radians.sin_cos();
        let mut out = Self::IDENTITY;
        out.m[0] = c;
        out.m[1] = s;
        out.m[4] = -s;
        out.m[5] = c;
        out
    }

    /// `self * rhs` (apply `rhs` first).
    pub fn mul(&self, rhs: &Mat4) -> Mat4 {
        let a = &self.m;
        let b = &rhs.m;
        let mut out = [0.0f32; 16];
        for col in 0..4 {
            for row in 0..4 {
                out[col * 4 + row] = a[row] * b[col * 4]
                    + a[4 + row] * b[col * 4 + 1]
                    + a[8 + row] * b[col * 4 + 2]
                    + a[12 + row] * b[col * 4 + 3];
            }
        }
        Mat4 { m: out }
    }

    /// Transforms a local 2D point (z = 0, w = 1) with perspective divide.
    ///
    /// `rhw = 1 / w` unless `w == 0`, in which case the divide is skipped.
    #[inline]
    pub fn transform_point2(&self, p: Vec2) -> [f32; 3] {
        let m = &self.m;
        let w = m[3] * p.x + m[7] * p.y + m[15];
        let rhw = if w != 0.0 { 1.0 / w } else { 1.0 };
        [
            (m[0] * p.x + m[4] * p.y + m[12]) * rhw,
            (m[1] * p.x + m[5] * p.y + m[13]) * rhw,
            (m[2] * p.x + m[6] * p.y + m[14]) * rhw,
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn translation_moves_point() {
        let m = Mat4::from_translation(10.0, -5.0, 1.0);
        assert_eq!(m.transform_point2(Vec2::new(1.0, 2.0)), [11.0, -3.0, 1.0]);
    }

    #[test]
    fn mul_applies_right_hand_side_first() {
        let t = Mat4::from_translation(10.0, 0.0, 0.0);
        let s = Mat4::from_scale(2.0, 2.0, 1.0);
        // scale, then translate
        assert_eq!(t.mul(&s).transform_point2(Vec2::new(1.0, 1.0)), [12.0, 2.0, 0.0]);
    }

    #[test]
    fn zero_w_skips_divide() {
        let mut m = Mat4::IDENTITY;
        m.m[15] = 0.0;
        assert_eq!(m.transform_point2(Vec2::new(0.0, 0.0)), [0.0, 0.0, 0.0]);
        assert_eq!(m.transform_point2(Vec2::new(3.0, 4.0)), [3.0, 4.0, 0.0]);
    }

    #[test]
    fn projective_row_divides() {
        let mut m = Mat4::IDENTITY;
        m.m[15] = 2.0;
        assert_eq!(m.transform_point2(Vec2::new(4.0, 8.0)), [2.0, 4.0, 0.0]);
    }
}
