use fixed::types::I32F32;

pub const MM_PER_INCH: f32 = 25.4;
pub const PT_PER_INCH: f32 = 72.0;

/// Measurement unit used by the layout engine. Values are kept on a
/// milli-unit grid so that repeated additions stay deterministic across
/// platforms.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default)]
pub struct Pt(I32F32);

impl Pt {
    pub const ZERO: Pt = Pt(I32F32::from_bits(0));

    pub fn from_f32(value: f32) -> Pt {
        if !value.is_finite() {
            return Pt::ZERO;
        }
        let milli = (value as f64 * 1000.0).round();
        let milli = milli.clamp(i64::MIN as f64, i64::MAX as f64) as i64;
        Pt::from_milli_i64(milli)
    }

    pub fn from_i32(value: i32) -> Pt {
        Pt::from_milli_i64((value as i64) * 1000)
    }

    /// Converts millimetres to measurement units using a calibrated
    /// units-per-millimetre scale.
    pub fn from_mm(mm: f32, units_per_mm: f32) -> Pt {
        Pt::from_f32(mm * units_per_mm)
    }

    pub fn to_f32(self) -> f32 {
        self.0.to_num()
    }

    pub fn to_milli_i64(self) -> i64 {
        let bits = self.0.to_bits() as i128;
        let denom = 1i128 << 32;
        let scaled = bits * 1000;
        let adj = if scaled >= 0 { denom / 2 } else { -denom / 2 };
        let milli = (scaled + adj) / denom;
        milli.clamp(i64::MIN as i128, i64::MAX as i128) as i64
    }

    pub fn from_milli_i64(milli: i64) -> Pt {
        let milli = milli as i128;
        let denom = 1i128 << 32;
        let adj = if milli >= 0 { 500 } else { -500 };
        let bits = (milli * denom + adj) / 1000;
        let bits = bits.clamp(i64::MIN as i128, i64::MAX as i128) as i64;
        Pt(I32F32::from_bits(bits))
    }

    pub fn max(self, other: Pt) -> Pt {
        if self >= other { self } else { other }
    }

    pub fn min(self, other: Pt) -> Pt {
        if self <= other { self } else { other }
    }

    pub fn is_positive(self) -> bool {
        self.to_milli_i64() > 0
    }

    /// `self * count`, saturating on the milli grid.
    pub fn times(self, count: usize) -> Pt {
        let count = i64::try_from(count).unwrap_or(i64::MAX);
        Pt::from_milli_i64(self.to_milli_i64().saturating_mul(count))
    }
}

impl std::ops::Add for Pt {
    type Output = Pt;
    fn add(self, rhs: Pt) -> Pt {
        Pt::from_milli_i64(self.to_milli_i64().saturating_add(rhs.to_milli_i64()))
    }
}

impl std::ops::AddAssign for Pt {
    fn add_assign(&mut self, rhs: Pt) {
        *self = *self + rhs;
    }
}

impl std::ops::Sub for Pt {
    type Output = Pt;
    fn sub(self, rhs: Pt) -> Pt {
        Pt::from_milli_i64(self.to_milli_i64().saturating_sub(rhs.to_milli_i64()))
    }
}

impl std::ops::SubAssign for Pt {
    fn sub_assign(&mut self, rhs: Pt) {
        *self = *self - rhs;
    }
}

impl std::ops::Mul<f32> for Pt {
    type Output = Pt;
    fn mul(self, rhs: f32) -> Pt {
        if !rhs.is_finite() {
            return Pt::ZERO;
        }
        Pt::from_f32(self.to_f32() * rhs)
    }
}

impl std::ops::Div<i32> for Pt {
    type Output = Pt;
    fn div(self, rhs: i32) -> Pt {
        if rhs == 0 {
            return Pt::ZERO;
        }
        let num = self.to_milli_i64() as i128;
        let den = rhs as i128;
        let half = den.abs() / 2;
        let value = if num >= 0 {
            (num + half) / den
        } else {
            -(((-num) + half) / den)
        };
        Pt::from_milli_i64(value.clamp(i64::MIN as i128, i64::MAX as i128) as i64)
    }
}

impl std::iter::Sum for Pt {
    fn sum<I: Iterator<Item = Pt>>(iter: I) -> Pt {
        iter.fold(Pt::ZERO, |acc, v| acc + v)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rect {
    pub x: Pt,
    pub y: Pt,
    pub width: Pt,
    pub height: Pt,
}

impl Rect {
    pub fn bottom(&self) -> Pt {
        self.y + self.height
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
}

impl Color {
    pub const BLACK: Color = Color {
        r: 0.0,
        g: 0.0,
        b: 0.0,
    };

    pub const WHITE: Color = Color {
        r: 1.0,
        g: 1.0,
        b: 1.0,
    };

    pub fn rgb(r: f32, g: f32, b: f32) -> Self {
        Self { r, g, b }
    }

    pub fn from_hex(hex: u32) -> Self {
        let r = ((hex >> 16) & 0xff) as f32 / 255.0;
        let g = ((hex >> 8) & 0xff) as f32 / 255.0;
        let b = (hex & 0xff) as f32 / 255.0;
        Self { r, g, b }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn milli_grid_addition_is_exact() {
        let mut total = Pt::ZERO;
        for _ in 0..1000 {
            total += Pt::from_f32(0.1);
        }
        assert_eq!(total.to_milli_i64(), 100_000);
    }

    #[test]
    fn times_and_div_round_on_the_grid() {
        assert_eq!(Pt::from_i32(20).times(15), Pt::from_i32(300));
        assert_eq!(Pt::from_i32(10) / 3, Pt::from_milli_i64(3333));
        assert_eq!(Pt::from_i32(10) / 0, Pt::ZERO);
    }

    #[test]
    fn from_mm_uses_calibrated_scale() {
        let scale = PT_PER_INCH / MM_PER_INCH;
        let a4_height = Pt::from_mm(297.0, scale);
        assert!((a4_height.to_f32() - 841.89).abs() < 0.01);
    }

    #[test]
    fn non_finite_values_collapse_to_zero() {
        assert_eq!(Pt::from_f32(f32::NAN), Pt::ZERO);
        assert_eq!(Pt::from_i32(5) * f32::INFINITY, Pt::ZERO);
    }

    #[test]
    fn hex_colors_decode_channels() {
        let c = Color::from_hex(0x8a0303);
        assert!((c.r - 138.0 / 255.0).abs() < 1e-6);
        assert!((c.g - 3.0 / 255.0).abs() < 1e-6);
        assert!((c.b - 3.0 / 255.0).abs() < 1e-6);
    }
}
