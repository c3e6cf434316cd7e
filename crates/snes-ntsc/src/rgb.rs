use std::ops::{Add, AddAssign, Sub, SubAssign};

const fn kmask(x: u32) -> u32 {
    x << 20 | x << 10 | x
}

/// Offset added to every channel so that small negative values stay inside
/// their own field.
pub(crate) const BIAS: Rgb = Rgb(kmask(0x100));

const MERGE_MASK: u32 = kmask(0x1ff);
const CLAMP_MASK: u32 = kmask(3);
const CLAMP_ADD: u32 = kmask(0x202);
const CHANNEL_MASK: u32 = kmask(0x7f);

/// Three signed color channels packed into one word so they can be summed in a
/// single add. Red lives in bits 20..30, green in bits 10..20 and blue in bits
/// 0..10. A channel magnitude of 0x7f is full intensity.
///
/// Arithmetic wraps, borrows between fields cancel out again as long as every
/// channel of the final result lies within -0x100..0x300.
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq, Hash)]
#[repr(transparent)]
pub struct Rgb(u32);

impl Rgb {
    pub const ZERO: Rgb = Rgb(0);

    /// Packs signed 7-bit scale channel values.
    pub fn from_channels(r: i32, g: i32, b: i32) -> Self {
        let bits = (r << 20).wrapping_add(g << 10).wrapping_add(b);
        Rgb(bits as u32)
    }

    /// Packs channels given in signal units (0x1000 = full intensity), rounding
    /// to the nearest 7-bit step.
    pub fn from_unit(r: i32, g: i32, b: i32) -> Self {
        Self::from_channels((r + 16) >> 5, (g + 16) >> 5, (b + 16) >> 5)
    }

    /// Signed channel values, valid while each lies within -0x100..0x300.
    pub fn channels(self) -> [i32; 3] {
        let bits = self.0.wrapping_add(BIAS.0);
        [
            (bits >> 20 & 0x3ff) as i32 - 0x100,
            (bits >> 10 & 0x3ff) as i32 - 0x100,
            (bits & 0x3ff) as i32 - 0x100,
        ]
    }

    /// Saturates each biased channel to the displayable range. `adj` is the
    /// number of extra bits the sum carries above the 7-bit scale. The lowest
    /// bits of each channel are trashed.
    pub fn clamp(self, adj: u32) -> Self {
        let sub = self.0 >> (7 + adj) & CLAMP_MASK;
        let clamp = CLAMP_ADD - sub;
        Rgb((self.0 | clamp) & (clamp - sub))
    }

    /// Exact 7-bit channels a biased sum displays as. Shifting up first keeps the
    /// low bits out of the range `clamp` discards.
    pub fn settle(self) -> Self {
        let clamped = Rgb(self.0 << 2).clamp(2);
        Rgb(clamped.0 >> 2 & CHANNEL_MASK)
    }

    /// Per-channel floor average. Values are moved to offset binary before the
    /// shift so a negative channel can't leak its sign into its neighbor.
    pub fn average(self, other: Rgb) -> Self {
        let sum = self.0.wrapping_add(other.0).wrapping_add(BIAS.0);
        Rgb((sum >> 1 & MERGE_MASK).wrapping_sub(BIAS.0 >> 1))
    }

    /// Clamped value as RGB565 in the low half of the word.
    pub fn lo_pixel(self, adj: u32) -> u32 {
        (self.0 >> (11 + adj) & 0x0000_f800)
            | (self.0 >> (6 + adj) & 0x0000_07c0)
            | (self.0 >> (2 + adj) & 0x0000_001f)
    }

    /// Clamped value as RGB565 in the high half of the word.
    pub fn hi_pixel(self, adj: u32) -> u32 {
        (self.0 << (5 - adj) & 0xf800_0000)
            | (self.0 << (10 - adj) & 0x07c0_0000)
            | (self.0 << (14 - adj) & 0x001f_0000)
    }

    /// RGB565 of a settled color. Green only carries five significant bits.
    pub fn rgb565(self) -> u16 {
        let [r, g, b] = self.channels();
        ((r as u16 >> 2) << 11) | ((g as u16 >> 2) << 6) | (b as u16 >> 2)
    }
}

impl Add for Rgb {
    type Output = Rgb;

    fn add(self, rhs: Rgb) -> Rgb {
        Rgb(self.0.wrapping_add(rhs.0))
    }
}

impl AddAssign for Rgb {
    fn add_assign(&mut self, rhs: Rgb) {
        self.0 = self.0.wrapping_add(rhs.0);
    }
}

impl Sub for Rgb {
    type Output = Rgb;

    fn sub(self, rhs: Rgb) -> Rgb {
        Rgb(self.0.wrapping_sub(rhs.0))
    }
}

impl SubAssign for Rgb {
    fn sub_assign(&mut self, rhs: Rgb) {
        self.0 = self.0.wrapping_sub(rhs.0);
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn channels_survive_negative_neighbors() {
        let rgb = Rgb::from_channels(-5, 100, -128);
        assert_eq!(rgb.channels(), [-5, 100, -128]);

        let sum = rgb + Rgb::from_channels(10, -150, 130);
        assert_eq!(sum.channels(), [5, -50, 2]);
        assert_eq!((sum - rgb).channels(), [10, -150, 130]);
    }

    #[test]
    fn from_unit_rounds_to_nearest_step() {
        assert_eq!(Rgb::from_unit(0, 15, 16).channels(), [0, 0, 1]);
        assert_eq!(Rgb::from_unit(4096, 4095, -17).channels(), [128, 128, -1]);
    }

    #[test]
    fn clamp_saturates_each_channel() {
        let raw = Rgb::from_channels(-20, 0x40, 0x90) + BIAS;
        let pixel = raw.clamp(0).lo_pixel(0);
        assert_eq!(pixel >> 11, 0);
        assert_eq!(pixel >> 6 & 0x1f, 0x40 >> 2);
        assert_eq!(pixel & 0x1f, 0x1f);
    }

    #[test]
    fn settle_matches_displayed_pixel() {
        for value in -40..180 {
            let raw = Rgb::from_channels(value, value, value) + BIAS;
            let settled = raw.settle().channels();
            let expected = value.clamp(0, 0x7f);
            assert_eq!(settled, [expected; 3]);

            let pixel = raw.clamp(0).lo_pixel(0) as u16;
            assert_eq!(pixel, raw.settle().rgb565());
        }
    }

    #[test]
    fn hires_sums_use_extra_bit() {
        let single = Rgb::from_channels(0x30, 0x50, 0x70) + BIAS;
        let double = single + single;
        assert_eq!(single.clamp(0).lo_pixel(0), double.clamp(1).lo_pixel(1));
        assert_eq!(single.clamp(0).hi_pixel(0), double.clamp(1).hi_pixel(1));
    }

    #[test]
    fn halves_hold_same_pixel() {
        let raw = Rgb::from_channels(0x11, 0x62, 0x7f) + BIAS;
        let clamped = raw.clamp(0);
        assert_eq!(clamped.hi_pixel(0), clamped.lo_pixel(0) << 16);
    }

    #[test]
    fn average_floors_signed_channels() {
        let pairs = [(-7, 4), (-100, -101), (60, 61), (0, -1), (127, 127)];
        for &(a, b) in &pairs {
            let avg = Rgb::from_channels(a, b, a).average(Rgb::from_channels(b, a, -b));
            let [r, g, bl] = avg.channels();
            assert_eq!(r, (a + b).div_euclid(2));
            assert_eq!(g, (a + b).div_euclid(2));
            assert_eq!(bl, (a - b).div_euclid(2));
        }
    }
}
