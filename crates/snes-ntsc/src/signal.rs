//! Model of the composite signal path used while building the table: a gaussian
//! low-pass decoder, the YIQ to RGB matrix and the picture controls.

use crate::rgb::Rgb;
use crate::setup::SnesNtscSetup;

pub(crate) const RGB_UNIT: f32 = 0x1000 as f32;

const COMPOSITE_BORDER: usize = 6;
pub(crate) const COMPOSITE_SIZE: usize = COMPOSITE_BORDER + 8 + COMPOSITE_BORDER;
const KERNEL_SIZE: usize = COMPOSITE_SIZE * 2;

/// 1 = normal, > 1 reduces echoes of bright objects
const GAUSSIAN_FACTOR: f32 = 1.0;
const GAMMA_SIZE: usize = 32;
const SHARPEN_ACCURACY: u32 = 16;

const DEFAULT_DECODER: [f32; 6] = [0.956, 0.621, -0.272, -0.647, -1.105, 1.702];

/// Decoded RGB for every sample of the composite window, plus one trailing row
/// the third alignment reads past the window. That row is black unless
/// sharpening ran, in which case it holds the last unsharpened sample.
pub(crate) type Samples = [[i32; 3]; COMPOSITE_SIZE + 1];

pub(crate) struct Init {
    decoder: [f32; 6],
    brightness: f32,
    contrast: f32,
    sharpness: f32,
    to_float: [f32; GAMMA_SIZE],
    kernel: [f32; KERNEL_SIZE],
}

impl Init {
    pub(crate) fn new(setup: &SnesNtscSetup) -> Self {
        // ranges are scaled a bit to avoid pixels overflowing at extremes
        let brightness = (setup.brightness * (0.4 * RGB_UNIT as f64) + 1.0) as f32;
        let contrast = (setup.contrast * 0.4 + 1.0) as f32;
        let sharpness = setup.sharpness;
        let sharpness = (1.0 + if sharpness < 0.0 { sharpness * 0.5 } else { sharpness }) as f32;

        let hue = setup.hue * std::f64::consts::PI;
        let sat = setup.saturation + 1.0;
        let decoder = rotate_matrix(
            &DEFAULT_DECODER,
            (hue.sin() * sat) as f32,
            (hue.cos() * sat) as f32,
        );

        let mut to_float = [0.0; GAMMA_SIZE];
        for (idx, f) in to_float.iter_mut().enumerate() {
            *f = gamma_level(setup.gamma, idx);
        }

        Init {
            decoder,
            brightness,
            contrast,
            sharpness,
            to_float,
            kernel: gaussian_kernel(),
        }
    }

    /// Luma and chroma of a table entry after gamma, contrast and brightness.
    pub(crate) fn entry_yiq(&self, entry: usize, palette: Option<&[u16]>) -> (f32, f32, f32) {
        let (ir, ig, ib) = match palette {
            Some(palette) => {
                let rgb = palette[crate::entry_code(entry)] as usize;
                (rgb >> 11 & 0x1f, rgb >> 6 & 0x1f, rgb & 0x1f)
            }
            None => (entry << 1 & 0x1e, entry >> 4 & 0x1f, entry >> 8 & 0x1e),
        };

        // clearing the low bits of red and blue is the least noticeable way to
        // shrink the table
        let r = self.to_float[ir & !1];
        let g = self.to_float[ig];
        let b = self.to_float[ib & !1];

        let (y, i, q) = rgb_to_yiq(r, g, b);
        (y * self.contrast + self.brightness, i, q)
    }

    /// Color the decoder produces for a solid area.
    pub(crate) fn solid_color(&self, y: f32, i: f32, q: f32) -> Rgb {
        let (r, g, b) = yiq_to_rgb(y, i, q, &self.decoder);
        Rgb::from_unit(r as i32, g as i32, b as i32)
    }

    pub(crate) fn decoder(&self) -> &[f32; 6] {
        &self.decoder
    }

    /// Decodes a composite window whose only non-zero samples are the four
    /// starting at `offset`, then applies sharpening.
    pub(crate) fn render(
        &self,
        composite: &[f32; COMPOSITE_SIZE],
        offset: usize,
        to_rgb: &[f32; 6],
    ) -> Samples {
        let samples = self.decode(composite, offset, to_rgb);
        if self.sharpness == 1.0 {
            samples
        } else {
            sharpen(&samples, self.sharpness)
        }
    }

    fn decode(&self, composite: &[f32; COMPOSITE_SIZE], offset: usize, to_rgb: &[f32; 6]) -> Samples {
        let f = &composite[offset..offset + 4];
        let mut out = [[0; 3]; COMPOSITE_SIZE + 1];

        for (x, rgb) in out[..COMPOSITE_SIZE].iter_mut().enumerate() {
            let k = &self.kernel[KERNEL_SIZE / 2 + x - offset - 3..];
            let i = k[3] * f[0] + k[1] * f[2];
            let q = k[2] * f[1] + k[0] * f[3];

            let c = composite[x];
            let y = match x % 4 {
                0 => i - c,
                1 => q - c,
                2 => c - i,
                _ => c - q,
            };

            let (r, g, b) = yiq_to_rgb(y, i, q, to_rgb);
            *rgb = [r as i32, g as i32, b as i32];
        }

        out
    }
}

/// Linear level of a 5-bit input channel, in signal units.
fn gamma_level(gamma: f64, level: usize) -> f32 {
    let gamma = 1.0 - gamma * if gamma > 0.0 { 0.5 } else { 1.5 };
    ((level as f64 / (GAMMA_SIZE - 1) as f64).powf(gamma) * RGB_UNIT as f64) as f32
}

/// Gaussian kernel, padded with zero. Every fourth tap sums to 0.5 at each of
/// the four phases, otherwise the i/q low-pass favors one alignment and leaves
/// repeating spots.
fn gaussian_kernel() -> [f32; KERNEL_SIZE] {
    let mut kernel = [0.0; KERNEL_SIZE];
    let border = COMPOSITE_BORDER as i32;
    for i in -border..=border {
        let x = (i * i) as f32 * (-0.03125 * GAUSSIAN_FACTOR);
        kernel[(KERNEL_SIZE as i32 / 2 + i) as usize] = (x as f64).exp() as f32;
    }

    for phase in 0..4 {
        let sum: f64 = kernel[phase..].iter().step_by(4).map(|&k| k as f64).sum();
        let scale = (0.5 / sum) as f32;
        for k in kernel[phase..].iter_mut().step_by(4) {
            *k *= scale;
        }
    }

    kernel
}

/// Sharpens with a `-(level-1)/2, level, -(level-1)/2` kernel in fixed point.
/// The first and last samples pass through, and the last one is also carried
/// into the trailing row.
fn sharpen(samples: &Samples, level: f32) -> Samples {
    let middle = (level * (1 << SHARPEN_ACCURACY) as f32) as i64;
    let side = (middle - (1 << SHARPEN_ACCURACY)) >> 1;

    let mut out = *samples;
    out[COMPOSITE_SIZE] = samples[COMPOSITE_SIZE - 1];
    for x in 1..COMPOSITE_SIZE - 1 {
        for c in 0..3 {
            let sum =
                samples[x][c] as i64 * middle - (samples[x - 1][c] + samples[x + 1][c]) as i64 * side;
            out[x][c] = (sum >> SHARPEN_ACCURACY) as i32;
        }
    }

    out
}

pub(crate) fn rotate_matrix(input: &[f32; 6], s: f32, c: f32) -> [f32; 6] {
    let mut out = [0.0; 6];
    for (o, iq) in out.chunks_exact_mut(2).zip(input.chunks_exact(2)) {
        let (i, q) = (iq[0], iq[1]);
        o[0] = i * c - q * s;
        o[1] = i * s + q * c;
    }
    out
}

fn rgb_to_yiq(r: f32, g: f32, b: f32) -> (f32, f32, f32) {
    let y = r * 0.299 + g * 0.587 + b * 0.114;
    let i = r * 0.596 - g * 0.275 - b * 0.321;
    let q = r * 0.212 - g * 0.523 + b * 0.311;

    (y, i, q)
}

fn yiq_to_rgb(y: f32, i: f32, q: f32, to_rgb: &[f32; 6]) -> (f32, f32, f32) {
    let r = y + i * to_rgb[0] + q * to_rgb[1];
    let g = y + i * to_rgb[2] + q * to_rgb[3];
    let b = y + i * to_rgb[4] + q * to_rgb[5];

    (r, g, b)
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn kernel_phases_are_balanced() {
        let kernel = gaussian_kernel();
        for phase in 0..4 {
            let sum: f32 = kernel[phase..].iter().step_by(4).sum();
            assert!((sum - 0.5).abs() < 1e-5, "phase {phase}: {sum}");
        }
        assert_eq!(kernel[KERNEL_SIZE / 2 - 7], 0.0);
        assert_eq!(kernel[KERNEL_SIZE / 2 + 7], 0.0);
    }

    #[test]
    fn sharpen_leaves_flat_areas_alone() {
        let samples = [[100, -20, 7]; COMPOSITE_SIZE + 1];
        for level in [0.5, 1.0, 1.5, 2.0] {
            assert_eq!(sharpen(&samples, level), samples);
        }
    }

    #[test]
    fn sharpen_boosts_edges() {
        let mut samples = [[0; 3]; COMPOSITE_SIZE + 1];
        samples[10] = [1000; 3];
        let out = sharpen(&samples, 2.0);
        assert_eq!(out[10], [2000; 3]);
        assert_eq!(out[9], [-500; 3]);
        assert_eq!(out[11], [-500; 3]);
        assert_eq!(out[0], samples[0]);
        assert_eq!(out[COMPOSITE_SIZE], samples[COMPOSITE_SIZE - 1]);
    }

    #[test]
    fn trailing_row_only_filled_when_sharpening() {
        let mut composite = [0.0; COMPOSITE_SIZE];
        composite[10..14].copy_from_slice(&[300.0, -200.0, 1200.0, 800.0]);

        let mut setup = SnesNtscSetup::composite();
        let init = Init::new(&setup);
        let to_rgb = *init.decoder();
        let plain = init.render(&composite, 10, &to_rgb);
        assert_ne!(plain[COMPOSITE_SIZE - 1], [0; 3]);
        assert_eq!(plain[COMPOSITE_SIZE], [0; 3]);

        setup.set_sharpness(0.5);
        let init = Init::new(&setup);
        let decoded = init.decode(&composite, 10, &to_rgb);
        let sharp = init.render(&composite, 10, &to_rgb);
        assert_eq!(sharp[COMPOSITE_SIZE], decoded[COMPOSITE_SIZE - 1]);
    }

    #[test]
    fn rotation_by_zero_is_identity() {
        assert_eq!(rotate_matrix(&DEFAULT_DECODER, 0.0, 1.0), DEFAULT_DECODER);
    }

    #[test]
    fn gamma_curve_is_rounded_once() {
        let mut setup = SnesNtscSetup::composite();
        setup.set_gamma(0.3);
        let init = Init::new(&setup);

        assert_eq!(init.to_float[0], 0.0);
        assert_eq!(init.to_float[GAMMA_SIZE - 1], RGB_UNIT);
        for (idx, &level) in init.to_float.iter().enumerate() {
            let exact = (idx as f64 / 31.0).powf(1.0 - 0.3 * 0.5) * 4096.0;
            assert_eq!(level, exact as f32, "level {idx}");
        }
    }

    #[test]
    fn half_turn_hue_negates_chroma() {
        let mut setup = SnesNtscSetup::composite();
        setup.set_hue(1.0);
        let init = Init::new(&setup);
        assert_eq!(*init.decoder(), DEFAULT_DECODER.map(|x| -x));
    }

    #[test]
    fn gray_has_no_chroma() {
        let init = Init::new(&SnesNtscSetup::composite());
        let entry = crate::entry_index(0x4210);
        let (y, i, q) = init.entry_yiq(entry, None);
        assert!(i.abs() < 1e-2 && q.abs() < 1e-2);
        assert!(y > 0.4 * RGB_UNIT && y < 0.6 * RGB_UNIT);
    }
}
