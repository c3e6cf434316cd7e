use crate::rgb::{Rgb, BIAS};
use crate::signal::{rotate_matrix, Init, COMPOSITE_SIZE};
use crate::{ALIGNMENT_COUNT, BURST_COUNT, BURST_SIZE, RGB_KERNEL_SIZE};

/// Worst case seen in practice is a few dozen passes, for colors that sit near
/// the edge of the clamping range.
pub(crate) const MAX_CORRECTION_PASSES: u32 = 1024;

/// Sine and cosine of the 0, -120 and -240 degree burst phases.
const BURST_PHASES: [(f32, f32); BURST_COUNT] = [(0.0, 1.0), (-0.866025, -0.5), (0.866025, -0.5)];

const COMPOSITE_BORDER: usize = 6;

struct PixelInfo {
    /// first composite sample of the pixel, past the window border
    offset: usize,
    /// first decoded sample captured into the table
    rgb_pos: usize,
}

const PIXELS: [PixelInfo; ALIGNMENT_COUNT] = [
    PixelInfo {
        offset: 0,
        rgb_pos: 0,
    },
    PixelInfo {
        offset: 2,
        rgb_pos: 2,
    },
    PixelInfo {
        offset: 4,
        rgb_pos: 5,
    },
];

/// Composite samples of one source pixel at the given column alignment. Pixels
/// are 8/3 subcarrier samples wide, so the edge samples are shared with the
/// neighboring pixel.
fn composite_samples(alignment: usize, y: f32, i: f32, q: f32) -> [f32; 4] {
    match alignment {
        0 => [i + y, q + y, (i - y) * (2.0 / 3.0), 0.0],
        1 => [(i - y) * (1.0 / 3.0), q - y, i + y, (q + y) * (1.0 / 3.0)],
        _ => [0.0, (q + y) * (2.0 / 3.0), i - y, q - y],
    }
}

/// Generates the kernels of one entry at every burst phase and alignment.
pub(crate) fn gen_kernel(init: &Init, y: f32, ci: f32, cq: f32, out: &mut [Rgb]) {
    for (&(sin_b, cos_b), burst) in BURST_PHASES.iter().zip(out.chunks_exact_mut(BURST_SIZE)) {
        let i = ci * cos_b - cq * sin_b;
        let q = ci * sin_b + cq * cos_b;
        let to_rgb = rotate_matrix(init.decoder(), sin_b, cos_b);

        for (alignment, (pixel, out)) in PIXELS
            .iter()
            .zip(burst.chunks_exact_mut(RGB_KERNEL_SIZE))
            .enumerate()
        {
            let offset = COMPOSITE_BORDER + pixel.offset;
            let mut composite = [0.0; COMPOSITE_SIZE];
            composite[offset..offset + 4].copy_from_slice(&composite_samples(alignment, y, i, q));

            let samples = init.render(&composite, offset, &to_rgb);
            for (o, s) in out.iter_mut().zip(&samples[pixel.rgb_pos..]) {
                *o = Rgb::from_unit(s[0], s[1], s[2]);
            }
        }
    }
}

/// Averages each burst phase with the next one, as if even and odd fields were
/// displayed together.
pub(crate) fn merge_fields(kernel: &mut [Rgb]) {
    for i in 0..BURST_SIZE {
        let p0 = kernel[i];
        let p1 = kernel[i + BURST_SIZE];
        let p2 = kernel[i + BURST_SIZE * 2];

        kernel[i] = p0.average(p1);
        kernel[i + BURST_SIZE] = p1.average(p2);
        kernel[i + BURST_SIZE * 2] = p2.average(p0);
    }
}

/// Taps of a standard-width solid area that are summed with tap `i` of the
/// first alignment, as (rotation, alignment offset) pairs.
const SOLID_TAPS: [(usize, usize); 5] = [(14, 16), (11, 32), (8, 0), (6, 16), (3, 32)];

/// Sum of every tap contributing to output position `x` of a solid area.
pub(crate) fn solid_sum(burst: &[Rgb], x: usize) -> Rgb {
    SOLID_TAPS
        .iter()
        .fold(burst[x], |sum, &(rot, base)| {
            sum + burst[(x + rot) % RGB_KERNEL_SIZE + base]
        })
}

/// Corrects roundoff errors that would cause speckles in solid areas. Returns the
/// number of correction passes, or the (burst, tap) that failed to settle within
/// `max_passes`.
///
/// Afterwards the first half of the first alignment's taps carries the channel
/// bias, and every output position sums exactly one of those taps.
pub(crate) fn correct_errors(
    color: Rgb,
    kernel: &mut [Rgb],
    max_passes: u32,
) -> Result<u32, (usize, usize)> {
    let color = (color + BIAS).settle();
    let mut passes = 0;

    for (burst, out) in kernel.chunks_exact_mut(BURST_SIZE).enumerate() {
        for i in 0..RGB_KERNEL_SIZE / 2 {
            let mut first = out[i];
            let rest = BIAS + solid_sum(out, i) - first;

            // A color near the clamping range may need several passes: an actual
            // value well past the range only moves back by the clamped error.
            let mut settled = false;
            for _ in 0..max_passes {
                passes += 1;
                let error = color - (rest + first).settle();
                if error == Rgb::ZERO {
                    settled = true;
                    break;
                }
                first += error;
            }

            if !settled {
                return Err((burst, i));
            }

            out[i] = first + BIAS;
        }
    }

    Ok(passes)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{SnesNtscSetup, ENTRY_SIZE};

    fn kernel_for(setup: &SnesNtscSetup, code: u16) -> (Rgb, Vec<Rgb>) {
        let init = Init::new(setup);
        let (y, i, q) = init.entry_yiq(crate::entry_index(code), None);
        let mut kernel = vec![Rgb::ZERO; ENTRY_SIZE];
        gen_kernel(&init, y, i, q, &mut kernel);
        (init.solid_color(y, i, q), kernel)
    }

    #[test]
    fn merge_averages_adjacent_phases() {
        let (_, kernel) = kernel_for(&SnesNtscSetup::composite(), 0x2d6b);
        let mut merged = kernel.clone();
        merge_fields(&mut merged);

        for i in 0..BURST_SIZE {
            for burst in 0..BURST_COUNT {
                let a = kernel[i + burst * BURST_SIZE].channels();
                let b = kernel[i + (burst + 1) % BURST_COUNT * BURST_SIZE].channels();
                let m = merged[i + burst * BURST_SIZE].channels();
                for c in 0..3 {
                    assert_eq!(m[c], (a[c] + b[c]).div_euclid(2));
                }
            }
        }
    }

    #[test]
    fn correction_settles_every_position() {
        let mut setup = SnesNtscSetup::composite();
        setup.set_saturation(1.0).set_sharpness(1.0);

        for code in [0x0000, 0x001f, 0x03e0, 0x7c00, 0x7fff, 0x5ad6] {
            let (color, mut kernel) = kernel_for(&setup, code);
            let passes = correct_errors(color, &mut kernel, MAX_CORRECTION_PASSES).unwrap();
            assert!(passes >= (BURST_COUNT * RGB_KERNEL_SIZE / 2) as u32);

            let expected = (color + BIAS).settle();
            for burst in kernel.chunks_exact(BURST_SIZE) {
                for x in 0..RGB_KERNEL_SIZE {
                    assert_eq!(solid_sum(burst, x).settle(), expected, "{code:#06x} x={x}");
                }
            }
        }
    }

    #[test]
    fn unsettled_kernel_reports_position() {
        let mut kernel = vec![Rgb::ZERO; ENTRY_SIZE];
        let color = Rgb::from_channels(0x40, 0x20, 0x10);
        assert_eq!(correct_errors(color, &mut kernel, 1), Err((0, 0)));

        let mut kernel = vec![Rgb::ZERO; ENTRY_SIZE];
        assert_eq!(correct_errors(color, &mut kernel, 2), Ok(2 * 24));
    }
}
