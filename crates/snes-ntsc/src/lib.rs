// Derived from snes_ntsc 0.1.0
/* snes_ntsc 0.1.0. http://www.slack.net/~ant/ */

/* Based on algorithm by NewRisingSun */
/* Copyright (C) 2006 Shay Green. Permission is hereby granted, free of
charge, to any person obtaining a copy of this software module and associated
documentation files (the "Software"), to deal in the Software without
restriction, including without limitation the rights to use, copy, modify,
merge, publish, distribute, sublicense, and/or sell copies of the Software, and
to permit persons to whom the Software is furnished to do so, subject to the
following conditions: The above copyright notice and this permission notice
shall be included in all copies or substantial portions of the Software. THE
SOFTWARE IS PROVIDED "AS IS", WITHOUT WARRANTY OF ANY KIND, EXPRESS OR IMPLIED,
INCLUDING BUT NOT LIMITED TO THE WARRANTIES OF MERCHANTABILITY, FITNESS FOR A
PARTICULAR PURPOSE AND NONINFRINGEMENT. IN NO EVENT SHALL THE AUTHORS OR
COPYRIGHT HOLDERS BE LIABLE FOR ANY CLAIM, DAMAGES OR OTHER LIABILITY, WHETHER
IN AN ACTION OF CONTRACT, TORT OR OTHERWISE, ARISING FROM, OUT OF OR IN
CONNECTION WITH THE SOFTWARE OR THE USE OR OTHER DEALINGS IN THE SOFTWARE. */

mod blit;
mod error;
mod kernel;
mod rgb;
mod setup;
mod signal;

pub use error::{Error, FrameError};
pub use rgb::Rgb;
pub use setup::SnesNtscSetup;

use blit::{Blitter, HIRES, OUT_CHUNK, OUT_TAIL, STANDARD};
use kernel::{correct_errors, gen_kernel, merge_fields, MAX_CORRECTION_PASSES};
use signal::Init;

pub const BURST_COUNT: usize = 3;
pub const ALIGNMENT_COUNT: usize = 3;
pub const RGB_KERNEL_SIZE: usize = 16;
pub const BURST_SIZE: usize = ALIGNMENT_COUNT * RGB_KERNEL_SIZE;
pub const ENTRY_SIZE: usize = BURST_COUNT * BURST_SIZE;

/// Input colors that share a table entry once the low bits of red and blue
/// are dropped.
pub const ENTRY_COUNT: usize = 1 << 13;
pub const COLOR_COUNT: usize = 1 << 15;

/// Narrowest output row, a lone tail chunk.
pub const MIN_OUT_WIDTH: usize = OUT_TAIL;

/// Table entry of a `0BBBBBGGGGGRRRRR` input color.
pub const fn entry_index(code: u16) -> usize {
    let code = code as usize;
    ((code & 0x3fe) | (code >> 1 & 0x3c00)) >> 1
}

/// Input color of a table entry with the dropped bits cleared.
pub(crate) const fn entry_code(entry: usize) -> usize {
    (entry << 2 & 0x7800) | (entry << 1 & 0x3fe)
}

/// Offset of a single kernel value within the table.
pub const fn kernel_index(entry: usize, burst: usize, alignment: usize, tap: usize) -> usize {
    entry * ENTRY_SIZE + burst * BURST_SIZE + alignment * RGB_KERNEL_SIZE + tap
}

/// Rows handed to each worker by the parallel blits.
#[cfg(feature = "rayon")]
const BAND_ROWS: usize = 16;

/// Precomputed kernels for every input color, burst phase and column alignment.
/// Read only once built, so a single table can serve any number of blits at
/// once.
pub struct SnesNtsc {
    table: Box<[Rgb]>,
}

impl SnesNtsc {
    #[tracing::instrument(skip_all)]
    pub fn new(setup: &SnesNtscSetup) -> Result<Self, Error> {
        setup.validate()?;
        blit::check_byte_order()?;

        let init = Init::new(setup);
        let palette = setup.palette.as_deref();
        let mut table = vec![Rgb::ZERO; ENTRY_COUNT * ENTRY_SIZE].into_boxed_slice();
        let mut passes = 0;

        for (entry, kernel) in table.chunks_exact_mut(ENTRY_SIZE).enumerate() {
            let (y, i, q) = init.entry_yiq(entry, palette);
            gen_kernel(&init, y, i, q, kernel);
            if setup.merge_fields {
                merge_fields(kernel);
            }

            match correct_errors(init.solid_color(y, i, q), kernel, MAX_CORRECTION_PASSES) {
                Ok(n) => passes += n as u64,
                Err((burst, tap)) => {
                    tracing::error!(entry, burst, tap, "kernel correction did not converge");
                    return Err(Error::Convergence { entry, burst, tap });
                }
            }
        }

        tracing::debug!(
            merge_fields = setup.merge_fields,
            remapped = palette.is_some(),
            passes,
            "built table"
        );

        Ok(SnesNtsc { table })
    }

    /// The 16 kernel values of one entry at a burst phase and column alignment.
    pub fn kernel(&self, entry: usize, burst: usize, alignment: usize) -> &[Rgb] {
        let start = kernel_index(entry, burst, alignment, 0);
        &self.table[start..start + RGB_KERNEL_SIZE]
    }

    /// Output pixels for `in_width` input pixels, rounded down to a whole chunk.
    /// `None` for rows too narrow to fill even the tail chunk.
    pub const fn out_width(in_width: usize) -> Option<usize> {
        STANDARD.out_width(in_width)
    }

    /// Input pixels consumed to produce `out_width` output pixels. `None` below
    /// [`MIN_OUT_WIDTH`].
    pub const fn in_width(out_width: usize) -> Option<usize> {
        STANDARD.in_width(out_width)
    }

    pub const fn out_width_hires(in_width: usize) -> Option<usize> {
        HIRES.out_width(in_width)
    }

    pub const fn in_width_hires(out_width: usize) -> Option<usize> {
        HIRES.in_width(out_width)
    }

    /// Filters `height` rows of `input` into `output`.
    ///
    /// `in_pitch` is counted in pixels and `out_pitch` in bytes. Every row starts
    /// one burst phase after the previous one, the returned value is the phase
    /// of the row that would follow. `out_width` must be at least
    /// [`MIN_OUT_WIDTH`]; anything past the last whole chunk is left untouched.
    /// See [`SnesNtsc::check_frame`] to validate buffers up front.
    #[allow(clippy::too_many_arguments)]
    pub fn blit(
        &self,
        input: &[u16],
        in_pitch: usize,
        burst_phase: usize,
        out_width: usize,
        height: usize,
        output: &mut [u16],
        out_pitch: usize,
    ) -> usize {
        Blitter::new(&self.table, &STANDARD).blit(
            input,
            in_pitch,
            burst_phase,
            out_width,
            height,
            output,
            out_pitch,
        )
    }

    /// Same as [`SnesNtsc::blit`] for rows with twice the horizontal resolution,
    /// such as the 512 pixel modes.
    #[allow(clippy::too_many_arguments)]
    pub fn blit_hires(
        &self,
        input: &[u16],
        in_pitch: usize,
        burst_phase: usize,
        out_width: usize,
        height: usize,
        output: &mut [u16],
        out_pitch: usize,
    ) -> usize {
        Blitter::new(&self.table, &HIRES).blit(
            input,
            in_pitch,
            burst_phase,
            out_width,
            height,
            output,
            out_pitch,
        )
    }

    /// [`SnesNtsc::blit`] with bands of rows filtered in parallel. Output is
    /// identical to the sequential blit.
    #[cfg(feature = "rayon")]
    #[allow(clippy::too_many_arguments)]
    pub fn par_blit(
        &self,
        input: &[u16],
        in_pitch: usize,
        burst_phase: usize,
        out_width: usize,
        height: usize,
        output: &mut [u16],
        out_pitch: usize,
    ) -> usize {
        self.par_bands(
            &STANDARD,
            input,
            in_pitch,
            burst_phase,
            out_width,
            height,
            output,
            out_pitch,
        )
    }

    #[cfg(feature = "rayon")]
    #[allow(clippy::too_many_arguments)]
    pub fn par_blit_hires(
        &self,
        input: &[u16],
        in_pitch: usize,
        burst_phase: usize,
        out_width: usize,
        height: usize,
        output: &mut [u16],
        out_pitch: usize,
    ) -> usize {
        self.par_bands(
            &HIRES,
            input,
            in_pitch,
            burst_phase,
            out_width,
            height,
            output,
            out_pitch,
        )
    }

    #[cfg(feature = "rayon")]
    #[allow(clippy::too_many_arguments)]
    fn par_bands<const N: usize>(
        &self,
        layout: &'static blit::Layout<N>,
        input: &[u16],
        in_pitch: usize,
        burst_phase: usize,
        out_width: usize,
        height: usize,
        output: &mut [u16],
        out_pitch: usize,
    ) -> usize {
        use rayon::prelude::*;

        let out_stride = out_pitch / 2;
        if height == 0 || out_stride == 0 {
            return burst_phase % BURST_COUNT;
        }

        output
            .par_chunks_mut(out_stride * BAND_ROWS)
            .take(height.div_ceil(BAND_ROWS))
            .enumerate()
            .for_each(|(band, output)| {
                let first = band * BAND_ROWS;
                let rows = BAND_ROWS.min(height - first);
                Blitter::new(&self.table, layout).blit(
                    &input[first * in_pitch..],
                    in_pitch,
                    burst_phase + first,
                    out_width,
                    rows,
                    output,
                    out_pitch,
                );
            });

        (burst_phase + height) % BURST_COUNT
    }

    /// Checks that buffers and strides describe a frame the blitter can fill
    /// without reading or writing out of bounds.
    pub fn check_frame(frame: &FrameLayout, input: &[u16], output: &[u16]) -> Result<(), Error> {
        let out_width = frame.out_width;
        let in_width = if frame.hires {
            Self::in_width_hires(out_width)
        } else {
            Self::in_width(out_width)
        };
        let in_width = match in_width {
            Some(in_width) if (out_width - OUT_TAIL) % OUT_CHUNK == 0 => in_width,
            _ => return Err(FrameError::Width(out_width).into()),
        };
        if frame.out_pitch % 2 != 0 {
            return Err(FrameError::OddPitch(frame.out_pitch).into());
        }

        if frame.in_pitch < in_width {
            return Err(FrameError::InputPitch {
                pitch: frame.in_pitch,
                needed: in_width,
            }
            .into());
        }
        if frame.out_pitch < out_width * 2 {
            return Err(FrameError::OutputPitch {
                pitch: frame.out_pitch,
                needed: out_width * 2,
            }
            .into());
        }

        if frame.height == 0 {
            return Ok(());
        }

        let needed = (frame.height - 1) * frame.in_pitch + in_width;
        if input.len() < needed {
            return Err(FrameError::InputLength {
                len: input.len(),
                needed,
            }
            .into());
        }

        let needed = (frame.height - 1) * (frame.out_pitch / 2) + out_width;
        if output.len() < needed {
            return Err(FrameError::OutputLength {
                len: output.len(),
                needed,
            }
            .into());
        }

        Ok(())
    }
}

/// Shape of a frame as passed to the blits.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct FrameLayout {
    /// input row stride in pixels
    pub in_pitch: usize,
    pub out_width: usize,
    pub height: usize,
    /// output row stride in bytes
    pub out_pitch: usize,
    pub hires: bool,
}

impl FrameLayout {
    /// A tightly packed frame filtered from `in_width` pixel wide rows.
    pub fn packed(in_width: usize, height: usize, hires: bool) -> Result<Self, Error> {
        let out_width = if hires {
            SnesNtsc::out_width_hires(in_width)
        } else {
            SnesNtsc::out_width(in_width)
        };
        let out_width = out_width.ok_or(FrameError::InputWidth(in_width))?;

        Ok(FrameLayout {
            in_pitch: in_width,
            out_width,
            height,
            out_pitch: out_width * 2,
            hires,
        })
    }
}
