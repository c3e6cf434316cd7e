use crate::rgb::Rgb;
use crate::{entry_index, Error, BURST_COUNT, BURST_SIZE, ENTRY_SIZE, RGB_KERNEL_SIZE};

/// Output pixels produced per full chunk.
pub(crate) const OUT_CHUNK: usize = 16;
/// Output pixels produced by the shortened chunk ending every row.
pub(crate) const OUT_TAIL: usize = 12;

/// Fixed convolution shape of a blitter with `N` taps. Each tap holds the table
/// entry of one recent input pixel.
pub(crate) struct Layout<const N: usize> {
    /// (rotation, alignment offset) of the kernel value each tap contributes
    taps: [(usize, usize); N],
    /// output position within a chunk at which each tap takes the next pixel
    loads: [usize; N],
    /// extra bits carried by the sums
    adj: u32,
}

impl<const N: usize> Layout<N> {
    /// Input pixels taken before the first chunk and again in the tail chunk.
    const EDGE: usize = N / 3;

    /// `None` when `out_width` is narrower than the tail chunk.
    pub(crate) const fn in_width(&self, out_width: usize) -> Option<usize> {
        match out_width.checked_sub(OUT_TAIL) {
            Some(w) => Some(w / OUT_CHUNK * N + Self::EDGE * 2),
            None => None,
        }
    }

    /// `None` when `in_width` doesn't cover the pixels of the tail chunk.
    pub(crate) const fn out_width(&self, in_width: usize) -> Option<usize> {
        match in_width.checked_sub(Self::EDGE * 2) {
            Some(w) => Some(w / N * OUT_CHUNK + OUT_TAIL),
            None => None,
        }
    }
}

pub(crate) const STANDARD: Layout<6> = Layout {
    taps: [(0, 0), (14, 16), (11, 32), (8, 0), (6, 16), (3, 32)],
    loads: [0, 2, 5, 8, 10, 13],
    adj: 0,
};

/// Twice the input pixels per output chunk, every other tap interleaves a second
/// standard convolution shifted by four output positions.
pub(crate) const HIRES: Layout<12> = Layout {
    taps: [
        (0, 0),
        (15, 32),
        (14, 16),
        (12, 0),
        (11, 32),
        (10, 16),
        (8, 0),
        (7, 32),
        (6, 16),
        (4, 0),
        (3, 32),
        (2, 16),
    ],
    loads: [0, 1, 2, 4, 5, 6, 8, 9, 10, 12, 13, 14],
    adj: 1,
};

#[cfg(target_endian = "little")]
fn left_pixel(raw: Rgb, adj: u32) -> u32 {
    raw.lo_pixel(adj)
}

#[cfg(target_endian = "little")]
fn right_pixel(raw: Rgb, adj: u32) -> u32 {
    raw.hi_pixel(adj)
}

#[cfg(target_endian = "big")]
fn left_pixel(raw: Rgb, adj: u32) -> u32 {
    raw.hi_pixel(adj)
}

#[cfg(target_endian = "big")]
fn right_pixel(raw: Rgb, adj: u32) -> u32 {
    raw.lo_pixel(adj)
}

/// Pixels are written two at a time as one word, so the halves of that word must
/// land in memory in display order.
pub(crate) fn check_byte_order() -> Result<(), Error> {
    let white = Rgb::from_channels(0x17f, 0x17f, 0x17f).clamp(0);
    let black = Rgb::ZERO.clamp(0);
    let word = left_pixel(white, 0) | right_pixel(black, 0);

    match bytemuck::cast::<u32, [u16; 2]>(word) {
        [0xffdf, 0x0000] => Ok(()),
        _ => Err(Error::ByteOrder),
    }
}

pub(crate) struct Blitter<'a, const N: usize> {
    table: &'a [Rgb],
    layout: &'static Layout<N>,
    burst_offset: usize,
    /// table offsets of the entries currently in each tap
    taps: [usize; N],
    pair: u32,
}

impl<'a, const N: usize> Blitter<'a, N> {
    pub(crate) fn new(table: &'a [Rgb], layout: &'static Layout<N>) -> Self {
        Self {
            table,
            layout,
            burst_offset: 0,
            taps: [0; N],
            pair: 0,
        }
    }

    /// Filters `height` rows and returns the burst phase following the last row.
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn blit(
        &mut self,
        input: &[u16],
        in_pitch: usize,
        burst_phase: usize,
        out_width: usize,
        height: usize,
        output: &mut [u16],
        out_pitch: usize,
    ) -> usize {
        debug_assert!(out_width >= OUT_TAIL);
        debug_assert!(out_pitch % 2 == 0);

        let chunk_count = (out_width - OUT_TAIL) / OUT_CHUNK;
        let written = chunk_count * OUT_CHUNK + OUT_TAIL;
        let out_stride = out_pitch / 2;
        let edge = Layout::<N>::EDGE;

        let mut burst = burst_phase % BURST_COUNT;
        for row in 0..height {
            let input = &input[row * in_pitch..];
            let start = row * out_stride;
            let output: &mut [[u16; 2]] =
                bytemuck::cast_slice_mut(&mut output[start..start + written]);

            self.begin_row(burst, &input[..edge]);
            let mut pos = edge;

            for chunk in output[..chunk_count * OUT_CHUNK / 2].chunks_exact_mut(OUT_CHUNK / 2) {
                self.chunk(&input[pos..pos + N], chunk, OUT_CHUNK);
                pos += N;
            }

            let tail = &mut output[chunk_count * OUT_CHUNK / 2..];
            self.chunk(&input[pos..pos + edge], tail, OUT_TAIL);

            burst = (burst + 1) % BURST_COUNT;
        }

        burst
    }

    /// Starts a row with black in every tap except the last `EDGE`, which take
    /// the first input pixels.
    fn begin_row(&mut self, burst: usize, first: &[u16]) {
        self.burst_offset = burst * BURST_SIZE;
        self.taps = [self.black(); N];
        for (tap, &pixel) in self.taps[N - first.len()..].iter_mut().zip(first) {
            *tap = entry_index(pixel) * ENTRY_SIZE + self.burst_offset;
        }
    }

    fn black(&self) -> usize {
        self.burst_offset
    }

    /// Produces `pixels` output pixels, loading taps from `input` on schedule.
    /// Loads past the end of `input` read black.
    fn chunk(&mut self, input: &[u16], out: &mut [[u16; 2]], pixels: usize) {
        let mut next = 0;
        for x in 0..pixels {
            while next < N && self.layout.loads[next] == x {
                self.taps[next] = match input.get(next) {
                    Some(&pixel) => entry_index(pixel) * ENTRY_SIZE + self.burst_offset,
                    None => self.black(),
                };
                next += 1;
            }
            self.rgb_out(x, out);
        }
    }

    fn rgb_out(&mut self, x: usize, out: &mut [[u16; 2]]) {
        let raw = self
            .taps
            .iter()
            .zip(&self.layout.taps)
            .fold(Rgb::ZERO, |sum, (&tap, &(rot, base))| {
                sum + self.table[tap + (x + rot) % RGB_KERNEL_SIZE + base]
            })
            .clamp(self.layout.adj);

        if x & 1 == 0 {
            self.pair = left_pixel(raw, self.layout.adj);
        } else {
            self.pair |= right_pixel(raw, self.layout.adj);
            out[x / 2] = bytemuck::cast(self.pair);
        }
    }
}
