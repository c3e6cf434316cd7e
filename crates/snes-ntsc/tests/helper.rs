#![allow(dead_code)]

use snes_ntsc::{SnesNtsc, SnesNtscSetup};

pub fn ntsc() -> SnesNtsc {
    ntsc_with(&SnesNtscSetup::composite())
}

pub fn ntsc_with(setup: &SnesNtscSetup) -> SnesNtsc {
    SnesNtsc::new(setup).unwrap()
}

/// Deterministic 15-bit pixels.
pub fn noise(len: usize, seed: u32) -> Vec<u16> {
    let mut state = seed | 1;
    (0..len)
        .map(|_| {
            state ^= state << 13;
            state ^= state >> 17;
            state ^= state << 5;
            (state >> 7) as u16 & 0x7fff
        })
        .collect()
}

type BlitFn = fn(&SnesNtsc, &[u16], usize, usize, usize, usize, &mut [u16], usize) -> usize;

/// Builder for a tightly packed frame and its output buffer.
pub struct Frame {
    pub pixels: Vec<u16>,
    pub in_width: usize,
    pub height: usize,
    pub hires: bool,
}

pub fn frame(in_width: usize, height: usize) -> Frame {
    Frame {
        pixels: vec![0; in_width * height],
        in_width,
        height,
        hires: false,
    }
}

impl Frame {
    pub fn hires(mut self) -> Self {
        self.hires = true;
        self
    }

    pub fn fill(mut self, code: u16) -> Self {
        self.pixels.fill(code);
        self
    }

    pub fn noise(mut self, seed: u32) -> Self {
        self.pixels = noise(self.pixels.len(), seed);
        self
    }

    pub fn out_width(&self) -> usize {
        if self.hires {
            SnesNtsc::out_width_hires(self.in_width)
        } else {
            SnesNtsc::out_width(self.in_width)
        }
        .unwrap()
    }

    pub fn row(&self, row: usize) -> &[u16] {
        &self.pixels[row * self.in_width..][..self.in_width]
    }

    /// Filters the frame starting at `phase`, returning the output and the phase
    /// after the last row.
    pub fn blit(&self, ntsc: &SnesNtsc, phase: usize) -> (Vec<u16>, usize) {
        let out_width = self.out_width();
        let mut out = vec![0xaaaa; out_width * self.height];
        let blit: BlitFn = if self.hires {
            SnesNtsc::blit_hires
        } else {
            SnesNtsc::blit
        };
        let next = blit(
            ntsc,
            &self.pixels,
            self.in_width,
            phase,
            out_width,
            self.height,
            &mut out,
            out_width * 2,
        );
        (out, next)
    }
}

pub fn channels(pixel: u16) -> [u16; 3] {
    [pixel >> 11, pixel >> 6 & 0x1f, pixel & 0x1f]
}
