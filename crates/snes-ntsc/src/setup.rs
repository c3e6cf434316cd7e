use crate::rgb::BIAS;
use crate::signal::Init;
use crate::{entry_index, Error, COLOR_COUNT};

/// Image parameters, ranging from -1.0 to 1.0. Actual internal values shown in
/// parenthesis.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct SnesNtscSetup {
    /// -1 = -180 degrees, +1 = +180 degrees
    pub(crate) hue: f64,
    /// -1 = grayscale (0.0), +1 = oversaturated colors (2.0)
    pub(crate) saturation: f64,
    /// -1 = dark (0.6), +1 = light (1.4)
    pub(crate) contrast: f64,
    /// -1 = dark, +1 = light
    pub(crate) brightness: f64,
    /// edge contrast enhancement/blurring
    pub(crate) sharpness: f64,
    /// -1 = dark (2.5), +1 = light (0.5)
    pub(crate) gamma: f64,
    /// if set, merges even and odd fields together to reduce flicker
    pub(crate) merge_fields: bool,
    /// optional remap of every 15-bit input color to RGB565
    #[cfg_attr(feature = "serde", serde(skip))]
    pub(crate) palette: Option<Box<[u16]>>,
}

impl Default for SnesNtscSetup {
    fn default() -> Self {
        Self::composite()
    }
}

impl SnesNtscSetup {
    /// color bleeding + artifacts
    pub fn composite() -> Self {
        SnesNtscSetup {
            hue: 0.0,
            saturation: 0.0,
            contrast: 0.0,
            brightness: 0.0,
            sharpness: 0.0,
            gamma: 0.0,
            merge_fields: false,
            palette: None,
        }
    }

    /// desaturated + artifacts
    pub fn monochrome() -> Self {
        SnesNtscSetup {
            saturation: -1.0,
            ..Self::composite()
        }
    }

    pub fn set_hue(&mut self, val: f64) -> &mut Self {
        self.hue = val;
        self
    }

    pub fn set_saturation(&mut self, val: f64) -> &mut Self {
        self.saturation = val;
        self
    }

    pub fn set_contrast(&mut self, val: f64) -> &mut Self {
        self.contrast = val;
        self
    }

    pub fn set_brightness(&mut self, val: f64) -> &mut Self {
        self.brightness = val;
        self
    }

    pub fn set_sharpness(&mut self, val: f64) -> &mut Self {
        self.sharpness = val;
        self
    }

    pub fn set_gamma(&mut self, val: f64) -> &mut Self {
        self.gamma = val;
        self
    }

    pub fn set_merge_fields(&mut self, merge: bool) -> &mut Self {
        self.merge_fields = merge;
        self
    }

    /// Replaces the standard color decoding. Entry `n` holds the RGB565 color
    /// for input color `n`.
    pub fn set_palette(&mut self, palette: Option<Box<[u16]>>) -> &mut Self {
        self.palette = palette;
        self
    }

    pub fn merge_fields(&self) -> bool {
        self.merge_fields
    }

    pub(crate) fn validate(&self) -> Result<(), Error> {
        let params = [
            ("hue", self.hue),
            ("saturation", self.saturation),
            ("contrast", self.contrast),
            ("brightness", self.brightness),
            ("sharpness", self.sharpness),
            ("gamma", self.gamma),
        ];

        for (name, value) in params {
            if !(-1.0..=1.0).contains(&value) {
                return Err(Error::ParameterOutOfRange { name, value });
            }
        }

        match self.palette.as_deref() {
            Some(palette) if palette.len() != COLOR_COUNT => {
                Err(Error::PaletteSize(palette.len()))
            }
            _ => Ok(()),
        }
    }

    /// An RGB565 palette of the flat color each input color settles to inside a
    /// solid area. It has one entry per 15-bit color and can be used in a
    /// normal blitter.
    pub fn generate_palette(&self) -> Result<Box<[u16]>, Error> {
        self.validate()?;
        let init = Init::new(self);

        let palette = (0..COLOR_COUNT)
            .map(|code| {
                let entry = entry_index(code as u16);
                let (y, i, q) = init.entry_yiq(entry, self.palette.as_deref());
                (init.solid_color(y, i, q) + BIAS).settle().rgb565()
            })
            .collect();

        Ok(palette)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn rejects_out_of_range_parameters() {
        let mut setup = SnesNtscSetup::composite();
        setup.set_sharpness(1.5);
        assert_eq!(
            setup.validate(),
            Err(Error::ParameterOutOfRange {
                name: "sharpness",
                value: 1.5
            })
        );

        setup.set_sharpness(0.0).set_hue(f64::NAN);
        assert!(matches!(
            setup.validate(),
            Err(Error::ParameterOutOfRange { name: "hue", .. })
        ));
    }

    #[test]
    fn rejects_short_palette() {
        let mut setup = SnesNtscSetup::composite();
        setup.set_palette(Some(vec![0; 512].into_boxed_slice()));
        assert_eq!(setup.validate(), Err(Error::PaletteSize(512)));
    }

    #[test]
    fn palette_extremes() {
        let palette = SnesNtscSetup::composite().generate_palette().unwrap();
        assert_eq!(palette.len(), COLOR_COUNT);
        assert_eq!(palette[0x0000], 0x0000);
        assert_eq!(palette[0x7fff], 0xffdf);
    }

    #[test]
    fn monochrome_palette_is_gray() {
        let palette = SnesNtscSetup::monochrome().generate_palette().unwrap();
        for &code in &[0x001f_usize, 0x03e0, 0x7c00, 0x1234] {
            let pixel = palette[code];
            let r = pixel >> 11;
            let g = pixel >> 6 & 0x1f;
            let b = pixel & 0x1f;
            assert!(r.abs_diff(g) <= 1 && g.abs_diff(b) <= 1, "{code:#06x}: {pixel:#06x}");
        }
    }
}
