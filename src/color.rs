use palette::{FromColor, Hsv as PaletteHsv, Srgb};

/// An 8 bit per channel rgb color.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

/// An 8 bit per channel hsv color.
///
/// The hue covers the full color wheel in 256 steps, so 0 and 255 are
/// neighbours.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct Hsv {
    pub h: u8,
    pub s: u8,
    pub v: u8,
}

impl Rgb {
    pub const BLACK: Rgb = Rgb { r: 0, g: 0, b: 0 };

    pub const fn new(r: u8, g: u8, b: u8) -> Rgb {
        return Rgb { r, g, b };
    }

    // Render as 0x00RRGGBB.
    pub fn to_u32(&self) -> u32 {
        return ((self.r as u32) << 16) | ((self.g as u32) << 8) | (self.b as u32);
    }
}

impl Hsv {
    pub const fn new(h: u8, s: u8, v: u8) -> Hsv {
        return Hsv { h, s, v };
    }

    pub fn to_rgb(&self) -> Rgb {
        if self.v == 0 {
            return Rgb::BLACK;
        }
        let hsv = PaletteHsv::new(
            self.h as f32 * 360.0 / 256.0,
            self.s as f32 / 255.0,
            self.v as f32 / 255.0,
        );
        let rgb = Srgb::from_color(hsv).into_format::<u8>();
        return Rgb::new(rgb.red, rgb.green, rgb.blue);
    }
}

impl From<Hsv> for Rgb {
    fn from(hsv: Hsv) -> Rgb {
        hsv.to_rgb()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn primary_hues() {
        assert_eq!(Hsv::new(0, 255, 255).to_rgb(), Rgb::new(255, 0, 0));
        assert_eq!(Hsv::new(0, 0, 255).to_rgb(), Rgb::new(255, 255, 255));
        assert_eq!(Hsv::new(123, 200, 0).to_rgb(), Rgb::BLACK);

        let green = Hsv::new(85, 255, 255).to_rgb();
        assert!(green.g > 250 && green.r < 10 && green.b < 10, "{:?}", green);
    }

    #[test]
    fn packs_rgb() {
        assert_eq!(Rgb::new(0x12, 0x34, 0x56).to_u32(), 0x123456);
    }
}
