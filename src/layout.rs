use serde::{Deserialize, Serialize};

/// A position on a light. Strips only use `x`.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Coord {
    pub x: u8,
    pub y: u8,
}

impl Coord {
    pub const fn new(x: u8, y: u8) -> Coord {
        Coord { x, y }
    }
}

/// How a light's leds are arranged and addressed.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Layout {
    Strip {
        leds: u8,
    },
    Matrix {
        width: u8,
        height: u8,
        /// Odd rows run right to left.
        #[serde(default)]
        serpentine: bool,
    },
}

impl Layout {
    pub const fn strip(leds: u8) -> Layout {
        Layout::Strip { leds }
    }

    pub const fn matrix(width: u8, height: u8) -> Layout {
        Layout::Matrix {
            width,
            height,
            serpentine: false,
        }
    }

    pub fn led_count(&self) -> usize {
        match *self {
            Layout::Strip { leds } => leds as usize,
            Layout::Matrix { width, height, .. } => width as usize * height as usize,
        }
    }

    pub fn is_matrix(&self) -> bool {
        matches!(self, Layout::Matrix { .. })
    }

    pub fn width(&self) -> u8 {
        match *self {
            Layout::Strip { leds } => leds,
            Layout::Matrix { width, .. } => width,
        }
    }

    pub fn height(&self) -> u8 {
        match *self {
            Layout::Strip { .. } => 1,
            Layout::Matrix { height, .. } => height,
        }
    }

    /// Maps a coordinate to the index of the led in wiring order.
    pub fn index(&self, coord: Coord) -> Option<usize> {
        if coord.x >= self.width() || coord.y >= self.height() {
            return None;
        }
        let (x, y) = (coord.x as usize, coord.y as usize);
        match *self {
            Layout::Strip { .. } => Some(x),
            Layout::Matrix {
                width, serpentine, ..
            } => {
                let width = width as usize;
                if serpentine && y % 2 == 1 {
                    Some(y * width + (width - 1 - x))
                } else {
                    Some(y * width + x)
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strip_addressing() {
        let strip = Layout::strip(10);
        assert_eq!(strip.led_count(), 10);
        assert_eq!(strip.index(Coord::new(3, 0)), Some(3));
        assert_eq!(strip.index(Coord::new(10, 0)), None);
        assert_eq!(strip.index(Coord::new(0, 1)), None);
    }

    #[test]
    fn matrix_addressing() {
        let matrix = Layout::matrix(4, 3);
        assert_eq!(matrix.led_count(), 12);
        assert_eq!(matrix.index(Coord::new(1, 2)), Some(9));
        assert_eq!(matrix.index(Coord::new(4, 0)), None);

        let snake = Layout::Matrix {
            width: 4,
            height: 3,
            serpentine: true,
        };
        assert_eq!(snake.index(Coord::new(0, 0)), Some(0));
        assert_eq!(snake.index(Coord::new(0, 1)), Some(7));
        assert_eq!(snake.index(Coord::new(3, 1)), Some(4));
        assert_eq!(snake.index(Coord::new(2, 2)), Some(10));
    }

    #[test]
    fn parses_from_json() {
        let strip: Layout = serde_json::from_str(r#"{"strip": {"leds": 30}}"#).unwrap();
        assert_eq!(strip, Layout::strip(30));
        let matrix: Layout =
            serde_json::from_str(r#"{"matrix": {"width": 8, "height": 4}}"#).unwrap();
        assert_eq!(matrix, Layout::matrix(8, 4));
    }
}
