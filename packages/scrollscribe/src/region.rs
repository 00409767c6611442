//! Screen rectangle that bounds every capture of a run.
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegionError {
    #[error("region must be at least 1x1 pixels, got {width}x{height}")]
    Empty { width: u32, height: u32 },
    #[error("cannot parse region {0:?}: expected \"x,y,WIDTHxHEIGHT\" or \"x,y,width,height\"")]
    Syntax(String),
}

/// Fixed rectangle in screen pixels, validated to be non-empty.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "RawRegion", into = "RawRegion")]
pub struct Region {
    x: i32,
    y: i32,
    width: u32,
    height: u32,
}

#[derive(Serialize, Deserialize)]
struct RawRegion {
    x: i32,
    y: i32,
    width: u32,
    height: u32,
}

impl Region {
    pub fn new(x: i32, y: i32, width: u32, height: u32) -> Result<Self, RegionError> {
        if width == 0 || height == 0 {
            return Err(RegionError::Empty { width, height });
        }
        Ok(Self { x, y, width, height })
    }

    pub fn x(&self) -> i32 {
        self.x
    }

    pub fn y(&self) -> i32 {
        self.y
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }
}

impl TryFrom<RawRegion> for Region {
    type Error = RegionError;

    fn try_from(raw: RawRegion) -> Result<Self, Self::Error> {
        Region::new(raw.x, raw.y, raw.width, raw.height)
    }
}

impl From<Region> for RawRegion {
    fn from(region: Region) -> Self {
        RawRegion {
            x: region.x,
            y: region.y,
            width: region.width,
            height: region.height,
        }
    }
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{},{}x{}", self.x, self.y, self.width, self.height)
    }
}

impl FromStr for Region {
    type Err = RegionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let syntax = || RegionError::Syntax(s.to_string());
        let parts: Vec<&str> = s.split(',').map(str::trim).collect();
        let (x, y, w, h) = match parts.as_slice() {
            [x, y, size] => {
                let (w, h) = size.split_once(['x', 'X']).ok_or_else(syntax)?;
                (*x, *y, w.trim(), h.trim())
            }
            [x, y, w, h] => (*x, *y, *w, *h),
            _ => return Err(syntax()),
        };
        Region::new(
            x.parse().map_err(|_| syntax())?,
            y.parse().map_err(|_| syntax())?,
            w.parse().map_err(|_| syntax())?,
            h.parse().map_err(|_| syntax())?,
        )
    }
}
