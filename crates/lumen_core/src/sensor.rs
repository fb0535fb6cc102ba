//! Sensor readings delivered by the orientation and location producers.

/// Device orientation as a rotation quaternion.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Orientation {
    /// X component.
    pub x: f32,
    /// Y component.
    pub y: f32,
    /// Z component.
    pub z: f32,
    /// W (scalar) component.
    pub w: f32,
}

impl Orientation {
    /// The identity rotation.
    pub const IDENTITY: Self = Self {
        x: 0.0,
        y: 0.0,
        z: 0.0,
        w: 1.0,
    };

    /// Creates a quaternion from its components.
    #[must_use]
    pub const fn new(x: f32, y: f32, z: f32, w: f32) -> Self {
        Self { x, y, z, w }
    }

    /// Rotation of `angle_rad` around the vertical axis.
    #[must_use]
    pub fn around_y(angle_rad: f32) -> Self {
        let half = angle_rad * 0.5;
        Self::new(0.0, half.sin(), 0.0, half.cos())
    }

    /// Returns the unit-length quaternion, or identity for a zero quaternion.
    #[must_use]
    pub fn normalized(self) -> Self {
        let len = (self.x * self.x + self.y * self.y + self.z * self.z + self.w * self.w).sqrt();
        if len <= f32::EPSILON {
            return Self::IDENTITY;
        }
        Self::new(self.x / len, self.y / len, self.z / len, self.w / len)
    }
}

impl Default for Orientation {
    fn default() -> Self {
        Self::IDENTITY
    }
}

/// A location fix.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LocationFix {
    /// Latitude in degrees.
    pub latitude_deg: f64,
    /// Longitude in degrees.
    pub longitude_deg: f64,
    /// Altitude above sea level in metres.
    pub altitude_m: f64,
    /// Horizontal accuracy radius in metres.
    pub accuracy_m: f32,
}
