//! Vector and quaternion value types carried by motion events.
//!
//! Orientation events deliver a unit [`Quaternion`]; accelerometer and
//! gyroscope events deliver a [`Vector3`] in g and deg/s respectively.

use std::ops::{Add, Index, Mul, MulAssign, Neg, Sub};

/// A three-component vector.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Vector3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Vector3 {
    pub const ZERO: Vector3 = Vector3::new(0.0, 0.0, 0.0);
    pub const X: Vector3 = Vector3::new(1.0, 0.0, 0.0);
    pub const Y: Vector3 = Vector3::new(0.0, 1.0, 0.0);
    pub const Z: Vector3 = Vector3::new(0.0, 0.0, 1.0);

    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    pub fn magnitude(&self) -> f64 {
        self.dot(self).sqrt()
    }

    /// Unit vector in the same direction. Components are NaN for the zero vector.
    pub fn normalized(&self) -> Vector3 {
        let mag = self.magnitude();
        Vector3::new(self.x / mag, self.y / mag, self.z / mag)
    }

    pub fn dot(&self, rhs: &Vector3) -> f64 {
        self.x * rhs.x + self.y * rhs.y + self.z * rhs.z
    }

    pub fn cross(&self, rhs: &Vector3) -> Vector3 {
        Vector3::new(
            self.y * rhs.z - self.z * rhs.y,
            self.z * rhs.x - self.x * rhs.z,
            self.x * rhs.y - self.y * rhs.x,
        )
    }

    /// Angle to `rhs` in radians, in `[0, π]`.
    ///
    /// The cosine is clamped so round-off on (anti)parallel vectors cannot
    /// push `acos` out of its domain.
    pub fn angle_to(&self, rhs: &Vector3) -> f64 {
        let cos = self.dot(rhs) / (self.magnitude() * rhs.magnitude());
        cos.clamp(-1.0, 1.0).acos()
    }

    pub fn to_array(&self) -> [f64; 3] {
        [self.x, self.y, self.z]
    }
}

impl From<[f64; 3]> for Vector3 {
    fn from(v: [f64; 3]) -> Self {
        Vector3::new(v[0], v[1], v[2])
    }
}

impl Index<usize> for Vector3 {
    type Output = f64;

    fn index(&self, index: usize) -> &f64 {
        match index {
            0 => &self.x,
            1 => &self.y,
            2 => &self.z,
            _ => panic!("Vector3 index out of range: {}", index),
        }
    }
}

impl Add for Vector3 {
    type Output = Vector3;

    fn add(self, rhs: Vector3) -> Vector3 {
        Vector3::new(self.x + rhs.x, self.y + rhs.y, self.z + rhs.z)
    }
}

impl Sub for Vector3 {
    type Output = Vector3;

    fn sub(self, rhs: Vector3) -> Vector3 {
        Vector3::new(self.x - rhs.x, self.y - rhs.y, self.z - rhs.z)
    }
}

impl Neg for Vector3 {
    type Output = Vector3;

    fn neg(self) -> Vector3 {
        Vector3::new(-self.x, -self.y, -self.z)
    }
}

impl Mul<f64> for Vector3 {
    type Output = Vector3;

    fn mul(self, rhs: f64) -> Vector3 {
        Vector3::new(self.x * rhs, self.y * rhs, self.z * rhs)
    }
}

/// A rotation quaternion: vector part (x, y, z) and scalar part w.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Quaternion {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub w: f64,
}

impl Default for Quaternion {
    fn default() -> Self {
        Quaternion::IDENTITY
    }
}

impl Quaternion {
    pub const IDENTITY: Quaternion = Quaternion::new(0.0, 0.0, 0.0, 1.0);

    pub const fn new(x: f64, y: f64, z: f64, w: f64) -> Self {
        Self { x, y, z, w }
    }

    /// Right-handed rotation of `angle` radians about `axis`.
    ///
    /// `axis` is used as given; pass a unit vector for a unit quaternion.
    pub fn from_axis_angle(axis: &Vector3, angle: f64) -> Quaternion {
        let (s, c) = (angle / 2.0).sin_cos();
        Quaternion::new(axis.x * s, axis.y * s, axis.z * s, c)
    }

    /// Shortest rotation taking the direction of `from` onto the direction of `to`.
    ///
    /// Returns the identity for parallel inputs and when either input has zero
    /// length. For antiparallel inputs the rotation is a half turn about an
    /// axis perpendicular to `from`.
    pub fn rotation_between(from: &Vector3, to: &Vector3) -> Quaternion {
        let mut cross = from.cross(to);
        let mut cos_theta = from.dot(to);

        // Product of the magnitudes.
        let mut k = (from.dot(from) * to.dot(to)).sqrt();
        if k <= 0.0 || !k.is_finite() {
            return Quaternion::IDENTITY;
        }
        if cos_theta / k >= 1.0 {
            return Quaternion::IDENTITY;
        }

        if cos_theta / k <= -1.0 {
            // Cross against whichever reference axis is further from `from`.
            let unit = from.normalized();
            let reference = if unit.x.abs() < 0.9 {
                Vector3::X
            } else {
                Vector3::Y
            };
            cross = from.cross(&reference);
            k = 0.0;
            cos_theta = 0.0;
        }

        Quaternion::new(cross.x, cross.y, cross.z, k + cos_theta).normalized()
    }

    pub fn conjugate(&self) -> Quaternion {
        Quaternion::new(-self.x, -self.y, -self.z, self.w)
    }

    pub fn norm(&self) -> f64 {
        (self.x * self.x + self.y * self.y + self.z * self.z + self.w * self.w).sqrt()
    }

    /// Unit quaternion for the same rotation. Components are NaN for the zero quaternion.
    pub fn normalized(&self) -> Quaternion {
        let n = self.norm();
        Quaternion::new(self.x / n, self.y / n, self.z / n, self.w / n)
    }

    /// Rotate `v` by this quaternion: the vector part of `q * (v, 0) * q̄`.
    pub fn rotate(&self, v: &Vector3) -> Vector3 {
        let p = Quaternion::new(v.x, v.y, v.z, 0.0);
        let r = *self * p * self.conjugate();
        Vector3::new(r.x, r.y, r.z)
    }

    /// Euler angles `[roll, pitch, yaw]` in radians.
    ///
    /// Roll is about x, pitch about y, yaw about z. The pitch sine is clamped
    /// to keep `asin` defined near gimbal lock.
    pub fn to_euler(&self) -> [f64; 3] {
        let (x, y, z, w) = (self.x, self.y, self.z, self.w);
        let roll = (2.0 * (w * x + y * z)).atan2(1.0 - 2.0 * (x * x + y * y));
        let pitch = (2.0 * (w * y - z * x)).clamp(-1.0, 1.0).asin();
        let yaw = (2.0 * (w * z + x * y)).atan2(1.0 - 2.0 * (y * y + z * z));
        [roll, pitch, yaw]
    }

    /// Components as `[x, y, z, w]`.
    pub fn to_array(&self) -> [f64; 4] {
        [self.x, self.y, self.z, self.w]
    }
}

/// Hamilton product. Not commutative.
impl Mul for Quaternion {
    type Output = Quaternion;

    fn mul(self, rhs: Quaternion) -> Quaternion {
        Quaternion::new(
            self.w * rhs.x + self.x * rhs.w + self.y * rhs.z - self.z * rhs.y,
            self.w * rhs.y - self.x * rhs.z + self.y * rhs.w + self.z * rhs.x,
            self.w * rhs.z + self.x * rhs.y - self.y * rhs.x + self.z * rhs.w,
            self.w * rhs.w - self.x * rhs.x - self.y * rhs.y - self.z * rhs.z,
        )
    }
}

impl MulAssign for Quaternion {
    fn mul_assign(&mut self, rhs: Quaternion) {
        *self = *self * rhs;
    }
}
