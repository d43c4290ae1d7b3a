//! Integer pixel rectangles

use glam::IVec2;

/// Half-open pixel rectangle `[min, max)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Bounds2i {
    pub min: IVec2,
    pub max: IVec2,
}

impl Bounds2i {
    pub fn from_offset_size(offset: IVec2, size: IVec2) -> Self {
        Self {
            min: offset,
            max: offset + size,
        }
    }

    pub fn size(&self) -> IVec2 {
        (self.max - self.min).max(IVec2::ZERO)
    }

    pub fn width(&self) -> usize {
        self.size().x as usize
    }

    pub fn height(&self) -> usize {
        self.size().y as usize
    }

    pub fn area(&self) -> usize {
        self.width() * self.height()
    }

    pub fn is_empty(&self) -> bool {
        self.max.x <= self.min.x || self.max.y <= self.min.y
    }

    pub fn contains(&self, p: IVec2) -> bool {
        p.x >= self.min.x && p.y >= self.min.y && p.x < self.max.x && p.y < self.max.y
    }

    /// True when `other` lies entirely inside `self`.
    pub fn contains_bounds(&self, other: &Bounds2i) -> bool {
        other.min.x >= self.min.x
            && other.min.y >= self.min.y
            && other.max.x <= self.max.x
            && other.max.y <= self.max.y
    }

    pub fn intersect(&self, other: &Bounds2i) -> Bounds2i {
        Bounds2i {
            min: self.min.max(other.min),
            max: self.max.min(other.max),
        }
    }

    pub fn expand(&self, amount: i32) -> Bounds2i {
        Bounds2i {
            min: self.min - IVec2::splat(amount),
            max: self.max + IVec2::splat(amount),
        }
    }
}
