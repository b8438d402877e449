//! Ring buffer of verified transform samples for snapshot interpolation

use crate::frame::{Frame, FrameNumber};
use crate::entity::EntityRef;
use crate::transform::{Transform2D, Transform2DVertical, Transform3D};

/// Capacity used by entity views.
pub const DEFAULT_CAPACITY: usize = 32;

/// Frame-indexed ring buffer. Slot `frame % capacity` holds the most recent
/// sample written for a frame mapping to it; lookups only succeed when the
/// stored frame number matches exactly.
pub struct InterpolationBuffer<T> {
    slots: Vec<Option<(FrameNumber, T)>>,
    len: usize,
}

impl<T: Copy> InterpolationBuffer<T> {
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0);
        Self {
            slots: vec![None; capacity],
            len: 0,
        }
    }

    #[inline]
    fn slot_of(&self, frame: FrameNumber) -> usize {
        frame.rem_euclid(self.slots.len() as FrameNumber) as usize
    }

    pub fn add(&mut self, sample: T, frame: FrameNumber) {
        let slot = self.slot_of(frame);
        if self.slots[slot].is_none() {
            self.len += 1;
        }
        self.slots[slot] = Some((frame, sample));
    }

    pub fn get(&self, frame: FrameNumber) -> Option<T> {
        match self.slots[self.slot_of(frame)] {
            Some((stored, sample)) if stored == frame => Some(sample),
            _ => None,
        }
    }

    pub fn reset(&mut self) {
        self.slots.iter_mut().for_each(|slot| *slot = None);
        self.len = 0;
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

impl<T: Copy> Default for InterpolationBuffer<T> {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

/// Transform data recorded for one entity on one verified frame.
#[derive(Debug, Copy, Clone, Default, PartialEq)]
pub struct TransformSample {
    pub transform_2d: Option<Transform2D>,
    pub vertical: Option<Transform2DVertical>,
    pub transform_3d: Option<Transform3D>,
}

impl TransformSample {
    /// Capture `entity` from `frame`. Planar data wins when both are present;
    /// returns `None` when the entity has no transform at all.
    pub fn capture(frame: &dyn Frame, entity: EntityRef) -> Option<Self> {
        if let Some(transform) = frame.transform_2d(entity) {
            return Some(Self {
                transform_2d: Some(transform),
                vertical: frame.transform_2d_vertical(entity),
                transform_3d: None,
            });
        }
        frame.transform_3d(entity).map(|transform| Self {
            transform_2d: None,
            vertical: frame.transform_2d_vertical(entity),
            transform_3d: Some(transform),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_requires_exact_frame() {
        let mut buffer = InterpolationBuffer::new(4);
        buffer.add(10u32, 3);
        assert_eq!(buffer.get(3), Some(10));
        // 7 maps onto the same slot but was never written
        assert_eq!(buffer.get(7), None);
    }

    #[test]
    fn wraps_around_and_overwrites() {
        let mut buffer = InterpolationBuffer::new(4);
        for frame in 0..6 {
            buffer.add(frame as u32 * 10, frame);
        }
        assert_eq!(buffer.len(), 4);
        assert_eq!(buffer.get(1), None);
        assert_eq!(buffer.get(5), Some(50));
        assert_eq!(buffer.get(2), Some(20));
    }

    #[test]
    fn reset_clears_all_slots() {
        let mut buffer = InterpolationBuffer::<u8>::default();
        assert_eq!(buffer.capacity(), DEFAULT_CAPACITY);
        buffer.add(1, 40);
        buffer.reset();
        assert!(buffer.is_empty());
        assert_eq!(buffer.get(40), None);
    }
}
