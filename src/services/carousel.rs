//! Carousel and lightbox state
//!
//! The state of a gallery is one index into its image list. Pages carry the
//! index in the `image` query parameter, so every card and detail page owns an
//! independent [`Carousel`] built from the request.

use serde::Serialize;

use crate::models::image::PLACEHOLDER_IMAGE;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Carousel {
    index: usize,
    count: usize,
}

impl Carousel {
    /// Fresh carousel positioned on the first image
    pub fn new(count: usize) -> Self {
        Self { index: 0, count }
    }

    /// Carousel at `index`, or at 0 when the index is out of range
    pub fn at(count: usize, index: usize) -> Self {
        let mut carousel = Self::new(count);
        carousel.jump_to(index);
        carousel
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn count(&self) -> usize {
        self.count
    }

    pub fn next(&mut self) {
        if self.count > 0 {
            self.index = (self.index + 1) % self.count;
        }
    }

    pub fn previous(&mut self) {
        if self.count > 0 {
            self.index = (self.index + self.count - 1) % self.count;
        }
    }

    /// Select `index` directly; out-of-range values are ignored
    pub fn jump_to(&mut self, index: usize) {
        if index < self.count {
            self.index = index;
        }
    }

    pub fn next_index(&self) -> usize {
        let mut c = *self;
        c.next();
        c.index
    }

    pub fn previous_index(&self) -> usize {
        let mut c = *self;
        c.previous();
        c.index
    }

    /// Navigation is only offered with more than one image
    pub fn has_controls(&self) -> bool {
        self.count > 1
    }
}

/// Indicator dot for one image
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct Dot {
    pub index: usize,
    pub active: bool,
}

/// Template view of a gallery
#[derive(Debug, Clone, Serialize)]
pub struct GalleryView {
    pub images: Vec<String>,
    /// Image on screen; the placeholder when there are none
    pub current: String,
    pub index: usize,
    /// 1-based position for the "n / total" counter
    pub position: usize,
    pub count: usize,
    pub previous: usize,
    pub next: usize,
    pub show_controls: bool,
    pub has_images: bool,
    pub dots: Vec<Dot>,
}

impl GalleryView {
    /// Gallery over `images` showing the requested index
    pub fn new(images: Vec<String>, requested: Option<usize>) -> Self {
        let carousel = Carousel::at(images.len(), requested.unwrap_or(0));
        let current = images
            .get(carousel.index())
            .cloned()
            .unwrap_or_else(|| PLACEHOLDER_IMAGE.to_string());
        let dots = (0..carousel.count())
            .map(|index| Dot {
                index,
                active: index == carousel.index(),
            })
            .collect();

        Self {
            has_images: !images.is_empty(),
            images,
            current,
            index: carousel.index(),
            position: carousel.index() + 1,
            count: carousel.count(),
            previous: carousel.previous_index(),
            next: carousel.next_index(),
            show_controls: carousel.has_controls(),
            dots,
        }
    }
}


#[cfg(test)]
mod property_tests {
    use super::*;
    use proptest::prelude::*;

    fn carousel_strategy() -> impl Strategy<Value = Carousel> {
        (1usize..50).prop_flat_map(|count| (Just(count), 0..count).prop_map(|(n, i)| Carousel::at(n, i)))
    }

    proptest! {
        #[test]
        fn next_then_previous_is_identity(start in carousel_strategy()) {
            let mut c = start;
            c.next();
            c.previous();
            prop_assert_eq!(c, start);
        }

        #[test]
        fn next_count_times_is_identity(start in carousel_strategy()) {
            let mut c = start;
            for _ in 0..c.count() {
                c.next();
            }
            prop_assert_eq!(c, start);
        }

        #[test]
        fn index_stays_in_range(start in carousel_strategy(), steps in proptest::collection::vec(0u8..3, 0..40)) {
            let mut c = start;
            for step in steps {
                match step {
                    0 => c.next(),
                    1 => c.previous(),
                    _ => c.jump_to(c.count() / 2),
                }
                prop_assert!(c.index() < c.count());
            }
        }
    }
}
