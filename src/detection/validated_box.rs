/// Bounding box in source-frame pixels that passed every decoding check.
///
/// Guarantees `left < right <= frame_width`, `top < bottom <= frame_height`,
/// a confidence at or above the decoder threshold and a class id below the
/// decoder's class count. Only [`DetectionDecoder`](super::DetectionDecoder)
/// creates these.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize)]
pub struct ValidatedBox {
    left: u32,
    top: u32,
    right: u32,
    bottom: u32,
    class_id: usize,
    confidence: f32,
}

impl ValidatedBox {
    #[inline]
    pub(crate) fn new(
        left: u32,
        top: u32,
        right: u32,
        bottom: u32,
        class_id: usize,
        confidence: f32,
    ) -> Self {
        debug_assert!(left < right && top < bottom);
        Self {
            left,
            top,
            right,
            bottom,
            class_id,
            confidence,
        }
    }

    #[inline]
    pub fn left(&self) -> u32 {
        self.left
    }

    #[inline]
    pub fn top(&self) -> u32 {
        self.top
    }

    #[inline]
    pub fn right(&self) -> u32 {
        self.right
    }

    #[inline]
    pub fn bottom(&self) -> u32 {
        self.bottom
    }

    #[inline]
    pub fn class_id(&self) -> usize {
        self.class_id
    }

    #[inline]
    pub fn confidence(&self) -> f32 {
        self.confidence
    }

    /// Always > 0.
    #[inline]
    pub fn width(&self) -> u32 {
        self.right - self.left
    }

    /// Always > 0.
    #[inline]
    pub fn height(&self) -> u32 {
        self.bottom - self.top
    }

    #[inline]
    pub fn area(&self) -> u64 {
        u64::from(self.width()) * u64::from(self.height())
    }

    /// Convert to TLBR format: (left, top, right, bottom).
    #[inline]
    pub fn to_tlbr(&self) -> [u32; 4] {
        [self.left, self.top, self.right, self.bottom]
    }

    /// Convert to TLWH format: (left, top, width, height).
    #[inline]
    pub fn to_tlwh(&self) -> [u32; 4] {
        [self.left, self.top, self.width(), self.height()]
    }

    /// Display label such as `"birds 0.87"`, falling back to the class id
    /// when `class_names` has no entry for it.
    pub fn label(&self, class_names: &[String]) -> String {
        match class_names.get(self.class_id) {
            Some(name) => format!("{} {:.2}", name, self.confidence),
            None => format!("class {} {:.2}", self.class_id, self.confidence),
        }
    }
}
