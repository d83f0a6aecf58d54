//! Geometry for the headless page: block layout and viewport intersection

pub mod layout;

pub use layout::{gallery_columns, layout_document, Layout};

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

impl Rect {
    pub fn bottom(&self) -> i32 {
        self.y + self.height as i32
    }
}

/// Fraction of `rect` inside the vertical window `[scroll_y, scroll_y +
/// viewport_height)`, the way `IntersectionObserverEntry.intersectionRatio`
/// reports it for a root equal to the viewport.
pub fn intersection_ratio(rect: &Rect, scroll_y: i32, viewport_height: u32) -> f64 {
    if rect.height == 0 {
        return 0.0;
    }
    let top = rect.y.max(scroll_y);
    let bottom = rect.bottom().min(scroll_y + viewport_height as i32);
    if bottom <= top {
        return 0.0;
    }
    (bottom - top) as f64 / rect.height as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ratio_of_fully_visible_partial_and_hidden_rects() {
        let r = Rect { x: 0, y: 100, width: 10, height: 100 };
        assert_eq!(intersection_ratio(&r, 0, 720), 1.0);
        assert_eq!(intersection_ratio(&r, 150, 720), 0.5);
        assert_eq!(intersection_ratio(&r, 300, 720), 0.0);
        assert_eq!(intersection_ratio(&Rect { height: 0, ..r }, 0, 720), 0.0);
    }
}
