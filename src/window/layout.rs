//! Pure layout computation: given an ordered set of tileable clients and the
//! usable screen area, produce one rectangle per client. No X calls happen
//! here; the manager applies the results.

use crate::xconn::Rect;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TilingDirection {
    Horizontal,
    Vertical,
}

impl TilingDirection {
    fn flipped(self) -> Self {
        match self {
            TilingDirection::Horizontal => TilingDirection::Vertical,
            TilingDirection::Vertical => TilingDirection::Horizontal,
        }
    }
}

/// Splits `area` among `count` clients with recursive 50/50 halves: the first
/// client takes one half, the rest share the other. With `alternate` the
/// split axis flips at each level (a dwindle layout), otherwise it holds.
///
/// Deterministic in its inputs, so applying it twice to the same client set
/// yields identical rectangles.
pub fn split(count: usize, area: Rect, direction: TilingDirection, alternate: bool) -> Vec<Rect> {
    let mut rects = Vec::with_capacity(count);
    fill(count, area, direction, alternate, &mut rects);
    rects
}

fn fill(count: usize, area: Rect, direction: TilingDirection, alternate: bool, out: &mut Vec<Rect>) {
    match count {
        0 => {}
        1 => out.push(area),
        _ => {
            let (head, rest) = halve(area, direction);
            out.push(head);
            let next = if alternate { direction.flipped() } else { direction };
            fill(count - 1, rest, next, alternate, out);
        }
    }
}

fn halve(area: Rect, direction: TilingDirection) -> (Rect, Rect) {
    match direction {
        TilingDirection::Horizontal => {
            let left = area.w / 2;
            (
                Rect::new(area.x, area.y, left, area.h),
                Rect::new(area.x + left as i32, area.y, area.w - left, area.h),
            )
        }
        TilingDirection::Vertical => {
            let top = area.h / 2;
            (
                Rect::new(area.x, area.y, area.w, top),
                Rect::new(area.x, area.y + top as i32, area.w, area.h - top),
            )
        }
    }
}

/// Shrinks the full display rectangle by every dock pinned to a screen edge.
/// A dock counts as pinned when its rectangle touches the top, bottom, left
/// or right edge of the remaining area, checked in that order.
pub fn tiling_area(screen: Rect, docks: &[Rect]) -> Rect {
    let mut area = screen;
    for dock in docks {
        if dock.y == 0 {
            area.y += dock.h as i32;
            area.h = area.h.saturating_sub(dock.h);
        } else if dock.y + dock.h as i32 == area.y + area.h as i32 {
            area.h = area.h.saturating_sub(dock.h);
        } else if dock.x == 0 {
            area.x += dock.w as i32;
            area.w = area.w.saturating_sub(dock.w);
        } else if dock.x + dock.w as i32 == area.x + area.w as i32 {
            area.w = area.w.saturating_sub(dock.w);
        }
    }
    area
}
