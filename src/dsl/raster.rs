//! Pixel primitives behind the drawing commands. Everything here is pure
//! geometry over a [`Surface`]; argument validation lives in the interpreter.

use std::collections::BTreeSet;

use crate::model::{Color, Surface};

/// Paint the inclusive rectangle `[x1, x2] x [y1, y2]`, clipped to the canvas.
fn fill_rect<S: Surface + ?Sized>(surface: &mut S, (x1, x2): (i64, i64), (y1, y2): (i64, i64), color: Color) {
    let last = i64::try_from(surface.size()).unwrap_or(i64::MAX) - 1;
    let (x1, x2) = (x1.max(0), x2.min(last));
    let (y1, y2) = (y1.max(0), y2.min(last));
    for y in y1..=y2 {
        for x in x1..=x2 {
            surface.set_pixel(x, y, color);
        }
    }
}

/// Paint a `size x size` square centered on `(cx, cy)`.
///
/// The half-extent is `size / 2` (truncating), so even sizes paint one
/// extra row and column. Only the on-canvas part is visited.
/// The transparent brush paints nothing.
pub fn stamp<S: Surface + ?Sized>(surface: &mut S, cx: i64, cy: i64, size: i64, color: Color) {
    if color == Color::TRANSPARENT {
        return;
    }
    let half = size.max(1) / 2;
    fill_rect(
        surface,
        (cx.saturating_sub(half), cx.saturating_add(half)),
        (cy.saturating_sub(half), cy.saturating_add(half)),
        color,
    );
}

/// Mirror `(x, y)` into all eight octants around the origin.
fn octants(x: i64, y: i64, out: &mut BTreeSet<(i64, i64)>) {
    out.extend([(x, y), (-x, y), (x, -y), (-x, -y)]);
    if x != y {
        out.extend([(y, x), (-y, x), (y, -x), (-y, -x)]);
    }
}

/// Floor square root.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss, clippy::cast_precision_loss)]
fn isqrt(n: u128) -> u128 {
    let mut s = (n as f64).sqrt() as u128;
    if s > 0 {
        s = (s + n / s) / 2;
    }
    while s.checked_mul(s).is_none_or(|sq| sq > n) {
        s -= 1;
    }
    while (s + 1).checked_mul(s + 1).is_some_and(|sq| sq <= n) {
        s += 1;
    }
    s
}

enum OctantShape {
    /// `x` for each `y`, hand-tuned for small radii.
    Table(&'static [i64]),
    /// Midpoint stepping, evaluated in closed form.
    Midpoint(u128),
}

/// First octant of a circle outline: one point `(x_at(y), y)` for every
/// `y` in `0..=last_y`, with `x >= y`. `x_at` never increases with `y`.
struct Octant {
    shape: OctantShape,
    last_y: i64,
}

impl Octant {
    /// Radii 3 and 4 use fixed tables so those small circles keep their
    /// rounded silhouette; every other radius follows midpoint stepping
    /// from `(radius, 0)`.
    fn new(radius: i64) -> Option<Self> {
        let shape = match radius {
            r if r <= 0 => return None,
            3 => OctantShape::Table(&[3, 2]),
            4 => OctantShape::Table(&[4, 4, 3]),
            r => OctantShape::Midpoint(u128::from(r.unsigned_abs())),
        };
        let mut arc = Octant { shape, last_y: 0 };
        let (mut lo, mut hi) = (0, radius);
        while lo < hi {
            let mid = hi - (hi - lo) / 2;
            if arc.x_at(mid) >= mid {
                lo = mid;
            } else {
                hi = mid - 1;
            }
        }
        arc.last_y = lo;
        Some(arc)
    }

    /// The midpoint decision keeps `x` while `(x - 1/2)^2 + y^2 <= r^2 + 1/4`,
    /// so `x` is the largest value satisfying it: `(2x - 1)^2 <= 4r^2 - 4y^2 + 1`.
    fn x_at(&self, y: i64) -> i64 {
        match self.shape {
            OctantShape::Table(xs) => usize::try_from(y).ok().and_then(|i| xs.get(i)).copied().unwrap_or(-1),
            OctantShape::Midpoint(r) => {
                let y = u128::from(y.unsigned_abs()).min(r);
                let s = isqrt(4 * r * r - 4 * y * y + 1);
                i64::try_from((s + 1) / 2).unwrap_or(i64::MAX)
            }
        }
    }

    /// Smallest `y` in `0..=last_y` whose `x` satisfies `pred`, or `last_y + 1`.
    fn first_y(&self, pred: impl Fn(i64) -> bool) -> i64 {
        let (mut lo, mut hi) = (0, self.last_y + 1);
        while lo < hi {
            let mid = lo + (hi - lo) / 2;
            if pred(self.x_at(mid)) {
                hi = mid;
            } else {
                lo = mid + 1;
            }
        }
        lo
    }

    /// Whether some arc point has `x` in `xs` and `y` in `ys`.
    fn hits(&self, (x1, x2): (i64, i64), (y1, y2): (i64, i64)) -> bool {
        let lo = y1.max(self.first_y(|x| x <= x2));
        let hi = y2.min(self.first_y(|x| x < x1) - 1);
        lo.max(0) <= hi.min(self.last_y)
    }

    /// Whether any of the eight reflections lands in the box `xs x ys`.
    fn touches(&self, xs: (i64, i64), ys: (i64, i64)) -> bool {
        let flip = |(lo, hi): (i64, i64)| (hi.saturating_neg(), lo.saturating_neg());
        [xs, flip(xs)]
            .into_iter()
            .any(|xr| [ys, flip(ys)].into_iter().any(|yr| self.hits(xr, yr) || self.hits(yr, xr)))
    }

    fn points(&self) -> Vec<(i64, i64)> {
        let mut points = BTreeSet::new();
        for y in 0..=self.last_y {
            octants(self.x_at(y), y, &mut points);
        }
        points.into_iter().collect()
    }
}

/// Offsets of a circle outline of `radius` around the origin, sorted and
/// free of duplicates.
pub fn circle_points(radius: i64) -> Vec<(i64, i64)> {
    Octant::new(radius).map(|arc| arc.points()).unwrap_or_default()
}

/// Stamp the brush on every outline cell of a circle centered on `(cx, cy)`.
///
/// Small circles are stamped point by point. Once the outline has more
/// points than the canvas has rows, each pixel instead asks whether any
/// outline point lies within brush reach, so the cost stays bounded by the
/// canvas however large the radius.
pub fn draw_circle<S: Surface + ?Sized>(surface: &mut S, cx: i64, cy: i64, radius: i64, brush: i64, color: Color) {
    if color == Color::TRANSPARENT {
        return;
    }
    let Some(arc) = Octant::new(radius) else {
        return;
    };
    let side = i64::try_from(surface.size()).unwrap_or(i64::MAX);
    if arc.last_y <= side {
        for (ox, oy) in arc.points() {
            stamp(surface, cx.saturating_add(ox), cy.saturating_add(oy), brush, color);
        }
        return;
    }
    let half = brush.max(1) / 2;
    let reach = |d: i64| (d.saturating_sub(half), d.saturating_add(half));
    for y in 0..side {
        for x in 0..side {
            if arc.touches(reach(x.saturating_sub(cx)), reach(y.saturating_sub(cy))) {
                surface.set_pixel(x, y, color);
            }
        }
    }
}

/// Stamp the brush along the border of a `width x height` rectangle
/// centered on `(cx, cy)`.
///
/// The top-left corner is `center - extent / 2` (truncating), so even
/// extents sit one cell toward the top-left. A run of stamps along one
/// side covers a rectangle, so each side is painted as a single clipped
/// fill.
pub fn draw_rectangle<S: Surface + ?Sized>(
    surface: &mut S,
    (cx, cy): (i64, i64),
    (width, height): (i64, i64),
    brush: i64,
    color: Color,
) {
    if color == Color::TRANSPARENT || width <= 0 || height <= 0 {
        return;
    }
    let half = brush.max(1) / 2;
    let x1 = cx.saturating_sub(width / 2);
    let y1 = cy.saturating_sub(height / 2);
    let x2 = x1.saturating_add(width - 1);
    let y2 = y1.saturating_add(height - 1);
    let grow = |lo: i64, hi: i64| (lo.saturating_sub(half), hi.saturating_add(half));
    for (xs, ys) in [
        (grow(x1, x2), grow(y1, y1)),
        (grow(x1, x2), grow(y2, y2)),
        (grow(x1, x1), grow(y1, y2)),
        (grow(x2, x2), grow(y1, y2)),
    ] {
        fill_rect(surface, xs, ys, color);
    }
}

/// 4-connected flood fill from `(x, y)`, replacing every reachable pixel
/// approximately equal to the seed's color. Returns the number of pixels painted.
///
/// Uses an explicit stack and a visited grid, so work is bounded by the
/// canvas area regardless of tolerance.
pub fn flood_fill<S: Surface + ?Sized>(surface: &mut S, x: i64, y: i64, color: Color) -> usize {
    let Some(target) = surface.pixel(x, y) else {
        return 0;
    };
    if color == Color::TRANSPARENT || color.approx_eq(target) {
        return 0;
    }

    let size = surface.size();
    let mut visited = vec![false; size * size];
    let mut stack = vec![(x, y)];
    let mut painted = 0;

    while let Some((px, py)) = stack.pop() {
        let (Ok(ux), Ok(uy)) = (usize::try_from(px), usize::try_from(py)) else {
            continue;
        };
        if ux >= size || uy >= size {
            continue;
        }
        let Some(seen) = visited.get_mut(uy * size + ux) else {
            continue;
        };
        if *seen {
            continue;
        }
        *seen = true;

        match surface.pixel(px, py) {
            Some(c) if c.approx_eq(target) => {}
            _ => continue,
        }
        surface.set_pixel(px, py, color);
        painted += 1;

        stack.push((px + 1, py));
        stack.push((px - 1, py));
        stack.push((px, py + 1));
        stack.push((px, py - 1));
    }
    painted
}

/// Count pixels approximately equal to `color` in the inclusive rectangle
/// spanned by two corners, clipped to the canvas.
pub fn count_color<S: Surface + ?Sized>(surface: &S, color: Color, (x1, y1): (i64, i64), (x2, y2): (i64, i64)) -> i64 {
    let last = i64::try_from(surface.size()).unwrap_or(i64::MAX) - 1;
    let (lo_x, hi_x) = (x1.min(x2).max(0), x1.max(x2).min(last));
    let (lo_y, hi_y) = (y1.min(y2).max(0), y1.max(y2).min(last));

    let mut count = 0;
    for y in lo_y..=hi_y {
        for x in lo_x..=hi_x {
            if surface.pixel(x, y).is_some_and(|c| c.approx_eq(color)) {
                count += 1;
            }
        }
    }
    count
}
