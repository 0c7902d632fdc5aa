//! Segment intersection helpers backing the arena's ray queries.

use ctf_core::{GridCell, GridModel, HitTarget, TilePosition};
use glam::Vec2;

/// Walks the tiles crossed by the segment and reports the first obstacle.
///
/// The result is the segment parameter in `[0, 1]` where the obstacle is
/// entered together with its classification. Leaving the grid counts as
/// hitting the arena boundary.
pub(crate) fn first_obstacle<G>(grid: &G, start: Vec2, end: Vec2) -> Option<(f32, HitTarget)>
where
    G: GridModel + ?Sized,
{
    let delta = end - start;
    let mut column = start.x.floor() as i64;
    let mut row = start.y.floor() as i64;
    let step_column = if delta.x < 0.0 { -1 } else { 1 };
    let step_row = if delta.y < 0.0 { -1 } else { 1 };
    let (mut next_column, span_column) = axis_crossing(start.x, delta.x);
    let (mut next_row, span_row) = axis_crossing(start.y, delta.y);
    let mut t = 0.0;

    loop {
        let Some(tile) = tile_at(grid, column, row) else {
            return Some((t, HitTarget::Other));
        };
        match grid.content(tile) {
            GridCell::Open => {}
            GridCell::Breakable => return Some((t, HitTarget::DestructibleBox(tile))),
            GridCell::Unbreakable => return Some((t, HitTarget::Other)),
        }

        if next_column < next_row {
            t = next_column;
            next_column += span_column;
            column += step_column;
        } else {
            t = next_row;
            next_row += span_row;
            row += step_row;
        }

        if t > 1.0 {
            return None;
        }
    }
}

/// Segment parameter at which the segment enters the circle, if it does.
pub(crate) fn circle_entry(start: Vec2, delta: Vec2, center: Vec2, radius: f32) -> Option<f32> {
    let offset = start - center;
    let c = offset.length_squared() - radius * radius;
    if c <= 0.0 {
        return Some(0.0);
    }

    let a = delta.length_squared();
    if a == 0.0 {
        return None;
    }
    let b = 2.0 * offset.dot(delta);
    let discriminant = b * b - 4.0 * a * c;
    if discriminant < 0.0 {
        return None;
    }

    let t = (-b - discriminant.sqrt()) / (2.0 * a);
    (0.0..=1.0).contains(&t).then_some(t)
}

/// Parameter of the first grid line crossed along one axis and the spacing
/// between subsequent crossings.
fn axis_crossing(origin: f32, delta: f32) -> (f32, f32) {
    if delta > 0.0 {
        ((origin.floor() + 1.0 - origin) / delta, 1.0 / delta)
    } else if delta < 0.0 {
        ((origin - origin.floor()) / -delta, 1.0 / -delta)
    } else {
        (f32::INFINITY, f32::INFINITY)
    }
}

fn tile_at<G>(grid: &G, column: i64, row: i64) -> Option<TilePosition>
where
    G: GridModel + ?Sized,
{
    let tile = TilePosition::new(u32::try_from(column).ok()?, u32::try_from(row).ok()?);
    grid.contains(tile).then_some(tile)
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Strip(Vec<GridCell>);

    impl GridModel for Strip {
        fn width(&self) -> u32 {
            self.0.len() as u32
        }

        fn height(&self) -> u32 {
            1
        }

        fn content(&self, tile: TilePosition) -> GridCell {
            self.0[tile.x() as usize]
        }
    }

    #[test]
    fn first_breakable_tile_is_reported() {
        let strip = Strip(vec![
            GridCell::Open,
            GridCell::Open,
            GridCell::Breakable,
            GridCell::Unbreakable,
        ]);

        let hit = first_obstacle(&strip, Vec2::new(0.5, 0.5), Vec2::new(3.5, 0.5));

        let (t, target) = hit.expect("box in line");
        assert_eq!(target, HitTarget::DestructibleBox(TilePosition::new(2, 0)));
        assert!((t - 0.5).abs() < 1e-5);
    }

    #[test]
    fn leaving_the_grid_hits_the_boundary() {
        let strip = Strip(vec![GridCell::Open; 3]);

        let hit = first_obstacle(&strip, Vec2::new(1.5, 0.5), Vec2::new(-2.5, 0.5));

        let (t, target) = hit.expect("boundary");
        assert_eq!(target, HitTarget::Other);
        assert!((t - 0.375).abs() < 1e-5);
    }

    #[test]
    fn short_segment_inside_open_ground_hits_nothing() {
        let strip = Strip(vec![GridCell::Open; 3]);

        assert!(first_obstacle(&strip, Vec2::new(0.5, 0.5), Vec2::new(2.2, 0.5)).is_none());
    }

    #[test]
    fn circle_entry_measures_from_the_segment_start() {
        let entry = circle_entry(Vec2::ZERO, Vec2::new(10.0, 0.0), Vec2::new(5.0, 0.0), 1.0);

        assert!((entry.expect("crossing") - 0.4).abs() < 1e-5);
        assert!(circle_entry(Vec2::ZERO, Vec2::new(10.0, 0.0), Vec2::new(5.0, 2.0), 1.0).is_none());
        assert_eq!(
            circle_entry(Vec2::ZERO, Vec2::new(1.0, 0.0), Vec2::new(0.1, 0.0), 0.5),
            Some(0.0)
        );
    }
}
