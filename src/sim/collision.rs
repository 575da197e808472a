//! Collision detection and response
//!
//! Balls are boxes moving along an angle. A hit is resolved by working out
//! which edge of the target was struck, from where the ball was one step
//! earlier, and reflecting the angle off that edge.

use std::f64::consts::{PI, TAU};

use rand::Rng;

use super::ball::{Ball, increase_speed};
use super::bat::Bat;
use super::geometry::{Rect, Side};
use super::level::{Level, hit_block};
use super::powerup::Powerup;
use super::state::GameSession;
use crate::consts::*;
use crate::normalize_direction;

/// Largest deflection off the bat, either side of straight up
const BAT_MAX_DEFLECTION: f64 = 37.5 * PI / 180.0;
/// Shallowest angles the bat may send a ball off at
const BAT_LOW_CAP: f64 = 120.0 * PI / 180.0;
const BAT_HIGH_CAP: f64 = 240.0 * PI / 180.0;

/// Which side of `target` the ball came in through.
///
/// Uses the ball's rect one step back along its velocity. The spans are
/// compared with strict inequalities, so a ball that was exactly level with
/// an edge counts as diagonal.
pub fn hit_side(ball: &Ball, target: &Rect) -> Side {
    let v = ball.velocity();
    let x1 = (ball.rect.x1 as f64 - v.x) as i32;
    let x2 = (ball.rect.x2 as f64 - v.x) as i32;
    let y1 = (ball.rect.y1 as f64 - v.y) as i32;
    let y2 = (ball.rect.y2 as f64 - v.y) as i32;

    let spans_x = (x1 > target.x1 && x1 < target.x2)
        || (x2 > target.x1 && x2 < target.x2)
        || (x1 < target.x1 && x2 > target.x2);
    let spans_y = (y1 > target.y1 && y1 < target.y2)
        || (y2 > target.y1 && y2 < target.y2)
        || (y1 < target.y1 && y2 > target.y2);

    if spans_x {
        if y2 < target.y1 {
            Side::Top
        } else if y1 > target.y2 {
            Side::Bottom
        } else {
            Side::Diagonal
        }
    } else if spans_y {
        if x2 < target.x1 {
            Side::Left
        } else if x1 > target.x2 {
            Side::Right
        } else {
            Side::Diagonal
        }
    } else {
        Side::Diagonal
    }
}

/// Settle a diagonal block hit using the block's neighbours.
///
/// A ball coming in at a corner can't really hit the edge that has a
/// neighbouring block against it, so it bounces off the other one.
pub fn block_hit_side(level: &Level, index: usize, ball: &Ball) -> Side {
    let v = ball.velocity();
    let prev_x1 = (ball.rect.x1 as f64 - v.x) as i32;
    let prev_y1 = (ball.rect.y1 as f64 - v.y) as i32;
    let ball_x = prev_x1 + BALL_WIDTH / 2;
    let ball_y = prev_y1 + BALL_HEIGHT / 2;

    let block = Level::cell_rect(index);
    let block_x = block.x1 + BLOCK_WIDTH / 2;
    let block_y = block.y1 + BLOCK_HEIGHT / 2;

    let (vertical, vertical_side) = if ball_y < block_y {
        (level.has_neighbour(index, Side::Top), Side::Top)
    } else {
        (level.has_neighbour(index, Side::Bottom), Side::Bottom)
    };
    let (horizontal, horizontal_side) = if ball_x < block_x {
        (level.has_neighbour(index, Side::Left), Side::Left)
    } else {
        (level.has_neighbour(index, Side::Right), Side::Right)
    };

    match (vertical, horizontal) {
        (true, false) => horizontal_side,
        (false, true) => vertical_side,
        _ => Side::Diagonal,
    }
}

/// Jitter a direction by up to ±`entropy`/2 of a half turn
pub fn apply_entropy<R: Rng>(direction: f64, entropy: f64, rng: &mut R) -> f64 {
    direction + entropy * PI * (rng.random::<f64>() - 0.5)
}

/// Mirror a direction off the given edge, normalized to [0, 2π)
pub fn reflect_direction(direction: f64, side: Side) -> f64 {
    let reflected = match side {
        Side::Top | Side::Bottom => PI - direction,
        Side::Left | Side::Right => TAU - direction,
        Side::Diagonal => direction + PI,
        Side::None => unreachable!("reflect called without a hit side"),
    };
    normalize_direction(reflected)
}

/// Direction a ball leaves the bat at, from where it struck.
///
/// Straight up from the centre, tilting up to 37.5 degrees towards the edge
/// that was hit, never flatter than 30 degrees above horizontal.
pub fn bat_bounce_direction(ball_center_x: i32, bat: &Rect) -> f64 {
    let half = bat.width() as f64 / 2.0;
    let bat_center = bat.x1 as f64 + half;
    let t = (ball_center_x as f64 - bat_center) / half;
    (PI - t * BAT_MAX_DEFLECTION).clamp(BAT_LOW_CAP, BAT_HIGH_CAP)
}

/// Reflect a ball off `side` with the session's bounce entropy, then carry
/// it one step clear of whatever it hit
fn bounce(session: &mut GameSession, ball: &mut Ball, side: Side) {
    let entropy = session.settings.entropy_fraction();
    let jittered = apply_entropy(ball.direction, entropy, &mut session.rng);
    ball.direction = reflect_direction(jittered, side);
    ball.step();
}

/// Hit and bounce off the block the ball is in, if any
pub fn ball_block_collision(session: &mut GameSession, ball: &mut Ball) -> bool {
    let Some(index) = session.level.find_block_at(&ball.rect) else {
        return false;
    };

    hit_block(session, index);
    let mut side = hit_side(ball, &Level::cell_rect(index));
    if side == Side::Diagonal {
        side = block_hit_side(&session.level, index, ball);
    }
    increase_speed(ball, &session.tunables);
    bounce(session, ball, side);
    true
}

/// Bounce off the bat. Returns true on contact.
pub fn ball_bat_collision(bat: &Bat, ball: &mut Ball) -> bool {
    if !ball.rect.overlaps(&bat.rect) {
        return false;
    }

    match hit_side(ball, &bat.rect) {
        Side::Bottom => unreachable!(
            "ball {} struck the underside of the bat at ({}, {})",
            ball.id, ball.rect.x1, ball.rect.y1
        ),
        _ => {
            ball.direction = bat_bounce_direction(ball.rect.center_x(), &bat.rect);
            ball.step();
        }
    }
    true
}

/// Bounce off the side and top walls. Returns true if the ball fell out of
/// the bottom of the field.
pub fn ball_wall_collision(session: &mut GameSession, ball: &mut Ball) -> bool {
    let side = if ball.rect.x1 < 0 {
        if ball.rect.y1 < 0 { Side::Diagonal } else { Side::Right }
    } else if ball.rect.x2 > GAME_WIDTH {
        if ball.rect.y1 < 0 { Side::Diagonal } else { Side::Left }
    } else if ball.rect.y1 < 0 {
        Side::Bottom
    } else if ball.rect.y2 > GAME_HEIGHT {
        return true;
    } else {
        return false;
    };

    bounce(session, ball, side);
    false
}

/// Whether the bat caught a falling powerup
pub fn bat_powerup_collision(bat: &Bat, powerup: &Powerup) -> bool {
    bat.rect.overlaps(&powerup.rect)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::ball::BallState;
    use crate::sim::state::tests::session_with_rows;
    use proptest::prelude::*;

    fn free_ball(session: &mut GameSession, x: i32, y: i32, speed: f64, direction: f64) {
        let ball = &mut session.balls[0];
        ball.state = BallState::Free;
        ball.set_position(x, y);
        ball.speed = speed;
        ball.direction = direction;
    }

    #[test]
    fn test_reflect_straight_up_and_down() {
        assert_eq!(reflect_direction(PI, Side::Top), 0.0);
        assert_eq!(reflect_direction(PI, Side::Bottom), 0.0);
        assert_eq!(reflect_direction(0.0, Side::Top), PI);
        assert_eq!(reflect_direction(0.0, Side::Bottom), PI);
    }

    #[test]
    fn test_reflect_sides() {
        let d = PI / 2.0 + 0.3;
        assert!((reflect_direction(d, Side::Left) - (TAU - d)).abs() < 1e-12);
        assert!((reflect_direction(d, Side::Diagonal) - (d + PI)).abs() < 1e-12);
        // A vertical ball is unchanged by a side wall
        assert_eq!(reflect_direction(PI, Side::Right), PI);
    }

    #[test]
    fn test_hit_side_from_below() {
        let mut session = session_with_rows(&["1"]);
        // Moving straight up into the block's bottom edge
        free_ball(&mut session, 30, 38, 7.0, PI);
        let ball = &session.balls[0];
        assert_eq!(hit_side(ball, &Level::cell_rect(0)), Side::Bottom);
    }

    #[test]
    fn test_hit_side_from_left() {
        let mut session = session_with_rows(&["01"]);
        // Moving right into the left edge of cell 1
        free_ball(&mut session, 52, 25, 7.0, PI / 2.0);
        let ball = &session.balls[0];
        assert_eq!(hit_side(ball, &Level::cell_rect(1)), Side::Left);
    }

    #[test]
    fn test_diagonal_resolved_by_neighbour() {
        // Ball clips the bottom-left corner of cell 11 whose left neighbour exists
        let mut session = session_with_rows(&["", "11"]);
        free_ball(&mut session, 55, 55, 7.0, PI * 0.75);
        let ball = &session.balls[0];
        assert_eq!(hit_side(ball, &Level::cell_rect(11)), Side::Diagonal);
        assert_eq!(block_hit_side(&session.level, 11, ball), Side::Bottom);
    }

    /// Block side chosen for a motionless ball at (x, y) against cell 11
    fn side_against_cell_11(rows: &[&str], x: i32, y: i32) -> Side {
        let mut session = session_with_rows(rows);
        free_ball(&mut session, x, y, 0.0, 0.0);
        block_hit_side(&session.level, 11, &session.balls[0])
    }

    #[test]
    fn test_block_hit_side_from_above_left() {
        // Ball centre (55, 35) against the block centre (80, 50)
        assert_eq!(side_against_cell_11(&["01", "01"], 50, 30), Side::Left);
        assert_eq!(side_against_cell_11(&["", "11"], 50, 30), Side::Top);
        assert_eq!(side_against_cell_11(&["01", "11"], 50, 30), Side::Diagonal);
        assert_eq!(side_against_cell_11(&["", "01"], 50, 30), Side::Diagonal);
    }

    #[test]
    fn test_block_hit_side_from_below_right() {
        // Ball centre (105, 65)
        assert_eq!(side_against_cell_11(&["", "01", "01"], 100, 60), Side::Right);
        assert_eq!(side_against_cell_11(&["", "011"], 100, 60), Side::Bottom);
        assert_eq!(side_against_cell_11(&["", "011", "01"], 100, 60), Side::Diagonal);
        assert_eq!(side_against_cell_11(&["", "01"], 100, 60), Side::Diagonal);
    }

    #[test]
    fn test_block_hit_side_ignores_other_quadrants() {
        // Neighbours below and to the right don't matter to a ball from above-left
        assert_eq!(side_against_cell_11(&["", "011", "01"], 50, 30), Side::Diagonal);
        // Neighbours above and to the left don't matter to one from below-right
        assert_eq!(side_against_cell_11(&["01", "11"], 100, 60), Side::Diagonal);
    }

    #[test]
    fn test_bat_bounce_centre_and_edges() {
        let bat = Rect::new(100, 410, 175, 420);
        let centre = bat_bounce_direction(137, &bat);
        assert!((centre - PI).abs() < 0.05);
        assert!(bat_bounce_direction(175, &bat) < PI);
        assert!(bat_bounce_direction(100, &bat) > PI);
        assert_eq!(bat_bounce_direction(300, &bat), BAT_LOW_CAP);
        assert_eq!(bat_bounce_direction(-50, &bat), BAT_HIGH_CAP);
    }

    #[test]
    fn test_ball_bounces_off_bat() {
        let mut session = session_with_rows(&[]);
        let bat = session.bat.rect;
        free_ball(&mut session, bat.center_x() - 5, bat.y1 - 12, 7.0, 0.0);
        let mut ball = session.balls[0].clone();
        ball.step();
        assert!(ball_bat_collision(&session.bat, &mut ball));
        // Heading back up
        assert!(ball.direction > PI / 2.0 && ball.direction < 3.0 * PI / 2.0);
    }

    #[test]
    fn test_walls() {
        let mut session = session_with_rows(&[]);
        let mut ball = session.balls[0].clone();

        ball.set_position(-2, 200);
        ball.direction = 3.0 * PI / 2.0;
        ball.speed = 5.0;
        assert!(!ball_wall_collision(&mut session, &mut ball));
        assert!((ball.direction - PI / 2.0).abs() < 1e-12);

        ball.set_position(200, -3);
        ball.direction = PI;
        assert!(!ball_wall_collision(&mut session, &mut ball));
        assert_eq!(ball.direction, 0.0);

        ball.set_position(200, GAME_HEIGHT - 5);
        assert!(ball_wall_collision(&mut session, &mut ball));
    }

    proptest! {
        #[test]
        fn prop_reflection_stays_normalized(
            direction in 0.0..TAU,
            side in prop_oneof![
                Just(Side::Top),
                Just(Side::Bottom),
                Just(Side::Left),
                Just(Side::Right),
                Just(Side::Diagonal),
            ],
            entropy in 0u32..=40,
            seed in any::<u64>(),
        ) {
            use rand::SeedableRng;
            let mut rng = rand_pcg::Pcg32::seed_from_u64(seed);
            let jittered = apply_entropy(direction, entropy as f64 / 100.0, &mut rng);
            let reflected = reflect_direction(jittered, side);
            prop_assert!((0.0..TAU).contains(&reflected));
        }

        #[test]
        fn prop_bat_bounce_is_monotonic(
            bat_x in 0i32..=(GAME_WIDTH - BAT_WIDE_WIDTH),
            wide in any::<bool>(),
            a in -20i32..=120,
            b in -20i32..=120,
        ) {
            let width = if wide { BAT_WIDE_WIDTH } else { BAT_WIDTH };
            let bat = Rect::new(bat_x, 410, bat_x + width, 420);
            let (left, right) = (a.min(b), a.max(b));
            let d_left = bat_bounce_direction(bat_x + left, &bat);
            let d_right = bat_bounce_direction(bat_x + right, &bat);
            // Further right never sends the ball further left
            prop_assert!(d_right <= d_left);
            prop_assert!((BAT_LOW_CAP..=BAT_HIGH_CAP).contains(&d_left));
        }
    }
}
