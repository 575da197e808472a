//! Balls: launching, motion and the anti-stall rules

use std::f64::consts::{FRAC_PI_4, PI, TAU};

use glam::DVec2;
use rand::Rng;
use serde::{Deserialize, Serialize};

use super::anim::{AnimId, AnimationState};
use super::collision::{ball_bat_collision, ball_block_collision, ball_wall_collision};
use super::geometry::Rect;
use super::level::destroy_block;
use super::render::{EntityId, EntityKind, RenderEvent};
use super::state::GameSession;
use crate::consts::*;
use crate::settings::Tunables;

/// Launch direction for the first fire button (up and to the left)
pub const FIRE1_DIRECTION: f64 = PI + FRAC_PI_4;
/// Launch direction for the second fire button (up and to the right)
pub const FIRE2_DIRECTION: f64 = PI - FRAC_PI_4;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BallState {
    /// Riding on the bat, waiting to be fired
    Stuck,
    Free,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Ball {
    pub id: EntityId,
    pub rect: Rect,
    pub anim: AnimationState,
    /// Sub-pixel position of the top-left corner
    pub pos: DVec2,
    /// Pixels per frame
    pub speed: f64,
    /// Radians in [0, 2π). π is straight up, 0 straight down.
    pub direction: f64,
    /// Frames since the ball last touched the bat
    pub airtime: u32,
    pub state: BallState,
}

impl Ball {
    /// Displacement for one frame at the current speed and direction
    pub fn velocity(&self) -> DVec2 {
        DVec2::new(self.direction.sin(), self.direction.cos()) * self.speed
    }

    /// Integrate one frame of motion
    pub fn step(&mut self) {
        self.pos += self.velocity();
        self.sync_rect();
    }

    /// Place the ball with its top-left corner at (x, y)
    pub fn set_position(&mut self, x: i32, y: i32) {
        self.pos = DVec2::new(x as f64, y as f64);
        self.sync_rect();
    }

    fn sync_rect(&mut self) {
        // Floor, not truncate: a ball just past the wall must land at -1
        let (x, y) = (self.pos.x.floor() as i32, self.pos.y.floor() as i32);
        self.rect = Rect::from_size(x, y, BALL_WIDTH, BALL_HEIGHT);
    }

    pub fn is_stuck(&self) -> bool {
        self.state == BallState::Stuck
    }
}

/// Top-left corner of a ball resting on the bat
fn stuck_position(session: &GameSession) -> (i32, i32) {
    let bat = &session.bat.rect;
    (bat.center_x() - BALL_WIDTH / 2, bat.y1 - BALL_HEIGHT - 1)
}

/// Put a new ball on the bat
pub fn spawn_stuck_ball(session: &mut GameSession) {
    let (x, y) = stuck_position(session);
    let mut ball = Ball {
        id: session.ids.alloc(),
        rect: Rect::default(),
        anim: session.catalog.static_animation(AnimId::BallDefault),
        pos: DVec2::ZERO,
        speed: 0.0,
        direction: 0.0,
        airtime: 0,
        state: BallState::Stuck,
    };
    ball.set_position(x, y);
    session.emit(RenderEvent::Add {
        id: ball.id,
        kind: EntityKind::Ball,
        rect: ball.rect,
        anim: ball.anim,
    });
    session.balls.push(ball);
}

/// Advance every ball by one frame, dropping the ones that were lost
pub fn update_balls(session: &mut GameSession) {
    let mut balls = std::mem::take(&mut session.balls);
    balls.retain_mut(|ball| match ball.state {
        BallState::Stuck => {
            update_stuck_ball(session, ball);
            true
        }
        BallState::Free => update_free_ball(session, ball),
    });
    balls.append(&mut session.balls);
    session.balls = balls;
}

fn update_stuck_ball(session: &mut GameSession, ball: &mut Ball) {
    let (x, y) = stuck_position(session);
    if ball.rect.x1 != x || ball.rect.y1 != y {
        ball.set_position(x, y);
        session.emit(RenderEvent::Reposition {
            id: ball.id,
            rect: ball.rect,
        });
    }

    // A fire press launches one ball only
    let direction = if session.input.fire1 {
        session.input.fire1 = false;
        FIRE1_DIRECTION
    } else if session.input.fire2 {
        session.input.fire2 = false;
        FIRE2_DIRECTION
    } else {
        return;
    };
    ball.state = BallState::Free;
    ball.speed = session.tunables.ball_initial_speed;
    ball.direction = direction;
    ball.airtime = 0;
}

/// Returns false once the ball has left the bottom of the field
fn update_free_ball(session: &mut GameSession, ball: &mut Ball) -> bool {
    let start = ball.rect;
    let start_direction = ball.direction;

    ball.step();

    let mut lost = false;
    if !ball_block_collision(session, ball) {
        if ball_bat_collision(&session.bat, ball) {
            ball.airtime = 0;
        }
        lost = ball_wall_collision(session, ball);
    }

    if lost {
        log::debug!("Ball {} lost", ball.id);
        session.emit(RenderEvent::Remove { id: ball.id });
        return false;
    }

    // Break out of endless loops between invincible blocks
    if ball.airtime < MAX_AIRTIME {
        ball.airtime += 1;
    } else {
        ball.direction = session.rng.random::<f64>() * TAU;
        ball.airtime = 0;
        log::debug!("Ball {} airborne too long, new direction {:.3}", ball.id, ball.direction);
    }

    // Nothing changed over the whole frame: the ball is wedged inside a block
    if ball.rect.x1 == start.x1 && ball.rect.y1 == start.y1 && ball.direction == start_direction {
        match session.level.find_block_at(&ball.rect) {
            Some(index) => destroy_block(session, index),
            None => unreachable!(
                "ball {} stuck at ({}, {}) heading {} with no block to free it from",
                ball.id, ball.rect.x1, ball.rect.y1, ball.direction
            ),
        }
    }

    if ball.rect != start {
        session.emit(RenderEvent::Reposition {
            id: ball.id,
            rect: ball.rect,
        });
    }
    true
}

/// Speed a ball up after a block hit, until it reaches the difficulty's cap
pub fn increase_speed(ball: &mut Ball, tunables: &Tunables) {
    if ball.speed < tunables.ball_max_speed {
        ball.speed += tunables.ball_speed_increment;
    }
}

/// Halve the speed of every free ball relative to the launch speed
pub fn slow_balls(session: &mut GameSession) {
    let slow = session.tunables.ball_initial_speed / 2.0;
    for ball in session.balls.iter_mut().filter(|b| !b.is_stuck()) {
        ball.speed = slow;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::state::tests::session_with_rows;

    #[test]
    fn test_stuck_ball_rides_bat() {
        let mut session = session_with_rows(&["1"]);
        let ball = &session.balls[0];
        assert!(ball.is_stuck());
        assert_eq!(ball.rect.y1, session.bat.rect.y1 - 11);
        assert_eq!(ball.rect.center_x(), session.bat.rect.center_x());

        session.input.pointer_x = 100;
        crate::sim::bat::update_bat(&mut session);
        update_balls(&mut session);
        assert_eq!(session.balls[0].rect.center_x(), session.bat.rect.center_x());
        assert!(session.balls[0].is_stuck());
    }

    #[test]
    fn test_one_fire_launches_one_ball() {
        let mut session = session_with_rows(&["1"]);
        spawn_stuck_ball(&mut session);
        session.input.fire2 = true;
        update_balls(&mut session);

        let free: Vec<_> = session.balls.iter().filter(|b| !b.is_stuck()).collect();
        assert_eq!(free.len(), 1);
        assert_eq!(free[0].direction, FIRE2_DIRECTION);
        assert_eq!(free[0].speed, session.tunables.ball_initial_speed);
        assert!(!session.input.fire2);
    }

    #[test]
    fn test_ball_lost_at_bottom() {
        let mut session = session_with_rows(&[]);
        let ball = &mut session.balls[0];
        ball.state = BallState::Free;
        ball.set_position(10, GAME_HEIGHT - 12);
        ball.speed = 5.0;
        ball.direction = 0.0;
        update_balls(&mut session);
        assert!(session.balls.is_empty());
    }

    #[test]
    fn test_airtime_randomises_direction() {
        let mut session = session_with_rows(&[]);
        let ball = &mut session.balls[0];
        ball.state = BallState::Free;
        ball.set_position(200, 200);
        ball.speed = 1.5;
        ball.direction = PI / 2.0;
        ball.airtime = MAX_AIRTIME;
        update_balls(&mut session);
        let ball = &session.balls[0];
        assert_eq!(ball.airtime, 0);
        assert!((0.0..TAU).contains(&ball.direction));
    }

    #[test]
    fn test_speed_capped_by_tunables() {
        let tunables = crate::settings::Difficulty::Easy.tunables();
        let mut session = session_with_rows(&[]);
        let ball = &mut session.balls[0];
        ball.speed = tunables.ball_max_speed - 0.05;
        increase_speed(ball, &tunables);
        let capped = ball.speed;
        increase_speed(ball, &tunables);
        assert_eq!(ball.speed, capped);
    }

    #[test]
    fn test_slow_only_touches_free_balls() {
        let mut session = session_with_rows(&[]);
        spawn_stuck_ball(&mut session);
        session.balls[0].state = BallState::Free;
        session.balls[0].speed = 11.0;
        slow_balls(&mut session);
        assert_eq!(session.balls[0].speed, session.tunables.ball_initial_speed / 2.0);
        assert_eq!(session.balls[1].speed, 0.0);
    }

    #[test]
    fn test_slow_ball_in_corner_bounces_off_walls() {
        let mut session = session_with_rows(&[]);
        let ball = &mut session.balls[0];
        ball.state = BallState::Free;
        ball.pos = DVec2::new(0.9, 0.9);
        ball.sync_rect();
        ball.speed = 2.0;
        ball.direction = FIRE1_DIRECTION;
        update_balls(&mut session);

        let ball = &session.balls[0];
        assert_ne!(ball.direction, FIRE1_DIRECTION);
        assert!(ball.rect.y2 <= GAME_HEIGHT);
    }

    #[test]
    fn test_rect_floors_negative_positions() {
        let mut session = session_with_rows(&[]);
        let ball = &mut session.balls[0];
        ball.pos = DVec2::new(-0.5, 3.7);
        ball.sync_rect();
        assert_eq!((ball.rect.x1, ball.rect.y1), (-1, 3));
    }

    #[test]
    fn test_wedged_ball_destroys_block() {
        // A motionless ball bouncing off the top edge keeps heading right,
        // so nothing changes over the frame
        let mut session = session_with_rows(&["22"]);
        session.tunables.ball_max_speed = 0.0;
        let ball = &mut session.balls[0];
        ball.state = BallState::Free;
        ball.set_position(45, 22);
        ball.speed = 0.0;
        ball.direction = PI / 2.0;
        update_balls(&mut session);

        assert!(session.level.block(0).is_none());
        assert!(session.level.block(1).is_some());
        assert_eq!(session.balls.len(), 1);
    }
}
