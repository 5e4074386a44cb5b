pub const DIRECTION_COUNT: i32 = 16;
pub const MAX_TAP_DURATION_MS: u64 = 150;

pub const KEY_SEARCH_RADIUS_FACTOR: f32 = 2.0;

pub const SCORE_EXACT_MATCH: u16 = 1000;
pub const SCORE_PREFIX_MATCH: u16 = 800;
pub const SCORE_OVERSWIPE: u16 = 700;
pub const SCORE_BASE_CORRECTION: u16 = 500;
pub const SCORE_PENALTY_PER_EDIT: u16 = 100;
pub const SCORE_FUZZY_BASE: u16 = 200;
pub const SCORE_FUZZY_PER_CHAR: u16 = 10;

pub const COST_ADJACENT_SUBSTITUTION: u32 = 1;
pub const COST_NON_ADJACENT_SUBSTITUTION: u32 = 2;

pub const CACHE_MIN_LENGTH_RATIO: f32 = 0.8;
pub const CACHE_MAX_LENGTH_RATIO: f32 = 1.2;

#[cfg(test)]
mod tests {
    #![allow(non_snake_case)]
    use super::*;

    #[test]
    fn test_SCORE_ORDERING() {
        assert!(SCORE_EXACT_MATCH > SCORE_PREFIX_MATCH);
        assert!(SCORE_PREFIX_MATCH > SCORE_OVERSWIPE);
        assert!(SCORE_OVERSWIPE > SCORE_BASE_CORRECTION);
        assert!(SCORE_BASE_CORRECTION - 2 * SCORE_PENALTY_PER_EDIT > SCORE_FUZZY_BASE);
    }

    #[test]
    fn test_DIRECTION_COUNT() {
        assert_eq!(DIRECTION_COUNT % 2, 0);
    }
}
