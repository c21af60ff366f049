//! Easing curves shared by the dive, death and formation tweens.

use crate::constants::EASE_BACK_C1;

pub fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t
}

/// Slow start, fast middle, slow end
pub fn ease_in_out_quad(t: f32) -> f32 {
    let t = t.clamp(0.0, 1.0);
    if t < 0.5 {
        2.0 * t * t
    } else {
        1.0 - (-2.0 * t + 2.0).powi(2) / 2.0
    }
}

/// Overshoots past 1.0 before settling
pub fn ease_out_back(t: f32) -> f32 {
    let t = t.clamp(0.0, 1.0);
    let c3 = EASE_BACK_C1 + 1.0;
    1.0 + c3 * (t - 1.0).powi(3) + EASE_BACK_C1 * (t - 1.0).powi(2)
}

/// Progress of a phase started at `started_at`, 0..1
pub fn phase_progress(now: f64, started_at: f64, duration_ms: f32) -> f32 {
    if duration_ms <= 0.0 {
        return 1.0;
    }
    (((now - started_at) / duration_ms as f64) as f32).clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_easing_endpoints() {
        assert_eq!(ease_in_out_quad(0.0), 0.0);
        assert_eq!(ease_in_out_quad(1.0), 1.0);
        assert!((ease_in_out_quad(0.5) - 0.5).abs() < 1e-6);
        assert!(ease_out_back(0.0).abs() < 1e-6);
        assert!((ease_out_back(1.0) - 1.0).abs() < 1e-6);
        assert!(ease_out_back(0.7) > 1.0);
    }

    #[test]
    fn test_phase_progress_clamped() {
        assert_eq!(phase_progress(50.0, 0.0, 100.0), 0.5);
        assert_eq!(phase_progress(500.0, 0.0, 100.0), 1.0);
        assert_eq!(phase_progress(10.0, 0.0, 0.0), 1.0);
    }
}
