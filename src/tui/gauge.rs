use crate::display::{arc_point, gauge_angle, GAUGE_SWEEP_DEG};
use ratatui::{
    layout::Rect,
    style::{Color, Style},
    symbols,
    text::{Line, Span},
    widgets::{
        canvas::{Canvas, Line as CanvasLine, Points},
        Block, Borders,
    },
    Frame,
};

const ARC_RADIUS: f64 = 80.0;
const NEEDLE_LENGTH: f64 = 60.0;

/// Sample the arc between two gauge angles, one point per half degree.
fn arc_coords(from_deg: f64, to_deg: f64) -> Vec<(f64, f64)> {
    let steps = ((to_deg - from_deg) * 2.0).ceil().max(0.0) as usize;
    (0..=steps)
        .map(|i| arc_point((from_deg + i as f64 * 0.5).min(to_deg), ARC_RADIUS))
        .collect()
}

/// Half-circle speedometer: grey track, filled sweep up to the current speed,
/// and a needle from the hub.
pub fn draw_speed_gauge(area: Rect, f: &mut Frame, speed_mbps: f64) {
    let angle = gauge_angle(speed_mbps);
    let track = arc_coords(0.0, GAUGE_SWEEP_DEG);
    let filled = if angle > 0.0 {
        arc_coords(0.0, angle)
    } else {
        Vec::new()
    };
    let (tip_x, tip_y) = arc_point(angle, NEEDLE_LENGTH);

    let canvas = Canvas::default()
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(Line::from(vec![
                    Span::raw("Speed "),
                    Span::styled(
                        format!("{speed_mbps:.1}"),
                        Style::default().fg(Color::Magenta),
                    ),
                    Span::raw(" Mbps"),
                ])),
        )
        .marker(symbols::Marker::Braille)
        .x_bounds([-100.0, 100.0])
        .y_bounds([-25.0, 90.0])
        .paint(move |ctx| {
            ctx.draw(&Points {
                coords: &track,
                color: Color::DarkGray,
            });
            ctx.draw(&Points {
                coords: &filled,
                color: Color::Magenta,
            });
            ctx.draw(&CanvasLine {
                x1: 0.0,
                y1: 0.0,
                x2: tip_x,
                y2: tip_y,
                color: Color::White,
            });
            ctx.print(
                -12.0,
                -15.0,
                Line::styled(
                    format!("{speed_mbps:.1} Mbps"),
                    Style::default().fg(Color::White),
                ),
            );
        });
    f.render_widget(canvas, area);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn arc_samples_cover_the_requested_sweep() {
        let coords = arc_coords(0.0, GAUGE_SWEEP_DEG);
        assert_eq!(coords.len(), 361);
        let (x0, _) = coords[0];
        let (x1, _) = coords[coords.len() - 1];
        assert!(x0 < -79.0 && x1 > 79.0);
        assert!(coords.iter().all(|&(_, y)| y >= -1e-9));
    }

    #[test]
    fn empty_sweep_is_a_single_point() {
        assert_eq!(arc_coords(0.0, 0.0).len(), 1);
    }
}
