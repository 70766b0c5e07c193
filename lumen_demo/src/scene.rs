//! Draw data for the demo viewports
//!
//! Stands in for the UI library: flat colored rectangles sampled from the
//! white texel of a 1x1 atlas, animated over time.

use lumen_engine::glam::Vec2;
use lumen_engine::ui::{DrawCmd, DrawData, DrawList, DrawVert, FontAtlas, TextureId};

/// Atlas holding a single white texel
pub fn white_atlas() -> FontAtlas {
    FontAtlas { width: 1, height: 1, pixels: vec![255; 4] }
}

const WHITE_UV: [f32; 2] = [0.5, 0.5];

/// Append an axis-aligned rectangle to `list` (indices relative to the list)
pub fn push_rect(list: &mut DrawList, min: Vec2, max: Vec2, color: [u8; 4]) {
    let base = list.vtx_buffer.len() as u16;
    for corner in [min, Vec2::new(max.x, min.y), max, Vec2::new(min.x, max.y)] {
        list.vtx_buffer.push(DrawVert::new(corner.to_array(), WHITE_UV, color));
    }
    list.idx_buffer.extend_from_slice(&[base, base + 1, base + 2, base, base + 2, base + 3]);
}

/// Close the indices added since `first_index` into one command
fn push_command(list: &mut DrawList, first_index: usize, clip_rect: [f32; 4], texture_id: TextureId) {
    let elem_count = (list.idx_buffer.len() - first_index) as u32;
    if elem_count == 0 {
        return;
    }
    list.commands.push(DrawCmd {
        elem_count,
        idx_offset: first_index as u32,
        vtx_offset: 0,
        clip_rect,
        texture_id,
    });
}

fn empty_draw_data(display_size: Vec2, scale: f32) -> DrawData {
    DrawData::new(Vec2::ZERO, display_size, Vec2::splat(scale))
}

/// Main window: a panel of animated bars, clipped to the panel
///
/// # Arguments
///
/// * `display_size` - Logical window size
/// * `scale` - Physical pixels per logical pixel
/// * `time` - Seconds since start
/// * `texture_id` - Texture holding a white texel
pub fn main_scene(display_size: Vec2, scale: f32, time: f32, texture_id: TextureId) -> DrawData {
    let mut draw_data = empty_draw_data(display_size, scale);
    let full = [0.0, 0.0, display_size.x, display_size.y];

    let mut background = DrawList::default();
    let margin = Vec2::splat(24.0);
    let panel_min = margin;
    let panel_max = (display_size - margin).max(panel_min);
    push_rect(&mut background, panel_min, panel_max, [40, 44, 52, 255]);
    push_command(&mut background, 0, full, texture_id);
    draw_data.draw_lists.push(background);

    // Bars overshoot the panel on purpose; the clip rect trims them
    let mut bars = DrawList::default();
    let count = 12;
    let width = (panel_max.x - panel_min.x) / count as f32;
    for i in 0..count {
        let phase = time * 2.0 + i as f32 * 0.5;
        let height = (panel_max.y - panel_min.y) * (0.55 + 0.5 * phase.sin());
        let x = panel_min.x + i as f32 * width;
        let color = [(80 + i * 14) as u8, 160, (240 - i * 12) as u8, 230];
        push_rect(&mut bars, Vec2::new(x + 2.0, panel_max.y - height), Vec2::new(x + width - 2.0, panel_max.y), color);
    }
    push_command(&mut bars, 0, [panel_min.x, panel_min.y, panel_max.x, panel_max.y], texture_id);
    draw_data.draw_lists.push(bars);

    draw_data
}

/// Secondary viewport: a checkerboard drifting sideways
pub fn viewport_scene(display_size: Vec2, scale: f32, time: f32, texture_id: TextureId) -> DrawData {
    let mut draw_data = empty_draw_data(display_size, scale);
    let mut list = DrawList::default();
    let cell = 48.0;
    let shift = (time * 20.0) % (cell * 2.0);

    let columns = (display_size.x / cell).ceil() as i32 + 2;
    let rows = (display_size.y / cell).ceil() as i32;
    for row in 0..rows {
        for column in -2..columns {
            if (row + column).rem_euclid(2) != 0 {
                continue;
            }
            let min = Vec2::new(column as f32 * cell + shift, row as f32 * cell);
            push_rect(&mut list, min, min + Vec2::splat(cell), [220, 120, 60, 255]);
        }
    }
    push_command(&mut list, 0, [0.0, 0.0, display_size.x, display_size.y], texture_id);
    draw_data.draw_lists.push(list);
    draw_data
}

#[cfg(test)]
#[path = "scene_tests.rs"]
mod tests;
