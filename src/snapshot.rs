use std::fmt::Write as FmtWrite;

use crate::*;

/// Serialize the scene's visible display tree as a standalone SVG document.
///
/// Walks the stage back to front so paint order matches the layer order,
/// maps world coordinates through the viewport, and picks an output
/// primitive from each sprite's texture spec. Hidden and culled subtrees
/// are skipped, so the document shows exactly what the current zoom step
/// and camera would put on screen.
pub fn render_svg(scene: &GraphScene, background: &str) -> Result<String> {
    let viewport = scene.viewport();
    let width = viewport.screen_width();
    let height = viewport.screen_height();

    let mut svg = String::new();
    write!(
        svg,
        r##"<?xml version="1.0" encoding="UTF-8"?>
<svg xmlns="http://www.w3.org/2000/svg" width="{:.0}" height="{:.0}" viewBox="0 0 {:.0} {:.0}" font-family="Arial, sans-serif">
  <rect width="100%" height="100%" fill="{}" />
"##,
        width,
        height,
        width,
        height,
        escape_xml(background)
    )?;

    for &layer in scene.stage().root() {
        render_object(&mut svg, scene, layer, Point::default(), 0.0)?;
    }

    svg.push_str("</svg>\n");
    Ok(svg)
}

fn render_object(
    svg: &mut String,
    scene: &GraphScene,
    id: DisplayId,
    origin: Point,
    rotation: f32,
) -> Result<()> {
    let Some(obj) = scene.stage().object(id) else {
        return Ok(());
    };
    if !obj.visible || obj.culled {
        return Ok(());
    }

    let (sin, cos) = rotation.sin_cos();
    let world = Point::new(
        origin.x + obj.position.x * cos - obj.position.y * sin,
        origin.y + obj.position.x * sin + obj.position.y * cos,
    );
    let world_rotation = rotation + obj.rotation;

    match &obj.kind {
        DisplayKind::Group => {}
        DisplayKind::Sprite(sprite) => render_sprite(svg, scene, sprite, world, world_rotation)?,
        DisplayKind::Path(path) => render_path(svg, scene, path, world, world_rotation)?,
    }

    for &child in &obj.children {
        render_object(svg, scene, child, world, world_rotation)?;
    }
    Ok(())
}

fn render_sprite(
    svg: &mut String,
    scene: &GraphScene,
    sprite: &SpriteData,
    world: Point,
    rotation: f32,
) -> Result<()> {
    let viewport = scene.viewport();
    let scale = viewport.scale();
    let fill = hex_color(sprite.tint);
    let opacity = opacity_attr(sprite.alpha);

    let Some(texture) = sprite.texture.as_ref() else {
        // untextured but sized sprites draw as solid quads, e.g. edge lines
        let (Some(local_w), Some(local_h)) = (sprite.width, sprite.height) else {
            return Ok(());
        };
        if local_w <= 0.0 || local_h <= 0.0 {
            return Ok(());
        }
        let center = viewport.to_screen(world);
        let (w, h) = (local_w * scale, local_h * scale);
        write!(
            svg,
            "  <rect x=\"{:.1}\" y=\"{:.1}\" width=\"{:.1}\" height=\"{:.1}\" fill=\"{}\"{}{} />\n",
            center.x - w / 2.0,
            center.y - h / 2.0,
            w,
            h,
            fill,
            rotate_attr(rotation, center),
            opacity
        )?;
        return Ok(());
    };

    let local_w = sprite.width.unwrap_or(texture.width);
    let local_h = sprite.height.unwrap_or(texture.height);
    let (sin, cos) = rotation.sin_cos();
    let anchor_x = (0.5 - sprite.anchor.x) * local_w;
    let anchor_y = (0.5 - sprite.anchor.y) * local_h;
    let center_world = Point::new(
        world.x + anchor_x * cos - anchor_y * sin,
        world.y + anchor_x * sin + anchor_y * cos,
    );
    let center = viewport.to_screen(center_world);

    match &texture.spec {
        TextureSpec::Circle { size } => {
            write!(
                svg,
                "  <circle cx=\"{:.1}\" cy=\"{:.1}\" r=\"{:.1}\" fill=\"{}\"{} />\n",
                center.x,
                center.y,
                size * scale,
                fill,
                opacity
            )?;
        }
        TextureSpec::Ring { size, border_width } => {
            write!(
                svg,
                "  <circle cx=\"{:.1}\" cy=\"{:.1}\" r=\"{:.1}\" fill=\"none\" stroke=\"{}\" stroke-width=\"{:.1}\"{} />\n",
                center.x,
                center.y,
                size * scale,
                fill,
                border_width * scale,
                opacity
            )?;
        }
        TextureSpec::Arrow { size } => {
            let s = size * scale;
            let tip = Point::new(center.x + s * cos, center.y + s * sin);
            let base_a = Point::new(
                center.x - s * cos - s * sin,
                center.y - s * sin + s * cos,
            );
            let base_b = Point::new(
                center.x - s * cos + s * sin,
                center.y - s * sin - s * cos,
            );
            write!(
                svg,
                "  <polygon points=\"{:.1},{:.1} {:.1},{:.1} {:.1},{:.1}\" fill=\"{}\"{} />\n",
                tip.x, tip.y, base_a.x, base_a.y, base_b.x, base_b.y, fill, opacity
            )?;
        }
        TextureSpec::Text { font_family, font_size, content, .. } => {
            if content.is_empty() {
                return Ok(());
            }
            write!(
                svg,
                "  <text x=\"{:.1}\" y=\"{:.1}\" fill=\"{}\" font-family=\"{}\" font-size=\"{:.1}\" text-anchor=\"middle\" dominant-baseline=\"middle\"{}{}>{}</text>\n",
                center.x,
                center.y,
                fill,
                escape_xml(font_family),
                font_size * scale,
                rotate_attr(rotation, center),
                opacity,
                escape_xml(content)
            )?;
        }
        TextureSpec::Icon { url, .. } => {
            let (w, h) = (local_w * scale, local_h * scale);
            write!(
                svg,
                "  <image x=\"{:.1}\" y=\"{:.1}\" width=\"{:.1}\" height=\"{:.1}\" href=\"{}\"{}{} />\n",
                center.x - w / 2.0,
                center.y - h / 2.0,
                w,
                h,
                escape_xml(url),
                rotate_attr(rotation, center),
                opacity
            )?;
        }
    }
    Ok(())
}

fn render_path(
    svg: &mut String,
    scene: &GraphScene,
    path: &PathData,
    world: Point,
    rotation: f32,
) -> Result<()> {
    if path.points.len() < 2 {
        return Ok(());
    }
    let viewport = scene.viewport();
    let (sin, cos) = rotation.sin_cos();
    let points = path
        .points
        .iter()
        .map(|p| {
            let world_p = Point::new(
                world.x + p.x * cos - p.y * sin,
                world.y + p.x * sin + p.y * cos,
            );
            let screen = viewport.to_screen(world_p);
            format!("{:.1},{:.1}", screen.x, screen.y)
        })
        .collect::<Vec<_>>()
        .join(" ");
    write!(
        svg,
        "  <polyline points=\"{}\" fill=\"none\" stroke=\"{}\" stroke-width=\"{:.1}\"{} />\n",
        points,
        hex_color(path.color),
        path.stroke_width * viewport.scale(),
        opacity_attr(path.alpha)
    )?;
    Ok(())
}

fn rotate_attr(rotation: f32, center: Point) -> String {
    if rotation.abs() < 1e-6 {
        return String::new();
    }
    format!(" transform=\"rotate({:.1} {:.1} {:.1})\"", rotation.to_degrees(), center.x, center.y)
}

fn opacity_attr(alpha: f32) -> String {
    if alpha >= 1.0 {
        return String::new();
    }
    format!(" opacity=\"{:.2}\"", alpha.max(0.0))
}

fn hex_color(tint: u32) -> String {
    format!("#{:06x}", tint & 0x00ff_ffff)
}

fn escape_xml(input: &str) -> String {
    let mut escaped = String::new();
    for ch in input.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&apos;"),
            other => escaped.push(other),
        }
    }
    escaped
}
