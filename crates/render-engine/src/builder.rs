//! Filter-graph builder.
//!
//! Turns an ordered list of engine inputs plus text overlays into a
//! labelled [`FilterGraph`]:
//!
//! 1. every primary input (clip or still) is normalized to the target frame
//!    (`in{index}`); stills are looped and trimmed first,
//! 2. the normalized streams are concatenated in order (`cat`),
//! 3. image overlays are prepared (`ovimg{k}`) and composited in list order
//!    (`ovl{k}`),
//! 4. text overlays are folded over the running stream (`txt{i}`).
//!
//! Labels are namespaced by input index or overlay index so the phases can
//! never collide.

use std::path::PathBuf;

use reelsmith_common::clock::format_secs;
use reelsmith_common::error::{ReelsmithError, ReelsmithResult};
use reelsmith_preset_model::{ImageOverlayEdit, Position, Resolution, TextOverlay};

use crate::graph::{Filter, FilterChain, FilterGraph, FilterValue, StreamLabel, StreamRef};

/// Label of the concatenated primary stream.
pub const CONCAT_LABEL: &str = "cat";

/// One engine input, in input-index order.
#[derive(Debug, Clone, PartialEq)]
pub enum GraphInput {
    /// Clip; any trim is applied on the input side.
    Video,
    /// Still image held for `duration` seconds.
    Still { duration: f64 },
    /// Image composited over the concatenated stream.
    OverlayImage(ImageOverlayEdit),
}

/// A built graph and the label mapped to the output file.
#[derive(Debug, Clone, PartialEq)]
pub struct GraphPlan {
    pub graph: FilterGraph,
    pub final_label: StreamLabel,
}

impl GraphPlan {
    /// Graph text for `-filter_complex`.
    pub fn filter_complex(&self) -> String {
        self.graph.render()
    }
}

#[derive(Debug, Clone, Copy)]
enum Axis {
    X,
    Y,
}

/// Builds filter graphs for one output frame size.
#[derive(Debug, Clone)]
pub struct GraphBuilder {
    width: u32,
    height: u32,
    font_file: Option<PathBuf>,
}

impl GraphBuilder {
    pub fn new(resolution: Resolution) -> Self {
        Self {
            width: resolution.width,
            height: resolution.height,
            font_file: None,
        }
    }

    /// Font handed to every drawtext stage.
    pub fn with_font_file(mut self, font_file: Option<PathBuf>) -> Self {
        self.font_file = font_file;
        self
    }

    pub fn build(
        &self,
        inputs: &[GraphInput],
        text_overlays: &[TextOverlay],
    ) -> ReelsmithResult<GraphPlan> {
        let mut graph = FilterGraph::new();

        let mut normalized = Vec::new();
        for (index, input) in inputs.iter().enumerate() {
            let hold = match input {
                GraphInput::Video => None,
                GraphInput::Still { duration } => Some(*duration),
                GraphInput::OverlayImage(_) => continue,
            };
            let chain = self.normalize_primary(index, hold)?;
            normalized.push(chain.outputs[0].clone());
            graph.push(chain)?;
        }

        if normalized.is_empty() {
            return Err(ReelsmithError::config(
                "Nothing to assemble: no video or image inputs",
            ));
        }

        let mut current = label(CONCAT_LABEL)?;
        graph.push(FilterChain::new(
            normalized.iter().map(StreamRef::from).collect(),
            vec![Filter::new("concat")
                .opt("n", normalized.len())
                .opt("v", 1)
                .opt("a", 0)],
            current.clone(),
        ))?;

        let overlays = inputs.iter().enumerate().filter_map(|(index, input)| match input {
            GraphInput::OverlayImage(edit) => Some((index, edit)),
            _ => None,
        });
        for (k, (index, edit)) in overlays.enumerate() {
            let prepared = self.prepare_overlay_image(index, k, edit)?;
            let image = prepared.outputs[0].clone();
            graph.push(prepared)?;

            let composited = label(format!("ovl{k}"))?;
            graph.push(FilterChain::new(
                vec![StreamRef::from(&current), StreamRef::from(&image)],
                vec![Filter::new("overlay")
                    .with("x", overlay_position(&edit.x, Axis::X)?)
                    .with("y", overlay_position(&edit.y, Axis::Y)?)
                    .with("enable", between(edit.start_time, edit.end_time))],
                composited.clone(),
            ))?;
            current = composited;
        }

        for (i, overlay) in text_overlays.iter().enumerate() {
            let output = label(format!("txt{i}"))?;
            graph.push(FilterChain::new(
                vec![StreamRef::from(&current)],
                vec![self.drawtext(overlay)],
                output.clone(),
            ))?;
            current = output;
        }

        let terminal = graph.terminal()?.clone();
        debug_assert_eq!(terminal, current);
        tracing::debug!(
            chains = graph.chains().len(),
            final_label = terminal.as_str(),
            "Built filter graph"
        );

        Ok(GraphPlan {
            graph,
            final_label: terminal,
        })
    }

    /// Scale to fit, pad to the exact frame (centred), unity SAR. Stills are
    /// looped and trimmed before scaling so their length is fixed at source.
    fn normalize_primary(&self, index: usize, hold: Option<f64>) -> ReelsmithResult<FilterChain> {
        let mut filters = Vec::new();
        if let Some(duration) = hold {
            filters.push(Filter::new("loop").opt("loop", -1).opt("size", 1));
            filters.push(Filter::new("trim").opt("duration", format_secs(duration)));
        }
        filters.push(
            Filter::new("scale")
                .pos(self.width)
                .pos(self.height)
                .opt("force_original_aspect_ratio", "decrease"),
        );
        filters.push(
            Filter::new("pad")
                .pos(self.width)
                .pos(self.height)
                .pos("(ow-iw)/2")
                .pos("(oh-ih)/2"),
        );
        filters.push(Filter::new("setsar").pos(1));

        Ok(FilterChain::new(
            vec![StreamRef::video_input(index)],
            filters,
            label(format!("in{index}"))?,
        ))
    }

    /// Fit the image to the frame width, pad to its own height, add alpha
    /// and scale it by the edit's opacity.
    fn prepare_overlay_image(
        &self,
        index: usize,
        k: usize,
        edit: &ImageOverlayEdit,
    ) -> ReelsmithResult<FilterChain> {
        let filters = vec![
            Filter::new("scale")
                .pos(self.width)
                .pos(-1)
                .opt("force_original_aspect_ratio", "decrease"),
            Filter::new("pad")
                .pos(self.width)
                .pos("ih")
                .pos("(ow-iw)/2")
                .pos("(oh-ih)/2"),
            Filter::new("setsar").pos(1),
            Filter::new("format").pos("rgba"),
            Filter::new("colorchannelmixer").opt("aa", format_secs(edit.opacity)),
        ];
        Ok(FilterChain::new(
            vec![StreamRef::video_input(index)],
            filters,
            label(format!("ovimg{k}"))?,
        ))
    }

    fn drawtext(&self, overlay: &TextOverlay) -> Filter {
        let mut filter = Filter::new("drawtext");
        if let Some(font) = &self.font_file {
            filter = filter.with("fontfile", FilterValue::Path(font.clone()));
        }
        filter = filter
            .with("text", FilterValue::Text(overlay.text.clone()))
            .with("x", position(&overlay.x, Axis::X))
            .with("y", position(&overlay.y, Axis::Y))
            .opt("fontsize", overlay.font_size)
            .opt("fontcolor", &overlay.color)
            .opt("borderw", overlay.border_width)
            .opt("bordercolor", &overlay.border_color)
            .with("enable", between(overlay.start_time, overlay.end_time));

        if overlay.boxed {
            filter = filter
                .opt("box", 1)
                .opt(
                    "boxcolor",
                    overlay.box_color.as_deref().unwrap_or("black@1.0"),
                )
                .opt("boxborderw", overlay.box_border_width.unwrap_or(10));
        }
        filter
    }
}

fn label(name: impl Into<String>) -> ReelsmithResult<StreamLabel> {
    Ok(StreamLabel::new(name)?)
}

/// Inclusive visibility window against the render clock.
fn between(start: f64, end: f64) -> FilterValue {
    FilterValue::expr(format!(
        "between(t,{},{})",
        format_secs(start),
        format_secs(end)
    ))
}

/// `center` centres the rendered text box within the frame.
fn position(position: &Position, axis: Axis) -> FilterValue {
    match (position, axis) {
        (Position::Center, Axis::X) => FilterValue::expr("(w-text_w)/2"),
        (Position::Center, Axis::Y) => FilterValue::expr("(h-text_h)/2"),
        (Position::Pixels(px), _) => FilterValue::raw(px),
        (Position::Expr(expr), _) => FilterValue::expr(expr),
    }
}

/// Overlay placement from a preset string; `center` centres the image
/// within the frame.
fn overlay_position(raw: &str, axis: Axis) -> ReelsmithResult<FilterValue> {
    let parsed = Position::parse(raw)
        .map_err(|e| ReelsmithError::config(format!("overlay position: {e}")))?;
    Ok(match (parsed, axis) {
        (Position::Center, Axis::X) => FilterValue::expr("(W-w)/2"),
        (Position::Center, Axis::Y) => FilterValue::expr("(H-h)/2"),
        (Position::Pixels(px), _) => FilterValue::raw(px),
        (Position::Expr(expr), _) => FilterValue::expr(expr),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use reelsmith_preset_model::default_overlay_edits;

    fn caption(text: &str, start: f64, end: f64) -> TextOverlay {
        TextOverlay {
            text: text.to_string(),
            start_time: start,
            end_time: end,
            x: Position::Center,
            y: Position::Pixels(180),
            font_size: 70,
            color: "white".to_string(),
            border_color: "black".to_string(),
            border_width: 6,
            boxed: false,
            box_color: None,
            box_border_width: None,
        }
    }

    fn builder() -> GraphBuilder {
        GraphBuilder::new(Resolution::new(640, 360))
    }

    #[test]
    fn test_still_is_looped_before_scaling() {
        let plan = builder()
            .build(&[GraphInput::Still { duration: 1.3 }], &[])
            .unwrap();
        assert_eq!(
            plan.graph.expressions()[0],
            "[0:v]loop=loop=-1:size=1,trim=duration=1.3,scale=640:360:force_original_aspect_ratio=decrease,pad=640:360:(ow-iw)/2:(oh-ih)/2,setsar=1[in0]"
        );
        assert_eq!(plan.final_label.as_str(), CONCAT_LABEL);
    }

    #[test]
    fn test_text_overlays_fold_in_order() {
        let plan = builder()
            .build(
                &[GraphInput::Video, GraphInput::Video],
                &[caption("A", 0.0, 1.0), caption("B", 1.0, 2.0)],
            )
            .unwrap();
        let exprs = plan.graph.expressions();
        assert_eq!(exprs.len(), 5);
        assert!(exprs[2].starts_with("[in0][in1]concat=n=2:v=1:a=0[cat]"));
        assert!(exprs[3].starts_with("[cat]drawtext="));
        assert!(exprs[3].ends_with("[txt0]"));
        assert!(exprs[4].starts_with("[txt0]drawtext="));
        assert_eq!(plan.final_label.as_str(), "txt1");
    }

    #[test]
    fn test_drawtext_options() {
        let mut overlay = caption("Rinse and repeat", 3.6, 4.8);
        overlay.y = Position::Expr("h/2+50".to_string());
        overlay.boxed = true;
        overlay.box_color = Some("black@1.0".to_string());

        let filter = builder()
            .with_font_file(Some(PathBuf::from("/fonts/arial.ttf")))
            .drawtext(&overlay);
        assert_eq!(
            filter.render(),
            "drawtext=fontfile='/fonts/arial.ttf':text='Rinse and repeat':x='(w-text_w)/2':y='h/2+50':fontsize=70:fontcolor=white:borderw=6:bordercolor=black:enable='between(t,3.6,4.8)':box=1:boxcolor=black@1.0:boxborderw=10"
        );
    }

    #[test]
    fn test_image_overlays_composite_in_list_order() {
        let edits = default_overlay_edits();
        let plan = builder()
            .build(
                &[
                    GraphInput::Video,
                    GraphInput::OverlayImage(edits[0].clone()),
                    GraphInput::OverlayImage(edits[1].clone()),
                ],
                &[],
            )
            .unwrap();

        let exprs = plan.graph.expressions();
        assert_eq!(
            exprs[2],
            "[1:v]scale=640:-1:force_original_aspect_ratio=decrease,pad=640:ih:(ow-iw)/2:(oh-ih)/2,setsar=1,format=rgba,colorchannelmixer=aa=0.5[ovimg0]"
        );
        assert_eq!(
            exprs[3],
            "[cat][ovimg0]overlay=x='(W-w)/2':y='(H-h)/2':enable='between(t,1.2,1.3)'[ovl0]"
        );
        assert!(exprs[5].starts_with("[ovl0][ovimg1]overlay="));
        assert_eq!(plan.final_label.as_str(), "ovl1");
    }

    #[test]
    fn test_center_overlay_maps_to_centring_expression() {
        let mut edit = default_overlay_edits()[0].clone();
        edit.x = "center".to_string();
        edit.y = "Center".to_string();
        let plan = builder()
            .build(&[GraphInput::Video, GraphInput::OverlayImage(edit)], &[])
            .unwrap();
        assert_eq!(
            plan.graph.expressions()[3],
            "[cat][ovimg0]overlay=x='(W-w)/2':y='(H-h)/2':enable='between(t,1.2,1.3)'[ovl0]"
        );
    }

    #[test]
    fn test_pixel_overlay_position_is_bare() {
        let mut edit = default_overlay_edits()[0].clone();
        edit.x = "40".to_string();
        edit.y = "H-h-20".to_string();
        let plan = builder()
            .build(&[GraphInput::Video, GraphInput::OverlayImage(edit)], &[])
            .unwrap();
        assert!(plan.graph.expressions()[3].contains("overlay=x=40:y='H-h-20':"));
    }

    #[test]
    fn test_no_primary_inputs_is_config_error() {
        let err = builder()
            .build(
                &[GraphInput::OverlayImage(default_overlay_edits()[0].clone())],
                &[],
            )
            .unwrap_err();
        assert_eq!(err.kind(), "configuration");
    }

    #[test]
    fn test_text_is_escaped() {
        let filter = builder().drawtext(&caption("50% off: it's back", 0.0, 1.0));
        assert!(filter
            .render()
            .contains(r"text='50\\% off\: it\'\''s back'"));
    }
}
