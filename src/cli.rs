use anyhow::{Context, Result, anyhow};
use clap::{ArgAction, Parser};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fs;
use std::io::{self, Read, Write};
use std::path::PathBuf;

use graphstage::{
    ATTR_X, ATTR_Y, AttrMap, GraphScene, MeasureFactory, MemoryGraph, SceneOptions,
    StyleDefinition, StyleSheet, render_svg,
};

#[derive(Debug, Clone, PartialEq, Eq)]
enum InputSource {
    Stdin,
    File(PathBuf),
}

#[derive(Debug, Clone)]
enum OutputDestination {
    Stdout,
    File(PathBuf),
}

#[derive(Debug, Parser)]
#[command(
    name = "graphstage",
    about = "Build an interactive graph scene from a JSON graph and export what it would draw."
)]
pub struct RenderArgs {
    /// Path to the input graph file. Use '-' to read from stdin.
    #[arg(short = 'i', long = "input")]
    input: Option<String>,

    /// Path to the output SVG file. Use '-' to write to stdout.
    #[arg(short = 'o', long = "output")]
    output: Option<String>,

    /// Canvas width in pixels.
    #[arg(long = "width", default_value_t = 1280.0)]
    width: f32,

    /// Canvas height in pixels.
    #[arg(long = "height", default_value_t = 720.0)]
    height: f32,

    /// Zoom level to apply after the initial fit.
    #[arg(short = 'z', long = "zoom")]
    zoom: Option<f32>,

    /// Background color for the exported scene.
    #[arg(short = 'b', long = "background-color", default_value = "white")]
    background_color: String,

    /// Suppress informational output.
    #[arg(short = 'q', long = "quiet", action = ArgAction::SetTrue)]
    quiet: bool,
}

#[derive(Debug, Parser)]
#[command(
    name = "graphstage inspect",
    about = "Report what the scene would draw without exporting it."
)]
pub struct InspectArgs {
    /// Path to the input graph file. Use '-' to read from stdin.
    #[arg(short = 'i', long = "input")]
    input: Option<String>,

    /// Canvas width in pixels.
    #[arg(long = "width", default_value_t = 1280.0)]
    width: f32,

    /// Canvas height in pixels.
    #[arg(long = "height", default_value_t = 720.0)]
    height: f32,

    /// Zoom level to apply after the initial fit.
    #[arg(short = 'z', long = "zoom")]
    zoom: Option<f32>,

    /// Emit the report as JSON.
    #[arg(long = "json", action = ArgAction::SetTrue)]
    json: bool,
}

/// On-disk graph definition: node positions plus free-form attributes, and
/// edges by endpoint key.
#[derive(Debug, Deserialize)]
struct GraphFile {
    #[serde(default = "default_directed")]
    directed: bool,
    #[serde(default)]
    nodes: Vec<NodeEntry>,
    #[serde(default)]
    edges: Vec<EdgeEntry>,
}

#[derive(Debug, Deserialize)]
struct NodeEntry {
    key: String,
    x: f32,
    y: f32,
    #[serde(flatten)]
    attributes: AttrMap,
}

#[derive(Debug, Deserialize)]
struct EdgeEntry {
    #[serde(default)]
    key: Option<String>,
    source: String,
    target: String,
    #[serde(flatten)]
    attributes: AttrMap,
}

fn default_directed() -> bool {
    true
}

#[derive(Debug, Serialize)]
struct SceneReport {
    nodes: usize,
    edges: usize,
    zoom: f32,
    zoom_step: u8,
    containers: usize,
    culled: usize,
}

pub fn dispatch() -> Result<()> {
    let args: Vec<String> = std::env::args().collect();
    match args.get(1).map(|s| s.as_str()) {
        Some("inspect") => {
            let inspect_args = InspectArgs::parse_from(
                std::iter::once(args[0].clone()).chain(args.iter().skip(2).cloned()),
            );
            run_inspect(inspect_args)
        }
        Some("render") => {
            let render_args = RenderArgs::parse_from(
                std::iter::once(args[0].clone()).chain(args.iter().skip(2).cloned()),
            );
            run_render(render_args)
        }
        _ => {
            let render_args = RenderArgs::parse_from(args);
            run_render(render_args)
        }
    }
}

pub fn run_render(cli: RenderArgs) -> Result<()> {
    let input_source = parse_input(cli.input.as_deref())?;
    let output_dest = parse_output(cli.output.as_deref(), &input_source)?;

    let mut graph = load_graph(&input_source)?;
    let mut scene = build_scene(&mut graph, cli.width, cli.height, cli.zoom)?;
    scene.frame_end();

    let svg = render_svg(&scene, &cli.background_color)?;
    write_output(output_dest, svg.as_bytes(), cli.quiet)?;
    Ok(())
}

pub fn run_inspect(cli: InspectArgs) -> Result<()> {
    let input_source = parse_input(cli.input.as_deref())?;
    let mut graph = load_graph(&input_source)?;
    let mut scene = build_scene(&mut graph, cli.width, cli.height, cli.zoom)?;
    scene.frame_end();

    let mut containers = 0;
    let mut culled = 0;
    for layer in scene.layers().all() {
        for &child in scene.stage().children(layer) {
            containers += 1;
            if scene.stage().is_culled(child) {
                culled += 1;
            }
        }
    }

    let report = SceneReport {
        nodes: scene.node_count(),
        edges: scene.edge_count(),
        zoom: scene.viewport().scale(),
        zoom_step: scene.zoom_step(),
        containers,
        culled,
    };

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("nodes:      {}", report.nodes);
        println!("edges:      {}", report.edges);
        println!("zoom:       {:.3} (step {})", report.zoom, report.zoom_step);
        println!("containers: {} ({} culled)", report.containers, report.culled);
    }
    Ok(())
}

fn build_scene(
    graph: &mut MemoryGraph,
    width: f32,
    height: f32,
    zoom: Option<f32>,
) -> Result<GraphScene> {
    let mut options = SceneOptions::new(width, height, Box::new(MeasureFactory::new()));
    options.style = scene_style();
    options.hover_style = hover_style();
    options.select_style = select_style();

    let mut scene = GraphScene::new(options)?;
    scene.build(graph)?;
    if let Some(zoom) = zoom {
        scene.viewport_mut().set_zoom(zoom);
    }
    Ok(scene)
}

/// Base sheet for the demo: labels computed from each element's `label`
/// attribute so the file format stays free of style blocks.
fn scene_style() -> StyleSheet {
    StyleSheet {
        node: Some(StyleDefinition::partial([("label", label_from_attribute())])),
        edge: Some(StyleDefinition::partial([("label", label_from_attribute())])),
    }
}

fn label_from_attribute() -> StyleDefinition {
    StyleDefinition::partial([(
        "content",
        StyleDefinition::computed(|attributes| {
            attributes.get("label").and_then(Value::as_str).unwrap_or_default().into()
        }),
    )])
}

fn hover_style() -> StyleSheet {
    StyleSheet {
        node: Some(StyleDefinition::partial([("color", Value::from("#eeeeee").into())])),
        edge: Some(StyleDefinition::partial([("color", Value::from("#999999").into())])),
    }
}

fn select_style() -> StyleSheet {
    StyleSheet {
        node: Some(StyleDefinition::partial([("color", Value::from("#ffde66").into())])),
        edge: None,
    }
}

fn load_graph(source: &InputSource) -> Result<MemoryGraph> {
    let raw = load_definition(source)?;
    let file: GraphFile =
        serde_json::from_str(&raw).context("failed to parse graph definition")?;

    let mut graph = MemoryGraph::new();
    for node in file.nodes {
        let mut attributes = node.attributes;
        attributes.insert(ATTR_X.to_string(), Value::from(node.x));
        attributes.insert(ATTR_Y.to_string(), Value::from(node.y));
        graph.add_node(node.key, attributes);
    }
    for (index, edge) in file.edges.into_iter().enumerate() {
        let key = edge
            .key
            .unwrap_or_else(|| format!("{}->{}#{index}", edge.source, edge.target));
        graph.add_edge(key, edge.source, edge.target, file.directed, edge.attributes);
    }
    Ok(graph)
}

fn parse_input(input: Option<&str>) -> Result<InputSource> {
    match input {
        Some("-") => Ok(InputSource::Stdin),
        Some(path_str) => {
            let path = PathBuf::from(path_str);
            if !path.exists() {
                return Err(anyhow!("input file '{path_str}' does not exist"));
            }
            Ok(InputSource::File(path))
        }
        None => Ok(InputSource::Stdin),
    }
}

fn parse_output(output: Option<&str>, input: &InputSource) -> Result<OutputDestination> {
    match output {
        Some("-") => Ok(OutputDestination::Stdout),
        Some(path_str) => {
            let path = PathBuf::from(path_str);
            if let Some(parent) = path.parent() {
                if !parent.as_os_str().is_empty() && !parent.exists() {
                    return Err(anyhow!(
                        "output directory '{}' does not exist",
                        parent.display()
                    ));
                }
            }
            Ok(OutputDestination::File(path))
        }
        None => match input {
            InputSource::File(path) => {
                let default_name = path
                    .file_name()
                    .and_then(|name| name.to_str())
                    .map(|name| format!("{name}.svg"))
                    .unwrap_or_else(|| "out.svg".to_string());
                let mut default_path = path.to_path_buf();
                default_path.set_file_name(default_name);
                Ok(OutputDestination::File(default_path))
            }
            InputSource::Stdin => Ok(OutputDestination::File(PathBuf::from("out.svg"))),
        },
    }
}

fn load_definition(source: &InputSource) -> Result<String> {
    match source {
        InputSource::Stdin => {
            let mut buffer = String::new();
            io::stdin().read_to_string(&mut buffer)?;
            if buffer.trim().is_empty() {
                Err(anyhow!("no graph definition supplied on stdin"))
            } else {
                Ok(buffer)
            }
        }
        InputSource::File(path) => {
            let contents = fs::read_to_string(path)
                .with_context(|| format!("failed to read '{}'", path.display()))?;
            if contents.trim().is_empty() {
                Err(anyhow!("input file '{}' was empty", path.display()))
            } else {
                Ok(contents)
            }
        }
    }
}

fn write_output(dest: OutputDestination, bytes: &[u8], quiet: bool) -> Result<()> {
    match dest {
        OutputDestination::Stdout => {
            let mut stdout = io::stdout();
            stdout.write_all(bytes)?;
            stdout.flush()?;
        }
        OutputDestination::File(path) => {
            fs::write(&path, bytes)?;
            if !quiet {
                println!("Rendered scene -> {}", path.display());
            }
        }
    }
    Ok(())
}
