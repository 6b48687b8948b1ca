use crate::layout::{Bounds, GridOwner, Layout, RouteKind};
use serde::Serialize;
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

#[derive(Debug, Serialize)]
pub struct LayoutDump {
    pub width: f32,
    pub height: f32,
    pub nodes: Vec<NodeDump>,
    pub edges: Vec<EdgeDump>,
    pub grids: Vec<GridDump>,
    pub lanes: Vec<BandDump>,
    pub pools: Vec<BandDump>,
}

#[derive(Debug, Serialize)]
pub struct NodeDump {
    pub id: String,
    pub kind: String,
    pub label: String,
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub grid: usize,
    pub column: usize,
    pub row: usize,
}

#[derive(Debug, Serialize)]
pub struct EdgeDump {
    pub from: String,
    pub to: String,
    pub route: String,
    pub backward: bool,
    pub points: Vec<[f32; 2]>,
}

#[derive(Debug, Serialize)]
pub struct GridDump {
    pub index: usize,
    pub owner: String,
    pub columns: usize,
    pub rows: usize,
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

/// A lane or pool rectangle.
#[derive(Debug, Serialize)]
pub struct BandDump {
    pub id: String,
    pub label: String,
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

fn route_name(kind: RouteKind) -> &'static str {
    match kind {
        RouteKind::Coarse => "coarse",
        RouteKind::Fine => "fine",
        RouteKind::Direct => "direct",
        RouteKind::SelfLoop => "self-loop",
    }
}

fn band(id: &str, label: &str, bounds: &Bounds) -> BandDump {
    BandDump {
        id: id.to_string(),
        label: label.to_string(),
        x: bounds.x,
        y: bounds.y,
        width: bounds.width,
        height: bounds.height,
    }
}

impl LayoutDump {
    pub fn from_layout(layout: &Layout) -> Self {
        let nodes = layout
            .nodes
            .iter()
            .map(|node| NodeDump {
                id: node.id.clone(),
                kind: node.kind.label().to_string(),
                label: node.label.clone(),
                x: node.bounds.x,
                y: node.bounds.y,
                width: node.bounds.width,
                height: node.bounds.height,
                grid: node.grid.0,
                column: node.column,
                row: node.row,
            })
            .collect();

        let edges = layout
            .edges
            .iter()
            .map(|edge| EdgeDump {
                from: edge.from.clone(),
                to: edge.to.clone(),
                route: route_name(edge.route).to_string(),
                backward: edge.backward,
                points: edge.points.iter().map(|(x, y)| [*x, *y]).collect(),
            })
            .collect();

        let grids = layout
            .grids
            .iter()
            .map(|grid| GridDump {
                index: grid.id.0,
                owner: match &grid.owner {
                    GridOwner::Process(id) => format!("process:{id}"),
                    GridOwner::Lane(id) => format!("lane:{id}"),
                },
                columns: grid.columns,
                rows: grid.rows,
                x: grid.bounds.x,
                y: grid.bounds.y,
                width: grid.bounds.width,
                height: grid.bounds.height,
            })
            .collect();

        LayoutDump {
            width: layout.width,
            height: layout.height,
            nodes,
            edges,
            grids,
            lanes: layout
                .lanes
                .iter()
                .map(|lane| band(&lane.id, &lane.label, &lane.bounds))
                .collect(),
            pools: layout
                .pools
                .iter()
                .map(|pool| band(&pool.id, &pool.label, &pool.bounds))
                .collect(),
        }
    }
}

pub fn write_layout_dump(path: &Path, layout: &Layout) -> anyhow::Result<()> {
    let file = File::create(path)?;
    let writer = BufWriter::new(file);
    let dump = LayoutDump::from_layout(layout);
    serde_json::to_writer_pretty(writer, &dump)?;
    Ok(())
}

pub fn layout_json(layout: &Layout) -> anyhow::Result<String> {
    Ok(serde_json::to_string_pretty(&LayoutDump::from_layout(layout))?)
}
