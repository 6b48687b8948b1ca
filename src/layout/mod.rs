mod error;
pub mod grid;
pub mod placement;
pub mod routing;
pub mod super_grid;
pub mod topo;
pub(crate) mod types;
pub use error::{LayoutError, Result};
pub use types::*;

use std::collections::HashSet;

use tracing::{debug, warn};

use crate::config::LayoutConfig;
use crate::ir::{Diagram, ElementId, Extent, Parent, ProcessId};
use placement::Placement;
use routing::EdgeRouter;
use super_grid::SuperGrid;
use topo::TopologicalSorter;

/// Lays out every process of `diagram`.
///
/// Processes are sorted and placed one after another into a shared
/// [`SuperGrid`]; packing, geometry and routing then run once over the whole
/// stack so that columns line up across processes and lanes.
pub fn compute_layout(diagram: &Diagram, config: &LayoutConfig) -> Result<Layout> {
    let mut placement = Placement::new(diagram);
    let mut backward: HashSet<(ElementId, ElementId)> = HashSet::new();
    let mut owners: Vec<(GridId, GridOwner)> = Vec::new();

    for process in diagram.process_ids() {
        placement.prepare_process(process);
        owners.extend(grid_owners(diagram, &placement, process));

        let mut sorter = TopologicalSorter::new(diagram, process);
        let sorted = sorter.sorted_elements();
        placement.layout_elements(&sorted, sorter.adjacency())?;
        let reversed = sorter.backward_edges().len();
        backward.extend(sorter.backward_edges().iter().copied());
        sorter.restore_edges();
        debug!(
            process = %diagram.process(process).id,
            elements = sorted.len(),
            backward = reversed,
            "placed process"
        );
    }

    let mut supergrid = placement.into_supergrid();
    let merged = supergrid.pack();
    supergrid.set_geometry(config.cell_padding, |e| diagram.element(*e).extent(config));
    let routes = EdgeRouter::new(diagram, &supergrid, config).route_all();

    let geometry = supergrid.geometry();
    let mut layout = Layout {
        width: geometry.width,
        height: geometry.height,
        ..Layout::default()
    };
    layout.nodes = collect_nodes(diagram, &supergrid);

    let mut flows: Vec<_> = diagram.flows().collect();
    flows.sort_by_key(|&(source, target)| (source.0, target.0));
    for (source, target) in flows {
        let Some(route) = routes.get(&(source, target)) else {
            warn!(?source, ?target, "flow left unrouted");
            continue;
        };
        layout.edges.push(EdgeLayout {
            from: diagram.element(source).id.clone(),
            to: diagram.element(target).id.clone(),
            source,
            target,
            points: route.points.clone(),
            route: route.kind,
            backward: backward.contains(&(source, target)),
        });
    }

    for (id, owner) in owners {
        let bounds = geometry.grid_bounds.get(id.0).copied().unwrap_or_default();
        layout.grids.push(GridLayout {
            id,
            owner,
            bounds,
            columns: supergrid.width(),
            rows: supergrid.grid(id).height(),
        });
    }
    collect_swimlanes(diagram, &mut layout, config.lane_offset);

    debug!(
        grids = supergrid.len(),
        merged_rows = merged,
        nodes = layout.nodes.len(),
        edges = layout.edges.len(),
        width = layout.width,
        height = layout.height,
        "layout complete"
    );
    Ok(layout)
}

fn grid_owners(
    diagram: &Diagram,
    placement: &Placement<'_>,
    process: ProcessId,
) -> Vec<(GridId, GridOwner)> {
    let mut owners = Vec::new();
    if let Some(grid) = placement.grid_of(Parent::Process(process)) {
        owners.push((grid, GridOwner::Process(diagram.process(process).id.clone())));
    }
    for &pool in &diagram.process(process).pools {
        for &lane in &diagram.pool(pool).lanes {
            if let Some(grid) = placement.grid_of(Parent::Lane(lane)) {
                owners.push((grid, GridOwner::Lane(diagram.lane(lane).id.clone())));
            }
        }
    }
    owners
}

/// Nodes in element order, with their discrete position after packing.
fn collect_nodes(diagram: &Diagram, supergrid: &SuperGrid<ElementId>) -> Vec<NodeLayout> {
    let geometry = supergrid.geometry();
    let mut nodes = Vec::new();
    for (g, grid) in supergrid.grids().iter().enumerate() {
        for (row, row_id) in grid.rows().enumerate() {
            for (column, &cell) in grid.row_cells(row_id).iter().enumerate() {
                let Some(element) = grid.content(cell) else {
                    continue;
                };
                let info = diagram.element(element);
                nodes.push(NodeLayout {
                    id: info.id.clone(),
                    element,
                    kind: info.kind,
                    label: info.label().to_string(),
                    bounds: geometry.bounds_of(&element).unwrap_or_default(),
                    grid: GridId(g),
                    column,
                    row,
                });
            }
        }
    }
    nodes.sort_by_key(|node| node.element.0);
    nodes
}

/// Lane bands follow their grids; pools wrap their lanes plus a header strip
/// on the left. The whole layout shifts right to keep that strip in view.
fn collect_swimlanes(diagram: &Diagram, layout: &mut Layout, lane_offset: f32) {
    for process in diagram.process_ids() {
        for &pool_id in &diagram.process(process).pools {
            let pool = diagram.pool(pool_id);
            let mut union: Option<Bounds> = None;
            for &lane_id in &pool.lanes {
                let lane = diagram.lane(lane_id);
                let Some(grid) = layout.grids.iter().find(
                    |grid| matches!(&grid.owner, GridOwner::Lane(id) if *id == lane.id),
                ) else {
                    continue;
                };
                let bounds = grid.bounds;
                union = Some(union.map_or(bounds, |u| u.union(&bounds)));
                layout.lanes.push(LaneLayout {
                    id: lane.id.clone(),
                    label: lane.name.clone().unwrap_or_else(|| lane.id.clone()),
                    pool: pool.id.clone(),
                    grid: grid.id,
                    bounds,
                });
            }
            if let Some(union) = union {
                layout.pools.push(PoolLayout {
                    id: pool.id.clone(),
                    label: pool.name.clone().unwrap_or_else(|| pool.id.clone()),
                    bounds: Bounds::new(
                        union.x - lane_offset,
                        union.y,
                        union.width + lane_offset,
                        union.height,
                    ),
                });
            }
        }
    }
    if !layout.pools.is_empty() {
        layout.translate(lane_offset, 0.0);
        layout.width += lane_offset;
    }
}
