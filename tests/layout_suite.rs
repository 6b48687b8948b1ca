use bpmn_layout::layout::{Bounds, Layout, RouteKind};
use bpmn_layout::layout_dump::layout_json;
use bpmn_layout::{LayoutConfig, compute_layout, parse_diagram};

fn layout_of(source: &str) -> Layout {
    let diagram = parse_diagram(source).expect("parse failed");
    compute_layout(&diagram, &LayoutConfig::default()).expect("layout failed")
}

fn assert_axis_aligned(layout: &Layout) {
    for edge in &layout.edges {
        if edge.route == RouteKind::Direct {
            continue;
        }
        for pair in edge.points.windows(2) {
            let (a, b) = (pair[0], pair[1]);
            assert!(
                (a.0 - b.0).abs() < 1e-3 || (a.1 - b.1).abs() < 1e-3,
                "{} -> {}: segment {a:?} -> {b:?} is diagonal",
                edge.from,
                edge.to
            );
        }
    }
}

fn on_boundary(b: &Bounds, (x, y): (f32, f32)) -> bool {
    let eps = 1e-3;
    let within_x = x >= b.x - eps && x <= b.x + b.width + eps;
    let within_y = y >= b.y - eps && y <= b.y + b.height + eps;
    let on_side = (x - b.x).abs() < eps || (x - (b.x + b.width)).abs() < eps;
    let on_cap = (y - b.y).abs() < eps || (y - (b.y + b.height)).abs() < eps;
    (on_side && within_y) || (on_cap && within_x)
}

fn assert_endpoints_on_nodes(layout: &Layout) {
    let bounds_of = |id: &str| {
        layout
            .nodes
            .iter()
            .find(|n| n.id == id)
            .map(|n| n.bounds)
            .unwrap_or_else(|| panic!("no node {id}"))
    };
    for edge in &layout.edges {
        let ends = [bounds_of(&edge.from), bounds_of(&edge.to)];
        for point in [edge.points[0], edge.points[edge.points.len() - 1]] {
            assert!(
                ends.iter().any(|b| on_boundary(b, point)),
                "{} -> {} ({:?}): endpoint {point:?} is off both nodes",
                edge.from,
                edge.to,
                edge.route
            );
        }
    }
}

fn assert_no_overlap(layout: &Layout) {
    for (i, a) in layout.nodes.iter().enumerate() {
        for b in &layout.nodes[i + 1..] {
            assert!(
                !a.bounds.intersects(&b.bounds),
                "{} overlaps {}",
                a.id,
                b.id
            );
            assert!(
                (a.grid, a.column, a.row) != (b.grid, b.column, b.row),
                "{} and {} share a cell",
                a.id,
                b.id
            );
        }
    }
}

/// True if the axis-aligned segment passes through the interior of `bounds`.
fn crosses(bounds: &Bounds, a: (f32, f32), b: (f32, f32)) -> bool {
    let (x0, x1) = (a.0.min(b.0), a.0.max(b.0));
    let (y0, y1) = (a.1.min(b.1), a.1.max(b.1));
    x0 < bounds.right() && x1 > bounds.x && y0 < bounds.bottom() && y1 > bounds.y
}

const SPLIT_JOIN: &str = r#"{
  nodes: [
    { id: "a", kind: "task" },
    { id: "b", kind: "task" },
    { id: "c", kind: "task" },
    { id: "d", kind: "task" },
  ],
  flows: [["a", "b"], ["a", "c"], ["b", "d"], ["c", "d"]],
}"#;

#[test]
fn chain_runs_left_to_right_without_bends() {
    let layout = layout_of(
        r#"{
          nodes: [{ id: "start", kind: "start" }, { id: "a", kind: "task" }, { id: "end", kind: "end" }],
          flows: [["start", "a"], ["a", "end"]],
        }"#,
    );
    let start = layout.node("start").unwrap();
    let a = layout.node("a").unwrap();
    let end = layout.node("end").unwrap();
    assert_eq!((start.column, a.column, end.column), (0, 1, 2));
    assert_eq!(start.row, a.row);
    assert_eq!(a.row, end.row);

    assert_eq!(layout.edges.len(), 2);
    for edge in &layout.edges {
        assert_eq!(edge.points.len(), 2, "{} -> {}", edge.from, edge.to);
        assert_eq!(edge.route, RouteKind::Coarse);
        assert!(!edge.backward);
    }
    let first = &layout.edge("start", "a").unwrap().points;
    assert_eq!(first[0].0, start.bounds.right());
    assert_eq!(first[1].0, a.bounds.x);
}

#[test]
fn split_branches_run_in_parallel_rows() {
    let layout = layout_of(SPLIT_JOIN);
    let a = layout.node("a").unwrap();
    let b = layout.node("b").unwrap();
    let c = layout.node("c").unwrap();
    let d = layout.node("d").unwrap();

    assert_eq!(b.column, a.column + 1);
    assert_eq!(c.column, a.column + 1);
    assert!(b.row < a.row && a.row < c.row);
    assert_eq!(d.column, a.column + 2);
    assert_eq!(d.row, a.row);

    assert_eq!(layout.edges.len(), 4);
    assert_axis_aligned(&layout);
    for edge in &layout.edges {
        assert_eq!(edge.route, RouteKind::Coarse);
        for other in &layout.nodes {
            if other.id == edge.from || other.id == edge.to {
                continue;
            }
            for pair in edge.points.windows(2) {
                assert!(
                    !crosses(&other.bounds, pair[0], pair[1]),
                    "{} -> {} runs through {}",
                    edge.from,
                    edge.to,
                    other.id
                );
            }
        }
    }
    // Fan edges turn once: out of the split vertically, into the branch horizontally.
    assert_eq!(layout.edge("a", "b").unwrap().points.len(), 3);
    assert_eq!(layout.edge("b", "d").unwrap().points.len(), 3);
}

#[test]
fn two_cycle_reverses_one_flow() {
    let layout = layout_of(
        r#"{ nodes: [{ id: "a", kind: "task" }, { id: "b", kind: "task" }], flows: [["a", "b"], ["b", "a"]] }"#,
    );
    assert!(layout.node("a").unwrap().column < layout.node("b").unwrap().column);
    let backward: Vec<_> = layout.edges.iter().filter(|e| e.backward).collect();
    assert_eq!(backward.len(), 1);
    assert_eq!((backward[0].from.as_str(), backward[0].to.as_str()), ("b", "a"));
    assert!(!layout.edge("a", "b").unwrap().backward);
}

#[test]
fn loop_with_gateways_keeps_cells_apart() {
    let layout = layout_of(
        r#"{
          nodes: [
            { id: "s", kind: "start" },
            { id: "merge", kind: "xor" },
            { id: "work", kind: "task" },
            { id: "check", kind: "xor" },
            { id: "fix", kind: "task" },
            { id: "e", kind: "end" },
          ],
          flows: [
            ["s", "merge"], ["merge", "work"], ["work", "check"],
            ["check", "e"], ["check", "fix"], ["fix", "merge"],
          ],
        }"#,
    );
    assert_eq!(layout.nodes.len(), 6);
    assert_eq!(layout.edges.len(), 6);
    assert_no_overlap(&layout);
    assert_axis_aligned(&layout);
    assert!(layout.edges.iter().any(|e| e.backward));
    for edge in &layout.edges {
        assert!(edge.points.len() >= 2);
    }
}

#[test]
fn lanes_hold_their_nodes() {
    let layout = layout_of(
        r#"{
          pools: [{ id: "shop", name: "Shop", lanes: [{ id: "sales" }, { id: "stock" }] }],
          nodes: [
            { id: "order", kind: "start", lane: "sales" },
            { id: "pick", kind: "task", lane: "stock" },
            { id: "bill", kind: "task", lane: "sales" },
            { id: "done", kind: "end", lane: "sales" },
          ],
          flows: [["order", "pick"], ["pick", "bill"], ["bill", "done"]],
        }"#,
    );
    assert_eq!(layout.lanes.len(), 2);
    assert_eq!(layout.pools.len(), 1);
    for node in &layout.nodes {
        let lane_id = if node.id == "pick" { "stock" } else { "sales" };
        let lane = layout.lanes.iter().find(|l| l.id == lane_id).unwrap();
        let b = &node.bounds;
        assert!(b.x >= lane.bounds.x && b.right() <= lane.bounds.right(), "{}", node.id);
        assert!(b.y >= lane.bounds.y && b.bottom() <= lane.bounds.bottom(), "{}", node.id);
    }
    let order = layout.node("order").unwrap();
    let pick = layout.node("pick").unwrap();
    let bill = layout.node("bill").unwrap();
    assert!(order.column < pick.column && pick.column < bill.column);
    let pool = &layout.pools[0];
    assert!(pool.bounds.x < layout.lanes[0].bounds.x);
    assert_no_overlap(&layout);
}

#[test]
fn single_node_has_one_cell_and_no_edges() {
    let layout = layout_of(r#"{ nodes: [{ id: "only", kind: "task" }] }"#);
    assert_eq!(layout.nodes.len(), 1);
    assert!(layout.edges.is_empty());
    let only = &layout.nodes[0];
    assert_eq!((only.column, only.row), (0, 0));
    assert_eq!((layout.width, layout.height), (120.0, 80.0));
}

#[test]
fn processes_stack_vertically() {
    let layout = layout_of(
        r#"{
          processes: [
            { id: "p1", nodes: [{ id: "a", kind: "task" }, { id: "b", kind: "task" }], flows: [["a", "b"]] },
            { id: "p2", nodes: [{ id: "c", kind: "task" }] },
          ],
        }"#,
    );
    let a = layout.node("a").unwrap();
    let c = layout.node("c").unwrap();
    assert!(c.bounds.y >= a.bounds.bottom());
    assert_eq!(a.column, c.column);
    assert_ne!(a.grid, c.grid);
}

#[test]
fn layout_is_deterministic() {
    let first = layout_json(&layout_of(SPLIT_JOIN)).unwrap();
    for _ in 0..3 {
        assert_eq!(layout_json(&layout_of(SPLIT_JOIN)).unwrap(), first);
    }
}

#[test]
fn refined_routing_never_adds_direct_edges() {
    let diagram = parse_diagram(SPLIT_JOIN).unwrap();
    let config = LayoutConfig {
        refine_routes: true,
        ..LayoutConfig::default()
    };
    let layout = compute_layout(&diagram, &config).unwrap();
    assert!(layout.edges.iter().all(|e| e.route != RouteKind::Direct));
    assert_axis_aligned(&layout);
    assert_endpoints_on_nodes(&layout);
}
