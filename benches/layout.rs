use bpmn_layout::config::{LayoutConfig, RenderConfig};
use bpmn_layout::layout::compute_layout;
use bpmn_layout::parser::parse_diagram;
use bpmn_layout::render::render_svg;
use bpmn_layout::theme::Theme;
use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use std::hint::black_box;

fn chain_source(nodes: usize) -> String {
    let mut out = String::from("{ nodes: [{ id: \"s\", kind: \"start\" },");
    for i in 0..nodes {
        out.push_str(&format!("{{ id: \"t{i}\", kind: \"task\" }},"));
    }
    out.push_str("{ id: \"e\", kind: \"end\" }], flows: [[\"s\", \"t0\"],");
    for i in 1..nodes {
        out.push_str(&format!("[\"t{}\", \"t{i}\"],", i - 1));
    }
    out.push_str(&format!("[\"t{}\", \"e\"]] }}", nodes.saturating_sub(1)));
    out
}

/// `rungs` parallel split/join blocks, each with `width` branches.
fn ladder_source(rungs: usize, width: usize) -> String {
    let mut nodes = vec!["{ id: \"s\", kind: \"start\" }".to_string()];
    let mut flows = Vec::new();
    let mut prev = "s".to_string();
    for r in 0..rungs {
        let split = format!("split{r}");
        let join = format!("join{r}");
        nodes.push(format!("{{ id: \"{split}\", kind: \"and\" }}"));
        nodes.push(format!("{{ id: \"{join}\", kind: \"and\" }}"));
        flows.push(format!("[\"{prev}\", \"{split}\"]"));
        for b in 0..width {
            let task = format!("r{r}b{b}");
            nodes.push(format!("{{ id: \"{task}\", kind: \"task\" }}"));
            flows.push(format!("[\"{split}\", \"{task}\"]"));
            flows.push(format!("[\"{task}\", \"{join}\"]"));
        }
        prev = join;
    }
    nodes.push("{ id: \"e\", kind: \"end\" }".to_string());
    flows.push(format!("[\"{prev}\", \"e\"]"));
    format!("{{ nodes: [{}], flows: [{}] }}", nodes.join(","), flows.join(","))
}

/// A chain where every `step`-th task loops back through an exclusive gateway.
fn looped_source(nodes: usize, step: usize) -> String {
    let mut decl = vec!["{ id: \"s\", kind: \"start\" }".to_string()];
    let mut flows = vec!["[\"s\", \"m0\"]".to_string()];
    for i in 0..nodes {
        decl.push(format!("{{ id: \"m{i}\", kind: \"xor\" }}"));
        decl.push(format!("{{ id: \"t{i}\", kind: \"task\" }}"));
        decl.push(format!("{{ id: \"c{i}\", kind: \"xor\" }}"));
        flows.push(format!("[\"m{i}\", \"t{i}\"]"));
        flows.push(format!("[\"t{i}\", \"c{i}\"]"));
        if i + 1 < nodes {
            flows.push(format!("[\"c{i}\", \"m{}\"]", i + 1));
        }
        if i % step.max(1) == 0 {
            flows.push(format!("[\"c{i}\", \"m{i}\"]"));
        }
    }
    decl.push("{ id: \"e\", kind: \"end\" }".to_string());
    flows.push(format!("[\"c{}\", \"e\"]", nodes.saturating_sub(1)));
    format!("{{ nodes: [{}], flows: [{}] }}", decl.join(","), flows.join(","))
}

fn sources() -> Vec<(String, String)> {
    vec![
        ("chain_20".to_string(), chain_source(20)),
        ("chain_200".to_string(), chain_source(200)),
        ("ladder_5x3".to_string(), ladder_source(5, 3)),
        ("ladder_10x6".to_string(), ladder_source(10, 6)),
        ("loops_20".to_string(), looped_source(20, 3)),
        ("loops_60".to_string(), looped_source(60, 2)),
    ]
}

fn bench_parse(c: &mut Criterion) {
    let mut group = c.benchmark_group("parse");
    for (name, input) in sources() {
        group.bench_with_input(BenchmarkId::from_parameter(&name), &input, |b, data| {
            b.iter(|| {
                let diagram = parse_diagram(black_box(data)).expect("parse failed");
                black_box(diagram.flow_count());
            });
        });
    }
    group.finish();
}

fn bench_layout(c: &mut Criterion) {
    let mut group = c.benchmark_group("layout");
    for refine in [false, true] {
        let config = LayoutConfig {
            refine_routes: refine,
            ..LayoutConfig::default()
        };
        for (name, input) in sources() {
            let diagram = parse_diagram(&input).expect("parse failed");
            let id = format!("{name}/{}", if refine { "refined" } else { "coarse" });
            group.bench_with_input(BenchmarkId::from_parameter(id), &diagram, |b, diagram| {
                b.iter(|| {
                    let layout = compute_layout(black_box(diagram), &config).expect("layout failed");
                    black_box(layout.edges.len());
                });
            });
        }
    }
    group.finish();
}

fn bench_end_to_end(c: &mut Criterion) {
    let mut group = c.benchmark_group("end_to_end");
    let theme = Theme::bpmn();
    let config = LayoutConfig::default();
    let render = RenderConfig::default();
    for (name, input) in sources() {
        group.bench_with_input(BenchmarkId::from_parameter(&name), &input, |b, data| {
            b.iter(|| {
                let diagram = parse_diagram(black_box(data)).expect("parse failed");
                let layout = compute_layout(&diagram, &config).expect("layout failed");
                let svg = render_svg(&layout, &theme, &render);
                black_box(svg.len());
            });
        });
    }
    group.finish();
}

criterion_group!(
    name = benches;
    config = Criterion::default();
    targets = bench_parse, bench_layout, bench_end_to_end
);
criterion_main!(benches);
