use crate::ir::{Diagram, ElementKind, ProcessId};
use anyhow::{Context, Result, anyhow, bail};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;

static ID_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_.:\-]*$").unwrap());

const DEFAULT_PROCESS_ID: &str = "process";

#[derive(Debug, Deserialize)]
struct DocumentFile {
    #[serde(default)]
    processes: Vec<ProcessFile>,
    /// Single-process shorthand.
    #[serde(flatten)]
    inline: ProcessFile,
}

#[derive(Debug, Default, Deserialize)]
struct ProcessFile {
    id: Option<String>,
    name: Option<String>,
    #[serde(default)]
    nodes: Vec<NodeFile>,
    #[serde(default)]
    flows: Vec<FlowFile>,
    #[serde(default)]
    pools: Vec<PoolFile>,
}

#[derive(Debug, Deserialize)]
struct NodeFile {
    id: String,
    kind: String,
    name: Option<String>,
    lane: Option<String>,
    width: Option<f32>,
    height: Option<f32>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum FlowFile {
    Pair(String, String),
    Object { from: String, to: String },
}

impl FlowFile {
    fn endpoints(&self) -> (&str, &str) {
        match self {
            FlowFile::Pair(from, to) | FlowFile::Object { from, to } => (from, to),
        }
    }
}

#[derive(Debug, Deserialize)]
struct PoolFile {
    id: String,
    name: Option<String>,
    #[serde(default)]
    lanes: Vec<LaneFile>,
}

#[derive(Debug, Deserialize)]
struct LaneFile {
    id: String,
    name: Option<String>,
}

/// Reads a JSON5 process description into a [`Diagram`].
pub fn parse_diagram(input: &str) -> Result<Diagram> {
    let document: DocumentFile = json5::from_str(input).context("malformed JSON5 document")?;
    let mut processes = Vec::new();
    let inline = document.inline;
    if !inline.nodes.is_empty() || !inline.pools.is_empty() {
        processes.push(inline);
    }
    processes.extend(document.processes);
    if processes.iter().all(|p| p.nodes.is_empty()) {
        bail!("document declares no nodes");
    }

    let mut diagram = Diagram::new();
    for (idx, process) in processes.into_iter().enumerate() {
        let id = process.id.clone().unwrap_or_else(|| {
            if idx == 0 {
                DEFAULT_PROCESS_ID.to_string()
            } else {
                format!("{DEFAULT_PROCESS_ID}{idx}")
            }
        });
        validate_id("process", &id)?;
        let pid = diagram.add_process(id, process.name.clone());
        add_process_body(&mut diagram, pid, process)?;
    }
    Ok(diagram)
}

fn add_process_body(diagram: &mut Diagram, pid: ProcessId, process: ProcessFile) -> Result<()> {
    for pool in process.pools {
        validate_id("pool", &pool.id)?;
        let pool_id = diagram.add_pool(pid, pool.id, pool.name);
        for lane in pool.lanes {
            validate_id("lane", &lane.id)?;
            if diagram.find_lane(&lane.id).is_some() {
                bail!("duplicate lane id {}", lane.id);
            }
            diagram.add_lane(pool_id, lane.id, lane.name);
        }
    }

    for node in process.nodes {
        validate_id("node", &node.id)?;
        let kind = ElementKind::from_token(&node.kind)
            .ok_or_else(|| anyhow!("node {}: unknown kind {:?}", node.id, node.kind))?;
        let element = diagram.add_element(pid, node.id.clone(), kind)?;
        if let Some(name) = node.name {
            diagram.set_name(element, name);
        }
        match (node.width, node.height) {
            (Some(width), Some(height)) if width > 0.0 && height > 0.0 => {
                diagram.set_size(element, width, height);
            }
            (None, None) => {}
            _ => bail!("node {}: width and height must both be positive", node.id),
        }
        if let Some(lane) = node.lane {
            let lane_id = diagram
                .find_lane(&lane)
                .ok_or_else(|| anyhow!("node {}: unknown lane {lane}", node.id))?;
            diagram.assign_lane(element, lane_id)?;
        }
    }

    for flow in &process.flows {
        let (from, to) = flow.endpoints();
        diagram
            .connect_ids(from, to)
            .with_context(|| format!("flow {from} -> {to}"))?;
    }
    Ok(())
}

fn validate_id(what: &str, id: &str) -> Result<()> {
    if ID_RE.is_match(id) {
        Ok(())
    } else {
        bail!("invalid {what} id {id:?}")
    }
}
