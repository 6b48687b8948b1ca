use std::collections::HashMap;

use crate::config::LayoutConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ElementId(pub usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ProcessId(pub usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PoolId(pub usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LaneId(pub usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    Start,
    Intermediate,
    End,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GatewayKind {
    Exclusive,
    Inclusive,
    Parallel,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElementKind {
    Event(EventKind),
    Activity,
    Gateway(GatewayKind),
}

impl ElementKind {
    pub fn from_token(token: &str) -> Option<Self> {
        match token.to_ascii_lowercase().as_str() {
            "start" => Some(Self::Event(EventKind::Start)),
            "end" => Some(Self::Event(EventKind::End)),
            "intermediate" | "event" => Some(Self::Event(EventKind::Intermediate)),
            "task" | "activity" => Some(Self::Activity),
            "exclusive" | "xor" => Some(Self::Gateway(GatewayKind::Exclusive)),
            "inclusive" | "or" => Some(Self::Gateway(GatewayKind::Inclusive)),
            "parallel" | "and" => Some(Self::Gateway(GatewayKind::Parallel)),
            _ => None,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Event(EventKind::Start) => "start",
            Self::Event(EventKind::Intermediate) => "intermediate",
            Self::Event(EventKind::End) => "end",
            Self::Activity => "task",
            Self::Gateway(GatewayKind::Exclusive) => "exclusive",
            Self::Gateway(GatewayKind::Inclusive) => "inclusive",
            Self::Gateway(GatewayKind::Parallel) => "parallel",
        }
    }
}

/// Grouping that decides which grid an element is laid out in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Parent {
    Process(ProcessId),
    Lane(LaneId),
}

/// Anything that occupies a fixed rectangle on the canvas.
pub trait Extent {
    fn extent(&self, config: &LayoutConfig) -> (f32, f32);
}

#[derive(Debug, Clone)]
pub struct Element {
    pub id: String,
    pub name: Option<String>,
    pub kind: ElementKind,
    pub process: ProcessId,
    pub parent: Parent,
    pub size: Option<(f32, f32)>,
    pub inset: Vec<ElementId>,
    pub outset: Vec<ElementId>,
}

impl Element {
    pub fn is_join(&self) -> bool {
        self.inset.len() > 1
    }

    pub fn is_split(&self) -> bool {
        self.outset.len() > 1
    }

    pub fn label(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.id)
    }
}

impl Extent for Element {
    fn extent(&self, config: &LayoutConfig) -> (f32, f32) {
        if let Some(size) = self.size {
            return size;
        }
        match self.kind {
            ElementKind::Event(_) => (config.event_size, config.event_size),
            ElementKind::Gateway(_) => (config.gateway_size, config.gateway_size),
            ElementKind::Activity => (config.activity_width, config.activity_height),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Process {
    pub id: String,
    pub name: Option<String>,
    pub elements: Vec<ElementId>,
    pub pools: Vec<PoolId>,
}

#[derive(Debug, Clone)]
pub struct Pool {
    pub id: String,
    pub name: Option<String>,
    pub process: ProcessId,
    pub lanes: Vec<LaneId>,
}

#[derive(Debug, Clone)]
pub struct Lane {
    pub id: String,
    pub name: Option<String>,
    pub pool: PoolId,
    pub elements: Vec<ElementId>,
}

#[derive(Debug, thiserror::Error)]
pub enum DiagramError {
    #[error("duplicate identifier {0}")]
    DuplicateId(String),
    #[error("unknown element {0}")]
    UnknownElement(String),
    #[error("flow {from} -> {to} crosses process boundaries")]
    CrossProcessFlow { from: String, to: String },
    #[error("lane {lane} does not belong to the process of element {element}")]
    LaneOutsideProcess { lane: String, element: String },
}

pub type Result<T> = std::result::Result<T, DiagramError>;

/// Arena holding processes, their pools and lanes, and every flow element.
#[derive(Debug, Clone, Default)]
pub struct Diagram {
    processes: Vec<Process>,
    pools: Vec<Pool>,
    lanes: Vec<Lane>,
    elements: Vec<Element>,
    ids: HashMap<String, ElementId>,
}

impl Diagram {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_process(&mut self, id: impl Into<String>, name: Option<String>) -> ProcessId {
        self.processes.push(Process {
            id: id.into(),
            name,
            elements: Vec::new(),
            pools: Vec::new(),
        });
        ProcessId(self.processes.len() - 1)
    }

    pub fn add_pool(
        &mut self,
        process: ProcessId,
        id: impl Into<String>,
        name: Option<String>,
    ) -> PoolId {
        let pool = PoolId(self.pools.len());
        self.pools.push(Pool {
            id: id.into(),
            name,
            process,
            lanes: Vec::new(),
        });
        self.processes[process.0].pools.push(pool);
        pool
    }

    pub fn add_lane(&mut self, pool: PoolId, id: impl Into<String>, name: Option<String>) -> LaneId {
        let lane = LaneId(self.lanes.len());
        self.lanes.push(Lane {
            id: id.into(),
            name,
            pool,
            elements: Vec::new(),
        });
        self.pools[pool.0].lanes.push(lane);
        lane
    }

    pub fn add_element(
        &mut self,
        process: ProcessId,
        id: impl Into<String>,
        kind: ElementKind,
    ) -> Result<ElementId> {
        let id = id.into();
        if self.ids.contains_key(&id) {
            return Err(DiagramError::DuplicateId(id));
        }
        let element = ElementId(self.elements.len());
        self.ids.insert(id.clone(), element);
        self.elements.push(Element {
            id,
            name: None,
            kind,
            process,
            parent: Parent::Process(process),
            size: None,
            inset: Vec::new(),
            outset: Vec::new(),
        });
        self.processes[process.0].elements.push(element);
        Ok(element)
    }

    pub fn set_name(&mut self, element: ElementId, name: impl Into<String>) {
        self.elements[element.0].name = Some(name.into());
    }

    pub fn set_size(&mut self, element: ElementId, width: f32, height: f32) {
        self.elements[element.0].size = Some((width, height));
    }

    /// Moves an element into one of the lanes of its own process.
    pub fn assign_lane(&mut self, element: ElementId, lane: LaneId) -> Result<()> {
        let pool = self.lanes[lane.0].pool;
        if self.pools[pool.0].process != self.elements[element.0].process {
            return Err(DiagramError::LaneOutsideProcess {
                lane: self.lanes[lane.0].id.clone(),
                element: self.elements[element.0].id.clone(),
            });
        }
        if let Parent::Lane(previous) = self.elements[element.0].parent {
            self.lanes[previous.0].elements.retain(|&e| e != element);
        }
        self.elements[element.0].parent = Parent::Lane(lane);
        self.lanes[lane.0].elements.push(element);
        Ok(())
    }

    /// Adds a flow. Existing flows are left untouched.
    pub fn connect(&mut self, source: ElementId, target: ElementId) -> Result<()> {
        if self.elements[source.0].process != self.elements[target.0].process {
            return Err(DiagramError::CrossProcessFlow {
                from: self.elements[source.0].id.clone(),
                to: self.elements[target.0].id.clone(),
            });
        }
        if !self.elements[source.0].outset.contains(&target) {
            self.elements[source.0].outset.push(target);
        }
        if !self.elements[target.0].inset.contains(&source) {
            self.elements[target.0].inset.push(source);
        }
        Ok(())
    }

    pub fn connect_ids(&mut self, source: &str, target: &str) -> Result<()> {
        let source = self.lookup(source)?;
        let target = self.lookup(target)?;
        self.connect(source, target)
    }

    pub fn find(&self, id: &str) -> Option<ElementId> {
        self.ids.get(id).copied()
    }

    pub fn lookup(&self, id: &str) -> Result<ElementId> {
        self.find(id)
            .ok_or_else(|| DiagramError::UnknownElement(id.to_string()))
    }

    pub fn find_lane(&self, id: &str) -> Option<LaneId> {
        self.lanes
            .iter()
            .position(|lane| lane.id == id)
            .map(LaneId)
    }

    pub fn element(&self, id: ElementId) -> &Element {
        &self.elements[id.0]
    }

    pub fn elements(&self) -> &[Element] {
        &self.elements
    }

    pub fn element_ids(&self) -> impl Iterator<Item = ElementId> + '_ {
        (0..self.elements.len()).map(ElementId)
    }

    pub fn process(&self, id: ProcessId) -> &Process {
        &self.processes[id.0]
    }

    pub fn process_ids(&self) -> impl Iterator<Item = ProcessId> + '_ {
        (0..self.processes.len()).map(ProcessId)
    }

    pub fn pool(&self, id: PoolId) -> &Pool {
        &self.pools[id.0]
    }

    pub fn lane(&self, id: LaneId) -> &Lane {
        &self.lanes[id.0]
    }

    pub fn flow_count(&self) -> usize {
        self.elements.iter().map(|e| e.outset.len()).sum()
    }

    /// Flows in element order, then in each element's outset order.
    pub fn flows(&self) -> impl Iterator<Item = (ElementId, ElementId)> + '_ {
        self.element_ids().flat_map(move |source| {
            self.elements[source.0]
                .outset
                .iter()
                .map(move |&target| (source, target))
        })
    }
}
